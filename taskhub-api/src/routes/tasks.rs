/// Task CRUD endpoints
///
/// # Endpoints
///
/// - `GET /v1/tasks` - Filtered/sorted/paginated listing
/// - `GET /v1/tasks/my` - Listing scoped to the authenticated assignee
/// - `GET /v1/tasks/options` - Projects and users for the task form
/// - `POST /v1/tasks` - Create (multipart, optional image)
/// - `GET /v1/tasks/:id` - Show
/// - `PUT /v1/tasks/:id` - Update (multipart, optional replacement image)
/// - `DELETE /v1/tasks/:id` - Delete row and image directory

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use taskhub_shared::listing::ListParams;
use taskhub_shared::models::project::Project;
use taskhub_shared::models::status::Status;
use taskhub_shared::models::task::{CreateTask, Task, TaskFilter, TaskSortField, UpdateTask};
use taskhub_shared::models::user::User;

use crate::app::{AppState, AuthContext};
use crate::error::{ApiError, ApiResult};
use crate::forms::{FormErrors, RecordForm, UploadedImage};
use crate::routes::{storage_url, Listing, MessageResponse, MutationResponse};

/// Entity prefix for the image store
const IMAGE_ENTITY: &str = "task";

/// Serialized task
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub assigned_user_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Status,

    /// Public URL of the uploaded image, when one exists
    pub image_url: Option<String>,

    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            project_id: task.project_id,
            assigned_user_id: task.assigned_user_id,
            name: task.name,
            description: task.description,
            due_date: task.due_date,
            status: task.status,
            image_url: task.image_path.as_deref().map(storage_url),
            created_by: task.created_by,
            updated_by: task.updated_by,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// One dropdown entry of the task form
#[derive(Debug, Serialize)]
pub struct OptionEntry {
    pub id: Uuid,
    pub name: String,
}

/// Projects and users for the task create/edit form, both ordered by name
#[derive(Debug, Serialize)]
pub struct TaskOptionsResponse {
    pub projects: Vec<OptionEntry>,
    pub users: Vec<OptionEntry>,
}

/// Validated multipart fields of a task create/update form
struct TaskForm {
    project_id: Uuid,
    assigned_user_id: Option<Uuid>,
    name: String,
    description: Option<String>,
    due_date: Option<NaiveDate>,
    status: Status,
    image: Option<UploadedImage>,
}

impl TaskForm {
    async fn from_multipart(multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = RecordForm::read(multipart).await?;
        let mut errors = FormErrors::default();

        let name = form.require_text("name", &mut errors);
        let description = form.optional_text("description");
        let due_date = form.date("due_date", &mut errors);
        let status = form.status("status", &mut errors);
        let project_id = form.require_uuid("project_id", &mut errors);
        let assigned_user_id = form.uuid("assigned_user_id", &mut errors);

        errors.finish()?;

        Ok(Self {
            project_id,
            assigned_user_id,
            name,
            description,
            due_date,
            status,
            image: form.take_image(),
        })
    }

    /// Checks the referenced project and assignee exist
    async fn check_references(&self, state: &AppState) -> Result<(), ApiError> {
        if Project::find_by_id(&state.db, self.project_id).await?.is_none() {
            return Err(ApiError::invalid_field(
                "project_id",
                "Project does not exist",
            ));
        }

        if let Some(user_id) = self.assigned_user_id {
            if User::find_by_id(&state.db, user_id).await?.is_none() {
                return Err(ApiError::invalid_field(
                    "assigned_user_id",
                    "User does not exist",
                ));
            }
        }

        Ok(())
    }
}

/// Listing endpoint
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Listing<TaskResponse>>> {
    let filter = TaskFilter {
        name: params.name().map(str::to_string),
        status: params.status()?,
        project_id: None,
        assigned_user_id: None,
    };
    let sort = params.sort::<TaskSortField>()?;

    let page = Task::list(&state.db, &filter, sort, params.page()).await?;

    Ok(Json(Listing::new(page.map(TaskResponse::from), params)))
}

/// Listing scoped to tasks assigned to the authenticated user
///
/// Name and status filters compose with the assignee scope independently,
/// like every other listing.
pub async fn my_index(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Listing<TaskResponse>>> {
    let filter = TaskFilter {
        name: params.name().map(str::to_string),
        status: params.status()?,
        project_id: None,
        assigned_user_id: Some(auth.user_id),
    };
    let sort = params.sort::<TaskSortField>()?;

    let page = Task::list(&state.db, &filter, sort, params.page()).await?;

    Ok(Json(Listing::new(page.map(TaskResponse::from), params)))
}

/// Form-support endpoint: dropdown options for the task form
pub async fn options(State(state): State<AppState>) -> ApiResult<Json<TaskOptionsResponse>> {
    let projects = Project::all_ordered_by_name(&state.db).await?;
    let users = User::all_ordered_by_name(&state.db).await?;

    Ok(Json(TaskOptionsResponse {
        projects: projects
            .into_iter()
            .map(|p| OptionEntry { id: p.id, name: p.name })
            .collect(),
        users: users
            .into_iter()
            .map(|u| OptionEntry { id: u.id, name: u.name })
            .collect(),
    }))
}

/// Create endpoint
pub async fn store(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<MutationResponse<TaskResponse>>)> {
    let mut form = TaskForm::from_multipart(multipart).await?;
    form.check_references(&state).await?;

    let image_path = match form.image.take() {
        Some(image) => Some(
            state
                .images
                .store(IMAGE_ENTITY, &image.file_name, &image.bytes)
                .await?,
        ),
        None => None,
    };

    let task = Task::create(
        &state.db,
        CreateTask {
            project_id: form.project_id,
            assigned_user_id: form.assigned_user_id,
            name: form.name,
            description: form.description,
            due_date: form.due_date,
            status: form.status,
            image_path,
            created_by: Some(auth.user_id),
            updated_by: Some(auth.user_id),
        },
    )
    .await?;

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task created");

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            message: "Task was created".to_string(),
            data: task.into(),
        }),
    ))
}

/// Show endpoint
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))?;

    Ok(Json(task.into()))
}

/// Update endpoint
///
/// When a replacement image is uploaded, the new image is stored first, the
/// row is pointed at it, and only then is the old image directory removed.
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<MutationResponse<TaskResponse>>> {
    let existing = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))?;

    let mut form = TaskForm::from_multipart(multipart).await?;
    form.check_references(&state).await?;

    let new_image_path = match form.image.take() {
        Some(image) => Some(
            state
                .images
                .store(IMAGE_ENTITY, &image.file_name, &image.bytes)
                .await?,
        ),
        None => None,
    };
    let replacing_image = new_image_path.is_some();

    let task = Task::update(
        &state.db,
        id,
        UpdateTask {
            project_id: form.project_id,
            assigned_user_id: form.assigned_user_id,
            name: form.name,
            description: form.description,
            due_date: form.due_date,
            status: form.status,
            image_path: new_image_path,
            updated_by: Some(auth.user_id),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))?;

    if replacing_image {
        if let Some(old_path) = &existing.image_path {
            state.images.remove_record_dir(old_path).await?;
        }
    }

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task updated");

    Ok(Json(MutationResponse {
        message: format!("Task \"{}\" was updated", task.name),
        data: task.into(),
    }))
}

/// Delete endpoint
pub async fn destroy(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))?;

    let name = task.name.clone();

    Task::delete(&state.db, id).await?;

    if let Some(image_path) = &task.image_path {
        state.images.remove_record_dir(image_path).await?;
    }

    tracing::info!(task_id = %id, user_id = %auth.user_id, "Task deleted");

    Ok(Json(MessageResponse {
        message: format!("Task \"{}\" was deleted", name),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            assigned_user_id: None,
            name: "Write docs".to_string(),
            description: Some("API reference".to_string()),
            due_date: None,
            status: Status::InProgress,
            image_path: None,
            created_by: Some(Uuid::new_v4()),
            updated_by: Some(Uuid::new_v4()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_response_without_image_has_null_url() {
        let response = TaskResponse::from(sample_task());
        assert_eq!(response.image_url, None);
    }

    #[test]
    fn test_response_maps_image_path_to_url() {
        let mut task = sample_task();
        task.image_path = Some("task/zY9xW7vU5tS3rQ1p/shot.png".to_string());
        let response = TaskResponse::from(task);
        assert_eq!(
            response.image_url.as_deref(),
            Some("/storage/task/zY9xW7vU5tS3rQ1p/shot.png")
        );
    }

    #[test]
    fn test_form_requires_project_id() {
        let form = RecordForm::from_parts(&[("name", "Write docs"), ("status", "pending")], None);
        let mut errors = FormErrors::default();

        form.require_text("name", &mut errors);
        form.status("status", &mut errors);
        form.require_uuid("project_id", &mut errors);

        match errors.finish() {
            Err(ApiError::ValidationError(details)) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "project_id");
            }
            other => panic!("expected ValidationError, got {:?}", other),
        }
    }
}
