/// Project CRUD endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects` - Filtered/sorted/paginated listing
/// - `POST /v1/projects` - Create (multipart, optional image)
/// - `GET /v1/projects/:id` - Project plus its task listing
/// - `PUT /v1/projects/:id` - Update (multipart, optional replacement image)
/// - `DELETE /v1/projects/:id` - Delete row, image directory, and task
///   image directories

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use taskhub_shared::listing::ListParams;
use taskhub_shared::models::project::{
    CreateProject, Project, ProjectFilter, ProjectSortField, UpdateProject,
};
use taskhub_shared::models::status::Status;
use taskhub_shared::models::task::{Task, TaskFilter, TaskSortField};

use crate::app::{AppState, AuthContext};
use crate::error::{ApiError, ApiResult};
use crate::forms::{FormErrors, RecordForm, UploadedImage};
use crate::routes::tasks::TaskResponse;
use crate::routes::{storage_url, Listing, MessageResponse, MutationResponse};

/// Entity prefix for the image store
const IMAGE_ENTITY: &str = "project";

/// Serialized project
#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
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

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            due_date: project.due_date,
            status: project.status,
            image_url: project.image_path.as_deref().map(storage_url),
            created_by: project.created_by,
            updated_by: project.updated_by,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// Project show payload: the project and its tasks
#[derive(Debug, Serialize)]
pub struct ProjectShowResponse {
    pub data: ProjectResponse,

    /// The project's tasks, filtered/sorted/paginated like any task listing
    pub tasks: Listing<TaskResponse>,
}

/// Validated multipart fields of a project create/update form
struct ProjectForm {
    name: String,
    description: Option<String>,
    due_date: Option<NaiveDate>,
    status: Status,
    image: Option<UploadedImage>,
}

impl ProjectForm {
    async fn from_multipart(multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = RecordForm::read(multipart).await?;
        let mut errors = FormErrors::default();

        let name = form.require_text("name", &mut errors);
        let description = form.optional_text("description");
        let due_date = form.date("due_date", &mut errors);
        let status = form.status("status", &mut errors);

        errors.finish()?;

        Ok(Self {
            name,
            description,
            due_date,
            status,
            image: form.take_image(),
        })
    }
}

/// Listing endpoint
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Listing<ProjectResponse>>> {
    let filter = ProjectFilter {
        name: params.name().map(str::to_string),
        status: params.status()?,
    };
    let sort = params.sort::<ProjectSortField>()?;

    let page = Project::list(&state.db, &filter, sort, params.page()).await?;

    Ok(Json(Listing::new(page.map(ProjectResponse::from), params)))
}

/// Create endpoint
pub async fn store(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<MutationResponse<ProjectResponse>>)> {
    let mut form = ProjectForm::from_multipart(multipart).await?;

    // Validation passed; only now touch the image store
    let image_path = match form.image.take() {
        Some(image) => Some(
            state
                .images
                .store(IMAGE_ENTITY, &image.file_name, &image.bytes)
                .await?,
        ),
        None => None,
    };

    let project = Project::create(
        &state.db,
        CreateProject {
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

    tracing::info!(project_id = %project.id, user_id = %auth.user_id, "Project created");

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            message: "Project was created".to_string(),
            data: project.into(),
        }),
    ))
}

/// Show endpoint: the project and its task listing
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ProjectShowResponse>> {
    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))?;

    let filter = TaskFilter {
        name: params.name().map(str::to_string),
        status: params.status()?,
        project_id: Some(project.id),
        assigned_user_id: None,
    };
    let sort = params.sort::<TaskSortField>()?;

    let tasks = Task::list(&state.db, &filter, sort, params.page()).await?;

    Ok(Json(ProjectShowResponse {
        data: project.into(),
        tasks: Listing::new(tasks.map(TaskResponse::from), params),
    }))
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
) -> ApiResult<Json<MutationResponse<ProjectResponse>>> {
    let existing = Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))?;

    let mut form = ProjectForm::from_multipart(multipart).await?;

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

    let project = Project::update(
        &state.db,
        id,
        UpdateProject {
            name: form.name,
            description: form.description,
            due_date: form.due_date,
            status: form.status,
            image_path: new_image_path,
            updated_by: Some(auth.user_id),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))?;

    if replacing_image {
        if let Some(old_path) = &existing.image_path {
            state.images.remove_record_dir(old_path).await?;
        }
    }

    tracing::info!(project_id = %project.id, user_id = %auth.user_id, "Project updated");

    Ok(Json(MutationResponse {
        message: format!("Project \"{}\" was updated", project.name),
        data: project.into(),
    }))
}

/// Delete endpoint
///
/// Tasks go with the project through the database cascade; their image
/// directories are captured first and removed after the row deletion.
pub async fn destroy(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))?;

    let name = project.name.clone();
    let task_image_paths = Task::image_paths_for_project(&state.db, id).await?;

    Project::delete(&state.db, id).await?;

    if let Some(image_path) = &project.image_path {
        state.images.remove_record_dir(image_path).await?;
    }
    for image_path in &task_image_paths {
        state.images.remove_record_dir(image_path).await?;
    }

    tracing::info!(project_id = %id, user_id = %auth.user_id, "Project deleted");

    Ok(Json(MessageResponse {
        message: format!("Project \"{}\" was deleted", name),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn sample_project() -> Project {
        Project {
            id: Uuid::new_v4(),
            name: "Launch".to_string(),
            description: None,
            due_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            status: Status::Pending,
            image_path: Some("project/aB3xK9mQ2rT5wY7z/logo.png".to_string()),
            created_by: Some(Uuid::new_v4()),
            updated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_response_exposes_public_image_url() {
        let response = ProjectResponse::from(sample_project());
        assert_eq!(
            response.image_url.as_deref(),
            Some("/storage/project/aB3xK9mQ2rT5wY7z/logo.png")
        );
    }

    #[test]
    fn test_response_without_image_has_null_url() {
        let mut project = sample_project();
        project.image_path = None;
        let response = ProjectResponse::from(project);
        assert_eq!(response.image_url, None);
    }

    #[tokio::test]
    async fn test_form_requires_name_and_status() {
        let form = RecordForm::from_parts(&[("description", "desc")], None);
        let mut errors = FormErrors::default();

        form.require_text("name", &mut errors);
        form.status("status", &mut errors);

        match errors.finish() {
            Err(ApiError::ValidationError(details)) => {
                let fields: Vec<&str> = details.iter().map(|d| d.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "status"]);
            }
            other => panic!("expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_form_image_is_optional() {
        let mut form = RecordForm::from_parts(
            &[("name", "Launch"), ("status", "pending")],
            Some(UploadedImage {
                file_name: "logo.png".to_string(),
                bytes: Bytes::from_static(b"png"),
            }),
        );
        assert!(form.take_image().is_some());

        let mut form = RecordForm::from_parts(&[("name", "Launch"), ("status", "pending")], None);
        assert!(form.take_image().is_none());
    }
}
