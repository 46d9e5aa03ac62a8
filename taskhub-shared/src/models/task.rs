/// Task model and database operations
///
/// Tasks belong to one project, may be assigned to a user, and may carry one
/// uploaded image. The listing filter doubles as the scope for the
/// project-show task table (`project_id`) and the "my tasks" view
/// (`assigned_user_id`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::listing::{self, Page, Sort, SortField, PER_PAGE};
use crate::models::status::Status;

const COLUMNS: &str = "id, project_id, assigned_user_id, name, description, due_date, status, \
                       image_path, created_by, updated_by, created_at, updated_at";

/// Allow-listed sort keys for task listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskSortField {
    Id,
    Name,
    Status,
    DueDate,
    #[default]
    CreatedAt,
}

impl SortField for TaskSortField {
    fn parse(key: &str) -> Option<Self> {
        match key {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "status" => Some(Self::Status),
            "due_date" => Some(Self::DueDate),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Status => "status",
            Self::DueDate => "due_date",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Optional listing filters; `None` means "no filter".
///
/// `project_id` and `assigned_user_id` are scope filters set by the server,
/// never from the query string.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Case-insensitive substring match on name
    pub name: Option<String>,

    /// Exact status match
    pub status: Option<Status>,

    /// Restrict to one project's tasks
    pub project_id: Option<Uuid>,

    /// Restrict to one assignee's tasks
    pub assigned_user_id: Option<Uuid>,
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Project this task belongs to
    pub project_id: Uuid,

    /// User the task is assigned to, if any
    pub assigned_user_id: Option<Uuid>,

    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Status,

    /// Relative path of the uploaded image in the image store
    pub image_path: Option<String>,

    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub assigned_user_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Status,
    pub image_path: Option<String>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
}

/// Input for updating a task
///
/// `image_path: None` keeps the stored path untouched.
#[derive(Debug, Clone)]
pub struct UpdateTask {
    pub project_id: Uuid,
    pub assigned_user_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Status,
    pub image_path: Option<String>,
    pub updated_by: Option<Uuid>,
}

impl Task {
    /// Creates a new task
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO tasks (project_id, assigned_user_id, name, description, due_date,
                               status, image_path, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(data.project_id)
            .bind(data.assigned_user_id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.due_date)
            .bind(data.status)
            .bind(data.image_path)
            .bind(data.created_by)
            .bind(data.updated_by)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Updates a task, returning the new row, or None when it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE tasks
            SET project_id = $2,
                assigned_user_id = $3,
                name = $4,
                description = $5,
                due_date = $6,
                status = $7,
                image_path = COALESCE($8, image_path),
                updated_by = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(data.project_id)
            .bind(data.assigned_user_id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.due_date)
            .bind(data.status)
            .bind(data.image_path)
            .bind(data.updated_by)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a task
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists tasks filtered, sorted, and paginated
    pub async fn list(
        pool: &PgPool,
        filter: &TaskFilter,
        sort: Sort<TaskSortField>,
        page: u32,
    ) -> Result<Page<Self>, sqlx::Error> {
        const MATCH: &str = r#"
            WHERE ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%')
              AND ($2::record_status IS NULL OR status = $2)
              AND ($3::UUID IS NULL OR project_id = $3)
              AND ($4::UUID IS NULL OR assigned_user_id = $4)
        "#;

        let count_sql = format!("SELECT COUNT(*) FROM tasks {MATCH}");
        let (total,): (i64,) = sqlx::query_as(&count_sql)
            .bind(&filter.name)
            .bind(filter.status)
            .bind(filter.project_id)
            .bind(filter.assigned_user_id)
            .fetch_one(pool)
            .await?;

        let page_sql = format!(
            "SELECT {COLUMNS} FROM tasks {MATCH} ORDER BY {} LIMIT $5 OFFSET $6",
            sort.order_by()
        );
        let rows = sqlx::query_as::<_, Task>(&page_sql)
            .bind(&filter.name)
            .bind(filter.status)
            .bind(filter.project_id)
            .bind(filter.assigned_user_id)
            .bind(PER_PAGE)
            .bind(listing::offset(page))
            .fetch_all(pool)
            .await?;

        Ok(Page::new(rows, page, total))
    }

    /// Image paths of a project's tasks, captured before a cascading delete
    /// so their directories can be cleaned up afterwards
    pub async fn image_paths_for_project(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT image_path FROM tasks WHERE project_id = $1 AND image_path IS NOT NULL",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(path,)| path).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_allow_list() {
        assert_eq!(TaskSortField::parse("status"), Some(TaskSortField::Status));
        assert_eq!(TaskSortField::parse("assigned_user_id"), None);
        assert_eq!(TaskSortField::parse("created_at; --"), None);
    }

    #[test]
    fn test_sort_field_columns_round_trip() {
        for key in ["id", "name", "status", "due_date", "created_at"] {
            let field = TaskSortField::parse(key).unwrap();
            assert_eq!(field.column(), key);
        }
    }

    #[test]
    fn test_scope_filters_default_off() {
        let filter = TaskFilter::default();
        assert!(filter.project_id.is_none());
        assert!(filter.assigned_user_id.is_none());
    }
}
