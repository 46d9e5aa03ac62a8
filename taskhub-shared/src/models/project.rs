/// Project model and database operations
///
/// Projects own tasks (deleting a project cascades to its tasks at the
/// database level) and may carry one uploaded image, referenced by a
/// relative path into the image store.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     due_date DATE,
///     status record_status NOT NULL DEFAULT 'pending',
///     image_path VARCHAR(2048),
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     updated_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::listing::{self, Page, Sort, SortField, PER_PAGE};
use crate::models::status::Status;

const COLUMNS: &str = "id, name, description, due_date, status, image_path, \
                       created_by, updated_by, created_at, updated_at";

/// Allow-listed sort keys for project listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProjectSortField {
    Id,
    Name,
    Status,
    DueDate,
    #[default]
    CreatedAt,
}

impl SortField for ProjectSortField {
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
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Case-insensitive substring match on name
    pub name: Option<String>,

    /// Exact status match
    pub status: Option<Status>,
}

/// Project model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Status,

    /// Relative path of the uploaded image in the image store
    pub image_path: Option<String>,

    /// User who created the project (null if that user was deleted)
    pub created_by: Option<Uuid>,

    /// User who last updated the project
    pub updated_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Status,
    pub image_path: Option<String>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
}

/// Input for updating a project
///
/// All listed fields are written; `image_path: None` keeps the stored path
/// untouched (images are replaced, never cleared, by an update).
#[derive(Debug, Clone)]
pub struct UpdateProject {
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Status,
    pub image_path: Option<String>,
    pub updated_by: Option<Uuid>,
}

impl Project {
    /// Creates a new project
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO projects (name, description, due_date, status, image_path, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        );

        sqlx::query_as::<_, Project>(&sql)
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

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");

        sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Updates a project, returning the new row, or None when it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE projects
            SET name = $2,
                description = $3,
                due_date = $4,
                status = $5,
                image_path = COALESCE($6, image_path),
                updated_by = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );

        sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.due_date)
            .bind(data.status)
            .bind(data.image_path)
            .bind(data.updated_by)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a project
    ///
    /// Tasks of the project are removed by the ON DELETE CASCADE constraint;
    /// the caller is responsible for cleaning up image directories.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists projects filtered, sorted, and paginated
    ///
    /// The sort is pre-validated against [`ProjectSortField`], so only
    /// allow-listed column identifiers reach the ORDER BY clause.
    pub async fn list(
        pool: &PgPool,
        filter: &ProjectFilter,
        sort: Sort<ProjectSortField>,
        page: u32,
    ) -> Result<Page<Self>, sqlx::Error> {
        const MATCH: &str = r#"
            WHERE ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%')
              AND ($2::record_status IS NULL OR status = $2)
        "#;

        let count_sql = format!("SELECT COUNT(*) FROM projects {MATCH}");
        let (total,): (i64,) = sqlx::query_as(&count_sql)
            .bind(&filter.name)
            .bind(filter.status)
            .fetch_one(pool)
            .await?;

        let page_sql = format!(
            "SELECT {COLUMNS} FROM projects {MATCH} ORDER BY {} LIMIT $3 OFFSET $4",
            sort.order_by()
        );
        let rows = sqlx::query_as::<_, Project>(&page_sql)
            .bind(&filter.name)
            .bind(filter.status)
            .bind(PER_PAGE)
            .bind(listing::offset(page))
            .fetch_all(pool)
            .await?;

        Ok(Page::new(rows, page, total))
    }

    /// All projects ordered by name ascending, for form dropdowns
    pub async fn all_ordered_by_name(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM projects ORDER BY name ASC");

        sqlx::query_as::<_, Project>(&sql).fetch_all(pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_allow_list() {
        assert_eq!(ProjectSortField::parse("name"), Some(ProjectSortField::Name));
        assert_eq!(
            ProjectSortField::parse("due_date"),
            Some(ProjectSortField::DueDate)
        );
        assert_eq!(ProjectSortField::parse("image_path"), None);
        assert_eq!(ProjectSortField::parse("name; DROP TABLE projects"), None);
    }

    #[test]
    fn test_sort_field_columns_round_trip() {
        for key in ["id", "name", "status", "due_date", "created_at"] {
            let field = ProjectSortField::parse(key).unwrap();
            assert_eq!(field.column(), key);
        }
    }

    #[test]
    fn test_default_sort_field_is_created_at() {
        assert_eq!(ProjectSortField::default(), ProjectSortField::CreatedAt);
    }

    #[test]
    fn test_empty_filter_is_no_filter() {
        let filter = ProjectFilter::default();
        assert!(filter.name.is_none());
        assert!(filter.status.is_none());
    }

    // Query operations require a live database and are exercised through the
    // API integration paths.
}
