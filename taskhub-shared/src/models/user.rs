/// User model and database operations
///
/// Users authenticate with email + password (stored as an Argon2id hash,
/// never plaintext) and are referenced by projects and tasks through
/// created_by/updated_by/assigned_user_id. Email uniqueness is
/// case-insensitive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::listing::{self, Page, Sort, SortField, PER_PAGE};

const COLUMNS: &str = "id, name, email, password_hash, email_verified_at, created_at, updated_at";

/// Allow-listed sort keys for user listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserSortField {
    Id,
    Name,
    Email,
    #[default]
    CreatedAt,
}

impl SortField for UserSortField {
    fn parse(key: &str) -> Option<Self> {
        match key {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Email => "email",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Optional listing filters; `None` means "no filter".
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive substring match on name
    pub name: Option<String>,

    /// Case-insensitive substring match on email
    pub email: Option<String>,
}

/// User model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,

    /// Unique email address (case-insensitive)
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// When the email was marked verified; stamped on every create/update
    /// since there is no verification flow
    pub email_verified_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,

    /// Argon2id hash (NOT the plaintext password)
    pub password_hash: String,

    pub email_verified_at: Option<DateTime<Utc>>,
}

/// Input for updating a user
///
/// `password_hash: None` leaves the stored hash untouched; the column is
/// omitted from the write entirely, which is how an empty password field on
/// the edit form must behave.
#[derive(Debug, Clone)]
pub struct UpdateUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique-constraint violation when the email is taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, email_verified_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(data.name)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.email_verified_at)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address, case-insensitively
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");

        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Updates a user, returning the new row, or None when it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = $2,
                email = $3,
                password_hash = COALESCE($4, password_hash),
                email_verified_at = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(data.name)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.email_verified_at)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a user
    ///
    /// References from projects and tasks are set to NULL by the ON DELETE
    /// SET NULL constraints.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users filtered, sorted, and paginated
    pub async fn list(
        pool: &PgPool,
        filter: &UserFilter,
        sort: Sort<UserSortField>,
        page: u32,
    ) -> Result<Page<Self>, sqlx::Error> {
        const MATCH: &str = r#"
            WHERE ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%')
              AND ($2::TEXT IS NULL OR email ILIKE '%' || $2 || '%')
        "#;

        let count_sql = format!("SELECT COUNT(*) FROM users {MATCH}");
        let (total,): (i64,) = sqlx::query_as(&count_sql)
            .bind(&filter.name)
            .bind(&filter.email)
            .fetch_one(pool)
            .await?;

        let page_sql = format!(
            "SELECT {COLUMNS} FROM users {MATCH} ORDER BY {} LIMIT $3 OFFSET $4",
            sort.order_by()
        );
        let rows = sqlx::query_as::<_, User>(&page_sql)
            .bind(&filter.name)
            .bind(&filter.email)
            .bind(PER_PAGE)
            .bind(listing::offset(page))
            .fetch_all(pool)
            .await?;

        Ok(Page::new(rows, page, total))
    }

    /// All users ordered by name ascending, for form dropdowns
    pub async fn all_ordered_by_name(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM users ORDER BY name ASC");

        sqlx::query_as::<_, User>(&sql).fetch_all(pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_allow_list() {
        assert_eq!(UserSortField::parse("email"), Some(UserSortField::Email));
        assert_eq!(UserSortField::parse("password_hash"), None);
        assert_eq!(UserSortField::parse("due_date"), None);
    }

    #[test]
    fn test_default_sort_field_is_created_at() {
        assert_eq!(UserSortField::default(), UserSortField::CreatedAt);
    }

    #[test]
    fn test_update_without_password_keeps_hash_column_out() {
        let update = UpdateUser {
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            password_hash: None,
            email_verified_at: Some(Utc::now()),
        };
        assert!(update.password_hash.is_none());
    }
}
