/// User CRUD endpoints
///
/// Users carry no image; create and update are plain JSON. Passwords are
/// hashed with Argon2id, and an update only re-hashes when a non-empty
/// password was submitted; an absent or empty password field leaves the
/// stored hash untouched.
///
/// # Endpoints
///
/// - `GET /v1/users` - Filtered/sorted/paginated listing
/// - `POST /v1/users` - Create
/// - `GET /v1/users/:id` - Show
/// - `PUT /v1/users/:id` - Update
/// - `DELETE /v1/users/:id` - Delete

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use taskhub_shared::auth::password;
use taskhub_shared::listing::ListParams;
use taskhub_shared::models::user::{CreateUser, UpdateUser, User, UserFilter, UserSortField};

use crate::app::{AppState, AuthContext};
use crate::error::{ApiError, ApiResult, ValidationErrorDetail};
use crate::routes::{Listing, MessageResponse, MutationResponse};

/// Serialized user; the password hash never leaves the server
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            email_verified_at: user.email_verified_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Update user request
///
/// `password` may be omitted or sent empty; both leave the stored hash
/// unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    pub password: Option<String>,
}

fn check_password_strength(password: &str) -> Result<(), ApiError> {
    password::validate_password_strength(password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })
}

/// Listing endpoint
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Listing<UserResponse>>> {
    let filter = UserFilter {
        name: params.name().map(str::to_string),
        email: params.email().map(str::to_string),
    };
    let sort = params.sort::<UserSortField>()?;

    let page = User::list(&state.db, &filter, sort, params.page()).await?;

    Ok(Json(Listing::new(page.map(UserResponse::from), params)))
}

/// Create endpoint
pub async fn store(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<MutationResponse<UserResponse>>)> {
    req.validate()?;
    check_password_strength(&req.password)?;

    let password_hash = password::hash_password(&req.password)?;

    // There is no verification flow; accounts start out verified
    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
            email_verified_at: Some(Utc::now()),
        },
    )
    .await?;

    tracing::info!(new_user_id = %user.id, user_id = %auth.user_id, "User created");

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            message: "User was created".to_string(),
            data: user.into(),
        }),
    ))
}

/// Show endpoint
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;

    Ok(Json(user.into()))
}

/// Update endpoint
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<MutationResponse<UserResponse>>> {
    req.validate()?;

    // Only a non-empty submission replaces the stored hash
    let password_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(plaintext) => {
            check_password_strength(plaintext)?;
            Some(password::hash_password(plaintext)?)
        }
        None => None,
    };

    let user = User::update(
        &state.db,
        id,
        UpdateUser {
            name: req.name,
            email: req.email,
            password_hash,
            email_verified_at: Some(Utc::now()),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;

    tracing::info!(updated_user_id = %user.id, user_id = %auth.user_id, "User updated");

    Ok(Json(MutationResponse {
        message: format!("User \"{}\" was updated", user.name),
        data: user.into(),
    }))
}

/// Delete endpoint
pub async fn destroy(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;

    let name = user.name.clone();

    User::delete(&state.db, id).await?;

    tracing::info!(deleted_user_id = %id, user_id = %auth.user_id, "User deleted");

    Ok(Json(MessageResponse {
        message: format!("User \"{}\" was deleted", name),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_validation() {
        let valid = CreateUserRequest {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            password: "MyPassw0rd".to_string(),
        };
        assert!(valid.validate().is_ok());

        let invalid = CreateUserRequest {
            name: "".to_string(),
            email: "not-an-email".to_string(),
            password: "MyPassw0rd".to_string(),
        };
        let errors = invalid.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_update_request_password_is_optional() {
        let json = r#"{"name": "Jane", "email": "jane@example.com"}"#;
        let req: UpdateUserRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.password, None);

        let json = r#"{"name": "Jane", "email": "jane@example.com", "password": ""}"#;
        let req: UpdateUserRequest = serde_json::from_str(json).unwrap();
        // Present-but-empty must behave like absent
        assert_eq!(req.password.as_deref().filter(|p| !p.is_empty()), None);
    }

    #[test]
    fn test_response_hides_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            email_verified_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password"));
    }
}
