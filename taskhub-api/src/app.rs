/// Application state and router builder
///
/// This module defines the shared application state, the request auth
/// context, and the function assembling the axum router with all routes and
/// middleware.
///
/// # Router Layout
///
/// ```text
/// /
/// ├── /health                  # Health check (public)
/// ├── /storage/*               # Uploaded images (public, read-only)
/// └── /v1/                     # API v1
///     ├── /auth/               # register / login / refresh (public)
///     ├── /projects/           # Project CRUD (authenticated)
///     ├── /tasks/              # Task CRUD, /my, /options (authenticated)
///     └── /users/              # User CRUD (authenticated)
/// ```

use crate::config::Config;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::get,
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskhub_shared::auth::jwt;
use taskhub_shared::storage::ImageStore;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

/// Maximum multipart body size (covers the image upload)
const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Shared application state
///
/// Cloned for each request handler via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Image store for uploaded files
    pub images: ImageStore,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, images: ImageStore) -> Self {
        Self {
            db,
            config: Arc::new(config),
            images,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Identity of the authenticated user, injected into request extensions by
/// the JWT auth layer
///
/// Handlers receive it through `Extension<AuthContext>` instead of any
/// global current-user state, and stamp created_by/updated_by from it.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
}

/// Builds the complete axum router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    use crate::routes;
    use axum::routing::post;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::index).post(routes::projects::store),
        )
        .route(
            "/:id",
            get(routes::projects::show)
                .put(routes::projects::update)
                .delete(routes::projects::destroy),
        );

    let task_routes = Router::new()
        .route("/", get(routes::tasks::index).post(routes::tasks::store))
        .route("/my", get(routes::tasks::my_index))
        .route("/options", get(routes::tasks::options))
        .route(
            "/:id",
            get(routes::tasks::show)
                .put(routes::tasks::update)
                .delete(routes::tasks::destroy),
        );

    let user_routes = Router::new()
        .route("/", get(routes::users::index).post(routes::users::store))
        .route(
            "/:id",
            get(routes::users::show)
                .put(routes::users::update)
                .delete(routes::users::destroy),
        );

    // Resource routes require a valid access token
    let protected_routes = Router::new()
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/users", user_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    let v1_routes = Router::new().nest("/auth", auth_routes).merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .nest_service("/storage", ServeDir::new(state.images.root()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the Bearer token from the Authorization header,
/// then injects [`AuthContext`] into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        crate::error::ApiError::BadRequest("Expected Bearer token".to_string())
    })?;

    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
    });

    Ok(next.run(req).await)
}
