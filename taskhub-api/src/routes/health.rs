/// Health endpoint
///
/// Reports liveness and database reachability for load balancers and deploy
/// checks. Always answers 200; a broken database shows up as a degraded
/// status rather than a failed request.

use axum::{extract::State, Json};
use serde::Serialize;

use taskhub_shared::db::pool;

use crate::app::AppState;

/// Health report for the service and its database
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,

    /// Version of the running binary
    pub version: &'static str,

    pub database: &'static str,
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_ok = pool::health_check(&state.db).await.is_ok();

    Json(HealthResponse {
        status: if database_ok { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database: if database_ok { "connected" } else { "disconnected" },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            version: "0.1.0",
            database: "connected",
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"], "connected");
    }
}
