use std::net::SocketAddr;

use axum::{
    http::{Request, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Span;

use crate::{auth, categories, config::AppConfig, expenses, state::AppState, summaries};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(categories::router())
                .merge(expenses::router())
                .merge(summaries::router())
                .route("/health", get(health)),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &Response<_>, latency: std::time::Duration, span: &Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::StatusCode,
    };
    use tower::ServiceExt;

    async fn call(req: Request<Body>) -> (StatusCode, Value) {
        let app = build_app(AppState::fake());
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = call(
            Request::get("/api/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        for uri in [
            "/api/expenses",
            "/api/categories",
            "/api/dashboard",
            "/api/summaries/monthly",
            "/api/profile",
        ] {
            let (status, body) = call(Request::get(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["error"], "unauthorized", "{uri}");
            assert_eq!(body["status_code"], 401, "{uri}");
        }
    }

    #[tokio::test]
    async fn malformed_bearer_is_invalid_token() {
        let req = Request::get("/api/expenses")
            .header("authorization", "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_token");
    }

    #[tokio::test]
    async fn registration_validates_before_the_datastore() {
        let req = Request::post("/api/register")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"name":"Ann","email":"not-an-email","password":"password123"}"#,
            ))
            .unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
    }

    #[tokio::test]
    async fn missing_json_field_is_a_validation_error() {
        let req = Request::post("/api/register")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"Ann","email":"ann@x.com"}"#))
            .unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
        assert_eq!(body["status_code"], 400);
        assert!(body["message"].as_str().unwrap().contains("password"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let req = Request::post("/api/login")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a PostgreSQL DATABASE_URL"]
    async fn non_uuid_expense_id_is_a_validation_error(pool: sqlx::PgPool) {
        use crate::auth::{
            dto::{LoginRequest, RegisterRequest},
            jwt::JwtKeys,
            services,
        };

        let state = AppState {
            db: pool.clone(),
            config: AppState::fake().config,
        };
        let keys = JwtKeys::from_config(&state.config.jwt);
        services::register(
            &pool,
            RegisterRequest {
                name: "Ann".into(),
                email: "ann@x.com".into(),
                password: "password123".into(),
            },
        )
        .await
        .unwrap();
        let login = services::login(
            &pool,
            &keys,
            LoginRequest {
                email: "ann@x.com".into(),
                password: "password123".into(),
            },
        )
        .await
        .unwrap();

        let req = Request::put("/api/expenses/not-a-uuid")
            .header("authorization", format!("Bearer {}", login.token))
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let res = build_app(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "validation_failed");
    }
}
