use std::net::SocketAddr;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth, calendar,
    config::AppConfig,
    error::{method_not_allowed, not_found},
    response::Envelope,
    state::AppState,
    subtasks, todos,
};

#[derive(Debug, Serialize)]
pub struct Health {
    pub database: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<Envelope<Health>> {
    let database = if state.db.is_ready() { "ready" } else { "pending" };
    Json(Envelope::data(Health { database }))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(todos::router())
                .merge(subtasks::router())
                .merge(calendar::router())
                .route("/health", get(health).fallback(method_not_allowed)),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
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

/// Binds `APP_HOST:APP_PORT` and serves until ctrl-c.
pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = call(build_app(AppState::fake()), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "data": { "database": "pending" } }));
    }

    #[tokio::test]
    async fn protected_routes_need_a_bearer_token() {
        for uri in ["/api/me", "/api/todos?date=2024-05-01", "/api/calendar?month=2024-05"] {
            let (status, body) = call(build_app(AppState::fake()), get(uri)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["ok"], json!(false));
        }
    }

    #[tokio::test]
    async fn forged_token_is_rejected() {
        let req = Request::builder()
            .uri("/api/me")
            .header(header::AUTHORIZATION, "Bearer not.a.jwt")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(build_app(AppState::fake()), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], json!("invalid or expired token"));
    }

    #[tokio::test]
    async fn me_answers_from_token_claims() {
        let state = AppState::fake();
        let token = state.jwt.issue(42, "me@example.com").unwrap();
        let req = Request::builder()
            .uri("/api/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        // the fake pool never connects, so this only passes without a db lookup
        let (status, body) = call(build_app(state), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "data": { "id": 42, "email": "me@example.com" } }));
    }

    #[tokio::test]
    async fn wrong_method_is_405_envelope() {
        let (status, body) = call(build_app(AppState::fake()), get("/api/auth/login")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({ "ok": false, "error": "method not allowed" }));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/calendar")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(build_app(AppState::fake()), req).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn unknown_path_is_404_envelope() {
        let (status, body) = call(build_app(AppState::fake()), get("/api/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["ok"], json!(false));
    }

    #[tokio::test]
    async fn register_validates_before_touching_the_database() {
        let app = || build_app(AppState::fake());

        let (status, body) = call(app(), json_req(Method::POST, "/api/auth/register", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], json!(false));

        let bad_email = r#"{"email":"nope","password":"secret1"}"#;
        let (status, _) = call(app(), json_req(Method::POST, "/api/auth/register", bad_email)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let short = r#"{"email":"a@b.com","password":"12345"}"#;
        let (status, _) = call(app(), json_req(Method::POST, "/api/auth/register", short)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn todo_payloads_are_validated_before_the_database() {
        let state = AppState::fake();
        let token = state.jwt.issue(1, "a@b.com").unwrap();
        let authed = |method: Method, uri: &str, body: &str| {
            let mut req = json_req(method, uri, body);
            req.headers_mut()
                .insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
            req
        };

        let cases = [
            authed(Method::GET, "/api/todos", ""),
            authed(Method::GET, "/api/calendar?month=2024-13", ""),
            authed(Method::POST, "/api/todos", r#"{"title":" ","date":"2024-05-01","groupId":"g"}"#),
            authed(Method::PATCH, "/api/todos", r#"{"id":1.5}"#),
            authed(Method::DELETE, "/api/subtasks", ""),
        ];
        for req in cases {
            let uri = req.uri().to_string();
            let (status, body) = call(build_app(state.clone()), req).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["ok"], json!(false));
        }
    }

    #[tokio::test]
    async fn register_and_login_end_to_end() {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            return;
        };
        use crate::{auth::JwtKeys, config::DatabaseSettings, db::Database};
        use std::{sync::Arc, time::Duration};

        let mut config = (*AppState::fake().config).clone();
        config.database = DatabaseSettings {
            url: Some(url.clone()),
            url_source: Some("TEST_DATABASE_URL"),
            direct_url: Some(url),
            max_connections: 4,
            max_lifetime: Duration::from_secs(60),
            acquire_timeout: Duration::from_secs(10),
        };
        let jwt = JwtKeys::new(&config.jwt);
        let db = Arc::new(Database::new(config.database.clone()));
        let state = AppState::from_parts(db, jwt, Arc::new(config));

        let email = format!("e2e-{}@example.com", std::process::id());
        let creds = json!({ "email": email, "password": "secret1" }).to_string();

        let (status, body) =
            call(build_app(state.clone()), json_req(Method::POST, "/api/auth/register", &creds)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let id = body["data"]["id"].as_i64().unwrap();

        let (status, _) =
            call(build_app(state.clone()), json_req(Method::POST, "/api/auth/register", &creds)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let wrong = json!({ "email": email, "password": "wrong-pass" }).to_string();
        let (status, body) =
            call(build_app(state.clone()), json_req(Method::POST, "/api/auth/login", &wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], json!("invalid credentials"));

        let (status, body) =
            call(build_app(state.clone()), json_req(Method::POST, "/api/auth/login", &creds)).await;
        assert_eq!(status, StatusCode::OK);
        let claims = state.jwt.verify(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.user_id, id);
        assert_eq!(claims.email, email);

        state.db.close().await;
    }
}
