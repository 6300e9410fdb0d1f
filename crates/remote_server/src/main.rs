use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{RemoteEntry, REMOTE_ENTRY_PATH},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

#[derive(Clone)]
struct AppState {
    entry: Arc<RemoteEntry>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings()?;
    let entry = settings.remote_entry()?;
    info!(
        remote = %entry.name,
        exposes = ?entry.exposes.keys().collect::<Vec<_>>(),
        shared = entry.shared.len(),
        "publishing remote entry"
    );

    let app = build_router(AppState {
        entry: Arc::new(entry),
    });

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, path = REMOTE_ENTRY_PATH, "remote server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(REMOTE_ENTRY_PATH, get(remote_entry))
        .fallback(not_found)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn remote_entry(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-cache")],
        Json(state.entry.as_ref().clone()),
    )
}

async fn not_found() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(ErrorCode::NotFound, "no such route")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body, body::Body, http::Request};
    use shared::protocol::{ComponentKind, ExposedModule, SharedDependencySpec};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let entry = RemoteEntry {
            name: "cart".into(),
            exposes: [(
                "./CartApp".to_string(),
                ExposedModule {
                    component: ComponentKind::Cart,
                },
            )]
            .into_iter()
            .collect(),
            shared: vec![SharedDependencySpec::new(
                "react",
                semver::VersionReq::parse("^18.2.0").expect("range"),
            )
            .singleton()],
        };
        build_router(AppState {
            entry: Arc::new(entry),
        })
    }

    #[tokio::test]
    async fn serves_remote_entry_manifest() {
        let request = Request::get(REMOTE_ENTRY_PATH)
            .body(Body::empty())
            .expect("request");
        let response = test_app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some("no-cache")
        );

        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let entry: RemoteEntry = serde_json::from_slice(&bytes).expect("entry json");
        assert_eq!(entry.name, "cart");
        assert!(entry.exposes.contains_key("./CartApp"));
        assert_eq!(entry.shared[0].key, "react");
    }

    #[tokio::test]
    async fn cross_origin_hosts_may_fetch_the_entry() {
        let request = Request::get(REMOTE_ENTRY_PATH)
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .expect("request");
        let response = test_app().oneshot(request).await.expect("response");
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let request = Request::get("/healthz").body(Body::empty()).expect("request");
        let response = test_app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_returns_json_not_found() {
        let request = Request::get("/remoteEntry.js")
            .body(Body::empty())
            .expect("request");
        let response = test_app().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let error: ApiError = serde_json::from_slice(&bytes).expect("error json");
        assert_eq!(error.code, ErrorCode::NotFound);
    }
}
