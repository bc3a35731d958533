use super::error::ApiError;
use super::ServerState;
use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::Uri;
use axum::response::Json;
use axum::routing::{get, post};
use axum::{Form, Router};
use cddajb_core::{auth, StoreError, VERSION};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

type Shared = Arc<ServerState>;
type ApiResult = Result<Json<Value>, ApiError>;

/// Build the axum router with every backend endpoint.
pub fn build_router(state: Shared) -> Router {
    Router::new()
        .route("/update", post(update))
        .route("/status", get(status))
        .route("/types", get(types))
        .route("/search/:query", get(search))
        .route("/list/:key/:id", get(list))
        .route("/blobs/:type/:id", get(blobs))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct UpdateParams {
    pass: Option<String>,
    msg: Option<String>,
}

fn success(data: &Value) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

fn ensure_ready(state: &ServerState) -> Result<(), ApiError> {
    if state.app.store.is_ready() {
        Ok(())
    } else {
        Err(StoreError::NotReady.into())
    }
}

/// Answer from the response cache, computing and storing on a miss.
fn cached<F>(state: &ServerState, uri: &Uri, compute: F) -> ApiResult
where
    F: FnOnce() -> Result<Value, ApiError>,
{
    let key = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let data = state
        .app
        .cache
        .try_get_or_compute(key, || compute().map(Arc::new))?;
    Ok(success(&data))
}

async fn update(
    State(state): State<Shared>,
    params: Result<Form<UpdateParams>, FormRejection>,
) -> ApiResult {
    let params = params.map(|Form(p)| p).unwrap_or_default();
    auth::verify_secret(
        state.app.config.server.password.as_deref(),
        params.pass.as_deref(),
    )?;

    if !state.app.store.rebuild(params.msg.as_deref()) {
        return Err(ApiError::UpdateRejected);
    }
    info!(note = ?params.msg, "Rebuild triggered over HTTP");
    Ok(success(&json!("Update started.")))
}

async fn status(State(state): State<Shared>) -> ApiResult {
    let store = &state.app.store;
    Ok(success(&json!({
        "logs": store.logs(),
        "version": VERSION,
        "ready": store.is_ready(),
        "cache": state.app.cache.stats(),
    })))
}

async fn types(State(state): State<Shared>, uri: Uri) -> ApiResult {
    cached(&state, &uri, || Ok(json!(state.app.store.types())))
}

async fn search(State(state): State<Shared>, Path(query): Path<String>, uri: Uri) -> ApiResult {
    ensure_ready(&state)?;
    cached(&state, &uri, || {
        let hits = state.app.store.search(&query)?;
        Ok(serde_json::to_value(hits)?)
    })
}

async fn list(
    State(state): State<Shared>,
    Path((key, id)): Path<(String, String)>,
    uri: Uri,
) -> ApiResult {
    ensure_ready(&state)?;
    cached(&state, &uri, || {
        let users = state.app.store.list_other(&key, &id)?;
        Ok(serde_json::to_value(users)?)
    })
}

async fn blobs(
    State(state): State<Shared>,
    Path((type_name, id)): Path<(String, String)>,
    uri: Uri,
) -> ApiResult {
    ensure_ready(&state)?;
    cached(&state, &uri, || {
        let snapshot = state.app.store.snapshot()?;
        let blobs = snapshot.get(&type_name, &id)?;

        let mut out = Vec::with_capacity(blobs.len());
        for blob in blobs {
            let text = serde_json::to_string_pretty(&blob.data)?;
            out.push(json!({
                "blob": state.linker.decorate(&text, &snapshot),
                "source": blob.source,
            }));
        }
        Ok(Value::Array(out))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use cddajb_core::{Config, RebuildListener, RebuildSummary};
    use std::fs;
    use std::sync::Barrier;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    const WAIT: Duration = Duration::from_secs(30);

    fn fixture() -> (TempDir, Shared) {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("json");
        fs::create_dir_all(&json).unwrap();
        fs::write(
            json.join("items.json"),
            r#"[
                {"type":"TOOL","id":"knife","name":"knife"},
                {"type":"TOOL","id":"hammer"},
                {"type":"recipe","result":"spear","components":[["stick",1]],"tools":[["knife",-1]]}
            ]"#,
        )
        .unwrap();

        let mut config = Config::for_root(dir.path());
        config.server.password = Some("hunter2".to_string());
        let app = App::new(config).unwrap();
        app.store.start_rebuild(None).unwrap().wait_timeout(WAIT).unwrap();

        (dir, Arc::new(ServerState::new(app).unwrap()))
    }

    async fn get_json(router: Router, uri: &str) -> Value {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn post_update(router: Router, form: &str) -> Value {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/update")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn error_of(body: &Value) -> &str {
        assert_eq!(body["success"], false);
        body["error"].as_str().unwrap()
    }

    #[tokio::test]
    async fn test_types() {
        let (_dir, state) = fixture();
        let body = get_json(build_router(state), "/types").await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], json!(["TOOL", "recipe"]));
    }

    #[tokio::test]
    async fn test_search() {
        let (_dir, state) = fixture();
        let body = get_json(build_router(state), "/search/KNI").await;
        assert_eq!(body["data"], json!([{"id": "knife", "types": ["TOOL"]}]));
    }

    #[tokio::test]
    async fn test_bad_pattern_envelope() {
        let (_dir, state) = fixture();
        let body = get_json(build_router(state), "/search/%5B").await;
        let error = error_of(&body);
        assert!(error.starts_with('#'));
        assert!(error.contains("BadPattern"));
    }

    #[tokio::test]
    async fn test_list_references() {
        let (_dir, state) = fixture();
        let body = get_json(build_router(state.clone()), "/list/tools/knife").await;
        assert_eq!(body["data"], json!([{"id": "spear", "types": ["recipe"]}]));

        let body = get_json(build_router(state.clone()), "/list/components/knife").await;
        assert_eq!(body["data"], json!([]));

        let body = get_json(build_router(state), "/list/tools/rock").await;
        assert!(error_of(&body).contains("ReferenceNotFound"));
    }

    #[tokio::test]
    async fn test_blobs_are_decorated() {
        let (_dir, state) = fixture();
        let body = get_json(build_router(state.clone()), "/blobs/recipe/spear").await;

        let blobs = body["data"].as_array().unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0]["source"], "json/items.json");
        let text = blobs[0]["blob"].as_str().unwrap();
        assert!(text.contains(r#""knife" <span class="types">"#));

        let body = get_json(build_router(state), "/blobs/TOOL/axe").await;
        assert!(error_of(&body).contains("IdNotFound"));
    }

    #[tokio::test]
    async fn test_responses_are_cached_errors_are_not() {
        let (_dir, state) = fixture();

        get_json(build_router(state.clone()), "/types").await;
        get_json(build_router(state.clone()), "/types").await;
        get_json(build_router(state.clone()), "/blobs/TOOL/axe").await;
        get_json(build_router(state.clone()), "/blobs/TOOL/axe").await;

        let stats = state.app.cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 3);
        assert!(!state.app.cache.contains("/blobs/TOOL/axe"));
    }

    #[tokio::test]
    async fn test_status() {
        let (_dir, state) = fixture();
        let body = get_json(build_router(state), "/status").await;

        let data = &body["data"];
        assert_eq!(data["version"], VERSION);
        assert_eq!(data["ready"], true);
        assert_eq!(data["logs"].as_array().unwrap().len(), 1);
        assert_eq!(data["cache"]["capacity"], 128);
    }

    #[tokio::test]
    async fn test_update_requires_password() {
        let (_dir, state) = fixture();

        let body = post_update(build_router(state.clone()), "pass=wrong").await;
        assert!(error_of(&body).contains("Forbidden"));

        let body = post_update(build_router(state.clone()), "pass=hunter2&msg=v1.0").await;
        assert_eq!(body["data"], "Update started.");
    }

    /// Holds the rebuild at its start until the test releases it.
    struct Gate(Barrier);

    impl RebuildListener for Gate {
        fn on_rebuild_started(&self) {
            self.0.wait();
            self.0.wait();
        }

        fn on_rebuilt(&self, _summary: &RebuildSummary) {}
    }

    #[tokio::test]
    async fn test_reads_gated_during_rebuild() {
        let (_dir, state) = fixture();
        let gate = Arc::new(Gate(Barrier::new(2)));
        state.app.store.add_listener(gate.clone());

        let handle = state.app.store.start_rebuild(None).unwrap();
        gate.0.wait();

        let body = get_json(build_router(state.clone()), "/search/knife").await;
        assert!(error_of(&body).contains("NotReady"));
        let body = get_json(build_router(state.clone()), "/types").await;
        assert_eq!(body["success"], true);
        let body = get_json(build_router(state.clone()), "/status").await;
        assert_eq!(body["data"]["ready"], false);
        let body = post_update(build_router(state.clone()), "pass=hunter2").await;
        assert!(error_of(&body).contains("UpdateRejected"));

        gate.0.wait();
        handle.wait_timeout(WAIT).unwrap();

        let body = get_json(build_router(state), "/search/knife").await;
        assert_eq!(body["success"], true);
    }
}
