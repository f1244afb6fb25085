//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/api/analyze-documents` | Extract discovery fields from uploads |
//! | `POST` | `/api/generate-artifacts` | Generate the artifact bundle |
//! | `GET`  | `/api/engagements` | Saved engagements, newest first |
//! | `POST` | `/api/engagements` | Save (upsert) an engagement |
//! | `GET`  | `/api/engagements/{id}` | One engagement |
//! | `DELETE` | `/api/engagements/{id}` | Delete an engagement |
//! | `GET`  | `/api/engagements/{id}/export` | Export document download |
//! | `GET`  | `/api/engagements/{id}/diagrams/{kind}` | SVG download |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "rate_limited", "message": "..." },
//!   "statusCode": 429, "headers": { "retry-after": "30" }, "raw": "..." }
//! ```
//!
//! `statusCode`, `headers` and `raw` are only present for upstream failures
//! (and `raw` for malformed model output).

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::AppError;
use crate::export::ExportDocument;
use crate::gateway::ModelGateway;
use crate::models::{
    ArtifactBundle, DiscoveryRecord, EngagementRecord, ExtractedDiscovery, IncomingFile,
};
use crate::store::{open_store, EngagementStore};
use crate::svg::DiagramKind;

/// Shared state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ModelGateway>,
    pub store: Arc<dyn EngagementStore>,
}

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let gateway = ModelGateway::from_config(&config.model)?;
    let store = open_store(config).await?;
    let state = AppState {
        gateway: Arc::new(gateway),
        store,
    };
    let app = router(state, body_limit(config.model.effective_upload_max_bytes()));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("EA Discovery listening on http://{}", listener.local_addr()?);
    tracing::info!(bind = %config.server.bind, "server started");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Request body ceiling: the base64 form of `upload_max_bytes` plus room
/// for the JSON envelope, so oversized uploads reach the size guard and get
/// its 413 message.
pub fn body_limit(upload_max_bytes: u64) -> usize {
    let encoded = upload_max_bytes.saturating_mul(4).div_ceil(3);
    usize::try_from(encoded.saturating_mul(2)).unwrap_or(usize::MAX)
}

pub fn router(state: AppState, body_limit: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/analyze-documents", post(handle_analyze))
        .route("/api/generate-artifacts", post(handle_generate))
        .route("/api/engagements", get(handle_list).post(handle_save))
        .route(
            "/api/engagements/{id}",
            get(handle_get).delete(handle_delete),
        )
        .route("/api/engagements/{id}/export", get(handle_export))
        .route("/api/engagements/{id}/diagrams/{kind}", get(handle_diagram))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error: ErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<&'a BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<&'a str>,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let upstream = self.upstream();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
            status_code: upstream.map(|u| u.status),
            headers: upstream.map(|u| &u.headers),
            raw: self.raw(),
        };
        (status, Json(body)).into_response()
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Model calls ============

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    files: Vec<IncomingFile>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    extracted_data: ExtractedDiscovery,
}

async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let extracted_data = state.gateway.analyze_documents(&req.files).await?;
    Ok(Json(AnalyzeResponse { extracted_data }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    discovery_data: DiscoveryRecord,
}

#[derive(Serialize)]
struct GenerateResponse {
    artifacts: ArtifactBundle,
}

async fn handle_generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let artifacts = state.gateway.generate_artifacts(&req.discovery_data).await?;
    Ok(Json(GenerateResponse { artifacts }))
}

// ============ Engagements ============

/// Body of `POST /api/engagements`. A missing id creates a new engagement.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveRequest {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    discovery_data: DiscoveryRecord,
    #[serde(default)]
    artifacts: Option<ArtifactBundle>,
}

async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<EngagementRecord>>, AppError> {
    Ok(Json(state.store.list().await?))
}

async fn handle_save(
    State(state): State<AppState>,
    Json(req): Json<SaveRequest>,
) -> Result<Json<EngagementRecord>, AppError> {
    let id = req
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let record =
        EngagementRecord::from_discovery(id, Utc::now(), &req.discovery_data, req.artifacts);
    state.store.upsert(&record).await?;
    tracing::info!(id = %record.id, "engagement saved");
    Ok(Json(record))
}

async fn load(state: &AppState, id: &str) -> Result<EngagementRecord, AppError> {
    state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("engagement not found: {}", id)))
}

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EngagementRecord>, AppError> {
    Ok(Json(load(&state, &id).await?))
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.store.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("engagement not found: {}", id)))
    }
}

/// `filename` comes from [`file_stem`](crate::export::file_stem), which
/// leaves no quotes, separators or control characters in it.
fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename)
}

async fn handle_export(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let record = load(&state, &id).await?;
    let document = ExportDocument::from_record(&record);
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| AppError::Persistence(format!("export encoding: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, attachment(&document.filename())),
        ],
        json,
    )
        .into_response())
}

async fn handle_diagram(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let kind: DiagramKind = kind.parse().map_err(AppError::BadRequest)?;
    let record = load(&state, &id).await?;
    let discovery = record.discovery();
    let svg = record
        .artifacts
        .as_ref()
        .and_then(|artifacts| kind.render(artifacts, &discovery))
        .ok_or_else(|| AppError::NotFound(format!("no {} diagram for engagement {}", kind, id)))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml".to_string()),
            (
                header::CONTENT_DISPOSITION,
                attachment(&kind.filename(&discovery.company_name)),
            ),
        ],
        svg,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamResponse;
    use crate::gateway::testing::{gateway, QueuedReplies};
    use crate::store::MemoryStore;
    use serde_json::{json, Value};

    struct TestServer {
        base: String,
        replies: Arc<QueuedReplies>,
        client: reqwest::Client,
    }

    async fn spawn() -> TestServer {
        let replies = Arc::new(QueuedReplies::default());
        let state = AppState {
            gateway: Arc::new(gateway(replies.clone())),
            store: Arc::new(MemoryStore::new()),
        };
        let app = router(state, body_limit(16_000_000));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        TestServer {
            base: format!("http://{}", addr),
            replies,
            client: reqwest::Client::new(),
        }
    }

    impl TestServer {
        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base, path)
        }
    }

    #[test]
    fn upstream_errors_carry_status_headers_and_raw() {
        let mut headers = BTreeMap::new();
        headers.insert("retry-after".to_string(), "30".to_string());
        let err = AppError::RateLimited(UpstreamResponse {
            status: 429,
            headers,
            raw: "slow down".into(),
        });
        let upstream = err.upstream();
        let body = ErrorBody {
            error: ErrorDetail {
                code: err.code().into(),
                message: err.to_string(),
            },
            status_code: upstream.map(|u| u.status),
            headers: upstream.map(|u| &u.headers),
            raw: err.raw(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["error"]["code"], "rate_limited");
        assert_eq!(value["statusCode"], 429);
        assert_eq!(value["headers"]["retry-after"], "30");
        assert_eq!(value["raw"], "slow down");
    }

    #[test]
    fn body_limit_leaves_room_for_base64() {
        assert!(body_limit(16_000_000) > 21_333_334);
    }

    #[tokio::test]
    async fn health_reports_version() {
        let server = spawn().await;
        let body: Value = server
            .client
            .get(server.url("/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn analyze_returns_extracted_data() {
        let server = spawn().await;
        server
            .replies
            .push_text("```json\n{\"companyName\": \"Acme\", industry: 'Retail',}\n```");
        let resp = server
            .client
            .post(server.url("/api/analyze-documents"))
            .json(&json!({"files": [{"id": "1", "name": "a.txt", "type": "text/plain", "base64Data": "aGVsbG8="}]}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["extractedData"]["companyName"], "Acme");
        assert_eq!(body["extractedData"]["industry"], "Retail");
    }

    #[tokio::test]
    async fn oversized_upload_is_413_without_model_call() {
        let server = spawn().await;
        // 12 MB of base64 per file, two files: ~18 MB decoded.
        let data = "A".repeat(12_000_000);
        let resp = server
            .client
            .post(server.url("/api/analyze-documents"))
            .json(&json!({"files": [
                {"name": "a.pdf", "type": "application/pdf", "base64Data": data},
                {"name": "b.pdf", "type": "application/pdf", "base64Data": data}
            ]}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 413);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "payload_too_large");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Limit is 15625 KB"));
        assert_eq!(server.replies.calls(), 0);
    }

    #[tokio::test]
    async fn rate_limit_surfaces_upstream_details() {
        let server = spawn().await;
        server.replies.push_status(429, "{\"error\":\"rate_limit\"}");
        let resp = server
            .client
            .post(server.url("/api/generate-artifacts"))
            .json(&json!({"discoveryData": {"companyName": "Acme"}}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 429);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["statusCode"], 429);
        assert_eq!(body["raw"], "{\"error\":\"rate_limit\"}");
    }

    #[tokio::test]
    async fn engagement_lifecycle() {
        let server = spawn().await;
        server.replies.push_text(
            &json!({
                "capabilityMap": {"businessDrivers": ["Growth"]},
                "prioritizationMatrix": [{"priority": 1, "initiative": "Deploy CRM", "businessValue": "High", "effort": "Low"}],
                "strategicRoadmap": []
            })
            .to_string(),
        );
        let generated: Value = server
            .client
            .post(server.url("/api/generate-artifacts"))
            .json(&json!({"discoveryData": {"companyName": "Acme Corp"}}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let saved: Value = server
            .client
            .post(server.url("/api/engagements"))
            .json(&json!({
                "discoveryData": {"companyName": "Acme Corp", "industry": "Retail"},
                "artifacts": generated["artifacts"]
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = saved["id"].as_str().unwrap().to_string();
        assert_eq!(saved["company_name"], "Acme Corp");

        let list: Value = server
            .client
            .get(server.url("/api/engagements"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(list.as_array().unwrap().len(), 1);

        let export = server
            .client
            .get(server.url(&format!("/api/engagements/{id}/export")))
            .send()
            .await
            .unwrap();
        assert_eq!(
            export.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Acme-Corp.json\""
        );
        let export: Value = export.json().await.unwrap();
        assert_eq!(export["project"], "Acme Corp");
        assert_eq!(export["discoveryData"]["industry"], "Retail");

        let svg = server
            .client
            .get(server.url(&format!(
                "/api/engagements/{id}/diagrams/prioritization-matrix"
            )))
            .send()
            .await
            .unwrap();
        assert_eq!(svg.status(), 200);
        assert_eq!(svg.headers()[header::CONTENT_TYPE], "image/svg+xml");
        assert_eq!(
            svg.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Acme-Corp-prioritization-matrix.svg\""
        );
        let markup = svg.text().await.unwrap();
        assert!(markup.contains(r#"cx="950" cy="750""#), "{markup}");

        let bad_kind = server
            .client
            .get(server.url(&format!("/api/engagements/{id}/diagrams/pie-chart")))
            .send()
            .await
            .unwrap();
        assert_eq!(bad_kind.status(), 400);

        let deleted = server
            .client
            .delete(server.url(&format!("/api/engagements/{id}")))
            .send()
            .await
            .unwrap();
        assert_eq!(deleted.status(), 204);

        let missing = server
            .client
            .get(server.url(&format!("/api/engagements/{id}")))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 404);
        let body: Value = missing.json().await.unwrap();
        assert_eq!(body["error"]["code"], "not_found");
        assert!(body.get("statusCode").is_none());
    }

    #[tokio::test]
    async fn download_names_are_sanitized() {
        let server = spawn().await;
        let saved: Value = server
            .client
            .post(server.url("/api/engagements"))
            .json(&json!({
                "discoveryData": {"companyName": "Evil\"\r\nCo/.."},
                "artifacts": {}
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = saved["id"].as_str().unwrap();

        let export = server
            .client
            .get(server.url(&format!("/api/engagements/{id}/export")))
            .send()
            .await
            .unwrap();
        assert_eq!(export.status(), 200);
        assert_eq!(
            export.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Evil-Co-.json\""
        );

        let svg = server
            .client
            .get(server.url(&format!("/api/engagements/{id}/diagrams/roadmap")))
            .send()
            .await
            .unwrap();
        assert_eq!(svg.status(), 200);
        assert_eq!(
            svg.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Evil-Co--roadmap.svg\""
        );
    }

    #[tokio::test]
    async fn diagram_without_artifacts_is_404() {
        let server = spawn().await;
        let saved: Value = server
            .client
            .post(server.url("/api/engagements"))
            .json(&json!({"discoveryData": {"companyName": "Acme"}}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = saved["id"].as_str().unwrap();
        let resp = server
            .client
            .get(server.url(&format!("/api/engagements/{id}/diagrams/roadmap")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }
}
