//! Route handlers for `/`, `/status`, and `/enhance`.
//!
//! [`build_router`] wires them into a [`Router`] together with the static file
//! fallback. The enhance handler is the only one that touches the
//! [`EnhancementGateway`]; it runs the gateway on the blocking thread pool so
//! a slow enhancement never stalls the I/O workers. A semaphore caps how many
//! of those runs exist at once, independently of the connection limit.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use facelift_core::{EnhanceParams, EnhancedImage, EnhancementGateway, GatewayError, ServerConfig};
use http::StatusCode;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::multipart::{self, extract_boundary, find_part};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::static_files::StaticFiles;

/// Shared state captured by the route handlers.
#[derive(Clone)]
pub struct AppState {
    /// The image pipeline.
    pub gateway: Arc<dyn EnhancementGateway>,
    /// Name reported by `/status`.
    pub server_name: String,
    /// Version reported by `/status`.
    pub version: String,
    /// Slots for in-flight gateway runs.
    pub enhance_permits: Arc<Semaphore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("server_name", &self.server_name)
            .field("version", &self.version)
            .field(
                "available_enhance_permits",
                &self.enhance_permits.available_permits(),
            )
            .finish_non_exhaustive()
    }
}

/// Build the application's route table.
#[must_use]
pub fn build_router(config: &ServerConfig, gateway: Arc<dyn EnhancementGateway>) -> Router {
    let static_files = StaticFiles::new(&config.web_root, config.default_document.as_str());
    let state = Arc::new(AppState {
        gateway,
        server_name: config.server_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        enhance_permits: Arc::new(Semaphore::new(config.max_concurrent_enhancements.max(1))),
    });

    let index = static_files.clone();
    let status_state = Arc::clone(&state);
    let enhance_state = state;

    Router::builder(static_files)
        .get("/", move |_request: Request| {
            let index = index.clone();
            async move { index.serve("/").await }
        })
        .get("/status", move |_request: Request| {
            let state = Arc::clone(&status_state);
            async move { handle_status(&state) }
        })
        .post("/enhance", move |request: Request| {
            let state = Arc::clone(&enhance_state);
            async move { handle_enhance(&state, request).await }
        })
        .build()
}

/// `GET /status`: liveness and identity.
#[must_use]
pub fn handle_status(state: &AppState) -> Response {
    Response::json(
        StatusCode::OK,
        &json!({
            "status": "ready",
            "server": state.server_name,
            "version": state.version,
        }),
    )
}

#[derive(Debug, Serialize)]
struct EnhanceReply {
    success: bool,
    enhanced_image: String,
    processing_time: f64,
    faces_detected: usize,
    timing: BTreeMap<String, f64>,
    metrics: Metrics,
}

#[derive(Debug, Serialize)]
struct Metrics {
    resolution: String,
    /// Achieved horizontal scale, output width over input width.
    scale_factor: f64,
}

/// `POST /enhance`: decode the uploaded image, run the pipeline, and return
/// the result as a data URL.
pub async fn handle_enhance(state: &AppState, request: Request) -> Response {
    let started = Instant::now();
    let content_type = request.header("Content-Type");

    let image = match multipart::extract_image(content_type, &request.body) {
        Ok(image) => image,
        Err(err) => {
            warn!(error = %err, "rejected enhance request");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let boundary = content_type.and_then(extract_boundary);
    let params = match read_params(&request, boundary.as_deref()) {
        Ok(params) => params,
        Err(err) => {
            warn!(error = %err, "rejected enhance parameters");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    info!(
        bytes = image.len(),
        mode = %params.mode,
        scale = params.scale_factor,
        "enhancing image"
    );

    // The permit travels with the blocking task: a dispatch timeout drops this
    // future, not the pipeline run.
    let permit = match Arc::clone(&state.enhance_permits).acquire_owned().await {
        Ok(permit) => permit,
        Err(err) => {
            error!(error = %err, "enhancement slots closed");
            return internal_error();
        }
    };
    let gateway = Arc::clone(&state.gateway);
    let outcome = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        gateway.enhance(&image, &params)
    })
    .await;

    match outcome {
        Ok(Ok(enhanced)) => {
            let processing_time = started.elapsed().as_secs_f64();
            info!(
                faces = enhanced.faces_detected,
                processing_time, "enhancement complete"
            );
            Response::json(
                StatusCode::OK,
                &enhance_reply(&enhanced, processing_time),
            )
        }
        Ok(Err(err)) if err.is_client_error() => {
            warn!(error = ?err, "gateway rejected input");
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        Ok(Err(err)) => {
            error!(error = %err, "enhancement failed");
            internal_error()
        }
        Err(err) => {
            error!(error = %err, "enhancement task aborted");
            internal_error()
        }
    }
}

/// A JSON `{"error": message}` body with the given status.
#[must_use]
pub fn error_response(status: StatusCode, message: &str) -> Response {
    Response::json(status, &json!({ "error": message }))
}

fn internal_error() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Parameter overrides come from multipart text fields first, then from the
/// query string.
fn read_params(request: &Request, boundary: Option<&str>) -> Result<EnhanceParams, GatewayError> {
    let mut params = EnhanceParams::default();
    for name in EnhanceParams::FIELDS {
        let field = boundary
            .and_then(|b| find_part(&request.body, b, name))
            .map(|part| part.text().into_owned());
        if let Some(value) = field.as_deref().or_else(|| request.query_param(name)) {
            params.set(name, value)?;
        }
    }
    Ok(params)
}

fn enhance_reply(enhanced: &EnhancedImage, processing_time: f64) -> EnhanceReply {
    let (w, h) = enhanced.original_size;
    let (ew, eh) = enhanced.enhanced_size;
    EnhanceReply {
        success: true,
        enhanced_image: format!(
            "data:{};base64,{}",
            enhanced.mime_type,
            STANDARD.encode(&enhanced.data)
        ),
        processing_time,
        faces_detected: enhanced.faces_detected,
        timing: enhanced
            .timings
            .iter()
            .map(|t| (t.stage.clone(), t.seconds))
            .collect(),
        metrics: Metrics {
            resolution: format!("{w}x{h} → {ew}x{eh}"),
            scale_factor: f64::from(ew) / f64::from(w.max(1)),
        },
    }
}
