//! HTTP receiver for Slack.
//!
//! One endpoint takes both Events API callbacks (JSON) and slash commands
//! (form-encoded). Every request on it must carry a valid Slack
//! signature; the body is buffered once for verification and then handed
//! to the matching extractor.
//!
//! Message events are counted before the 200 is returned. Slash commands
//! are acknowledged immediately with an empty 200 and run on a spawned
//! task, replying through the command's `response_url`.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::body::{Body, to_bytes};
use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use reqwest::Client;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use tally_core::{CommandRouter, EventIngestor};
use tally_types::secret::SecretString;

use crate::events::{EventsRequest, SlashCommand};
use crate::responder::ResponseUrlResponder;
use crate::signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER, verify_signature};

/// Largest request body accepted on the webhook.
const MAX_BODY_BYTES: usize = 1024 * 1024;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Shared state for the receiver's handlers.
pub struct GatewayState {
    signing_secret: SecretString,
    webhook_path: String,
    ingestor: Arc<EventIngestor>,
    commands: Arc<CommandRouter>,
    http: Client,
}

impl GatewayState {
    /// Bundle everything the handlers need.
    ///
    /// `http` is used for `response_url` replies.
    pub fn new(
        signing_secret: SecretString,
        webhook_path: impl Into<String>,
        ingestor: Arc<EventIngestor>,
        commands: Arc<CommandRouter>,
        http: Client,
    ) -> Self {
        Self {
            signing_secret,
            webhook_path: webhook_path.into(),
            ingestor,
            commands,
            http,
        }
    }
}

/// Build the receiver: the signed webhook plus an unsigned `/health`.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    START_TIME.get_or_init(Instant::now);

    let webhook = Router::new()
        .route(&state.webhook_path, post(receive))
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_request));

    Router::new()
        .route("/health", get(health))
        .merge(webhook)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Returns basic health status, version, and uptime.
async fn health() -> Json<serde_json::Value> {
    let start = START_TIME.get_or_init(Instant::now);
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": start.elapsed().as_secs(),
    }))
}

/// Reject requests without a valid Slack signature.
async fn verify_request(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let valid = verify_signature(
        state.signing_secret.expose(),
        header_str(&parts.headers, TIMESTAMP_HEADER),
        &bytes,
        header_str(&parts.headers, SIGNATURE_HEADER),
    );
    if !valid {
        warn!(uri = %parts.uri, "rejected request with invalid slack signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Dispatch on content type: forms are slash commands, JSON is Events API.
async fn receive(State(state): State<Arc<GatewayState>>, request: Request) -> Response {
    let is_form = header_str(request.headers(), CONTENT_TYPE.as_str())
        .starts_with("application/x-www-form-urlencoded");

    if is_form {
        match Form::<SlashCommand>::from_request(request, &state).await {
            Ok(Form(command)) => handle_command(&state, command),
            Err(rejection) => rejection.into_response(),
        }
    } else {
        match Json::<EventsRequest>::from_request(request, &state).await {
            Ok(Json(events)) => handle_events(&state, events),
            Err(rejection) => rejection.into_response(),
        }
    }
}

fn handle_events(state: &GatewayState, request: EventsRequest) -> Response {
    match request {
        EventsRequest::UrlVerification { challenge } => {
            info!("answering url verification");
            Json(serde_json::json!({ "challenge": challenge })).into_response()
        }
        EventsRequest::EventCallback { event, .. } => {
            match event.to_message_event() {
                Some(message) => {
                    state.ingestor.ingest(&message);
                }
                None => debug!(event_type = %event.event_type, "ignoring event"),
            }
            StatusCode::OK.into_response()
        }
        EventsRequest::Other => StatusCode::OK.into_response(),
    }
}

fn handle_command(state: &GatewayState, command: SlashCommand) -> Response {
    let request = match command.to_request() {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "ignoring slash command");
            return StatusCode::OK.into_response();
        }
    };

    let responder = ResponseUrlResponder::new(state.http.clone(), command.response_url);
    let commands = state.commands.clone();
    tokio::spawn(async move {
        let outcome = commands.dispatch(&request, &responder).await;
        debug!(command = %request.kind, ?outcome, "command finished");
    });

    StatusCode::OK.into_response()
}
