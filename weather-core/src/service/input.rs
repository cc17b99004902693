use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, Span, error, field, info, info_span, warn};

use crate::{
    InvalidPostalCode, PostalCode, PostalCodeRequest, TemperatureResponse, TraceContext,
    config::InputConfig, provider::http_client,
};

use super::{error_response, report};

const HEALTH_BANNER: &str = "cep-weather input service is up.\nUse POST / with {\"cep\": \"<8 digits>\"} to get the current temperature.\n";

/// Failure of the Input→Orchestrator hop.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to reach orchestrator")]
    Transport(#[source] reqwest::Error),

    #[error("orchestrator responded with status {0}")]
    Status(StatusCode),

    #[error("failed to parse orchestrator JSON")]
    Decode(#[source] serde_json::Error),
}

/// Public failures. Anything that went wrong past this service collapses into
/// [`InputError::UpstreamUnavailable`] so callers never learn which hop failed.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Mensagem: invalid request body")]
    InvalidBody(#[source] serde_json::Error),

    #[error("Mensagem: invalid zipcode")]
    InvalidPostalCode(#[from] InvalidPostalCode),

    #[error("Mensagem: internal server error")]
    UpstreamUnavailable(#[source] ForwardError),
}

impl InputError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidPostalCode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::UpstreamUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for InputError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.to_string())
    }
}

/// Orchestrator answer as received. Any `temp_k` it carries is ignored, so
/// an orchestrator that omits it is still accepted.
#[derive(Debug, Deserialize)]
struct OrchestratorReply {
    temp_c: f32,
    temp_f: f32,
}

impl From<OrchestratorReply> for TemperatureResponse {
    fn from(reply: OrchestratorReply) -> Self {
        Self::new(reply.temp_c, reply.temp_f)
    }
}

/// Client for the Orchestrator's `POST /`.
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    url: String,
    http: Client,
}

impl OrchestratorClient {
    pub fn new(url: impl Into<String>, http: Client) -> Self {
        Self { url: url.into(), http }
    }

    pub fn from_config(cfg: &InputConfig) -> reqwest::Result<Self> {
        Ok(Self::new(cfg.orchestrator_url.clone(), http_client(cfg.timeout())?))
    }

    /// Sends exactly one request; never retries.
    pub async fn forward(
        &self,
        code: &PostalCode,
        cx: &TraceContext,
    ) -> Result<TemperatureResponse, ForwardError> {
        let span = info_span!(
            "orchestrator.forward",
            cep = %code,
            status = field::Empty,
            trace_id = field::Empty,
        );
        let cx = cx.child(&span);

        async move {
            let res = self
                .http
                .post(&self.url)
                .header(header::ACCEPT, HeaderValue::from_static("application/json"))
                .headers(cx.headers())
                .json(&PostalCodeRequest { cep: code.to_string() })
                .send()
                .await
                .map_err(ForwardError::Transport)?;

            let status = res.status();
            Span::current().record("status", status.as_u16());

            if !status.is_success() {
                return Err(ForwardError::Status(status));
            }

            let body = res.bytes().await.map_err(ForwardError::Transport)?;
            let reply: OrchestratorReply =
                serde_json::from_slice(&body).map_err(ForwardError::Decode)?;

            // Kelvin is recomputed here so an orchestrator that sends a
            // different conversion, or none, cannot change what callers see.
            Ok(TemperatureResponse::from(reply))
        }
        .instrument(span)
        .await
    }
}

pub fn router(orchestrator: OrchestratorClient) -> Router {
    Router::new()
        .route("/", post(handle))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

async fn health() -> &'static str {
    HEALTH_BANNER
}

async fn handle(
    State(orchestrator): State<OrchestratorClient>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TemperatureResponse>, InputError> {
    let span = info_span!("input.handle", cep = field::Empty, trace_id = field::Empty);
    let cx = TraceContext::extract(&headers).or_root().child(&span);

    async move {
        let result = process(&orchestrator, &body, &cx).await;
        match &result {
            Ok(resp) => info!(temp_c = resp.temp_c, temp_k = resp.temp_k, "request processed"),
            Err(err) if err.status().is_server_error() => error!(error = %report(err), "request failed"),
            Err(err) => warn!(error = %report(err), "request rejected"),
        }
        result.map(Json)
    }
    .instrument(span)
    .await
}

async fn process(
    orchestrator: &OrchestratorClient,
    body: &[u8],
    cx: &TraceContext,
) -> Result<TemperatureResponse, InputError> {
    let request: PostalCodeRequest =
        serde_json::from_slice(body).map_err(InputError::InvalidBody)?;
    Span::current().record("cep", request.cep.as_str());

    let code = PostalCode::parse(&request.cep)?;

    orchestrator.forward(&code, cx).await.map_err(InputError::UpstreamUnavailable)
}
