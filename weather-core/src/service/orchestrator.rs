use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, Span, error, field, info, info_span, warn};

use crate::{
    InvalidPostalCode, PostalCode, PostalCodeRequest, TemperatureResponse, TraceContext,
    config::OrchestratorConfig,
    provider::{
        PostalCodeError, PostalCodeProvider, ViaCepProvider, WeatherApiProvider, WeatherError,
        WeatherProvider, http_client,
    },
};

use super::{error_response, report};

const HEALTH_BANNER: &str = "cep-weather orchestrator is up.\nUse POST / with {\"cep\": \"<8 digits>\"} to get the current temperature.\n";

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid request body")]
    InvalidBody(#[source] serde_json::Error),

    #[error("invalid zipcode")]
    InvalidPostalCode(#[from] InvalidPostalCode),

    #[error("error fetching zipcode data")]
    PostalCodeLookupFailed(#[source] PostalCodeError),

    #[error("can not find zipcode")]
    PostalCodeNotFound,

    #[error("error fetching weather data")]
    WeatherLookupFailed(#[source] WeatherError),
}

impl OrchestratorError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody(_) | Self::InvalidPostalCode(_) => StatusCode::BAD_REQUEST,
            Self::PostalCodeNotFound => StatusCode::NOT_FOUND,
            Self::PostalCodeLookupFailed(_) | Self::WeatherLookupFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for OrchestratorError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.to_string())
    }
}

/// The postal code → weather pipeline.
///
/// The two provider calls run strictly one after the other: the weather
/// lookup needs the city resolved by the first.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    postal_codes: Arc<dyn PostalCodeProvider>,
    weather: Arc<dyn WeatherProvider>,
    weather_api_key: String,
}

impl Orchestrator {
    pub fn new(
        postal_codes: Arc<dyn PostalCodeProvider>,
        weather: Arc<dyn WeatherProvider>,
        weather_api_key: impl Into<String>,
    ) -> Self {
        Self { postal_codes, weather, weather_api_key: weather_api_key.into() }
    }

    /// Wires the ViaCEP and WeatherAPI clients, each bounded by the provider timeout.
    pub fn from_config(cfg: &OrchestratorConfig) -> reqwest::Result<Self> {
        let http = http_client(cfg.provider_timeout())?;

        Ok(Self::new(
            Arc::new(ViaCepProvider::new(cfg.postal_code_base_url.clone(), http.clone())),
            Arc::new(WeatherApiProvider::new(cfg.weather_base_url.clone(), http)),
            cfg.weather_api_key.clone(),
        ))
    }

    pub async fn temperature(
        &self,
        code: &PostalCode,
        cx: &TraceContext,
    ) -> Result<TemperatureResponse, OrchestratorError> {
        let record = self
            .postal_codes
            .resolve(code, cx)
            .await
            .map_err(OrchestratorError::PostalCodeLookupFailed)?;

        if !record.is_found() {
            return Err(OrchestratorError::PostalCodeNotFound);
        }

        let reading = self
            .weather
            .fetch(&record.city, &self.weather_api_key, cx)
            .await
            .map_err(OrchestratorError::WeatherLookupFailed)?;

        Ok(TemperatureResponse::from(&reading))
    }

    /// Validates a raw postal code, then runs the pipeline.
    pub async fn lookup(
        &self,
        raw: &str,
        cx: &TraceContext,
    ) -> Result<TemperatureResponse, OrchestratorError> {
        let code = PostalCode::parse(raw)?;
        self.temperature(&code, cx).await
    }
}

pub fn router(orchestrator: Orchestrator) -> Router {
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
    State(orchestrator): State<Orchestrator>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TemperatureResponse>, OrchestratorError> {
    let span = info_span!("orchestrator.handle", cep = field::Empty, trace_id = field::Empty);
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
    orchestrator: &Orchestrator,
    body: &[u8],
    cx: &TraceContext,
) -> Result<TemperatureResponse, OrchestratorError> {
    let request: PostalCodeRequest =
        serde_json::from_slice(body).map_err(OrchestratorError::InvalidBody)?;
    Span::current().record("cep", request.cep.as_str());

    orchestrator.lookup(&request.cep, cx).await
}
