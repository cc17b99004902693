use crate::{PostalCode, PostalCodeRecord, TraceContext, WeatherReading};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::{fmt::Debug, time::Duration};
use thiserror::Error;

pub mod viacep;
pub mod weatherapi;

pub use viacep::ViaCepProvider;
pub use weatherapi::WeatherApiProvider;

#[derive(Debug, Error)]
pub enum PostalCodeError {
    #[error("failed to reach postal code provider")]
    Transport(#[source] reqwest::Error),

    #[error("failed to parse postal code provider JSON")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("city is empty")]
    MissingCity,

    #[error("weather API key is empty")]
    MissingApiKey,

    #[error("failed to reach weather provider")]
    Transport(#[source] reqwest::Error),

    #[error("weather provider responded with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("weather provider returned an empty body")]
    NilBody,

    #[error("failed to parse weather provider JSON")]
    Decode(#[source] serde_json::Error),
}

/// Resolves a postal code into a locality.
///
/// Implementations must not treat "unknown code" as an error: they return a
/// record with an empty `city` and leave the decision to the caller.
#[async_trait]
pub trait PostalCodeProvider: Send + Sync + Debug {
    async fn resolve(
        &self,
        code: &PostalCode,
        cx: &TraceContext,
    ) -> Result<PostalCodeRecord, PostalCodeError>;
}

/// Fetches current conditions for a city.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(
        &self,
        city: &str,
        api_key: &str,
        cx: &TraceContext,
    ) -> Result<WeatherReading, WeatherError>;
}

/// HTTP client whose every request is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
