use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use tracing::{Instrument, Span, debug, field, info_span};

use crate::{TraceContext, WeatherReading};

use super::{WeatherError, WeatherProvider, join_url, truncate_body};

/// WeatherClient backed by WeatherAPI.com's `current.json` endpoint.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self { base_url: base_url.into(), http }
    }

    fn current_url(&self) -> String {
        join_url(&self.base_url, "v1/current.json")
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f32,
    temp_f: f32,
    #[serde(default)]
    condition: WaCondition,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

impl From<WaResponse> for WeatherReading {
    fn from(r: WaResponse) -> Self {
        Self {
            location_name: r.location.name,
            temp_c: r.current.temp_c,
            temp_f: r.current.temp_f,
            updated_at: r.current.last_updated_epoch.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            condition: r.current.condition.text,
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn fetch(
        &self,
        city: &str,
        api_key: &str,
        cx: &TraceContext,
    ) -> Result<WeatherReading, WeatherError> {
        if city.is_empty() {
            return Err(WeatherError::MissingCity);
        }
        if api_key.is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let span = info_span!(
            "weatherapi.current",
            city = %city,
            status = field::Empty,
            trace_id = field::Empty,
        );
        let cx = cx.child(&span);

        async move {
            let res = self
                .http
                .get(self.current_url())
                .query(&[("key", api_key), ("q", city)])
                .headers(cx.headers())
                .send()
                .await
                .map_err(WeatherError::Transport)?;

            let status = res.status();
            Span::current().record("status", status.as_u16());

            let body = res.bytes().await.map_err(WeatherError::Transport)?;

            if !status.is_success() {
                return Err(WeatherError::Status {
                    status,
                    body: truncate_body(&String::from_utf8_lossy(&body)),
                });
            }

            if body.is_empty() {
                return Err(WeatherError::NilBody);
            }

            let parsed: WaResponse = serde_json::from_slice(&body).map_err(WeatherError::Decode)?;
            let reading = WeatherReading::from(parsed);

            debug!(
                temp_c = reading.temp_c,
                temp_f = reading.temp_f,
                location = %reading.location_name,
                "weather provider answered",
            );

            Ok(reading)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::http_client;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn provider(base: &str) -> WeatherApiProvider {
        WeatherApiProvider::new(base, http_client(Duration::from_millis(500)).unwrap())
    }

    fn sample_body() -> serde_json::Value {
        json!({
            "location": {"name": "Sao Paulo", "region": "Sao Paulo", "country": "Brazil"},
            "current": {
                "last_updated_epoch": 1_700_000_000,
                "temp_c": 25.0,
                "temp_f": 77.0,
                "condition": {"text": "Sunny", "code": 1000}
            }
        })
    }

    #[tokio::test]
    async fn fetches_current_conditions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/current.json"))
            .and(query_param("key", "KEY"))
            .and(query_param("q", "São Paulo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(1)
            .mount(&server)
            .await;

        let reading = provider(&server.uri())
            .fetch("São Paulo", "KEY", &TraceContext::default())
            .await
            .expect("fetch succeeds");

        assert_eq!(reading.temp_c, 25.0);
        assert_eq!(reading.temp_f, 77.0);
        assert_eq!(reading.location_name, "Sao Paulo");
        assert_eq!(reading.condition, "Sunny");
        assert_eq!(reading.updated_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn empty_city_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(0)
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .fetch("", "KEY", &TraceContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::MissingCity));
    }

    #[tokio::test]
    async fn empty_key_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(0)
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .fetch("Recife", "", &TraceContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::MissingApiKey));
    }

    #[tokio::test]
    async fn empty_body_is_nil_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .fetch("Recife", "KEY", &TraceContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::NilBody), "{err:?}");
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"current": {}})))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .fetch("Recife", "KEY", &TraceContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Decode(_)), "{err:?}");
    }

    #[tokio::test]
    async fn provider_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 2008, "message": "API key has been disabled."}
            })))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .fetch("Recife", "KEY", &TraceContext::default())
            .await
            .unwrap_err();

        match err {
            WeatherError::Status { status, body } => {
                assert_eq!(status.as_u16(), 403);
                assert!(body.contains("API key has been disabled"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_provider_is_transport_error() {
        let err = provider("http://127.0.0.1:1")
            .fetch("Recife", "KEY", &TraceContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::Transport(_)), "{err:?}");
    }
}
