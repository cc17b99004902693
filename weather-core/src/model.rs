use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Offset used for the Kelvin column. Kept at 273 (not 273.15) so responses
/// stay identical to the values existing clients already receive.
pub const KELVIN_OFFSET: f32 = 273.0;

/// Inbound body accepted by both services.
///
/// A missing or `null` `cep` decodes as empty so it is rejected by postal
/// code validation rather than as a malformed body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalCodeRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cep: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Postal code lookup result. Only `city` is used downstream; an empty
/// `city` means the provider did not know the code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostalCodeRecord {
    pub code: String,
    pub state: String,
    pub city: String,
    pub neighborhood: String,
    pub street: String,
}

impl PostalCodeRecord {
    pub fn is_found(&self) -> bool {
        !self.city.is_empty()
    }
}

/// Current conditions reported by the weather provider.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub location_name: String,
    pub temp_c: f32,
    pub temp_f: f32,
    pub updated_at: Option<DateTime<Utc>>,
    pub condition: String,
}

/// The externally visible result of both services.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureResponse {
    pub temp_c: f32,
    pub temp_f: f32,
    pub temp_k: f32,
}

impl TemperatureResponse {
    pub fn new(temp_c: f32, temp_f: f32) -> Self {
        Self { temp_c, temp_f, temp_k: temp_c + KELVIN_OFFSET }
    }
}

impl From<&WeatherReading> for TemperatureResponse {
    fn from(reading: &WeatherReading) -> Self {
        Self::new(reading.temp_c, reading.temp_f)
    }
}

/// Failure body returned by both services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kelvin_uses_linear_offset() {
        let resp = TemperatureResponse::new(25.0, 77.0);
        assert_eq!(resp.temp_k, 298.0);

        let resp = TemperatureResponse::new(-10.5, 13.1);
        assert_eq!(resp.temp_k, -10.5 + 273.0);
    }

    #[test]
    fn temperature_response_wire_names() {
        let json = serde_json::to_value(TemperatureResponse::new(25.0, 77.0)).unwrap();
        assert_eq!(json, serde_json::json!({"temp_c": 25.0, "temp_f": 77.0, "temp_k": 298.0}));
    }

    #[test]
    fn record_without_city_is_not_found() {
        let record = PostalCodeRecord { code: "99999999".into(), ..Default::default() };
        assert!(!record.is_found());

        let record = PostalCodeRecord { city: "São Paulo".into(), ..Default::default() };
        assert!(record.is_found());

        // Only an empty city means absence; the provider's value is not trimmed.
        let record = PostalCodeRecord { city: " ".into(), ..Default::default() };
        assert!(record.is_found());
    }

    #[test]
    fn missing_or_null_cep_decodes_as_empty() {
        for body in ["{}", r#"{"cep": null}"#] {
            let req: PostalCodeRequest = serde_json::from_str(body).expect("valid shape");
            assert_eq!(req.cep, "", "body {body}");
        }

        assert!(serde_json::from_str::<PostalCodeRequest>(r#"{"cep": 1001000}"#).is_err());
        assert!(serde_json::from_str::<PostalCodeRequest>("not json").is_err());
    }
}
