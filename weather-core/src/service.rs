//! HTTP boundaries of the pipeline.
//!
//! [`input`] is the public-facing service, [`orchestrator`] the internal one
//! that talks to the providers. Each maps its own failures to one status and a
//! public [`ErrorEnvelope`](crate::ErrorEnvelope) message; error sources are
//! only ever logged.

use std::error::Error;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::ErrorEnvelope;

pub mod input;
pub mod orchestrator;

pub use input::{ForwardError, InputError, OrchestratorClient};
pub use orchestrator::{Orchestrator, OrchestratorError};

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorEnvelope::new(message))).into_response()
}

/// Renders an error and all of its sources on one line, for logs.
pub(crate) fn report(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PostalCodeError;

    #[test]
    fn report_includes_sources() {
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PostalCodeError::Decode(decode);
        let line = report(&err);
        assert!(line.starts_with("failed to parse postal code provider JSON: "));
        assert!(line.len() > "failed to parse postal code provider JSON: ".len());
    }
}
