//! Core library for the `cep-weather` services.
//!
//! This crate defines:
//! - Postal code validation shared by both service boundaries
//! - Clients for the postal code and weather providers
//! - Explicit trace context propagation between hops
//! - The Input and Orchestrator HTTP services
//! - Configuration handling
//!
//! It is used by the `cep-weather` binary, but the routers can be mounted by
//! other binaries or tests as well.

pub mod config;
pub mod model;
pub mod postal_code;
pub mod provider;
pub mod service;
pub mod trace;

pub use config::{Config, InputConfig, OrchestratorConfig, TelemetryConfig};
pub use model::{
    ErrorEnvelope, KELVIN_OFFSET, PostalCodeRecord, PostalCodeRequest, TemperatureResponse,
    WeatherReading,
};
pub use postal_code::{InvalidPostalCode, PostalCode};
pub use provider::{PostalCodeProvider, WeatherProvider};
pub use service::{Orchestrator, OrchestratorClient};
pub use trace::TraceContext;
