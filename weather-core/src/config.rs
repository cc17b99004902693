use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

/// Settings for the public-facing Input service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub listen: SocketAddr,
    /// Orchestrator endpoint receiving the forwarded `POST /`.
    pub orchestrator_url: String,
    /// Bound on the Input→Orchestrator hop. Must exceed both provider timeouts combined.
    pub timeout_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            orchestrator_url: "http://127.0.0.1:8081/".to_string(),
            timeout_ms: 8_000,
        }
    }
}

impl InputConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Settings for the internal Orchestrator service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub listen: SocketAddr,
    /// API key for the weather provider. Empty means every weather lookup fails.
    pub weather_api_key: String,
    pub postal_code_base_url: String,
    pub weather_base_url: String,
    /// Bound on each provider call.
    pub provider_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8081)),
            weather_api_key: String::new(),
            postal_code_base_url: "https://viacep.com.br".to_string(),
            weather_base_url: "https://api.weatherapi.com".to_string(),
            provider_timeout_ms: 3_000,
        }
    }
}

impl OrchestratorConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

/// Tracing export settings. No endpoint means logs only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub service_name: Option<String>,
    pub otlp_endpoint: Option<String>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// [orchestrator]
/// weather_api_key = "..."
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub orchestrator: OrchestratorConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load config from `path` (or the platform default), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path()?,
        };

        let mut cfg = Self::read(&path)?;
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    /// Read config from disk, or return an empty default if it doesn't exist yet.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Override file values with the environment variables the services have always read.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = var("INPUT_SERVICE_A_PORT") {
            self.input.listen.set_port(parse_port("INPUT_SERVICE_A_PORT", &port)?);
        }
        if let Some(port) = var("ORCHESTRATOR_PORT") {
            self.orchestrator.listen.set_port(parse_port("ORCHESTRATOR_PORT", &port)?);
        }
        if let Some(url) = var("ORCHESTRATOR_URL") {
            self.input.orchestrator_url = url;
        }
        if let Some(key) = var("WEATHER_SECRET_KEY") {
            self.orchestrator.weather_api_key = key;
        }
        if let Some(name) = var("OTEL_SERVICE_NAME").filter(|s| !s.is_empty()) {
            self.telemetry.service_name = Some(name);
        }
        if let Some(endpoint) = var("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|s| !s.is_empty()) {
            self.telemetry.otlp_endpoint = Some(endpoint);
        }
        Ok(())
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path()?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "cep-weather", "cep-weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn parse_port(var: &str, value: &str) -> Result<u16> {
    value.trim().parse().with_context(|| format!("{var} is not a valid port: '{value}'"))
}
