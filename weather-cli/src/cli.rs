use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use anyhow::Context;
use axum::Router;
use cep_weather_core::{
    Config, Orchestrator, OrchestratorClient, TemperatureResponse, TraceContext,
    service::{input, orchestrator},
};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::telemetry;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cep-weather", version, about = "Current temperature for a Brazilian postal code")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the public-facing Input service.
    Input,

    /// Run the internal Orchestrator service.
    Orchestrator,

    /// Resolve a postal code and print its current temperature, without any server.
    Lookup {
        /// 8-digit postal code, e.g. "01001000".
        cep: String,
    },

    /// Store the weather provider API key in the config file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = self.config.as_deref();

        match self.command {
            Command::Input => {
                let cfg = Config::load(path)?;
                let telemetry = telemetry::init(&cfg.telemetry, "input")?;

                let client = OrchestratorClient::from_config(&cfg.input)
                    .context("Failed to build orchestrator HTTP client")?;
                info!(orchestrator = %cfg.input.orchestrator_url, "forwarding to orchestrator");

                let result = serve("input", cfg.input.listen, input::router(client)).await;
                telemetry.shutdown();
                result
            }
            Command::Orchestrator => {
                let cfg = Config::load(path)?;
                let telemetry = telemetry::init(&cfg.telemetry, "orchestrator")?;

                if cfg.orchestrator.weather_api_key.is_empty() {
                    warn!("no weather API key configured; weather lookups will fail");
                }
                let pipeline = Orchestrator::from_config(&cfg.orchestrator)
                    .context("Failed to build provider HTTP client")?;

                let result =
                    serve("orchestrator", cfg.orchestrator.listen, orchestrator::router(pipeline))
                        .await;
                telemetry.shutdown();
                result
            }
            Command::Lookup { cep } => {
                let cfg = Config::load(path)?;
                let telemetry = telemetry::init(&cfg.telemetry, "lookup")?;

                let result = lookup(&cfg, &cep).await;
                telemetry.shutdown();
                result
            }
            Command::Configure => configure(path),
        }
    }
}

async fn serve(name: &str, listen: SocketAddr, app: Router) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {name} service to {listen}"))?;

    info!(service = name, %listen, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| format!("{name} service stopped with an error"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
    }
    info!("shutting down");
}

async fn lookup(cfg: &Config, cep: &str) -> anyhow::Result<()> {
    let pipeline = Orchestrator::from_config(&cfg.orchestrator)
        .context("Failed to build provider HTTP client")?;

    let resp = pipeline
        .lookup(cep, &TraceContext::root())
        .await
        .with_context(|| format!("Lookup failed for postal code '{cep}'"))?;

    println!("{}", render(cep, &resp));
    Ok(())
}

fn render(cep: &str, resp: &TemperatureResponse) -> String {
    format!(
        "Current temperature for {cep}:\n  {:.1} °C\n  {:.1} °F\n  {:.1} K",
        resp.temp_c, resp.temp_f, resp.temp_k
    )
}

fn configure(path: Option<&Path>) -> anyhow::Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => Config::config_file_path()?,
    };

    // Read the file alone so environment overrides are not persisted.
    let mut cfg = Config::read(&path)?;

    let key = inquire::Password::new("WeatherAPI.com API key:")
        .without_confirmation()
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .prompt()
        .context("No API key entered")?;

    cfg.orchestrator.weather_api_key = key.trim().to_owned();
    let saved = cfg.save(Some(&path))?;

    println!("Saved weather API key to {}", saved.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::parse_from(["cep-weather", "lookup", "01001000"]);
        assert!(matches!(cli.command, Command::Lookup { ref cep } if cep == "01001000"));
        assert!(cli.config.is_none());

        let cli = Cli::parse_from(["cep-weather", "input", "--config", "/tmp/cfg.toml"]);
        assert!(matches!(cli.command, Command::Input));
        assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/cfg.toml")));
    }

    #[test]
    fn renders_all_units() {
        let out = render("01001000", &TemperatureResponse::new(25.0, 77.0));
        assert!(out.contains("01001000"));
        assert!(out.contains("25.0 °C"));
        assert!(out.contains("77.0 °F"));
        assert!(out.contains("298.0 K"));
    }
}
