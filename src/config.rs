use std::path::Path;

use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL, GatewaySettings};

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Chat-completion gateway base URL
    #[arg(long, env = "LLM_BASE_URL")]
    pub base_url: Option<String>,

    /// Model identifier
    #[arg(long, env = "LLM_MODEL")]
    pub model: Option<String>,

    /// Gateway API key
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Log output format (pretty or json)
    #[arg(long, env = "LOG_FORMAT")]
    pub log_format: Option<String>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub resilience: ResilienceConfig,
    pub widget: WidgetConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Directory served under `/static`.
    pub static_dir: String,
}

#[derive(Deserialize, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Replaces the built-in persona when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("system_prompt", &self.system_prompt.is_some())
            .finish()
    }
}

impl GatewayConfig {
    /// Connection settings for the gateway client.
    #[must_use]
    pub fn settings(&self) -> GatewaySettings {
        GatewaySettings {
            base_url: self.base_url.clone(),
            api_key: self
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            model: self.model.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub timeout_disabled: bool,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    pub idle_timeout_secs: u64,
    pub auto_close_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Defaults, then the config file, then `BUJJI_*` env vars, then CLI flags
    /// (and the plain env vars clap reads for them).
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.static_dir", "static")?
            .set_default("gateway.base_url", DEFAULT_BASE_URL)?
            .set_default("gateway.model", DEFAULT_MODEL)?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("resilience.request_timeout_secs", 30)?
            .set_default("widget.idle_timeout_secs", 30 * 60)?
            .set_default("widget.auto_close_secs", 5)?
            .set_default("logging.format", "pretty")?;

        match &cli.config {
            Some(path) => {
                builder = builder.add_source(File::new(path, FileFormat::Yaml).required(true));
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder
                    .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));
            }
            None => {}
        }

        // E.g. BUJJI_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("BUJJI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(url) = cli.base_url {
            builder = builder.set_override("gateway.base_url", url)?;
        }
        if let Some(model) = cli.model {
            builder = builder.set_override("gateway.model", model)?;
        }
        if let Some(key) = cli.api_key {
            builder = builder.set_override("gateway.api_key", key)?;
        }
        if let Some(format) = cli.log_format {
            builder = builder.set_override("logging.format", format.to_lowercase())?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }

        builder.build()?.try_deserialize()
    }
}
