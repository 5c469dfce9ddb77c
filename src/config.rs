use clap::Parser;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variables bound onto configuration keys.
const ENV_BINDINGS: &[(&str, &str)] = &[
    ("SQL_URL", "database.server"),
    ("SQL_DB", "database.database"),
    ("SQL_USER", "database.user"),
    ("SQL_PASS", "database.password"),
    ("OPENAI_API_TYPE", "openai.api_type"),
    ("OPENAI_API_BASE", "openai.api_base"),
    ("OPENAI_API_KEY", "openai.api_key"),
    ("OPENAI_API_VERSION", "openai.api_version"),
    ("OPENAI_API_MODEL", "openai.deployment_name"),
    ("FUNCTIONS_CUSTOMHANDLER_PORT", "web.port"),
];

pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub connect_timeout_secs: u64,
}

/// Where the embedded database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    InMemory,
    File(PathBuf),
}

impl DatabaseConfig {
    pub fn location(&self) -> DatabaseLocation {
        if self.server == IN_MEMORY {
            return DatabaseLocation::InMemory;
        }

        let file_name = if self.database.ends_with(".duckdb") || self.database.ends_with(".db") {
            self.database.clone()
        } else {
            format!("{}.duckdb", self.database)
        };

        DatabaseLocation::File(Path::new(&self.server).join(file_name))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_type: String, // "azure", "azure_ad" or "open_ai"
    #[serde(default)]
    pub api_base: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub deployment_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    /// Deployment used by the agent; falls back to `openai.deployment_name`.
    pub deployment_name: Option<String>,
    pub top_k: usize,
    pub max_iterations: usize,
    pub sample_rows: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    pub web: WebConfig,
    pub agent: AgentConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        Self::load(args, |name| std::env::var(name).ok())
    }

    /// Builds the configuration with `lookup` standing in for the process environment.
    pub fn load<F>(args: &CliArgs, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config_builder = Config::builder()
            .set_default("web.host", "127.0.0.1")?
            .set_default("web.port", 7071_i64)?
            .set_default("database.connect_timeout_secs", 30_i64)?
            .set_default("agent.top_k", 5_i64)?
            .set_default("agent.max_iterations", 15_i64)?
            .set_default("agent.sample_rows", 3_i64)?;

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            let default_locations = vec![
                "sqlprompt.toml",
                "config/sqlprompt.toml",
                "/etc/sqlprompt/sqlprompt.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        for (variable, key) in ENV_BINDINGS {
            config_builder = config_builder.set_override_option(*key, lookup(variable))?;
        }

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("SQL_URL", &self.database.server),
            ("SQL_DB", &self.database.database),
            ("SQL_USER", &self.database.user),
            ("SQL_PASS", &self.database.password),
            ("OPENAI_API_TYPE", &self.openai.api_type),
            ("OPENAI_API_BASE", &self.openai.api_base),
            ("OPENAI_API_KEY", &self.openai.api_key),
            ("OPENAI_API_VERSION", &self.openai.api_version),
            ("OPENAI_API_MODEL", &self.openai.deployment_name),
        ];

        for (variable, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Message(format!(
                    "missing required setting {}",
                    variable
                )));
            }
        }

        Ok(())
    }

    pub fn agent_deployment(&self) -> &str {
        self.agent
            .deployment_name
            .as_deref()
            .unwrap_or(&self.openai.deployment_name)
    }

    pub fn log_environment(&self) {
        info!("Logging Database Environment");
        info!("SQL Server   = {}", self.database.server);
        info!("SQL Database = {}", self.database.database);
        info!(
            "SQL Username/Password = {} {}",
            self.database.user,
            mask(&self.database.password)
        );
        info!("Database location = {:?}", self.database.location());

        info!("Logging OpenAI Environment");
        info!("OPENAI_API_TYPE = {}", self.openai.api_type);
        info!("OPENAI_API_BASE = {}", self.openai.api_base);
        info!("OPENAI_API_KEY = {}", mask(&self.openai.api_key));
        info!("OPENAI_API_VERSION = {}", self.openai.api_version);
        info!("OPENAI_API_MODEL = {}", self.openai.deployment_name);
    }
}

fn mask(secret: &str) -> String {
    if secret.chars().count() <= 4 {
        return "****".to_string();
    }
    let head: String = secret.chars().take(2).collect();
    format!("{}****", head)
}
