/// Configuration management for the web server
///
/// Settings are layered with the `config` crate, lowest priority first:
///
/// 1. `appsettings.json`
/// 2. `appsettings.{Environment}.json`
/// 3. Environment variables, with `__` separating sections
///    (`ConnectionStrings__DefaultConnection`)
///
/// A `.env` file, when present, is loaded into the process environment first.
///
/// # Keys
///
/// - `ConnectionStrings:DefaultConnection`: SQLite connection string (required)
/// - `APP_ENVIRONMENT`: `Development`, `Staging` or `Production` (default)
/// - `Server:Host` / `Server:Port`: bind address (default 0.0.0.0:8080)
/// - `Server:HttpsPort`: enables HTTPS redirection when set
/// - `Server:StaticRoot`: static files directory (default `wwwroot`)
/// - `Database:MaxConnections`: pool size (default 5)
/// - `Identity:SessionSecret`: cookie signing secret, at least 32 characters
/// - `Identity:RequireConfirmedAccount`: default true
///
/// # Example
///
/// ```no_run
/// use gatehouse_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::{anyhow, bail, Context};
use config::{ConfigError, File, FileFormat};
use gatehouse_shared::auth::identity::{IdentityOptions, SignInOptions};
use gatehouse_shared::auth::session::SessionKeys;
use gatehouse_shared::db::pool::DatabaseConfig;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Key holding the database connection string
pub const CONNECTION_STRING_KEY: &str = "ConnectionStrings:DefaultConnection";

/// Environment variable selecting the hosting environment
pub const ENVIRONMENT_VARIABLE: &str = "APP_ENVIRONMENT";

const MIN_SESSION_SECRET_LEN: usize = 32;

/// Hosting environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "Development",
            Environment::Staging => "Staging",
            Environment::Production => "Production",
        };
        f.write_str(name)
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!("Unknown environment '{}'", other)),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,

    pub server: ServerConfig,

    /// Connection pool settings; `url` is the connection string
    pub database: DatabaseConfig,

    pub identity: IdentityConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    /// Port plain-HTTP requests are redirected to; no redirection when unset
    pub https_port: Option<u16>,

    /// Directory served for unmatched paths
    pub static_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            https_port: None,
            static_root: PathBuf::from("wwwroot"),
        }
    }
}

/// Identity and session configuration
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Secret used to sign session cookies
    ///
    /// When unset a random key is generated at startup and sessions do not
    /// survive a restart.
    pub session_secret: Option<String>,

    pub require_confirmed_account: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            session_secret: None,
            require_confirmed_account: true,
        }
    }
}

impl IdentityConfig {
    pub fn options(&self) -> IdentityOptions {
        IdentityOptions {
            sign_in: SignInOptions {
                require_confirmed_account: self.require_confirmed_account,
            },
            ..Default::default()
        }
    }

    pub fn session_keys(&self) -> SessionKeys {
        match &self.session_secret {
            Some(secret) => SessionKeys::from_secret(secret),
            None => {
                tracing::warn!(
                    "Identity:SessionSecret is not set; using a random key, sessions will not survive a restart"
                );
                SessionKeys::generate()
            }
        }
    }
}

impl Config {
    /// Configuration with defaults for everything but the connection string
    pub fn new(environment: Environment, connection_string: impl Into<String>) -> Self {
        Self {
            environment,
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: connection_string.into(),
                ..Default::default()
            },
            identity: IdentityConfig::default(),
        }
    }

    /// Loads configuration from the working directory and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is missing, a value cannot be
    /// parsed, or a settings file is malformed.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let environment = match std::env::var(ENVIRONMENT_VARIABLE) {
            Ok(value) => value.parse()?,
            Err(_) => Environment::default(),
        };

        Self::load(Path::new("."), environment)
    }

    /// Loads the layered settings rooted at `base_dir` for `environment`
    pub fn load(base_dir: &Path, environment: Environment) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(settings_file(base_dir, "appsettings.json"))
            .add_source(settings_file(
                base_dir,
                &format!("appsettings.{}.json", environment),
            ))
            .add_source(config::Environment::default().separator("__"))
            .build()
            .context("Failed to read configuration")?;

        Self::from_settings(environment, &settings)
    }

    /// Builds the configuration from already-layered settings
    pub fn from_settings(
        environment: Environment,
        settings: &config::Config,
    ) -> anyhow::Result<Self> {
        let connection_string = lookup::<String>(settings, CONNECTION_STRING_KEY)?
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("Connection string '{}' not found.", CONNECTION_STRING_KEY))?;

        let mut config = Self::new(environment, connection_string);

        if let Some(host) = lookup(settings, "Server:Host")? {
            config.server.host = host;
        }
        if let Some(port) = lookup(settings, "Server:Port")? {
            config.server.port = port;
        }
        config.server.https_port = lookup(settings, "Server:HttpsPort")?;
        if let Some(root) = lookup::<String>(settings, "Server:StaticRoot")? {
            config.server.static_root = PathBuf::from(root);
        }

        if let Some(max_connections) = lookup(settings, "Database:MaxConnections")? {
            config.database.max_connections = max_connections;
        }

        if let Some(secret) = lookup::<String>(settings, "Identity:SessionSecret")? {
            if secret.len() < MIN_SESSION_SECRET_LEN {
                bail!(
                    "Identity:SessionSecret must be at least {} characters long",
                    MIN_SESSION_SECRET_LEN
                );
            }
            config.identity.session_secret = Some(secret);
        }
        if let Some(required) = lookup(settings, "Identity:RequireConfirmedAccount")? {
            config.identity.require_confirmed_account = required;
        }

        Ok(config)
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn settings_file(base_dir: &Path, name: &str) -> File<config::FileSourceFile, FileFormat> {
    let path = base_dir.join(name);
    File::new(&path.to_string_lossy(), FileFormat::Json).required(false)
}

/// Reads a `Section:Key` setting
///
/// Environment variables arrive lower-cased while file keys keep their case,
/// so the lower-cased key is tried first.
fn lookup<T: DeserializeOwned>(settings: &config::Config, key: &str) -> anyhow::Result<Option<T>> {
    let dotted = key.replace(':', ".");

    for candidate in [dotted.to_lowercase(), dotted] {
        match settings.get::<T>(&candidate) {
            Ok(value) => return Ok(Some(value)),
            Err(ConfigError::NotFound(_)) => continue,
            Err(e) => return Err(anyhow!("Invalid value for {}: {}", key, e)),
        }
    }

    Ok(None)
}
