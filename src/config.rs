use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while loading the node configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {name}")]
    InvalidValue { name: String, value: String },

    #[error("Missing value for {0}")]
    MissingValue(String),
}

/// Node configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the HTTP server binds to
    pub host: String,

    /// Port the HTTP server listens on
    pub port: u16,

    /// Upper bound on a single peer chain fetch
    pub peer_timeout: Duration,

    /// Period of the background conflict resolution, if enabled
    pub resolve_interval: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 5000,
            peer_timeout: Duration::from_secs(5),
            resolve_interval: None,
        }
    }
}

fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

impl Config {
    /// Loads the configuration from the process environment and command line
    ///
    /// A `.env` file in the working directory is read first, if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Config::load(std::env::args().skip(1), |name| std::env::var(name).ok())
    }

    /// Builds the configuration from defaults, then environment variables,
    /// then command line flags
    ///
    /// # Arguments
    ///
    /// * `args` - Command line arguments, without the program name
    /// * `var` - Looks up an environment variable
    pub fn load<I, F>(args: I, var: F) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(host) = var("HOST") {
            config.host = host;
        }
        if let Some(port) = var("PORT") {
            config.port = parse("PORT", &port)?;
        }
        if let Some(secs) = var("PEER_TIMEOUT_SECS") {
            config.peer_timeout = Duration::from_secs(parse("PEER_TIMEOUT_SECS", &secs)?);
        }
        if let Some(secs) = var("RESOLVE_INTERVAL_SECS") {
            let secs: u64 = parse("RESOLVE_INTERVAL_SECS", &secs)?;
            config.resolve_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            if let Some(port) = arg.strip_prefix("--port=") {
                config.port = parse("--port", port)?;
            } else if arg == "-p" || arg == "--port" {
                let port = args.next().ok_or_else(|| ConfigError::MissingValue(arg.clone()))?;
                config.port = parse(&arg, &port)?;
            }
        }

        Ok(config)
    }
}
