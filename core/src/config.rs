//! Per-environment API settings.
//!
//! The environment is chosen once at process start, either explicitly via
//! `PORTAIL_ENV` or from the build's debug flag.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const ENV_VAR: &str = "PORTAIL_ENV";
pub const API_URL_VAR: &str = "PORTAIL_API_URL";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown environment {0:?} (expected development, staging or production)")]
    UnknownEnvironment(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn from_debug_flag(debug: bool) -> Self {
        if debug {
            Environment::Development
        } else {
            Environment::Production
        }
    }

    /// Read `PORTAIL_ENV`, falling back to the build's debug flag.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(ENV_VAR) {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(Self::from_debug_flag(cfg!(debug_assertions))),
        }
    }

    pub fn api_config(self) -> ApiConfig {
        match self {
            Environment::Development => {
                ApiConfig::new("http://localhost:3000", Duration::from_secs(30))
            }
            Environment::Staging => ApiConfig::new(
                "https://staging.portail-prestataire.example/api",
                Duration::from_secs(20),
            ),
            Environment::Production => ApiConfig::new(
                "https://api.portail-prestataire.example/api",
                Duration::from_secs(15),
            ),
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}

/// Base URL and request timeout for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Environment table entry, with `PORTAIL_API_URL` overriding the base URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_env()?;
        let mut config = environment.api_config();
        if let Ok(url) = std::env::var(API_URL_VAR) {
            if !url.trim().is_empty() {
                config = ApiConfig::new(url.trim(), config.timeout);
            }
        }
        tracing::debug!(%environment, base_url = %config.base_url, "api config selected");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_selects_development() {
        assert_eq!(Environment::from_debug_flag(true), Environment::Development);
        assert_eq!(Environment::from_debug_flag(false), Environment::Production);
    }

    #[test]
    fn environment_names_parse_case_insensitively() {
        assert_eq!("Staging".parse::<Environment>(), Ok(Environment::Staging));
        assert_eq!(" PRODUCTION ".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("dev".parse::<Environment>(), Ok(Environment::Development));
        assert!(matches!(
            "qa".parse::<Environment>(),
            Err(ConfigError::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn production_times_out_sooner_than_development() {
        let dev = Environment::Development.api_config();
        let prod = Environment::Production.api_config();
        assert_eq!(dev.base_url, "http://localhost:3000");
        assert!(prod.timeout < dev.timeout);
        assert_eq!(prod.timeout, Duration::from_secs(15));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ApiConfig::new("http://localhost:3000/", Duration::from_secs(1));
        assert_eq!(config.base_url, "http://localhost:3000");
    }

    // Only test in this crate that touches the process environment.
    #[test]
    fn environment_variables_select_and_override() {
        std::env::set_var(ENV_VAR, "staging");
        std::env::remove_var(API_URL_VAR);
        assert_eq!(Environment::from_env(), Ok(Environment::Staging));
        assert_eq!(ApiConfig::from_env(), Ok(Environment::Staging.api_config()));

        std::env::set_var(API_URL_VAR, " http://10.0.2.2:3000/ ");
        let config = ApiConfig::from_env().unwrap();
        assert_eq!(config.base_url, "http://10.0.2.2:3000");
        assert_eq!(config.timeout, Duration::from_secs(20));

        std::env::set_var(ENV_VAR, "recette");
        assert_eq!(
            ApiConfig::from_env(),
            Err(ConfigError::UnknownEnvironment("recette".to_string()))
        );

        std::env::set_var(ENV_VAR, "  ");
        assert_eq!(
            Environment::from_env(),
            Ok(Environment::from_debug_flag(cfg!(debug_assertions)))
        );

        std::env::remove_var(ENV_VAR);
        std::env::remove_var(API_URL_VAR);
        assert_eq!(
            ApiConfig::from_env(),
            Ok(Environment::from_debug_flag(cfg!(debug_assertions)).api_config())
        );
    }
}
