use std::env;
use std::fmt;

/// Top-level configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    /// Secret for contact pseudonymization. Optional at load time and
    /// validated where hashing actually happens.
    pub hashing_secret: Option<String>,
    pub refinements_enabled: bool,
    pub domain_scoring_enabled: bool,
    pub identity_enabled: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let hashing_secret = env::var("HASHING_SECRET").ok().filter(|s| !s.is_empty());

        let refinements_enabled = parse_flag("VIP_SCORING_REFINEMENTS_ENABLED", true)?;
        let domain_scoring_enabled = parse_flag("VIP_DOMAIN_SCORING_ENABLED", false)?;
        let identity_enabled = parse_flag("VIP_IDENTITY_ENABLED", false)?;

        Ok(Self {
            log_level,
            hashing_secret,
            refinements_enabled,
            domain_scoring_enabled,
            identity_enabled,
        })
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        "" => Ok(default),
        _ => Err(ConfigError::InvalidFlag { name }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidFlag { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidFlag { name } => {
                write!(f, "{name} must be a boolean flag (1/0, true/false, yes/no, on/off)")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
