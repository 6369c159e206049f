use serde::Deserialize;
use std::env;
use std::time::Duration;

const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub port: u16,
    pub assessment: AssessmentConfig,
    pub session_tick_millis: u64,
    /// Live sessions untouched for this long are evicted.
    pub session_idle_timeout_secs: u64,
    pub metrics_auth: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentConfig {
    /// Without a key the coach is disabled and the fallback text is served.
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl AssessmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn session_tick(&self) -> Duration {
        Duration::from_millis(self.session_tick_millis)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }

    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml, then APP__SECTION__KEY overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017/speedmath".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "speedmath".to_string());

        let port = read_number(&settings, "server.port", "PORT", 5000)?;

        let api_key = settings
            .get_string("assessment.api_key")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            eprintln!("WARNING: GEMINI_API_KEY not set, assessments will use the fallback text");
        }

        let model = settings
            .get_string("assessment.model")
            .or_else(|_| env::var("GEMINI_MODEL"))
            .unwrap_or_else(|_| "gemini-1.5-flash".to_string());

        let api_url = settings
            .get_string("assessment.api_url")
            .or_else(|_| env::var("GEMINI_API_URL"))
            .unwrap_or_else(|_| DEFAULT_GEMINI_API_URL.to_string());

        let timeout_secs = read_number(
            &settings,
            "assessment.timeout_secs",
            "ASSESSMENT_TIMEOUT_SECS",
            15,
        )?;

        let session_tick_millis =
            read_number(&settings, "session.tick_millis", "SESSION_TICK_MILLIS", 1000)?;

        let session_idle_timeout_secs = read_number(
            &settings,
            "session.idle_timeout_secs",
            "SESSION_IDLE_TIMEOUT_SECS",
            3600,
        )?;

        let metrics_auth = settings
            .get_string("metrics.auth")
            .or_else(|_| env::var("METRICS_AUTH"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    eprintln!("WARNING: METRICS_AUTH not set in production, using default");
                }
                "admin:changeme".to_string()
            });

        Ok(Config {
            mongo_uri,
            mongo_database,
            port,
            assessment: AssessmentConfig {
                api_key,
                model,
                api_url,
                timeout_secs,
            },
            session_tick_millis,
            session_idle_timeout_secs,
            metrics_auth,
        })
    }
}

/// Numeric setting from the config tree, else the env var, else `default`.
fn read_number<T>(
    settings: &config::Config,
    key: &str,
    env_key: &str,
    default: T,
) -> Result<T, config::ConfigError>
where
    T: std::str::FromStr + for<'de> Deserialize<'de>,
{
    if let Ok(value) = settings.get::<T>(key) {
        return Ok(value);
    }
    match env::var(env_key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| config::ConfigError::Message(format!("{} must be a number", env_key))),
        Err(_) => Ok(default),
    }
}
