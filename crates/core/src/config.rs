use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::record::RecordShape;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Profiled key lookup: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
///
/// Empty values count as unset.
struct ProfiledEnv<'a> {
    profile: &'a str,
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl ProfiledEnv<'_> {
    fn opt(&self, key: &str) -> Option<String> {
        let get = |k: &str| (self.lookup)(k).filter(|s| !s.is_empty());
        if !self.profile.is_empty() {
            if let Some(v) = get(&format!("{}_{}", self.profile, key)) {
                return Some(v);
            }
        }
        get(key)
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T::Err: fmt::Display,
    {
        match self.opt(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub aws: AwsConfig,
    pub ingest: IngestConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `SHELFSYNC_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile = env::var("SHELFSYNC_PROFILE").unwrap_or_default();
        Self::from_lookup(&profile, &|key| env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(
        profile: &str,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let p = profile.trim().to_uppercase();
        let src = ProfiledEnv { profile: &p, lookup };
        Ok(Self {
            server: ServerConfig::from_env_profiled(&src)?,
            postgres: PostgresConfig::from_env_profiled(&src)?,
            aws: AwsConfig::from_env_profiled(&src),
            ingest: IngestConfig::from_env_profiled(&src)?,
            profile: p,
        })
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  postgres:  {}",
            self.postgres.redacted_target().as_deref().unwrap_or("(not configured)")
        );
        tracing::info!(
            "  aws:       region={}, endpoint={}, credentials={}",
            self.aws.region,
            self.aws.endpoint_url.as_deref().unwrap_or("(aws default)"),
            if self.aws.has_static_credentials() { "static" } else { "ambient" }
        );
        tracing::info!(
            "  ingest:    admission={}, slots={:?}, shape={}, errors={}, fetch_timeout={}s",
            self.ingest.admission_mode,
            self.ingest.slots,
            self.ingest.record_shape,
            self.ingest.error_verbosity,
            self.ingest.fetch_timeout_secs
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env_profiled(p: &ProfiledEnv<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            host: p.or("HOST", "0.0.0.0"),
            port: p.parsed("PORT", 4000)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Full connection URL; takes precedence over the individual parts.
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &ProfiledEnv<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            url: p.opt("DATABASE_URL"),
            host: p.opt("PG_HOST"),
            port: p.parsed("PG_PORT", 5432)?,
            database: p.or("PG_DATABASE", "shelfsync"),
            username: p.opt("PG_USERNAME"),
            password: p.opt("PG_PASSWORD"),
            ssl_mode: p.or("PG_SSL_MODE", "prefer"),
            max_connections: p.parsed("PG_MAX_CONNECTIONS", 10)?,
        })
    }

    /// Connection URL, or `Missing` when neither `DATABASE_URL` nor `PG_HOST` is set.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("DATABASE_URL or PG_HOST".to_string()))?;
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        Ok(format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, host, self.port, self.database, self.ssl_mode
        ))
    }

    /// Host/database part of the target with credentials removed.
    pub fn redacted_target(&self) -> Option<String> {
        if let Some(url) = &self.url {
            let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
            let host_part = without_scheme
                .rsplit_once('@')
                .map(|(_, rest)| rest)
                .unwrap_or(without_scheme);
            return Some(host_part.split('?').next().unwrap_or(host_part).to_string());
        }
        self.host
            .as_ref()
            .map(|h| format!("{}:{}/{}", h, self.port, self.database))
    }
}

// ── AWS / S3 ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    /// S3-compatible endpoint (e.g. MinIO). Unset means AWS itself.
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_env_profiled(p: &ProfiledEnv<'_>) -> Self {
        Self {
            region: p.or("AWS_REGION", "eu-north-1"),
            access_key_id: p.opt("AWS_ACCESS_KEY_ID"),
            secret_access_key: p.opt("AWS_SECRET_ACCESS_KEY"),
            session_token: p.opt("AWS_SESSION_TOKEN"),
            endpoint_url: p.opt("AWS_ENDPOINT_URL"),
        }
    }

    pub fn has_static_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

// ── Ingestion behavior ────────────────────────────────────────

/// Whether ingestion consults the time-slot admission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    Gated,
    Ungated,
}

impl fmt::Display for AdmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionMode::Gated => write!(f, "gated"),
            AdmissionMode::Ungated => write!(f, "ungated"),
        }
    }
}

impl FromStr for AdmissionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gated" => Ok(AdmissionMode::Gated),
            "ungated" => Ok(AdmissionMode::Ungated),
            _ => Err("expected gated or ungated".to_string()),
        }
    }
}

/// How much detail failed batches carry in the HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorVerbosity {
    /// Short classified message, readable message and code.
    Classified,
    /// Status code only.
    Terse,
}

impl fmt::Display for ErrorVerbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorVerbosity::Classified => write!(f, "classified"),
            ErrorVerbosity::Terse => write!(f, "terse"),
        }
    }
}

impl FromStr for ErrorVerbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classified" => Ok(ErrorVerbosity::Classified),
            "terse" => Ok(ErrorVerbosity::Terse),
            _ => Err("expected classified or terse".to_string()),
        }
    }
}

/// Default permitted slot hours (early, mid, late).
pub const DEFAULT_SLOTS: [u32; 3] = [9, 15, 21];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub admission_mode: AdmissionMode,
    /// Permitted slot hours, strictly ascending, each in `0..24`.
    pub slots: Vec<u32>,
    pub record_shape: RecordShape,
    pub error_verbosity: ErrorVerbosity,
    pub fetch_timeout_secs: u64,
}

impl IngestConfig {
    fn from_env_profiled(p: &ProfiledEnv<'_>) -> Result<Self, ConfigError> {
        let slots = match p.opt("ADMISSION_SLOTS") {
            Some(raw) => parse_slots(&raw)?,
            None => DEFAULT_SLOTS.to_vec(),
        };
        let record_shape = match p.opt("RECORD_SHAPE") {
            Some(raw) => raw.parse()?,
            None => RecordShape::WithImage,
        };
        let fetch_timeout_secs: u64 = p.parsed("FETCH_TIMEOUT_SECS", 30)?;
        if fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "FETCH_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }
        Ok(Self {
            admission_mode: p.parsed("ADMISSION_MODE", AdmissionMode::Gated)?,
            slots,
            record_shape,
            error_verbosity: p.parsed("ERROR_VERBOSITY", ErrorVerbosity::Classified)?,
            fetch_timeout_secs,
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            admission_mode: AdmissionMode::Gated,
            slots: DEFAULT_SLOTS.to_vec(),
            record_shape: RecordShape::WithImage,
            error_verbosity: ErrorVerbosity::Classified,
            fetch_timeout_secs: 30,
        }
    }
}

/// Parse a comma-separated slot list such as `"9,15,21"`.
pub fn parse_slots(raw: &str) -> Result<Vec<u32>, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key: "ADMISSION_SLOTS".to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let mut slots = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let hour: u32 = part.parse().map_err(|_| invalid("slot hours must be integers"))?;
        if hour > 23 {
            return Err(invalid("slot hours must be within 0..=23"));
        }
        slots.push(hour);
    }
    if slots.is_empty() {
        return Err(invalid("at least one slot is required"));
    }
    slots.sort_unstable();
    if slots.windows(2).any(|w| w[0] == w[1]) {
        return Err(invalid("slot hours must be distinct"));
    }
    Ok(slots)
}
