//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `SITE_URL` - Public base URL (used in email links and cookie security)
//! - `SESSION_SECRET` - Signs identity capabilities (min 32 chars, high entropy)
//! - `SUPABASE_URL` - Hosted auth/storage project URL
//! - `SUPABASE_ANON_KEY` - Public API key for the hosted project
//! - `SUPABASE_JWT_SECRET` - HS256 secret used to verify access tokens locally
//!
//! ## Optional
//! - `SITE_HOST` - Bind address (default: 127.0.0.1)
//! - `SITE_PORT` - Listen port (default: 3000)
//! - `SUPABASE_SERVICE_ROLE_KEY` - Elevated credential for creating auth users (server-side only)
//! - `STORAGE_BUCKET` - Bucket for uploaded images (default: site-content)
//! - `ADMIN_LOOKUP_FAILURE_POLICY` - `fail_open` (default) or `fail_closed`
//! - `PAGE_CACHE_TTL_SECS` - Rendered page cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Optional (email notifications, all or nothing)
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM`, `ADMIN_EMAIL`
//! - `SMTP_PORT` - SMTP port (default: 587)
//!
//! ## Optional (WhatsApp notifications, all or nothing)
//! - `WHATSAPP_API_URL` - Cloud API base, e.g. `https://graph.facebook.com/v18.0/<phone-id>`
//! - `WHATSAPP_API_TOKEN` - Bearer token

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_STORAGE_BUCKET: &str = "site-content";
const DEFAULT_PAGE_CACHE_TTL_SECS: u64 = 300;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// What the admin layout does when the admin-record lookup itself fails.
///
/// A lookup that succeeds with no row always redirects to login; this only
/// governs transient database errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminLookupFailurePolicy {
    /// Render the admin area with a degraded "User" identity and the plain admin role.
    #[default]
    FailOpen,
    /// Treat the failure like a missing record and redirect to login.
    FailClosed,
}

impl std::str::FromStr for AdminLookupFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail_open" => Ok(Self::FailOpen),
            "fail_closed" => Ok(Self::FailClosed),
            _ => Err(format!("expected fail_open or fail_closed, got {s}")),
        }
    }
}

/// Site application configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub site_url: String,
    /// Signs identity capabilities passed from the interceptor to handlers
    pub session_secret: SecretString,
    /// Hosted auth and storage project
    pub supabase: SupabaseConfig,
    /// Bucket for uploaded images
    pub storage_bucket: String,
    /// Admin layout behaviour on lookup failure
    pub admin_lookup_policy: AdminLookupFailurePolicy,
    /// Rendered page cache lifetime
    pub page_cache_ttl: Duration,
    /// Email configuration (optional - disables email notifications)
    pub email: Option<EmailConfig>,
    /// WhatsApp configuration (optional - disables WhatsApp notifications)
    pub whatsapp: Option<WhatsAppConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Hosted auth/storage project configuration.
///
/// Implements `Debug` manually to redact keys.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL, without trailing slash
    pub url: String,
    /// Public (anon) API key
    pub anon_key: SecretString,
    /// Elevated key for admin operations (HIGH PRIVILEGE - never sent to the browser)
    pub service_role_key: Option<SecretString>,
    /// Secret the project signs access tokens with
    pub jwt_secret: SecretString,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("jwt_secret", &"[REDACTED]")
            .finish()
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
    /// Where new-booking alerts go
    pub admin_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("admin_address", &self.admin_address)
            .finish()
    }
}

/// WhatsApp Cloud API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct WhatsAppConfig {
    /// Base URL; messages are posted to `{api_url}/messages`
    pub api_url: String,
    /// Bearer token
    pub api_token: SecretString,
}

impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_required_secret("DATABASE_URL")?;
        let host = get_env_or_default("SITE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SITE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SITE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SITE_PORT".to_string(), e.to_string()))?;
        let site_url = get_required_env("SITE_URL")?
            .trim_end_matches('/')
            .to_string();
        let session_secret = get_validated_secret("SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SESSION_SECRET")?;

        let supabase = SupabaseConfig::from_env()?;
        let storage_bucket = get_env_or_default("STORAGE_BUCKET", DEFAULT_STORAGE_BUCKET);
        let admin_lookup_policy = get_optional_env("ADMIN_LOOKUP_FAILURE_POLICY")
            .map(|v| v.parse::<AdminLookupFailurePolicy>())
            .transpose()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_LOOKUP_FAILURE_POLICY".to_string(), e))?
            .unwrap_or_default();
        let page_cache_ttl = get_optional_env("PAGE_CACHE_TTL_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("PAGE_CACHE_TTL_SECS".to_string(), e.to_string())
            })?
            .map_or(
                Duration::from_secs(DEFAULT_PAGE_CACHE_TTL_SECS),
                Duration::from_secs,
            );
        let email = EmailConfig::from_env()?;
        let whatsapp = WhatsAppConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            site_url,
            session_secret,
            supabase,
            storage_bucket,
            admin_lookup_policy,
            page_cache_ttl,
            email,
            whatsapp,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.site_url.starts_with("https://")
    }
}

impl SupabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let service_role_key = get_optional_env("SUPABASE_SERVICE_ROLE_KEY").map(|key| {
            if let Err(e) = validate_secret_strength(&key, "SUPABASE_SERVICE_ROLE_KEY") {
                tracing::warn!("SUPABASE_SERVICE_ROLE_KEY validation warning: {e}");
            }
            SecretString::from(key)
        });

        Ok(Self {
            url: get_required_env("SUPABASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            anon_key: get_required_secret("SUPABASE_ANON_KEY")?,
            service_role_key,
            jwt_secret: get_validated_secret("SUPABASE_JWT_SECRET")?,
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let host = get_optional_env("SMTP_HOST");
        let username = get_optional_env("SMTP_USERNAME");
        let password = get_optional_env("SMTP_PASSWORD");
        let from = get_optional_env("SMTP_FROM");
        let admin = get_optional_env("ADMIN_EMAIL");

        match (host, username, password, from, admin) {
            (Some(smtp_host), Some(smtp_username), Some(password), Some(from), Some(admin)) => {
                let smtp_port = get_env_or_default("SMTP_PORT", "587")
                    .parse::<u16>()
                    .map_err(|e| {
                        ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string())
                    })?;
                Ok(Some(Self {
                    smtp_host,
                    smtp_port,
                    smtp_username,
                    smtp_password: SecretString::from(password),
                    from_address: from,
                    admin_address: admin,
                }))
            }
            (None, None, None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SMTP_*".to_string(),
                "SMTP_HOST, SMTP_USERNAME, SMTP_PASSWORD, SMTP_FROM and ADMIN_EMAIL must be set together"
                    .to_string(),
            )),
        }
    }
}

impl WhatsAppConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let api_url = get_optional_env("WHATSAPP_API_URL");
        let api_token = get_optional_env("WHATSAPP_API_TOKEN");

        match (api_url, api_token) {
            (Some(url), Some(token)) => Ok(Some(Self {
                api_url: url.trim_end_matches('/').to_string(),
                api_token: SecretString::from(token),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "WHATSAPP_*".to_string(),
                "Both WHATSAPP_API_URL and WHATSAPP_API_TOKEN must be set together".to_string(),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable, treating empty strings as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-jwt-secret-goes-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"a".repeat(40), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_lookup_policy_parse() {
        assert_eq!(
            "fail_closed".parse::<AdminLookupFailurePolicy>().unwrap(),
            AdminLookupFailurePolicy::FailClosed
        );
        assert_eq!(
            AdminLookupFailurePolicy::default(),
            AdminLookupFailurePolicy::FailOpen
        );
        assert!("sometimes".parse::<AdminLookupFailurePolicy>().is_err());
    }

    #[test]
    fn test_supabase_config_debug_redacts_secrets() {
        let config = SupabaseConfig {
            url: "https://abc.supabase.co".to_string(),
            anon_key: SecretString::from("anon-key-value"),
            service_role_key: Some(SecretString::from("service-role-value")),
            jwt_secret: SecretString::from("jwt-secret-value"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("https://abc.supabase.co"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("anon-key-value"));
        assert!(!debug_output.contains("service-role-value"));
        assert!(!debug_output.contains("jwt-secret-value"));
    }

    #[test]
    fn test_whatsapp_config_debug_redacts_token() {
        let config = WhatsAppConfig {
            api_url: "https://graph.facebook.com/v18.0/123".to_string(),
            api_token: SecretString::from("EAAB-super-secret"),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("graph.facebook.com"));
        assert!(!debug_output.contains("EAAB-super-secret"));
    }
}
