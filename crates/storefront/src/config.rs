//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `AGROMAT_API_URL` - Base URL of the marketplace REST backend
//! - `PAYSTACK_PUBLIC_KEY` - Paystack inline widget public key (`pk_test_...` / `pk_live_...`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `AGROMAT_API_TIMEOUT_SECS` - Backend request timeout (default: 10)
//! - `PAYSTACK_CURRENCY` - Currency code sent to the widget (default: NGN)
//! - `PRICING_TAX_RATE` - Tax as a fraction of subtotal (default: 0.08)
//! - `PRICING_FLAT_SHIPPING` - Shipping fee at or below the threshold (default: 5.99)
//! - `PRICING_FREE_SHIPPING_THRESHOLD` - Subtotal above which shipping is free (default: 50)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use agromat_core::{CurrencyCode, PricingPolicy};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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
    "insert",
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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Marketplace REST backend
    pub backend: BackendConfig,
    /// Payment widget settings
    pub paystack: PaystackConfig,
    /// Tax and shipping constants shared by every cart view
    pub pricing: PricingPolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Marketplace REST backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://api.agromat.ng/api`
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Paystack inline widget configuration.
#[derive(Debug, Clone)]
pub struct PaystackConfig {
    /// Public key handed to the browser widget
    pub public_key: String,
    /// Currency the widget charges in
    pub currency: CurrencyCode,
}

impl StorefrontConfig {
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

        let host = parse_env_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let backend = BackendConfig::from_env()?;
        let paystack = PaystackConfig::from_env()?;
        let pricing = pricing_from_env(paystack.currency)?;

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            backend,
            paystack,
            pricing,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("AGROMAT_API_URL")?;
        let base_url = parse_backend_url(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("AGROMAT_API_URL".to_string(), e))?;
        let timeout_secs = parse_env_or_default::<u64>("AGROMAT_API_TIMEOUT_SECS", "10")?;

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl PaystackConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let public_key = get_required_env("PAYSTACK_PUBLIC_KEY")?;
        validate_paystack_public_key(&public_key)?;

        let currency = get_env_or_default("PAYSTACK_CURRENCY", "NGN")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("PAYSTACK_CURRENCY".to_string(), e))?;

        Ok(Self {
            public_key,
            currency,
        })
    }
}

fn pricing_from_env(currency: CurrencyCode) -> Result<PricingPolicy, ConfigError> {
    let policy = PricingPolicy {
        tax_rate: parse_env_or_default::<Decimal>("PRICING_TAX_RATE", "0.08")?,
        flat_shipping: parse_env_or_default::<Decimal>("PRICING_FLAT_SHIPPING", "5.99")?,
        free_shipping_threshold: parse_env_or_default::<Decimal>(
            "PRICING_FREE_SHIPPING_THRESHOLD",
            "50",
        )?,
        currency,
    };

    if policy.tax_rate.is_sign_negative() || policy.tax_rate >= Decimal::ONE {
        return Err(ConfigError::InvalidEnvVar(
            "PRICING_TAX_RATE".to_string(),
            "must be a fraction in [0, 1)".to_string(),
        ));
    }
    if policy.flat_shipping.is_sign_negative() || policy.free_shipping_threshold.is_sign_negative()
    {
        return Err(ConfigError::InvalidEnvVar(
            "PRICING_FLAT_SHIPPING".to_string(),
            "shipping amounts cannot be negative".to_string(),
        ));
    }

    Ok(policy)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse the backend base URL. A trailing slash is added so relative joins
/// keep the path prefix (`/api` + `cart` = `/api/cart`).
fn parse_backend_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme: {}", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// The widget rejects anything that is not a public key; a secret key here
/// would also leak to every browser.
fn validate_paystack_public_key(key: &str) -> Result<(), ConfigError> {
    if key.starts_with("sk_") {
        return Err(ConfigError::InsecureSecret(
            "PAYSTACK_PUBLIC_KEY".to_string(),
            "is a secret key; use the pk_ public key".to_string(),
        ));
    }
    if !(key.starts_with("pk_test_") || key.starts_with("pk_live_")) {
        return Err(ConfigError::InvalidEnvVar(
            "PAYSTACK_PUBLIC_KEY".to_string(),
            "must start with pk_test_ or pk_live_".to_string(),
        ));
    }
    Ok(())
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
impl StorefrontConfig {
    /// Configuration pointing at local services, for unit tests.
    #[allow(clippy::unwrap_used)]
    pub(crate) fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            backend: BackendConfig {
                base_url: Url::parse("http://localhost:5000/api/").unwrap(),
                timeout: Duration::from_secs(10),
            },
            paystack: PaystackConfig {
                public_key: "pk_test_abc123".to_string(),
                currency: CurrencyCode::NGN,
            },
            pricing: PricingPolicy::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
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
        let result = validate_secret_strength("changeme-farm-session", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_backend_url_gets_trailing_slash() {
        let url = parse_backend_url("https://api.agromat.ng/api").unwrap();
        assert_eq!(url.as_str(), "https://api.agromat.ng/api/");
        assert_eq!(url.join("cart").unwrap().path(), "/api/cart");
    }

    #[test]
    fn test_backend_url_rejects_other_schemes() {
        assert!(parse_backend_url("ftp://api.agromat.ng").is_err());
        assert!(parse_backend_url("not a url").is_err());
    }

    #[test]
    fn test_paystack_key_validation() {
        assert!(validate_paystack_public_key("pk_test_0123").is_ok());
        assert!(validate_paystack_public_key("pk_live_0123").is_ok());
        assert!(matches!(
            validate_paystack_public_key("sk_live_0123"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_paystack_public_key("0123").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = StorefrontConfig::for_tests().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_debug_redacts_session_secret() {
        let mut config = StorefrontConfig::for_tests();
        config.session_secret = SecretString::from("super_session_value_1234567890abcdef");
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("super_session_value"));
        assert!(debug_output.contains("pk_test_abc123"));
    }
}
