//! Storefront configuration loaded from environment variables.
//!
//! Every variable has a default that points at Solana devnet and the public
//! CoinGecko API, so a bare `cargo run` gives a working shop.
//!
//! # Environment Variables
//!
//! ## Server
//! - `SOLSHOP_HOST` - Bind address (default: 127.0.0.1)
//! - `SOLSHOP_PORT` - Listen port (default: 3000)
//! - `SOLSHOP_BASE_URL` - Public URL (default: <http://localhost:3000>)
//! - `CATALOG_PATH` - Product catalog JSON (default: bundled catalog)
//!
//! ## Solana
//! - `SOLANA_RPC_URL` - JSON-RPC endpoint, may embed an API key (default: devnet)
//! - `SOLSHOP_RECEIVER` - Base58 address that receives payments
//! - `SOLSHOP_KEYPAIR_PATH` - Wallet keypair file (default: fresh burner keypair)
//! - `SOLSHOP_WALLET_AUTO_CONNECT` - Connect the wallet at startup (default: true)
//! - `SOLSHOP_COMMITMENT` - processed, confirmed or finalized (default: confirmed)
//! - `CONFIRM_TIMEOUT_SECS` - Give up waiting for confirmation (default: 90)
//! - `CONFIRM_POLL_MS` - Confirmation polling interval (default: 500)
//! - `CHECKOUT_ATTACH_MEMO` - Write the order reference as a memo (default: true)
//!
//! ## Price API
//! - `PRICE_API_URL` - Base URL (default: <https://api.coingecko.com/api/v3>)
//! - `PRICE_API_KEY` - Optional demo API key
//! - `PRICE_STALE_AFTER_SECS` - Quote staleness window (default: 300)
//! - `PRICE_REFRESH_SECS` - Background refresh interval, 0 disables (default: 60)
//!
//! ## Observability
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use solana_sdk::pubkey::Pubkey;
use solshop_core::Commitment;
use thiserror::Error;
use url::Url;

/// Default receiving address for payments.
pub const DEFAULT_RECEIVER: Pubkey =
    solana_sdk::pubkey!("63XcsTWCbYXQRBWw7dHVU496XUGHEbwHi62rrts3HLc3");

/// Public devnet RPC endpoint.
pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

/// Public CoinGecko v3 API.
pub const DEFAULT_PRICE_API_URL: &str = "https://api.coingecko.com/api/v3";

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
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
    /// Catalog override; the bundled catalog is used when unset
    pub catalog_path: Option<PathBuf>,
    /// Solana RPC and wallet configuration
    pub solana: SolanaConfig,
    /// Price API configuration
    pub price: PriceApiConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Solana RPC, wallet and checkout configuration.
///
/// Implements `Debug` manually to redact the RPC URL, which commonly
/// carries a provider API key.
#[derive(Clone)]
pub struct SolanaConfig {
    /// JSON-RPC endpoint
    pub rpc_url: SecretString,
    /// Address every payment is sent to
    pub receiver: Pubkey,
    /// Keypair file for the server-side wallet
    pub keypair_path: Option<PathBuf>,
    /// Connect the wallet on startup
    pub auto_connect: bool,
    /// Commitment required before a payment counts as settled
    pub commitment: Commitment,
    /// Maximum time to wait for confirmation
    pub confirm_timeout: Duration,
    /// Delay between signature status polls
    pub confirm_poll_interval: Duration,
    /// Attach the order reference as a memo instruction
    pub attach_memo: bool,
}

impl std::fmt::Debug for SolanaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaConfig")
            .field("rpc_url", &"[REDACTED]")
            .field("receiver", &self.receiver.to_string())
            .field("keypair_path", &self.keypair_path)
            .field("auto_connect", &self.auto_connect)
            .field("commitment", &self.commitment)
            .field("confirm_timeout", &self.confirm_timeout)
            .field("confirm_poll_interval", &self.confirm_poll_interval)
            .field("attach_memo", &self.attach_memo)
            .finish()
    }
}

/// Exchange rate API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct PriceApiConfig {
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Optional demo API key
    pub api_key: Option<SecretString>,
    /// Age after which a quote is considered stale
    pub stale_after: Duration,
    /// Background refresh interval; `None` fetches once at startup
    pub refresh_interval: Option<Duration>,
}

impl std::fmt::Debug for PriceApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("stale_after", &self.stale_after)
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            catalog_path: None,
            solana: SolanaConfig::default(),
            price: PriceApiConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc_url: SecretString::from(DEVNET_RPC_URL),
            receiver: DEFAULT_RECEIVER,
            keypair_path: None,
            auto_connect: true,
            commitment: Commitment::Confirmed,
            confirm_timeout: Duration::from_secs(90),
            confirm_poll_interval: Duration::from_millis(500),
            attach_memo: true,
        }
    }
}

impl Default for PriceApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PRICE_API_URL.to_string(),
            api_key: None,
            stale_after: Duration::from_secs(300),
            // Must stay under `stale_after` or the quote goes stale between fetches
            refresh_interval: Some(Duration::from_secs(60)),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, or if the
    /// price API key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let host = parse_env_or("SOLSHOP_HOST", defaults.host)?;
        let port = parse_env_or("SOLSHOP_PORT", defaults.port)?;
        let base_url = get_env_or_default("SOLSHOP_BASE_URL", &defaults.base_url);
        validate_url("SOLSHOP_BASE_URL", &base_url)?;
        let catalog_path = get_optional_env("CATALOG_PATH").map(PathBuf::from);

        Ok(Self {
            host,
            port,
            base_url,
            catalog_path,
            solana: SolanaConfig::from_env()?,
            price: PriceApiConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl SolanaConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let rpc_url = match get_optional_env("SOLANA_RPC_URL") {
            Some(url) => {
                validate_url("SOLANA_RPC_URL", &url)?;
                SecretString::from(url)
            }
            None => defaults.rpc_url,
        };

        let receiver = parse_env_or("SOLSHOP_RECEIVER", defaults.receiver)?;
        let commitment = match get_optional_env("SOLSHOP_COMMITMENT").as_deref() {
            None | Some("confirmed") => Commitment::Confirmed,
            Some("processed") => Commitment::Processed,
            Some("finalized") => Commitment::Finalized,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "SOLSHOP_COMMITMENT".to_string(),
                    format!("unknown commitment level '{other}'"),
                ));
            }
        };

        Ok(Self {
            rpc_url,
            receiver,
            keypair_path: get_optional_env("SOLSHOP_KEYPAIR_PATH").map(PathBuf::from),
            auto_connect: parse_env_or("SOLSHOP_WALLET_AUTO_CONNECT", defaults.auto_connect)?,
            commitment,
            confirm_timeout: Duration::from_secs(parse_env_or(
                "CONFIRM_TIMEOUT_SECS",
                defaults.confirm_timeout.as_secs(),
            )?),
            confirm_poll_interval: Duration::from_millis(parse_env_or(
                "CONFIRM_POLL_MS",
                u64::try_from(defaults.confirm_poll_interval.as_millis()).unwrap_or(500),
            )?),
            attach_memo: parse_env_or("CHECKOUT_ATTACH_MEMO", defaults.attach_memo)?,
        })
    }
}

impl PriceApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let base_url = get_env_or_default("PRICE_API_URL", &defaults.base_url)
            .trim_end_matches('/')
            .to_string();
        validate_url("PRICE_API_URL", &base_url)?;

        let api_key = get_optional_env("PRICE_API_KEY")
            .map(|key| {
                validate_secret_strength(&key, "PRICE_API_KEY")?;
                Ok::<_, ConfigError>(SecretString::from(key))
            })
            .transpose()?;

        let stale_after = Duration::from_secs(parse_env_or(
            "PRICE_STALE_AFTER_SECS",
            defaults.stale_after.as_secs(),
        )?);

        let refresh_secs: u64 = parse_env_or(
            "PRICE_REFRESH_SECS",
            defaults.refresh_interval.map_or(0, |d| d.as_secs()),
        )?;
        let refresh_interval = (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs));

        Ok(Self {
            base_url,
            api_key,
            stale_after,
            refresh_interval,
        })
    }

    /// The API key, if configured.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(ExposeSecret::expose_secret)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Check that a value parses as an absolute http(s) URL.
fn validate_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{scheme}'"),
        )),
    }
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
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_refresh_keeps_rate_fresh() {
        let price = PriceApiConfig::default();
        let refresh = price.refresh_interval.unwrap();
        assert_eq!(refresh, Duration::from_secs(60));
        assert!(refresh < price.stale_after);
    }

    #[test]
    fn test_default_receiver() {
        let config = SolanaConfig::default();
        assert_eq!(config.receiver, DEFAULT_RECEIVER);
        assert_ne!(config.receiver, Pubkey::default());
        assert_eq!(
            config.receiver.to_string(),
            "63XcsTWCbYXQRBWw7dHVU496XUGHEbwHi62rrts3HLc3"
        );
    }

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
        let err = validate_secret_strength("your-api-key-here", "PRICE_API_KEY").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let err = validate_secret_strength("aaaaaaaaaaaaaaaa", "PRICE_API_KEY").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("CG-q8Rz2LmVb7TkWp4Xy", "PRICE_API_KEY").is_ok());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("X", "https://api.devnet.solana.com").is_ok());
        assert!(validate_url("X", "ftp://example.org").is_err());
        assert!(validate_url("X", "not a url").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig::default();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let solana = SolanaConfig {
            rpc_url: SecretString::from("https://rpc.example.org/?api-key=super_secret_rpc_key"),
            ..SolanaConfig::default()
        };
        let price = PriceApiConfig {
            api_key: Some(SecretString::from("super_secret_price_key")),
            ..PriceApiConfig::default()
        };

        let solana_debug = format!("{solana:?}");
        let price_debug = format!("{price:?}");

        assert!(solana_debug.contains("[REDACTED]"));
        assert!(solana_debug.contains(&DEFAULT_RECEIVER.to_string()));
        assert!(!solana_debug.contains("super_secret_rpc_key"));
        assert!(price_debug.contains("[REDACTED]"));
        assert!(!price_debug.contains("super_secret_price_key"));
    }
}
