//! Configuration loading and resolution
//!
//! Every setting is looked up in the environment first, then in the TOML
//! config file, then falls back to a built-in default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{WrapErr, bail, eyre};
use serde::Deserialize;

use abqinv_client::{Credentials, OAuth1Credentials};
use abqinv_inventory::BuildOptions;
use abqinv_inventory::cache::{CacheStore, DEFAULT_TTL};

/// File name searched for next to the executable and in the usual places
pub const CONFIG_FILE_NAME: &str = "abiquo-inventory.toml";

/// Environment variable names
pub mod env {
    pub const CONFIG: &str = "ABIQUO_INV_CONFIG";
    pub const API_URL: &str = "ABIQUO_API_URL";
    pub const API_INSECURE: &str = "ABIQUO_API_INSECURE";
    pub const USERNAME: &str = "ABIQUO_API_USERNAME";
    pub const PASSWORD: &str = "ABIQUO_API_PASSWORD";
    pub const APP_KEY: &str = "ABIQUO_API_APP_KEY";
    pub const APP_SECRET: &str = "ABIQUO_API_APP_SECRET";
    pub const TOKEN: &str = "ABIQUO_API_TOKEN";
    pub const TOKEN_SECRET: &str = "ABIQUO_API_TOKEN_SECRET";
    pub const CACHE_DISABLE: &str = "ABIQUO_INV_CACHE_DISABLE";
    pub const CACHE_DIR: &str = "ABIQUO_INV_CACHE_DIR";
    pub const CACHE_TTL: &str = "ABIQUO_INV_CACHE_TTL";
    pub const PUBLIC_IP_ONLY: &str = "ABIQUO_INV_PUBLIC_IP_ONLY";
    pub const DEPLOYED_ONLY: &str = "ABIQUO_INV_DEPLOYED_ONLY";
    pub const DEFAULT_IFACE: &str = "ABIQUO_INV_DEFAULT_IFACE";
    pub const GET_METADATA: &str = "ABIQUO_INV_GET_METADATA";
    pub const DEBUG: &str = "ABQ_DEBUG";
}

/// Read a variable from the process environment, treating empty as unset
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

// ============================================================================
// Config file
// ============================================================================

/// Contents of `abiquo-inventory.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub defaults: DefaultsSection,
}

/// `[api]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSection {
    /// API root, e.g. `https://abiquo.example.com/api`
    pub uri: Option<String>,
    /// Verify the server's TLS certificate
    pub ssl_verify: Option<bool>,
}

/// `[auth]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSection {
    pub apiuser: Option<String>,
    pub apipass: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub token: Option<String>,
    pub token_secret: Option<String>,
}

/// `[cache]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSection {
    pub use_cache: Option<bool>,
    pub cache_dir: Option<String>,
    /// Maximum age in seconds
    pub cache_max_age: Option<u64>,
}

/// `[defaults]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultsSection {
    pub public_ip_only: Option<bool>,
    pub deployed_only: Option<bool>,
    pub default_net_interface: Option<String>,
    pub get_metadata: Option<bool>,
}

impl FileConfig {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let config: FileConfig = toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Load from an explicit path, the usual locations, or use defaults
    ///
    /// # Errors
    /// Returns error if an explicitly requested file is missing, or if the
    /// file found cannot be parsed
    pub fn load_default(
        explicit: Option<&Path>,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> eyre::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = lookup(env::CONFIG) {
            return Self::load(Path::new(&path));
        }

        let paths = [
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME))),
            Some(PathBuf::from(CONFIG_FILE_NAME)),
            dirs::config_dir().map(|p| p.join("abiquo").join(CONFIG_FILE_NAME)),
        ];

        for path in paths.into_iter().flatten() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config file");
                return Self::load(&path);
            }
        }

        tracing::debug!("no config file found, using environment and defaults");
        Ok(FileConfig::default())
    }
}

// ============================================================================
// Resolved settings
// ============================================================================

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub verify_tls: bool,
    pub credentials: Credentials,
    pub use_cache: bool,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub build: BuildOptions,
}

impl Settings {
    /// Layer the environment over the config file over defaults
    ///
    /// # Errors
    /// Returns error if the API URL or credentials are missing, or a value
    /// cannot be parsed
    pub fn resolve(file: &FileConfig, lookup: &dyn Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let api_url = lookup(env::API_URL)
            .or_else(|| file.api.uri.clone())
            .ok_or_else(|| eyre!("Abiquo API URL is missing (set {} or api.uri)", env::API_URL))?;

        // Presence flags: any value counts, including "0"
        let insecure = lookup(env::API_INSECURE).is_some();
        let verify_tls = !insecure && file.api.ssl_verify.unwrap_or(true);

        let credentials = resolve_credentials(&file.auth, lookup)?;

        let cache_disabled = lookup(env::CACHE_DISABLE).is_some();
        let use_cache = !cache_disabled && file.cache.use_cache.unwrap_or(true);

        let cache_dir = lookup(env::CACHE_DIR)
            .or_else(|| file.cache.cache_dir.clone())
            .map_or_else(default_cache_dir, |dir| expand_home(&dir));

        let cache_ttl = match lookup(env::CACHE_TTL) {
            Some(ttl) => Duration::from_secs(
                ttl.trim()
                    .parse()
                    .wrap_err_with(|| format!("invalid {}: {ttl:?}", env::CACHE_TTL))?,
            ),
            None => file
                .cache
                .cache_max_age
                .map_or(DEFAULT_TTL, Duration::from_secs),
        };

        let defaults = BuildOptions::default();
        let build = BuildOptions {
            public_ip_only: env_flag(lookup, env::PUBLIC_IP_ONLY)?
                .or(file.defaults.public_ip_only)
                .unwrap_or(defaults.public_ip_only),
            deployed_only: env_flag(lookup, env::DEPLOYED_ONLY)?
                .or(file.defaults.deployed_only)
                .unwrap_or(defaults.deployed_only),
            default_net_interface: lookup(env::DEFAULT_IFACE)
                .or_else(|| file.defaults.default_net_interface.clone())
                .unwrap_or(defaults.default_net_interface),
            get_metadata: env_flag(lookup, env::GET_METADATA)?
                .or(file.defaults.get_metadata)
                .unwrap_or(defaults.get_metadata),
        };

        Ok(Self {
            api_url,
            verify_tls,
            credentials,
            use_cache,
            cache_dir,
            cache_ttl,
            build,
        })
    }

    /// Cache store for these settings, if caching is enabled
    #[must_use]
    pub fn cache_store(&self) -> Option<CacheStore> {
        self.use_cache
            .then(|| CacheStore::in_dir(&self.cache_dir, self.cache_ttl))
    }
}

fn resolve_credentials(
    auth: &AuthSection,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> eyre::Result<Credentials> {
    let pick = |key: &str, file: &Option<String>| lookup(key).or_else(|| file.clone());

    if let Some(username) = pick(env::USERNAME, &auth.apiuser) {
        return Ok(Credentials::Basic {
            username,
            password: pick(env::PASSWORD, &auth.apipass),
        });
    }

    if let Some(consumer_key) = pick(env::APP_KEY, &auth.api_key) {
        let consumer_secret = pick(env::APP_SECRET, &auth.api_secret)
            .ok_or_else(|| eyre!("OAuth app key given without {}", env::APP_SECRET))?;
        return Ok(Credentials::OAuth1(OAuth1Credentials {
            consumer_key,
            consumer_secret,
            token: pick(env::TOKEN, &auth.token),
            token_secret: pick(env::TOKEN_SECRET, &auth.token_secret),
        }));
    }

    bail!("either basic auth or OAuth credentials are required")
}

/// Parse a boolean environment variable
fn env_flag(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> eyre::Result<Option<bool>> {
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => bail!("invalid boolean for {key}: {value:?}"),
    }
}

fn default_cache_dir() -> PathBuf {
    expand_home("~/.ansible/tmp")
}

/// Expand a leading `~` to the user's home directory
fn expand_home(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}
