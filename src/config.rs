use std::collections::HashMap;

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::Deserialize;

use crate::pki::crl::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_CRL_SIZE, ExpiryPolicy, Redirect,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub revocation: RevocationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevocationConfig {
    /// Upper bound on a single CRL download, in seconds
    pub fetch_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Largest CRL accepted, in bytes
    pub max_crl_size: usize,
    pub expiry: ExpiryPolicy,
    /// URI prefix rewrites applied to distribution point names
    #[serde(default)]
    pub redirects: Vec<Redirect>,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT.as_secs(),
            max_crl_size: DEFAULT_MAX_CRL_SIZE,
            expiry: ExpiryPolicy::default(),
            redirects: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default(
                "revocation.fetch_timeout_secs",
                DEFAULT_FETCH_TIMEOUT.as_secs() as i64,
            )?
            .set_default(
                "revocation.connect_timeout_secs",
                DEFAULT_CONNECT_TIMEOUT.as_secs() as i64,
            )?
            .set_default("revocation.max_crl_size", DEFAULT_MAX_CRL_SIZE as i64)?
            .set_default("revocation.expiry", "never")?
            .add_source(File::with_name("config/settings").required(false));

        // If env_vars is provided, we use it instead of system environment
        // This is to avoid systems variables pollution across tests
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Should be in the format APP_REVOCATION__FETCH_TIMEOUT_SECS
            builder = builder.add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }
}
