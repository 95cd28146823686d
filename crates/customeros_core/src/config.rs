//! Process-level configuration for the store and its transport.
//!
//! # Responsibility
//! - Carry endpoint, identity headers and cache policies as plain values.
//! - Read environment-sourced settings through an injected lookup so the
//!   core never touches `std::env` outside `from_env`.
//!
//! # Invariants
//! - Identity settings are fixed once a transport is built from them.
//! - Default retry policy issues no retries beyond the HTTP client's own.

use crate::error::{StoreError, StoreResult};
use std::time::Duration;

pub const ENV_API_PATH: &str = "CUSTOMER_OS_API_PATH";
pub const ENV_API_KEY: &str = "CUSTOMER_OS_API_KEY";
pub const ENV_USERNAME: &str = "CUSTOMER_OS_USERNAME";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);
const DEFAULT_FIRST_PAGE_SIZE: u32 = 1000;
const DEFAULT_PAGE_SIZE: u32 = 100;
const QUERY_SUFFIX: &str = "query";

/// Retry behavior for network-level transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one. `0` disables retries.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// When a loaded entry is considered stale and refetched by `load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalenessPolicy {
    /// Entries stay fresh until explicitly invalidated.
    #[default]
    Never,
    /// Entries loaded longer ago than this are refetched on next `load`.
    After(Duration),
}

/// Store and transport settings, read once at process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub api_path: String,
    pub api_key: String,
    pub username: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub staleness: StalenessPolicy,
    /// Page size of the first bootstrap request.
    pub first_page_size: u32,
    /// Page size of follow-up bootstrap requests.
    pub page_size: u32,
}

impl StoreConfig {
    /// Creates a config with default policies.
    pub fn new(
        api_path: impl Into<String>,
        api_key: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            api_path: api_path.into(),
            api_key: api_key.into(),
            username: username.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            staleness: StalenessPolicy::default(),
            first_page_size: DEFAULT_FIRST_PAGE_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Builds a config from a key lookup.
    ///
    /// # Errors
    /// - Returns `Configuration` when the API path or key is missing or blank.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StoreResult<Self> {
        let api_path = required(&lookup, ENV_API_PATH)?;
        let api_key = required(&lookup, ENV_API_KEY)?;
        let username = lookup(ENV_USERNAME)
            .map(|value| value.trim().to_string())
            .unwrap_or_default();
        let config = Self::new(api_path, api_key, username);
        config.validate()?;
        Ok(config)
    }

    /// Builds a config from process environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_staleness(mut self, staleness: StalenessPolicy) -> Self {
        self.staleness = staleness;
        self
    }

    pub fn with_page_sizes(mut self, first_page_size: u32, page_size: u32) -> Self {
        self.first_page_size = first_page_size;
        self.page_size = page_size;
        self
    }

    /// Checks value-level invariants.
    pub fn validate(&self) -> StoreResult<()> {
        if self.api_path.trim().is_empty() {
            return Err(StoreError::Configuration(format!(
                "`{ENV_API_PATH}` must not be empty"
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(StoreError::Configuration(format!(
                "`{ENV_API_KEY}` must not be empty"
            )));
        }
        if self.first_page_size == 0 || self.page_size == 0 {
            return Err(StoreError::Configuration(
                "page sizes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the GraphQL endpoint URL (`<api_path>/query`).
    pub fn endpoint(&self) -> String {
        let base = self.api_path.trim().trim_end_matches('/');
        if base.ends_with(QUERY_SUFFIX) {
            return base.to_string();
        }
        format!("{base}/{QUERY_SUFFIX}")
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> StoreResult<String> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(StoreError::Configuration(format!(
            "missing required setting `{key}`"
        ))),
    }
}
