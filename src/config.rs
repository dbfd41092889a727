//! Configuration Module
//!
//! Cache configuration, with optional loading of the plain-data fields from
//! environment variables.

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Callback invoked with an entry removed by eviction or expiration.
///
/// Callbacks run after the cache lock is released and may use the cache
/// through a [`WeakCache`](crate::WeakCache). They must not block: the
/// background sweeper invokes them on a tokio worker thread.
pub type Callback<K, V> = Arc<dyn Fn(K, V) + Send + Sync>;

// == Expiration Mode ==
/// How stale entries are cleaned up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpirationMode {
    /// Entries are checked for staleness only when read with `get`.
    #[default]
    Passive,
    /// A background task periodically sweeps the whole keyspace.
    Active,
}

impl ExpirationMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "passive" => Some(Self::Passive),
            "active" => Some(Self::Active),
            _ => None,
        }
    }
}

/// Cache configuration.
///
/// All fields can be set directly or through the `with_*` builders.
pub struct Config<K, V> {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Age after which an entry is stale. Zero disables expiration.
    pub max_age: Duration,
    /// Lower bound of the jittered expiration window. `None` means the same as
    /// `max_age`, which disables jitter.
    pub min_age: Option<Duration>,
    /// Passive or active expiration
    pub expiration: ExpirationMode,
    /// Sweep period for active expiration. Defaults to `max_age`.
    pub expiration_interval: Option<Duration>,
    /// Invoked for every entry evicted by the LRU policy
    pub on_eviction: Option<Callback<K, V>>,
    /// Invoked for every entry removed because it went stale
    pub on_expiration: Option<Callback<K, V>>,
}

impl<K, V> Config<K, V> {
    /// Creates a configuration with the given capacity and no expiration.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// Callbacks are never loaded and stay unset.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `CACHE_MAX_AGE_MS` - Max age in milliseconds (default: 0, no expiration)
    /// - `CACHE_MIN_AGE_MS` - Min age in milliseconds (default: unset, no jitter)
    /// - `CACHE_EXPIRATION` - `passive` or `active` (default: passive)
    /// - `CACHE_EXPIRATION_INTERVAL_MS` - Sweep period in milliseconds (default: max age)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.capacity),
            max_age: env_millis("CACHE_MAX_AGE_MS").unwrap_or(defaults.max_age),
            min_age: env_millis("CACHE_MIN_AGE_MS"),
            expiration: env::var("CACHE_EXPIRATION")
                .ok()
                .and_then(|v| ExpirationMode::parse(&v))
                .unwrap_or(defaults.expiration),
            expiration_interval: env_millis("CACHE_EXPIRATION_INTERVAL_MS"),
            ..defaults
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_min_age(mut self, min_age: Duration) -> Self {
        self.min_age = Some(min_age);
        self
    }

    pub fn with_expiration(mut self, expiration: ExpirationMode) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn with_expiration_interval(mut self, interval: Duration) -> Self {
        self.expiration_interval = Some(interval);
        self
    }

    pub fn on_eviction<F>(mut self, callback: F) -> Self
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        self.on_eviction = Some(Arc::new(callback));
        self
    }

    pub fn on_expiration<F>(mut self, callback: F) -> Self
    where
        F: Fn(K, V) + Send + Sync + 'static,
    {
        self.on_expiration = Some(Arc::new(callback));
        self
    }

    /// The lower bound actually used for jitter.
    pub fn effective_min_age(&self) -> Duration {
        self.min_age.unwrap_or(self.max_age)
    }

    /// The sweep period actually used for active expiration.
    pub fn effective_interval(&self) -> Duration {
        match self.expiration_interval {
            Some(interval) if !interval.is_zero() => interval,
            _ => self.max_age,
        }
    }

    /// Checks the configuration, reporting the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity must be positive".to_string(),
            ));
        }

        if self.effective_min_age() > self.max_age {
            return Err(CacheError::InvalidConfig(format!(
                "min_age ({:?}) must be less than or equal to max_age ({:?})",
                self.effective_min_age(),
                self.max_age
            )));
        }

        Ok(())
    }
}

impl<K, V> Default for Config<K, V> {
    fn default() -> Self {
        Self {
            capacity: 1000,
            max_age: Duration::ZERO,
            min_age: None,
            expiration: ExpirationMode::Passive,
            expiration_interval: None,
            on_eviction: None,
            on_expiration: None,
        }
    }
}

impl<K, V> Clone for Config<K, V> {
    fn clone(&self) -> Self {
        Self {
            capacity: self.capacity,
            max_age: self.max_age,
            min_age: self.min_age,
            expiration: self.expiration,
            expiration_interval: self.expiration_interval,
            on_eviction: self.on_eviction.clone(),
            on_expiration: self.on_expiration.clone(),
        }
    }
}

impl<K, V> fmt::Debug for Config<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("capacity", &self.capacity)
            .field("max_age", &self.max_age)
            .field("min_age", &self.min_age)
            .field("expiration", &self.expiration)
            .field("expiration_interval", &self.expiration_interval)
            .field("on_eviction", &self.on_eviction.is_some())
            .field("on_expiration", &self.on_expiration.is_some())
            .finish()
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestConfig = Config<String, String>;

    #[test]
    fn test_config_default() {
        let config = TestConfig::default();
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.max_age, Duration::ZERO);
        assert_eq!(config.min_age, None);
        assert_eq!(config.expiration, ExpirationMode::Passive);
        assert!(config.on_eviction.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("CACHE_CAPACITY", "42");
        env::set_var("CACHE_MAX_AGE_MS", "1500");
        env::set_var("CACHE_MIN_AGE_MS", "500");
        env::set_var("CACHE_EXPIRATION", "Active");
        env::set_var("CACHE_EXPIRATION_INTERVAL_MS", "not-a-number");

        let config = TestConfig::from_env();
        assert_eq!(config.capacity, 42);
        assert_eq!(config.max_age, Duration::from_millis(1500));
        assert_eq!(config.min_age, Some(Duration::from_millis(500)));
        assert_eq!(config.expiration, ExpirationMode::Active);
        assert_eq!(config.expiration_interval, None);
        assert_eq!(config.effective_interval(), Duration::from_millis(1500));

        env::remove_var("CACHE_CAPACITY");
        env::remove_var("CACHE_MAX_AGE_MS");
        env::remove_var("CACHE_MIN_AGE_MS");
        env::remove_var("CACHE_EXPIRATION");
        env::remove_var("CACHE_EXPIRATION_INTERVAL_MS");
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = TestConfig::new(0);
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_min_above_max() {
        let config = TestConfig::new(10)
            .with_max_age(Duration::from_secs(1))
            .with_min_age(Duration::from_secs(2));
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfig(_))
        ));

        // A min age without any max age is also inconsistent
        let config = TestConfig::new(10).with_min_age(Duration::from_secs(1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_effective_min_age_defaults_to_max_age() {
        let config = TestConfig::new(10).with_max_age(Duration::from_secs(5));
        assert_eq!(config.effective_min_age(), Duration::from_secs(5));

        let config = config.with_min_age(Duration::ZERO);
        assert_eq!(config.effective_min_age(), Duration::ZERO);
    }

    #[test]
    fn test_effective_interval() {
        let config = TestConfig::new(10).with_max_age(Duration::from_secs(5));
        assert_eq!(config.effective_interval(), Duration::from_secs(5));

        let config = config.with_expiration_interval(Duration::from_secs(1));
        assert_eq!(config.effective_interval(), Duration::from_secs(1));

        let config = config.with_expiration_interval(Duration::ZERO);
        assert_eq!(config.effective_interval(), Duration::from_secs(5));
    }
}
