//! Configuration module
//!
//! Loads configuration from environment variables. Each process reads only
//! the settings it needs: the gateway, a ledger worker or the client.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::messages::Action;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/";

/// Queue names and timeouts of one ledger operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub action: Action,

    /// Queue the gateway publishes requests to
    pub requests_queue: String,

    /// Queue the workers publish responses to
    pub responses_queue: String,

    /// Bound on every publish and every blocking pop
    pub queue_timeout: Duration,

    /// How long a caller waits for its correlated response
    pub cache_wait_timeout: Duration,
}

impl ServiceConfig {
    /// Default queue names (`<op>_requests_queue` / `<op>_responses_queue`)
    pub fn new(action: Action) -> Self {
        Self {
            action,
            requests_queue: format!("{}_requests_queue", action.name()),
            responses_queue: format!("{}_responses_queue", action.name()),
            queue_timeout: Duration::from_secs(1),
            cache_wait_timeout: Duration::from_secs(5),
        }
    }

    fn from_lookup(action: Action, lookup: &Lookup<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::new(action);
        let prefix = action.env_prefix();

        Ok(Self {
            action,
            requests_queue: lookup.string(&format!("{}_REQUESTS_QUEUE", prefix), &defaults.requests_queue),
            responses_queue: lookup.string(&format!("{}_RESPONSES_QUEUE", prefix), &defaults.responses_queue),
            queue_timeout: lookup.secs("QUEUE_TIMEOUT_SECS", 1)?,
            cache_wait_timeout: lookup.secs(&format!("{}_CACHE_WAIT_TIMEOUT_SECS", prefix), 5)?,
        })
    }
}

// =========================================================================
// Gateway
// =========================================================================

/// Gateway process configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Broker connection URL
    pub redis_url: String,

    /// Instance id embedded in correlation ids; random when unset
    pub instance_id: Option<u16>,

    /// Interval between pending-cache lookups while a caller waits
    pub poll_interval: Duration,

    /// Backoff before the HTTP listener is restarted after a failure
    pub retry_interval: Duration,

    /// Grace period for in-flight requests on shutdown
    pub shutdown_timeout: Duration,

    /// Age after which an unclaimed response is evicted
    pub pending_ttl: Duration,

    /// Interval of the pending-cache sweep job
    pub sweep_interval: Duration,

    /// One entry per ledger operation, in `Action::ALL` order
    services: [ServiceConfig; 5],
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&Lookup::env())
    }

    fn from_lookup(lookup: &Lookup<'_>) -> Result<Self, ConfigError> {
        let instance_id = match lookup.get("GATEWAY_INSTANCE_ID") {
            Some(raw) => {
                let id: u16 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("GATEWAY_INSTANCE_ID".to_string()))?;
                if id > crate::gateway::MAX_INSTANCE_ID {
                    return Err(ConfigError::InvalidValue("GATEWAY_INSTANCE_ID".to_string()));
                }
                Some(id)
            }
            None => None,
        };

        let mut services = Action::ALL.map(ServiceConfig::new);
        for service in services.iter_mut() {
            *service = ServiceConfig::from_lookup(service.action, lookup)?;
        }

        Ok(Self {
            host: lookup.string("HOST", "127.0.0.1"),
            port: lookup.parse("PORT", 3000)?,
            redis_url: lookup.string("REDIS_URL", DEFAULT_REDIS_URL),
            instance_id,
            poll_interval: Duration::from_millis(lookup.parse("RESPONSE_POLL_INTERVAL_MS", 200)?),
            retry_interval: lookup.secs("HTTP_RETRY_INTERVAL_SECS", 5)?,
            shutdown_timeout: lookup.secs("HTTP_SHUTDOWN_TIMEOUT_SECS", 5)?,
            pending_ttl: lookup.secs("PENDING_RESPONSE_TTL_SECS", 60)?,
            sweep_interval: lookup.secs("PENDING_SWEEP_INTERVAL_SECS", 30)?,
            services,
        })
    }

    /// Configuration with every setting at its default
    pub fn defaults() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            instance_id: None,
            poll_interval: Duration::from_millis(200),
            retry_interval: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(5),
            pending_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(30),
            services: Action::ALL.map(ServiceConfig::new),
        }
    }

    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("HOST".to_string()))
    }

    /// Settings of the operation behind `action`
    pub fn service(&self, action: Action) -> &ServiceConfig {
        &self.services[action.index()]
    }

    pub fn service_mut(&mut self, action: Action) -> &mut ServiceConfig {
        &mut self.services[action.index()]
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceConfig> {
        self.services.iter()
    }
}

// =========================================================================
// Worker
// =========================================================================

/// Ledger worker process configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Broker connection URL
    pub redis_url: String,

    pub balances_table: String,
    pub transactions_table: String,

    /// The operation this worker serves
    pub service: ServiceConfig,
}

impl WorkerConfig {
    /// Load configuration from environment variables
    pub fn from_env(action: Action) -> Result<Self, ConfigError> {
        Self::from_lookup(action, &Lookup::env())
    }

    fn from_lookup(action: Action, lookup: &Lookup<'_>) -> Result<Self, ConfigError> {
        let database_url = lookup
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_URL".to_string()))?;

        let balances_table = lookup.string("BALANCES_TABLE", "balances");
        if !is_valid_table_name(&balances_table) {
            return Err(ConfigError::InvalidValue("BALANCES_TABLE".to_string()));
        }

        let transactions_table = lookup.string("TRANSACTIONS_TABLE", "transactions");
        if !is_valid_table_name(&transactions_table) {
            return Err(ConfigError::InvalidValue("TRANSACTIONS_TABLE".to_string()));
        }

        Ok(Self {
            database_url,
            database_max_connections: lookup.parse("DATABASE_MAX_CONNECTIONS", 5)?,
            redis_url: lookup.string("REDIS_URL", DEFAULT_REDIS_URL),
            balances_table,
            transactions_table,
            service: ServiceConfig::from_lookup(action, lookup)?,
        })
    }
}

/// Table names are interpolated into SQL, so only plain identifiers
/// (optionally schema-qualified) are accepted.
pub fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.ends_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

// =========================================================================
// Client
// =========================================================================

/// Command-line client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the gateway
    pub gateway_url: String,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&Lookup::env())
    }

    fn from_lookup(lookup: &Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            gateway_url: lookup
                .string("GATEWAY_URL", "http://127.0.0.1:3000")
                .trim_end_matches('/')
                .to_string(),
            request_timeout: lookup.secs("CLIENT_REQUEST_TIMEOUT_SECS", 10)?,
        })
    }
}

// =========================================================================
// Lookup helpers
// =========================================================================

/// Source of configuration values; the process environment outside tests
struct Lookup<'a> {
    get: Box<dyn Fn(&str) -> Option<String> + 'a>,
}

impl<'a> Lookup<'a> {
    fn env() -> Self {
        Self {
            get: Box::new(|name| env::var(name).ok()),
        }
    }

    #[cfg(test)]
    fn from_pairs(pairs: &'a [(&'a str, &'a str)]) -> Self {
        Self {
            get: Box::new(move |name| {
                pairs
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| value.to_string())
            }),
        }
    }

    fn get(&self, name: &str) -> Option<String> {
        (self.get)(name).filter(|value| !value.is_empty())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: FromStr>(&self, name: &str, default: T) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue(name.to_string())),
            None => Ok(default),
        }
    }

    fn secs(&self, name: &str, default: u64) -> Result<Duration, ConfigError> {
        self.parse(name, default).map(Duration::from_secs)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}
