use std::str::FromStr;

use scriptbox_core::scripting::EngineConfig;

/// Where scripts are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL via `DATABASE_URL`.
    Postgres,
    /// Process-local store; contents are lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3001`).
    pub port: u16,
    /// PostgreSQL connection string, used when `store_backend` is `Postgres`.
    pub database_url: String,
    /// Persistence backend (default: `Postgres`).
    pub store_backend: StoreBackend,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Largest accepted request body in bytes (default: 1 MiB).
    pub max_body_bytes: usize,
    /// Pending evaluations before callers wait (default: `64`).
    pub engine_queue_capacity: usize,
    /// Engine worker thread stack in MiB (default: `16`).
    pub engine_stack_size_mb: usize,
    /// Loop iteration cap per evaluation (default: unlimited).
    pub engine_loop_iteration_limit: Option<u64>,
    /// Call depth cap per evaluation (default: engine default).
    pub engine_recursion_limit: Option<usize>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                                              |
    /// |-------------------------------|------------------------------------------------------|
    /// | `HOST`                        | `0.0.0.0`                                            |
    /// | `PORT`                        | `3001`                                               |
    /// | `DATABASE_URL`                | `postgres://postgres@localhost:5432?sslmode=disable` |
    /// | `STORE_BACKEND`               | `postgres`                                           |
    /// | `CORS_ORIGINS`                | `http://localhost:5173`                              |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                                                 |
    /// | `MAX_BODY_BYTES`              | `1048576`                                            |
    /// | `ENGINE_QUEUE_CAPACITY`       | `64`                                                 |
    /// | `ENGINE_STACK_SIZE_MB`        | `16`                                                 |
    /// | `ENGINE_LOOP_ITERATION_LIMIT` | unset                                                |
    /// | `ENGINE_RECURSION_LIMIT`      | unset                                                |
    ///
    /// Panics on malformed values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_or("PORT", "3001")
            .parse()
            .expect("PORT must be a valid u16");

        let database_url = env_or(
            "DATABASE_URL",
            "postgres://postgres@localhost:5432?sslmode=disable",
        );

        let store_backend: StoreBackend = env_or("STORE_BACKEND", "postgres")
            .parse()
            .unwrap_or_else(|e| panic!("STORE_BACKEND is invalid: {e}"));

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_body_bytes: usize = env_or("MAX_BODY_BYTES", "1048576")
            .parse()
            .expect("MAX_BODY_BYTES must be a valid usize");

        let engine_queue_capacity: usize = env_or("ENGINE_QUEUE_CAPACITY", "64")
            .parse()
            .expect("ENGINE_QUEUE_CAPACITY must be a valid usize");

        let engine_stack_size_mb: usize = env_or("ENGINE_STACK_SIZE_MB", "16")
            .parse()
            .expect("ENGINE_STACK_SIZE_MB must be a valid usize");

        let engine_loop_iteration_limit = std::env::var("ENGINE_LOOP_ITERATION_LIMIT")
            .ok()
            .map(|v| {
                v.parse()
                    .expect("ENGINE_LOOP_ITERATION_LIMIT must be a valid u64")
            });

        let engine_recursion_limit = std::env::var("ENGINE_RECURSION_LIMIT")
            .ok()
            .map(|v| v.parse().expect("ENGINE_RECURSION_LIMIT must be a valid usize"));

        Self {
            host,
            port,
            database_url,
            store_backend,
            cors_origins,
            request_timeout_secs,
            max_body_bytes,
            engine_queue_capacity,
            engine_stack_size_mb,
            engine_loop_iteration_limit,
            engine_recursion_limit,
        }
    }

    /// Engine worker settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            queue_capacity: self.engine_queue_capacity,
            stack_size_bytes: self.engine_stack_size_mb * 1024 * 1024,
            loop_iteration_limit: self.engine_loop_iteration_limit,
            recursion_limit: self.engine_recursion_limit,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}
