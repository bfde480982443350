//! Configuration management for vecgate.
//!
//! Configuration is assembled in layers, later layers winning:
//! - Built-in defaults
//! - A YAML config file (`--config`, `VECGATE_CONFIG`, or `./vecgate.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! Values that name enums owned by the engine (distance metric, index kind,
//! provider, backend) are kept as strings here and parsed by the engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "vecgate.yaml";

const KNOWN_PROVIDERS: [&str; 2] = ["local", "remote"];
const KNOWN_BACKENDS: [&str; 2] = ["lancedb", "memory"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,

    pub server: ServerConfig,
    pub vector: VectorConfig,
    pub embedding: EmbeddingSettings,
    pub store: StoreConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Index schema and search bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorConfig {
    /// Embedding dimension; must match the provider's output
    pub dimension: usize,

    /// COSINE, L2 or INNER_PRODUCT
    pub distance_metric: String,

    /// FLAT or HNSW
    pub index_kind: String,

    /// Upper bound for a search `limit`
    pub max_results: usize,

    /// Drop and rebuild the index at startup, discarding documents
    pub force_recreate_index: bool,

    /// Create the schema on first write instead of at startup
    pub lazy_index_init: bool,
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingSettings {
    /// "local" (in-process model) or "remote" (OpenAI-compatible endpoint)
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Remote endpoint base URL, e.g. `http://localhost:8080/v1`
    pub base_url: Option<String>,

    /// Remote bearer token
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Maximum texts per remote request
    pub batch_size: usize,

    /// Maximum remote requests in flight for one bulk call
    pub concurrency: usize,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Retries after the first failed request
    pub max_retries: u32,
}

/// Vector store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// "lancedb" or "memory"
    pub backend: String,

    /// Database location: a directory or an object-store URI
    pub uri: String,

    /// Logical collection (table) name
    pub collection: String,

    /// Per-call timeout
    pub timeout_secs: u64,

    /// Retries after the first failed call
    pub max_retries: u32,
}

/// Full configuration file structure. Every field is optional so a file
/// only needs to mention what it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    server: Option<ServerFile>,
    vector: Option<VectorFile>,
    embedding: Option<EmbeddingFile>,
    store: Option<StoreFile>,
    logging: Option<LoggingFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ServerFile {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct VectorFile {
    dimension: Option<usize>,
    distance_metric: Option<String>,
    index_kind: Option<String>,
    max_results: Option<usize>,
    force_recreate_index: Option<bool>,
    lazy_index_init: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EmbeddingFile {
    provider: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    api_key_env: Option<String>,
    batch_size: Option<usize>,
    concurrency: Option<usize>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreFile {
    backend: Option<String>,
    uri: Option<String>,
    collection: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingFile {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            dimension: 1024,
            distance_metric: "COSINE".to_string(),
            index_kind: "FLAT".to_string(),
            max_results: 10,
            force_recreate_index: false,
            lazy_index_init: false,
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: "trigram-v1".to_string(),
            base_url: None,
            api_key: None,
            batch_size: 32,
            concurrency: 4,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "lancedb".to_string(),
            uri: "data/vecgate".to_string(),
            collection: "documents".to_string(),
            timeout_secs: 10,
            max_retries: 3,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
            server: ServerConfig::default(),
            vector: VectorConfig::default(),
            embedding: EmbeddingSettings::default(),
            store: StoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and process environment.
    ///
    /// Environment variables:
    /// - `VECGATE_CONFIG`: Path to config file
    /// - `VECTOR_DIMENSION`, `DISTANCE_METRIC`, `INDEX_KIND`, `MAX_RESULTS`
    /// - `FORCE_RECREATE_INDEX`, `LAZY_INDEX_INIT`
    /// - `EMBEDDING_PROVIDER`, `EMBEDDING_MODEL`, `EMBEDDING_BASE_URL`,
    ///   `EMBEDDING_API_KEY`, `EMBEDDING_BATCH_SIZE`, `EMBEDDING_CONCURRENCY`,
    ///   `EMBEDDING_TIMEOUT_SECS`, `EMBEDDING_MAX_RETRIES`
    /// - `STORE_BACKEND`, `STORE_URI`, `STORE_COLLECTION`,
    ///   `STORE_TIMEOUT_SECS`, `STORE_MAX_RETRIES`
    /// - `VECGATE_HOST`, `VECGATE_PORT`
    /// - `RUST_LOG`, `NO_COLOR`, `VECGATE_LOG_JSON`
    ///
    /// # Example
    /// ```no_run
    /// use vecgate_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Dimension: {}", config.vector.dimension);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Load configuration using `env` to look up environment variables.
    pub fn load_from<F>(env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(config_file) = env("VECGATE_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        let config_path = match config.config_file {
            Some(ref cf) => {
                if !cf.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        cf
                    )));
                }
                Some(cf.clone())
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                default_path.exists().then_some(default_path)
            }
        };

        if let Some(path) = config_path {
            config = config.merge_yaml(&path, &env)?;
        }

        // Environment variables override YAML config
        config.apply_env(&env)?;

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml<F>(&self, path: &Path, env: &F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(server) = file.server {
            if let Some(host) = server.host {
                result.server.host = host;
            }
            if let Some(port) = server.port {
                result.server.port = port;
            }
        }

        if let Some(vector) = file.vector {
            let v = &mut result.vector;
            v.dimension = vector.dimension.unwrap_or(v.dimension);
            v.distance_metric = vector.distance_metric.unwrap_or(v.distance_metric.clone());
            v.index_kind = vector.index_kind.unwrap_or(v.index_kind.clone());
            v.max_results = vector.max_results.unwrap_or(v.max_results);
            v.force_recreate_index = vector
                .force_recreate_index
                .unwrap_or(v.force_recreate_index);
            v.lazy_index_init = vector.lazy_index_init.unwrap_or(v.lazy_index_init);
        }

        if let Some(embedding) = file.embedding {
            let e = &mut result.embedding;
            e.provider = embedding.provider.unwrap_or(e.provider.clone());
            e.model = embedding.model.unwrap_or(e.model.clone());
            if embedding.base_url.is_some() {
                e.base_url = embedding.base_url;
            }
            // Keys never live in the file itself, only the name of the variable holding them
            if let Some(key_env) = embedding.api_key_env {
                e.api_key = env(&key_env);
            }
            e.batch_size = embedding.batch_size.unwrap_or(e.batch_size);
            e.concurrency = embedding.concurrency.unwrap_or(e.concurrency);
            e.timeout_secs = embedding.timeout_secs.unwrap_or(e.timeout_secs);
            e.max_retries = embedding.max_retries.unwrap_or(e.max_retries);
        }

        if let Some(store) = file.store {
            let s = &mut result.store;
            s.backend = store.backend.unwrap_or(s.backend.clone());
            s.uri = store.uri.unwrap_or(s.uri.clone());
            s.collection = store.collection.unwrap_or(s.collection.clone());
            s.timeout_secs = store.timeout_secs.unwrap_or(s.timeout_secs);
            s.max_retries = store.max_retries.unwrap_or(s.max_retries);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply environment variables on top of the current values.
    fn apply_env<F>(&mut self, env: &F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env("VECGATE_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env_parse(env, "VECGATE_PORT")? {
            self.server.port = v;
        }

        if let Some(v) = env_parse(env, "VECTOR_DIMENSION")? {
            self.vector.dimension = v;
        }
        if let Some(v) = env("DISTANCE_METRIC") {
            self.vector.distance_metric = v;
        }
        if let Some(v) = env("INDEX_KIND") {
            self.vector.index_kind = v;
        }
        if let Some(v) = env_parse(env, "MAX_RESULTS")? {
            self.vector.max_results = v;
        }
        if let Some(v) = env_bool(env, "FORCE_RECREATE_INDEX")? {
            self.vector.force_recreate_index = v;
        }
        if let Some(v) = env_bool(env, "LAZY_INDEX_INIT")? {
            self.vector.lazy_index_init = v;
        }

        if let Some(v) = env("EMBEDDING_PROVIDER") {
            self.embedding.provider = v;
        }
        if let Some(v) = env("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = env("EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(v);
        }
        if let Some(v) = env("EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(v);
        }
        if let Some(v) = env_parse(env, "EMBEDDING_BATCH_SIZE")? {
            self.embedding.batch_size = v;
        }
        if let Some(v) = env_parse(env, "EMBEDDING_CONCURRENCY")? {
            self.embedding.concurrency = v;
        }
        if let Some(v) = env_parse(env, "EMBEDDING_TIMEOUT_SECS")? {
            self.embedding.timeout_secs = v;
        }
        if let Some(v) = env_parse(env, "EMBEDDING_MAX_RETRIES")? {
            self.embedding.max_retries = v;
        }

        if let Some(v) = env("STORE_BACKEND") {
            self.store.backend = v;
        }
        if let Some(v) = env("STORE_URI") {
            self.store.uri = v;
        }
        if let Some(v) = env("STORE_COLLECTION") {
            self.store.collection = v;
        }
        if let Some(v) = env_parse(env, "STORE_TIMEOUT_SECS")? {
            self.store.timeout_secs = v;
        }
        if let Some(v) = env_parse(env, "STORE_MAX_RETRIES")? {
            self.store.max_retries = v;
        }

        if let Some(v) = env("RUST_LOG") {
            self.log_level = Some(v);
        }
        if env("NO_COLOR").is_some() {
            self.no_color = true;
        }
        if let Some(v) = env_bool(env, "VECGATE_LOG_JSON")? {
            self.log_json = v;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the file and environment.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        store_uri: Option<String>,
        collection: Option<String>,
        force_recreate: bool,
    ) -> Self {
        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if let Some(uri) = store_uri {
            self.store.uri = uri;
        }

        if let Some(collection) = collection {
            self.store.collection = collection;
        }

        if force_recreate {
            self.vector.force_recreate_index = true;
        }

        self
    }

    /// Validate values that do not depend on the engine's enums.
    pub fn validate(&self) -> AppResult<()> {
        if self.vector.dimension == 0 {
            return Err(AppError::Config(
                "VECTOR_DIMENSION must be a positive integer".to_string(),
            ));
        }

        if self.vector.max_results == 0 {
            return Err(AppError::Config(
                "MAX_RESULTS must be a positive integer".to_string(),
            ));
        }

        let provider = self.embedding.provider.to_lowercase();
        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "remote" {
            match self.embedding.base_url.as_deref() {
                Some(url) if !url.trim().is_empty() => {}
                _ => {
                    return Err(AppError::Config(
                        "EMBEDDING_BASE_URL is required for the remote embedding provider"
                            .to_string(),
                    ))
                }
            }
        }

        if self.embedding.batch_size == 0 || self.embedding.concurrency == 0 {
            return Err(AppError::Config(
                "EMBEDDING_BATCH_SIZE and EMBEDDING_CONCURRENCY must be positive".to_string(),
            ));
        }

        let backend = self.store.backend.to_lowercase();
        if !KNOWN_BACKENDS.contains(&backend.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown store backend: {}. Supported: {}",
                self.store.backend,
                KNOWN_BACKENDS.join(", ")
            )));
        }

        if self.store.collection.trim().is_empty() {
            return Err(AppError::Config(
                "STORE_COLLECTION must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_parse<T, F>(env: &F, key: &str) -> AppResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("Invalid value for {}: {:?} ({})", key, raw, e))),
        None => Ok(None),
    }
}

fn env_bool<F>(env: &F, key: &str) -> AppResult<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    match env(key) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
            _ => Err(AppError::Config(format!(
                "Invalid boolean for {}: {:?}",
                key, raw
            ))),
        },
        None => Ok(None),
    }
}
