use serde::{Deserialize, Serialize};

/// Main configuration structure for Attest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Conversation history configuration
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Completion service configuration
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// Retrieval engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Default number of results per query
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Weight applied to semantic scores during fusion (0-1)
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Weight applied to keyword scores during fusion (0-1)
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Maximum rounds of multi-hop retrieval (1-4)
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,

    /// Minimum semantic score for index hits, if any
    #[serde(default)]
    pub score_threshold: Option<f32>,
}

const fn default_limit() -> usize {
    5
}

const fn default_semantic_weight() -> f32 {
    0.7
}

const fn default_keyword_weight() -> f32 {
    0.3
}

const fn default_max_hops() -> usize {
    2
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            max_hops: default_max_hops(),
            score_threshold: None,
        }
    }
}

/// Retrieval cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Maximum number of cached result lists
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

const fn default_cache_capacity() -> usize {
    1000
}

const fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Conversation history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConversationConfig {
    /// Turns retained per conversation id
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

const fn default_max_turns() -> usize {
    10
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompletionConfig {
    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

const fn default_max_tokens() -> u32 {
    2048
}

const fn default_timeout_secs() -> u64 {
    120
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
