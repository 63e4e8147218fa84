use serde::{Deserialize, Serialize};

/// How the entries of a batch are executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// One entry after another, in input order
    #[default]
    Sequential,
    /// All entries polled together; replies still come back in input order
    Concurrent,
}

/// What `build()` does when a method name is registered twice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with `ServiceError::DuplicateMethod`
    #[default]
    Reject,
    /// Keep the last registration
    Replace,
}

/// Service-wide dispatch settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub batch_mode: BatchMode,
    pub duplicate_policy: DuplicatePolicy,
    /// Larger batches are answered with a single Invalid Request error
    pub max_batch_size: Option<usize>,
}
