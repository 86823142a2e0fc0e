use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What happens when a record cannot be read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failing operation and abort the process.
    #[default]
    Abort,
    /// Hand the typed error back to the caller.
    Propagate,
}

/// Configuration for the resilient storage adapter
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts for one storage operation, first try included (default: 5)
    pub max_attempts: usize,

    /// Delay before the first retry, doubled on each further retry (default: 10ms)
    pub base_delay: Duration,

    /// Upper bound for a single backoff delay (default: 2s)
    pub max_delay: Duration,

    /// Behaviour on permanent failure or exhausted retries (default: abort)
    pub failure_policy: FailurePolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(2),
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl RetryConfig {
    /// Set the total number of attempts
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the initial backoff delay
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the backoff ceiling
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the failure policy
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Shorthand for `failure_policy(FailurePolicy::Propagate)`
    pub fn propagate(self) -> Self {
        self.failure_policy(FailurePolicy::Propagate)
    }
}

/// Tunables of the surrounding evaluation pipeline.
///
/// The catalog does not interpret these values. They travel with it so that
/// schedulers and worker pools can be constructed from one explicit value
/// instead of process-wide globals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Processing units (GPUs) available per node (default: 1)
    pub pus_per_node: u32,

    /// Base size of a work item (default: 8)
    pub work_item_size: u32,

    /// Tasks queued per processing unit on a node (default: 4)
    pub tasks_in_queue_per_pu: u32,

    /// Threads loading data per node (default: 2)
    pub load_workers_per_node: u32,

    /// Threads saving results per node (default: 2)
    pub save_workers_per_node: u32,

    /// Parallel hardware streams for image processing (default: 32)
    pub num_cuda_streams: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pus_per_node: 1,
            work_item_size: 8,
            tasks_in_queue_per_pu: 4,
            load_workers_per_node: 2,
            save_workers_per_node: 2,
            num_cuda_streams: 32,
        }
    }
}

impl PipelineConfig {
    /// Parse a config from a JSON document, filling omitted fields with defaults
    pub fn from_json(doc: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(doc)?)
    }

    pub fn pus_per_node(mut self, count: u32) -> Self {
        self.pus_per_node = count;
        self
    }

    pub fn work_item_size(mut self, size: u32) -> Self {
        self.work_item_size = size;
        self
    }

    pub fn tasks_in_queue_per_pu(mut self, count: u32) -> Self {
        self.tasks_in_queue_per_pu = count;
        self
    }

    pub fn load_workers_per_node(mut self, count: u32) -> Self {
        self.load_workers_per_node = count;
        self
    }

    pub fn save_workers_per_node(mut self, count: u32) -> Self {
        self.save_workers_per_node = count;
        self
    }

    pub fn num_cuda_streams(mut self, count: u32) -> Self {
        self.num_cuda_streams = count;
        self
    }

    /// Tasks a node may hold queued at once
    pub fn tasks_in_queue_per_node(&self) -> u32 {
        self.pus_per_node.saturating_mul(self.tasks_in_queue_per_pu)
    }
}
