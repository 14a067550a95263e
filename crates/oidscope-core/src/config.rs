// ── Runtime session configuration ──
//
// These types describe *what* to connect to and how hard to push the
// engine. They never touch disk: the config crate or the caller builds a
// `SessionProfile` and hands it in.

use oidscope_api::{ClientConfig, Credentials, TransportConfig, Version};

/// One target device and the credentials to reach it.
#[derive(Debug, Clone)]
pub struct SessionProfile {
    /// `host[:port]`.
    pub target: String,
    pub version: Version,
    pub credentials: Credentials,
}

impl SessionProfile {
    pub fn new(target: impl Into<String>, version: Version, credentials: Credentials) -> Self {
        Self {
            target: target.into(),
            version,
            credentials,
        }
    }

    pub(crate) fn client_config(&self, transport: &TransportConfig) -> ClientConfig {
        ClientConfig {
            target: self.target.clone(),
            version: self.version,
            credentials: self.credentials.clone(),
            transport: transport.clone(),
        }
    }
}

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Values per walk batch before it is pushed to the consumer.
    pub batch_size: usize,
    /// Walk batches that may queue before the producer suspends.
    pub queue_capacity: usize,
    /// Result groups kept in history.
    pub history_capacity: usize,
    /// GETBULK max-repetitions for bulk walks.
    pub max_repetitions: u32,
    pub transport: TransportConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            queue_capacity: 8,
            history_capacity: 50,
            max_repetitions: 50,
            transport: TransportConfig::default(),
        }
    }
}
