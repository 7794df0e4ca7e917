//! Transport configuration.
//!
//! [`TransportConfig`] is plain data with serde support so an application can
//! load it from its own config file. Missing fields take their defaults.
//!
//! # Example
//!
//! ```
//! use httpwire_client::config::{TransportConfig, DEFAULT_MAX_CHUNK_SIZE};
//!
//! let config: TransportConfig = serde_json::from_str(r#"{ "timeout_secs": 30 }"#).unwrap();
//! assert_eq!(config.max_chunk_size, DEFAULT_MAX_CHUNK_SIZE);
//! assert_eq!(config.timeout(), Some(std::time::Duration::from_secs(30)));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default largest accepted frame payload (8 MiB).
pub const DEFAULT_MAX_CHUNK_SIZE: u32 = 8 * 1024 * 1024;

/// Configuration shared by every call made through one transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Frames with a longer payload fail with `ChunkTooLarge`.
    pub max_chunk_size: u32,
    /// Headers sent with every request.
    pub headers: Vec<(String, String)>,
    /// Keep idle connections pooled between calls.
    pub keep_alive: bool,
    /// Whole-request timeout in seconds. `None` waits forever.
    pub timeout_secs: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            headers: Vec::new(),
            keep_alive: true,
            timeout_secs: None,
        }
    }
}

impl TransportConfig {
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.max_chunk_size, 8 * 1024 * 1024);
        assert!(config.headers.is_empty());
        assert!(config.keep_alive);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TransportConfig =
            serde_json::from_str(r#"{"headers": [["x-api", "1"]], "keep_alive": false}"#)
                .unwrap();
        assert_eq!(config.headers, vec![("x-api".to_string(), "1".to_string())]);
        assert!(!config.keep_alive);
        assert_eq!(config.max_chunk_size, DEFAULT_MAX_CHUNK_SIZE);
    }

    #[test]
    fn test_json_round_trip() {
        let config = TransportConfig {
            max_chunk_size: 1024,
            headers: vec![("a".into(), "b".into())],
            keep_alive: false,
            timeout_secs: Some(3),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: TransportConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
