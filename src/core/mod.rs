//! Foundational pieces shared by every subsystem: error types, client
//! configuration and the per-session one-shot gate.

pub mod error;
pub mod session;

pub use error::{ClientError, ClientResult};
pub use session::SessionGate;

/// Static client configuration, supplied by the embedding application.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// When true, a staged live move waits for an explicit user
    /// confirmation before it is sent.
    pub confirmation_mode: bool,
    /// How long an emitted move may stay unreflected by the server before
    /// the optimistic lock is released for retry.
    pub move_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            confirmation_mode: false,
            move_timeout_ms: 8_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(!config.confirmation_mode);
        assert_eq!(config.move_timeout_ms, 8_000);
    }
}
