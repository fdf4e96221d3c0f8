use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Element is detached from the tree: {0}")]
    ElementDetached(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AutomationError {
    /// Whether the error comes from a volatile tree access that may succeed on
    /// the next poll (stale node, provider hiccup during rendering).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AutomationError::ElementDetached(_) | AutomationError::PlatformError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AutomationError::ElementDetached("gone".into()).is_transient());
        assert!(AutomationError::PlatformError("COM hiccup".into()).is_transient());
        assert!(!AutomationError::InvalidSelector("bad".into()).is_transient());
        assert!(!AutomationError::UnsupportedOperation("no invoke".into()).is_transient());
    }
}
