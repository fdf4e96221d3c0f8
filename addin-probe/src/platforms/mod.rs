use crate::{AutomationError, ElementQuery, Point, UIElement};
use std::sync::Arc;

pub mod memory;
#[cfg(target_os = "windows")]
pub mod windows;

/// Keys the engine can press on the focused element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Key {
    Enter,
    Escape,
    Tab,
    Space,
    Backspace,
    Delete,
    Home,
    End,
    Up,
    Down,
    Left,
    Right,
}

/// The common trait that all platform-specific engines must implement
///
/// Engines are blocking. Every call reads the live tree; nothing is cached
/// between calls.
pub trait AccessibilityEngine: Send + Sync {
    /// Get the root (desktop) element
    fn root(&self) -> UIElement;

    /// Find all descendants of `root` matching `query`, in tree order.
    ///
    /// `root` itself is never part of the result. An empty vector is a normal
    /// outcome; errors are provider failures.
    fn find_all(
        &self,
        root: &UIElement,
        query: &ElementQuery,
    ) -> Result<Vec<UIElement>, AutomationError>;

    /// First descendant of `root` matching `query`
    fn find_first(
        &self,
        root: &UIElement,
        query: &ElementQuery,
    ) -> Result<Option<UIElement>, AutomationError> {
        Ok(self.find_all(root, query)?.into_iter().next())
    }

    /// Top-level elements (direct children of the root) owned by `process_id`,
    /// in tree order. Nested windows of the same process are not included.
    fn process_windows(&self, process_id: u32) -> Result<Vec<UIElement>, AutomationError>;

    /// Bring `window` to the foreground and wait for pending input to drain.
    fn claim_foreground(&self, window: &UIElement) -> Result<(), AutomationError>;

    /// Block until the target has processed queued input.
    fn wait_for_input_idle(&self) -> Result<(), AutomationError>;

    fn mouse_move(&self, point: Point) -> Result<(), AutomationError>;

    fn mouse_click(&self, point: Point) -> Result<(), AutomationError>;

    fn mouse_double_click(&self, point: Point) -> Result<(), AutomationError>;

    /// Press and release a single key on whatever currently has focus.
    fn press_key(&self, key: Key) -> Result<(), AutomationError>;

    /// Enable downcasting to concrete engine types
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Create the appropriate engine for the current platform
pub fn create_engine() -> Result<Arc<dyn AccessibilityEngine>, AutomationError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::WindowsEngine::new()?))
    }
    #[cfg(not(target_os = "windows"))]
    {
        Err(AutomationError::UnsupportedPlatform(
            "only the Windows UI Automation backend can drive a live application".to_string(),
        ))
    }
}
