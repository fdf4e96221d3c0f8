//! Thread-safe wrappers and error conversions for the Windows platform

use crate::AutomationError;
use std::sync::Arc;
use uiautomation::UIAutomation;

/// UIA_E_ELEMENTNOTAVAILABLE
const ELEMENT_NOT_AVAILABLE: i32 = 0x80040201u32 as i32;

/// Thread-safe wrapper for the UIAutomation COM object
#[derive(Clone)]
pub(crate) struct ThreadSafeWinUIAutomation(pub(crate) Arc<UIAutomation>);

// Safety: UIAutomation is thread-safe after proper COM initialization
unsafe impl Send for ThreadSafeWinUIAutomation {}
unsafe impl Sync for ThreadSafeWinUIAutomation {}

/// Thread-safe wrapper for UIElement
#[derive(Clone)]
pub(crate) struct ThreadSafeWinUIElement(pub(crate) Arc<uiautomation::UIElement>);

// Safety: UIElement is thread-safe when wrapped properly
unsafe impl Send for ThreadSafeWinUIElement {}
unsafe impl Sync for ThreadSafeWinUIElement {}

impl From<uiautomation::Error> for AutomationError {
    fn from(error: uiautomation::Error) -> Self {
        if error.code() == ELEMENT_NOT_AVAILABLE {
            AutomationError::ElementDetached(format!("UIAutomation error: {error}"))
        } else {
            AutomationError::PlatformError(format!("UIAutomation error: {error}"))
        }
    }
}
