use super::element::WindowsUIElement;
use super::types::{ThreadSafeWinUIAutomation, ThreadSafeWinUIElement};
use super::utils::{key_sequence, native_condition};
use crate::platforms::{AccessibilityEngine, Key};
use crate::{AutomationError, ElementQuery, Point, UIElement};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, instrument, trace};
use uiautomation::inputs::{Keyboard, Mouse};
use uiautomation::types::{TreeScope, UIProperty};
use uiautomation::variants::Variant;
use uiautomation::UIAutomation;
use windows::core::HRESULT;
use windows::Win32::System::Com::{CoInitializeEx, COINIT_MULTITHREADED};

/// RPC_E_CHANGED_MODE: COM was already initialized on this thread
const COM_ALREADY_INITIALIZED: HRESULT = HRESULT(0x80010106u32 as i32);

/// UI Automation offers no input-idle signal for foreign processes; give the
/// message loop a fixed slice instead.
const INPUT_IDLE_WAIT: Duration = Duration::from_millis(100);

pub struct WindowsEngine {
    automation: ThreadSafeWinUIAutomation,
    root: ThreadSafeWinUIElement,
}

impl WindowsEngine {
    pub fn new() -> Result<Self, AutomationError> {
        // Initialize COM in multithreaded mode for thread safety
        unsafe {
            let hr = CoInitializeEx(None, COINIT_MULTITHREADED);
            if hr.is_err() && hr != COM_ALREADY_INITIALIZED {
                return Err(AutomationError::PlatformError(format!(
                    "Failed to initialize COM in multithreaded mode: {hr}"
                )));
            }
            if hr == COM_ALREADY_INITIALIZED {
                debug!("COM already initialized in this thread");
            }
        }

        let automation = UIAutomation::new_direct()
            .map_err(|e| AutomationError::PlatformError(e.to_string()))?;
        let root = automation.get_root_element()?;
        Ok(Self {
            automation: ThreadSafeWinUIAutomation(Arc::new(automation)),
            root: ThreadSafeWinUIElement(Arc::new(root)),
        })
    }

    fn wrap(&self, element: uiautomation::UIElement) -> UIElement {
        WindowsUIElement::new(element, self.automation.clone()).into_element()
    }

    fn native<'a>(&self, element: &'a UIElement) -> Result<&'a WindowsUIElement, AutomationError> {
        element
            .as_any()
            .downcast_ref::<WindowsUIElement>()
            .ok_or_else(|| {
                AutomationError::InvalidArgument(
                    "element does not belong to the Windows engine".to_string(),
                )
            })
    }
}

fn to_screen(point: Point) -> uiautomation::types::Point {
    uiautomation::types::Point::new(point.x.round() as i32, point.y.round() as i32)
}

impl AccessibilityEngine for WindowsEngine {
    fn root(&self) -> UIElement {
        UIElement::new(Box::new(WindowsUIElement {
            element: self.root.clone(),
            automation: self.automation.clone(),
        }))
    }

    #[instrument(level = "trace", skip(self, root), fields(query = %query))]
    fn find_all(
        &self,
        root: &UIElement,
        query: &ElementQuery,
    ) -> Result<Vec<UIElement>, AutomationError> {
        query.validate()?;
        let root = self.native(root)?;
        let condition = match native_condition(&self.automation, query)? {
            Some((condition, _)) => condition,
            None => self.automation.0.create_true_condition()?,
        };
        let found = root.element.0.find_all(TreeScope::Descendants, &condition)?;
        trace!(candidates = found.len(), "provider search returned");

        let mut matches = Vec::new();
        for element in found {
            let element = self.wrap(element);
            match query.matches(&element) {
                Ok(true) => matches.push(element),
                Ok(false) => {}
                // A node can vanish between the search and the check.
                Err(e) if e.is_transient() => trace!(error = %e, "skipping vanished node"),
                Err(e) => return Err(e),
            }
        }
        Ok(matches)
    }

    #[instrument(level = "trace", skip(self))]
    fn process_windows(&self, process_id: u32) -> Result<Vec<UIElement>, AutomationError> {
        let condition = self.automation.0.create_property_condition(
            UIProperty::ProcessId,
            Variant::from(process_id as i32),
            None,
        )?;
        let found = self.root.0.find_all(TreeScope::Children, &condition)?;
        trace!(process_id, windows = found.len(), "top-level windows of process");
        Ok(found.into_iter().map(|e| self.wrap(e)).collect())
    }

    #[instrument(level = "debug", skip(self, window))]
    fn claim_foreground(&self, window: &UIElement) -> Result<(), AutomationError> {
        self.native(window)?.activate_window()?;
        self.wait_for_input_idle()
    }

    fn wait_for_input_idle(&self) -> Result<(), AutomationError> {
        thread::sleep(INPUT_IDLE_WAIT);
        Ok(())
    }

    fn mouse_move(&self, point: Point) -> Result<(), AutomationError> {
        Ok(Mouse::default().move_to(&to_screen(point))?)
    }

    fn mouse_click(&self, point: Point) -> Result<(), AutomationError> {
        Ok(Mouse::default().click(to_screen(point))?)
    }

    fn mouse_double_click(&self, point: Point) -> Result<(), AutomationError> {
        Ok(Mouse::default().double_click(to_screen(point))?)
    }

    fn press_key(&self, key: Key) -> Result<(), AutomationError> {
        Ok(Keyboard::new().send_keys(key_sequence(key))?)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
