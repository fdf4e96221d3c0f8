use super::types::{ThreadSafeWinUIAutomation, ThreadSafeWinUIElement};
use super::utils::from_control_type;
use crate::element::{Bounds, Capability, UIElement, UIElementImpl};
use crate::{AutomationError, ControlKind};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;
use uiautomation::patterns;

pub struct WindowsUIElement {
    pub(crate) element: ThreadSafeWinUIElement,
    pub(crate) automation: ThreadSafeWinUIAutomation,
}

impl WindowsUIElement {
    pub(crate) fn new(element: uiautomation::UIElement, automation: ThreadSafeWinUIAutomation) -> Self {
        Self {
            element: ThreadSafeWinUIElement(Arc::new(element)),
            automation,
        }
    }

    /// Get the raw UI element for direct automation
    pub fn get_raw_element(&self) -> &uiautomation::UIElement {
        &self.element.0
    }

    pub(crate) fn into_element(self) -> UIElement {
        UIElement::new(Box::new(self))
    }

    /// Bring the element's top-level window to the foreground and focus it.
    pub(crate) fn activate_window(&self) -> Result<(), AutomationError> {
        use windows::Win32::UI::WindowsAndMessaging::{
            BringWindowToTop, IsIconic, SetForegroundWindow, ShowWindow, SW_RESTORE,
        };

        let hwnd = match self.element.0.get_native_window_handle() {
            Ok(handle) => handle,
            Err(_) => {
                debug!("no native window handle, falling back to set_focus");
                return self.element.0.set_focus().map_err(Into::into);
            }
        };

        unsafe {
            let hwnd_param: windows::Win32::Foundation::HWND = hwnd.into();

            if IsIconic(hwnd_param).as_bool() {
                debug!("window is minimized, restoring it");
                let _ = ShowWindow(hwnd_param, SW_RESTORE);
            }

            let _ = BringWindowToTop(hwnd_param);

            if !SetForegroundWindow(hwnd_param).as_bool() {
                debug!("SetForegroundWindow refused, continuing");
            }

            let _ = self.element.0.set_focus();
        }
        Ok(())
    }

    fn unsupported(&self, what: &str) -> AutomationError {
        AutomationError::UnsupportedOperation(format!(
            "{what} is not supported by '{}'",
            self.element.0.get_name().unwrap_or_default()
        ))
    }
}

impl Debug for WindowsUIElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowsUIElement")
            .field("name", &self.element.0.get_name().unwrap_or_default())
            .finish()
    }
}

impl UIElementImpl for WindowsUIElement {
    fn object_id(&self) -> usize {
        // Runtime ids are stable for the node's lifetime and unique on the desktop.
        let runtime_id = self.element.0.get_runtime_id().unwrap_or_default();
        let mut hasher = blake3::Hasher::new();
        for part in &runtime_id {
            hasher.update(&part.to_le_bytes());
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(bytes) as usize
    }

    fn name(&self) -> Result<Option<String>, AutomationError> {
        let name = self.element.0.get_name()?;
        Ok((!name.is_empty()).then_some(name))
    }

    fn control_kind(&self) -> Result<ControlKind, AutomationError> {
        Ok(from_control_type(self.element.0.get_control_type()?))
    }

    fn automation_id(&self) -> Option<String> {
        self.element
            .0
            .get_automation_id()
            .ok()
            .filter(|id| !id.is_empty())
    }

    fn class_name(&self) -> Option<String> {
        self.element
            .0
            .get_classname()
            .ok()
            .filter(|name| !name.is_empty())
    }

    fn bounds(&self) -> Result<Bounds, AutomationError> {
        let rect = self.element.0.get_bounding_rectangle()?;
        Ok(Bounds::new(
            rect.get_left() as f64,
            rect.get_top() as f64,
            rect.get_width() as f64,
            rect.get_height() as f64,
        ))
    }

    fn is_offscreen(&self) -> Result<bool, AutomationError> {
        Ok(self.element.0.is_offscreen()?)
    }

    fn is_enabled(&self) -> Result<bool, AutomationError> {
        Ok(self.element.0.is_enabled()?)
    }

    fn process_id(&self) -> Result<u32, AutomationError> {
        Ok(self.element.0.get_process_id()?)
    }

    fn parent(&self) -> Result<Option<UIElement>, AutomationError> {
        let walker = self.automation.0.get_control_view_walker()?;
        let Ok(parent) = walker.get_parent(&self.element.0) else {
            return Ok(None);
        };
        // The desktop root has no parent of its own; report it as absent.
        let root = self.automation.0.get_root_element()?;
        if parent.get_runtime_id()? == root.get_runtime_id()? {
            return Ok(None);
        }
        Ok(Some(
            WindowsUIElement::new(parent, self.automation.clone()).into_element(),
        ))
    }

    fn supports(&self, capability: Capability) -> bool {
        let element = &self.element.0;
        match capability {
            Capability::SelectionItem => element
                .get_pattern::<patterns::UISelectionItemPattern>()
                .is_ok(),
            Capability::Invoke => element.get_pattern::<patterns::UIInvokePattern>().is_ok(),
            Capability::LegacyAction => element
                .get_pattern::<patterns::UILegacyIAccessiblePattern>()
                .is_ok(),
            Capability::PointerClick => false,
        }
    }

    fn select(&self) -> Result<(), AutomationError> {
        let pattern = self
            .element
            .0
            .get_pattern::<patterns::UISelectionItemPattern>()
            .map_err(|_| self.unsupported("selection"))?;
        Ok(pattern.select()?)
    }

    fn invoke(&self) -> Result<(), AutomationError> {
        let pattern = self
            .element
            .0
            .get_pattern::<patterns::UIInvokePattern>()
            .map_err(|_| self.unsupported("invoke"))?;
        Ok(pattern.invoke()?)
    }

    fn do_default_action(&self) -> Result<(), AutomationError> {
        let pattern = self
            .element
            .0
            .get_pattern::<patterns::UILegacyIAccessiblePattern>()
            .map_err(|_| self.unsupported("default action"))?;
        Ok(pattern.do_default_action()?)
    }

    fn scroll_into_view(&self) -> Result<(), AutomationError> {
        let pattern = self
            .element
            .0
            .get_pattern::<patterns::UIScrollItemPattern>()
            .map_err(|_| self.unsupported("scroll into view"))?;
        Ok(pattern.scroll_into_view()?)
    }

    fn set_value(&self, value: &str) -> Result<(), AutomationError> {
        let pattern = self
            .element
            .0
            .get_pattern::<patterns::UIValuePattern>()
            .map_err(|_| self.unsupported("set value"))?;
        let _ = self.element.0.set_focus();
        Ok(pattern.set_value(value)?)
    }

    fn close(&self) -> Result<(), AutomationError> {
        match self.element.0.get_pattern::<patterns::UIWindowPattern>() {
            Ok(pattern) => Ok(pattern.close()?),
            Err(_) => {
                debug!("no window pattern, sending Alt+F4");
                self.activate_window()?;
                Ok(self.element.0.send_keys("%{F4}", 10)?)
            }
        }
    }

    fn clone_box(&self) -> Box<dyn UIElementImpl> {
        Box::new(WindowsUIElement {
            element: self.element.clone(),
            automation: self.automation.clone(),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
