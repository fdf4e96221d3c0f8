use crate::errors::AutomationError;
use crate::query::ControlKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;
use tracing::instrument;

/// Bounding region of a node in screen coordinates.
///
/// Read fresh from the provider whenever it is needed; never cached across polls.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True if `other` lies entirely within `self` (edges inclusive).
    pub fn contains(&self, other: &Bounds) -> bool {
        other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }
}

/// Screen position used for pointer simulation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.0}, {:.0})", self.x, self.y)
    }
}

/// Interaction affordances a node may expose, in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Selection-item pattern: the node can be selected
    SelectionItem,
    /// Invoke pattern: the node performs a single unambiguous action
    Invoke,
    /// Legacy accessible default action
    LegacyAction,
    /// Coordinate-based pointer click at the node's center
    PointerClick,
}

impl Capability {
    /// All capabilities, highest priority first.
    pub const PRIORITY: [Capability; 4] = [
        Capability::SelectionItem,
        Capability::Invoke,
        Capability::LegacyAction,
        Capability::PointerClick,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Interface for platform-specific element implementations
pub trait UIElementImpl: Send + Sync + Debug {
    fn object_id(&self) -> usize;
    fn name(&self) -> Result<Option<String>, AutomationError>;
    fn control_kind(&self) -> Result<ControlKind, AutomationError>;
    fn automation_id(&self) -> Option<String>;
    fn class_name(&self) -> Option<String>;
    fn bounds(&self) -> Result<Bounds, AutomationError>;
    fn is_offscreen(&self) -> Result<bool, AutomationError>;
    fn is_enabled(&self) -> Result<bool, AutomationError>;
    fn process_id(&self) -> Result<u32, AutomationError>;
    fn parent(&self) -> Result<Option<UIElement>, AutomationError>;
    /// Whether the node exposes a pattern-backed capability. `PointerClick` is
    /// decided from geometry by [`UIElement::supports`] and never reaches here.
    fn supports(&self, capability: Capability) -> bool;
    fn select(&self) -> Result<(), AutomationError>;
    fn invoke(&self) -> Result<(), AutomationError>;
    fn do_default_action(&self) -> Result<(), AutomationError>;
    fn scroll_into_view(&self) -> Result<(), AutomationError>;
    fn set_value(&self, value: &str) -> Result<(), AutomationError>;
    fn close(&self) -> Result<(), AutomationError>;
    fn clone_box(&self) -> Box<dyn UIElementImpl>;
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Handle to a live node in the external accessibility tree.
///
/// The engine does not own the node. A handle is only trustworthy for the poll
/// iteration that produced it; after any wait, resolve again.
pub struct UIElement {
    inner: Box<dyn UIElementImpl>,
}

impl UIElement {
    /// Create a new UI element from a platform-specific implementation
    pub fn new(impl_: Box<dyn UIElementImpl>) -> Self {
        Self { inner: impl_ }
    }

    pub fn object_id(&self) -> usize {
        self.inner.object_id()
    }

    pub fn name(&self) -> Result<Option<String>, AutomationError> {
        self.inner.name()
    }

    /// Name with read failures and missing names folded into `None`.
    pub fn name_or_none(&self) -> Option<String> {
        self.inner.name().ok().flatten().filter(|n| !n.is_empty())
    }

    /// Window title. Providers report a window's title as its name.
    pub fn title(&self) -> Result<Option<String>, AutomationError> {
        self.inner.name()
    }

    pub fn control_kind(&self) -> Result<ControlKind, AutomationError> {
        self.inner.control_kind()
    }

    pub fn automation_id(&self) -> Option<String> {
        self.inner.automation_id()
    }

    pub fn class_name(&self) -> Option<String> {
        self.inner.class_name()
    }

    pub fn bounds(&self) -> Result<Bounds, AutomationError> {
        self.inner.bounds()
    }

    pub fn is_offscreen(&self) -> Result<bool, AutomationError> {
        self.inner.is_offscreen()
    }

    pub fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.inner.is_enabled()
    }

    pub fn process_id(&self) -> Result<u32, AutomationError> {
        self.inner.process_id()
    }

    pub fn parent(&self) -> Result<Option<UIElement>, AutomationError> {
        self.inner.parent()
    }

    /// Probe a capability without exercising it.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::PointerClick => self.bounds().map(|b| !b.is_empty()).unwrap_or(false),
            other => self.inner.supports(other),
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn select(&self) -> Result<(), AutomationError> {
        self.inner.select()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn invoke(&self) -> Result<(), AutomationError> {
        self.inner.invoke()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn do_default_action(&self) -> Result<(), AutomationError> {
        self.inner.do_default_action()
    }

    pub fn scroll_into_view(&self) -> Result<(), AutomationError> {
        self.inner.scroll_into_view()
    }

    #[instrument(level = "debug", skip(self, value))]
    pub fn set_value(&self, value: &str) -> Result<(), AutomationError> {
        self.inner.set_value(value)
    }

    pub fn close(&self) -> Result<(), AutomationError> {
        self.inner.close()
    }

    /// Stable fingerprint of the node's identity-bearing properties.
    ///
    /// Two handles resolved at different times for the same node hash the same,
    /// which is what "equivalent re-resolution" means here.
    pub fn fingerprint(&self) -> String {
        let mut to_hash = String::new();
        if let Some(id) = self.automation_id().filter(|s| !s.is_empty()) {
            to_hash.push_str(&id);
        }
        if let Ok(kind) = self.control_kind() {
            if kind != ControlKind::Custom {
                to_hash.push_str(&kind.to_string());
            }
        }
        if let Some(name) = self.name_or_none() {
            to_hash.push_str(&name);
        }
        if let Some(class) = self.class_name().filter(|s| !s.is_empty()) {
            to_hash.push_str(&class);
        }
        if to_hash.is_empty() {
            if let Ok(b) = self.bounds() {
                to_hash.push_str(&format!("{}:{}:{}:{}", b.x, b.y, b.width, b.height));
            }
        }
        if to_hash.is_empty() {
            return format!("obj-{:x}", self.object_id());
        }
        let hash = blake3::hash(to_hash.as_bytes());
        hash.to_hex().as_str()[..16].to_string()
    }

    pub(crate) fn as_any(&self) -> &dyn std::any::Any {
        self.inner.as_any()
    }
}

impl Clone for UIElement {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

impl Debug for UIElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug_struct = f.debug_struct("UIElement");
        if let Ok(kind) = self.control_kind() {
            debug_struct.field("kind", &kind);
        }
        if let Some(name) = self.name_or_none() {
            debug_struct.field("name", &name);
        }
        debug_struct.finish()
    }
}

impl PartialEq for UIElement {
    fn eq(&self, other: &Self) -> bool {
        self.object_id() == other.object_id()
    }
}
