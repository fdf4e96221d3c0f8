//! In-memory accessibility tree
//!
//! A scriptable stand-in for a live provider. Nodes can appear after a delay,
//! start hidden, fail the next few searches that walk over them, or refuse a
//! capability they advertise. Activating a node (select, invoke, default
//! action, pointer click) fires its [`Effect`]s, which is how scenarios model
//! a popup closing or a button revealing the next toolbar.
//!
//! ```
//! use addin_probe::platforms::memory::{MemoryEngine, MemoryNode};
//! use addin_probe::{Capability, ControlKind};
//!
//! let engine = MemoryEngine::new(
//!     MemoryNode::desktop().child(
//!         MemoryNode::new(ControlKind::Window)
//!             .named("Autodesk Revit")
//!             .child(MemoryNode::new(ControlKind::Button).named("Execute").with(Capability::Invoke)),
//!     ),
//! );
//! assert!(engine.exists("Execute"));
//! ```

use crate::element::{Bounds, Capability, Point, UIElement, UIElementImpl};
use crate::errors::AutomationError;
use crate::platforms::{AccessibilityEngine, Key};
use crate::query::{ControlKind, ElementQuery};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

/// Tree mutation applied when a node is activated or receives a key
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Detach the node (and its subtree) for good
    Remove(String),
    /// Make a hidden node part of the tree now
    Reveal(String),
    /// Make a hidden node part of the tree after a delay
    RevealAfter(String, Duration),
    /// Change a node's name (window titles, tab captions)
    Rename(String, String),
}

#[derive(Debug, Clone, PartialEq)]
enum Trigger {
    Activate,
    Key(Key),
}

/// What happened to a node, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    Select,
    Invoke,
    DefaultAction,
    Click,
    DoubleClick,
    ScrollIntoView,
    SetValue(String),
    Close,
}

/// Simulated input, in the order it was issued
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Move(Point),
    Click(Point),
    DoubleClick(Point),
    Key(Key),
    Foreground(String),
}

/// Declarative description of a node and its subtree
#[derive(Debug, Clone)]
pub struct MemoryNode {
    kind: ControlKind,
    name: Option<String>,
    key: Option<String>,
    automation_id: Option<String>,
    class_name: Option<String>,
    bounds: Bounds,
    capabilities: Vec<Capability>,
    failing: Vec<Capability>,
    scrollable: bool,
    editable: bool,
    offscreen: bool,
    offscreen_unreadable: bool,
    enabled: bool,
    process_id: u32,
    appear_after: Option<Duration>,
    hidden: bool,
    flaky: u32,
    effects: Vec<(Trigger, Effect)>,
    children: Vec<MemoryNode>,
}

impl MemoryNode {
    pub fn new(kind: ControlKind) -> Self {
        Self {
            kind,
            name: None,
            key: None,
            automation_id: None,
            class_name: None,
            bounds: Bounds::default(),
            capabilities: Vec::new(),
            failing: Vec::new(),
            scrollable: false,
            editable: false,
            offscreen: false,
            offscreen_unreadable: false,
            enabled: true,
            process_id: 0,
            appear_after: None,
            hidden: false,
            flaky: 0,
            effects: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Root pane standing in for the desktop.
    pub fn desktop() -> Self {
        MemoryNode::new(ControlKind::Pane)
            .named("Desktop")
            .bounds(0.0, 0.0, 1920.0, 1080.0)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Lookup key for test assertions and effects. Defaults to the name.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn automation_id(mut self, id: impl Into<String>) -> Self {
        self.automation_id = Some(id.into());
        self
    }

    pub fn class_name(mut self, class: impl Into<String>) -> Self {
        self.class_name = Some(class.into());
        self
    }

    pub fn bounds(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bounds = Bounds::new(x, y, width, height);
        self
    }

    pub fn with(mut self, capability: Capability) -> Self {
        if capability != Capability::PointerClick && !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    /// Advertise `capability` but fail when it is exercised.
    pub fn failing(mut self, capability: Capability) -> Self {
        self = self.with(capability);
        self.failing.push(capability);
        self
    }

    pub fn scrollable(mut self) -> Self {
        self.scrollable = true;
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn offscreen(mut self) -> Self {
        self.offscreen = true;
        self
    }

    /// Fail every read of the off-screen flag, as some providers do.
    pub fn offscreen_unreadable(mut self) -> Self {
        self.offscreen_unreadable = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn process_id(mut self, pid: u32) -> Self {
        self.process_id = pid;
        self
    }

    /// Join the tree `delay` after the engine is created.
    pub fn appear_after(mut self, delay: Duration) -> Self {
        self.appear_after = Some(delay);
        self
    }

    /// Stay out of the tree until an [`Effect::Reveal`] targets this node.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Make the next `times` searches that walk over this node fail.
    pub fn flaky(mut self, times: u32) -> Self {
        self.flaky = times;
        self
    }

    pub fn on_activate(mut self, effect: Effect) -> Self {
        self.effects.push((Trigger::Activate, effect));
        self
    }

    /// Apply `effect` when `key` is pressed while this node has focus.
    pub fn on_key(mut self, key: Key, effect: Effect) -> Self {
        self.effects.push((Trigger::Key(key), effect));
        self
    }

    pub fn child(mut self, child: MemoryNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = MemoryNode>) -> Self {
        self.children.extend(children);
        self
    }
}

#[derive(Debug)]
struct NodeState {
    kind: ControlKind,
    name: Option<String>,
    key: Option<String>,
    automation_id: Option<String>,
    class_name: Option<String>,
    bounds: Bounds,
    capabilities: Vec<Capability>,
    failing: Vec<Capability>,
    scrollable: bool,
    editable: bool,
    value: Option<String>,
    offscreen: bool,
    offscreen_unreadable: bool,
    enabled: bool,
    process_id: u32,
    appear_at: Option<Instant>,
    hidden: bool,
    removed: bool,
    flaky: u32,
    effects: Vec<(Trigger, Effect)>,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl NodeState {
    fn label(&self) -> String {
        self.key
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| self.kind.to_string())
    }

    fn answers_to(&self, key: &str) -> bool {
        match &self.key {
            Some(k) => k == key,
            None => self.name.as_deref() == Some(key),
        }
    }
}

#[derive(Debug)]
struct TreeState {
    nodes: Vec<NodeState>,
    activations: Vec<(String, Activation)>,
    input: Vec<InputEvent>,
    focused: Option<usize>,
}

impl TreeState {
    fn build(root: MemoryNode) -> Self {
        let mut state = TreeState {
            nodes: Vec::new(),
            activations: Vec::new(),
            input: Vec::new(),
            focused: None,
        };
        state.insert(root, None, Instant::now());
        state
    }

    fn insert(&mut self, node: MemoryNode, parent: Option<usize>, created: Instant) -> usize {
        let index = self.nodes.len();
        self.nodes.push(NodeState {
            kind: node.kind,
            name: node.name,
            key: node.key,
            automation_id: node.automation_id,
            class_name: node.class_name,
            bounds: node.bounds,
            capabilities: node.capabilities,
            failing: node.failing,
            scrollable: node.scrollable,
            editable: node.editable,
            value: None,
            offscreen: node.offscreen,
            offscreen_unreadable: node.offscreen_unreadable,
            enabled: node.enabled,
            process_id: node.process_id,
            appear_at: node.appear_after.map(|delay| created + delay),
            hidden: node.hidden,
            removed: false,
            flaky: node.flaky,
            effects: node.effects,
            parent,
            children: Vec::new(),
        });
        for child in node.children {
            let child_index = self.insert(child, Some(index), created);
            self.nodes[index].children.push(child_index);
        }
        index
    }

    /// Whether the node and all its ancestors are currently in the tree.
    fn is_present(&self, index: usize) -> bool {
        let now = Instant::now();
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            let node = &self.nodes[i];
            if node.removed || node.hidden || node.appear_at.is_some_and(|at| at > now) {
                return false;
            }
            cursor = node.parent;
        }
        true
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.answers_to(key))
    }

    fn present(&self, index: usize) -> Result<&NodeState, AutomationError> {
        if self.is_present(index) {
            Ok(&self.nodes[index])
        } else {
            Err(AutomationError::ElementDetached(self.nodes[index].label()))
        }
    }

    fn present_mut(&mut self, index: usize) -> Result<&mut NodeState, AutomationError> {
        if self.is_present(index) {
            Ok(&mut self.nodes[index])
        } else {
            Err(AutomationError::ElementDetached(self.nodes[index].label()))
        }
    }

    /// Present descendants of `root` in pre-order. Walking over a flaky node
    /// burns one of its failures and aborts the walk.
    fn descendants(&mut self, root: usize) -> Result<Vec<usize>, AutomationError> {
        let mut found = Vec::new();
        let mut stack: Vec<usize> = self.nodes[root].children.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            if !self.is_present(i) {
                continue;
            }
            if self.nodes[i].flaky > 0 {
                self.nodes[i].flaky -= 1;
                return Err(AutomationError::ElementDetached(format!(
                    "{} changed during search",
                    self.nodes[i].label()
                )));
            }
            found.push(i);
            stack.extend(self.nodes[i].children.iter().rev().copied());
        }
        Ok(found)
    }

    /// Present children of the root owned by `process_id`.
    fn top_level(&mut self, process_id: u32) -> Result<Vec<usize>, AutomationError> {
        let mut found = Vec::new();
        for i in self.nodes[0].children.clone() {
            if !self.is_present(i) || self.nodes[i].process_id != process_id {
                continue;
            }
            if self.nodes[i].flaky > 0 {
                self.nodes[i].flaky -= 1;
                return Err(AutomationError::ElementDetached(format!(
                    "{} changed during search",
                    self.nodes[i].label()
                )));
            }
            found.push(i);
        }
        Ok(found)
    }

    /// Deepest present, on-screen node under `point`. Later siblings are on top.
    fn hit_test(&self, point: Point) -> Option<usize> {
        let mut hit = None;
        let mut level = vec![0usize];
        while !level.is_empty() {
            let mut next = None;
            for &i in level.iter().rev() {
                let node = &self.nodes[i];
                if self.is_present(i) && !node.offscreen && node.bounds.contains_point(point) {
                    next = Some(i);
                    break;
                }
            }
            match next {
                Some(i) => {
                    hit = Some(i);
                    level = self.nodes[i].children.clone();
                }
                None => break,
            }
        }
        hit
    }

    fn record(&mut self, index: usize, activation: Activation) {
        let label = self.nodes[index].label();
        debug!(node = %label, ?activation, "memory tree activation");
        self.activations.push((label, activation));
    }

    fn fire(&mut self, index: usize, trigger: Trigger) {
        let effects: Vec<Effect> = self.nodes[index]
            .effects
            .iter()
            .filter(|(t, _)| *t == trigger)
            .map(|(_, e)| e.clone())
            .collect();
        for effect in effects {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        let target = match &effect {
            Effect::Remove(k) | Effect::Reveal(k) | Effect::RevealAfter(k, _) | Effect::Rename(k, _) => {
                self.index_of(k)
            }
        };
        let Some(i) = target else {
            debug!(?effect, "effect target not in tree");
            return;
        };
        let node = &mut self.nodes[i];
        match effect {
            Effect::Remove(_) => node.removed = true,
            Effect::Reveal(_) => {
                node.hidden = false;
                node.appear_at = None;
            }
            Effect::RevealAfter(_, delay) => {
                node.hidden = false;
                node.appear_at = Some(Instant::now() + delay);
            }
            Effect::Rename(_, name) => node.name = Some(name),
        }
    }

    fn activate(
        &mut self,
        index: usize,
        capability: Capability,
        activation: Activation,
    ) -> Result<(), AutomationError> {
        let node = self.present(index)?;
        if !node.capabilities.contains(&capability) {
            return Err(AutomationError::UnsupportedOperation(format!(
                "{} does not support {capability}",
                node.label()
            )));
        }
        if !node.enabled {
            return Err(AutomationError::PlatformError(format!(
                "{} is disabled",
                node.label()
            )));
        }
        if node.failing.contains(&capability) {
            return Err(AutomationError::PlatformError(format!(
                "{capability} failed on {}",
                node.label()
            )));
        }
        self.record(index, activation);
        self.fire(index, Trigger::Activate);
        Ok(())
    }

    fn pointer(&mut self, point: Point, activation: Activation) {
        if let Some(i) = self.hit_test(point) {
            if i != 0 && self.nodes[i].enabled {
                self.focused = Some(i);
                self.record(i, activation);
                self.fire(i, Trigger::Activate);
            }
        }
    }
}

fn lock(state: &Mutex<TreeState>) -> Result<MutexGuard<'_, TreeState>, AutomationError> {
    state
        .lock()
        .map_err(|e| AutomationError::Internal(format!("memory tree lock poisoned: {e}")))
}

/// Engine over an in-memory tree. Clones share the same tree.
#[derive(Debug, Clone)]
pub struct MemoryEngine {
    state: Arc<Mutex<TreeState>>,
}

impl MemoryEngine {
    /// Build an engine whose root element is `root` (usually [`MemoryNode::desktop`]).
    pub fn new(root: MemoryNode) -> Self {
        Self {
            state: Arc::new(Mutex::new(TreeState::build(root))),
        }
    }

    fn element_at(&self, index: usize) -> UIElement {
        UIElement::new(Box::new(MemoryElement {
            state: Arc::clone(&self.state),
            index,
        }))
    }

    /// Handle to the node answering to `key`, if it is currently in the tree.
    pub fn element(&self, key: &str) -> Option<UIElement> {
        let state = lock(&self.state).ok()?;
        let index = state.index_of(key)?;
        state.is_present(index).then(|| self.element_at(index))
    }

    /// Whether the node answering to `key` is currently in the tree.
    pub fn exists(&self, key: &str) -> bool {
        lock(&self.state)
            .ok()
            .and_then(|state| state.index_of(key).map(|i| state.is_present(i)))
            .unwrap_or(false)
    }

    pub fn apply(&self, effect: Effect) {
        if let Ok(mut state) = lock(&self.state) {
            state.apply(effect);
        }
    }

    /// Every activation so far, as `(node label, activation)` pairs.
    pub fn activations(&self) -> Vec<(String, Activation)> {
        lock(&self.state)
            .map(|s| s.activations.clone())
            .unwrap_or_default()
    }

    /// Activations received by the node answering to `key`.
    pub fn activations_of(&self, key: &str) -> Vec<Activation> {
        self.activations()
            .into_iter()
            .filter(|(label, _)| label == key)
            .map(|(_, a)| a)
            .collect()
    }

    pub fn input_events(&self) -> Vec<InputEvent> {
        lock(&self.state).map(|s| s.input.clone()).unwrap_or_default()
    }

    pub fn value_of(&self, key: &str) -> Option<String> {
        let state = lock(&self.state).ok()?;
        let index = state.index_of(key)?;
        state.nodes[index].value.clone()
    }
}

impl AccessibilityEngine for MemoryEngine {
    fn root(&self) -> UIElement {
        self.element_at(0)
    }

    fn find_all(
        &self,
        root: &UIElement,
        query: &ElementQuery,
    ) -> Result<Vec<UIElement>, AutomationError> {
        query.validate()?;
        let root_index = memory_index(root)?;
        let indices = {
            let mut state = lock(&self.state)?;
            state.present(root_index)?;
            state.descendants(root_index)?
        };
        // Predicates read through the element handles, which take the lock
        // themselves.
        let mut matches = Vec::new();
        for index in indices {
            let element = self.element_at(index);
            if query.matches(&element)? {
                matches.push(element);
            }
        }
        Ok(matches)
    }

    fn process_windows(&self, process_id: u32) -> Result<Vec<UIElement>, AutomationError> {
        let indices = lock(&self.state)?.top_level(process_id)?;
        Ok(indices.into_iter().map(|i| self.element_at(i)).collect())
    }

    fn claim_foreground(&self, window: &UIElement) -> Result<(), AutomationError> {
        let index = memory_index(window)?;
        let mut state = lock(&self.state)?;
        let label = state.present(index)?.label();
        state.input.push(InputEvent::Foreground(label));
        Ok(())
    }

    fn wait_for_input_idle(&self) -> Result<(), AutomationError> {
        Ok(())
    }

    fn mouse_move(&self, point: Point) -> Result<(), AutomationError> {
        lock(&self.state)?.input.push(InputEvent::Move(point));
        Ok(())
    }

    fn mouse_click(&self, point: Point) -> Result<(), AutomationError> {
        let mut state = lock(&self.state)?;
        state.input.push(InputEvent::Click(point));
        state.pointer(point, Activation::Click);
        Ok(())
    }

    fn mouse_double_click(&self, point: Point) -> Result<(), AutomationError> {
        let mut state = lock(&self.state)?;
        state.input.push(InputEvent::DoubleClick(point));
        state.pointer(point, Activation::DoubleClick);
        Ok(())
    }

    fn press_key(&self, key: Key) -> Result<(), AutomationError> {
        let mut state = lock(&self.state)?;
        state.input.push(InputEvent::Key(key));
        if let Some(focused) = state.focused.filter(|&i| state.is_present(i)) {
            state.fire(focused, Trigger::Key(key));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn memory_index(element: &UIElement) -> Result<usize, AutomationError> {
    element
        .as_any()
        .downcast_ref::<MemoryElement>()
        .map(|e| e.index)
        .ok_or_else(|| {
            AutomationError::InvalidArgument("element does not belong to a memory tree".to_string())
        })
}

#[derive(Debug)]
struct MemoryElement {
    state: Arc<Mutex<TreeState>>,
    index: usize,
}

impl MemoryElement {
    fn read<R>(&self, f: impl FnOnce(&NodeState) -> R) -> Result<R, AutomationError> {
        let state = lock(&self.state)?;
        state.present(self.index).map(f)
    }
}

impl UIElementImpl for MemoryElement {
    fn object_id(&self) -> usize {
        // Unique per tree: the arena address plus the node slot.
        (Arc::as_ptr(&self.state) as usize).wrapping_add(self.index)
    }

    fn name(&self) -> Result<Option<String>, AutomationError> {
        self.read(|n| n.name.clone())
    }

    fn control_kind(&self) -> Result<ControlKind, AutomationError> {
        self.read(|n| n.kind)
    }

    fn automation_id(&self) -> Option<String> {
        self.read(|n| n.automation_id.clone()).ok().flatten()
    }

    fn class_name(&self) -> Option<String> {
        self.read(|n| n.class_name.clone()).ok().flatten()
    }

    fn bounds(&self) -> Result<Bounds, AutomationError> {
        self.read(|n| n.bounds)
    }

    fn is_offscreen(&self) -> Result<bool, AutomationError> {
        let (offscreen, unreadable, label) =
            self.read(|n| (n.offscreen, n.offscreen_unreadable, n.label()))?;
        if unreadable {
            return Err(AutomationError::PlatformError(format!(
                "off-screen state of {label} is unavailable"
            )));
        }
        Ok(offscreen)
    }

    fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.read(|n| n.enabled)
    }

    fn process_id(&self) -> Result<u32, AutomationError> {
        self.read(|n| n.process_id)
    }

    fn parent(&self) -> Result<Option<UIElement>, AutomationError> {
        let parent = self.read(|n| n.parent)?;
        Ok(parent.map(|index| {
            UIElement::new(Box::new(MemoryElement {
                state: Arc::clone(&self.state),
                index,
            }))
        }))
    }

    fn supports(&self, capability: Capability) -> bool {
        self.read(|n| n.capabilities.contains(&capability))
            .unwrap_or(false)
    }

    fn select(&self) -> Result<(), AutomationError> {
        lock(&self.state)?.activate(self.index, Capability::SelectionItem, Activation::Select)
    }

    fn invoke(&self) -> Result<(), AutomationError> {
        lock(&self.state)?.activate(self.index, Capability::Invoke, Activation::Invoke)
    }

    fn do_default_action(&self) -> Result<(), AutomationError> {
        lock(&self.state)?.activate(
            self.index,
            Capability::LegacyAction,
            Activation::DefaultAction,
        )
    }

    fn scroll_into_view(&self) -> Result<(), AutomationError> {
        let mut state = lock(&self.state)?;
        let node = state.present_mut(self.index)?;
        if !node.scrollable {
            return Err(AutomationError::UnsupportedOperation(format!(
                "{} cannot scroll into view",
                node.label()
            )));
        }
        node.offscreen = false;
        state.record(self.index, Activation::ScrollIntoView);
        Ok(())
    }

    fn set_value(&self, value: &str) -> Result<(), AutomationError> {
        let mut state = lock(&self.state)?;
        let node = state.present_mut(self.index)?;
        if !node.editable {
            return Err(AutomationError::UnsupportedOperation(format!(
                "{} is not editable",
                node.label()
            )));
        }
        node.value = Some(value.to_string());
        state.focused = Some(self.index);
        state.record(self.index, Activation::SetValue(value.to_string()));
        Ok(())
    }

    fn close(&self) -> Result<(), AutomationError> {
        let mut state = lock(&self.state)?;
        state.present_mut(self.index)?.removed = true;
        state.record(self.index, Activation::Close);
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn UIElementImpl> {
        Box::new(MemoryElement {
            state: Arc::clone(&self.state),
            index: self.index,
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
