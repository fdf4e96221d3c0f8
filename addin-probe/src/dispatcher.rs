//! Capability-probing interaction
//!
//! A logical "activate this" is attempted through each capability the element
//! exposes, highest priority first, ending with a simulated pointer click at
//! the center of its bounds. Failure to act is an outcome, not an error.

use crate::element::{Capability, Point, UIElement};
use crate::platforms::AccessibilityEngine;
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Result of one dispatch: which capability worked and what failed on the way
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub method: Option<Capability>,
    pub attempts: Vec<(Capability, String)>,
}

impl DispatchOutcome {
    pub fn succeeded(&self) -> bool {
        self.method.is_some()
    }
}

#[derive(Clone)]
pub struct InteractionDispatcher {
    engine: Arc<dyn AccessibilityEngine>,
    pointer_settle: Duration,
}

impl InteractionDispatcher {
    pub fn new(engine: Arc<dyn AccessibilityEngine>, pointer_settle: Duration) -> Self {
        Self {
            engine,
            pointer_settle,
        }
    }

    /// Activate `element` and report whether any capability succeeded.
    pub fn invoke(&self, element: &UIElement) -> bool {
        self.dispatch(element).succeeded()
    }

    #[instrument(level = "debug", skip(self, element), fields(element = ?element))]
    pub fn dispatch(&self, element: &UIElement) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for capability in Capability::PRIORITY {
            if !element.supports(capability) {
                continue;
            }
            let attempt = match capability {
                Capability::SelectionItem => element.select(),
                Capability::Invoke => element.invoke(),
                Capability::LegacyAction => element.do_default_action(),
                Capability::PointerClick => element
                    .bounds()
                    .and_then(|bounds| self.click_at(bounds.center())),
            };
            match attempt {
                Ok(()) => {
                    debug!(%capability, "dispatched");
                    outcome.method = Some(capability);
                    return outcome;
                }
                Err(e) => {
                    debug!(%capability, error = %e, "capability failed, falling through");
                    outcome.attempts.push((capability, e.to_string()));
                }
            }
        }
        warn!(attempts = outcome.attempts.len(), "no capability could activate the element");
        outcome
    }

    /// Double click the element's center, scrolling it into view first.
    #[instrument(level = "debug", skip(self, element, window))]
    pub fn double_click(&self, element: &UIElement, window: Option<&UIElement>) -> bool {
        if let Err(e) = element.scroll_into_view() {
            debug!(error = %e, "scroll into view unavailable");
        }
        if let Some(window) = window {
            if let Err(e) = self.engine.claim_foreground(window) {
                debug!(error = %e, "could not claim foreground before double click");
            }
        }
        let result = element.bounds().and_then(|bounds| {
            let center = bounds.center();
            self.engine.mouse_move(center)?;
            thread::sleep(self.pointer_settle);
            self.engine.mouse_double_click(center)
        });
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "double click failed");
                false
            }
        }
    }

    /// Invoke when the element supports it; otherwise double click a point
    /// near its left edge, where a list row's label usually sits.
    #[instrument(level = "debug", skip(self, element))]
    pub fn invoke_or_offset_double_click(&self, element: &UIElement) -> bool {
        if element.supports(Capability::Invoke) {
            match element.invoke() {
                Ok(()) => return true,
                Err(e) => debug!(error = %e, "invoke failed, using offset double click"),
            }
        }
        let result = element.bounds().and_then(|bounds| {
            let point = Point::new(
                bounds.left() + (bounds.width / 3.0).min(40.0),
                bounds.top() + bounds.height / 2.0,
            );
            self.engine.mouse_move(point)?;
            thread::sleep(self.pointer_settle);
            self.engine.mouse_double_click(point)
        });
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "offset double click failed");
                false
            }
        }
    }

    fn click_at(&self, point: Point) -> Result<(), crate::AutomationError> {
        self.engine.mouse_move(point)?;
        thread::sleep(self.pointer_settle);
        self.engine.mouse_click(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::memory::{Activation, InputEvent, MemoryEngine, MemoryNode};
    use crate::query::ControlKind;

    fn dispatcher(engine: &MemoryEngine) -> InteractionDispatcher {
        InteractionDispatcher::new(Arc::new(engine.clone()), Duration::from_millis(1))
    }

    #[test]
    fn test_failing_invoke_falls_through_to_legacy_action() {
        let engine = MemoryEngine::new(MemoryNode::desktop().child(
            MemoryNode::new(ControlKind::Hyperlink)
                .named("Close")
                .bounds(10.0, 10.0, 16.0, 16.0)
                .failing(Capability::Invoke)
                .with(Capability::LegacyAction),
        ));
        let close = engine.element("Close").unwrap();
        let outcome = dispatcher(&engine).dispatch(&close);
        assert_eq!(outcome.method, Some(Capability::LegacyAction));
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(outcome.attempts[0].0, Capability::Invoke);
        assert_eq!(engine.activations_of("Close"), vec![Activation::DefaultAction]);
    }

    #[test]
    fn test_element_without_bounds_or_capabilities_fails() {
        let engine = MemoryEngine::new(
            MemoryNode::desktop().child(MemoryNode::new(ControlKind::Text).named("Label")),
        );
        let label = engine.element("Label").unwrap();
        assert!(!dispatcher(&engine).invoke(&label));
        assert!(engine.input_events().is_empty());
    }

    #[test]
    fn test_offset_double_click_targets_left_third() {
        let engine = MemoryEngine::new(MemoryNode::desktop().child(
            MemoryNode::new(ControlKind::ListItem)
                .named("Project1")
                .bounds(100.0, 200.0, 300.0, 40.0),
        ));
        let row = engine.element("Project1").unwrap();
        assert!(dispatcher(&engine).invoke_or_offset_double_click(&row));
        assert!(engine
            .input_events()
            .contains(&InputEvent::DoubleClick(Point::new(140.0, 220.0))));
        assert_eq!(engine.activations_of("Project1"), vec![Activation::DoubleClick]);
    }
}
