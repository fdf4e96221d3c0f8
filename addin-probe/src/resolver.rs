//! Polling element resolution over an ordered chain of fallback strategies

use crate::candidate::CandidateSelector;
use crate::deadline::Deadline;
use crate::element::{Bounds, UIElement};
use crate::errors::AutomationError;
use crate::platforms::AccessibilityEngine;
use crate::query::ElementQuery;
use crate::waiter::{ConditionWaiter, Probe};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// How a strategy's raw match maps to the element it resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// The match itself
    Match,
    /// The match's parent, e.g. the row around a matching text cell
    Parent,
}

/// One link of a fallback chain
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub query: ElementQuery,
    pub projection: Projection,
}

impl Strategy {
    pub fn parent_of(query: impl Into<ElementQuery>) -> Self {
        Self {
            query: query.into(),
            projection: Projection::Parent,
        }
    }
}

impl From<ElementQuery> for Strategy {
    fn from(query: ElementQuery) -> Self {
        Self {
            query,
            projection: Projection::Match,
        }
    }
}

impl From<&str> for Strategy {
    fn from(query: &str) -> Self {
        Strategy::from(ElementQuery::from(query))
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.projection {
            Projection::Match => write!(f, "{}", self.query),
            Projection::Parent => write!(f, "parent({})", self.query),
        }
    }
}

/// Render a chain for logs and failure reports.
pub fn describe(strategies: &[Strategy]) -> String {
    strategies
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Finds elements by polling the tree until a strategy matches or time runs out.
///
/// Within one iteration the strategies are tried in order and the first one
/// with a usable match wins. A provider failure during one strategy's search
/// only skips that strategy for the iteration.
#[derive(Clone)]
pub struct ElementResolver {
    engine: Arc<dyn AccessibilityEngine>,
    waiter: ConditionWaiter,
    foreground: Option<UIElement>,
}

impl ElementResolver {
    pub fn new(engine: Arc<dyn AccessibilityEngine>, poll_interval: Duration) -> Self {
        Self {
            engine,
            waiter: ConditionWaiter::new(poll_interval),
            foreground: None,
        }
    }

    /// Claim foreground for `window` at the start of every poll iteration.
    pub fn with_foreground(mut self, window: UIElement) -> Self {
        self.foreground = Some(window);
        self
    }

    pub fn engine(&self) -> &Arc<dyn AccessibilityEngine> {
        &self.engine
    }

    /// First match of the first strategy that matches.
    #[instrument(level = "debug", skip(self, root, strategies), fields(chain = %describe(strategies)))]
    pub fn resolve(
        &self,
        root: &UIElement,
        strategies: &[Strategy],
        deadline: &Deadline,
    ) -> Result<Option<UIElement>, AutomationError> {
        self.resolve_by(root, strategies, deadline, |matches| matches.into_iter().next())
    }

    /// Like [`resolve`](Self::resolve), but off-screen matches do not count.
    /// A node whose off-screen flag cannot be read counts as visible.
    #[instrument(level = "debug", skip(self, root, strategies), fields(chain = %describe(strategies)))]
    pub fn resolve_visible(
        &self,
        root: &UIElement,
        strategies: &[Strategy],
        deadline: &Deadline,
    ) -> Result<Option<UIElement>, AutomationError> {
        self.resolve_by(root, strategies, deadline, |matches| {
            matches
                .into_iter()
                .find(|e| !matches!(e.is_offscreen(), Ok(true)))
        })
    }

    /// Like [`resolve`](Self::resolve), but each strategy's matches are
    /// narrowed by `selector` relative to `anchor`. A strategy whose matches
    /// are all rejected does not count as matching.
    #[instrument(level = "debug", skip(self, root, strategies, selector), fields(chain = %describe(strategies)))]
    pub fn resolve_selecting(
        &self,
        root: &UIElement,
        strategies: &[Strategy],
        deadline: &Deadline,
        selector: &CandidateSelector,
        anchor: Bounds,
    ) -> Result<Option<UIElement>, AutomationError> {
        self.resolve_by(root, strategies, deadline, |matches| {
            selector.select(matches, anchor)
        })
    }

    /// All matches of the first strategy that matches.
    #[instrument(level = "debug", skip(self, root, strategies), fields(chain = %describe(strategies)))]
    pub fn resolve_all(
        &self,
        root: &UIElement,
        strategies: &[Strategy],
        deadline: &Deadline,
    ) -> Result<Option<Vec<UIElement>>, AutomationError> {
        self.resolve_by(root, strategies, deadline, |matches| {
            (!matches.is_empty()).then_some(matches)
        })
    }

    /// Poll with a custom reduction of each strategy's matches.
    ///
    /// `pick` receives the (projected) matches of one strategy; returning
    /// `None` moves on to the next strategy in the same iteration. `Ok(None)`
    /// means the deadline elapsed without a pick. Errors are reserved for
    /// caller misuse such as an unparseable query.
    pub fn resolve_by<T>(
        &self,
        root: &UIElement,
        strategies: &[Strategy],
        deadline: &Deadline,
        mut pick: impl FnMut(Vec<UIElement>) -> Option<T>,
    ) -> Result<Option<T>, AutomationError> {
        if strategies.is_empty() {
            return Err(AutomationError::InvalidArgument(
                "resolution needs at least one strategy".to_string(),
            ));
        }
        for strategy in strategies {
            strategy.query.validate()?;
        }

        let found = self.waiter.poll(deadline, || {
            if let Some(window) = &self.foreground {
                if let Err(e) = self.engine.claim_foreground(window) {
                    debug!(error = %e, "could not claim foreground before search");
                }
            }
            self.probe_with(root, strategies, &mut pick)
        });
        if found.is_none() {
            debug!(
                chain = %describe(strategies),
                elapsed_ms = deadline.elapsed().as_millis() as u64,
                "no strategy matched before the deadline"
            );
        }
        Ok(found)
    }

    /// One iteration over the chain: the first strategy yielding any match.
    pub fn probe(&self, root: &UIElement, strategies: &[Strategy]) -> Probe<Vec<UIElement>> {
        self.probe_with(root, strategies, &mut |matches: Vec<UIElement>| {
            (!matches.is_empty()).then_some(matches)
        })
    }

    fn probe_with<T>(
        &self,
        root: &UIElement,
        strategies: &[Strategy],
        pick: &mut impl FnMut(Vec<UIElement>) -> Option<T>,
    ) -> Probe<T> {
        let mut last_failure = None;
        for (position, strategy) in strategies.iter().enumerate() {
            let matches = match self.engine.find_all(root, &strategy.query) {
                Ok(matches) => matches,
                Err(e) => {
                    debug!(position, strategy = %strategy, error = %e, "search failed this iteration");
                    last_failure = Some(e);
                    continue;
                }
            };
            if matches.is_empty() {
                continue;
            }
            let projected = match project(matches, strategy.projection) {
                Ok(projected) => projected,
                Err(e) => {
                    debug!(position, strategy = %strategy, error = %e, "projection failed this iteration");
                    last_failure = Some(e);
                    continue;
                }
            };
            let count = projected.len();
            if let Some(picked) = pick(projected) {
                debug!(position, strategy = %strategy, count, "strategy matched");
                return Probe::Found(picked);
            }
        }
        match last_failure {
            Some(e) => Probe::Transient(e),
            None => Probe::NotYet,
        }
    }
}

fn project(
    matches: Vec<UIElement>,
    projection: Projection,
) -> Result<Vec<UIElement>, AutomationError> {
    match projection {
        Projection::Match => Ok(matches),
        Projection::Parent => {
            let mut parents = Vec::with_capacity(matches.len());
            for element in &matches {
                if let Some(parent) = element.parent()? {
                    parents.push(parent);
                }
            }
            Ok(parents)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::memory::{MemoryEngine, MemoryNode};
    use crate::query::ControlKind;

    fn resolver(engine: &MemoryEngine) -> ElementResolver {
        ElementResolver::new(Arc::new(engine.clone()), Duration::from_millis(10))
    }

    #[test]
    fn test_parent_projection() {
        let engine = MemoryEngine::new(MemoryNode::desktop().child(
            MemoryNode::new(ControlKind::ListItem)
                .key("row")
                .child(MemoryNode::new(ControlKind::Text).named("Project1")),
        ));
        let found = resolver(&engine)
            .resolve(
                &engine.root(),
                &[Strategy::parent_of(ElementQuery::kind_named(ControlKind::Text, "Project1"))],
                &Deadline::after(Duration::from_millis(50)),
            )
            .unwrap()
            .unwrap();
        assert_eq!(found.control_kind().unwrap(), ControlKind::ListItem);
    }

    #[test]
    fn test_invalid_query_is_misuse() {
        let engine = MemoryEngine::new(MemoryNode::desktop());
        let result = resolver(&engine).resolve(
            &engine.root(),
            &[Strategy::from("role:Gizmo")],
            &Deadline::after(Duration::from_millis(50)),
        );
        assert!(matches!(result, Err(AutomationError::InvalidSelector(_))));
    }

    #[test]
    fn test_resolve_visible_skips_offscreen_then_falls_back() {
        let engine = MemoryEngine::new(MemoryNode::desktop().children([
            MemoryNode::new(ControlKind::Button).named("Execute").offscreen(),
            MemoryNode::new(ControlKind::MenuItem).named("Execute"),
        ]));
        let found = resolver(&engine)
            .resolve_visible(
                &engine.root(),
                &[
                    ElementQuery::kind_named(ControlKind::Button, "Execute").into(),
                    ElementQuery::kind_named(ControlKind::MenuItem, "Execute").into(),
                ],
                &Deadline::after(Duration::from_millis(50)),
            )
            .unwrap()
            .unwrap();
        assert_eq!(found.control_kind().unwrap(), ControlKind::MenuItem);
    }

    #[test]
    fn test_unreadable_offscreen_flag_counts_as_visible() {
        let engine = MemoryEngine::new(MemoryNode::desktop().child(
            MemoryNode::new(ControlKind::Button)
                .named("ElectricalLoadPlugin")
                .offscreen_unreadable(),
        ));
        let found = resolver(&engine)
            .resolve_visible(
                &engine.root(),
                &[ElementQuery::kind_named(ControlKind::Button, "ElectricalLoadPlugin").into()],
                &Deadline::after(Duration::from_millis(50)),
            )
            .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_selector_narrows_matches_and_rejection_falls_through() {
        use crate::element::Capability;

        let engine = MemoryEngine::new(MemoryNode::desktop().child(
            MemoryNode::new(ControlKind::Document)
                .key("popup")
                .bounds(0.0, 0.0, 400.0, 300.0)
                .children([
                    MemoryNode::new(ControlKind::Hyperlink)
                        .named("Learn more")
                        .bounds(20.0, 250.0, 100.0, 20.0)
                        .with(Capability::Invoke),
                    MemoryNode::new(ControlKind::Hyperlink)
                        .key("close")
                        .bounds(370.0, 5.0, 20.0, 20.0)
                        .with(Capability::Invoke),
                ]),
        ));
        let popup = engine.element("popup").unwrap();
        let chain: [Strategy; 2] = [
            ElementQuery::kind_named(ControlKind::Hyperlink, "Learn more").into(),
            ElementQuery::kind(ControlKind::Hyperlink).into(),
        ];
        let found = resolver(&engine)
            .resolve_selecting(
                &popup,
                &chain,
                &Deadline::after(Duration::from_millis(50)),
                &CandidateSelector::default(),
                popup.bounds().unwrap(),
            )
            .unwrap();
        assert_eq!(found, engine.element("close"));
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let engine = MemoryEngine::new(
            MemoryNode::desktop().child(MemoryNode::new(ControlKind::Button).named("Go").flaky(2)),
        );
        let found = resolver(&engine)
            .resolve(
                &engine.root(),
                &[ElementQuery::name("Go").into()],
                &Deadline::after(Duration::from_secs(1)),
            )
            .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_describe_chain() {
        let chain = [
            Strategy::from(ElementQuery::kind_named(ControlKind::DataItem, "P")),
            Strategy::parent_of(ElementQuery::kind_named(ControlKind::Text, "P")),
        ];
        assert_eq!(
            describe(&chain),
            "role:DataItem && name:P -> parent(role:Text && name:P)"
        );
    }
}
