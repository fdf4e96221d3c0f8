use tracing::{debug, instrument};

use crate::deadline::Deadline;
use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::platforms::AccessibilityEngine;
use crate::resolver::{describe, ElementResolver, Strategy};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

// Default timeout if none is specified on the locator itself
const DEFAULT_LOCATOR_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A high-level API for finding UI elements
///
/// Holds a fallback chain, a search root and a timeout, and turns them into
/// resolver calls. Blocking methods run on the caller's thread; [`Locator::wait`]
/// moves the polling onto a blocking-safe thread for async callers.
#[derive(Clone)]
pub struct Locator {
    engine: Arc<dyn AccessibilityEngine>,
    strategies: Vec<Strategy>,
    timeout: Duration,
    poll_interval: Duration,
    root: Option<UIElement>,
    visible_only: bool,
}

impl Locator {
    pub fn new(engine: Arc<dyn AccessibilityEngine>, strategy: impl Into<Strategy>) -> Self {
        Self {
            engine,
            strategies: vec![strategy.into()],
            timeout: DEFAULT_LOCATOR_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            root: None,
            visible_only: false,
        }
    }

    /// Append a fallback strategy, tried when earlier ones find nothing.
    pub fn or(mut self, strategy: impl Into<Strategy>) -> Self {
        self.strategies.push(strategy.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the root element for this locator
    pub fn within(mut self, element: UIElement) -> Self {
        self.root = Some(element);
        self
    }

    /// Ignore matches that are currently off-screen.
    pub fn visible(mut self) -> Self {
        self.visible_only = true;
        self
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    fn resolver(&self) -> ElementResolver {
        ElementResolver::new(self.engine.clone(), self.poll_interval)
    }

    fn root_element(&self) -> UIElement {
        self.root.clone().unwrap_or_else(|| self.engine.root())
    }

    /// First match, waiting up to the locator's timeout.
    pub fn first(&self) -> Result<UIElement, AutomationError> {
        let deadline = Deadline::after(self.timeout);
        let root = self.root_element();
        let resolver = self.resolver();
        let found = if self.visible_only {
            resolver.resolve_visible(&root, &self.strategies, &deadline)?
        } else {
            resolver.resolve(&root, &self.strategies, &deadline)?
        };
        found.ok_or_else(|| self.timed_out())
    }

    /// All matches of the first strategy that matches, waiting up to the timeout.
    pub fn all(&self) -> Result<Vec<UIElement>, AutomationError> {
        let deadline = Deadline::after(self.timeout);
        let root = self.root_element();
        let visible_only = self.visible_only;
        let found = self
            .resolver()
            .resolve_by(&root, &self.strategies, &deadline, |mut matches| {
                if visible_only {
                    matches.retain(|e| !matches!(e.is_offscreen(), Ok(true)));
                }
                (!matches.is_empty()).then_some(matches)
            })?;
        found.ok_or_else(|| self.timed_out())
    }

    /// Wait for a match without blocking the async runtime.
    #[instrument(level = "debug", skip(self))]
    pub async fn wait(&self) -> Result<UIElement, AutomationError> {
        debug!("Waiting for element matching {}", self.describe());
        let locator = self.clone();
        task::spawn_blocking(move || locator.first())
            .await
            .map_err(|e| AutomationError::Internal(format!("Task join error: {e}")))?
    }

    pub fn describe(&self) -> String {
        describe(&self.strategies)
    }

    fn timed_out(&self) -> AutomationError {
        AutomationError::Timeout(format!(
            "Timed out after {:?} waiting for element {}",
            self.timeout,
            self.describe()
        ))
    }
}
