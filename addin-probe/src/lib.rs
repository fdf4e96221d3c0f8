//! Resilient element resolution and interaction over a desktop accessibility tree
//!
//! The engine finds transient, asynchronously appearing UI elements by polling
//! with fallback strategies, narrows several candidates down to one by
//! geometry, and activates elements through whichever capability they expose.
//! [`orchestrator`] builds an add-in smoke scenario on top of it.

use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub mod application;
pub mod candidate;
pub mod config;
pub mod deadline;
pub mod dispatcher;
pub mod element;
pub mod errors;
pub mod locator;
pub mod orchestrator;
pub mod platforms;
pub mod query;
pub mod resolver;
pub mod simulation;
pub mod waiter;

pub use application::{ProcessApplication, TargetApplication, WindowApplication};
pub use candidate::{CandidateSelector, CornerBand};
pub use config::{ProbeConfig, Scenario, Timings};
pub use deadline::Deadline;
pub use dispatcher::{DispatchOutcome, InteractionDispatcher};
pub use element::{Bounds, Capability, Point, UIElement, UIElementImpl};
pub use errors::AutomationError;
pub use locator::Locator;
pub use orchestrator::{Orchestrator, RunReport, RunState, RunStatus};
pub use platforms::{AccessibilityEngine, Key};
pub use query::{ControlKind, ElementQuery};
pub use resolver::{ElementResolver, Strategy};
pub use waiter::{ConditionWaiter, Probe};

/// Entry point over one accessibility engine
#[derive(Clone)]
pub struct Desktop {
    engine: Arc<dyn AccessibilityEngine>,
}

impl Desktop {
    /// Connect to the platform's accessibility provider.
    #[instrument]
    pub fn new() -> Result<Self, AutomationError> {
        Ok(Self {
            engine: platforms::create_engine()?,
        })
    }

    /// Wrap an existing engine, e.g. an in-memory tree.
    pub fn with_engine(engine: Arc<dyn AccessibilityEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> Arc<dyn AccessibilityEngine> {
        self.engine.clone()
    }

    /// The desktop root element.
    pub fn root(&self) -> UIElement {
        self.engine.root()
    }

    /// Creates a locator for finding UI elements, starting from the desktop.
    ///
    /// ```
    /// use addin_probe::platforms::memory::{MemoryEngine, MemoryNode};
    /// use addin_probe::{ControlKind, Desktop};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// let tree = MemoryEngine::new(
    ///     MemoryNode::desktop().child(MemoryNode::new(ControlKind::Window).named("ElectricalLoadPlugin")),
    /// );
    /// let desktop = Desktop::with_engine(Arc::new(tree));
    /// let dialog = desktop
    ///     .locator("role:Window && name:ElectricalLoadPlugin")
    ///     .timeout(Duration::from_millis(100))
    ///     .first()?;
    /// assert_eq!(dialog.name()?.as_deref(), Some("ElectricalLoadPlugin"));
    /// # Ok::<(), addin_probe::AutomationError>(())
    /// ```
    pub fn locator(&self, strategy: impl Into<Strategy>) -> Locator {
        Locator::new(self.engine.clone(), strategy)
    }

    pub fn resolver(&self, poll_interval: Duration) -> ElementResolver {
        ElementResolver::new(self.engine.clone(), poll_interval)
    }

    pub fn dispatcher(&self, pointer_settle: Duration) -> InteractionDispatcher {
        InteractionDispatcher::new(self.engine.clone(), pointer_settle)
    }
}
