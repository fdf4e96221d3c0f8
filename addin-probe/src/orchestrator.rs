//! The add-in smoke scenario as a linear state machine
//!
//! ```text
//! Starting -> AwaitingMainWindow -> DismissingStartupPopup -> AwaitingProjectOpen
//!   -> AwaitingPluginButton -> PluginInvoked -> AwaitingActionButtons
//!   -> AwaitingResultDialog -> Done
//! ```
//!
//! Any guard that comes back empty moves the machine to `Failed` with the
//! step, the query and the elapsed time. There are no retries across states.
//! Teardown runs when [`Orchestrator::run`] returns, whatever the outcome.

use crate::application::TargetApplication;
use crate::candidate::CandidateSelector;
use crate::config::ProbeConfig;
use crate::deadline::Deadline;
use crate::dispatcher::InteractionDispatcher;
use crate::element::{Capability, UIElement};
use crate::errors::AutomationError;
use crate::platforms::{AccessibilityEngine, Key};
use crate::query::{contains_ignore_case, ControlKind, ElementQuery};
use crate::resolver::{describe, ElementResolver, Strategy};
use crate::waiter::{ConditionWaiter, Probe};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// How long a project-open check waits for the main window on each poll.
const WINDOW_REFETCH_TIMEOUT: Duration = Duration::from_secs(2);
/// How long teardown waits for each leftover process to exit.
const PROCESS_EXIT_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    Starting,
    AwaitingMainWindow,
    DismissingStartupPopup,
    AwaitingProjectOpen,
    AwaitingPluginButton,
    PluginInvoked,
    AwaitingActionButtons,
    AwaitingResultDialog,
    Done,
    Failed,
}

impl RunState {
    /// The state after this one on the success path.
    pub fn next(self) -> Option<RunState> {
        use RunState::*;
        match self {
            Starting => Some(AwaitingMainWindow),
            AwaitingMainWindow => Some(DismissingStartupPopup),
            DismissingStartupPopup => Some(AwaitingProjectOpen),
            AwaitingProjectOpen => Some(AwaitingPluginButton),
            AwaitingPluginButton => Some(PluginInvoked),
            PluginInvoked => Some(AwaitingActionButtons),
            AwaitingActionButtons => Some(AwaitingResultDialog),
            AwaitingResultDialog => Some(Done),
            Done | Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Passed,
    Failed,
}

/// One completed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub state: RunState,
    pub elapsed_ms: u64,
    pub detail: String,
}

/// Why the run stopped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureCause {
    pub state: RunState,
    pub query: Option<String>,
    pub timeout_ms: Option<u64>,
    pub elapsed_ms: u64,
    pub message: String,
}

/// Outcome of a whole run, serialized as the CLI's JSON report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub final_state: RunState,
    pub steps: Vec<StepRecord>,
    pub failure: Option<FailureCause>,
    pub total_elapsed_ms: u64,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.status == RunStatus::Passed
    }

    /// 0 on success, 2 when the application never came up, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match &self.failure {
            None => 0,
            Some(cause) if cause.state == RunState::AwaitingMainWindow => 2,
            Some(_) => 1,
        }
    }
}

/// Failure of a single step, before it is stamped with state and timing
#[derive(Debug)]
struct StepFailure {
    query: Option<String>,
    timeout: Option<Duration>,
    message: String,
}

impl StepFailure {
    fn not_found(query: impl fmt::Display, timeout: Duration, message: impl Into<String>) -> Self {
        Self {
            query: Some(query.to_string()),
            timeout: Some(timeout),
            message: message.into(),
        }
    }

    fn rejected(query: impl fmt::Display, message: impl Into<String>) -> Self {
        Self {
            query: Some(query.to_string()),
            timeout: None,
            message: message.into(),
        }
    }

    /// A provider or usage error raised while evaluating `query`.
    fn failed(query: impl fmt::Display, error: AutomationError) -> Self {
        Self {
            query: Some(query.to_string()),
            timeout: None,
            message: error.to_string(),
        }
    }
}

type StepResult = Result<String, StepFailure>;

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

/// Whether `project` looks open in `window`: the title mentions it, or a tab
/// does, or any text does. Case-insensitive; unreadable nodes are skipped.
pub fn is_project_open(engine: &dyn AccessibilityEngine, window: &UIElement, project: &str) -> bool {
    if let Ok(Some(title)) = window.title() {
        if contains_ignore_case(&title, project) {
            debug!(%title, "project found in window title");
            return true;
        }
    }
    for kind in [ControlKind::TabItem, ControlKind::Text] {
        match engine.find_all(window, &ElementQuery::kind(kind)) {
            Ok(nodes) => {
                if let Some(name) = nodes
                    .iter()
                    .filter_map(|n| n.name_or_none())
                    .find(|name| contains_ignore_case(name, project))
                {
                    debug!(%kind, %name, "project found in tree");
                    return true;
                }
            }
            Err(e) => debug!(%kind, error = %e, "could not scan for open project"),
        }
    }
    false
}

/// Fallback chain locating a recent-file entry by its label.
pub fn recent_item_chain(project: &str) -> Vec<Strategy> {
    vec![
        ElementQuery::kind_named(ControlKind::DataItem, project).into(),
        Strategy::parent_of(ElementQuery::kind_named(ControlKind::Text, project)),
        ElementQuery::name(project)
            .and(ElementQuery::kind(ControlKind::ListItem).or(ElementQuery::kind(ControlKind::Pane)))
            .into(),
    ]
}

/// Removes the application and its leftover processes when dropped.
struct Teardown {
    app: Arc<dyn TargetApplication>,
    process_name: String,
    grace: Duration,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        info!("tearing down target application");
        if !self.app.has_exited() {
            if let Err(e) = self.app.close() {
                warn!(error = %e, "closing the application failed");
            }
            thread::sleep(self.grace);
        }
        match self.app.terminate_by_name(&self.process_name, PROCESS_EXIT_WAIT) {
            Ok(0) => debug!(name = %self.process_name, "no processes left"),
            Ok(n) => warn!(name = %self.process_name, remaining = n, "processes still running after teardown"),
            Err(e) => warn!(error = %e, "terminating leftover processes failed"),
        }
    }
}

pub struct Orchestrator {
    engine: Arc<dyn AccessibilityEngine>,
    app: Arc<dyn TargetApplication>,
    config: ProbeConfig,
    waiter: ConditionWaiter,
    dispatcher: InteractionDispatcher,
    selector: CandidateSelector,
    state: RunState,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn AccessibilityEngine>,
        app: Arc<dyn TargetApplication>,
        config: ProbeConfig,
    ) -> Self {
        let timings = &config.timings;
        Self {
            waiter: ConditionWaiter::new(timings.poll_interval),
            dispatcher: InteractionDispatcher::new(engine.clone(), timings.pointer_settle),
            selector: CandidateSelector::new(config.scenario.popup_band.clone()),
            engine,
            app,
            config,
            state: RunState::Starting,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Drive the scenario to `Done` or `Failed`, then tear the application down.
    #[instrument(skip(self), fields(project = %self.config.scenario.project_name))]
    pub fn run(&mut self) -> RunReport {
        let started = Instant::now();
        let _teardown = Teardown {
            app: self.app.clone(),
            process_name: self.config.scenario.process_name.clone(),
            grace: self.config.timings.teardown_grace,
        };

        let mut steps = Vec::new();
        let mut failure = None;
        self.state = RunState::Starting;
        while let Some(next) = self.state.next() {
            self.transition(next);
            if next.is_terminal() {
                break;
            }
            let step_started = Instant::now();
            match self.execute(next) {
                Ok(detail) => {
                    let elapsed_ms = millis(step_started.elapsed());
                    info!(state = %next, elapsed_ms, %detail, "step completed");
                    steps.push(StepRecord {
                        state: next,
                        elapsed_ms,
                        detail,
                    });
                }
                Err(cause) => {
                    let elapsed_ms = millis(step_started.elapsed());
                    error!(
                        state = %next,
                        query = ?cause.query,
                        elapsed_ms,
                        message = %cause.message,
                        "step failed"
                    );
                    failure = Some(FailureCause {
                        state: next,
                        query: cause.query,
                        timeout_ms: cause.timeout.map(millis),
                        elapsed_ms,
                        message: cause.message,
                    });
                    self.transition(RunState::Failed);
                    break;
                }
            }
        }

        RunReport {
            status: if failure.is_none() {
                RunStatus::Passed
            } else {
                RunStatus::Failed
            },
            final_state: self.state,
            steps,
            failure,
            total_elapsed_ms: millis(started.elapsed()),
        }
    }

    fn transition(&mut self, to: RunState) {
        info!(from = %self.state, %to, "state transition");
        self.state = to;
    }

    fn execute(&self, state: RunState) -> StepResult {
        match state {
            RunState::AwaitingMainWindow => self.await_main_window(),
            RunState::DismissingStartupPopup => self.dismiss_startup_popup(),
            RunState::AwaitingProjectOpen => self.open_recent_project(),
            RunState::AwaitingPluginButton => self.find_plugin_button(),
            RunState::PluginInvoked => self.invoke_plugin(),
            RunState::AwaitingActionButtons => self.find_action_buttons(),
            RunState::AwaitingResultDialog => self.await_result_dialog(),
            RunState::Starting | RunState::Done | RunState::Failed => Ok(String::new()),
        }
    }

    fn main_window(&self, timeout: Duration) -> Result<UIElement, StepFailure> {
        self.app
            .main_window(timeout)
            .map_err(|e| StepFailure::failed("main window", e))?
            .ok_or_else(|| StepFailure::not_found("main window", timeout, "main window not found"))
    }

    fn claim(&self, window: &UIElement) {
        if let Err(e) = self.engine.claim_foreground(window) {
            debug!(error = %e, "could not claim foreground");
        }
    }

    /// Let the target process queued input, then pause for `delay`.
    fn settle(&self, delay: Duration) {
        if let Err(e) = self.engine.wait_for_input_idle() {
            debug!(error = %e, "input idle wait failed");
        }
        thread::sleep(delay);
    }

    fn visible_button(
        &self,
        window: &UIElement,
        name: &str,
        timeout: Duration,
    ) -> Result<UIElement, StepFailure> {
        let query = ElementQuery::kind_named(ControlKind::Button, name);
        let resolver = ElementResolver::new(self.engine.clone(), self.config.timings.poll_interval)
            .with_foreground(window.clone());
        resolver
            .resolve_visible(window, &[query.clone().into()], &Deadline::after(timeout))
            .map_err(|e| StepFailure::failed(&query, e))?
            .ok_or_else(|| {
                StepFailure::not_found(query, timeout, format!("button '{name}' not found"))
            })
    }

    fn await_main_window(&self) -> StepResult {
        let window = self.main_window(self.config.timings.startup_timeout)?;
        self.claim(&window);
        self.settle(Duration::ZERO);
        Ok(format!(
            "main window '{}'",
            window.name_or_none().unwrap_or_default()
        ))
    }

    fn dismiss_startup_popup(&self) -> StepResult {
        let timings = &self.config.timings;
        let popup = &self.config.scenario.startup_popup;
        let window = self.main_window(timings.main_window_timeout)?;
        let document = ElementQuery::kind_named(ControlKind::Document, popup.as_str());

        let deadline = Deadline::after(timings.popup_timeout);
        let dismissed = self
            .waiter
            .poll(&deadline, || self.try_dismiss_popup(&window, &document));
        Ok(match dismissed {
            Some(method) => format!("dismissed '{popup}' via {method}"),
            None => {
                info!(%popup, "startup popup not dismissed, continuing");
                format!("'{popup}' not dismissed within {:?}", timings.popup_timeout)
            }
        })
    }

    /// One attempt at closing the popup: find it, pick the corner glyph,
    /// activate it, then check the popup is gone.
    fn try_dismiss_popup(&self, window: &UIElement, document: &ElementQuery) -> Probe<Capability> {
        self.claim(window);
        let popup = match self.engine.find_first(window, document) {
            Ok(Some(popup)) => popup,
            Ok(None) => return Probe::NotYet,
            Err(e) => return Probe::Transient(e),
        };
        let anchor = match popup.bounds() {
            Ok(bounds) => bounds,
            Err(e) => return Probe::Transient(e),
        };
        let links: [Strategy; 1] = [ElementQuery::kind(ControlKind::Hyperlink).into()];
        let resolver = ElementResolver::new(self.engine.clone(), self.config.timings.poll_interval);
        // One pass only; the surrounding poll owns the deadline.
        let close = match resolver.resolve_selecting(
            &popup,
            &links,
            &Deadline::after(Duration::ZERO),
            &self.selector,
            anchor,
        ) {
            Ok(Some(close)) => close,
            Ok(None) => return Probe::NotYet,
            Err(e) => return Probe::Transient(e),
        };
        let Some(method) = self.dispatcher.dispatch(&close).method else {
            return Probe::NotYet;
        };
        self.settle(self.config.timings.settle_delay);
        match self.engine.find_first(window, document) {
            Ok(None) => Probe::Found(method),
            Ok(Some(_)) => {
                debug!("popup still present after activation");
                Probe::NotYet
            }
            Err(e) => Probe::Transient(e),
        }
    }

    fn open_recent_project(&self) -> StepResult {
        let timings = &self.config.timings;
        let project = self.config.scenario.project_name.as_str();
        let window = self.main_window(timings.main_window_timeout)?;

        self.filter_recent_files(&window);

        let item = self.recent_item(&window)?;
        self.dispatcher.double_click(&item, Some(&window));
        if self.wait_until_project_open(project, timings.project_confirm_timeout) {
            return Ok(format!("opened '{project}' by double click"));
        }

        // The list may have re-rendered while we waited.
        info!(%project, "project not open yet, activating its first cell");
        let window = self.main_window(timings.main_window_timeout)?;
        let item = self.recent_item(&window)?;
        let cell = self.first_cell(&item);
        self.dispatcher.invoke_or_offset_double_click(&cell);
        if self.wait_until_project_open(project, timings.project_final_timeout) {
            Ok(format!("opened '{project}' on second attempt"))
        } else {
            Err(StepFailure::not_found(
                format!("open project: {project}"),
                timings.project_final_timeout,
                format!("project '{project}' did not open"),
            ))
        }
    }

    fn recent_item(&self, window: &UIElement) -> Result<UIElement, StepFailure> {
        let timings = &self.config.timings;
        let project = self.config.scenario.project_name.as_str();
        let chain = recent_item_chain(project);
        let resolver = ElementResolver::new(self.engine.clone(), timings.fast_poll_interval);
        resolver
            .resolve(window, &chain, &Deadline::after(timings.project_open_timeout))
            .map_err(|e| StepFailure::failed(describe(&chain), e))?
            .ok_or_else(|| {
                StepFailure::not_found(
                    describe(&chain),
                    timings.project_open_timeout,
                    format!("recent project '{project}' not found"),
                )
            })
    }

    /// Type the project name into the recent-files search box, if there is one.
    fn filter_recent_files(&self, window: &UIElement) {
        let scenario = &self.config.scenario;
        let chain: [Strategy; 2] = [
            ElementQuery::kind(ControlKind::Edit)
                .excluding(ElementQuery::name(scenario.project_name.as_str()))
                .into(),
            ElementQuery::kind_named(ControlKind::Edit, scenario.recent_search_box.as_str()).into(),
        ];
        let resolver = ElementResolver::new(self.engine.clone(), self.config.timings.poll_interval);
        let search_box = match resolver.probe(window, &chain) {
            Probe::Found(matches) => matches.into_iter().next(),
            Probe::NotYet => None,
            Probe::Transient(e) => {
                debug!(error = %e, "search box lookup failed");
                None
            }
        };
        let Some(search_box) = search_box else {
            debug!("no recent-files search box");
            return;
        };
        let typed = search_box
            .set_value(&scenario.project_name)
            .and_then(|()| self.engine.press_key(Key::Enter));
        match typed {
            Ok(()) => self.settle(self.config.timings.search_settle),
            Err(e) => debug!(error = %e, "could not filter recent files"),
        }
    }

    fn first_cell(&self, item: &UIElement) -> UIElement {
        [ControlKind::Text, ControlKind::Image]
            .into_iter()
            .find_map(|kind| {
                self.engine
                    .find_first(item, &ElementQuery::kind(kind))
                    .ok()
                    .flatten()
            })
            .unwrap_or_else(|| item.clone())
    }

    /// Poll until the project shows as open, fetching the main window afresh
    /// on every iteration.
    pub fn wait_until_project_open(&self, project: &str, timeout: Duration) -> bool {
        let deadline = Deadline::after(timeout);
        self.waiter.wait_until(&deadline, || {
            let refetch = WINDOW_REFETCH_TIMEOUT.min(deadline.remaining());
            Ok(self
                .app
                .main_window(refetch)?
                .is_some_and(|window| is_project_open(self.engine.as_ref(), &window, project)))
        })
    }

    fn find_plugin_button(&self) -> StepResult {
        let timings = &self.config.timings;
        let name = self.config.scenario.plugin_button.as_str();
        let window = self.main_window(timings.main_window_timeout)?;
        let button = self.visible_button(&window, name, timings.plugin_button_timeout)?;
        let query = ElementQuery::kind_named(ControlKind::Button, name);
        let enabled = button
            .is_enabled()
            .map_err(|e| StepFailure::failed(&query, e))?;
        if !enabled {
            return Err(StepFailure::rejected(
                query,
                format!("plugin button '{name}' is disabled"),
            ));
        }
        Ok(format!("found enabled '{name}'"))
    }

    fn invoke_plugin(&self) -> StepResult {
        let timings = &self.config.timings;
        let name = self.config.scenario.plugin_button.as_str();
        let window = self.main_window(timings.main_window_timeout)?;
        let button = self.visible_button(&window, name, timings.plugin_button_timeout)?;
        let outcome = self.dispatcher.dispatch(&button);
        let Some(method) = outcome.method else {
            return Err(StepFailure::rejected(
                ElementQuery::kind_named(ControlKind::Button, name),
                format!("could not activate '{name}'"),
            ));
        };
        self.settle(timings.plugin_settle);
        Ok(format!("activated '{name}' via {method}"))
    }

    fn find_action_buttons(&self) -> StepResult {
        let timings = &self.config.timings;
        let window = self.main_window(timings.main_window_timeout)?;
        for name in &self.config.scenario.action_buttons {
            self.visible_button(&window, name, timings.action_button_timeout)?;
        }
        Ok(format!(
            "found {}",
            self.config.scenario.action_buttons.join(", ")
        ))
    }

    fn await_result_dialog(&self) -> StepResult {
        let timings = &self.config.timings;
        let scenario = &self.config.scenario;
        let window = self.main_window(timings.main_window_timeout)?;
        let button =
            self.visible_button(&window, &scenario.result_button, timings.action_button_timeout)?;
        let outcome = self.dispatcher.dispatch(&button);
        if !outcome.succeeded() {
            return Err(StepFailure::rejected(
                ElementQuery::kind_named(ControlKind::Button, scenario.result_button.as_str()),
                format!("could not activate '{}'", scenario.result_button),
            ));
        }
        self.settle(Duration::ZERO);

        let dialog = ElementQuery::kind_named(ControlKind::Window, scenario.dialog_title.as_str());
        let resolver = ElementResolver::new(self.engine.clone(), timings.poll_interval);
        let found = resolver
            .resolve(
                &self.engine.root(),
                &[dialog.clone().into()],
                &Deadline::after(timings.dialog_timeout),
            )
            .map_err(|e| StepFailure::failed(&dialog, e))?;
        match found {
            Some(_) => Ok(format!("dialog '{}' appeared", scenario.dialog_title)),
            None => Err(StepFailure::not_found(
                dialog,
                timings.dialog_timeout,
                format!("dialog '{}' did not appear", scenario.dialog_title),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::memory::{MemoryEngine, MemoryNode};

    fn revit(title: &str, children: Vec<MemoryNode>) -> (MemoryEngine, UIElement) {
        let engine = MemoryEngine::new(
            MemoryNode::desktop().child(
                MemoryNode::new(ControlKind::Window)
                    .key("main")
                    .named(title)
                    .children(children),
            ),
        );
        let window = engine.element("main").unwrap();
        (engine, window)
    }

    #[test]
    fn test_project_open_via_title() {
        let (engine, window) = revit("Autodesk Revit 2026 - [PROJECT1 - Floor Plan: Level 1]", vec![]);
        assert!(is_project_open(&engine, &window, "Project1"));
    }

    #[test]
    fn test_project_open_via_tab() {
        let (engine, window) = revit(
            "Untitled",
            vec![MemoryNode::new(ControlKind::TabItem).named("Project1 - 3D View")],
        );
        assert!(is_project_open(&engine, &window, "Project1"));
    }

    #[test]
    fn test_project_open_via_text() {
        let (engine, window) = revit(
            "Untitled",
            vec![MemoryNode::new(ControlKind::Text).named("project1.rvt")],
        );
        assert!(is_project_open(&engine, &window, "Project1"));
    }

    #[test]
    fn test_project_not_open() {
        let (engine, window) = revit(
            "Untitled",
            vec![MemoryNode::new(ControlKind::TabItem).named("Home")],
        );
        assert!(!is_project_open(&engine, &window, "Project1"));
    }

    /// An application whose window lookups always fail at the provider.
    struct UnreachableApp;

    impl TargetApplication for UnreachableApp {
        fn main_window(&self, _timeout: Duration) -> Result<Option<UIElement>, AutomationError> {
            Err(AutomationError::PlatformError("provider unavailable".to_string()))
        }

        fn close(&self) -> Result<(), AutomationError> {
            Ok(())
        }

        fn has_exited(&self) -> bool {
            true
        }

        fn terminate_by_name(&self, _name: &str, _wait: Duration) -> Result<usize, AutomationError> {
            Ok(0)
        }
    }

    #[test]
    fn test_provider_error_keeps_the_failing_query() {
        let engine: Arc<dyn AccessibilityEngine> = Arc::new(MemoryEngine::new(MemoryNode::desktop()));
        let mut orchestrator = Orchestrator::new(engine, Arc::new(UnreachableApp), ProbeConfig::default());

        let report = orchestrator.run();

        let cause = report.failure.unwrap();
        assert_eq!(cause.state, RunState::AwaitingMainWindow);
        assert_eq!(cause.query.as_deref(), Some("main window"));
        assert!(cause.message.contains("provider unavailable"), "{}", cause.message);
        assert_eq!(cause.timeout_ms, None);
    }

    #[test]
    fn test_step_failure_from_error_names_the_query() {
        let query = ElementQuery::kind_named(ControlKind::Button, "Execute");
        let failure = StepFailure::failed(&query, AutomationError::ElementDetached("Execute".into()));
        assert_eq!(failure.query.as_deref(), Some("role:Button && name:Execute"));
        assert!(failure.timeout.is_none());
    }

    #[test]
    fn test_linear_state_machine() {
        let mut state = RunState::Starting;
        let mut visited = vec![state];
        while let Some(next) = state.next() {
            visited.push(next);
            state = next;
        }
        assert_eq!(visited.len(), 9);
        assert_eq!(state, RunState::Done);
        assert_eq!(RunState::Failed.next(), None);
    }

    #[test]
    fn test_report_exit_codes() {
        let mut report = RunReport {
            status: RunStatus::Passed,
            final_state: RunState::Done,
            steps: vec![],
            failure: None,
            total_elapsed_ms: 0,
        };
        assert_eq!(report.exit_code(), 0);
        report.status = RunStatus::Failed;
        report.failure = Some(FailureCause {
            state: RunState::AwaitingPluginButton,
            query: None,
            timeout_ms: None,
            elapsed_ms: 0,
            message: String::new(),
        });
        assert_eq!(report.exit_code(), 1);
        if let Some(cause) = report.failure.as_mut() {
            cause.state = RunState::AwaitingMainWindow;
        }
        assert_eq!(report.exit_code(), 2);
    }
}
