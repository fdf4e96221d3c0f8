//! Target application lifecycle: launch or attach, main window, teardown

use crate::deadline::Deadline;
use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::platforms::AccessibilityEngine;
use crate::query::{ControlKind, ElementQuery};
use crate::resolver::ElementResolver;
use crate::waiter::{ConditionWaiter, Probe};
use std::path::Path;
use std::process::{Child, Command};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, info, instrument, warn};

/// The application under test, as seen by the orchestrator
pub trait TargetApplication: Send + Sync {
    /// The application's main window, polled for up to `timeout`.
    fn main_window(&self, timeout: Duration) -> Result<Option<UIElement>, AutomationError>;

    /// Ask the application to close its main window.
    fn close(&self) -> Result<(), AutomationError>;

    fn has_exited(&self) -> bool;

    /// Close every process called `name`, waiting up to `wait` for each to
    /// exit. Returns how many are still running afterwards.
    fn terminate_by_name(&self, name: &str, wait: Duration) -> Result<usize, AutomationError>;
}

/// The largest of a process's top-level windows. Startup dialogs and tool
/// windows are smaller than the main frame; ties keep tree order.
fn largest_window(windows: Vec<UIElement>) -> Option<UIElement> {
    let mut best: Option<(UIElement, f64)> = None;
    for window in windows {
        let area = window.bounds().map(|b| b.area()).unwrap_or(0.0);
        if best.as_ref().map_or(true, |(_, largest)| area > *largest) {
            best = Some((window, area));
        }
    }
    best.map(|(window, _)| window)
}

/// Process names match ignoring case and a trailing ".exe".
fn same_process_name(candidate: &str, wanted: &str) -> bool {
    let strip = |s: &str| {
        let lower = s.to_lowercase();
        lower.strip_suffix(".exe").map(str::to_string).unwrap_or(lower)
    };
    strip(candidate) == strip(wanted)
}

fn processes_named(name: &str) -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    let mut pids: Vec<u32> = system
        .processes()
        .iter()
        .filter(|(_, process)| same_process_name(&process.name().to_string_lossy(), name))
        .map(|(pid, _)| pid.as_u32())
        .collect();
    pids.sort_unstable();
    pids
}

fn is_process_alive(pid: u32) -> bool {
    let mut system = System::new();
    let pid = Pid::from_u32(pid);
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).is_some()
}

/// Close the top-level windows of every process called `name`, then wait for
/// each to exit. Processes are never killed outright.
pub fn terminate_processes_by_name(
    engine: &dyn AccessibilityEngine,
    name: &str,
    wait: Duration,
) -> Result<usize, AutomationError> {
    let pids = processes_named(name);
    if pids.is_empty() {
        debug!(name, "no leftover processes");
        return Ok(0);
    }
    let mut still_running = 0;
    for pid in pids {
        match engine.process_windows(pid) {
            Ok(windows) => {
                for window in windows {
                    if let Err(e) = window.close() {
                        debug!(pid, error = %e, "could not close window");
                    }
                }
            }
            Err(e) => debug!(pid, error = %e, "could not list process windows"),
        }
        let deadline = Deadline::after(wait);
        while is_process_alive(pid) && !deadline.has_expired() {
            thread::sleep(Duration::from_millis(100).min(deadline.remaining()));
        }
        if is_process_alive(pid) {
            warn!(pid, name, "process still running after close request");
            still_running += 1;
        } else {
            info!(pid, name, "process exited");
        }
    }
    Ok(still_running)
}

/// A desktop process, launched by us or attached to by name
pub struct ProcessApplication {
    engine: Arc<dyn AccessibilityEngine>,
    waiter: ConditionWaiter,
    pid: u32,
    child: Mutex<Option<Child>>,
}

impl ProcessApplication {
    pub fn launch(
        engine: Arc<dyn AccessibilityEngine>,
        path: &Path,
        poll_interval: Duration,
    ) -> Result<Self, AutomationError> {
        let child = Command::new(path).spawn().map_err(|e| {
            AutomationError::PlatformError(format!("failed to launch {}: {e}", path.display()))
        })?;
        let pid = child.id();
        info!(pid, path = %path.display(), "launched application");
        Ok(Self {
            engine,
            waiter: ConditionWaiter::new(poll_interval),
            pid,
            child: Mutex::new(Some(child)),
        })
    }

    /// Track an already running process by id.
    pub fn for_pid(engine: Arc<dyn AccessibilityEngine>, pid: u32, poll_interval: Duration) -> Self {
        Self {
            engine,
            waiter: ConditionWaiter::new(poll_interval),
            pid,
            child: Mutex::new(None),
        }
    }

    /// Attach to the lowest-numbered running process called `name`.
    pub fn attach(
        engine: Arc<dyn AccessibilityEngine>,
        name: &str,
        poll_interval: Duration,
    ) -> Option<Self> {
        let pid = processes_named(name).into_iter().next()?;
        info!(pid, name, "attached to running application");
        Some(Self::for_pid(engine, pid, poll_interval))
    }

    #[instrument(skip(engine, path))]
    pub fn attach_or_launch(
        engine: Arc<dyn AccessibilityEngine>,
        name: &str,
        path: Option<&Path>,
        poll_interval: Duration,
    ) -> Result<Self, AutomationError> {
        if let Some(app) = Self::attach(engine.clone(), name, poll_interval) {
            return Ok(app);
        }
        match path {
            Some(path) => Self::launch(engine, path, poll_interval),
            None => Err(AutomationError::ElementNotFound(format!(
                "no running process named '{name}' and no executable to launch"
            ))),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl TargetApplication for ProcessApplication {
    #[instrument(level = "debug", skip(self), fields(pid = self.pid))]
    fn main_window(&self, timeout: Duration) -> Result<Option<UIElement>, AutomationError> {
        let found = self.waiter.poll(&Deadline::after(timeout), || {
            Probe::from(self.engine.process_windows(self.pid).map(largest_window))
        });
        Ok(found)
    }

    fn close(&self) -> Result<(), AutomationError> {
        match self.main_window(Duration::ZERO)? {
            Some(window) => window.close(),
            None => {
                debug!(pid = self.pid, "no main window to close");
                Ok(())
            }
        }
    }

    fn has_exited(&self) -> bool {
        if let Ok(mut child) = self.child.lock() {
            if let Some(child) = child.as_mut() {
                return matches!(child.try_wait(), Ok(Some(_)));
            }
        }
        !is_process_alive(self.pid)
    }

    fn terminate_by_name(&self, name: &str, wait: Duration) -> Result<usize, AutomationError> {
        terminate_processes_by_name(self.engine.as_ref(), name, wait)
    }
}

/// An application identified only by its main window's title.
///
/// Used when the process is managed elsewhere, and to run scenarios against
/// an in-memory tree.
pub struct WindowApplication {
    engine: Arc<dyn AccessibilityEngine>,
    resolver: ElementResolver,
    title: ElementQuery,
}

impl WindowApplication {
    /// `title` is matched as a case-insensitive fragment of the window name.
    pub fn new(
        engine: Arc<dyn AccessibilityEngine>,
        title: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            resolver: ElementResolver::new(engine.clone(), poll_interval),
            engine,
            title: ElementQuery::kind(ControlKind::Window).and(ElementQuery::name_contains(title)),
        }
    }
}

impl TargetApplication for WindowApplication {
    fn main_window(&self, timeout: Duration) -> Result<Option<UIElement>, AutomationError> {
        let root = self.engine.root();
        self.resolver
            .resolve(&root, &[self.title.clone().into()], &Deadline::after(timeout))
    }

    fn close(&self) -> Result<(), AutomationError> {
        match self.main_window(Duration::ZERO)? {
            Some(window) => window.close(),
            None => Ok(()),
        }
    }

    fn has_exited(&self) -> bool {
        let root = self.engine.root();
        !matches!(self.engine.find_first(&root, &self.title), Ok(Some(_)))
    }

    fn terminate_by_name(&self, name: &str, wait: Duration) -> Result<usize, AutomationError> {
        terminate_processes_by_name(self.engine.as_ref(), name, wait)
    }
}
