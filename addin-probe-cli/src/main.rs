//! addin-probe CLI
//!
//! Starts (or attaches to) the host application, opens a recent project,
//! activates the add-in under test and waits for its result window. Prints a
//! JSON run report on stdout.
//!
//! Usage:
//!   addin-probe --config probe.yaml --report report.json
//!   addin-probe --project Project1 --plugin ElectricalLoadPlugin
//!   addin-probe --dry-run                 # rehearse against a simulated session

use addin_probe::platforms::memory::MemoryEngine;
use addin_probe::simulation::{simulated_session, MAIN_WINDOW_TITLE};
use addin_probe::{
    platforms, AccessibilityEngine, Orchestrator, ProbeConfig, ProcessApplication, RunReport,
    Scenario, WindowApplication,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod utils;

/// Dry runs replay the whole scenario with every timing divided by this.
const DRY_RUN_SPEEDUP: u32 = 20;
/// How long simulated UI changes take to show up during a dry run.
const DRY_RUN_PACING: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "addin-probe")]
#[command(about = "Smoke test a desktop add-in through the accessibility tree")]
struct Args {
    /// YAML file with timings and scenario names
    #[arg(long, short = 'c', env = "ADDIN_PROBE_CONFIG")]
    config: Option<PathBuf>,

    /// Executable to launch when the application is not already running
    #[arg(long, env = "ADDIN_PROBE_APP_PATH")]
    app_path: Option<PathBuf>,

    /// Process name used to attach and to clean up
    #[arg(long, env = "ADDIN_PROBE_PROCESS_NAME")]
    process_name: Option<String>,

    /// Recent project to open
    #[arg(long, short = 'p', env = "ADDIN_PROBE_PROJECT")]
    project: Option<String>,

    /// Ribbon button registered by the add-in
    #[arg(long, env = "ADDIN_PROBE_PLUGIN")]
    plugin: Option<String>,

    /// Buttons the add-in must show, comma separated
    #[arg(long, value_delimiter = ',', env = "ADDIN_PROBE_ACTION_BUTTONS")]
    action_buttons: Option<Vec<String>>,

    /// Which action button to press
    #[arg(long, env = "ADDIN_PROBE_RESULT_BUTTON")]
    result_button: Option<String>,

    /// Title of the window the add-in opens
    #[arg(long, env = "ADDIN_PROBE_DIALOG_TITLE")]
    dialog_title: Option<String>,

    /// Also write the JSON report to this file
    #[arg(long, short = 'r')]
    report: Option<PathBuf>,

    /// Run against a simulated session instead of the live desktop
    #[arg(long)]
    dry_run: bool,

    /// Debug logging (LOG_LEVEL and RUST_LOG take precedence)
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Args {
    fn apply(&self, scenario: &mut Scenario) {
        if let Some(path) = &self.app_path {
            scenario.application_path = Some(path.clone());
        }
        if let Some(name) = &self.process_name {
            scenario.process_name = name.clone();
        }
        if let Some(project) = &self.project {
            scenario.project_name = project.clone();
        }
        if let Some(plugin) = &self.plugin {
            scenario.plugin_button = plugin.clone();
        }
        if let Some(buttons) = &self.action_buttons {
            scenario.action_buttons = buttons.clone();
        }
        if let Some(button) = &self.result_button {
            scenario.result_button = button.clone();
        }
        if let Some(title) = &self.dialog_title {
            scenario.dialog_title = title.clone();
        }
    }

    fn load_config(&self) -> Result<ProbeConfig> {
        let mut config = match &self.config {
            Some(path) => ProbeConfig::from_yaml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ProbeConfig::default(),
        };
        self.apply(&mut config.scenario);
        if self.dry_run {
            config.timings = config.timings.scaled_down(DRY_RUN_SPEEDUP);
        }
        config.validate()?;
        Ok(config)
    }
}

fn live_run(config: ProbeConfig) -> Result<RunReport> {
    let engine = platforms::create_engine()?;
    let scenario = &config.scenario;
    let app = ProcessApplication::attach_or_launch(
        engine.clone(),
        &scenario.process_name,
        scenario.application_path.as_deref(),
        config.timings.poll_interval,
    )
    .with_context(|| format!("starting '{}'", scenario.process_name))?;
    info!(pid = app.pid(), "application ready");
    Ok(Orchestrator::new(engine, Arc::new(app), config).run())
}

fn dry_run(config: ProbeConfig) -> RunReport {
    let engine: Arc<dyn AccessibilityEngine> = Arc::new(MemoryEngine::new(simulated_session(
        &config.scenario,
        DRY_RUN_PACING,
    )));
    let app = WindowApplication::new(
        engine.clone(),
        MAIN_WINDOW_TITLE,
        config.timings.poll_interval,
    );
    info!("dry run against a simulated session");
    Orchestrator::new(engine, Arc::new(app), config).run()
}

fn run(args: Args) -> Result<i32> {
    utils::init_logging(args.verbose)?;
    let config = args.load_config()?;

    let report = if args.dry_run {
        dry_run(config)
    } else {
        live_run(config)?
    };

    let json = serde_json::to_string_pretty(&report)?;
    println!("{json}");
    if let Some(path) = &args.report {
        std::fs::write(path, &json)
            .with_context(|| format!("writing report to {}", path.display()))?;
    }

    if report.passed() {
        info!(elapsed_ms = report.total_elapsed_ms, "add-in check passed");
    } else {
        error!(state = %report.final_state, "add-in check failed");
    }
    Ok(report.exit_code())
}

fn main() {
    let args = Args::parse();
    let code = match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("addin-probe: {e:#}");
            2
        }
    };
    std::process::exit(code);
}
