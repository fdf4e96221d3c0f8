//! A simulated host session on the in-memory tree
//!
//! Mirrors what a live run walks through: a startup popup that shows up late,
//! a recent-files list filtered through a search box, a ribbon that only
//! appears once a project is open, an add-in panel revealed by the add-in's
//! button, and a result window raised by one of the panel's buttons. Used by
//! the CLI's dry run and by integration tests.

use crate::config::Scenario;
use crate::element::Capability;
use crate::platforms::memory::{Effect, MemoryNode};
use crate::platforms::Key;
use crate::query::ControlKind;
use std::time::Duration;

/// Title fragment of the simulated main window before a project is open.
pub const MAIN_WINDOW_TITLE: &str = "Autodesk Revit 2026";

/// Tree keys of the nodes a session script can poke at.
pub mod keys {
    pub const MAIN: &str = "main";
    pub const POPUP: &str = "popup";
    pub const POPUP_CLOSE: &str = "popup-close";
    pub const SEARCH: &str = "search";
    pub const RECENT_ITEM: &str = "recent-item";
    pub const RIBBON: &str = "ribbon";
    pub const PLUGIN_BUTTON: &str = "plugin-button";
    pub const PLUGIN_PANEL: &str = "plugin-panel";
    pub const DIALOG: &str = "dialog";
}

/// Build the desktop for one session. `pacing` is how long each asynchronous
/// UI change (popup, add-in panel, result window) takes to show up.
pub fn simulated_session(scenario: &Scenario, pacing: Duration) -> MemoryNode {
    let project = scenario.project_name.as_str();
    let opened_title = format!("{MAIN_WINDOW_TITLE} - [{project} - Floor Plan: Level 1]");

    let popup = MemoryNode::new(ControlKind::Document)
        .key(keys::POPUP)
        .named(scenario.startup_popup.as_str())
        .bounds(660.0, 300.0, 600.0, 400.0)
        .appear_after(pacing)
        .children([
            MemoryNode::new(ControlKind::Hyperlink)
                .named("Learn more")
                .bounds(700.0, 640.0, 120.0, 20.0)
                .with(Capability::Invoke),
            MemoryNode::new(ControlKind::Hyperlink)
                .key(keys::POPUP_CLOSE)
                .bounds(1226.0, 308.0, 24.0, 24.0)
                .with(Capability::Invoke)
                .on_activate(Effect::Remove(keys::POPUP.to_string())),
        ]);

    let search = MemoryNode::new(ControlKind::Edit)
        .key(keys::SEARCH)
        .named(scenario.recent_search_box.as_str())
        .bounds(40.0, 120.0, 300.0, 28.0)
        .editable()
        .on_key(Key::Enter, Effect::Reveal(keys::RECENT_ITEM.to_string()));

    // Only the filtered list shows the project, as a row the pointer opens.
    let recent = MemoryNode::new(ControlKind::List)
        .named("Recent files")
        .bounds(40.0, 160.0, 800.0, 600.0)
        .child(
            MemoryNode::new(ControlKind::DataItem)
                .key(keys::RECENT_ITEM)
                .named(project)
                .bounds(40.0, 160.0, 300.0, 120.0)
                .scrollable()
                .hidden()
                .on_activate(Effect::Rename(keys::MAIN.to_string(), opened_title))
                .on_activate(Effect::Reveal(keys::RIBBON.to_string())),
        );

    let ribbon = MemoryNode::new(ControlKind::ToolBar)
        .key(keys::RIBBON)
        .named("Add-Ins")
        .bounds(0.0, 40.0, 1920.0, 60.0)
        .hidden()
        .child(
            MemoryNode::new(ControlKind::Button)
                .key(keys::PLUGIN_BUTTON)
                .named(scenario.plugin_button.as_str())
                .bounds(1700.0, 45.0, 60.0, 50.0)
                .with(Capability::Invoke)
                .on_activate(Effect::RevealAfter(keys::PLUGIN_PANEL.to_string(), pacing)),
        );

    let mut x = 40.0;
    let mut actions = Vec::new();
    for name in &scenario.action_buttons {
        let mut button = MemoryNode::new(ControlKind::Button)
            .named(name.as_str())
            .bounds(x, 105.0, 120.0, 30.0)
            .with(Capability::Invoke);
        if *name == scenario.result_button {
            button = button.on_activate(Effect::RevealAfter(keys::DIALOG.to_string(), pacing));
        }
        actions.push(button);
        x += 130.0;
    }
    let panel = MemoryNode::new(ControlKind::ToolBar)
        .key(keys::PLUGIN_PANEL)
        .named(scenario.plugin_button.as_str())
        .bounds(0.0, 100.0, 1920.0, 40.0)
        .hidden()
        .children(actions);

    let main = MemoryNode::new(ControlKind::Window)
        .key(keys::MAIN)
        .named(format!("{MAIN_WINDOW_TITLE} - [Home]"))
        .bounds(0.0, 0.0, 1920.0, 1040.0)
        .children([search, recent, ribbon, panel, popup]);

    let dialog = MemoryNode::new(ControlKind::Window)
        .key(keys::DIALOG)
        .named(scenario.dialog_title.as_str())
        .bounds(700.0, 300.0, 500.0, 300.0)
        .hidden();

    MemoryNode::desktop().children([main, dialog])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::memory::MemoryEngine;
    use crate::platforms::AccessibilityEngine;
    use crate::ElementQuery;

    #[test]
    fn test_session_starts_at_home() {
        let engine = MemoryEngine::new(simulated_session(&Scenario::default(), Duration::ZERO));
        assert!(engine.exists(keys::MAIN));
        assert!(engine.exists(keys::SEARCH));
        assert!(!engine.exists(keys::RECENT_ITEM));
        assert!(!engine.exists(keys::RIBBON));
        assert!(!engine.exists(keys::DIALOG));
    }

    #[test]
    fn test_enter_in_search_box_reveals_project() {
        let engine = MemoryEngine::new(simulated_session(&Scenario::default(), Duration::ZERO));
        let search = engine.element(keys::SEARCH).unwrap();
        search.set_value("Project1").unwrap();
        engine.press_key(Key::Enter).unwrap();
        let root = engine.root();
        let item = engine
            .find_first(&root, &ElementQuery::kind_named(ControlKind::DataItem, "Project1"))
            .unwrap();
        assert!(item.is_some());
    }
}
