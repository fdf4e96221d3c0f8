//! Conversions between UI Automation types and the crate's model

use super::types::ThreadSafeWinUIAutomation;
use crate::{AutomationError, ControlKind, ElementQuery, Key};
use uiautomation::types::{ControlType, UIProperty};
use uiautomation::variants::Variant;
use uiautomation::{UIAutomation, UICondition};

pub(crate) fn to_control_type(kind: ControlKind) -> ControlType {
    match kind {
        ControlKind::AppBar => ControlType::AppBar,
        ControlKind::Button => ControlType::Button,
        ControlKind::Calendar => ControlType::Calendar,
        ControlKind::CheckBox => ControlType::CheckBox,
        ControlKind::ComboBox => ControlType::ComboBox,
        ControlKind::Custom => ControlType::Custom,
        ControlKind::DataGrid => ControlType::DataGrid,
        ControlKind::DataItem => ControlType::DataItem,
        ControlKind::Document => ControlType::Document,
        ControlKind::Edit => ControlType::Edit,
        ControlKind::Group => ControlType::Group,
        ControlKind::Header => ControlType::Header,
        ControlKind::HeaderItem => ControlType::HeaderItem,
        ControlKind::Hyperlink => ControlType::Hyperlink,
        ControlKind::Image => ControlType::Image,
        ControlKind::List => ControlType::List,
        ControlKind::ListItem => ControlType::ListItem,
        ControlKind::Menu => ControlType::Menu,
        ControlKind::MenuBar => ControlType::MenuBar,
        ControlKind::MenuItem => ControlType::MenuItem,
        ControlKind::Pane => ControlType::Pane,
        ControlKind::ProgressBar => ControlType::ProgressBar,
        ControlKind::RadioButton => ControlType::RadioButton,
        ControlKind::ScrollBar => ControlType::ScrollBar,
        ControlKind::SemanticZoom => ControlType::SemanticZoom,
        ControlKind::Separator => ControlType::Separator,
        ControlKind::Slider => ControlType::Slider,
        ControlKind::Spinner => ControlType::Spinner,
        ControlKind::SplitButton => ControlType::SplitButton,
        ControlKind::StatusBar => ControlType::StatusBar,
        ControlKind::Tab => ControlType::Tab,
        ControlKind::TabItem => ControlType::TabItem,
        ControlKind::Table => ControlType::Table,
        ControlKind::Text => ControlType::Text,
        ControlKind::Thumb => ControlType::Thumb,
        ControlKind::TitleBar => ControlType::TitleBar,
        ControlKind::ToolBar => ControlType::ToolBar,
        ControlKind::ToolTip => ControlType::ToolTip,
        ControlKind::Tree => ControlType::Tree,
        ControlKind::TreeItem => ControlType::TreeItem,
        ControlKind::Window => ControlType::Window,
    }
}

pub(crate) fn from_control_type(control_type: ControlType) -> ControlKind {
    match control_type {
        ControlType::AppBar => ControlKind::AppBar,
        ControlType::Button => ControlKind::Button,
        ControlType::Calendar => ControlKind::Calendar,
        ControlType::CheckBox => ControlKind::CheckBox,
        ControlType::ComboBox => ControlKind::ComboBox,
        ControlType::DataGrid => ControlKind::DataGrid,
        ControlType::DataItem => ControlKind::DataItem,
        ControlType::Document => ControlKind::Document,
        ControlType::Edit => ControlKind::Edit,
        ControlType::Group => ControlKind::Group,
        ControlType::Header => ControlKind::Header,
        ControlType::HeaderItem => ControlKind::HeaderItem,
        ControlType::Hyperlink => ControlKind::Hyperlink,
        ControlType::Image => ControlKind::Image,
        ControlType::List => ControlKind::List,
        ControlType::ListItem => ControlKind::ListItem,
        ControlType::Menu => ControlKind::Menu,
        ControlType::MenuBar => ControlKind::MenuBar,
        ControlType::MenuItem => ControlKind::MenuItem,
        ControlType::Pane => ControlKind::Pane,
        ControlType::ProgressBar => ControlKind::ProgressBar,
        ControlType::RadioButton => ControlKind::RadioButton,
        ControlType::ScrollBar => ControlKind::ScrollBar,
        ControlType::SemanticZoom => ControlKind::SemanticZoom,
        ControlType::Separator => ControlKind::Separator,
        ControlType::Slider => ControlKind::Slider,
        ControlType::Spinner => ControlKind::Spinner,
        ControlType::SplitButton => ControlKind::SplitButton,
        ControlType::StatusBar => ControlKind::StatusBar,
        ControlType::Tab => ControlKind::Tab,
        ControlType::TabItem => ControlKind::TabItem,
        ControlType::Table => ControlKind::Table,
        ControlType::Text => ControlKind::Text,
        ControlType::Thumb => ControlKind::Thumb,
        ControlType::TitleBar => ControlKind::TitleBar,
        ControlType::ToolBar => ControlKind::ToolBar,
        ControlType::ToolTip => ControlKind::ToolTip,
        ControlType::Tree => ControlKind::Tree,
        ControlType::TreeItem => ControlKind::TreeItem,
        ControlType::Window => ControlKind::Window,
        _ => ControlKind::Custom,
    }
}

/// `send_keys` notation for a single key
pub(crate) fn key_sequence(key: Key) -> &'static str {
    match key {
        Key::Enter => "{enter}",
        Key::Escape => "{esc}",
        Key::Tab => "{tab}",
        Key::Space => " ",
        Key::Backspace => "{backspace}",
        Key::Delete => "{delete}",
        Key::Home => "{home}",
        Key::End => "{end}",
        Key::Up => "{up}",
        Key::Down => "{down}",
        Key::Left => "{left}",
        Key::Right => "{right}",
    }
}

/// A provider-side condition that selects a superset of what `query` matches,
/// so the provider does the bulk of the filtering.
///
/// `None` means the query cannot be narrowed natively. The bool is whether the
/// condition is exact, which `Not` needs to stay a superset.
pub(crate) fn native_condition(
    automation: &ThreadSafeWinUIAutomation,
    query: &ElementQuery,
) -> Result<Option<(UICondition, bool)>, AutomationError> {
    build_condition(&automation.0, query)
}

fn build_condition(
    automation: &UIAutomation,
    query: &ElementQuery,
) -> Result<Option<(UICondition, bool)>, AutomationError> {
    Ok(match query {
        ElementQuery::Any => Some((automation.create_true_condition()?, true)),
        ElementQuery::ControlKind(kind) => Some((
            automation.create_property_condition(
                UIProperty::ControlType,
                Variant::from(to_control_type(*kind) as i32),
                None,
            )?,
            true,
        )),
        ElementQuery::Name(name) => Some((
            automation.create_property_condition(
                UIProperty::Name,
                Variant::from(name.as_str()),
                None,
            )?,
            true,
        )),
        ElementQuery::NameContains(_) => None,
        ElementQuery::Invalid(reason) => {
            return Err(AutomationError::InvalidSelector(reason.clone()))
        }
        ElementQuery::And(operands) => {
            let mut combined: Option<UICondition> = None;
            let mut exact = true;
            for operand in operands {
                match build_condition(automation, operand)? {
                    Some((condition, operand_exact)) => {
                        exact &= operand_exact;
                        combined = Some(match combined {
                            Some(acc) => automation.create_and_condition(acc, condition)?,
                            None => condition,
                        });
                    }
                    None => exact = false,
                }
            }
            combined.map(|condition| (condition, exact))
        }
        ElementQuery::Or(operands) => {
            let mut combined: Option<UICondition> = None;
            let mut exact = true;
            for operand in operands {
                let Some((condition, operand_exact)) = build_condition(automation, operand)?
                else {
                    return Ok(None);
                };
                exact &= operand_exact;
                combined = Some(match combined {
                    Some(acc) => automation.create_or_condition(acc, condition)?,
                    None => condition,
                });
            }
            combined.map(|condition| (condition, exact))
        }
        ElementQuery::Not(inner) => match build_condition(automation, inner)? {
            Some((condition, true)) => Some((automation.create_not_condition(condition)?, true)),
            _ => None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_type_mapping_round_trips() {
        for kind in [
            ControlKind::Button,
            ControlKind::Window,
            ControlKind::TabItem,
            ControlKind::ListItem,
            ControlKind::Edit,
        ] {
            assert_eq!(from_control_type(to_control_type(kind)), kind);
        }
    }
}
