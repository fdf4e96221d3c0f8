//! Declarative element queries
//!
//! An [`ElementQuery`] describes *what* to find (control kind, name, exclusions)
//! and nothing about *how* to search for it. Queries compose with AND/OR/NOT and
//! can be parsed from the compact string form used in configuration files:
//!
//! ```
//! use addin_probe::{ControlKind, ElementQuery};
//!
//! let parsed = ElementQuery::from("role:Edit && !name:Project1");
//! let built = ElementQuery::kind(ControlKind::Edit).excluding(ElementQuery::name("Project1"));
//! assert_eq!(parsed, built);
//! ```

use crate::element::UIElement;
use crate::errors::AutomationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Categorical role of a node as reported by the accessibility provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    AppBar,
    Button,
    Calendar,
    CheckBox,
    ComboBox,
    Custom,
    DataGrid,
    DataItem,
    Document,
    Edit,
    Group,
    Header,
    HeaderItem,
    Hyperlink,
    Image,
    List,
    ListItem,
    Menu,
    MenuBar,
    MenuItem,
    Pane,
    ProgressBar,
    RadioButton,
    ScrollBar,
    SemanticZoom,
    Separator,
    Slider,
    Spinner,
    SplitButton,
    StatusBar,
    Tab,
    TabItem,
    Table,
    Text,
    Thumb,
    TitleBar,
    ToolBar,
    ToolTip,
    Tree,
    TreeItem,
    Window,
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl FromStr for ControlKind {
    type Err = AutomationError;

    fn from_str(role: &str) -> Result<Self, Self::Err> {
        let kind = match role.trim().to_lowercase().as_str() {
            "appbar" => ControlKind::AppBar,
            "button" => ControlKind::Button,
            "calendar" => ControlKind::Calendar,
            "checkbox" => ControlKind::CheckBox,
            "combobox" => ControlKind::ComboBox,
            "custom" => ControlKind::Custom,
            "datagrid" => ControlKind::DataGrid,
            "data" | "dataitem" => ControlKind::DataItem,
            "document" => ControlKind::Document,
            "edit" | "textfield" | "input" => ControlKind::Edit,
            "group" => ControlKind::Group,
            "header" => ControlKind::Header,
            "headeritem" => ControlKind::HeaderItem,
            "hyperlink" | "link" => ControlKind::Hyperlink,
            "image" => ControlKind::Image,
            "list" => ControlKind::List,
            "listitem" => ControlKind::ListItem,
            "menu" => ControlKind::Menu,
            "menubar" => ControlKind::MenuBar,
            "menuitem" => ControlKind::MenuItem,
            "pane" => ControlKind::Pane,
            "progressbar" => ControlKind::ProgressBar,
            "radiobutton" => ControlKind::RadioButton,
            "scrollbar" => ControlKind::ScrollBar,
            "semanticzoom" => ControlKind::SemanticZoom,
            "separator" => ControlKind::Separator,
            "slider" => ControlKind::Slider,
            "spinner" => ControlKind::Spinner,
            "splitbutton" => ControlKind::SplitButton,
            "statusbar" => ControlKind::StatusBar,
            "tab" => ControlKind::Tab,
            "tabitem" => ControlKind::TabItem,
            "table" => ControlKind::Table,
            "text" => ControlKind::Text,
            "thumb" => ControlKind::Thumb,
            "title" | "titlebar" => ControlKind::TitleBar,
            "toolbar" => ControlKind::ToolBar,
            "tooltip" => ControlKind::ToolTip,
            "tree" => ControlKind::Tree,
            "treeitem" => ControlKind::TreeItem,
            "window" | "dialog" => ControlKind::Window,
            other => {
                return Err(AutomationError::InvalidSelector(format!(
                    "Unknown control kind: '{other}'"
                )))
            }
        };
        Ok(kind)
    }
}

/// Predicate over a single accessibility node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementQuery {
    /// Matches every node
    Any,
    /// Matches nodes of the given control kind
    ControlKind(ControlKind),
    /// Matches nodes whose name equals the value exactly
    Name(String),
    /// Matches nodes whose name contains the value, ignoring case
    NameContains(String),
    /// Logical AND: all queries must match the same node
    And(Vec<ElementQuery>),
    /// Logical OR: any query can match
    Or(Vec<ElementQuery>),
    /// Logical NOT: node must not match the query
    Not(Box<ElementQuery>),
    /// Represents an unparseable query string, with a reason.
    Invalid(String),
}

impl ElementQuery {
    pub fn kind(kind: ControlKind) -> Self {
        ElementQuery::ControlKind(kind)
    }

    pub fn name(name: impl Into<String>) -> Self {
        ElementQuery::Name(name.into())
    }

    pub fn name_contains(fragment: impl Into<String>) -> Self {
        ElementQuery::NameContains(fragment.into())
    }

    /// Shorthand for `kind(kind).and(name(name))`, the most common query shape.
    pub fn kind_named(kind: ControlKind, name: impl Into<String>) -> Self {
        ElementQuery::And(vec![
            ElementQuery::ControlKind(kind),
            ElementQuery::Name(name.into()),
        ])
    }

    /// Combine with AND, flattening nested conjunctions.
    pub fn and(self, other: ElementQuery) -> Self {
        let mut operands = Vec::new();
        for side in [self, other] {
            match side {
                ElementQuery::And(mut ops) => operands.append(&mut ops),
                q => operands.push(q),
            }
        }
        ElementQuery::And(operands)
    }

    /// Combine with OR, flattening nested disjunctions.
    pub fn or(self, other: ElementQuery) -> Self {
        let mut operands = Vec::new();
        for side in [self, other] {
            match side {
                ElementQuery::Or(mut ops) => operands.append(&mut ops),
                q => operands.push(q),
            }
        }
        ElementQuery::Or(operands)
    }

    /// Add an exclusion predicate: `self && !excluded`.
    pub fn excluding(self, excluded: ElementQuery) -> Self {
        self.and(!excluded)
    }

    /// Returns the first parse error embedded in the query tree, if any.
    pub fn validate(&self) -> Result<(), AutomationError> {
        match self {
            ElementQuery::Invalid(reason) => Err(AutomationError::InvalidSelector(reason.clone())),
            ElementQuery::And(ops) | ElementQuery::Or(ops) => {
                ops.iter().try_for_each(|q| q.validate())
            }
            ElementQuery::Not(inner) => inner.validate(),
            _ => Ok(()),
        }
    }

    /// The control kind every match is guaranteed to have, if the query pins one.
    ///
    /// Backends use this to narrow the native search before evaluating the
    /// full predicate.
    pub fn required_kind(&self) -> Option<ControlKind> {
        match self {
            ElementQuery::ControlKind(kind) => Some(*kind),
            ElementQuery::And(ops) => ops.iter().find_map(|q| q.required_kind()),
            _ => None,
        }
    }

    /// Evaluate the predicate against a live node.
    ///
    /// Property reads go to the provider, so errors from a node that went stale
    /// mid-evaluation propagate to the caller.
    pub fn matches(&self, element: &UIElement) -> Result<bool, AutomationError> {
        match self {
            ElementQuery::Any => Ok(true),
            ElementQuery::ControlKind(kind) => Ok(element.control_kind()? == *kind),
            ElementQuery::Name(expected) => {
                Ok(element.name()?.as_deref() == Some(expected.as_str()))
            }
            ElementQuery::NameContains(fragment) => Ok(element
                .name()?
                .map(|name| contains_ignore_case(&name, fragment))
                .unwrap_or(false)),
            ElementQuery::And(ops) => {
                for q in ops {
                    if !q.matches(element)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ElementQuery::Or(ops) => {
                for q in ops {
                    if q.matches(element)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            ElementQuery::Not(inner) => Ok(!inner.matches(element)?),
            ElementQuery::Invalid(reason) => Err(AutomationError::InvalidSelector(reason.clone())),
        }
    }
}

impl std::ops::Not for ElementQuery {
    type Output = ElementQuery;

    fn not(self) -> Self::Output {
        ElementQuery::Not(Box::new(self))
    }
}

/// Case-insensitive substring test used for title and open-project checks.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementQuery::Any => write!(f, "*"),
            ElementQuery::ControlKind(kind) => write!(f, "role:{kind}"),
            ElementQuery::Name(name) => write!(f, "name:{name}"),
            ElementQuery::NameContains(fragment) => write!(f, "contains:{fragment}"),
            ElementQuery::And(ops) => write_joined(f, ops, " && "),
            ElementQuery::Or(ops) => write_joined(f, ops, " || "),
            ElementQuery::Not(inner) => match inner.as_ref() {
                ElementQuery::And(_) | ElementQuery::Or(_) => write!(f, "!({inner})"),
                _ => write!(f, "!{inner}"),
            },
            ElementQuery::Invalid(reason) => write!(f, "<invalid: {reason}>"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, ops: &[ElementQuery], sep: &str) -> fmt::Result {
    for (i, q) in ops.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        match q {
            ElementQuery::And(_) | ElementQuery::Or(_) => write!(f, "({q})")?,
            _ => write!(f, "{q}")?,
        }
    }
    Ok(())
}

/// Token types for boolean expression parsing
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Atom(String),
    And,    // &&
    Or,     // ||
    Not,    // !
    LParen, // (
    RParen, // )
}

fn flush(current: &mut String, tokens: &mut Vec<Token>) {
    let atom = current.trim();
    if !atom.is_empty() {
        tokens.push(Token::Atom(atom.to_string()));
    }
    current.clear();
}

/// Tokenize a query string into tokens for boolean expression parsing
fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut current = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            '(' => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::LParen);
            }
            ')' => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::RParen);
            }
            '&' if chars.peek() == Some(&'&') => {
                chars.next();
                flush(&mut current, &mut tokens);
                tokens.push(Token::And);
            }
            '|' if chars.peek() == Some(&'|') => {
                chars.next();
                flush(&mut current, &mut tokens);
                tokens.push(Token::Or);
            }
            // Only a leading `!` negates; inside a name it is literal text.
            '!' if current.trim().is_empty() => {
                current.clear();
                tokens.push(Token::Not);
            }
            ' ' | '\t' | '\n' | '\r' if current.is_empty() => continue,
            _ => current.push(ch),
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}

/// Operator precedence for the Shunting Yard algorithm
fn precedence(token: &Token) -> i32 {
    match token {
        Token::Or => 1,
        Token::And => 2,
        Token::Not => 3,
        _ => 0,
    }
}

fn parse_expression(tokens: Vec<Token>) -> Result<ElementQuery, String> {
    let mut output: Vec<ElementQuery> = Vec::new();
    let mut operators: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Atom(s) => output.push(parse_atom(&s)),
            Token::LParen => operators.push(token),
            Token::RParen => {
                let mut matched = false;
                while let Some(op) = operators.pop() {
                    if op == Token::LParen {
                        matched = true;
                        break;
                    }
                    apply_operator(op, &mut output)?;
                }
                if !matched {
                    return Err("Unmatched closing parenthesis".to_string());
                }
            }
            Token::Not => operators.push(token),
            Token::And | Token::Or => {
                while let Some(top) = operators.last() {
                    if *top == Token::LParen || precedence(top) < precedence(&token) {
                        break;
                    }
                    if let Some(op) = operators.pop() {
                        apply_operator(op, &mut output)?;
                    }
                }
                operators.push(token);
            }
        }
    }

    while let Some(op) = operators.pop() {
        if op == Token::LParen {
            return Err("Unmatched opening parenthesis".to_string());
        }
        apply_operator(op, &mut output)?;
    }

    match output.len() {
        1 => output.pop().ok_or_else(|| "Empty expression".to_string()),
        0 => Err("Empty expression".to_string()),
        _ => Err("Invalid expression: multiple queries without operators".to_string()),
    }
}

fn apply_operator(op: Token, output: &mut Vec<ElementQuery>) -> Result<(), String> {
    match op {
        Token::Not => {
            let operand = output.pop().ok_or("NOT operator requires one operand")?;
            output.push(!operand);
        }
        Token::And | Token::Or => {
            let right = output.pop().ok_or("Binary operator requires two operands")?;
            let left = output.pop().ok_or("Binary operator requires two operands")?;
            output.push(if op == Token::And {
                left.and(right)
            } else {
                left.or(right)
            });
        }
        other => return Err(format!("Unexpected operator: {other:?}")),
    }
    Ok(())
}

/// Parse an atomic (non-boolean) query from a string
fn parse_atom(s: &str) -> ElementQuery {
    let s = s.trim();

    // Legacy pipe syntax (role|name)
    if let Some((role_part, name_part)) = s.split_once('|') {
        let role = role_part.trim();
        let role = role.strip_prefix("role:").unwrap_or(role);
        let name = name_part.trim();
        let name = name.strip_prefix("name:").unwrap_or(name);
        return match role.parse::<ControlKind>() {
            Ok(kind) => ElementQuery::kind_named(kind, name),
            Err(e) => ElementQuery::Invalid(e.to_string()),
        };
    }

    let lower = s.to_lowercase();
    match s {
        "*" => ElementQuery::Any,
        _ if lower.starts_with("role:") => match s["role:".len()..].parse::<ControlKind>() {
            Ok(kind) => ElementQuery::ControlKind(kind),
            Err(e) => ElementQuery::Invalid(e.to_string()),
        },
        _ if lower.starts_with("name:") => ElementQuery::Name(s["name:".len()..].to_string()),
        _ if lower.starts_with("contains:") => {
            ElementQuery::NameContains(s["contains:".len()..].to_string())
        }
        _ => match s.parse::<ControlKind>() {
            Ok(kind) => ElementQuery::ControlKind(kind),
            Err(_) => ElementQuery::Invalid(format!(
                "Unknown query format: \"{s}\". Use prefixes like 'role:', 'name:' or 'contains:'."
            )),
        },
    }
}

impl From<&str> for ElementQuery {
    fn from(s: &str) -> Self {
        let s = s.trim();
        let has_boolean_ops =
            s.contains("&&") || s.contains("||") || s.starts_with('!') || s.starts_with('(');
        if !has_boolean_ops {
            return parse_atom(s);
        }
        match parse_expression(tokenize(s)) {
            Ok(query) => query,
            Err(e) => ElementQuery::Invalid(format!("Parse error: {e}")),
        }
    }
}

impl From<String> for ElementQuery {
    fn from(s: String) -> Self {
        ElementQuery::from(s.as_str())
    }
}
