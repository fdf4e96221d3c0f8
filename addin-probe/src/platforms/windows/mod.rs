//! UI Automation backend

pub mod element;
pub mod engine;
pub(crate) mod types;
pub(crate) mod utils;

pub use element::WindowsUIElement;
pub use engine::WindowsEngine;
