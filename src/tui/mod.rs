//! Terminal user interface
//!
//! A single conversation pane over the session controller.

mod app;
mod input;
mod shimmer;
mod theme;
mod widgets;

pub use app::App;
pub use theme::Theme;
pub use widgets::{Message, MessageRole};
