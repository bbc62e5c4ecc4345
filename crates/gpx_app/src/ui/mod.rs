pub mod render;
pub mod terminal;

pub use render::{page_shell, render, UiCommand};
pub use terminal::TerminalUi;
