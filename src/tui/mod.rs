// ABOUTME: TUI module: ratatui full-screen interface for the co-founder chat.
// ABOUTME: Transcript display, roadmap sidebar, composer input, and usage/status lines.

pub mod input;
pub mod state;
pub mod subscriptions;
pub mod ui;
pub mod update;
pub mod widgets;

pub use state::*;
