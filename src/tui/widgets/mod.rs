// ABOUTME: TUI widget sub-modules for the transcript, roadmap sidebar, and status lines.
// ABOUTME: Each widget is a pure rendering function over state fields.

pub mod chat;
pub mod status;
pub mod steps;
