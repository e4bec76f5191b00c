// ABOUTME: Event sources for the TUI loop: terminal input and conversation worker events.
// ABOUTME: Both are merged into one stream of Msg so the app loop awaits a single source.

use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::tui::state::ChatEvent;

/// Everything the TUI loop reacts to.
#[derive(Debug)]
pub enum Msg {
    Terminal(Event),
    Chat(ChatEvent),
    /// Reading from the terminal failed; the loop should shut down.
    TerminalError(String),
}

/// Wrap the worker's receiver as a stream of `Msg::Chat`.
pub fn chat_event_stream(rx: mpsc::Receiver<ChatEvent>) -> BoxStream<'static, Msg> {
    ReceiverStream::new(rx).map(Msg::Chat).boxed()
}

/// Crossterm's async terminal events as a stream of `Msg`.
pub fn terminal_event_stream() -> BoxStream<'static, Msg> {
    EventStream::new()
        .map(|event| match event {
            Ok(event) => Msg::Terminal(event),
            Err(e) => Msg::TerminalError(e.to_string()),
        })
        .boxed()
}

/// Interleave the two sources, yielding from whichever is ready first.
pub fn merge(
    terminal: BoxStream<'static, Msg>,
    chat: BoxStream<'static, Msg>,
) -> BoxStream<'static, Msg> {
    stream::select(terminal, chat).boxed()
}
