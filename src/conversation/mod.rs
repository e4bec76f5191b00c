// ABOUTME: Conversation module: the background worker between the TUI and the chat backend.
// ABOUTME: Communicates with the TUI over mpsc channels of UserEvent and ChatEvent.

pub mod r#loop;

pub use r#loop::{ConversationParams, reply_message, run_conversation_loop};
