// ABOUTME: App orchestrator: wires storage, authentication, the chat API, the worker, and the TUI.
// ABOUTME: Signs in before the terminal is taken over, then runs the event loop until quit.

use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use crossterm::event::{
    Event, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use futures::StreamExt;
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::{ChatApi, ChatBackend, http_client};
use crate::auth::{AuthClient, AuthOutcome, AuthService, CredentialStore};
use crate::config::Config;
use crate::conversation::{ConversationParams, run_conversation_loop};
use crate::storage::{FileStore, KeyValueStore, MemoryStore, load_draft, save_draft};
use crate::tui::input::handle_key;
use crate::tui::state::{ChatEvent, TuiState, UserEvent};
use crate::tui::subscriptions::{Msg, chat_event_stream, merge, terminal_event_stream};
use crate::tui::ui;
use crate::tui::update::{apply_chat_event, handle_input};

/// How the user launched the client.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// A launch URL carrying `?sid=...`.
    pub launch_url: Option<String>,
    /// An explicit session id; replaces any stored one.
    pub sid: Option<String>,
    /// Keep credentials and drafts in memory only.
    pub ephemeral: bool,
}

/// Top-level application that orchestrates all subsystems.
pub struct App {
    config: Config,
    options: LaunchOptions,
}

impl App {
    pub fn new(config: Config, options: LaunchOptions) -> Self {
        Self { config, options }
    }

    fn open_store(&self) -> Arc<dyn KeyValueStore> {
        if self.options.ephemeral {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(FileStore::new(self.config.storage_path()))
        }
    }

    /// Forget stored tokens. The session id is cleared too, so the next launch needs a fresh one.
    pub fn logout(&self) -> anyhow::Result<()> {
        let http = http_client(&self.config.api)?;
        let auth = AuthService::new(
            http,
            &self.config.api.base_url,
            CredentialStore::new(self.open_store()),
        );
        auth.logout();
        println!("Signed out.");
        Ok(())
    }

    /// Run the application: sign in, launch the worker, and drive the TUI.
    pub async fn run(self) -> anyhow::Result<()> {
        let store = self.open_store();
        let credentials = CredentialStore::new(store.clone());
        if let Some(sid) = self.options.sid.as_deref().filter(|s| !s.is_empty()) {
            credentials.set_sid(sid);
        }

        let http = http_client(&self.config.api)?;
        let auth = AuthService::new(http.clone(), &self.config.api.base_url, credentials)
            .with_launch_url(self.options.launch_url.clone())
            .with_dashboard_url(self.config.api.dashboard_url.clone());

        match auth.initialize().await.context("could not sign in")? {
            AuthOutcome::Authenticated(_) => info!("signed in"),
            AuthOutcome::RequiresReauth { redirect_url } => {
                print_reauth(&redirect_url);
                return Ok(());
            }
        }

        let client = Arc::new(AuthClient::new(http, auth));
        let backend: Arc<dyn ChatBackend> =
            Arc::new(ChatApi::new(client, &self.config.api.base_url));

        let (user_tx, user_rx) = mpsc::channel::<UserEvent>(16);
        let (chat_tx, chat_rx) = mpsc::channel::<ChatEvent>(64);

        let worker = tokio::spawn(run_conversation_loop(
            ConversationParams {
                backend,
                templates_dir: self.config.templates_dir(),
            },
            user_rx,
            chat_tx,
        ));

        let mut state = TuiState::new().with_draft(load_draft(store.as_ref()));

        let mut terminal = ratatui::init();
        let enhanced = enable_keyboard_enhancement();
        let result = event_loop(&mut terminal, &mut state, &user_tx, chat_rx, store.as_ref()).await;
        if enhanced {
            let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
        }
        ratatui::restore();

        // Signal the worker to quit and wait for it.
        let _ = user_tx.send(UserEvent::Quit).await;
        drop(user_tx);
        if let Err(e) = worker.await {
            warn!("conversation worker ended abnormally: {}", e);
        }

        result?;

        match &state.reauth_url {
            Some(url) => print_reauth(url),
            None => print_exit_screen(&state),
        }
        Ok(())
    }
}

/// Ask the terminal to report Shift+Enter distinctly. Returns whether flags were pushed.
fn enable_keyboard_enhancement() -> bool {
    if !crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false) {
        return false;
    }
    execute!(
        stdout(),
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
    )
    .is_ok()
}

async fn event_loop(
    terminal: &mut DefaultTerminal,
    state: &mut TuiState,
    user_tx: &mpsc::Sender<UserEvent>,
    chat_rx: mpsc::Receiver<ChatEvent>,
    store: &dyn KeyValueStore,
) -> anyhow::Result<()> {
    let mut events = merge(terminal_event_stream(), chat_event_stream(chat_rx));
    // Redraw once a second so the session clock keeps moving.
    let mut tick = tokio::time::interval(Duration::from_secs(1));

    terminal.draw(|frame| ui::render(frame, state))?;

    loop {
        tokio::select! {
            msg = events.next() => {
                let Some(msg) = msg else { break };
                match msg {
                    Msg::Terminal(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        let draft_before = state.input.clone();
                        let result = handle_key(state, key);
                        if let Some(event) = handle_input(state, result) {
                            if user_tx.send(event).await.is_err() {
                                warn!("conversation worker is gone; closing");
                                break;
                            }
                        }
                        if state.input != draft_before {
                            save_draft(store, &state.input);
                        }
                    }
                    Msg::Terminal(_) => {}
                    Msg::Chat(event) => apply_chat_event(state, event),
                    Msg::TerminalError(e) => anyhow::bail!("terminal input failed: {e}"),
                }
            }
            _ = tick.tick() => {}
        }

        if state.should_quit {
            break;
        }
        terminal.draw(|frame| ui::render(frame, state))?;
    }
    Ok(())
}

fn print_reauth(url: &str) {
    println!();
    println!("  Your session could not be restored.");
    println!("  Sign in again from the dashboard: {url}");
    println!();
}

/// Print a farewell screen after the TUI exits.
fn print_exit_screen(state: &TuiState) {
    let elapsed_secs = state.session_start.elapsed().as_secs();
    let elapsed = if elapsed_secs >= 3600 {
        format!("{}h {:02}m", elapsed_secs / 3600, (elapsed_secs % 3600) / 60)
    } else {
        format!("{}m {:02}s", elapsed_secs / 60, elapsed_secs % 60)
    };
    let msg_count = state.messages.len();

    println!();
    println!("  \x1b[1mThanks for building with your AI Co-founder!\x1b[0m");
    println!();
    println!("  Session lasted {elapsed} with {msg_count} messages exchanged.");
    println!();
}
