use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{info, warn};
use tokio::sync::mpsc;

use crate::chat::{ChatSession, RevealTick};
use crate::clipboard::{self, Clipboard, CopyOutcome};
use crate::config::Config;
use crate::gemini::{DispatchError, Endpoint, GeminiClient};
use crate::preset::ModelPreset;
use crate::reveal::RevealTimer;
use crate::tui::AppEvent;

/// How long a status line stays on screen.
const STATUS_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub expires_at: Instant,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: ChatSession,

    // Input box
    pub input: String,
    pub cursor: usize, // char position in input

    // Chat pane
    pub chat_scroll: u16,
    pub follow_tail: bool,
    pub chat_height: u16, // updated during render

    // Presentation
    pub dark_mode: bool,
    pub animation_frame: u8, // 0-2 for the "Generating" ellipsis
    pub status: Option<StatusMessage>,
    pub preset: ModelPreset,

    client: GeminiClient,
    clipboard: Box<dyn Clipboard + Send>,
    reveal_timer: RevealTimer,
    events: mpsc::UnboundedSender<AppEvent>,
    config_path: Option<PathBuf>,
}

impl App {
    pub fn new(
        config: &Config,
        client: GeminiClient,
        clipboard: Box<dyn Clipboard + Send>,
        events: mpsc::UnboundedSender<AppEvent>,
        config_path: Option<PathBuf>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            session: ChatSession::new(),

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            follow_tail: true,
            chat_height: 0,

            dark_mode: config.dark_mode,
            animation_frame: 0,
            status: None,
            preset: config.preset(),

            client,
            clipboard,
            reveal_timer: RevealTimer::new(config.reveal_interval()),
            events,
            config_path,
        }
    }

    pub fn model(&self) -> &str {
        &self.client.endpoint().model
    }

    /// Submits the input box contents. Blank input is left untouched.
    pub fn submit_input(&mut self) {
        if !self.session.submit(&self.input) {
            return;
        }
        self.input.clear();
        self.cursor = 0;
        self.follow_tail = true;
    }

    pub fn on_reply(&mut self, outcome: Result<String, DispatchError>) {
        self.session.receive(outcome);
    }

    pub fn on_reveal_tick(&mut self) {
        if self.session.tick() == RevealTick::Committed {
            info!("reply committed ({} messages)", self.session.conversation().len());
        }
    }

    pub fn finish_reveal(&mut self) {
        self.session.finish_reveal();
    }

    /// Starts whatever background work the session now needs and stops what
    /// it no longer needs. Called after every event.
    pub fn sync_tasks(&mut self) {
        if let Some(prompt) = self.session.next_dispatch() {
            self.dispatch(prompt);
        }

        match (self.session.is_revealing(), self.reveal_timer.is_running()) {
            (true, false) => self.reveal_timer.start(self.events.clone()),
            (false, true) => self.reveal_timer.cancel(),
            _ => {}
        }
    }

    fn dispatch(&mut self, prompt: String) {
        info!("dispatching prompt to {}", self.client.endpoint().model);
        self.animation_frame = 0;

        let client = self.client.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let outcome = client.generate(&prompt).await;
            let _ = tx.send(AppEvent::Reply(outcome));
        });
    }

    pub fn copy_last_reply(&mut self) -> CopyOutcome {
        let outcome = clipboard::copy_last_reply(self.session.conversation(), self.clipboard.as_mut());
        if outcome == CopyOutcome::Copied {
            self.set_status("Reply copied to clipboard");
        }
        outcome
    }

    pub fn toggle_theme(&mut self) {
        self.dark_mode = !self.dark_mode;
    }

    /// Switches to the next model preset; in-flight requests keep their model.
    pub fn cycle_preset(&mut self) {
        self.preset = self.preset.next();

        let endpoint = Endpoint {
            base_url: self.client.endpoint().base_url.clone(),
            version: self.preset.api_version(),
            model: self.preset.model_id().to_string(),
        };
        self.client = self.client.with_endpoint(endpoint);

        if let Some(path) = &self.config_path {
            if let Err(e) = Config::save_preset(path, self.preset) {
                warn!("failed to save preset: {}", e);
            }
        }
        self.set_status(&format!("Switched to {}", self.preset.display_name()));
    }

    pub fn set_status(&mut self, text: &str) {
        self.status = Some(StatusMessage {
            text: text.to_string(),
            expires_at: Instant::now() + STATUS_TTL,
        });
    }

    /// Tick animation frame and expire the status line (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_awaiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if self.status.as_ref().is_some_and(|s| Instant::now() >= s.expires_at) {
            self.status = None;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_tail = true;
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::chat::{Message, Phase, Role};
    use crate::clipboard::tests::RecordingClipboard;
    use crate::preset::ApiVersion;

    /// App wired to an unreachable endpoint and a throwaway clipboard.
    pub fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = GeminiClient::new(
            Endpoint {
                base_url: "http://127.0.0.1:9".to_string(),
                version: ApiVersion::V1Beta,
                model: "gemini-2.0-flash-001".to_string(),
            },
            "test-key",
            Duration::from_secs(5),
        )
        .unwrap();
        let app = App::new(
            &Config::new(),
            client,
            Box::new(RecordingClipboard::default()),
            tx,
            None,
        );
        (app, rx)
    }

    #[test]
    fn test_submit_clears_input() {
        let (mut app, _rx) = test_app();
        app.input = "hello".to_string();
        app.cursor = 5;
        app.submit_input();

        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert_eq!(app.session.conversation().messages(), &[Message::user("hello")]);
    }

    #[test]
    fn test_blank_submit_keeps_input() {
        let (mut app, _rx) = test_app();
        app.input = "   ".to_string();
        app.cursor = 3;
        app.submit_input();

        assert_eq!(app.input, "   ");
        assert!(app.session.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_appends_fallback() {
        let (mut app, mut rx) = test_app();
        app.input = "hi".to_string();
        app.submit_input();
        app.sync_tasks();
        assert!(app.session.is_awaiting());

        let event = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match rx.recv().await {
                    Some(AppEvent::Reply(outcome)) => return outcome,
                    Some(_) => continue,
                    None => panic!("event channel closed"),
                }
            }
        })
        .await
        .unwrap();
        assert!(event.is_err());

        app.on_reply(event);
        app.sync_tasks();
        assert_eq!(app.session.phase(), &Phase::Idle);
        assert!(!app.reveal_timer.is_running());
        let last = app.session.conversation().messages().last().unwrap();
        assert_eq!(last.role(), Role::Bot);
        assert_eq!(last.text(), crate::chat::REQUEST_FAILED);
    }

    #[tokio::test]
    async fn test_reveal_timer_follows_session() {
        let (mut app, mut rx) = test_app();
        app.input = "hi".to_string();
        app.submit_input();
        app.session.next_dispatch();
        app.on_reply(Ok("ok".to_string()));

        app.sync_tasks();
        assert!(app.reveal_timer.is_running());

        // Drive the reveal from the timer's own ticks
        while app.session.is_revealing() {
            match rx.recv().await {
                Some(AppEvent::RevealTick) => app.on_reveal_tick(),
                Some(_) => {}
                None => panic!("event channel closed"),
            }
        }
        app.sync_tasks();
        assert!(!app.reveal_timer.is_running());
        assert_eq!(app.session.conversation().last_reply().map(|m| m.text()), Some("ok"));
    }

    #[test]
    fn test_copy_sets_status_only_on_success() {
        let (mut app, _rx) = test_app();
        assert_eq!(app.copy_last_reply(), CopyOutcome::NothingToCopy);
        assert!(app.status.is_none());

        app.input = "hi".to_string();
        app.submit_input();
        app.session.next_dispatch();
        app.on_reply(Ok("hello".to_string()));
        app.finish_reveal();

        assert_eq!(app.copy_last_reply(), CopyOutcome::Copied);
        assert!(app.status.is_some());
    }

    #[test]
    fn test_cycle_preset_switches_model() {
        let (mut app, _rx) = test_app();
        assert_eq!(app.model(), "gemini-2.0-flash-001");

        app.cycle_preset();
        assert_eq!(app.preset, ModelPreset::Pro);
        assert_eq!(app.model(), "gemini-2.5-pro");
        assert_eq!(app.client.endpoint().version, ApiVersion::V1);
        assert_eq!(app.client.endpoint().base_url, "http://127.0.0.1:9");

        app.cycle_preset();
        assert_eq!(app.model(), "gemini-2.0-flash-001");
    }

    #[test]
    fn test_status_expires() {
        let (mut app, _rx) = test_app();
        app.set_status("hello");
        app.tick_animation();
        assert!(app.status.is_some());

        app.status.as_mut().unwrap().expires_at = Instant::now() - Duration::from_millis(1);
        app.tick_animation();
        assert!(app.status.is_none());
    }

    #[test]
    fn test_toggle_theme() {
        let (mut app, _rx) = test_app();
        assert!(!app.dark_mode);
        app.toggle_theme();
        assert!(app.dark_mode);
    }
}
