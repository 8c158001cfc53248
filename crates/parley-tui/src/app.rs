use std::path::PathBuf;
use std::sync::Arc;

use parley_core::{
    ChatController, ChatEvent, ColorPicker, Config, GeminiClient, ResponseFetcher, SubmitOutcome,
    Unconfigured,
};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

/// The single modal surface that may be on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    ColorPicker,
    ApiKey,
}

/// Startup options that are not part of the saved config
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub greet: bool,
    /// Where the API key prompt saves to; `None` means the default config path
    pub config_path: Option<PathBuf>,
}

pub struct App {
    pub should_quit: bool,
    pub overlay: Overlay,

    // Conversation
    pub chat: ChatController,
    pub picker: ColorPicker,

    // Message input
    pub input: String,
    pub input_cursor: usize,

    // API key input state
    pub api_key_input: String,
    pub api_key_input_cursor: usize,
    pub has_api_key: bool,

    /// Status line text that is not a request failure (e.g. config save errors)
    pub notice: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Transcript scrolling
    pub chat_scroll: u16,
    pub follow_tail: bool,
    pub chat_height: u16,

    // Areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub plus_area: Option<Rect>,
    pub send_area: Option<Rect>,
    pub sheet_area: Option<Rect>,
    pub swatch_areas: Vec<Rect>,

    pub config: Config,
    pub options: Options,
}

impl App {
    pub fn new(config: Config, options: Options, events: UnboundedSender<ChatEvent>) -> Self {
        let api_key = config.resolve_api_key();
        let fetcher = match &api_key {
            Some(key) => build_fetcher(&config, key),
            None => {
                tracing::warn!("no API key configured");
                ResponseFetcher::new(Arc::new(Unconfigured), config.template())
            }
        };

        let mut chat = ChatController::new(fetcher, config.typing_interval(), events);
        if options.greet {
            if let Some(greeting) = &config.greeting {
                chat.greet(greeting);
            }
        }

        let picker = ColorPicker::new(config.accent_color);
        let has_api_key = api_key.is_some();

        Self {
            should_quit: false,
            overlay: if has_api_key { Overlay::None } else { Overlay::ApiKey },

            chat,
            picker,

            input: String::new(),
            input_cursor: 0,

            api_key_input: String::new(),
            api_key_input_cursor: 0,
            has_api_key,

            notice: None,

            animation_frame: 0,

            chat_scroll: 0,
            follow_tail: true,
            chat_height: 0,

            chat_area: None,
            plus_area: None,
            send_area: None,
            sheet_area: None,
            swatch_areas: Vec::new(),

            config,
            options,
        }
    }

    /// Enter: send when idle, stop the typing animation otherwise
    pub fn press_primary(&mut self) {
        if self.chat.is_responding() {
            self.chat.cancel();
        } else {
            self.send_message();
        }
    }

    pub fn send_message(&mut self) {
        match self.chat.submit(&self.input) {
            SubmitOutcome::Sent => {
                self.input.clear();
                self.input_cursor = 0;
                self.notice = None;
                self.follow_tail = true;
            }
            SubmitOutcome::Empty | SubmitOutcome::Busy => {}
        }
    }

    pub fn handle_chat_event(&mut self, event: ChatEvent) {
        self.chat.handle(event);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_awaiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Overlays
    pub fn open_color_picker(&mut self) {
        if self.overlay == Overlay::None {
            self.picker.open();
            self.overlay = Overlay::ColorPicker;
        }
    }

    pub fn close_color_picker(&mut self) {
        self.picker.close();
        self.overlay = Overlay::None;
    }

    pub fn select_highlighted_color(&mut self) {
        self.picker.select_highlighted();
        self.overlay = Overlay::None;
    }

    pub fn open_api_key_input(&mut self) {
        if self.overlay == Overlay::None {
            self.api_key_input.clear();
            self.api_key_input_cursor = 0;
            self.overlay = Overlay::ApiKey;
        }
    }

    pub fn close_api_key_input(&mut self) {
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
        self.overlay = Overlay::None;
    }

    /// Use the typed key for later requests and persist it to the config file
    pub fn save_api_key(&mut self) {
        let key = self.api_key_input.trim().to_string();
        if key.is_empty() {
            return;
        }

        self.chat.set_fetcher(build_fetcher(&self.config, &key));
        self.has_api_key = true;
        self.config.api_key = Some(key);

        let saved = match &self.options.config_path {
            Some(path) => self.config.save_to(path),
            None => self.config.save(),
        };
        match saved {
            Ok(()) => tracing::info!("API key saved to config"),
            Err(e) => {
                tracing::warn!(error = %e, "could not save config");
                self.notice = Some(format!("API key set for this session only: {}", e));
            }
        }

        self.close_api_key_input();
    }

    /// Status line text: the last request failure wins over other notices
    pub fn status_text(&self) -> Option<String> {
        self.chat
            .last_failure()
            .map(|e| format!("Request failed: {}", e))
            .or_else(|| self.notice.clone())
    }

    // Transcript scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    /// Clamp the scroll offset for a transcript of `total_lines`; called during render
    pub fn fit_scroll(&mut self, total_lines: u16) {
        let max_scroll = total_lines.saturating_sub(self.chat_height);
        if self.follow_tail || self.chat_scroll >= max_scroll {
            self.chat_scroll = max_scroll;
            self.follow_tail = true;
        }
    }
}

fn build_fetcher(config: &Config, api_key: &str) -> ResponseFetcher {
    let client = GeminiClient::new(api_key, &config.model).with_base_url(&config.base_url);
    ResponseFetcher::new(Arc::new(client), config.template())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::sync::mpsc::unbounded_channel;

    fn app_with_key(greet: bool) -> App {
        let config = Config {
            api_key: Some("test-key".to_string()),
            // nothing listens here, so any request fails fast
            base_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        let (tx, _rx) = unbounded_channel();
        App::new(
            config,
            Options {
                greet,
                config_path: None,
            },
            tx,
        )
    }

    #[tokio::test]
    async fn test_greeting_starts_typing() {
        let app = app_with_key(true);
        assert!(app.chat.is_typing());
        assert_eq!(app.overlay, Overlay::None);
    }

    #[tokio::test]
    async fn test_primary_stops_greeting() {
        let mut app = app_with_key(true);
        app.press_primary();
        assert!(!app.chat.is_responding());
        // nothing was revealed yet, so nothing is kept
        assert!(app.chat.session().is_empty());
    }

    #[tokio::test]
    async fn test_send_clears_input_only_when_sent() {
        let mut app = app_with_key(false);
        app.input = "   ".to_string();
        app.send_message();
        assert_eq!(app.input, "   ");

        app.input = "Hi".to_string();
        app.input_cursor = 2;
        app.send_message();
        assert!(app.input.is_empty());
        assert_eq!(app.input_cursor, 0);
        assert!(app.chat.is_awaiting());

        app.input = "again".to_string();
        app.send_message();
        assert_eq!(app.input, "again");
        assert_eq!(app.chat.session().len(), 1);
    }

    #[tokio::test]
    async fn test_only_one_overlay_at_a_time() {
        let mut app = app_with_key(false);
        app.open_color_picker();
        app.open_api_key_input();
        assert_eq!(app.overlay, Overlay::ColorPicker);

        app.picker.move_right();
        app.select_highlighted_color();
        assert_eq!(app.overlay, Overlay::None);
        assert!(!app.picker.is_open());
        assert_eq!(app.picker.accent(), parley_core::PALETTE[1].color);
    }

    #[tokio::test]
    async fn test_save_api_key_writes_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let (tx, _rx) = unbounded_channel();
        let config = Config {
            api_key: None,
            ..Config::default()
        };
        let mut app = App::new(
            config,
            Options {
                greet: false,
                config_path: Some(path.clone()),
            },
            tx,
        );
        // GEMINI_API_KEY may be set in the environment running the tests
        app.overlay = Overlay::ApiKey;

        app.api_key_input = "  fresh-key ".to_string();
        app.save_api_key();

        assert!(app.has_api_key);
        assert_eq!(app.overlay, Overlay::None);
        assert_eq!(Config::load_from(&path).unwrap().api_key.as_deref(), Some("fresh-key"));
    }

    #[tokio::test]
    async fn test_fit_scroll_follows_tail_until_scrolled_up() {
        let mut app = app_with_key(false);
        app.chat_height = 10;

        app.fit_scroll(25);
        assert_eq!(app.chat_scroll, 15);

        app.scroll_up(5);
        app.fit_scroll(30);
        assert_eq!(app.chat_scroll, 10);
        assert!(!app.follow_tail);

        app.scroll_down(50);
        app.fit_scroll(30);
        assert_eq!(app.chat_scroll, 20);
        assert!(app.follow_tail);
    }
}
