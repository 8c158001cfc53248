pub mod ai;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod palette;
pub mod state;
pub mod typing;

// Re-export main types for convenience
pub use ai::{GeminiClient, Unconfigured};
pub use config::Config;
pub use controller::{ChatController, ChatEvent, Phase, SubmitOutcome};
pub use error::{ConfigError, FetchError};
pub use fetcher::{GenerativeModel, PromptTemplate, ResponseFetcher};
pub use palette::{AccentColor, ColorPicker, Swatch, PALETTE};
pub use state::{ChatEntry, ChatSession, Origin};
pub use typing::{TypingAnimator, TypingStep};
