pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod webhook;

// Re-export main types for convenience
pub use config::Config;
pub use error::{ConfigError, WebhookError};
pub use session::{ChatSession, TurnState};
pub use state::{Message, Sender, Transcript};
pub use webhook::WebhookClient;
