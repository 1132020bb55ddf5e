#![doc = include_str!("../README.md")]

pub mod backend;
pub mod callback;
pub mod config;
pub mod error;
pub mod navigator;
pub mod session;
pub mod state;
pub mod storage;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
#[cfg(feature = "http")]
pub use backend::HttpBackend;
pub use backend::{AuthBackend, TokenResponse};
pub use callback::{CallbackOutcome, CallbackParams, complete_login};
pub use config::{CallbackFailurePolicy, SessionConfig};
pub use error::{Error, StorageError};
pub use navigator::{Navigator, strip_callback_params};
pub use session::SessionManager;
pub use state::generate_state;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use types::{AccessToken, OAuthState, Profile, Session};
