//! Alert-state persistence for AirAlert.
//!
//! The alert state machine keeps exactly one small snapshot on disk so that a
//! restart does not forget an alert episode in progress. This crate owns that
//! file.
//!
//! # Example
//!
//! ```no_run
//! use airalert_store::StateStore;
//!
//! let store = StateStore::open("/srv/air-alert-statefile.json")?;
//! let mut state = store.load()?;
//! state.was_high = true;
//! store.save(&state)?;
//! # Ok::<(), airalert_store::Error>(())
//! ```

mod error;
mod store;

pub use error::{Error, Result};
pub use store::StateStore;

/// Default state file path following platform conventions.
///
/// - Linux: `~/.local/share/airalert/state.json`
/// - macOS: `~/Library/Application Support/airalert/state.json`
/// - Windows: `C:\Users\<user>\AppData\Local\airalert\state.json`
pub fn default_state_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("airalert")
        .join("state.json")
}
