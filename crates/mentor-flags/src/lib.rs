//! Mentor Flags
//!
//! Small named values that survive restarts: tokens, consents, UI
//! preferences, the signed-in role. Unrelated to the query cache and never
//! used to cache fetched data.
//!
//! ```rust,ignore
//! use mentor_flags::{names, FileBackend, FlagStore};
//!
//! let store = FlagStore::new(Arc::new(FileBackend::open("flags.json")?));
//! store.set(names::THEME, "dark");
//! let collapsed: bool = store.get(names::SIDEBAR_COLLAPSED, false);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod backend;
pub mod error;
pub mod names;
pub mod store;
pub mod typed;

pub use backend::{FileBackend, MemoryBackend, StorageBackend, UnavailableBackend};
pub use error::{FlagError, FlagResult};
pub use store::{format_size, FlagStore};
pub use typed::{ConsentRecord, ConsentStatus, Consents, Role};
