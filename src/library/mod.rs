//! Library service and its collaborators.
//!
//! The service owns the cached collection and is the only writer to the
//! store. Around it sit the advisory upload tracker, the pure browse
//! queries, and the playback save gate.
//!
//! # Data flow
//!
//! ```text
//! raw bytes → probe → record builder → store (one transaction)
//!                                        ↓
//!                              service reloads collection + stats
//! ```

pub mod playback;
pub mod progress;
pub mod query;
pub mod service;

pub use playback::SaveGate;
pub use progress::UploadTracker;
pub use query::{Filter, SortKey};
pub use service::LibraryService;
