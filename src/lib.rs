//! # sstkv
//!
//! A minimal log-structured key-value store with:
//! - Append-only, checksummed segment files (`<id>.sst`)
//! - Size-based segment rollover
//! - An in-memory key → locator index for warm reads
//! - A newest-to-oldest segment scan for keys the index has not seen
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │           put / update / delete / get / list_all            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │ MemoryIndex │          │ SegmentStore │
//!   │  (RwLock)   │          │ (append/read)│
//!   └─────────────┘          └──────┬───────┘
//!                                   │
//!                                   ▼
//!                           ┌──────────────┐
//!                           │ Record Codec │
//!                           │   (CRC32)    │
//!                           └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod index;
pub mod storage;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::Config;
pub use engine::{Engine, ListedRecord};
pub use index::{BTreeIndex, HashIndex, MemoryIndex};
pub use record::Record;
pub use storage::{Locator, SegmentStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of sstkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
