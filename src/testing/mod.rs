//! In-memory collaborators for tests
//!
//! - [`MemorySheet`]: a [`SheetBackend`](crate::storage::SheetBackend) over a
//!   `Vec` of rows, with a switch that makes every call fail
//! - [`RecordingTransport`]: a [`ChatTransport`](crate::flow::ChatTransport)
//!   that records outgoing messages
//!
//! ```rust
//! use std::sync::Arc;
//! use walletlist::testing::MemorySheet;
//!
//! let primary = Arc::new(MemorySheet::new());
//! primary.set_failing(true);
//! assert!(primary.rows().is_empty());
//! ```

pub mod memory_sheet;
pub mod recorder;

pub use memory_sheet::MemorySheet;
pub use recorder::{RecordingTransport, SentMessage};
