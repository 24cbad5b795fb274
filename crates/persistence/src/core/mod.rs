//! Core record-file engine.
//!
//! - [`FixedRecord`] - the contract every fixed-width entity implements
//! - [`RecordMeta`] - engine-owned ID, soft-delete flag and timestamps
//! - [`RecordFile`] - header + slot I/O for one entity file
//! - [`Repository`] - ID-based CRUD with soft delete on top of a [`RecordFile`]
//!
//! # Layering
//!
//! ```text
//! Repository<T>        add / find / update / soft delete by ID
//!     └── RecordFile<T>    header, offsets, append, overwrite, scan
//!             └── FixedRecord  encode / decode one slot
//! ```
//!
//! Every operation opens the file it needs and closes it before returning. There is
//! no persistent handle and no record cache.

pub mod record;
pub mod record_file;
pub mod repository;

pub use record::{FixedRecord, RecordMeta};
pub use record_file::{RecordFile, Records};
pub use repository::Repository;
