//! One-shot seeding of the analytics tables from a JSON export.
//!
//! The loader runs only against an empty `videos` table and inserts with
//! `ON CONFLICT (id) DO NOTHING`, so re-running it is always safe.

pub mod dates;
pub mod error;
pub mod loader;
pub mod records;

pub use dates::parse_date;
pub use error::IngestError;
pub use loader::{load_dataset, load_file, LoadReport};
pub use records::{Dataset, SnapshotRecord, VideoRecord};
