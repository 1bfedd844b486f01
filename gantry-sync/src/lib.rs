//! # gantry-sync
//!
//! Dataset version control against a server-held commit log and versioned
//! object storage.
//!
//! Open a [`GantryDataset`] and call [`GantryDataset::pull`],
//! [`GantryDataset::push_version`], [`GantryDataset::rollback`],
//! [`GantryDataset::stash`] or [`GantryDataset::restore`].

pub mod checksum;
pub mod commit;
pub mod dataset;
pub mod diff;
pub mod error;
pub mod manifest;
pub mod remote;
pub mod stash;
pub mod transfer;
pub mod workspace;

pub use dataset::GantryDataset;
pub use error::{Direction, RemoteError, SyncError};
pub use remote::{CommitLog, HttpApi, MemoryRemote, ObjectStore};
