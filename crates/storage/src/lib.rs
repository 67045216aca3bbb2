//! Filesystem primitives for reconciling a staging directory.
//!
//! - [`size`]: byte sizes of files and directory trees, and the size-based
//!   archive/graveyard arbitration ([`compare`]).
//! - [`classify`]: partitioning staged names into files, directories and
//!   symlinks.
//! - [`list_staged`]: the staging directory snapshot.
//! - [`backend`]: the [`Filesystem`] trait through which every mutation
//!   (move, delete, unlink) is performed.

pub mod backend;
mod classify;
pub mod error;
mod listing;
mod path;
pub mod size;

pub use crate::backend::{Filesystem, FsHandle, LocalFilesystem, ReadOnlyFilesystem, Role};
pub use crate::classify::{Classification, ObjectKind, classify};
pub use crate::listing::{is_metadata_artifact, list_staged};
pub use crate::path::{base_name, join as join_name, validate as validate_name};
pub use crate::size::{MeasuredKind, SizeAction, SizeComparison, compare};
