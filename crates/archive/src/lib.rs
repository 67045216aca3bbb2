//! Archive scrubbing for staged directories.
//!
//! A completed download frequently contains both a `.rar` archive and the
//! media file already unpacked from it. Only the archive is worth keeping, so
//! before a directory is moved the [`Scrubber`]:
//!
//! 1. finds the archive (first volume of a multi-volume set),
//! 2. lists its members with an external tool ([`ExternalLister`], 7-Zip by
//!    default) under a timeout,
//! 3. parses the listing and checks which members sit extracted on disk
//!    ([`Members`]),
//! 4. deletes the extracted copy when exactly one is present.
//!
//! The outcome is a [`ScrubReport`]; [`ScrubStatus::should_continue`] tells
//! the caller whether the directory may be moved afterwards.

pub mod error;
mod lister;
mod members;
mod scrub;

pub use crate::lister::{ArchiveLister, DEFAULT_ARGS, DEFAULT_TIMEOUT, ExternalLister, ListerHandle};
pub use crate::members::{Members, classify_members, has_extension, parse_listing};
pub use crate::scrub::{DEFAULT_EXTENSION, ScrubReport, ScrubStatus, Scrubber};
