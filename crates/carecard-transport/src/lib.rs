//! Command/response transport abstraction for contactless tag readers.
//!
//! Provides a unified interface over the ways an APDU can reach a tag:
//! - An in-memory NFC Forum Type 4 tag emulator (tests, tag image files)
//! - PC/SC readers (behind the `pcsc` feature)
//!
//! This is the lowest layer of carecard. Everything else builds on top of
//! the [`TagTransport`] trait provided here.

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "pcsc")]
pub mod pcsc;

pub use error::{Result, TransportError};
pub use memory::MemoryTag;
pub use traits::TagTransport;

#[cfg(feature = "pcsc")]
pub use self::pcsc::{PcscReader, TagPresence};
