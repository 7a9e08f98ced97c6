//! NFC care card engine.
//!
//! carecard stores a person's contact card, emergency contact and insurance
//! policies on an NFC Forum Type 4 tag as a single NDEF message, and guards
//! rewrites with an ownership check against what is already on the tag.
//!
//! # Crate Structure
//!
//! - [`transport`]: command/response channel to a tag (in-memory emulator, PC/SC behind `pcsc`)
//! - [`ndef`]: NDEF record codec and the structured tag data model
//! - [`tagfile`]: APDU builders, chunked NDEF file reads and TLV block writes
//! - [`session`]: read retries, the ownership-gated write, policy sync and per-reader sessions

/// Re-export transport types.
pub mod transport {
    pub use carecard_transport::*;
}

/// Re-export NDEF codec and data model types.
pub mod ndef {
    pub use carecard_ndef::*;
}

/// Re-export tag file access types.
pub mod tagfile {
    pub use carecard_tagfile::*;
}

/// Re-export pipeline and session types.
pub mod session {
    pub use carecard_session::*;
}
