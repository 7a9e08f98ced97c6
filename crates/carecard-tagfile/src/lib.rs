//! NFC Forum Type 4 tag file access.
//!
//! The NDEF message lives in an elementary file inside the NDEF application.
//! Reaching it takes a fixed choreography of APDUs:
//! - SELECT the NDEF application by AID
//! - SELECT and READ the capability container (`E103`)
//! - SELECT the NDEF file (`E104`)
//! - READ BINARY the 2-byte length, then the message in small chunks
//!
//! Writes wrap the message in a TLV frame and push it out in 4-byte
//! UPDATE BINARY blocks, one command at a time.

pub mod apdu;
pub mod config;
pub mod error;
pub mod reader;
pub mod tlv;
pub mod writer;

pub use apdu::{Response, StatusWord};
pub use config::{TagFileConfig, DEFAULT_MAX_NDEF_LEN, DEFAULT_READ_CHUNK_SIZE, DEFAULT_WRITE_BLOCK_SIZE};
pub use error::{Result, TagFileError};
pub use reader::TagFileReader;
pub use writer::{TagFileWriter, WriteSummary};
