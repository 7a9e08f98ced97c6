use std::time::Duration;

use carecard_ndef::vcard::VCARD_MIME_TYPE;
use carecard_tagfile::TagFileConfig;

use crate::retry::RetryPolicy;

/// Base of the derived profile URL; the email local-part is appended.
pub const DEFAULT_VCARD_BASE_URL: &str = "https://vcard.tecgs.com:3000/profile/";

/// Configuration for the write pipeline.
#[derive(Debug, Clone)]
pub struct WriteConfig {
    /// MIME type of the vCard record. Default: `text/vcard`.
    pub vcard_mime_type: String,
    /// Prefix for profile URLs derived from an email address.
    pub vcard_base_url: String,
    /// Pause before the ownership pre-read. Default: 500 ms.
    pub pre_read_delay: Duration,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            vcard_mime_type: VCARD_MIME_TYPE.to_string(),
            vcard_base_url: DEFAULT_VCARD_BASE_URL.to_string(),
            pre_read_delay: Duration::from_millis(500),
        }
    }
}

/// Everything a [`TagPipeline`](crate::TagPipeline) needs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub tag_file: TagFileConfig,
    pub retry: RetryPolicy,
    pub write: WriteConfig,
    /// Pause before reading a tag tapped in read mode. Default: 300 ms.
    pub read_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tag_file: TagFileConfig::default(),
            retry: RetryPolicy::default(),
            write: WriteConfig::default(),
            read_delay: Duration::from_millis(300),
        }
    }
}
