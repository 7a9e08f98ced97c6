use crate::config::SessionConfig;
use crate::retry::{Delay, ThreadDelay};

/// Read, write and sync operations against one tag transport.
///
/// The pipeline holds configuration and the delay source only; the
/// transport is passed to every call, so one pipeline can serve a reader
/// across many taps. See [`read`](crate::read), [`write`](crate::write) and
/// [`sync`](crate::sync) for the operations.
#[derive(Debug, Clone)]
pub struct TagPipeline<D = ThreadDelay> {
    pub(crate) config: SessionConfig,
    pub(crate) delay: D,
}

impl TagPipeline<ThreadDelay> {
    /// A pipeline that sleeps the calling thread for its delays.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_delay(config, ThreadDelay)
    }
}

impl<D: Delay> TagPipeline<D> {
    /// A pipeline with a custom delay source.
    pub fn with_delay(config: SessionConfig, delay: D) -> Self {
        Self { config, delay }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }
}

impl Default for TagPipeline<ThreadDelay> {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
