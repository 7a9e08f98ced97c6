//! Tap handling for one reader.
//!
//! A [`SessionContext`] replaces ambient reader state: it owns the current
//! mode, the payload waiting to be written and the write-in-progress flag.
//! It is `Sync`, so reader event handlers on other threads can share it
//! behind an `Arc`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use carecard_ndef::StructuredTagData;
use carecard_tagfile::TagFileReader;
use carecard_transport::TagTransport;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::pipeline::TagPipeline;
use crate::retry::{Delay, ThreadDelay};

/// What a tap does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    #[default]
    Read,
    Write,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Read => f.write_str("READ"),
            Mode::Write => f.write_str("WRITE"),
        }
    }
}

/// Kind of [`TapReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TapStatus {
    /// Tag read and decoded.
    Read,
    /// Pending payload written.
    Success,
    Error,
    /// Write mode, but nothing prepared.
    Waiting,
    /// Another write is still running; this tap was dropped.
    Busy,
    Removed,
}

/// What happened on a tag event, for the application layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TapReport {
    /// Tag UID as uppercase hex, when it could be read.
    pub uid: Option<String>,
    pub mode: Mode,
    pub status: TapStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub records_written: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StructuredTagData>,
    pub reader: String,
}

impl TapReport {
    fn new(mode: Mode, status: TapStatus, reader: &str) -> Self {
        Self {
            uid: None,
            mode,
            status,
            message: None,
            records_written: 0,
            data: None,
            reader: reader.to_string(),
        }
    }

    fn with_uid(mut self, uid: Option<String>) -> Self {
        self.uid = uid;
        self
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Clears the write-in-progress flag when dropped.
struct WriteGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Per-reader session state.
pub struct SessionContext<D = ThreadDelay> {
    pipeline: TagPipeline<D>,
    mode: Mutex<Mode>,
    pending: Mutex<Option<StructuredTagData>>,
    write_in_progress: AtomicBool,
}

impl SessionContext<ThreadDelay> {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_pipeline(TagPipeline::new(config))
    }
}

impl<D: Delay> SessionContext<D> {
    /// A session in read mode with nothing pending.
    pub fn with_pipeline(pipeline: TagPipeline<D>) -> Self {
        Self {
            pipeline,
            mode: Mutex::new(Mode::Read),
            pending: Mutex::new(None),
            write_in_progress: AtomicBool::new(false),
        }
    }

    pub fn pipeline(&self) -> &TagPipeline<D> {
        &self.pipeline
    }

    pub fn mode(&self) -> Mode {
        *self.mode.lock()
    }

    pub fn set_mode(&self, mode: Mode) {
        let previous = std::mem::replace(&mut *self.mode.lock(), mode);
        if previous != mode {
            info!(%mode, "session mode changed");
        }
    }

    /// Queue `data` for the next tap in write mode, replacing anything
    /// already queued.
    pub fn prepare_write(&self, data: StructuredTagData) {
        *self.pending.lock() = Some(data);
        info!("write payload prepared, waiting for tap");
    }

    /// Drop the queued payload. Returns whether one was queued.
    pub fn cancel_write(&self) -> bool {
        let cancelled = self.pending.lock().take().is_some();
        if cancelled {
            info!("pending write cancelled");
        }
        cancelled
    }

    pub fn pending_write(&self) -> Option<StructuredTagData> {
        self.pending.lock().clone()
    }

    pub fn is_write_in_progress(&self) -> bool {
        self.write_in_progress.load(Ordering::Acquire)
    }

    fn try_begin_write(&self) -> Option<WriteGuard<'_>> {
        self.write_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| WriteGuard {
                flag: &self.write_in_progress,
            })
    }

    /// Handle a tag entering the field.
    pub fn handle_tag_present<T: TagTransport + ?Sized>(&self, transport: &mut T) -> TapReport {
        let mode = self.mode();
        let reader = transport.name().to_string();

        let uid = match read_uid(transport, &self.pipeline) {
            Ok(uid) => uid,
            Err(err) => {
                warn!(error = %err, "tag uid unavailable");
                return TapReport::new(mode, TapStatus::Error, &reader)
                    .with_message(err.to_string());
            }
        };
        debug!(%uid, %mode, "tag present");
        let uid = Some(uid);

        match mode {
            Mode::Read => {
                self.pipeline.delay.wait(self.pipeline.config.read_delay);
                match self.pipeline.read(transport) {
                    Ok(data) => {
                        let mut report =
                            TapReport::new(mode, TapStatus::Read, &reader).with_uid(uid);
                        report.data = Some(data);
                        report
                    }
                    Err(err) => TapReport::new(mode, TapStatus::Error, &reader)
                        .with_uid(uid)
                        .with_message(err.to_string()),
                }
            }
            Mode::Write => self.write_pending(transport, uid, &reader),
        }
    }

    fn write_pending<T: TagTransport + ?Sized>(
        &self,
        transport: &mut T,
        uid: Option<String>,
        reader: &str,
    ) -> TapReport {
        let Some(payload) = self.pending_write() else {
            return TapReport::new(Mode::Write, TapStatus::Waiting, reader)
                .with_uid(uid)
                .with_message("No write data prepared. Prepare a write, then tap again.");
        };

        let Some(_guard) = self.try_begin_write() else {
            warn!("write already in progress, tap dropped");
            return TapReport::new(Mode::Write, TapStatus::Busy, reader)
                .with_uid(uid)
                .with_message("A write is already in progress");
        };

        let outcome = self.pipeline.merge_and_write(transport, &payload);
        let status = if outcome.is_success() {
            let mut pending = self.pending.lock();
            // A payload prepared during the write is kept for the next tap.
            if pending.as_ref() == Some(&payload) {
                *pending = None;
            }
            TapStatus::Success
        } else {
            TapStatus::Error
        };

        let mut report = TapReport::new(Mode::Write, status, reader)
            .with_uid(uid)
            .with_message(outcome.message);
        report.records_written = outcome.records_written;
        report
    }

    /// Handle the tag leaving the field.
    pub fn handle_tag_removed(&self) -> TapReport {
        debug!("tag removed");
        TapReport::new(self.mode(), TapStatus::Removed, "")
    }
}

impl<D> fmt::Debug for SessionContext<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("mode", &*self.mode.lock())
            .field("pending", &self.pending.lock().is_some())
            .field(
                "write_in_progress",
                &self.write_in_progress.load(Ordering::Relaxed),
            )
            .finish()
    }
}

fn read_uid<T: TagTransport + ?Sized, D>(
    transport: &mut T,
    pipeline: &TagPipeline<D>,
) -> carecard_tagfile::Result<String> {
    let mut reader = TagFileReader::with_config(transport, pipeline.config.tag_file.clone());
    Ok(hex::encode_upper(reader.read_uid()?))
}
