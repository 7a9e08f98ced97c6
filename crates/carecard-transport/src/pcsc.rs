use std::ffi::CString;
use std::time::Duration;

use pcsc::{Card, Context, Protocols, ReaderState, Scope, ShareMode, State};
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::TagTransport;

/// Presence of a tag in the reader field, as observed by [`PcscReader::wait_for_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagPresence {
    /// A tag entered (or is in) the field.
    Present,
    /// The field is empty.
    Absent,
    /// Nothing changed before the timeout elapsed.
    Unchanged,
}

/// A PC/SC contactless reader (ACR122U and friends).
pub struct PcscReader {
    context: Context,
    reader: CString,
    name: String,
    card: Option<Card>,
    state: Option<ReaderState>,
}

impl PcscReader {
    /// List the names of all connected PC/SC readers.
    pub fn list_readers() -> Result<Vec<String>> {
        let context = Context::establish(Scope::User).map_err(map_pcsc_error)?;
        let readers = context.list_readers_owned().map_err(map_pcsc_error)?;
        Ok(readers
            .iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    /// Open the first reader whose name contains `name`, or the first reader
    /// when `name` is `None`.
    pub fn open(name: Option<&str>) -> Result<Self> {
        let context = Context::establish(Scope::User).map_err(map_pcsc_error)?;
        let readers = context.list_readers_owned().map_err(map_pcsc_error)?;

        let reader = readers
            .into_iter()
            .find(|candidate| match name {
                Some(wanted) => candidate.to_string_lossy().contains(wanted),
                None => true,
            })
            .ok_or_else(|| TransportError::ReaderNotFound {
                name: name.unwrap_or("<any>").to_string(),
            })?;

        let display = reader.to_string_lossy().into_owned();
        info!(reader = %display, "reader opened");

        Ok(Self {
            context,
            reader,
            name: display,
            card: None,
            state: None,
        })
    }

    /// Connect to the tag currently in the field.
    pub fn connect(&mut self) -> Result<()> {
        let card = self
            .context
            .connect(&self.reader, ShareMode::Shared, Protocols::ANY)
            .map_err(map_pcsc_error)?;
        debug!(reader = %self.name, "tag connected");
        self.card = Some(card);
        Ok(())
    }

    /// Drop the connection to the current tag, if any.
    pub fn disconnect(&mut self) {
        if self.card.take().is_some() {
            debug!(reader = %self.name, "tag disconnected");
        }
    }

    /// Block until the reader state changes or `timeout` elapses.
    pub fn wait_for_change(&mut self, timeout: Duration) -> Result<TagPresence> {
        let state = self
            .state
            .get_or_insert_with(|| ReaderState::new(self.reader.clone(), State::UNAWARE));

        match self
            .context
            .get_status_change(Some(timeout), std::slice::from_mut(state))
        {
            Ok(()) => {}
            Err(pcsc::Error::Timeout) => return Ok(TagPresence::Unchanged),
            Err(err) => return Err(map_pcsc_error(err)),
        }

        let event = state.event_state();
        state.sync_current_state();

        if !event.contains(State::CHANGED) {
            return Ok(TagPresence::Unchanged);
        }
        if event.contains(State::PRESENT) {
            Ok(TagPresence::Present)
        } else {
            self.card = None;
            Ok(TagPresence::Absent)
        }
    }
}

impl TagTransport for PcscReader {
    fn transmit(&mut self, command: &[u8], max_response_len: usize) -> Result<Vec<u8>> {
        if self.card.is_none() {
            self.connect()?;
        }
        let Some(card) = self.card.as_ref() else {
            return Err(TransportError::NoTag);
        };

        let mut buf = vec![0u8; max_response_len.max(2)];
        let response = card.transmit(command, &mut buf).map_err(|err| {
            if matches!(err, pcsc::Error::InsufficientBuffer) {
                TransportError::ResponseTooLong {
                    len: max_response_len + 1,
                    max: max_response_len,
                }
            } else {
                map_pcsc_error(err)
            }
        });

        let response = match response {
            Ok(response) => response.to_vec(),
            Err(err) => {
                if matches!(err, TransportError::NoTag | TransportError::TagLost) {
                    self.card = None;
                }
                return Err(err);
            }
        };

        trace!(
            command = %hex::encode(command),
            response = %hex::encode(&response),
            "pcsc exchange"
        );
        Ok(response)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for PcscReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscReader")
            .field("reader", &self.name)
            .field("connected", &self.card.is_some())
            .finish()
    }
}

fn map_pcsc_error(err: pcsc::Error) -> TransportError {
    match err {
        pcsc::Error::NoSmartcard => TransportError::NoTag,
        pcsc::Error::RemovedCard | pcsc::Error::ResetCard | pcsc::Error::UnpoweredCard => {
            TransportError::TagLost
        }
        pcsc::Error::NoReadersAvailable | pcsc::Error::UnknownReader => {
            TransportError::ReaderNotFound {
                name: err.to_string(),
            }
        }
        other => TransportError::Reader(other.to_string()),
    }
}
