//! Picks the tag a command talks to: an image file or a PC/SC reader.

use std::fs;
use std::path::{Path, PathBuf};

use carecard::transport::{MemoryTag, TagTransport, TransportError};
use clap::Args;
use tracing::{debug, info};

use crate::exit::{io_error, CliResult};

#[derive(Args, Debug, Default, Clone)]
pub struct DeviceArgs {
    /// Tag image file standing in for a physical tag (NDEF file contents).
    #[arg(long, value_name = "FILE")]
    pub image: Option<PathBuf>,
    /// PC/SC reader name (substring match). Ignored when --image is set.
    #[arg(long, value_name = "NAME", env = "CARECARD_READER")]
    pub reader: Option<String>,
}

pub enum Device {
    Image { path: PathBuf, tag: MemoryTag },
    #[cfg(feature = "pcsc")]
    Reader(carecard::transport::PcscReader),
}

impl Device {
    /// Open the selected tag. A missing image file is a blank tag when
    /// `create` is set.
    pub fn open(args: &DeviceArgs, create: bool) -> CliResult<Self> {
        if let Some(path) = &args.image {
            return Self::open_image(path, create);
        }
        Self::open_reader(args.reader.as_deref())
    }

    fn open_image(path: &Path, create: bool) -> CliResult<Self> {
        let tag = match fs::read(path) {
            Ok(image) => {
                debug!(path = %path.display(), len = image.len(), "tag image loaded");
                MemoryTag::from_image(image)
            }
            Err(err) if create && err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "starting from a blank tag image");
                MemoryTag::new()
            }
            Err(err) => {
                return Err(io_error(
                    &format!("failed reading {}", path.display()),
                    err,
                ))
            }
        };
        Ok(Device::Image {
            path: path.to_path_buf(),
            tag,
        })
    }

    #[cfg(feature = "pcsc")]
    fn open_reader(name: Option<&str>) -> CliResult<Self> {
        carecard::transport::PcscReader::open(name)
            .map(Device::Reader)
            .map_err(|err| crate::exit::transport_error("open reader failed", err))
    }

    #[cfg(not(feature = "pcsc"))]
    fn open_reader(_name: Option<&str>) -> CliResult<Self> {
        Err(crate::exit::CliError::new(
            crate::exit::USAGE,
            "no --image given and this build has no PC/SC support (feature `pcsc`)",
        ))
    }

    /// Persist an image-backed tag. Trailing zero bytes are not stored.
    pub fn save(&self) -> CliResult<()> {
        match self {
            Device::Image { path, tag } => {
                let image = tag.image();
                let end = image
                    .iter()
                    .rposition(|&byte| byte != 0)
                    .map_or(0, |last| last + 1);
                fs::write(path, &image[..end]).map_err(|err| {
                    io_error(&format!("failed writing {}", path.display()), err)
                })?;
                debug!(path = %path.display(), len = end, "tag image saved");
                Ok(())
            }
            #[cfg(feature = "pcsc")]
            Device::Reader(_) => Ok(()),
        }
    }
}

impl TagTransport for Device {
    fn transmit(
        &mut self,
        command: &[u8],
        max_response_len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        match self {
            Device::Image { tag, .. } => tag.transmit(command, max_response_len),
            #[cfg(feature = "pcsc")]
            Device::Reader(reader) => reader.transmit(command, max_response_len),
        }
    }

    fn name(&self) -> &str {
        match self {
            Device::Image { tag, .. } => tag.name(),
            #[cfg(feature = "pcsc")]
            Device::Reader(reader) => reader.name(),
        }
    }
}
