use carecard::ndef::{decode, decode_records};
use carecard::tagfile::tlv;
use tracing::debug;

use crate::cmd::{read_input, DecodeArgs, Layout};
use crate::exit::{tagfile_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_decoded, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = read_input(&args.input)?;
    let bytes = from_hex_or_binary(raw)?;

    let layout = match args.layout {
        Layout::Auto => detect_layout(&bytes),
        other => other,
    };
    debug!(?layout, len = bytes.len(), "decoding");

    let message = extract_message(&bytes, layout)?;
    let records = decode_records(message);
    let data = decode(message);

    print_decoded(&records, &data, format);
    Ok(SUCCESS)
}

/// Text made only of hex digits and whitespace is hex; anything else is binary.
fn from_hex_or_binary(raw: Vec<u8>) -> CliResult<Vec<u8>> {
    let is_hex_text = !raw.is_empty()
        && raw
            .iter()
            .all(|byte| byte.is_ascii_hexdigit() || byte.is_ascii_whitespace());
    if !is_hex_text {
        return Ok(raw);
    }

    let digits: String = raw
        .iter()
        .filter(|byte| !byte.is_ascii_whitespace())
        .map(|&byte| byte as char)
        .collect();
    hex::decode(&digits).map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex input: {err}")))
}

fn detect_layout(bytes: &[u8]) -> Layout {
    if tlv::looks_like_tlv(bytes) {
        return Layout::Tlv;
    }
    match bytes {
        [hi, lo, rest @ ..] => {
            let len = u16::from_be_bytes([*hi, *lo]) as usize;
            if len > 0 && len <= rest.len() {
                Layout::File
            } else {
                Layout::Message
            }
        }
        _ => Layout::Message,
    }
}

fn extract_message(bytes: &[u8], layout: Layout) -> CliResult<&[u8]> {
    match layout {
        Layout::Tlv => tlv::unwrap(bytes).map_err(|err| tagfile_error("decode failed", err)),
        Layout::File => {
            let Some((len, rest)) = bytes.split_first_chunk::<2>() else {
                return Err(CliError::new(DATA_INVALID, "tag image shorter than its length field"));
            };
            let len = u16::from_be_bytes(*len) as usize;
            Ok(&rest[..len.min(rest.len())])
        }
        Layout::Message | Layout::Auto => Ok(bytes),
    }
}
