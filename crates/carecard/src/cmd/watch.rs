use carecard::ndef::StructuredTagData;
use carecard::session::{Mode, SessionContext, TapStatus};
use tracing::info;

use crate::cmd::{load_json, parse_duration, WatchArgs};
use crate::device::Device;
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::{print_tap_report, OutputFormat};

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = args.pipeline.session_config();
    config.read_delay = parse_duration(&args.read_delay)?;
    let session = SessionContext::new(config);

    if let Some(path) = &args.write {
        let payload: StructuredTagData = load_json(path)?;
        session.set_mode(Mode::Write);
        session.prepare_write(payload);
    }

    if args.device.image.is_some() {
        return tap_image(&session, &args, format);
    }
    watch_reader(&session, &args, format)
}

/// An image file is a tag that is tapped exactly once.
fn tap_image(session: &SessionContext, args: &WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let mut device = Device::open(&args.device, session.mode() == Mode::Write)?;
    let report = session.handle_tag_present(&mut device);
    if report.status == TapStatus::Success {
        device.save()?;
    }
    print_tap_report(&report, format);
    print_tap_report(&session.handle_tag_removed(), format);

    Ok(match report.status {
        TapStatus::Read | TapStatus::Success => SUCCESS,
        _ => FAILURE,
    })
}

#[cfg(feature = "pcsc")]
fn watch_reader(session: &SessionContext, args: &WatchArgs, format: OutputFormat) -> CliResult<i32> {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use carecard::transport::{PcscReader, TagPresence, TagTransport};

    use crate::exit::transport_error;

    let poll = parse_duration(&args.poll)?;
    let mut reader = PcscReader::open(args.device.reader.as_deref())
        .map_err(|err| transport_error("open reader failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    info!(reader = reader.name(), mode = %session.mode(), "watching for taps");

    let mut taps = 0usize;
    while running.load(Ordering::SeqCst) {
        match reader.wait_for_change(poll) {
            Ok(TagPresence::Present) => {
                let report = session.handle_tag_present(&mut reader);
                print_tap_report(&report, format);
                taps = taps.saturating_add(1);
                if args.count.is_some_and(|count| taps >= count) {
                    break;
                }
            }
            Ok(TagPresence::Absent) => {
                reader.disconnect();
                print_tap_report(&session.handle_tag_removed(), format);
            }
            Ok(TagPresence::Unchanged) => {}
            Err(err) => return Err(transport_error("reader poll failed", err)),
        }
    }

    info!(taps, "watch stopped");
    Ok(SUCCESS)
}

#[cfg(not(feature = "pcsc"))]
fn watch_reader(_session: &SessionContext, _args: &WatchArgs, _format: OutputFormat) -> CliResult<i32> {
    info!("no --image given and no PC/SC support compiled in");
    Err(crate::exit::CliError::new(
        crate::exit::USAGE,
        "watch needs --image or a build with the `pcsc` feature",
    ))
}

#[cfg(feature = "pcsc")]
fn install_ctrlc_handler(running: std::sync::Arc<std::sync::atomic::AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, std::sync::atomic::Ordering::SeqCst);
    })
    .map_err(|err| {
        crate::exit::CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
