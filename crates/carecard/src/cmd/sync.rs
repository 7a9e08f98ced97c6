use carecard::ndef::Policy;
use carecard::session::TagPipeline;

use crate::cmd::{load_json, SyncArgs};
use crate::device::Device;
use crate::exit::{session_error, write_status_code, CliResult};
use crate::output::{print_sync_outcome, OutputFormat};

pub fn run(args: SyncArgs, format: OutputFormat) -> CliResult<i32> {
    let remote: Vec<Policy> = load_json(&args.remote)?;
    let mut device = Device::open(&args.device, false)?;
    let pipeline = TagPipeline::new(args.pipeline.session_config());

    let outcome = pipeline
        .sync_remote_to_tag(&mut device, &remote)
        .map_err(|err| session_error("sync failed", err))?;
    if outcome.write.is_success() {
        device.save()?;
    }

    print_sync_outcome(&outcome, format);
    Ok(write_status_code(outcome.write.status))
}
