use carecard::ndef::StructuredTagData;
use carecard::session::TagPipeline;

use crate::cmd::{load_json, WriteArgs};
use crate::device::Device;
use crate::exit::{write_status_code, CliResult};
use crate::output::{print_write_outcome, OutputFormat};

pub fn run(args: WriteArgs, format: OutputFormat) -> CliResult<i32> {
    let payload: StructuredTagData = load_json(&args.payload)?;
    let mut device = Device::open(&args.device, true)?;
    let pipeline = TagPipeline::new(args.pipeline.session_config());

    let outcome = pipeline.merge_and_write(&mut device, &payload);
    if outcome.is_success() {
        device.save()?;
    }

    print_write_outcome(&outcome, format);
    Ok(write_status_code(outcome.status))
}
