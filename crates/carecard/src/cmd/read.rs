use carecard::session::TagPipeline;
use tracing::info;

use crate::cmd::ReadArgs;
use crate::device::Device;
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_tag_data, OutputFormat};

pub fn run(args: ReadArgs, format: OutputFormat) -> CliResult<i32> {
    let mut device = Device::open(&args.device, false)?;
    let pipeline = TagPipeline::new(args.pipeline.session_config());

    let data = pipeline
        .read(&mut device)
        .map_err(|err| session_error("read failed", err))?;
    info!(
        policies = data.insurance_policies.len(),
        empty = data.is_empty(),
        "tag read"
    );

    print_tag_data(&data, format);
    Ok(SUCCESS)
}
