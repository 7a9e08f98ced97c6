use carecard::ndef::{Policy, StructuredTagData};
use carecard::session::compare;

use crate::cmd::{load_json, DiffArgs};
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::{print_sync_report, OutputFormat};

/// Exits with `FAILURE` when the two sides differ, like `diff(1)`.
pub fn run(args: DiffArgs, format: OutputFormat) -> CliResult<i32> {
    let tag: StructuredTagData = load_json(&args.tag)?;
    let remote: Vec<Policy> = load_json(&args.remote)?;

    let report = compare(&tag.insurance_policies, &remote);
    print_sync_report(&report, format);

    Ok(if report.needs_sync { FAILURE } else { SUCCESS })
}
