use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_readers, OutputFormat};

#[cfg(feature = "pcsc")]
pub fn run(format: OutputFormat) -> CliResult<i32> {
    let readers = carecard::transport::PcscReader::list_readers()
        .map_err(|err| crate::exit::transport_error("listing readers failed", err))?;
    print_readers(&readers, format);
    Ok(SUCCESS)
}

#[cfg(not(feature = "pcsc"))]
pub fn run(format: OutputFormat) -> CliResult<i32> {
    tracing::warn!("built without PC/SC support, no readers available");
    print_readers(&[], format);
    Ok(SUCCESS)
}
