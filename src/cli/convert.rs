use super::utils::{read_source, write_output};
use crate::driver::FactoryDriver;
use crate::error::{Error, Result};
use crate::options::ConvertOptions;
use std::path::Path;

/// Run the convert subcommand
pub fn convert(input_path: &Path, options: ConvertOptions, to_stdout: bool) -> Result<()> {
    if !options.is_source(input_path) {
        return Err(Error::InvalidInput {
            message: format!(
                "{} is not a '{}' file",
                input_path.display(),
                options.source_suffix
            ),
        });
    }
    let target = options.target_path(input_path)?;
    let source = read_source(input_path)?;

    let output = FactoryDriver::new(options).convert(&source)?;

    if to_stdout {
        write_output(&output, None)
    } else {
        write_output(&output, Some(&target))?;
        log::info!("Wrote {}", target.display());
        Ok(())
    }
}
