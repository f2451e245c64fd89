use super::utils::read_source;
use crate::error::{Error, Result};
use crate::partition::partition as partition_source;
use std::path::Path;

/// Run the partition subcommand: dump the token stream and block table
pub fn partition(input_path: &Path) -> Result<()> {
    let source = read_source(input_path)?;
    let result = partition_source(&source)?;

    let json = serde_json::to_string_pretty(&result).map_err(|e| Error::Internal {
        message: format!("Failed to serialize partition to JSON: {}", e),
    })?;
    println!("{}", json);
    Ok(())
}
