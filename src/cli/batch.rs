use super::utils::{find_sources, read_source, write_output};
use crate::driver::FactoryDriver;
use crate::error::{Error, Result};
use crate::options::ConvertOptions;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// How one file of a batch ended
#[derive(Debug)]
pub enum Outcome {
    Converted,
    Unsupported(Error),
    Failed(Error),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub converted: usize,
    pub unsupported: usize,
    pub failed: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.converted + self.unsupported + self.failed
    }
}

fn convert_one(driver: &FactoryDriver, path: &Path, check: bool) -> Result<()> {
    let source = read_source(path)?;
    let output = driver.convert(&source)?;
    if !check {
        let target = driver.options().target_path(path)?;
        write_output(&output, Some(&target))?;
    }
    Ok(())
}

/// Run the batch subcommand
pub fn batch(root: &Path, options: ConvertOptions, check: bool) -> Result<Summary> {
    let files = find_sources(root, &options.source_suffix)?;
    let count = files.len();
    eprintln!("Converting {} files...", count);

    let total_start = std::time::Instant::now();
    let progress_bar = indicatif::ProgressBar::new(count as u64);
    progress_bar.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files")
            .map_err(|e| Error::internal(format!("invalid progress template: {}", e)))?
            .progress_chars("##-"),
    );

    let driver = FactoryDriver::new(options);
    let outcomes: Vec<(PathBuf, Outcome)> = files
        .into_par_iter()
        .map(|path| {
            let outcome = match convert_one(&driver, &path, check) {
                Ok(()) => Outcome::Converted,
                Err(e) if e.is_unsupported() => Outcome::Unsupported(e),
                Err(e) => Outcome::Failed(e),
            };
            progress_bar.inc(1);
            (path, outcome)
        })
        .collect();
    progress_bar.finish_and_clear();

    let mut summary = Summary::default();
    for (path, outcome) in &outcomes {
        match outcome {
            Outcome::Converted => summary.converted += 1,
            Outcome::Unsupported(e) => {
                log::info!("{}: {}", path.display(), e);
                summary.unsupported += 1;
            }
            Outcome::Failed(e) => {
                eprintln!("{}: {}", path.display(), e);
                summary.failed += 1;
            }
        }
    }

    eprintln!(
        "Batch completed in {}ms: {} converted, {} unsupported, {} failed",
        total_start.elapsed().as_millis(),
        summary.converted,
        summary.unsupported,
        summary.failed
    );
    Ok(summary)
}
