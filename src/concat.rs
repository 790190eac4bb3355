use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::ConcatenatorConfig;

/// Joins recordings into one video file.
///
/// Success is judged only by whether `output` exists afterwards, so
/// implementations report nothing beyond running to completion.
pub trait Concatenator {
    fn name(&self) -> &str;
    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> bool;
}

/// Runs an external lossless MP4 joiner as
/// `<tool> <inputs...> <output_flag> <output>`, blocking until it exits.
pub struct ExternalConcatenator {
    program: PathBuf,
    output_flag: String,
}

impl ExternalConcatenator {
    pub fn from_config(config: &ConcatenatorConfig) -> Self {
        Self {
            program: config.path.clone(),
            output_flag: config.output_flag.clone(),
        }
    }

    fn command(&self, inputs: &[PathBuf], output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.args(inputs);
        if !self.output_flag.is_empty() {
            command.arg(&self.output_flag);
        }
        command.arg(output).stdin(Stdio::null());
        command
    }
}

impl Concatenator for ExternalConcatenator {
    fn name(&self) -> &str {
        "external"
    }

    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> bool {
        tracing::info!(
            "Merging {} file(s) into {} with {}",
            inputs.len(),
            output.display(),
            self.program.display()
        );

        match self.command(inputs, output).status() {
            Ok(status) if !status.success() => {
                tracing::warn!("{} exited with {}", self.program.display(), status)
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Failed to run {}: {}", self.program.display(), e),
        }

        output.is_file()
    }
}
