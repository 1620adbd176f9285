use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::command::{CommandTemplate, Slots};
use crate::error::JobError;
use crate::formats::OutputFormat;
use crate::speed::SpeedFactor;

/// Everything needed to turn one input into its per-speed outputs.
#[derive(Clone, Debug, PartialEq)]
pub struct JobDescriptor {
    input: PathBuf,
    speeds: Vec<SpeedFactor>,
    output_dir: PathBuf,
    format: OutputFormat,
    outputs: Vec<PathBuf>,
    commands: Vec<CommandTemplate>,
}

impl JobDescriptor {
    /// Derive output paths and command templates. Does not touch the
    /// filesystem; `output_dir` is validated by the caller.
    pub fn build(
        input: &Path,
        speeds: &[SpeedFactor],
        output_dir: &Path,
        format: &OutputFormat,
    ) -> Result<Self, JobError> {
        if input.as_os_str().is_empty() {
            return Err(JobError::InvalidInput(input.to_path_buf()));
        }
        let stem = input
            .file_stem()
            .ok_or_else(|| JobError::InvalidInput(input.to_path_buf()))?;

        let outputs: Vec<PathBuf> = speeds
            .iter()
            .map(|speed| {
                let mut name = OsString::from(stem);
                name.push(format!("_x{}{}", speed, format.extension));
                output_dir.join(name)
            })
            .collect();
        let commands = speeds.iter().map(|_| format.template()).collect();

        Ok(JobDescriptor {
            input: input.to_path_buf(),
            speeds: speeds.to_vec(),
            output_dir: output_dir.to_path_buf(),
            format: format.clone(),
            outputs,
            commands,
        })
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn speeds(&self) -> &[SpeedFactor] {
        &self.speeds
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn format(&self) -> &OutputFormat {
        &self.format
    }

    pub fn outputs(&self) -> &[PathBuf] {
        &self.outputs
    }

    pub fn commands(&self) -> &[CommandTemplate] {
        &self.commands
    }

    /// Speed factor, output path and command template for each output, in
    /// speed order.
    pub fn steps(&self) -> impl Iterator<Item = (SpeedFactor, &Path, &CommandTemplate)> {
        self.speeds
            .iter()
            .zip(self.outputs.iter())
            .zip(self.commands.iter())
            .map(|((speed, output), command)| (*speed, output.as_path(), command))
    }

    /// The commands as they would run straight from the input, without the
    /// intermediate speed change.
    pub fn command_lines(&self) -> Vec<Vec<OsString>> {
        self.outputs
            .iter()
            .zip(self.commands.iter())
            .map(|(output, command)| command.render(Slots {
                input: &self.input,
                metadata: None,
                output,
            }))
            .collect()
    }
}

/// Build one job per input, all sharing speeds, output directory and format.
pub fn build_jobs(
    inputs: &[PathBuf],
    speeds: &[SpeedFactor],
    output_dir: &Path,
    format: &OutputFormat,
) -> Result<Vec<JobDescriptor>, JobError> {
    inputs
        .iter()
        .map(|input| JobDescriptor::build(input, speeds, output_dir, format))
        .collect()
}
