use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::batch::BatchOutcome;
use crate::speed::SpeedFactor;

/// An external program could not be launched at all.
#[derive(Debug, Error)]
#[error("unable to start {program:?}: {source}")]
pub struct StartupError {
    pub program: String,
    #[source]
    pub source: io::Error,
}

impl StartupError {
    pub fn for_program(program: &str, source: io::Error) -> Self {
        StartupError {
            program: String::from(program),
            source,
        }
    }
}

/// A step of the speed conversion for one input failed.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("speed x{speed} is out of range for {input:?}")]
    InvalidSpeed { input: PathBuf, speed: SpeedFactor },

    #[error("{step} failed for {input:?} ({})", exit_description(.code))]
    ToolFailed {
        input: PathBuf,
        step: &'static str,
        code: Option<i32>,
    },

    #[error("{input:?} would be overwritten by a scratch file, move or rename it")]
    ScratchCollision { input: PathBuf },

    #[error("error preparing {input:?}: {source}")]
    Io {
        input: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Scratch cleanup failed for a reason other than the file being gone.
#[derive(Debug, Error)]
#[error("unable to remove scratch file {path:?}: {source}")]
pub struct CleanupWarning {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("there are no outputs to merge")]
    NothingToMerge,

    #[error("metadata extraction for the merge failed ({})", exit_description(.code))]
    MetadataFailed { code: Option<i32> },

    #[error("concatenation failed ({})", exit_description(.code))]
    ConcatFailed { code: Option<i32> },

    #[error("unable to write merge manifest: {0}")]
    Manifest(#[source] io::Error),

    #[error(transparent)]
    Startup(#[from] StartupError),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("a batch is already running")]
    AlreadyRunning,

    /// Carries what the batch produced before the launch failure.
    #[error("{source}")]
    Startup {
        #[source]
        source: StartupError,
        outcome: Box<BatchOutcome>,
    },
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid input path {0:?}")]
    InvalidInput(PathBuf),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unable to read catalog {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to parse catalog {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown output format {0:?}")]
    UnknownFormat(String),

    #[error("unknown speed preset {0:?}")]
    UnknownPreset(String),

    #[error("output format {0:?} has an empty command")]
    EmptyCommand(String),

    #[error("invalid speed list {0:?}")]
    InvalidSpeeds(String),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => String::from("terminated by signal"),
    }
}
