use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};

use log::{error, info, warn};

use crate::error::{BatchError, ConversionError, MergeError, PipelineError, StartupError};
use crate::job::JobDescriptor;
use crate::merge::Merger;
use crate::pipeline::SpeedPipeline;
use crate::runner::CommandRunner;
use crate::scratch::ScratchSpace;
use crate::state::RunControl;
use crate::tools::Tools;

#[derive(Clone, Debug, PartialEq)]
pub enum BatchMessage {
    RunStart { total: usize },
    JobStart { index: usize, input: PathBuf },
    Output(String),
    JobSkipped { index: usize, input: PathBuf },
    JobFailed { index: usize, input: PathBuf, error: String },
    JobEnd { index: usize, input: PathBuf, outputs: Vec<PathBuf> },
    /// Advisory, `position` runs from 0 to `range` (total jobs - 1).
    Progress { position: usize, range: usize },
    MergeStart,
    MergeEnd { merged: Option<PathBuf> },
    Cancelled,
    Idle,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub completed_jobs: usize,
    pub produced: Vec<PathBuf>,
    pub failures: Vec<ConversionError>,
    pub merged: Option<PathBuf>,
    pub merge_error: Option<MergeError>,
    pub cancelled: bool,
}

impl BatchOutcome {
    pub fn success(&self) -> bool {
        !self.cancelled && self.failures.is_empty() && self.merge_error.is_none()
    }
}

/// Drives a list of jobs through the speed pipeline, one external process
/// at a time, and merges the results when asked to.
pub struct BatchProcessor<R: CommandRunner> {
    runner: R,
    tools: Tools,
    scratch: ScratchSpace,
    control: RunControl,
    processed: HashSet<PathBuf>,
    subscribers: Vec<Sender<BatchMessage>>,
}

impl<R: CommandRunner> BatchProcessor<R> {
    pub fn new(runner: R, tools: Tools, scratch: ScratchSpace, control: RunControl) -> Self {
        BatchProcessor {
            runner,
            tools,
            scratch,
            control,
            processed: HashSet::new(),
            subscribers: vec![],
        }
    }

    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn subscribe(&mut self) -> Receiver<BatchMessage> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&self, msg: BatchMessage) {
        publish_to(&self.subscribers, msg);
    }

    /// Run every job in order. Cancellation is honoured between jobs only;
    /// outputs already written stay on disk.
    pub fn run_all(&mut self, jobs: &[JobDescriptor], merge_requested: bool) -> Result<BatchOutcome, BatchError> {
        if !self.control.begin() {
            return Err(BatchError::AlreadyRunning);
        }

        let result = self.process(jobs, merge_requested);

        self.control.finish();
        self.publish(BatchMessage::Idle);
        result
    }

    fn process(&mut self, jobs: &[JobDescriptor], merge_requested: bool) -> Result<BatchOutcome, BatchError> {
        let mut outcome = BatchOutcome::default();
        let range = jobs.len().saturating_sub(1);
        self.processed.clear();

        self.publish(BatchMessage::RunStart { total: jobs.len() });
        self.publish(BatchMessage::Progress { position: 0, range });

        for (index, job) in jobs.iter().enumerate() {
            if self.control.is_cancel_requested() {
                return Ok(self.cancel(outcome, range));
            }

            let input = job.input().to_path_buf();
            if self.processed.insert(input.clone()) {
                self.publish(BatchMessage::JobStart { index, input: input.clone() });

                let subscribers = &self.subscribers;
                let mut observer = |line: &str| publish_to(subscribers, BatchMessage::Output(String::from(line)));
                let converted = SpeedPipeline::new(&mut self.runner, &self.tools, &self.scratch)
                    .convert(job, &mut observer);

                match converted {
                    Ok(outputs) => {
                        outcome.produced.extend(outputs.iter().cloned());
                        self.publish(BatchMessage::JobEnd { index, input, outputs });
                    },
                    Err(PipelineError::Conversion(err)) => {
                        error!("{}", err);
                        self.publish(BatchMessage::JobFailed { index, input, error: err.to_string() });
                        outcome.failures.push(err);
                    },
                    Err(PipelineError::Startup(source)) => {
                        error!("{}", source);
                        return Err(BatchError::Startup { source, outcome: Box::new(outcome) });
                    },
                }
            } else {
                info!("{:?} was already converted in this run", input);
                self.publish(BatchMessage::JobSkipped { index, input });
            }

            outcome.completed_jobs += 1;
            self.publish(BatchMessage::Progress { position: index, range });
        }

        if self.control.is_cancel_requested() {
            return Ok(self.cancel(outcome, range));
        }

        if merge_requested {
            if let Err(source) = self.merge(jobs, &mut outcome) {
                return Err(BatchError::Startup { source, outcome: Box::new(outcome) });
            }
        }

        Ok(outcome)
    }

    fn merge(&mut self, jobs: &[JobDescriptor], outcome: &mut BatchOutcome) -> Result<(), StartupError> {
        let first = match jobs.first() {
            Some(first) => first,
            None => return Ok(()),
        };
        if !outcome.failures.is_empty() {
            warn!("skipping merge, {} job(s) failed", outcome.failures.len());
            return Ok(());
        }
        if outcome.produced.is_empty() {
            info!("skipping merge, no speed was requested");
            return Ok(());
        }

        self.publish(BatchMessage::MergeStart);
        let subscribers = &self.subscribers;
        let mut observer = |line: &str| publish_to(subscribers, BatchMessage::Output(String::from(line)));
        let merged = Merger::new(&mut self.runner, &self.tools, &self.scratch)
            .merge(jobs, first.format(), first.output_dir(), &mut observer);

        match merged {
            Ok(path) => {
                outcome.merged = Some(path.clone());
                self.publish(BatchMessage::MergeEnd { merged: Some(path) });
                Ok(())
            },
            Err(MergeError::Startup(err)) => Err(err),
            Err(err) => {
                error!("{}", err);
                outcome.merge_error = Some(err);
                self.publish(BatchMessage::MergeEnd { merged: None });
                Ok(())
            },
        }
    }

    fn cancel(&self, mut outcome: BatchOutcome, range: usize) -> BatchOutcome {
        warn!("batch cancelled after {} job(s)", outcome.completed_jobs);
        self.publish(BatchMessage::Progress { position: 0, range });
        self.publish(BatchMessage::Cancelled);
        outcome.cancelled = true;
        outcome
    }
}

fn publish_to(subscribers: &[Sender<BatchMessage>], msg: BatchMessage) {
    for tx in subscribers {
        let _ = tx.send(msg.clone());
    }
}
