pub mod batch;
pub mod catalog;
pub mod command;
pub mod error;
pub mod formats;
pub mod fstools;
pub mod job;
pub mod merge;
pub mod pipeline;
pub mod presets;
pub mod progress;
pub mod runner;
pub mod scratch;
pub mod speed;
pub mod state;
pub mod tools;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use human_repr::HumanCount;
use log::{info, warn};
use rustop::opts;

use batch::{BatchOutcome, BatchProcessor};
use catalog::Catalog;
use error::BatchError;
use command::display_argv;
use fstools::{classify_file, file_size, DirEntryCategory};
use job::{build_jobs, JobDescriptor};
use runner::SystemRunner;
use scratch::ScratchSpace;
use state::RunControl;
use tools::Tools;

const EXIT_CANCELLED: u8 = 130;

fn main() -> ExitCode {
    env_logger::init();

    let (args, _rest) = opts! {
        synopsis "Make speed-changed copies of audio files, optionally merged into one file.";
        opt format:String=String::from("alac"), desc:"Output format name (see --list).";
        opt preset:String=String::from("2,3,4"), desc:"Speed preset (see --list).";
        opt speeds:Option<String>, desc:"Comma separated speeds, overrides --preset.";
        opt output:String=String::from("."), desc:"Output directory. Must exist.";
        opt no_merge:bool=false, desc:"Keep the per-speed files instead of merging them.";
        opt dry_run:bool=false, desc:"Describe what would be done, but don't actually do anything.";
        opt list:bool=false, desc:"List output formats and speed presets.";
        opt catalog:Option<String>, desc:"JSON file with output formats and/or speed presets.";
        opt transcoder:String=String::from("ffmpeg"), desc:"Path to ffmpeg.";
        opt rate_tool:String=String::from("sonic"), desc:"Path to the speed changer (sonic).";
        opt work_dir:String=String::from("."), desc:"Directory for scratch files.";
        opt verbose:bool=false, desc:"Show the output of ffmpeg and sonic.";
        param inputs:Vec<String>, desc:"Input audio files";
    }.parse_or_exit();

    let catalog = match &args.catalog {
        Some(path) => match Catalog::from_file(Path::new(path)) {
            Ok(catalog) => catalog,
            Err(err) => {
                println!("{}", err);
                return ExitCode::FAILURE;
            },
        },
        None => Catalog::default(),
    };

    if args.list {
        print!("{}", catalog.describe());
        return ExitCode::SUCCESS;
    }

    let tools = Tools::new(&args.transcoder, &args.rate_tool);
    let options = RunOptions {
        format: args.format,
        preset: args.preset,
        speeds: args.speeds,
        output_dir: PathBuf::from(&args.output),
        scratch_dir: PathBuf::from(&args.work_dir),
        inputs: args.inputs.iter().map(PathBuf::from).collect(),
        merge: !args.no_merge,
        dry_run: args.dry_run,
        verbose: args.verbose,
    };

    match run(&catalog, tools, &options) {
        Ok(code) => code,
        Err(err) => {
            println!("Failure -__-\n{}", err);
            ExitCode::FAILURE
        },
    }
}

struct RunOptions {
    format: String,
    preset: String,
    speeds: Option<String>,
    output_dir: PathBuf,
    scratch_dir: PathBuf,
    inputs: Vec<PathBuf>,
    merge: bool,
    dry_run: bool,
    verbose: bool,
}

fn run(catalog: &Catalog, tools: Tools, options: &RunOptions) -> Result<ExitCode, Box<dyn Error>> {
    if options.inputs.is_empty() {
        return Err("no input files given".into());
    }
    let scratch = ScratchSpace::new(&options.scratch_dir);
    for input in &options.inputs {
        match classify_file(input) {
            DirEntryCategory::RegularFile if scratch.owns(input) => {
                return Err(format!("{:?} is in the way of a scratch file, move or rename it.", input).into())
            },
            DirEntryCategory::RegularFile => (),
            DirEntryCategory::DoesNotExist => return Err(format!("{:?} does not exist.", input).into()),
            DirEntryCategory::Directory => return Err(format!("{:?} is a directory.", input).into()),
            DirEntryCategory::Unknown => return Err(format!("Unable to classify {:?}.", input).into()),
        }
    }
    if classify_file(&options.output_dir) != DirEntryCategory::Directory {
        return Err(format!("output directory {:?} does not exist.", options.output_dir).into());
    }
    if classify_file(&options.scratch_dir) != DirEntryCategory::Directory {
        return Err(format!("scratch directory {:?} does not exist.", options.scratch_dir).into());
    }

    let format = catalog.format(&options.format)?.clone().with_program(&tools.ffmpeg);
    let speeds = catalog.speeds(&options.preset, options.speeds.as_deref())?;
    let jobs = build_jobs(&options.inputs, &speeds, &options.output_dir, &format)?;

    if options.dry_run {
        describe_jobs(&jobs, options.merge);
        return Ok(ExitCode::SUCCESS);
    }

    if !tools.ffmpeg_installed() {
        return Err(format!("ffmpeg is not installed ({}).", tools.ffmpeg).into());
    }

    let control = RunControl::new();
    watch_signals(control.clone())?;

    let mut processor = BatchProcessor::new(SystemRunner::new(), tools, scratch, control);
    let messages = processor.subscribe();
    let verbose = options.verbose;
    let display = thread::spawn(move || progress::show_progress(messages, verbose));

    info!("{} job(s), {} speed(s) each, format {}", jobs.len(), speeds.len(), format);
    let result = processor.run_all(&jobs, options.merge);

    // closes the message channel
    drop(processor);
    let _ = display.join();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(BatchError::Startup { source, outcome }) => {
            report(&outcome);
            return Err(source.into());
        },
        Err(err) => return Err(err.into()),
    };
    report(&outcome);

    if outcome.cancelled {
        Ok(ExitCode::from(EXIT_CANCELLED))
    } else if outcome.success() {
        println!("Success! ^__^");
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn describe_jobs(jobs: &[JobDescriptor], merge: bool) {
    for job in jobs {
        println!("{}", job.input().display());
        for (output, line) in job.outputs().iter().zip(job.command_lines()) {
            println!("  {}", output.display());
            println!("    {}", display_argv(&line));
        }
    }
    if merge {
        if let Some(first) = jobs.first() {
            let merged = first.output_dir().join(merge::merged_file_name(first, first.format()));
            println!("merged into {}", merged.display());
        }
    }
}

fn report(outcome: &BatchOutcome) {
    for err in &outcome.failures {
        println!("{}", err);
    }
    if let Some(err) = &outcome.merge_error {
        println!("merge failed: {}", err);
    }
    match &outcome.merged {
        Some(merged) => println!("{} ({})", merged.display(), file_size(merged).human_count_bytes()),
        None => {
            for path in &outcome.produced {
                println!("{} ({})", path.display(), file_size(path).human_count_bytes());
            }
        },
    }
}

/// The first signal stops the batch after the current file. A second one
/// exits straight away.
#[cfg(unix)]
fn watch_signals(control: RunControl) -> Result<(), Box<dyn Error>> {
    use signal_hook::consts::{SIGINT, SIGTERM};

    watch(control, &[SIGINT, SIGTERM])
}

#[cfg(unix)]
fn watch(control: RunControl, signals: &[std::os::raw::c_int]) -> Result<(), Box<dyn Error>> {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use signal_hook::flag;
    use signal_hook::iterator::Signals;

    let caught = Arc::new(AtomicBool::new(false));
    for &signal in signals {
        flag::register_conditional_shutdown(signal, i32::from(EXIT_CANCELLED), Arc::clone(&caught))?;
        flag::register(signal, Arc::clone(&caught))?;
    }

    let mut signals = Signals::new(signals)?;
    thread::spawn(move || {
        for signal in signals.forever() {
            warn!("caught signal {}, stopping after the current file (again to quit now)", signal);
            control.request_cancel();
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn watch_signals(control: RunControl) -> Result<(), Box<dyn Error>> {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use signal_hook::consts::SIGINT;
    use signal_hook::flag;

    let armed = Arc::new(AtomicBool::new(false));
    let caught = Arc::new(AtomicBool::new(false));
    flag::register_conditional_shutdown(SIGINT, i32::from(EXIT_CANCELLED), Arc::clone(&armed))?;
    flag::register(SIGINT, Arc::clone(&armed))?;
    flag::register(SIGINT, Arc::clone(&caught))?;
    thread::spawn(move || loop {
        if caught.swap(false, Ordering::Relaxed) {
            warn!("caught interrupt, stopping after the current file (again to quit now)");
            control.request_cancel();
        }
        thread::sleep(Duration::from_millis(200));
    });
    Ok(())
}
