use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::command::Slots;
use crate::error::{ConversionError, PipelineError};
use crate::job::JobDescriptor;
use crate::runner::CommandRunner;
use crate::scratch::ScratchSpace;
use crate::tools::Tools;

/// Turns one input into its per-speed outputs:
/// normalize to WAV, dump metadata, then speed-change and transcode once per
/// speed factor, in order.
pub struct SpeedPipeline<'a> {
    runner: &'a mut dyn CommandRunner,
    tools: &'a Tools,
    scratch: &'a ScratchSpace,
}

impl<'a> SpeedPipeline<'a> {
    pub fn new(runner: &'a mut dyn CommandRunner, tools: &'a Tools, scratch: &'a ScratchSpace) -> Self {
        SpeedPipeline { runner, tools, scratch }
    }

    pub fn convert(
        &mut self,
        job: &JobDescriptor,
        observer: &mut dyn FnMut(&str),
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let input = job.input();
        if job.speeds().is_empty() {
            debug!("no speeds requested for {:?}", input);
            return Ok(vec![]);
        }
        if self.scratch.owns(input) {
            return Err(ConversionError::ScratchCollision { input: input.to_path_buf() }.into());
        }

        let audio = self.scratch.audio();
        let speed_audio = self.scratch.speed_audio();
        let metadata = self.scratch.metadata();
        let _guard = self.scratch.guard(vec![audio.clone(), speed_audio.clone(), metadata.clone()]);

        info!("converting {:?} at {} speed(s)", input, job.speeds().len());
        self.normalize(input, &audio, observer)?;
        self.run_step(input, "metadata extraction", observer, ffmpeg_metadata_args(&self.tools.ffmpeg, input, &metadata))?;

        let mut produced = vec![];
        for (speed, output, command) in job.steps() {
            if !speed.is_valid() {
                return Err(ConversionError::InvalidSpeed { input: input.to_path_buf(), speed }.into());
            }

            let sonic_args = vec![
                OsString::from(&self.tools.sonic),
                OsString::from("-q"),
                OsString::from("-s"),
                OsString::from(speed.tool_arg()),
                audio.clone().into_os_string(),
                speed_audio.clone().into_os_string(),
            ];
            self.run_step(input, "speed change", observer, sonic_args)?;

            let transcode_args = command.render(Slots {
                input: &speed_audio,
                metadata: Some(&metadata),
                output,
            });
            self.run_step(input, "transcode", observer, transcode_args)?;

            debug!("wrote {:?}", output);
            produced.push(output.to_path_buf());
        }

        Ok(produced)
    }

    fn normalize(&mut self, input: &Path, audio: &Path, observer: &mut dyn FnMut(&str)) -> Result<(), PipelineError> {
        if is_wav(input) {
            fs::copy(input, audio).map_err(|source| ConversionError::Io {
                input: input.to_path_buf(),
                source,
            })?;
            Ok(())
        } else {
            let args = vec![
                OsString::from(&self.tools.ffmpeg),
                OsString::from("-y"),
                OsString::from("-i"),
                input.as_os_str().to_owned(),
                audio.as_os_str().to_owned(),
            ];
            self.run_step(input, "normalization", observer, args)
        }
    }

    fn run_step(
        &mut self,
        input: &Path,
        step: &'static str,
        observer: &mut dyn FnMut(&str),
        argv: Vec<OsString>,
    ) -> Result<(), PipelineError> {
        let outcome = self.runner.run(&argv, observer)?;
        if outcome.success() {
            Ok(())
        } else {
            warn!("{} failed for {:?} with {:?}", step, input, outcome.code);
            Err(ConversionError::ToolFailed {
                input: input.to_path_buf(),
                step,
                code: outcome.code,
            }.into())
        }
    }
}

/// `<ffmpeg> -y -i <input> -f ffmetadata <metadata>`
pub fn ffmpeg_metadata_args(ffmpeg: &str, input: &Path, metadata: &Path) -> Vec<OsString> {
    vec![
        OsString::from(ffmpeg),
        OsString::from("-y"),
        OsString::from("-i"),
        input.as_os_str().to_owned(),
        OsString::from("-f"),
        OsString::from("ffmetadata"),
        metadata.as_os_str().to_owned(),
    ]
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StartupError;
    use crate::formats::builtin_formats;
    use crate::runner::tests::RecordingRunner;
    use crate::speed::SpeedFactor;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        input_dir: PathBuf,
        output_dir: PathBuf,
        scratch: ScratchSpace,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let input_dir = dir.path().join("in");
        let output_dir = dir.path().join("out");
        let scratch_dir = dir.path().join("scratch");
        for d in [&input_dir, &output_dir, &scratch_dir] {
            fs::create_dir(d).unwrap();
        }
        Fixture { scratch: ScratchSpace::new(&scratch_dir), _dir: dir, input_dir, output_dir }
    }

    fn job(f: &Fixture, name: &str, speeds: &[f64]) -> JobDescriptor {
        let input = f.input_dir.join(name);
        fs::write(&input, b"RIFF").unwrap();
        let speeds: Vec<SpeedFactor> = speeds.iter().map(|s| SpeedFactor::new(*s)).collect();
        let wav = builtin_formats().into_iter().find(|f| f.name == "wav").unwrap();
        JobDescriptor::build(&input, &speeds, &f.output_dir, &wav).unwrap()
    }

    fn assert_scratch_empty(f: &Fixture) {
        assert_eq!(fs::read_dir(f.scratch.dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_wav_input_is_copied_not_transcoded() {
        let f = fixture();
        let job = job(&f, "speech.wav", &[2.0, 3.0]);
        let mut runner = RecordingRunner::new();
        let tools = Tools::default();

        let outputs = SpeedPipeline::new(&mut runner, &tools, &f.scratch)
            .convert(&job, &mut |_| ())
            .unwrap();

        assert_eq!(outputs, job.outputs());
        assert!(outputs.iter().all(|o| o.exists()));

        // metadata, then sonic + ffmpeg per speed
        assert_eq!(runner.calls.len(), 5);
        assert_eq!(runner.calls[0][5], "ffmetadata");
        assert_eq!(runner.calls[0][3], job.input().to_string_lossy());
        assert_scratch_empty(&f);
    }

    #[test]
    fn test_other_inputs_are_normalized() {
        let f = fixture();
        let job = job(&f, "speech.MP3", &[2.0]);
        let mut runner = RecordingRunner::new();
        let tools = Tools::default();

        SpeedPipeline::new(&mut runner, &tools, &f.scratch)
            .convert(&job, &mut |_| ())
            .unwrap();

        let normalize = &runner.calls[0];
        assert_eq!(normalize[0], "ffmpeg");
        assert_eq!(normalize.last().unwrap(), &f.scratch.audio().to_string_lossy());
        assert_eq!(runner.calls.len(), 4);
    }

    #[test]
    fn test_speed_and_transcode_arguments() {
        let f = fixture();
        let job = job(&f, "speech.wav", &[0.25, 2.0]);
        let mut runner = RecordingRunner::new();
        let tools = Tools::default();

        SpeedPipeline::new(&mut runner, &tools, &f.scratch)
            .convert(&job, &mut |_| ())
            .unwrap();

        let sonic = runner.calls_to("sonic");
        assert_eq!(sonic.len(), 2);
        assert_eq!(sonic[0][1..4], ["-q", "-s", "0.25"]);
        assert_eq!(sonic[1][3], "2.00");
        assert_eq!(sonic[0][4], f.scratch.audio().to_string_lossy());
        assert_eq!(sonic[0][5], f.scratch.speed_audio().to_string_lossy());

        let transcode = &runner.calls[2];
        assert_eq!(transcode[1], "-i");
        assert_eq!(transcode[2], f.scratch.speed_audio().to_string_lossy());
        assert_eq!(transcode[3], "-i");
        assert_eq!(transcode[4], f.scratch.metadata().to_string_lossy());
        assert_eq!(transcode[5..7], ["-map_metadata", "1"]);
        assert_eq!(transcode.last().unwrap(), &job.outputs()[0].to_string_lossy());
    }

    #[test]
    fn test_output_is_streamed_to_observer() {
        let f = fixture();
        let job = job(&f, "speech.wav", &[2.0]);
        let mut runner = RecordingRunner::new();
        let tools = Tools::default();
        let mut lines = vec![];

        SpeedPipeline::new(&mut runner, &tools, &f.scratch)
            .convert(&job, &mut |l| lines.push(String::from(l)))
            .unwrap();

        assert_eq!(lines, vec!["ffmpeg called", "sonic called", "ffmpeg called"]);
    }

    #[test]
    fn test_invalid_speed_keeps_earlier_outputs() {
        let f = fixture();
        let job = job(&f, "speech.wav", &[2.0, 0.0, 3.0]);
        let mut runner = RecordingRunner::new();
        let tools = Tools::default();

        let err = SpeedPipeline::new(&mut runner, &tools, &f.scratch)
            .convert(&job, &mut |_| ())
            .unwrap_err();

        match err {
            PipelineError::Conversion(ConversionError::InvalidSpeed { input, speed }) => {
                assert_eq!(input, job.input());
                assert_eq!(speed, SpeedFactor::new(0.0));
            },
            other => panic!("unexpected error {other:?}"),
        }
        assert!(job.outputs()[0].exists());
        assert!(!job.outputs()[2].exists());
        assert!(runner.calls_to("sonic").len() == 1);
        assert_scratch_empty(&f);
    }

    #[test]
    fn test_failed_step_is_fatal_and_cleans_up() {
        let f = fixture();
        let job = job(&f, "speech.wav", &[2.0, 3.0]);
        // 0: metadata, 1: sonic, 2: transcode x2
        let mut runner = RecordingRunner::failing_at(2, 1);
        let tools = Tools::default();

        let err = SpeedPipeline::new(&mut runner, &tools, &f.scratch)
            .convert(&job, &mut |_| ())
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Conversion(ConversionError::ToolFailed { step: "transcode", code: Some(1), .. })
        ));
        assert_eq!(runner.calls.len(), 3);
        assert_scratch_empty(&f);
    }

    #[test]
    fn test_missing_sonic_is_startup_error() {
        let f = fixture();
        let job = job(&f, "speech.wav", &[2.0]);
        let mut runner = RecordingRunner::new();
        runner.missing.push(String::from("sonic"));
        let tools = Tools::default();

        let err = SpeedPipeline::new(&mut runner, &tools, &f.scratch)
            .convert(&job, &mut |_| ())
            .unwrap_err();

        assert!(matches!(err, PipelineError::Startup(StartupError { .. })));
        assert_scratch_empty(&f);
    }

    #[test]
    fn test_input_in_place_of_scratch_file_is_left_alone() {
        let f = fixture();
        fs::write(f.scratch.audio(), b"speech").unwrap();
        let wav = builtin_formats().into_iter().find(|f| f.name == "wav").unwrap();
        let job = JobDescriptor::build(&f.scratch.audio(), &[SpeedFactor::new(2.0)], &f.output_dir, &wav).unwrap();
        let mut runner = RecordingRunner::new();
        let tools = Tools::default();

        let err = SpeedPipeline::new(&mut runner, &tools, &f.scratch)
            .convert(&job, &mut |_| ())
            .unwrap_err();

        assert!(matches!(err, PipelineError::Conversion(ConversionError::ScratchCollision { .. })));
        assert_eq!(fs::read(f.scratch.audio()).unwrap(), b"speech");
        assert!(runner.calls.is_empty());
    }

    #[test]
    fn test_no_speeds_runs_nothing() {
        let f = fixture();
        let job = job(&f, "speech.mp3", &[]);
        let mut runner = RecordingRunner::new();
        let tools = Tools::default();

        let outputs = SpeedPipeline::new(&mut runner, &tools, &f.scratch)
            .convert(&job, &mut |_| ())
            .unwrap();

        assert!(outputs.is_empty());
        assert!(runner.calls.is_empty());
        assert_scratch_empty(&f);
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let f = fixture();
        let job = job(&f, "speech.wav", &[2.0]);
        fs::remove_file(job.input()).unwrap();
        let mut runner = RecordingRunner::new();
        let tools = Tools::default();

        let err = SpeedPipeline::new(&mut runner, &tools, &f.scratch)
            .convert(&job, &mut |_| ())
            .unwrap_err();

        assert!(matches!(err, PipelineError::Conversion(ConversionError::Io { .. })));
        assert!(runner.calls.is_empty());
    }
}
