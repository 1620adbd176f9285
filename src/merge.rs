use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::MergeError;
use crate::formats::OutputFormat;
use crate::job::JobDescriptor;
use crate::pipeline::ffmpeg_metadata_args;
use crate::runner::CommandRunner;
use crate::scratch::{remove_file, ScratchSpace};
use crate::speed::join_speeds;
use crate::tools::Tools;

/// Concatenates every per-speed output of a batch into one file.
///
/// The merged file is named after the first job's speed list and carries
/// the first job's input metadata, whatever the other jobs are.
pub struct Merger<'a> {
    runner: &'a mut dyn CommandRunner,
    tools: &'a Tools,
    scratch: &'a ScratchSpace,
}

impl<'a> Merger<'a> {
    pub fn new(runner: &'a mut dyn CommandRunner, tools: &'a Tools, scratch: &'a ScratchSpace) -> Self {
        Merger { runner, tools, scratch }
    }

    pub fn merge(
        &mut self,
        jobs: &[JobDescriptor],
        format: &OutputFormat,
        output_dir: &Path,
        observer: &mut dyn FnMut(&str),
    ) -> Result<PathBuf, MergeError> {
        let first = jobs.first().ok_or(MergeError::NothingToMerge)?;
        let parts: Vec<&Path> = jobs
            .iter()
            .flat_map(|job| job.outputs().iter().map(|p| p.as_path()))
            .collect();
        if parts.is_empty() {
            return Err(MergeError::NothingToMerge);
        }

        let manifest = self.scratch.manifest();
        let metadata = self.scratch.metadata();
        let _guard = self.scratch.guard(vec![manifest.clone(), metadata.clone()]);

        fs::write(&manifest, manifest_contents(&parts)).map_err(MergeError::Manifest)?;

        let outcome = self.runner.run(&ffmpeg_metadata_args(&self.tools.ffmpeg, first.input(), &metadata), observer)?;
        if !outcome.success() {
            return Err(MergeError::MetadataFailed { code: outcome.code });
        }

        let merged = output_dir.join(merged_file_name(first, format));
        info!("merging {} file(s) into {:?}", parts.len(), merged);
        let outcome = self.runner.run(&concat_args(&self.tools.ffmpeg, &manifest, &metadata, &merged), observer)?;
        if !outcome.success() {
            return Err(MergeError::ConcatFailed { code: outcome.code });
        }

        for part in parts {
            if let Err(warning) = remove_file(part) {
                warn!("{}", warning);
            }
        }

        Ok(merged)
    }
}

/// `<speeds joined by _><extension>`, taken from the first job only.
pub fn merged_file_name(first: &JobDescriptor, format: &OutputFormat) -> String {
    format!("{}{}", join_speeds(first.speeds(), "_"), format.extension)
}

/// One `file '<path>'` line per part, in order.
pub fn manifest_contents(parts: &[&Path]) -> String {
    parts
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

fn concat_args(ffmpeg: &str, manifest: &Path, metadata: &Path, merged: &Path) -> Vec<OsString> {
    fn os(s: &str) -> OsString { OsString::from(s) }

    vec![
        os(ffmpeg),
        os("-y"),
        os("-f"), os("concat"),
        os("-safe"), os("0"),
        os("-i"), manifest.as_os_str().to_owned(),
        os("-i"), metadata.as_os_str().to_owned(),
        os("-map_metadata"), os("1"),
        os("-codec"), os("copy"),
        merged.as_os_str().to_owned(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::builtin_formats;
    use crate::runner::tests::RecordingRunner;
    use crate::speed::SpeedFactor;
    use tempfile::tempdir;

    fn wav() -> OutputFormat {
        builtin_formats().into_iter().find(|f| f.name == "wav").unwrap()
    }

    fn produced_job(input: &Path, speeds: &[f64], output_dir: &Path) -> JobDescriptor {
        let speeds: Vec<SpeedFactor> = speeds.iter().map(|s| SpeedFactor::new(*s)).collect();
        let job = JobDescriptor::build(input, &speeds, output_dir, &wav()).unwrap();
        for output in job.outputs() {
            fs::write(output, b"audio").unwrap();
        }
        job
    }

    #[test]
    fn test_merge_scenario() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        let job = produced_job(Path::new("speech.wav"), &[2.0, 3.0], &out);

        // capture the manifest while it still exists
        let mut manifest_seen = String::new();
        let manifest_path = scratch.manifest();
        let mut runner = RecordingRunner::new();
        let tools = Tools::default();
        let merged = Merger::new(&mut runner, &tools, &scratch)
            .merge(&[job.clone()], &wav(), &out, &mut |_| {
                if manifest_seen.is_empty() {
                    manifest_seen = fs::read_to_string(&manifest_path).unwrap_or_default();
                }
            })
            .unwrap();

        assert_eq!(merged, out.join("2_3.wav"));
        assert!(merged.exists());
        assert_eq!(manifest_seen, format!(
            "file '{}'\nfile '{}'\n",
            out.join("speech_x2.wav").display(),
            out.join("speech_x3.wav").display(),
        ));
        assert!(job.outputs().iter().all(|o| !o.exists()));
        assert!(!scratch.manifest().exists());
        assert!(!scratch.metadata().exists());

        let concat = &runner.calls[1];
        assert_eq!(concat[1..7], ["-y", "-f", "concat", "-safe", "0", "-i"]);
        assert_eq!(concat[7], scratch.manifest().to_string_lossy());
        assert_eq!(concat[10..14], ["-map_metadata", "1", "-codec", "copy"]);
        assert_eq!(concat.last().unwrap(), &merged.to_string_lossy());
    }

    #[test]
    fn test_metadata_comes_from_first_job() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());
        let first = produced_job(Path::new("a.flac"), &[2.0], dir.path());
        let second = produced_job(Path::new("b.flac"), &[4.0, 5.0], dir.path());
        let mut runner = RecordingRunner::new();
        let tools = Tools::default();

        let merged = Merger::new(&mut runner, &tools, &scratch)
            .merge(&[first, second], &wav(), dir.path(), &mut |_| ())
            .unwrap();

        assert_eq!(merged.file_name().unwrap(), "2.wav");
        assert_eq!(runner.calls[0][3], "a.flac");
    }

    #[test]
    fn test_failed_concat_keeps_outputs() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());
        let job = produced_job(Path::new("speech.wav"), &[2.0, 3.0], dir.path());
        let mut runner = RecordingRunner::failing_at(1, 1);
        let tools = Tools::default();

        let err = Merger::new(&mut runner, &tools, &scratch)
            .merge(&[job.clone()], &wav(), dir.path(), &mut |_| ())
            .unwrap_err();

        assert!(matches!(err, MergeError::ConcatFailed { code: Some(1) }));
        assert!(job.outputs().iter().all(|o| o.exists()));
        assert!(!scratch.manifest().exists());
    }

    #[test]
    fn test_failed_metadata_keeps_outputs() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());
        let job = produced_job(Path::new("speech.wav"), &[2.0, 3.0], dir.path());
        let mut runner = RecordingRunner::failing_at(0, 1);
        let tools = Tools::default();

        let err = Merger::new(&mut runner, &tools, &scratch)
            .merge(&[job.clone()], &wav(), dir.path(), &mut |_| ())
            .unwrap_err();

        assert!(matches!(err, MergeError::MetadataFailed { code: Some(1) }));
        assert_eq!(runner.calls.len(), 1);
        assert!(job.outputs().iter().all(|o| o.exists()));
        assert!(!dir.path().join("2_3.wav").exists());
        assert!(!scratch.manifest().exists());
    }

    #[test]
    fn test_unwritable_manifest() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(&dir.path().join("missing"));
        let job = produced_job(Path::new("speech.wav"), &[2.0], dir.path());
        let mut runner = RecordingRunner::new();
        let tools = Tools::default();

        let err = Merger::new(&mut runner, &tools, &scratch)
            .merge(&[job.clone()], &wav(), dir.path(), &mut |_| ())
            .unwrap_err();

        assert!(matches!(err, MergeError::Manifest(_)));
        assert!(runner.calls.is_empty());
        assert!(job.outputs()[0].exists());
    }

    #[test]
    fn test_nothing_to_merge() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path());
        let mut runner = RecordingRunner::new();
        let tools = Tools::default();
        let mut merger = Merger::new(&mut runner, &tools, &scratch);

        assert!(matches!(merger.merge(&[], &wav(), dir.path(), &mut |_| ()), Err(MergeError::NothingToMerge)));
        let empty = produced_job(Path::new("speech.wav"), &[], dir.path());
        assert!(matches!(merger.merge(&[empty], &wav(), dir.path(), &mut |_| ()), Err(MergeError::NothingToMerge)));
    }

    #[test]
    fn test_manifest_escapes_quotes() {
        let contents = manifest_contents(&[Path::new("/music/it's.wav")]);
        assert_eq!(contents, "file '/music/it'\\''s.wav'\n");
    }
}
