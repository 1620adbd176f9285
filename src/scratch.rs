use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::CleanupWarning;

/// Fixed-name scratch files inside one directory. Two runs sharing a
/// scratch directory will overwrite each other's files.
#[derive(Clone, Debug)]
pub struct ScratchSpace {
    dir: PathBuf,
}

impl ScratchSpace {
    pub fn new(dir: &Path) -> Self {
        ScratchSpace { dir: dir.to_path_buf() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Normalized copy of the input.
    pub fn audio(&self) -> PathBuf {
        self.dir.join("tmp.wav")
    }

    /// Speed-changed audio for the current factor.
    pub fn speed_audio(&self) -> PathBuf {
        self.dir.join("tmp2.wav")
    }

    pub fn metadata(&self) -> PathBuf {
        self.dir.join("metadata.txt")
    }

    pub fn manifest(&self) -> PathBuf {
        self.dir.join("merge.txt")
    }

    fn files(&self) -> [PathBuf; 4] {
        [self.audio(), self.speed_audio(), self.metadata(), self.manifest()]
    }

    /// Whether `path` names one of the scratch files, directly or through
    /// a link. Paths that cannot be resolved are not scratch files.
    pub fn owns(&self, path: &Path) -> bool {
        let dir = match fs::canonicalize(&self.dir) {
            Ok(dir) => dir,
            Err(_) => return false,
        };
        let mut candidates = vec![];
        if let Ok(resolved) = fs::canonicalize(path) {
            candidates.push(resolved);
        }
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
            if let Ok(parent) = fs::canonicalize(parent) {
                candidates.push(parent.join(name));
            }
        }

        self.files()
            .iter()
            .filter_map(|file| file.file_name())
            .map(|name| dir.join(name))
            .any(|file| candidates.contains(&file))
    }

    pub fn guard(&self, paths: Vec<PathBuf>) -> ScratchGuard {
        ScratchGuard { paths }
    }
}

/// Removes its files when dropped, whatever the exit path.
#[derive(Debug)]
pub struct ScratchGuard {
    paths: Vec<PathBuf>,
}

impl ScratchGuard {
    /// Remove everything now and report what could not be removed.
    pub fn cleanup(&mut self) -> Vec<CleanupWarning> {
        self.paths
            .drain(..)
            .filter_map(|path| remove_file(&path).err())
            .collect()
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        for warning in self.cleanup() {
            warn!("{}", warning);
        }
    }
}

/// Best-effort removal: a file that is already gone is not a failure.
pub fn remove_file(path: &Path) -> Result<(), CleanupWarning> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CleanupWarning { path: path.to_path_buf(), source }),
    }
}
