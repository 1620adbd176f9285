use std::fs;
use std::path::Path;

#[derive(Debug, PartialEq)]
pub enum DirEntryCategory {
    DoesNotExist,
    RegularFile,
    Directory,
    Unknown,
}

/// Classify a path, following symlinks.
pub fn classify_file(path: &Path) -> DirEntryCategory {
    match fs::metadata(path) {
        Ok(metadata) => {
            if metadata.is_file() {
                DirEntryCategory::RegularFile
            } else if metadata.is_dir() {
                DirEntryCategory::Directory
            } else {
                DirEntryCategory::Unknown
            }
        },
        Err(_) => DirEntryCategory::DoesNotExist,
    }
}

pub fn file_size(path: &Path) -> u64 {
    match fs::metadata(path) {
        Ok(fi) => fi.len(),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_classify_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("speech.wav");
        fs::write(&file, b"RIFF").unwrap();

        assert_eq!(classify_file(&file), DirEntryCategory::RegularFile);
        assert_eq!(classify_file(dir.path()), DirEntryCategory::Directory);
        assert_eq!(classify_file(&dir.path().join("nope.wav")), DirEntryCategory::DoesNotExist);
        assert_eq!(file_size(&file), 4);
        assert_eq!(file_size(&dir.path().join("nope.wav")), 0);
    }
}
