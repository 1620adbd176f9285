use std::process::{Command, Stdio};

/// Locations of the external transcoder and speed changer.
#[derive(Clone, Debug, PartialEq)]
pub struct Tools {
    pub ffmpeg: String,
    pub sonic: String,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            ffmpeg: String::from("ffmpeg"),
            sonic: String::from("sonic"),
        }
    }
}

impl Tools {
    pub fn new(ffmpeg: &str, sonic: &str) -> Self {
        Tools {
            ffmpeg: String::from(ffmpeg),
            sonic: String::from(sonic),
        }
    }

    pub fn ffmpeg_installed(&self) -> bool {
        let cmd = Command::new(&self.ffmpeg)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match cmd {
            Ok(status) => status.success(),
            Err(_) => false,
        }
    }
}
