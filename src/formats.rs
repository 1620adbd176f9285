use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::command::CommandTemplate;

/// One entry of the output format catalog.
///
/// `command` is the transcoder base command: program name first, then the
/// fixed codec flags. `extension` carries its leading dot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputFormat {
    pub name: String,
    pub display_name: String,
    pub command: Vec<String>,
    pub extension: String,
}

impl OutputFormat {
    pub fn new(name: &str, display_name: &str, command: &[&str], extension: &str) -> Self {
        OutputFormat {
            name: String::from(name),
            display_name: String::from(display_name),
            command: command.iter().map(|s| String::from(*s)).collect(),
            extension: String::from(extension),
        }
    }

    pub fn program(&self) -> Option<&str> {
        self.command.first().map(|s| s.as_str())
    }

    pub fn codec_args(&self) -> &[String] {
        match self.command.len() {
            0 => &[],
            _ => &self.command[1..],
        }
    }

    /// Same format, invoked through a different transcoder binary.
    pub fn with_program(mut self, program: &str) -> Self {
        match self.command.first_mut() {
            Some(first) => *first = String::from(program),
            None => self.command.push(String::from(program)),
        }
        self
    }

    pub fn template(&self) -> CommandTemplate {
        CommandTemplate::for_transcode(self.program().unwrap_or_default(), self.codec_args())
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name, self.extension)
    }
}

pub fn builtin_formats() -> Vec<OutputFormat> {
    vec![
        OutputFormat::new("alac", "ALAC", &["ffmpeg", "-y", "-acodec", "alac"], ".m4a"),
        OutputFormat::new("flac", "FLAC", &["ffmpeg", "-y", "-acodec", "flac"], ".flac"),
        OutputFormat::new("aiff", "AIFF", &["ffmpeg", "-y", "-acodec", "pcm_s16be"], ".aiff"),
        OutputFormat::new("wav", "WAV", &["ffmpeg", "-y", "-acodec", "pcm_s16le"], ".wav"),
        OutputFormat::new("mp3-192", "MP3 (192kbps)", &["ffmpeg", "-y", "-acodec", "libmp3lame", "-ab", "192k"], ".mp3"),
        OutputFormat::new("mp3-160", "MP3 (160kbps)", &["ffmpeg", "-y", "-acodec", "libmp3lame", "-ab", "160k"], ".mp3"),
        OutputFormat::new("mp3-128", "MP3 (128kbps)", &["ffmpeg", "-y", "-acodec", "libmp3lame", "-ab", "128k"], ".mp3"),
        OutputFormat::new("aac-256", "AAC (256kbps)", &["ffmpeg", "-y", "-acodec", "aac", "-ab", "256k", "-ar", "44100"], ".m4a"),
        OutputFormat::new("aac-128", "AAC (128kbps)", &["ffmpeg", "-y", "-acodec", "aac", "-ab", "128k", "-ar", "44100"], ".m4a"),
    ]
}
