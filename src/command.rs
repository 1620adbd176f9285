//! Argument templates for transcoder invocations.
//!
//! A template is built once per output and rendered as often as needed. The
//! slot layout of a transcode template is fixed:
//!
//! | position | content                                            |
//! |----------|----------------------------------------------------|
//! | 0        | program name                                       |
//! | 1, 2     | `-i`, [`Arg::Input`]                               |
//! | 3        | [`Arg::Metadata`]: `-i <file> -map_metadata 1`, or nothing |
//! | 4..n-1   | codec flags of the output format                   |
//! | n        | [`Arg::Output`]                                    |
//!
//! Rendering never mutates the template.

use std::ffi::OsString;
use std::path::Path;

#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Literal(String),
    Input,
    Metadata,
    Output,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommandTemplate {
    args: Vec<Arg>,
}

/// Values substituted into the slots of a [`CommandTemplate`].
#[derive(Clone, Copy, Debug)]
pub struct Slots<'a> {
    pub input: &'a Path,
    pub metadata: Option<&'a Path>,
    pub output: &'a Path,
}

impl CommandTemplate {
    pub const INPUT_POSITION: usize = 2;
    pub const METADATA_POSITION: usize = 3;

    pub fn for_transcode(program: &str, codec_args: &[String]) -> Self {
        let mut args = vec![
            Arg::Literal(String::from(program)),
            Arg::Literal(String::from("-i")),
            Arg::Input,
            Arg::Metadata,
        ];
        args.extend(codec_args.iter().map(|a| Arg::Literal(a.clone())));
        args.push(Arg::Output);
        CommandTemplate { args }
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn program(&self) -> Option<&str> {
        match self.args.first() {
            Some(Arg::Literal(program)) => Some(program),
            _ => None,
        }
    }

    pub fn render(&self, slots: Slots<'_>) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(self.args.len() + 3);
        for arg in &self.args {
            match arg {
                Arg::Literal(s) => argv.push(OsString::from(s)),
                Arg::Input => argv.push(slots.input.as_os_str().to_owned()),
                Arg::Output => argv.push(slots.output.as_os_str().to_owned()),
                Arg::Metadata => {
                    if let Some(metadata) = slots.metadata {
                        argv.push(OsString::from("-i"));
                        argv.push(metadata.as_os_str().to_owned());
                        argv.push(OsString::from("-map_metadata"));
                        argv.push(OsString::from("1"));
                    }
                },
            }
        }
        argv
    }
}

/// Render an argv for logging, quoting arguments that contain whitespace.
pub fn display_argv(argv: &[OsString]) -> String {
    argv.iter()
        .map(|a| {
            let s = a.to_string_lossy();
            if s.contains(char::is_whitespace) || s.is_empty() {
                format!("{:?}", s)
            } else {
                s.into_owned()
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
