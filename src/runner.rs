use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread;

#[cfg(unix)]
use std::os::unix::process::CommandExt;
#[cfg(windows)]
use std::os::windows::process::CommandExt;

use log::debug;

use crate::command::display_argv;
use crate::error::StartupError;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// How an external program ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExitOutcome {
    pub code: Option<i32>,
}

impl ExitOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs one external command to completion, handing every line of its
/// combined output to `observer` as it arrives.
///
/// A non-zero exit is returned, not raised; only a failure to launch the
/// program is an error.
pub trait CommandRunner {
    fn run(&mut self, argv: &[OsString], observer: &mut dyn FnMut(&str)) -> Result<ExitOutcome, StartupError>;
}

#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        SystemRunner
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, argv: &[OsString], observer: &mut dyn FnMut(&str)) -> Result<ExitOutcome, StartupError> {
        let program = match argv.first() {
            Some(program) => program,
            None => return Err(StartupError::for_program(
                "",
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            )),
        };
        let program_name = program.to_string_lossy().into_owned();
        debug!("running {}", display_argv(argv));

        let mut command = Command::new(program);
        command
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // keep Ctrl+C away from the child; the batch stops between jobs
        #[cfg(unix)]
        command.process_group(0);
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW | CREATE_NEW_PROCESS_GROUP);

        let mut child = command
            .spawn()
            .map_err(|err| StartupError::for_program(&program_name, err))?;

        let (tx, rx) = mpsc::channel();
        let mut readers = vec![];
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        // ends once both pipes are closed
        for line in rx {
            observer(&line);
        }

        for reader in readers {
            let _ = reader.join();
        }

        let status = child
            .wait()
            .map_err(|err| StartupError::for_program(&program_name, err))?;
        debug!("{} exited with {:?}", program_name, status.code());

        Ok(ExitOutcome { code: status.code() })
    }
}

fn forward_lines<R: Read + Send + 'static>(stream: R, tx: Sender<String>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    if tx.send(String::from(line)).is_err() {
                        break;
                    }
                },
            }
        }
    })
}
