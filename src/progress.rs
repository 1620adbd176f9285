use std::path::Path;
use std::sync::mpsc::Receiver;

use kdam::{term, tqdm, BarExt};

use crate::batch::BatchMessage;

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Draw a progress bar from batch messages until the sender goes away.
/// Tool output is written above the bar when `verbose` is set.
pub fn show_progress(messages: Receiver<BatchMessage>, verbose: bool) {
    term::init(false);

    let mut pbar = tqdm!(
        total = 0,
        desc = "waiting",
        position = 0,
        force_refresh = true
    );

    for msg in messages {
        match msg {
            BatchMessage::RunStart { total } => {
                pbar.reset(Some(total.saturating_sub(1)));
            },
            BatchMessage::JobStart { input, .. } => {
                pbar.set_description(format!("converting {}", file_name(&input)));
                let _ = pbar.refresh();
            },
            BatchMessage::Output(line) => {
                if verbose {
                    let _ = pbar.write(line);
                }
            },
            BatchMessage::JobSkipped { input, .. } => {
                let _ = pbar.write(format!("{} already converted, skipping", file_name(&input)));
            },
            BatchMessage::JobFailed { error, .. } => {
                let _ = pbar.write(format!("failed: {}", error));
            },
            BatchMessage::JobEnd { outputs, .. } => {
                pbar.set_postfix(format!("{} file(s)", outputs.len()));
            },
            BatchMessage::Progress { position, .. } => {
                let _ = pbar.update_to(position);
            },
            BatchMessage::MergeStart => {
                pbar.set_description("merging");
                let _ = pbar.refresh();
            },
            BatchMessage::MergeEnd { merged } => {
                if let Some(merged) = merged {
                    let _ = pbar.write(format!("merged into {}", file_name(&merged)));
                }
            },
            BatchMessage::Cancelled => {
                let _ = pbar.write("cancelled");
            },
            BatchMessage::Idle => {
                pbar.set_description("done");
                let _ = pbar.refresh();
            },
        }
    }

    eprintln!();
}
