use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use tracing::warn;

use crate::trace::trace::TraceEvent;

/// JSONL sink for fill events.
///
/// A trace is a diagnostic aid, never a reason to stop filling: a file that
/// cannot be opened turns the logger into a no-op, and a failed append is
/// reported through `tracing` and dropped.
pub struct TraceLogger {
    sink: Option<Mutex<File>>,
}

impl TraceLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self {
                sink: Some(Mutex::new(file)),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "trace file unavailable, events will not be recorded");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn log(&self, event: &TraceEvent) {
        let Some(sink) = &self.sink else {
            return;
        };

        let line = match serde_json::to_vec(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "trace event not serializable");
                return;
            }
        };

        // A poisoned lock still guards a usable file handle
        let mut file = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = append_line(&mut file, &line) {
            warn!(error = %e, "trace event not written");
        }
    }
}

fn append_line(file: &mut File, line: &[u8]) -> io::Result<()> {
    file.write_all(line)?;
    file.write_all(b"\n")
}
