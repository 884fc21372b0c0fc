//! Host console sinks
//!
//! The host hands a `ConsoleSink` to the runtime at start; the interpreter's
//! redirected streams call back into it synchronously. Writes are forwarded
//! verbatim: no buffering, no line splitting, no added newline.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

/// Identity of a redirected stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamId {
    Stdout,
    Stderr,
}

impl StreamId {
    pub const ALL: [StreamId; 2] = [StreamId::Stdout, StreamId::Stderr];

    /// Attribute name on the interpreter's `sys` module
    pub fn sys_attr(self) -> &'static str {
        match self {
            StreamId::Stdout => "stdout",
            StreamId::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sys_attr())
    }
}

/// Capability the host implements to receive interpreter output
pub trait ConsoleSink: Send + Sync {
    fn write(&self, stream: StreamId, text: &str);
}

/// Writes to the host process's own stdout/stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl ConsoleSink for StdConsole {
    fn write(&self, stream: StreamId, text: &str) {
        // Errors writing to the host console have nowhere to be reported
        let _ = match stream {
            StreamId::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(text.as_bytes()).and_then(|_| out.flush())
            }
            StreamId::Stderr => {
                let mut err = std::io::stderr().lock();
                err.write_all(text.as_bytes()).and_then(|_| err.flush())
            }
        };
    }
}

/// Accumulates output in memory, one buffer per stream
#[derive(Debug, Default)]
pub struct CaptureConsole {
    stdout: Mutex<String>,
    stderr: Mutex<String>,
}

impl CaptureConsole {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&self, stream: StreamId) -> &Mutex<String> {
        match stream {
            StreamId::Stdout => &self.stdout,
            StreamId::Stderr => &self.stderr,
        }
    }

    /// Copy of everything written to `stream` so far
    pub fn contents(&self, stream: StreamId) -> String {
        self.buffer(stream)
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Drain and return everything written to `stream`
    pub fn take(&self, stream: StreamId) -> String {
        std::mem::take(
            &mut *self
                .buffer(stream)
                .lock()
                .unwrap_or_else(|e| e.into_inner()),
        )
    }

    pub fn take_stdout(&self) -> String {
        self.take(StreamId::Stdout)
    }

    pub fn take_stderr(&self) -> String {
        self.take(StreamId::Stderr)
    }
}

impl ConsoleSink for CaptureConsole {
    fn write(&self, stream: StreamId, text: &str) {
        self.buffer(stream)
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_keeps_streams_apart() {
        let console = CaptureConsole::new();
        console.write(StreamId::Stdout, "10");
        console.write(StreamId::Stdout, "\n");
        console.write(StreamId::Stderr, "oops");

        assert_eq!(console.contents(StreamId::Stdout), "10\n");
        assert_eq!(console.take_stderr(), "oops");
        assert_eq!(console.take_stderr(), "");
        assert_eq!(console.take_stdout(), "10\n");
    }

    #[test]
    fn test_capture_is_verbatim() {
        let console = CaptureConsole::new();
        console.write(StreamId::Stdout, "no newline");
        console.write(StreamId::Stdout, "");
        console.write(StreamId::Stdout, "\tünïcode ✓");
        assert_eq!(console.take_stdout(), "no newline\tünïcode ✓");
    }

    #[test]
    fn test_stream_attr_names() {
        assert_eq!(StreamId::Stdout.sys_attr(), "stdout");
        assert_eq!(StreamId::Stderr.to_string(), "stderr");
    }
}
