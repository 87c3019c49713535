/// Bounded output collection
///
/// Compiler and program output is read on dedicated threads with hard byte
/// limits so a hostile payload cannot balloon diagnostics in memory.
use std::io::{BufReader, Read};
use std::sync::mpsc::{channel, Receiver};
use std::thread::{self, JoinHandle};

/// Output limits configuration
#[derive(Debug, Clone)]
pub struct OutputLimits {
    /// Per-stream stdout limit (bytes)
    pub stdout_limit: usize,
    /// Per-stream stderr limit (bytes)
    pub stderr_limit: usize,
}

impl Default for OutputLimits {
    fn default() -> Self {
        OutputLimits {
            stdout_limit: 8 * 1024 * 1024,
            stderr_limit: 2 * 1024 * 1024,
        }
    }
}

/// One captured stream plus whether the limit truncated it.
#[derive(Debug, Clone, Default)]
pub struct CapturedStream {
    pub data: Vec<u8>,
    pub truncated: bool,
}

impl CapturedStream {
    pub fn into_text(self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Handle to an in-flight stream collector thread.
pub struct StreamCollector {
    rx: Receiver<CapturedStream>,
    handle: JoinHandle<()>,
}

impl StreamCollector {
    /// Spawn a collector thread that drains `stream` up to `limit` bytes.
    pub fn spawn<R: Read + Send + 'static>(stream: R, limit: usize) -> Self {
        let (tx, rx) = channel();
        let handle = thread::spawn(move || {
            let captured = collect_stream(stream, limit);
            let _ = tx.send(captured);
        });
        Self { rx, handle }
    }

    /// Wait for EOF (or the limit) and return what was captured.
    pub fn finish(self) -> CapturedStream {
        let captured = self.rx.recv().unwrap_or_default();
        let _ = self.handle.join();
        captured
    }
}

fn collect_stream<R: Read>(stream: R, limit: usize) -> CapturedStream {
    let mut reader = BufReader::new(stream);
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut truncated = false;

    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if buffer.len() + n > limit {
                    let remaining = limit - buffer.len();
                    buffer.extend_from_slice(&chunk[..remaining]);
                    truncated = true;
                    // Keep draining so the child never blocks on a full pipe.
                    continue;
                }
                buffer.extend_from_slice(&chunk[..n]);
            }
            Err(_) => break,
        }
    }

    CapturedStream {
        data: buffer,
        truncated,
    }
}
