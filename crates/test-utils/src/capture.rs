use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use watchpty::exec::OutputSink;

/// Output sink that records everything the runner copies.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let guard = self.buf.lock().unwrap();
        String::from_utf8_lossy(&guard).into_owned()
    }

    /// Poll until `needle` has been written `count` times, or give up after
    /// roughly `within`.
    pub async fn wait_for_count(&self, needle: &str, count: usize, within: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            if self.contents().matches(needle).count() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl OutputSink for CaptureSink {
    fn writer(&self) -> Box<dyn Write + Send> {
        Box::new(CaptureWriter {
            buf: Arc::clone(&self.buf),
        })
    }
}

struct CaptureWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
