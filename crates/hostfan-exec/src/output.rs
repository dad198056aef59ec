//! Output relay from remote sessions to the local terminal
//!
//! A single host streams raw bytes straight through. Several hosts running
//! at once share the terminal, so their output is split into lines and each
//! rendered line is written as one locked unit, prefixed with the host name.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use owo_colors::{AnsiColors, OwoColorize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use crate::error::ExecError;
use crate::traits::OutputStream;

const RAW_CHUNK_SIZE: usize = 8 * 1024;

/// Colors assigned to hosts in prefixed output
const PALETTE: [AnsiColors; 10] = [
    AnsiColors::Cyan,
    AnsiColors::Green,
    AnsiColors::Yellow,
    AnsiColors::Blue,
    AnsiColors::Magenta,
    AnsiColors::BrightCyan,
    AnsiColors::BrightGreen,
    AnsiColors::BrightYellow,
    AnsiColors::BrightBlue,
    AnsiColors::BrightMagenta,
];

/// Shared handle to a terminal stream
///
/// Every write goes through one lock, so a unit passed to
/// [`Terminal::write_unit`] is never interleaved with another writer's.
#[derive(Clone)]
pub struct Terminal {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Terminal {
    /// Wrap an arbitrary writer
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Process stdout
    #[must_use]
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    /// Process stderr
    #[must_use]
    pub fn stderr() -> Self {
        Self::from_writer(io::stderr())
    }

    /// Write and flush one atomic unit
    ///
    /// # Errors
    /// Returns the underlying write error, or an error if a previous writer
    /// panicked while holding the lock
    pub fn write_unit(&self, bytes: &[u8]) -> io::Result<()> {
        let mut out = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("terminal lock poisoned"))?;
        out.write_all(bytes)?;
        out.flush()
    }

    /// Write `text` followed by a newline as one unit
    ///
    /// # Errors
    /// See [`Terminal::write_unit`]
    pub fn write_line(&self, text: &str) -> io::Result<()> {
        let mut unit = Vec::with_capacity(text.len() + 1);
        unit.extend_from_slice(text.as_bytes());
        unit.push(b'\n');
        self.write_unit(&unit)
    }
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal").finish_non_exhaustive()
    }
}

/// Deterministic color for a host name
///
/// FNV-1a over the name, so the mapping is stable across runs and builds.
#[must_use]
pub fn host_color(host: &str) -> AnsiColors {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in host.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    PALETTE[hash as usize % PALETTE.len()]
}

/// One line of a host's output, ready to be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorLine<'a> {
    /// Host identity
    pub host: &'a str,
    /// Raw line bytes, with or without the trailing newline
    pub line: &'a [u8],
}

impl<'a> ColorLine<'a> {
    pub fn new(host: &'a str, line: &'a [u8]) -> Self {
        Self { host, line }
    }

    /// Render as `<host> | <line>\n`
    #[must_use]
    pub fn render(&self, colored: bool) -> Vec<u8> {
        let body = self.line.strip_suffix(b"\n").unwrap_or(self.line);
        let body = body.strip_suffix(b"\r").unwrap_or(body);

        let prefix = if colored {
            format!("{} | ", self.host.color(host_color(self.host)))
        } else {
            format!("{} | ", self.host)
        };

        let mut unit = Vec::with_capacity(prefix.len() + body.len() + 1);
        unit.extend_from_slice(prefix.as_bytes());
        unit.extend_from_slice(body);
        unit.push(b'\n');
        unit
    }
}

/// Destination for a session's output stream
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Drain `stream` to the terminal until end-of-stream
    ///
    /// Returns the number of bytes read from the stream.
    async fn relay(&self, host: &str, stream: OutputStream) -> Result<u64, ExecError>;
}

/// Byte-for-byte passthrough, used when only one host is running
#[derive(Debug, Clone)]
pub struct RawSink {
    out: Terminal,
}

impl RawSink {
    #[must_use]
    pub fn new(out: Terminal) -> Self {
        Self { out }
    }
}

#[async_trait]
impl OutputSink for RawSink {
    async fn relay(&self, _host: &str, mut stream: OutputStream) -> Result<u64, ExecError> {
        let mut buf = vec![0u8; RAW_CHUNK_SIZE];
        let mut total = 0u64;

        loop {
            let n = stream
                .read(&mut buf)
                .await
                .map_err(|e| ExecError::Relay(e.to_string()))?;
            if n == 0 {
                return Ok(total);
            }
            total += n as u64;
            self.out
                .write_unit(&buf[..n])
                .map_err(|e| ExecError::Relay(e.to_string()))?;
        }
    }
}

/// Line-buffered, host-prefixed rendering for concurrent hosts
#[derive(Debug, Clone)]
pub struct PrefixedSink {
    out: Terminal,
    colored: bool,
}

impl PrefixedSink {
    #[must_use]
    pub fn new(out: Terminal, colored: bool) -> Self {
        Self { out, colored }
    }
}

#[async_trait]
impl OutputSink for PrefixedSink {
    async fn relay(&self, host: &str, stream: OutputStream) -> Result<u64, ExecError> {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::with_capacity(256);
        let mut total = 0u64;

        loop {
            line.clear();
            let n = reader
                .read_until(b'\n', &mut line)
                .await
                .map_err(|e| ExecError::Relay(e.to_string()))?;
            if n == 0 {
                return Ok(total);
            }
            total += n as u64;

            // a fragment without newline is the last read before end-of-stream
            let unit = ColorLine::new(host, &line).render(self.colored);
            self.out
                .write_unit(&unit)
                .map_err(|e| ExecError::Relay(e.to_string()))?;
        }
    }
}

/// How session output reaches the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Raw passthrough (single host)
    Raw,
    /// Host-prefixed lines (host group)
    Prefixed,
}

impl OutputMode {
    /// Build the sink for this mode
    #[must_use]
    pub fn sink(self, out: Terminal, colored: bool) -> Arc<dyn OutputSink> {
        match self {
            OutputMode::Raw => Arc::new(RawSink::new(out)),
            OutputMode::Prefixed => Arc::new(PrefixedSink::new(out, colored)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::other("stream reset")))
        }
    }

    fn stream(bytes: &'static [u8]) -> OutputStream {
        Box::new(bytes)
    }

    #[test]
    fn test_host_color_is_stable() {
        assert_eq!(host_color("web-1"), host_color("web-1"));
        assert!(PALETTE.contains(&host_color("")));
    }

    #[test]
    fn test_render_plain() {
        let line = ColorLine::new("a", b"up 3 days\r\n");
        assert_eq!(line.render(false), b"a | up 3 days\n");
    }

    #[test]
    fn test_render_colored_wraps_host_only() {
        let rendered = String::from_utf8(ColorLine::new("a", b"hi\n").render(true)).unwrap();
        assert!(rendered.starts_with("\x1b["));
        assert!(rendered.ends_with(" | hi\n"));
    }

    #[tokio::test]
    async fn test_raw_sink_is_exact_passthrough() {
        let buf = SharedBuf::default();
        let sink = RawSink::new(Terminal::from_writer(buf.clone()));
        let input: &'static [u8] = b"progress 10%\r\x1b[2Kprogress 100%\nno newline";

        let n = sink.relay("a", stream(input)).await.unwrap();

        assert_eq!(n, input.len() as u64);
        assert_eq!(buf.contents(), input);
    }

    #[tokio::test]
    async fn test_prefixed_sink_renders_each_line() {
        let buf = SharedBuf::default();
        let sink = PrefixedSink::new(Terminal::from_writer(buf.clone()), false);

        sink.relay("web", stream(b"one\ntwo\n")).await.unwrap();

        assert_eq!(buf.contents(), b"web | one\nweb | two\n");
    }

    #[tokio::test]
    async fn test_prefixed_sink_keeps_trailing_fragment() {
        let buf = SharedBuf::default();
        let sink = PrefixedSink::new(Terminal::from_writer(buf.clone()), false);

        sink.relay("db", stream(b"done\npartial")).await.unwrap();

        assert_eq!(buf.contents(), b"db | done\ndb | partial\n");
    }

    #[tokio::test]
    async fn test_prefixed_sink_reports_read_error() {
        let buf = SharedBuf::default();
        let sink = PrefixedSink::new(Terminal::from_writer(buf.clone()), false);
        let input: OutputStream = Box::new((&b"first\n"[..]).chain(FailingReader));

        let err = sink.relay("a", input).await.unwrap_err();

        assert!(matches!(err, ExecError::Relay(_)));
        assert_eq!(buf.contents(), b"a | first\n");
    }

    #[tokio::test]
    async fn test_concurrent_hosts_never_interleave_within_a_line() {
        let buf = SharedBuf::default();
        let sink: Arc<dyn OutputSink> =
            OutputMode::Prefixed.sink(Terminal::from_writer(buf.clone()), false);

        let mut relays = Vec::new();
        for host in ["alpha", "beta"] {
            let (mut writer, reader) = tokio::io::duplex(64);
            let sink = Arc::clone(&sink);
            relays.push(tokio::spawn(async move {
                sink.relay(host, Box::new(reader)).await
            }));
            tokio::spawn(async move {
                for i in 0..200 {
                    let line = format!("{host} line {i} with some padding text\n");
                    // split writes mid-line to exercise reassembly
                    let (head, tail) = line.as_bytes().split_at(7);
                    writer.write_all(head).await.unwrap();
                    tokio::task::yield_now().await;
                    writer.write_all(tail).await.unwrap();
                }
            });
        }
        for relay in relays {
            relay.await.unwrap().unwrap();
        }

        let output = String::from_utf8(buf.contents()).unwrap();
        let mut next = [0usize; 2];
        for line in output.lines() {
            let (host, body) = line.split_once(" | ").unwrap();
            let idx = usize::from(host == "beta");
            assert_eq!(body, format!("{host} line {} with some padding text", next[idx]));
            next[idx] += 1;
        }
        assert_eq!(next, [200, 200]);
    }
}
