//! Port discovery over the worker's output streams.
//!
//! The worker announces its listening address on stdout with a line such as
//! `APP_HOST=http://localhost:54231`. Process output arrives in arbitrary
//! chunks, so the scanner buffers partial lines for the log; whatever is left
//! when the stream closes is flushed as a final line. The port is searched
//! for in the unterminated tail as well, since a worker may flush its
//! announcement without a newline and keep running.

use once_cell::sync::Lazy;
use regex::Regex;

/// Literal the worker prints immediately before its port number
pub const PORT_MARKER: &str = "APP_HOST=http://localhost:";

/// Prefix applied to stderr lines in the diagnostic log
pub const STDERR_PREFIX: &str = "stderr: ";

static PORT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"{}\s*(\d+)", regex::escape(PORT_MARKER));
    Regex::new(&pattern).expect("failed to compile port marker pattern")
});

/// Extract the announced port from one line of output.
///
/// Returns `None` when the marker is absent or the value is not a usable
/// TCP port.
pub fn find_port(text: &str) -> Option<u16> {
    let caps = PORT_PATTERN.captures(text)?;
    caps.get(1)?
        .as_str()
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
}

/// Result of feeding output to a scanner
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Scan {
    /// Complete lines, ready for the diagnostic log
    pub lines: Vec<String>,
    /// First port announcement of the stream, reported once
    pub port: Option<u16>,
}

/// Stateful line splitter for one output stream
#[derive(Debug)]
pub struct PortScanner {
    pending: Vec<u8>,
    prefix: &'static str,
    detect_port: bool,
    announced: bool,
}

impl PortScanner {
    /// Scanner for stdout: lines are logged verbatim and searched for the marker
    pub fn stdout() -> Self {
        Self {
            pending: Vec::new(),
            prefix: "",
            detect_port: true,
            announced: false,
        }
    }

    /// Scanner for stderr: lines are logged with a `stderr: ` prefix only
    pub fn stderr() -> Self {
        Self {
            pending: Vec::new(),
            prefix: STDERR_PREFIX,
            detect_port: false,
            announced: false,
        }
    }

    /// Whether this scanner looks for the port marker
    pub fn detects_port(&self) -> bool {
        self.detect_port
    }

    /// Feed one raw chunk, returning the lines it completed and any port
    /// announced so far, including in a line still waiting for its newline
    pub fn feed(&mut self, chunk: &[u8]) -> Scan {
        self.pending.extend_from_slice(chunk);

        let mut scan = Scan::default();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=newline).collect();
            self.accept(&raw[..raw.len() - 1], &mut scan);
        }

        if self.watching() && !self.pending.is_empty() {
            scan.port = find_port(&String::from_utf8_lossy(&self.pending));
            self.announced = scan.port.is_some();
        }
        scan
    }

    /// Flush a trailing partial line once the stream has closed
    pub fn finish(&mut self) -> Scan {
        let mut scan = Scan::default();
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            self.accept(&raw, &mut scan);
        }
        scan
    }

    fn watching(&self) -> bool {
        self.detect_port && !self.announced
    }

    fn accept(&mut self, raw: &[u8], scan: &mut Scan) {
        let text = String::from_utf8_lossy(raw);
        let line = text.strip_suffix('\r').unwrap_or(text.as_ref());

        if self.watching() {
            scan.port = find_port(line);
            self.announced = scan.port.is_some();
        }
        scan.lines.push(format!("{}{}", self.prefix, line));
    }
}
