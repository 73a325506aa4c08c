// Capped history of raw worker output, exposed through the status query

use std::collections::VecDeque;

/// Maximum number of entries retained for a run
pub const DIAGNOSTIC_CAPACITY: usize = 500;

/// Ring buffer of output lines; the oldest entry is evicted once full
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::with_capacity(DIAGNOSTIC_CAPACITY)
    }
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(DIAGNOSTIC_CAPACITY)),
            capacity,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// All retained entries, oldest first, newline-joined
    pub fn joined(&self) -> String {
        self.lines().collect::<Vec<_>>().join("\n")
    }
}
