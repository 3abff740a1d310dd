//! Host editor buffer abstraction
//!
//! The host editor owns documents and decorations. Revlight only needs a few
//! primitives from it: line geometry of the current snapshot, a way to replace
//! the highlight set for one style, and a way to tell the user something.
//! [`TextBuffer`] is an in-memory implementation used by the terminal host and
//! by tests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, info, warn};

use crate::render::SeverityStyle;
use crate::{Error, Result, Severity};

/// Identifies a document in the host editor (usually its path or URI)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(String);

impl BufferId {
    /// Create a buffer id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BufferId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BufferId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single-line highlighted range with its hover text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    /// 0-based line index
    pub line: usize,
    /// First highlighted column (always 0)
    pub start_col: usize,
    /// Column just past the last highlighted character
    pub end_col: usize,
    /// Text shown on hover
    pub hover: String,
}

/// Kind of user-visible notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

/// Primitives a host editor buffer exposes to Revlight
pub trait EditorBuffer: Send {
    /// Identity of the document shown in this buffer
    fn id(&self) -> BufferId;

    /// Whether the buffer is still open in the editor
    fn is_open(&self) -> bool;

    /// Full text of the current snapshot
    fn text(&self) -> String;

    /// Number of lines in the current snapshot
    fn line_count(&self) -> usize;

    /// Length of the given 0-based line, `None` if out of range
    fn line_len(&self, line: usize) -> Option<usize>;

    /// Replace every range currently drawn with `style` by `highlights`
    fn set_highlights(&mut self, style: &SeverityStyle, highlights: &[Highlight]) -> Result<()>;

    /// Show a message to the user
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info => info!(buffer = %self.id(), "{}", message),
            NotifyLevel::Warning => warn!(buffer = %self.id(), "{}", message),
            NotifyLevel::Error => error!(buffer = %self.id(), "{}", message),
        }
    }
}

#[derive(Debug)]
struct TextBufferState {
    text: String,
    lines: Vec<String>,
    open: bool,
    highlights: BTreeMap<Severity, (SeverityStyle, Vec<Highlight>)>,
    notifications: Vec<(NotifyLevel, String)>,
}

/// In-memory editor buffer
///
/// Clones are handles onto the same document, the way editor handles are.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    id: BufferId,
    state: Arc<Mutex<TextBufferState>>,
}

impl TextBuffer {
    /// Create an open buffer holding `text`
    pub fn new(id: impl Into<BufferId>, text: &str) -> Self {
        Self {
            id: id.into(),
            state: Arc::new(Mutex::new(TextBufferState {
                text: text.to_string(),
                lines: split_lines(text),
                open: true,
                highlights: BTreeMap::new(),
                notifications: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, TextBufferState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the document text, keeping existing highlights
    pub fn set_text(&self, text: &str) {
        let mut state = self.state();
        state.text = text.to_string();
        state.lines = split_lines(text);
    }

    /// Get a line of the current snapshot
    pub fn line(&self, line: usize) -> Option<String> {
        self.state().lines.get(line).cloned()
    }

    /// Close the buffer; later highlight updates fail
    pub fn close(&self) {
        self.state().open = false;
    }

    /// Ranges currently drawn for a severity
    pub fn highlights(&self, severity: Severity) -> Vec<Highlight> {
        self.state()
            .highlights
            .get(&severity)
            .map(|(_, ranges)| ranges.clone())
            .unwrap_or_default()
    }

    /// Style last applied for a severity, if any
    pub fn style(&self, severity: Severity) -> Option<SeverityStyle> {
        self.state()
            .highlights
            .get(&severity)
            .map(|(style, _)| style.clone())
    }

    /// Every drawn range with its severity, ordered by line
    pub fn all_highlights(&self) -> Vec<(Severity, Highlight)> {
        let mut all: Vec<(Severity, Highlight)> = self
            .state()
            .highlights
            .iter()
            .flat_map(|(severity, (_, ranges))| ranges.iter().map(|h| (*severity, h.clone())))
            .collect();
        all.sort_by(|a, b| a.1.line.cmp(&b.1.line).then(b.0.cmp(&a.0)));
        all
    }

    /// Messages shown to the user so far
    pub fn notifications(&self) -> Vec<(NotifyLevel, String)> {
        self.state().notifications.clone()
    }
}

impl EditorBuffer for TextBuffer {
    fn id(&self) -> BufferId {
        self.id.clone()
    }

    fn is_open(&self) -> bool {
        self.state().open
    }

    fn text(&self) -> String {
        self.state().text.clone()
    }

    fn line_count(&self) -> usize {
        self.state().lines.len()
    }

    fn line_len(&self, line: usize) -> Option<usize> {
        self.state().lines.get(line).map(|l| l.chars().count())
    }

    fn set_highlights(&mut self, style: &SeverityStyle, highlights: &[Highlight]) -> Result<()> {
        let mut state = self.state();
        if !state.open {
            return Err(Error::Render(format!("buffer {} is closed", self.id)));
        }
        state
            .highlights
            .insert(style.severity, (style.clone(), highlights.to_vec()));
        Ok(())
    }

    fn notify(&self, level: NotifyLevel, message: &str) {
        self.state().notifications.push((level, message.to_string()));
    }
}

/// Split text into lines the way editors count them: a trailing newline
/// starts an empty last line, and an empty document has one line.
fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_geometry() {
        let buffer = TextBuffer::new("a.py", "first\r\nsecond line\n");
        assert_eq!(buffer.line_count(), 3);
        assert_eq!(buffer.line_len(0), Some(5));
        assert_eq!(buffer.line_len(1), Some(11));
        assert_eq!(buffer.line_len(2), Some(0));
        assert_eq!(buffer.line_len(3), None);
    }

    #[test]
    fn test_text_keeps_line_endings() {
        let buffer = TextBuffer::new("a.py", "first\r\nsecond\r\n");
        assert_eq!(buffer.text(), "first\r\nsecond\r\n");

        buffer.set_text("x = 1\r\n");
        assert_eq!(buffer.text(), "x = 1\r\n");
        assert_eq!(buffer.line(0).as_deref(), Some("x = 1"));
    }

    #[test]
    fn test_empty_document_has_one_line() {
        let buffer = TextBuffer::new("empty.py", "");
        assert_eq!(buffer.line_count(), 1);
        assert_eq!(buffer.line_len(0), Some(0));
    }

    #[test]
    fn test_clones_share_state() {
        let buffer = TextBuffer::new("a.py", "one");
        let handle = buffer.clone();
        handle.set_text("one\ntwo");
        assert_eq!(buffer.line_count(), 2);

        handle.close();
        assert!(!buffer.is_open());
    }

    #[test]
    fn test_closed_buffer_rejects_highlights() {
        let mut buffer = TextBuffer::new("a.py", "one");
        buffer.close();
        let style = SeverityStyle::new(Severity::High, "red");
        let err = buffer.set_highlights(&style, &[]).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }
}
