//! Terminal host: plays the editor's role for the CLI
//!
//! Holds the reviewed file in a [`TextBuffer`] and prints it back with each
//! highlighted line marked by severity and its hover text underneath.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use revlight_core::buffer::TextBuffer;
use revlight_core::{BufferId, EditorBuffer, Highlight, NotifyLevel, Result, Severity, SeverityStyle};

/// Editor buffer backed by a file on disk
#[derive(Debug, Clone)]
pub struct TerminalBuffer {
    inner: TextBuffer,
    rendered: Arc<AtomicBool>,
}

impl TerminalBuffer {
    /// Open a buffer for `path` holding `text`
    pub fn open(path: &Path, text: &str) -> Self {
        Self {
            inner: TextBuffer::new(path.display().to_string(), text),
            rendered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the contents after the file changed on disk
    pub fn reload(&self, text: &str) {
        self.inner.set_text(text);
    }

    /// Mark the buffer closed
    pub fn close(&self) {
        self.inner.close();
    }

    /// Whether highlights changed since the last call
    pub fn take_rendered(&self) -> bool {
        self.rendered.swap(false, Ordering::SeqCst)
    }

    /// Annotated listing of the buffer
    pub fn report(&self) -> String {
        let highlights = self.inner.all_highlights();
        let mut out = String::new();

        for line in 0..self.inner.line_count() {
            let text = self.inner.line(line).unwrap_or_default();
            let on_line: Vec<&(Severity, Highlight)> =
                highlights.iter().filter(|(_, h)| h.line == line).collect();

            let marker = on_line
                .first()
                .map(|(severity, _)| severity_marker(*severity))
                .unwrap_or(' ');
            let _ = writeln!(out, "{} {:>4} | {}", marker, line + 1, text);

            for (_, highlight) in on_line {
                for hover_line in highlight.hover.lines() {
                    let _ = writeln!(out, "  {:>4} |   {}", "", hover_line);
                }
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{}", summary(&highlights));
        out
    }

    /// Print the annotated listing to stdout
    pub fn print_report(&self) {
        print!("{}", self.report());
    }
}

impl EditorBuffer for TerminalBuffer {
    fn id(&self) -> BufferId {
        self.inner.id()
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn text(&self) -> String {
        self.inner.text()
    }

    fn line_count(&self) -> usize {
        self.inner.line_count()
    }

    fn line_len(&self, line: usize) -> Option<usize> {
        self.inner.line_len(line)
    }

    fn set_highlights(&mut self, style: &SeverityStyle, highlights: &[Highlight]) -> Result<()> {
        self.inner.set_highlights(style, highlights)?;
        self.rendered.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info => eprintln!("{}", message),
            NotifyLevel::Warning => eprintln!("Warning: {}", message),
            NotifyLevel::Error => eprintln!("Error: {}", message),
        }
    }
}

fn severity_marker(severity: Severity) -> char {
    match severity {
        Severity::High => 'H',
        Severity::Medium => 'M',
        Severity::Low => 'L',
    }
}

fn summary(highlights: &[(Severity, Highlight)]) -> String {
    if highlights.is_empty() {
        return "No feedback.".to_string();
    }

    let counts: Vec<String> = Severity::all()
        .iter()
        .map(|severity| {
            let n = highlights.iter().filter(|(s, _)| s == severity).count();
            format!("{} {}", n, severity)
        })
        .collect();

    format!(
        "{} finding{}: {}",
        highlights.len(),
        if highlights.len() == 1 { "" } else { "s" },
        counts.join(", ")
    )
}
