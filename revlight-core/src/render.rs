//! Feedback renderer
//!
//! Maps a flat list of [`FeedbackItem`]s onto whole-line highlights, one
//! highlight set per severity. Styles live in a per-buffer [`StyleRegistry`]
//! so two buffers never share or clobber each other's decorations.
//!
//! Every render replaces the full highlight set of every style the registry
//! knows about, including severities absent from the new batch, so feedback
//! from an earlier review never lingers in the wrong color.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::buffer::{EditorBuffer, Highlight};
use crate::config::HighlightConfig;
use crate::{FeedbackItem, Severity};

/// Visual treatment for one severity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityStyle {
    /// Severity this style is drawn for
    pub severity: Severity,
    /// Background color, in whatever notation the host understands
    pub background: String,
}

impl SeverityStyle {
    /// Create a style
    pub fn new(severity: Severity, background: impl Into<String>) -> Self {
        Self {
            severity,
            background: background.into(),
        }
    }
}

/// Highlight styles registered on a single buffer
///
/// Styles are created lazily the first time a severity is rendered and kept
/// until [`StyleRegistry::clear`] tears them down.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    palette: HighlightConfig,
    styles: BTreeMap<Severity, SeverityStyle>,
}

impl StyleRegistry {
    /// Create an empty registry drawing colors from `palette`
    pub fn new(palette: HighlightConfig) -> Self {
        Self {
            palette,
            styles: BTreeMap::new(),
        }
    }

    /// Get the style for a severity, creating it on first use
    pub fn style(&mut self, severity: Severity) -> &SeverityStyle {
        let palette = &self.palette;
        self.styles
            .entry(severity)
            .or_insert_with(|| SeverityStyle::new(severity, palette.color(severity)))
    }

    /// Severities that have a style on this buffer
    pub fn registered(&self) -> impl Iterator<Item = Severity> + '_ {
        self.styles.keys().copied()
    }

    /// Number of registered styles
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Whether no style has been created yet
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Remove every highlight drawn through this registry and forget its styles
    pub fn clear<B: EditorBuffer + ?Sized>(&mut self, buffer: &mut B) {
        let styles = std::mem::take(&mut self.styles);
        if !buffer.is_open() {
            return;
        }
        for style in styles.values() {
            if let Err(e) = buffer.set_highlights(style, &[]) {
                debug!(buffer = %buffer.id(), severity = %style.severity, error = %e, "Failed to clear highlights");
            }
        }
    }
}

/// Resolve the 0-based line an item should be drawn on
///
/// Lines that are missing, zero, or past the end of the document fall back to
/// the first line. Returns `None` only for a document with no lines.
pub fn line_index(item: &FeedbackItem, line_count: usize) -> Option<usize> {
    if line_count == 0 {
        return None;
    }
    match item.line {
        Some(line) if line >= 1 && line <= line_count as u64 => Some((line - 1) as usize),
        _ => Some(0),
    }
}

/// Build the highlight for one item against the buffer's current snapshot
pub fn highlight_for<B: EditorBuffer + ?Sized>(buffer: &B, item: &FeedbackItem) -> Option<Highlight> {
    let line = line_index(item, buffer.line_count())?;
    let end_col = buffer.line_len(line).unwrap_or(0);
    Some(Highlight {
        line,
        start_col: 0,
        end_col,
        hover: item.hover_text(),
    })
}

/// Paint feedback onto a buffer
///
/// Returns the number of highlights drawn. A closed buffer is a no-op.
pub fn render<B: EditorBuffer + ?Sized>(
    buffer: &mut B,
    registry: &mut StyleRegistry,
    items: &[FeedbackItem],
) -> usize {
    if !buffer.is_open() {
        debug!(buffer = %buffer.id(), "Buffer closed, skipping render");
        return 0;
    }

    let mut grouped: BTreeMap<Severity, Vec<Highlight>> = BTreeMap::new();
    for item in items {
        match highlight_for(&*buffer, item) {
            Some(highlight) => grouped.entry(item.severity).or_default().push(highlight),
            None => debug!(buffer = %buffer.id(), "Empty document, dropping feedback item"),
        }
    }

    let mut severities: Vec<Severity> = registry.registered().collect();
    severities.extend(grouped.keys().copied());
    severities.sort_unstable_by(|a, b| b.cmp(a));
    severities.dedup();

    let mut drawn = 0;
    for severity in severities {
        let style = registry.style(severity).clone();
        let highlights = grouped.remove(&severity).unwrap_or_default();

        match buffer.set_highlights(&style, &highlights) {
            Ok(()) => drawn += highlights.len(),
            Err(e) if !buffer.is_open() => {
                debug!(buffer = %buffer.id(), error = %e, "Buffer closed during render");
                return drawn;
            }
            Err(e) => {
                warn!(buffer = %buffer.id(), severity = %severity, error = %e, "Failed to apply highlights");
            }
        }
    }

    debug!(buffer = %buffer.id(), items = items.len(), drawn, "Rendered feedback");
    drawn
}
