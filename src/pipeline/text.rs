//! Labeled OCR segments and their assembly into document text.

use std::fmt::Write as _;

/// Text recovered by one engine configuration, tagged with its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSegment {
    pub label: String,
    pub text: String,
}

/// All non-empty segments recovered for one page, in combination order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTextBlock {
    segments: Vec<LabeledSegment>,
}

impl PageTextBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment unless its text is blank. Returns whether it was kept.
    ///
    /// The engine's text is kept as recovered apart from trailing line
    /// breaks and page feeds, so layout indentation survives.
    pub fn push_if_nonempty(&mut self, label: impl Into<String>, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let text = text.trim_end_matches(['\n', '\r', '\x0c']);
        self.segments.push(LabeledSegment {
            label: label.into(),
            text: text.to_string(),
        });
        true
    }

    pub fn segments(&self) -> &[LabeledSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn render_into(&self, out: &mut String) {
        for segment in &self.segments {
            let _ = writeln!(out, "--- {} ---", segment.label);
            out.push_str(&segment.text);
            out.push('\n');
        }
    }
}

/// Per-page blocks of one document, kept in ascending page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentText {
    pages: Vec<(u32, PageTextBlock)>,
}

impl DocumentText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the block for `page`.
    ///
    /// Pages must arrive in strictly increasing order; an out-of-order page
    /// is rejected and returned to the caller.
    pub fn push_page(&mut self, page: u32, block: PageTextBlock) -> Result<(), PageTextBlock> {
        if self.pages.last().is_some_and(|(last, _)| *last >= page) {
            return Err(block);
        }
        self.pages.push((page, block));
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages whose block ended up empty.
    pub fn empty_pages(&self) -> usize {
        self.pages.iter().filter(|(_, b)| b.is_empty()).count()
    }

    /// Render as `=== PAGE n ===` headers, each followed by its labeled
    /// segments, with a blank line between pages.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, (number, block)) in self.pages.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "=== PAGE {} ===", number);
            block.render_into(&mut out);
        }
        out
    }
}
