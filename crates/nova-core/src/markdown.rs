//! Minimal markdown substitution for chat text.
//!
//! Only three constructs are recognised: `**bold**`, `` `code` `` and
//! newlines. Markers never span lines. Transforms are pure functions of the
//! whole text, so re-running them on a growing buffer is always safe.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStyle {
    Plain,
    Bold,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub style: SegmentStyle,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), style: SegmentStyle::Plain }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self { text: text.into(), style: SegmentStyle::Bold }
    }

    pub fn code(text: impl Into<String>) -> Self {
        Self { text: text.into(), style: SegmentStyle::Code }
    }
}

/// A line of styled segments. An empty line renders as a blank line.
pub type MarkupLine = Vec<Segment>;

/// Display form of a message body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup {
    pub lines: Vec<MarkupLine>,
}

impl Markup {
    /// Text as-is, split into lines with no styling.
    pub fn plain(text: &str) -> Self {
        let lines = text
            .split('\n')
            .map(|line| {
                if line.is_empty() {
                    Vec::new()
                } else {
                    vec![Segment::plain(line)]
                }
            })
            .collect();
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.iter().all(|s| s.text.is_empty()))
    }

    /// Concatenated text with styling dropped and lines joined by `\n`.
    pub fn to_plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.iter().map(|s| s.text.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn count_style(&self, style: SegmentStyle) -> usize {
        self.lines.iter().flatten().filter(|s| s.style == style).count()
    }
}

/// Pure function from accumulated text to display markup.
pub trait TextTransform: Send + Sync {
    fn render(&self, text: &str) -> Markup;
}

/// Bold and newline only. Used while a response is streaming in.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingTransform;

/// Bold, inline code and newline. Used for complete messages such as
/// loaded history.
#[derive(Debug, Clone, Copy, Default)]
pub struct FinalTransform;

impl TextTransform for StreamingTransform {
    fn render(&self, text: &str) -> Markup {
        Markup {
            lines: text.split('\n').map(|line| render_line(line, false)).collect(),
        }
    }
}

impl TextTransform for FinalTransform {
    fn render(&self, text: &str) -> Markup {
        Markup {
            lines: text.split('\n').map(|line| render_line(line, true)).collect(),
        }
    }
}

/// Which transforms apply where.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Use the final transform (with inline code) for live streams too.
    pub inline_code_while_streaming: bool,
}

impl RenderOptions {
    pub fn streaming(&self) -> &'static dyn TextTransform {
        if self.inline_code_while_streaming {
            &FinalTransform
        } else {
            &StreamingTransform
        }
    }

    pub fn history(&self) -> &'static dyn TextTransform {
        &FinalTransform
    }
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("static bold pattern"))
}

fn code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`(.*?)`").expect("static code pattern"))
}

fn render_line(line: &str, with_code: bool) -> MarkupLine {
    let mut segments = Vec::new();
    let mut last = 0;

    // Bold is matched first; code spans are then matched inside each piece.
    for caps in bold_re().captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_styled(&mut segments, &line[last..whole.start()], SegmentStyle::Plain, with_code);
        push_styled(&mut segments, inner.as_str(), SegmentStyle::Bold, with_code);
        last = whole.end();
    }
    push_styled(&mut segments, &line[last..], SegmentStyle::Plain, with_code);

    segments
}

fn push_styled(out: &mut MarkupLine, text: &str, style: SegmentStyle, with_code: bool) {
    if !with_code {
        push_segment(out, text, style);
        return;
    }

    let mut last = 0;
    for caps in code_re().captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_segment(out, &text[last..whole.start()], style);
        push_segment(out, inner.as_str(), SegmentStyle::Code);
        last = whole.end();
    }
    push_segment(out, &text[last..], style);
}

fn push_segment(out: &mut MarkupLine, text: &str, style: SegmentStyle) {
    if text.is_empty() {
        return;
    }
    // Merge neighbours of the same style so output doesn't depend on where
    // matches happened to split the text.
    if let Some(prev) = out.last_mut() {
        if prev.style == style {
            prev.text.push_str(text);
            return;
        }
    }
    out.push(Segment { text: text.to_string(), style });
}
