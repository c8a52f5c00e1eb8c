//! HTML presentation of diff segments.
//!
//! Unchanged → `<span>`, Inserted → `<ins>`, Deleted → `<del>`, inside a
//! `diff-container` div.

use crate::diff::{DiffSegment, SegmentKind};

/// Tag name used for a segment kind.
pub fn tag_for(kind: SegmentKind) -> &'static str {
    match kind {
        SegmentKind::Unchanged => "span",
        SegmentKind::Inserted => "ins",
        SegmentKind::Deleted => "del",
    }
}

/// Render segments as an HTML fragment with escaped text.
pub fn to_html(segments: &[DiffSegment]) -> String {
    let mut out = String::from(r#"<div class="diff-container">"#);
    for seg in segments {
        let tag = tag_for(seg.kind);
        out.push_str(&format!("<{tag}>{}</{tag}>", escape(&seg.text)));
    }
    out.push_str("</div>");
    out
}

/// Minimal HTML text escaping.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
