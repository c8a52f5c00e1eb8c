//! Terminal rendering of diffs, shared prompts, and the gallery.
//!
//! Colored output marks insertions green and underlined, deletions red and
//! struck through. Plain output wraps them in `{+…+}` and `[-…-]`.

use colored::Colorize;
use promptlift_core::{DiffSegment, DiffStats, GalleryEntry, SegmentKind, SharedView};

const PREVIEW_CHARS: usize = 72;

// ── Public API ──

/// Print a diff followed by its change summary.
pub fn print_diff(segments: &[DiffSegment], plain: bool) {
    println!("{}", render_segments(segments, plain));
    println!();
    println!("{}", stats_line(&DiffStats::from_segments(segments)));
}

/// Print a shared prompt as a card: both texts, then the diff.
pub fn print_shared(view: &SharedView, plain: bool) {
    println!("=== Shared prompt {} ===", view.id);
    println!();
    print_block("Original", &view.original_prompt);
    print_block("Improved", &view.improved_prompt);
    println!("Changes");
    println!("{}", indent(&render_segments(&view.segments, plain)));
    println!();
    println!("  {}", stats_line(&DiffStats::from_segments(&view.segments)));
}

/// Print one line per gallery entry with its link.
pub fn print_gallery(entries: &[GalleryEntry]) {
    if entries.is_empty() {
        println!("The gallery is empty.");
        return;
    }
    println!("=== Gallery ({} prompts) ===", entries.len());
    for entry in entries {
        println!();
        println!("  {}", preview(&entry.original_prompt, PREVIEW_CHARS));
        println!("  {:<10} {}", "link", entry.link);
    }
}

// ── Rendering ──

pub fn render_segments(segments: &[DiffSegment], plain: bool) -> String {
    segments
        .iter()
        .map(|seg| {
            if plain {
                render_plain(seg)
            } else {
                render_colored(seg)
            }
        })
        .collect()
}

fn render_plain(seg: &DiffSegment) -> String {
    match seg.kind {
        SegmentKind::Unchanged => seg.text.clone(),
        SegmentKind::Inserted => format!("{{+{}+}}", seg.text),
        SegmentKind::Deleted => format!("[-{}-]", seg.text),
    }
}

fn render_colored(seg: &DiffSegment) -> String {
    match seg.kind {
        SegmentKind::Unchanged => seg.text.clone(),
        SegmentKind::Inserted => seg.text.green().underline().to_string(),
        SegmentKind::Deleted => seg.text.red().strikethrough().to_string(),
    }
}

pub fn stats_line(stats: &DiffStats) -> String {
    if stats.is_identical() {
        return format!("no changes ({} chars)", stats.unchanged_chars);
    }
    format!(
        "+{} inserted, -{} deleted, {} unchanged",
        stats.inserted_chars, stats.deleted_chars, stats.unchanged_chars
    )
}

/// Show only the edges of an API key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 10 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

fn print_block(header: &str, text: &str) {
    println!("{header}");
    println!("{}", indent(text));
    println!();
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// First line of `text`, cut to `max` chars.
fn preview(text: &str, max: usize) -> String {
    let first = text.lines().next().unwrap_or("");
    if first.chars().count() <= max && !text.contains('\n') {
        return first.to_string();
    }
    let cut: String = first.chars().take(max).collect();
    format!("{cut}…")
}
