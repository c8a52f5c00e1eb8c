//! Character-level prompt diff.
//!
//! The raw alignment comes from an [`Aligner`] (by default [`SimilarAligner`],
//! Myers over `char`s via the `similar` crate). The renderer then runs the
//! semantic cleanup in [`crate::cleanup`] so the result reads as a few
//! coherent edits instead of the shortest possible edit script.
//!
//! # Invariant
//!
//! For every rendered sequence, concatenating `Unchanged` + `Deleted` texts
//! yields the original and `Unchanged` + `Inserted` texts yields the revision.

use serde::{Deserialize, Serialize};
use similar::{Algorithm, ChangeTag, TextDiff};

use crate::cleanup;

/// How a run of text relates the original to the revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Unchanged,
    Inserted,
    Deleted,
}

/// A contiguous run of characters with a single [`SegmentKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSegment {
    pub kind: SegmentKind,
    pub text: String,
}

impl DiffSegment {
    pub fn new(kind: SegmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn unchanged(text: impl Into<String>) -> Self {
        Self::new(SegmentKind::Unchanged, text)
    }

    pub fn inserted(text: impl Into<String>) -> Self {
        Self::new(SegmentKind::Inserted, text)
    }

    pub fn deleted(text: impl Into<String>) -> Self {
        Self::new(SegmentKind::Deleted, text)
    }

    /// Length in chars, the unit the cleanup heuristics compare.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Source of raw (op, text) alignments.
///
/// Implementations only need to satisfy the concatenation invariant; chunking
/// and ordering of edits within a run are normalised afterwards.
pub trait Aligner {
    fn align(&self, original: &str, revised: &str) -> Vec<DiffSegment>;
}

/// Myers alignment over chars, backed by `similar`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarAligner;

impl Aligner for SimilarAligner {
    fn align(&self, original: &str, revised: &str) -> Vec<DiffSegment> {
        let diff = TextDiff::configure()
            .algorithm(Algorithm::Myers)
            .diff_chars(original, revised);

        let mut raw: Vec<DiffSegment> = Vec::new();
        for change in diff.iter_all_changes() {
            let kind = match change.tag() {
                ChangeTag::Equal => SegmentKind::Unchanged,
                ChangeTag::Insert => SegmentKind::Inserted,
                ChangeTag::Delete => SegmentKind::Deleted,
            };
            match raw.last_mut() {
                Some(last) if last.kind == kind => last.text.push_str(change.value()),
                _ => raw.push(DiffSegment::new(kind, change.value())),
            }
        }
        raw
    }
}

/// Render `original` → `revised` with the default aligner.
pub fn render(original: &str, revised: &str) -> Vec<DiffSegment> {
    render_with(&SimilarAligner, original, revised)
}

/// Render with a caller-supplied aligner.
pub fn render_with<A: Aligner + ?Sized>(
    aligner: &A,
    original: &str,
    revised: &str,
) -> Vec<DiffSegment> {
    // Short-circuit the trivial shapes; they need no alignment at all.
    if original == revised {
        return if original.is_empty() {
            Vec::new()
        } else {
            vec![DiffSegment::unchanged(original)]
        };
    }
    if original.is_empty() {
        return vec![DiffSegment::inserted(revised)];
    }
    if revised.is_empty() {
        return vec![DiffSegment::deleted(original)];
    }

    let raw = aligner.align(original, revised);
    let segments = cleanup::semantic(cleanup::merge(raw));
    tracing::debug!(
        original_chars = original.chars().count(),
        revised_chars = revised.chars().count(),
        segments = segments.len(),
        "rendered diff"
    );
    segments
}

/// Concatenate `Unchanged` and `Deleted` texts.
pub fn reconstruct_original(segments: &[DiffSegment]) -> String {
    collect(segments, SegmentKind::Deleted)
}

/// Concatenate `Unchanged` and `Inserted` texts.
pub fn reconstruct_revised(segments: &[DiffSegment]) -> String {
    collect(segments, SegmentKind::Inserted)
}

fn collect(segments: &[DiffSegment], side: SegmentKind) -> String {
    segments
        .iter()
        .filter(|s| s.kind == SegmentKind::Unchanged || s.kind == side)
        .map(|s| s.text.as_str())
        .collect()
}

/// Character counts per segment kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub unchanged_chars: usize,
    pub inserted_chars: usize,
    pub deleted_chars: usize,
}

impl DiffStats {
    pub fn from_segments(segments: &[DiffSegment]) -> Self {
        let mut stats = Self::default();
        for seg in segments {
            let n = seg.char_len();
            match seg.kind {
                SegmentKind::Unchanged => stats.unchanged_chars += n,
                SegmentKind::Inserted => stats.inserted_chars += n,
                SegmentKind::Deleted => stats.deleted_chars += n,
            }
        }
        stats
    }

    pub fn is_identical(&self) -> bool {
        self.inserted_chars == 0 && self.deleted_chars == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Aligner that returns a fixed script, ignoring its input.
    struct Scripted(Vec<DiffSegment>);

    impl Aligner for Scripted {
        fn align(&self, _: &str, _: &str) -> Vec<DiffSegment> {
            self.0.clone()
        }
    }

    fn assert_round_trip(a: &str, b: &str) {
        let segments = render(a, b);
        assert_eq!(reconstruct_original(&segments), a, "original side of {a:?} -> {b:?}");
        assert_eq!(reconstruct_revised(&segments), b, "revised side of {a:?} -> {b:?}");
    }

    fn assert_normalised(segments: &[DiffSegment]) {
        for seg in segments {
            assert!(!seg.text.is_empty(), "empty segment in {segments:?}");
        }
        for pair in segments.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind, "adjacent same-kind in {segments:?}");
        }
    }

    #[test]
    fn identical_text_is_one_unchanged_segment() {
        assert_eq!(render("x", "x"), vec![DiffSegment::unchanged("x")]);
    }

    #[test]
    fn both_empty_is_empty() {
        assert!(render("", "").is_empty());
    }

    #[test]
    fn empty_original_is_one_insert() {
        assert_eq!(render("", "hello"), vec![DiffSegment::inserted("hello")]);
    }

    #[test]
    fn empty_revised_is_one_delete() {
        assert_eq!(render("hello", ""), vec![DiffSegment::deleted("hello")]);
    }

    #[test]
    fn appended_sentence() {
        let segments = render("Write a poem.", "Write a poem. Make it rhyme.");
        assert_eq!(
            segments,
            vec![
                DiffSegment::unchanged("Write a poem."),
                DiffSegment::inserted(" Make it rhyme."),
            ]
        );
    }

    #[test]
    fn word_replacement_round_trips() {
        let a = "The cat sat on the mat.";
        let b = "The dog sat on the rug.";
        let segments = render(a, b);
        assert_normalised(&segments);
        assert_eq!(reconstruct_original(&segments), a);
        assert_eq!(reconstruct_revised(&segments), b);
    }

    #[test]
    fn unrelated_texts_collapse_into_one_edit() {
        // Raw Myers output interleaves the few shared letters; semantic
        // cleanup should fold them into a single replace.
        let segments = render("mouse", "sofas");
        assert_eq!(
            segments,
            vec![DiffSegment::deleted("mouse"), DiffSegment::inserted("sofas")]
        );
    }

    #[test]
    fn multibyte_text_round_trips() {
        assert_round_trip("café crème", "café au lait");
        assert_round_trip("日本語のテキスト", "日本語の短いテキスト");
        assert_round_trip("emoji 🎉 here", "emoji 🎊 there");
    }

    #[test]
    fn scripted_aligner_output_is_merged() {
        let aligner = Scripted(vec![
            DiffSegment::unchanged("a"),
            DiffSegment::inserted("x"),
            DiffSegment::deleted("b"),
            DiffSegment::inserted("y"),
            DiffSegment::unchanged(""),
            DiffSegment::unchanged("c"),
        ]);
        let segments = render_with(&aligner, "abc", "axyc");
        assert_eq!(
            segments,
            vec![
                DiffSegment::unchanged("a"),
                DiffSegment::deleted("b"),
                DiffSegment::inserted("xy"),
                DiffSegment::unchanged("c"),
            ]
        );
    }

    #[test]
    fn stats_count_chars_per_kind() {
        let segments = vec![
            DiffSegment::unchanged("ab"),
            DiffSegment::deleted("é"),
            DiffSegment::inserted("xyz"),
        ];
        let stats = DiffStats::from_segments(&segments);
        assert_eq!(stats.unchanged_chars, 2);
        assert_eq!(stats.deleted_chars, 1);
        assert_eq!(stats.inserted_chars, 3);
        assert!(!stats.is_identical());
        assert!(DiffStats::from_segments(&render("same", "same")).is_identical());
    }

    proptest! {
        #[test]
        fn round_trip_arbitrary(a in ".{0,40}", b in ".{0,40}") {
            let segments = render(&a, &b);
            for seg in &segments {
                prop_assert!(!seg.text.is_empty());
            }
            for pair in segments.windows(2) {
                prop_assert_ne!(pair[0].kind, pair[1].kind);
            }
            prop_assert_eq!(reconstruct_original(&segments), a);
            prop_assert_eq!(reconstruct_revised(&segments), b);
        }

        #[test]
        fn round_trip_small_alphabet(a in "[ab .\n]{0,30}", b in "[ab .\n]{0,30}") {
            let segments = render(&a, &b);
            for seg in &segments {
                prop_assert!(!seg.text.is_empty());
            }
            for pair in segments.windows(2) {
                prop_assert_ne!(pair[0].kind, pair[1].kind);
            }
            prop_assert_eq!(reconstruct_original(&segments), a);
            prop_assert_eq!(reconstruct_revised(&segments), b);
        }
    }
}
