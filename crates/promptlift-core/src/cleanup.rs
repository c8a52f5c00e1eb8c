//! Post-processing of raw alignments into readable diffs.
//!
//! These passes follow the diff-match-patch cleanup heuristics. They trade
//! edit-script minimality for fewer, larger segments that break on word and
//! line boundaries. Every pass preserves the concatenation invariant of
//! [`crate::diff`]. Lengths are measured in `char`s; string slicing uses
//! byte offsets taken at char boundaries.

use crate::diff::{DiffSegment, SegmentKind};

// ── Merge ──

/// Coalesce runs, factor shared affixes out of edits, and slide lone edits
/// until the sequence stops changing.
pub(crate) fn merge(segments: Vec<DiffSegment>) -> Vec<DiffSegment> {
    let mut current = segments;
    loop {
        let (shifted, changed) = slide_single_edits(coalesce(current));
        if !changed {
            return shifted;
        }
        current = shifted;
    }
}

/// Collapse every run of edits between two equalities into at most one
/// deletion followed by one insertion, moving shared prefix/suffix text into
/// the neighbouring equalities.
fn coalesce(segments: Vec<DiffSegment>) -> Vec<DiffSegment> {
    let mut out: Vec<DiffSegment> = Vec::with_capacity(segments.len());
    let mut deleted = String::new();
    let mut inserted = String::new();

    // A trailing empty equality flushes the last pending run.
    for seg in segments
        .into_iter()
        .chain(std::iter::once(DiffSegment::unchanged("")))
    {
        match seg.kind {
            SegmentKind::Deleted => deleted.push_str(&seg.text),
            SegmentKind::Inserted => inserted.push_str(&seg.text),
            SegmentKind::Unchanged => {
                let mut trailing = seg.text;
                if !deleted.is_empty() && !inserted.is_empty() {
                    let prefix = common_prefix(&deleted, &inserted);
                    if prefix > 0 {
                        push_unchanged(&mut out, &inserted[..prefix]);
                        deleted.drain(..prefix);
                        inserted.drain(..prefix);
                    }
                    let suffix = common_suffix(&deleted, &inserted);
                    if suffix > 0 {
                        let split = inserted.len() - suffix;
                        trailing.insert_str(0, &inserted[split..]);
                        inserted.truncate(split);
                        deleted.truncate(deleted.len() - suffix);
                    }
                }
                if !deleted.is_empty() {
                    out.push(DiffSegment::deleted(std::mem::take(&mut deleted)));
                }
                if !inserted.is_empty() {
                    out.push(DiffSegment::inserted(std::mem::take(&mut inserted)));
                }
                push_unchanged(&mut out, &trailing);
            }
        }
    }
    out
}

/// `A<ins>BA</ins>C` → `<ins>AB</ins>AC` and `A<ins>CB</ins>C` → `AC<ins>BC</ins>`.
fn slide_single_edits(mut d: Vec<DiffSegment>) -> (Vec<DiffSegment>, bool) {
    let mut changed = false;
    let mut i = 1;
    while i + 1 < d.len() {
        if d[i - 1].kind == SegmentKind::Unchanged && d[i + 1].kind == SegmentKind::Unchanged {
            let prev = d[i - 1].text.clone();
            let next = d[i + 1].text.clone();
            if !prev.is_empty() && d[i].text.ends_with(&prev) {
                let head_len = d[i].text.len() - prev.len();
                let edit = format!("{prev}{}", &d[i].text[..head_len]);
                d[i].text = edit;
                d[i + 1].text = format!("{prev}{next}");
                d.remove(i - 1);
                changed = true;
            } else if !next.is_empty() && d[i].text.starts_with(&next) {
                let edit = format!("{}{next}", &d[i].text[next.len()..]);
                d[i].text = edit;
                d[i - 1].text.push_str(&next);
                d.remove(i + 1);
                changed = true;
            }
        }
        i += 1;
    }
    (d, changed)
}

fn push_unchanged(out: &mut Vec<DiffSegment>, text: &str) {
    if text.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(last) if last.kind == SegmentKind::Unchanged => last.text.push_str(text),
        _ => out.push(DiffSegment::unchanged(text)),
    }
}

// ── Semantic cleanup ──

/// Full semantic pass over merged segments.
pub(crate) fn semantic(segments: Vec<DiffSegment>) -> Vec<DiffSegment> {
    let mut d = segments;
    if eliminate_equalities(&mut d) {
        d = merge(d);
    }
    shift_to_boundaries(&mut d);
    extract_overlaps(&mut d);
    normalize(d)
}

/// Turn equalities that are no longer than the edits on both sides into a
/// delete/insert pair. Returns whether anything changed.
fn eliminate_equalities(d: &mut Vec<DiffSegment>) -> bool {
    let mut changed = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<String> = None;
    let (mut ins_before, mut del_before) = (0usize, 0usize);
    let (mut ins_after, mut del_after) = (0usize, 0usize);

    let mut i = 0;
    while i < d.len() {
        if d[i].kind == SegmentKind::Unchanged {
            equalities.push(i);
            ins_before = ins_after;
            del_before = del_after;
            ins_after = 0;
            del_after = 0;
            last_equality = Some(d[i].text.clone());
            i += 1;
            continue;
        }

        match d[i].kind {
            SegmentKind::Inserted => ins_after += d[i].char_len(),
            _ => del_after += d[i].char_len(),
        }

        let collapsible = match &last_equality {
            Some(eq) if !eq.is_empty() => {
                let n = eq.chars().count();
                n <= ins_before.max(del_before) && n <= ins_after.max(del_after)
            }
            _ => false,
        };

        if collapsible
            && let (Some(at), Some(eq)) = (equalities.pop(), last_equality.take())
        {
            d.insert(at, DiffSegment::deleted(eq));
            d[at + 1].kind = SegmentKind::Inserted;
            // The previous equality must be re-evaluated as well.
            equalities.pop();
            i = equalities.last().map_or(0, |&e| e + 1);
            ins_before = 0;
            del_before = 0;
            ins_after = 0;
            del_after = 0;
            changed = true;
            continue;
        }
        i += 1;
    }
    changed
}

/// Slide single edits surrounded by equalities onto the best-scoring
/// boundary, e.g. `The c<ins>at c</ins>ame.` → `The <ins>cat </ins>came.`
fn shift_to_boundaries(d: &mut Vec<DiffSegment>) {
    let mut i = 1;
    while i + 1 < d.len() {
        if d[i - 1].kind == SegmentKind::Unchanged && d[i + 1].kind == SegmentKind::Unchanged {
            let mut eq1 = d[i - 1].text.clone();
            let mut edit = d[i].text.clone();
            let mut eq2 = d[i + 1].text.clone();

            // Start from the leftmost possible position.
            let common = common_suffix(&eq1, &edit);
            if common > 0 {
                let split = edit.len() - common;
                let shared = edit[split..].to_string();
                eq1.truncate(eq1.len() - common);
                edit = format!("{shared}{}", &edit[..split]);
                eq2 = format!("{shared}{eq2}");
            }

            let mut best_score = boundary_score(&eq1, &edit) + boundary_score(&edit, &eq2);
            let mut best = (eq1.clone(), edit.clone(), eq2.clone());
            while let (Some(c), Some(next)) = (edit.chars().next(), eq2.chars().next()) {
                if c != next {
                    break;
                }
                eq1.push(c);
                edit.drain(..c.len_utf8());
                edit.push(c);
                eq2.drain(..c.len_utf8());
                let score = boundary_score(&eq1, &edit) + boundary_score(&edit, &eq2);
                // >= prefers the rightmost of equally good positions.
                if score >= best_score {
                    best_score = score;
                    best = (eq1.clone(), edit.clone(), eq2.clone());
                }
            }

            if d[i - 1].text != best.0 {
                let (best_eq1, best_edit, best_eq2) = best;
                d[i].text = best_edit;
                if best_eq2.is_empty() {
                    d.remove(i + 1);
                } else {
                    d[i + 1].text = best_eq2;
                }
                if best_eq1.is_empty() {
                    d.remove(i - 1);
                    i -= 1;
                } else {
                    d[i - 1].text = best_eq1;
                }
            }
        }
        i += 1;
    }
}

/// Score how natural the boundary between `one` and `two` is, 6 being best.
fn boundary_score(one: &str, two: &str) -> u8 {
    let (Some(c1), Some(c2)) = (one.chars().last(), two.chars().next()) else {
        // Edges of the text are the best boundaries there are.
        return 6;
    };

    let non_alnum1 = !c1.is_alphanumeric();
    let non_alnum2 = !c2.is_alphanumeric();
    let ws1 = non_alnum1 && c1.is_whitespace();
    let ws2 = non_alnum2 && c2.is_whitespace();
    let line_break1 = ws1 && (c1 == '\n' || c1 == '\r');
    let line_break2 = ws2 && (c2 == '\n' || c2 == '\r');
    let blank_line1 = line_break1 && (one.ends_with("\n\n") || one.ends_with("\n\r\n"));
    let blank_line2 = line_break2 && {
        let rest = two.strip_prefix('\r').unwrap_or(two);
        let rest = rest.strip_prefix('\n').unwrap_or("");
        let rest = rest.strip_prefix('\r').unwrap_or(rest);
        rest.starts_with('\n')
    };

    if blank_line1 || blank_line2 {
        5
    } else if line_break1 || line_break2 {
        4
    } else if non_alnum1 && !ws1 && ws2 {
        // End of sentence.
        3
    } else if ws1 || ws2 {
        2
    } else if non_alnum1 || non_alnum2 {
        1
    } else {
        0
    }
}

/// Where a deletion is followed by an insertion that overlaps it by at least
/// half of either side, pull the overlap out as an equality.
fn extract_overlaps(d: &mut Vec<DiffSegment>) {
    let mut i = 1;
    while i < d.len() {
        if d[i - 1].kind == SegmentKind::Deleted && d[i].kind == SegmentKind::Inserted {
            let deletion = d[i - 1].text.clone();
            let insertion = d[i].text.clone();
            let del_len = deletion.chars().count();
            let ins_len = insertion.chars().count();

            let forward = common_overlap(&deletion, &insertion);
            let backward = common_overlap(&insertion, &deletion);
            let forward_chars = insertion[..forward].chars().count();
            let backward_chars = deletion[..backward].chars().count();

            if forward_chars >= backward_chars {
                if forward_chars > 0
                    && (2 * forward_chars >= del_len || 2 * forward_chars >= ins_len)
                {
                    // <del>abcxxx</del><ins>xxxdef</ins> → <del>abc</del>xxx<ins>def</ins>
                    d.insert(i, DiffSegment::unchanged(&insertion[..forward]));
                    d[i - 1].text = deletion[..deletion.len() - forward].to_string();
                    d[i + 1].text = insertion[forward..].to_string();
                    i += 1;
                }
            } else if 2 * backward_chars >= del_len || 2 * backward_chars >= ins_len {
                // <del>xxxabc</del><ins>defxxx</ins> → <ins>def</ins>xxx<del>abc</del>
                d.insert(i, DiffSegment::unchanged(&deletion[..backward]));
                d[i - 1] = DiffSegment::inserted(&insertion[..insertion.len() - backward]);
                d[i + 1] = DiffSegment::deleted(&deletion[backward..]);
                i += 1;
            }
            i += 1;
        }
        i += 1;
    }
}

/// Drop empty segments and merge same-kind neighbours.
fn normalize(segments: Vec<DiffSegment>) -> Vec<DiffSegment> {
    let mut out: Vec<DiffSegment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if seg.text.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.kind == seg.kind => last.text.push_str(&seg.text),
            _ => out.push(seg),
        }
    }
    out
}

// ── String helpers (byte lengths at char boundaries) ──

fn common_prefix(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

fn common_suffix(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

/// Longest suffix of `a` that is also a prefix of `b`.
fn common_overlap(a: &str, b: &str) -> usize {
    a.char_indices()
        .find(|&(i, _)| b.starts_with(&a[i..]))
        .map_or(0, |(i, _)| a.len() - i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{reconstruct_original, reconstruct_revised};

    fn e(t: &str) -> DiffSegment {
        DiffSegment::unchanged(t)
    }
    fn ins(t: &str) -> DiffSegment {
        DiffSegment::inserted(t)
    }
    fn del(t: &str) -> DiffSegment {
        DiffSegment::deleted(t)
    }

    #[test]
    fn affix_helpers_respect_char_boundaries() {
        assert_eq!(common_prefix("héllo", "hélp"), "hél".len());
        assert_eq!(common_suffix("naïve", "waïve"), "aïve".len());
        assert_eq!(common_prefix("abc", "xyz"), 0);
        assert_eq!(common_overlap("123456xxx", "xxxabcd"), 3);
        assert_eq!(common_overlap("abc", "abcd"), 3);
        assert_eq!(common_overlap("fi", "\u{fb01}i"), 0);
        assert_eq!(common_overlap("", "abc"), 0);
    }

    #[test]
    fn merge_coalesces_runs() {
        let merged = merge(vec![e("a"), del("b"), ins("c"), del("d"), ins("e"), e("f")]);
        assert_eq!(merged, vec![e("a"), del("bd"), ins("ce"), e("f")]);
    }

    #[test]
    fn merge_factors_prefix_and_suffix() {
        let merged = merge(vec![e("x"), del("abc"), ins("abdc"), e("y")]);
        assert_eq!(merged, vec![e("xab"), ins("d"), e("cy")]);
    }

    #[test]
    fn merge_slides_edit_left() {
        let merged = merge(vec![e("a"), ins("ba"), e("c")]);
        assert_eq!(merged, vec![ins("ab"), e("ac")]);
    }

    #[test]
    fn merge_slides_edit_right() {
        let merged = merge(vec![e("a"), ins("cb"), e("c")]);
        assert_eq!(merged, vec![e("ac"), ins("bc")]);
    }

    #[test]
    fn small_equality_is_eliminated() {
        let d = semantic(vec![del("ab"), e("cd"), del("e"), ins("f"), e("g")]);
        // "cd" is not <= the 1-char edits after it: kept.
        assert_eq!(d, vec![del("ab"), e("cd"), del("e"), ins("f"), e("g")]);

        let d = semantic(vec![del("a"), e("b"), del("c")]);
        assert_eq!(d, vec![del("abc"), ins("b")]);
    }

    #[test]
    fn backpass_elimination() {
        let d = semantic(vec![ins("ab"), e("cd"), del("e"), e("f"), ins("g")]);
        assert_eq!(d, vec![del("cdef"), ins("abcdfg")]);
    }

    #[test]
    fn lossless_shift_to_word_boundary() {
        let mut d = vec![e("The c"), ins("ow and the c"), e("at.")];
        shift_to_boundaries(&mut d);
        assert_eq!(d, vec![e("The "), ins("cow and the "), e("cat.")]);
    }

    #[test]
    fn lossless_shift_to_blank_line() {
        let mut d = vec![e("AAA\r\n\r\nBBB"), ins(" DDD\r\n\r\nBBB"), e(" EEE")];
        shift_to_boundaries(&mut d);
        assert_eq!(d, vec![e("AAA\r\n\r\n"), ins("BBB DDD\r\n\r\n"), e("BBB EEE")]);
    }

    #[test]
    fn lossless_shift_can_consume_equality() {
        let mut d = vec![e("a"), del("a"), e("ax")];
        shift_to_boundaries(&mut d);
        assert_eq!(d, vec![del("a"), e("aax")]);
    }

    #[test]
    fn overlap_is_extracted() {
        let mut d = vec![del("abcxxx"), ins("xxxdef")];
        extract_overlaps(&mut d);
        assert_eq!(d, vec![del("abc"), e("xxx"), ins("def")]);

        let mut d = vec![del("xxxabc"), ins("defxxx")];
        extract_overlaps(&mut d);
        assert_eq!(d, vec![ins("def"), e("xxx"), del("abc")]);
    }

    #[test]
    fn small_overlap_is_left_alone() {
        let mut d = vec![del("abcxx"), ins("xxdefghi")];
        extract_overlaps(&mut d);
        assert_eq!(d, vec![del("abcxx"), ins("xxdefghi")]);
    }

    #[test]
    fn boundary_scores() {
        assert_eq!(boundary_score("", "abc"), 6);
        assert_eq!(boundary_score("a\n\n", "b"), 5);
        assert_eq!(boundary_score("a", "\r\n\r\nb"), 5);
        assert_eq!(boundary_score("a\n", "b"), 4);
        assert_eq!(boundary_score("end.", " next"), 3);
        assert_eq!(boundary_score("word", " next"), 2);
        assert_eq!(boundary_score("a-", "b"), 1);
        assert_eq!(boundary_score("ab", "cd"), 0);
    }

    #[test]
    fn normalize_drops_empties_and_merges() {
        let d = normalize(vec![e("a"), ins(""), e("b"), del("c"), del("d")]);
        assert_eq!(d, vec![e("ab"), del("cd")]);
    }

    #[test]
    fn semantic_preserves_both_sides() {
        let raw = vec![
            e("The "),
            del("qu"),
            ins("sl"),
            e("i"),
            del("ck"),
            ins("ow"),
            e(" brown fox"),
        ];
        let original = reconstruct_original(&raw);
        let revised = reconstruct_revised(&raw);
        let d = semantic(merge(raw));
        assert_eq!(reconstruct_original(&d), original);
        assert_eq!(reconstruct_revised(&d), revised);
        assert_eq!(d, vec![e("The "), del("quick"), ins("sliow"), e(" brown fox")]);
    }
}
