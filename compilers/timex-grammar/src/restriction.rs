//! Removal of `include="false"` spans from a matched value.
//!
//! Spans are offsets relative to the start of the match. They are walked
//! in the order given (callers pass the last declared group first) and
//! folded into a single pending span; whenever the next span is not
//! contiguous with it, the pending span becomes a cut. Cuts are only
//! applied at the end, from the highest offset down, so every recorded
//! offset still refers to the untouched match text.

use std::ops::Range;

/// Characters trimmed from both ends of a value, and allowed between two
/// restricted spans that should be removed as one.
pub const TRIMMED_CHARS: [char; 7] = [' ', '\t', '\n', '\r', '\x0B', '\x0C', ','];

pub fn is_trimmed(c: char) -> bool {
    TRIMMED_CHARS.contains(&c)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn union(&self, other: Span) -> Span {
        let start = self.start.min(other.start);
        Span::new(start, self.end().max(other.end()) - start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing is pending; start from this span.
    Seed,
    /// Contiguous with the pending span; grow it.
    Merge,
    /// Disjoint; cut the pending span and start over from this one.
    Cut,
}

/// Contiguous means overlapping, touching, or separated only by trimmable
/// characters on either side.
pub fn decide(text: &str, pending: Option<Span>, span: Span) -> Decision {
    let Some(pending) = pending else {
        return Decision::Seed;
    };

    if span.start <= pending.end() && pending.start <= span.end() {
        return Decision::Merge;
    }

    let gap = if span.end() < pending.start {
        &text[span.end()..pending.start]
    } else {
        &text[pending.end()..span.start]
    };

    if gap.chars().all(is_trimmed) {
        Decision::Merge
    } else {
        Decision::Cut
    }
}

/// Folds the walked spans into the list of regions to cut. Empty spans are
/// ignored.
pub fn plan_cuts(text: &str, spans: impl IntoIterator<Item = Span>) -> Vec<Span> {
    let mut cuts = Vec::new();
    let mut pending: Option<Span> = None;

    for span in spans.into_iter().filter(|span| span.len > 0) {
        pending = match (decide(text, pending, span), pending) {
            (Decision::Merge, Some(current)) => Some(current.union(span)),
            (Decision::Cut, Some(current)) => {
                cuts.push(current);
                Some(span)
            }
            _ => Some(span),
        };
    }

    cuts.extend(pending);
    settle(text, cuts)
}

/// Sorts and coalesces cuts. A cut with whitespace on both sides of its
/// seam also takes the whitespace run after it, so no double gap is left.
fn settle(text: &str, mut cuts: Vec<Span>) -> Vec<Span> {
    cuts.sort_by_key(|cut| cut.start);

    let mut settled: Vec<Span> = Vec::with_capacity(cuts.len());
    for cut in cuts {
        match settled.last_mut() {
            Some(last) if cut.start <= last.end() => *last = last.union(cut),
            _ => settled.push(cut),
        }

        if let Some(last) = settled.last_mut() {
            let before = text[..last.start].chars().next_back();
            if before.is_some_and(char::is_whitespace) {
                let rest = &text[last.end()..];
                last.len += rest.len() - rest.trim_start_matches(char::is_whitespace).len();
            }
        }
    }
    settled
}

/// The value left after removal and trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub value: String,
    /// Offset, in the original text, of the first surviving character.
    pub offset: usize,
}

pub fn remove_spans(text: &str, spans: impl IntoIterator<Item = Span>) -> Removal {
    let cuts = plan_cuts(text, spans);

    let mut working = text.to_string();
    for cut in cuts.iter().rev() {
        working.replace_range(cut.range(), "");
    }

    let trimmed_start = working.trim_start_matches(is_trimmed);
    let leading = working.len() - trimmed_start.len();
    let value = trimmed_start.trim_end_matches(is_trimmed).to_string();

    Removal {
        value,
        offset: original_offset(&cuts, leading),
    }
}

/// Maps an offset in the cut text back to the original text.
fn original_offset(cuts: &[Span], working_offset: usize) -> usize {
    let mut offset = working_offset;
    for cut in cuts {
        if cut.start > offset {
            break;
        }
        offset += cut.len;
    }
    offset
}
