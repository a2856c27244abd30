//! Purpose: Chunk planning backend for `n3_chunk_plan`.
//! Exports: `ChunkOptions`, `ChunkSpan`, `ChunkPlan`, `ChunkPlanner`, `plan_chunks`.
//! Role: Split normalized text into overlapping character windows for retrieval ingestion.
//! Invariants: `ChunkOptions` only exists with `0 < max_chars` and `overlap < max_chars`.
//! Invariants: Each chunk start strictly exceeds the previous one, so planning terminates.
//! Invariants: Offsets are half-open; the last chunk ends at `total_chars`.
//! Notes: Output is the "json-v1" encoding, keys sorted.
use crate::core::buffer::InputView;
use crate::core::error::{Error, ErrorKind};
use crate::core::transform::Transform;
use serde::Serialize;

pub const CHUNK_PLAN_ENCODING: &str = "json-v1";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChunkOptions {
    max_chars: usize,
    overlap: usize,
}

impl ChunkOptions {
    pub fn new(max_chars: u32, overlap: u32) -> Result<Self, Error> {
        if max_chars == 0 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("max_chars must be greater than zero"));
        }
        if overlap >= max_chars {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!(
                    "overlap ({overlap}) must be less than max_chars ({max_chars})"
                ))
                .with_hint("Lower --overlap or raise --max-chars."));
        }
        Ok(Self {
            max_chars: max_chars as usize,
            overlap: overlap as usize,
        })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Shortest chunk a whitespace-aligned cut may produce.
    fn min_soft_len(&self) -> usize {
        (self.overlap + 1).max(self.max_chars.div_ceil(2))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ChunkSpan {
    pub byte_end: usize,
    pub byte_start: usize,
    pub char_end: usize,
    pub char_start: usize,
    pub index: usize,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ChunkPlan {
    pub chunks: Vec<ChunkSpan>,
    pub encoding: &'static str,
    pub max_chars: usize,
    pub overlap: usize,
    pub total_chars: usize,
}

pub fn plan_chunks(text: &str, options: ChunkOptions) -> ChunkPlan {
    let chars: Vec<char> = text.chars().collect();
    let mut byte_offsets: Vec<usize> = text.char_indices().map(|(idx, _)| idx).collect();
    byte_offsets.push(text.len());
    let total = chars.len();

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < total {
        let hard_end = start.saturating_add(options.max_chars).min(total);
        let end = if hard_end < total {
            soft_cut(&chars, start, hard_end, options)
        } else {
            hard_end
        };
        chunks.push(ChunkSpan {
            byte_end: byte_offsets[end],
            byte_start: byte_offsets[start],
            char_end: end,
            char_start: start,
            index: chunks.len(),
        });
        if end == total {
            break;
        }
        start = end - options.overlap;
    }

    ChunkPlan {
        chunks,
        encoding: CHUNK_PLAN_ENCODING,
        max_chars: options.max_chars,
        overlap: options.overlap,
        total_chars: total,
    }
}

fn soft_cut(chars: &[char], start: usize, hard_end: usize, options: ChunkOptions) -> usize {
    let floor = start.saturating_add(options.min_soft_len());
    let mut cut = hard_end;
    while cut >= floor {
        if chars[cut - 1].is_whitespace() {
            return cut;
        }
        cut -= 1;
    }
    hard_end
}

#[derive(Clone, Copy, Debug)]
pub struct ChunkPlanner {
    options: ChunkOptions,
}

impl ChunkPlanner {
    pub fn new(options: ChunkOptions) -> Self {
        Self { options }
    }
}

impl Transform for ChunkPlanner {
    fn name(&self) -> &'static str {
        "chunk_plan"
    }

    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, Error> {
        let text = InputView::new(input).as_str()?;
        let plan = plan_chunks(text, self.options);
        serde_json::to_vec(&plan).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode chunk plan")
                .with_source(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ChunkOptions, ChunkPlanner, plan_chunks};
    use crate::core::error::ErrorKind;
    use crate::core::transform::Transform;
    use serde_json::Value;

    fn spans(text: &str, max: u32, overlap: u32) -> Vec<(usize, usize)> {
        let options = ChunkOptions::new(max, overlap).expect("options");
        plan_chunks(text, options)
            .chunks
            .iter()
            .map(|chunk| (chunk.char_start, chunk.char_end))
            .collect()
    }

    #[test]
    fn rejects_non_terminating_options() {
        for (max, overlap) in [(0, 0), (5, 5), (5, 9), (1, 1), (0, 3)] {
            let err = ChunkOptions::new(max, overlap).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Usage, "({max}, {overlap})");
        }
    }

    #[test]
    fn empty_text_has_no_chunks() {
        let plan = plan_chunks("", ChunkOptions::new(10, 2).expect("options"));
        assert!(plan.chunks.is_empty());
        assert_eq!(plan.total_chars, 0);
    }

    #[test]
    fn hard_cuts_with_overlap() {
        assert_eq!(spans("abcdefghij", 4, 1), vec![(0, 4), (3, 7), (6, 10)]);
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(spans("abc", 10, 3), vec![(0, 3)]);
    }

    #[test]
    fn prefers_whitespace_boundaries() {
        assert_eq!(spans("hello world foo", 8, 0), vec![(0, 6), (6, 12), (12, 15)]);
    }

    #[test]
    fn starts_strictly_advance_with_max_overlap() {
        let text = "a b c d e f g h i j k l m n o p";
        let plan = plan_chunks(text, ChunkOptions::new(3, 2).expect("options"));
        for pair in plan.chunks.windows(2) {
            assert!(pair[1].char_start > pair[0].char_start);
        }
        assert_eq!(plan.chunks.last().expect("last").char_end, plan.total_chars);
    }

    #[test]
    fn byte_offsets_track_multibyte_chars() {
        let plan = plan_chunks("ééé", ChunkOptions::new(2, 0).expect("options"));
        let bytes: Vec<(usize, usize)> = plan
            .chunks
            .iter()
            .map(|chunk| (chunk.byte_start, chunk.byte_end))
            .collect();
        assert_eq!(bytes, vec![(0, 4), (4, 6)]);
    }

    #[test]
    fn planner_emits_sorted_json() {
        let planner = ChunkPlanner::new(ChunkOptions::new(4, 1).expect("options"));
        let out = planner.apply(b"abcdef").expect("plan");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("{\"chunks\":[{\"byte_end\":4,"));
        let value: Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["encoding"], "json-v1");
        assert_eq!(value["total_chars"], 6);
        assert_eq!(value["chunks"].as_array().map(|items| items.len()), Some(2));
    }

    #[test]
    fn maximal_window_covers_text_in_one_chunk() {
        assert_eq!(spans("two words", u32::MAX, u32::MAX - 1), vec![(0, 9)]);
        assert_eq!(spans("x", u32::MAX, 0), vec![(0, 1)]);
    }
}
