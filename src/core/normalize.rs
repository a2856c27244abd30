//! Purpose: Text normalization backend for `n3_normalize`.
//! Exports: `TextNormalizer`, `normalize_text`.
//! Role: Canonical text form used before hashing and chunk planning during ingestion.
//! Invariants: Output uses `\n` line endings, no trailing whitespace, no trailing newline.
//! Invariants: At most one blank line separates content lines; none lead or trail.
//! Invariants: `normalize_text(normalize_text(x)) == normalize_text(x)`.
use crate::core::buffer::InputView;
use crate::core::error::Error;
use crate::core::transform::Transform;

const BOM: char = '\u{feff}';

#[derive(Clone, Copy, Debug, Default)]
pub struct TextNormalizer;

impl Transform for TextNormalizer {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, Error> {
        let text = InputView::new(input).as_str()?;
        Ok(normalize_text(text).into_bytes())
    }
}

pub fn normalize_text(text: &str) -> String {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut pending_blank = false;
    for raw in unified.split('\n') {
        let cleaned: String = raw
            .chars()
            .filter(|ch| *ch == '\t' || !ch.is_control())
            .collect();
        let line = cleaned.trim_end();
        if line.is_empty() {
            pending_blank = true;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if pending_blank {
                out.push('\n');
            }
        }
        pending_blank = false;
        out.push_str(line);
    }
    out
}
