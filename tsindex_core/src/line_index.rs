//! Byte-offset ⇄ (line, column) conversion, shared by the AST extractor and
//! the symbol position resolver so both compute 0-based positions the same
//! way. Columns are UTF-16 code-unit offsets (the LSP convention), not byte
//! offsets, so multi-byte identifiers position correctly in the editor.

use crate::model::Position;

pub struct LineIndex {
    /// Byte offset of the start of each line.
    line_starts: Vec<u32>,
    source: String,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self {
            line_starts,
            source: source.to_string(),
        }
    }

    pub fn position_at(&self, byte_offset: u32) -> Position {
        let line = match self.line_starts.binary_search(&byte_offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts[line] as usize;
        let offset = byte_offset as usize;
        let column = if offset > line_start && offset <= self.source.len() {
            self.source[line_start..offset].encode_utf16().count() as u32
        } else {
            0
        };
        Position::new(line as u32, column)
    }

    /// Inverse of [`position_at`]: (line, column) back to a byte offset,
    /// used by the position resolver to locate the AST node under a cursor.
    pub fn offset_at(&self, pos: Position) -> u32 {
        let line = pos.line as usize;
        if line >= self.line_starts.len() {
            return self.source.len() as u32;
        }
        let line_start = self.line_starts[line] as usize;
        let line_end = self
            .line_starts
            .get(line + 1)
            .map(|&s| s as usize)
            .unwrap_or(self.source.len());
        let line_text = &self.source[line_start..line_end];

        let mut utf16_count = 0u32;
        for (byte_idx, ch) in line_text.char_indices() {
            if utf16_count >= pos.column {
                return (line_start + byte_idx) as u32;
            }
            utf16_count += ch.len_utf16() as u32;
        }
        line_end as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_at_start_of_file_is_zero_zero() {
        let idx = LineIndex::new("export const a = 1;\nexport const b = 2;\n");
        assert_eq!(idx.position_at(0), Position::new(0, 0));
    }

    #[test]
    fn position_at_advances_line_after_newline() {
        let idx = LineIndex::new("line one\nline two\n");
        let offset = "line one\n".len() as u32;
        assert_eq!(idx.position_at(offset), Position::new(1, 0));
    }

    #[test]
    fn offset_at_round_trips_with_position_at() {
        let src = "const calculateTotal = (a, b) => a + b;\n";
        let idx = LineIndex::new(src);
        let needle = "calculateTotal";
        let byte_offset = src.find(needle).unwrap() as u32;
        let pos = idx.position_at(byte_offset);
        assert_eq!(idx.offset_at(pos), byte_offset);
    }
}
