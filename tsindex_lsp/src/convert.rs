//! Conversions between this crate's `lsp_types` surface and tsindex's
//! internal zero-based line / UTF-16-column position representation.

use tower_lsp::lsp_types::{Position as LspPosition, Range as LspRange, Url};
use tsindex::{Pos, Range};

pub fn position_from_lsp(pos: LspPosition) -> Pos {
    Pos::new(pos.line, pos.character)
}

pub fn position_to_lsp(pos: Pos) -> LspPosition {
    LspPosition::new(pos.line, pos.column)
}

pub fn range_to_lsp(range: Range) -> LspRange {
    LspRange::new(position_to_lsp(range.start), position_to_lsp(range.end))
}

/// tsindex keys everything by filesystem path; the LSP wire format keys by
/// `file://` URI. This is a one-way trip for every handler call.
pub fn uri_to_path(uri: &Url) -> String {
    uri.to_file_path().map(|p| p.to_string_lossy().to_string()).unwrap_or_else(|_| uri.path().to_string())
}

pub fn path_to_uri(path: &str) -> Option<Url> {
    Url::from_file_path(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_round_trips_through_lsp_shape() {
        let original = Pos::new(3, 7);
        let lsp = position_to_lsp(original);
        assert_eq!(position_from_lsp(lsp), original);
    }
}
