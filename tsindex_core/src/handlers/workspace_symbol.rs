//! Workspace Symbol search (spec §4.10.3): routes to prefix or fulltext
//! mode by query length and enforces the hard result cap.

use crate::indexer::Indexer;
use crate::merged_index::{RankingContext, ScoredSymbol};

pub const MAX_RESULTS: usize = 200;

pub fn workspace_symbol(indexer: &Indexer, query: &str, ctx: &RankingContext) -> Vec<ScoredSymbol> {
    if query.is_empty() {
        return Vec::new();
    }
    indexer.merged.search_symbols(query, MAX_RESULTS, ctx)
}
