//! Symbol Position Resolver (spec §4.9): given `(file, line, column)`,
//! reparses the file and returns the deepest-matching symbol whose range
//! contains the cursor, or parses a member-access chain under the cursor.

use crate::extractor::analyze_file;
use crate::cancellation::CancellationToken;
use crate::line_index::LineIndex;
use crate::model::{Position, Symbol};
use oxc_allocator::Allocator;
use oxc_ast::ast::{Expression, MemberExpression};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::Path;

/// `symbolAtCursor`: reruns extraction for `content` and returns the
/// smallest-range symbol containing `pos`, preferring the most deeply
/// nested container (member > property > class, say) when ranges overlap.
pub fn symbol_at_cursor(uri: &str, content: &str, pos: Position) -> Option<Symbol> {
    let token = CancellationToken::new();
    let record = analyze_file(uri, content, &token);
    record
        .symbols
        .into_iter()
        .filter(|s| s.range.contains(pos))
        .min_by_key(|s| range_span(s))
}

fn range_span(symbol: &Symbol) -> (u32, u32) {
    let lines = symbol.range.end.line.saturating_sub(symbol.range.start.line);
    let cols = symbol.range.end.column.saturating_sub(symbol.range.start.column);
    (lines, cols)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAccess {
    pub base_name: String,
    /// Properties from base to cursor, e.g. `a.b.c` at `c` → `["b", "c"]`.
    pub property_chain: Vec<String>,
}

struct MemberAccessFinder<'a> {
    lines: &'a LineIndex,
    target_offset: u32,
    found: Option<MemberAccess>,
}

impl<'a> MemberAccessFinder<'a> {
    fn record_if_contains(&mut self, member: &MemberExpression<'a>) {
        use oxc_span::GetSpan;
        let span = member.span();
        if span.start > self.target_offset || span.end < self.target_offset {
            return;
        }
        let Some((base, mut chain)) = flatten_member_chain(member) else {
            return;
        };
        // Prefer the innermost (shortest span) match found so far.
        if self
            .found
            .as_ref()
            .map(|existing| existing.property_chain.len() >= chain.len())
            .unwrap_or(true)
        {
            chain.dedup();
            self.found = Some(MemberAccess {
                base_name: base,
                property_chain: chain,
            });
        }
    }
}

fn flatten_member_chain<'a>(member: &MemberExpression<'a>) -> Option<(String, Vec<String>)> {
    let MemberExpression::StaticMemberExpression(m) = member else {
        return None;
    };
    let property = m.property.name.to_string();
    match &m.object {
        Expression::Identifier(id) => Some((id.name.to_string(), vec![property])),
        Expression::StaticMemberExpression(inner) => {
            let inner_property = inner.property.name.to_string();
            let (base, mut chain) = flatten_object(&inner.object, inner_property)?;
            chain.push(property);
            Some((base, chain))
        }
        _ => None,
    }
}

/// Walks left through a chain of static member accesses, accumulating
/// property names until it bottoms out at the base identifier.
fn flatten_object<'a>(object: &Expression<'a>, innermost_property: String) -> Option<(String, Vec<String>)> {
    match object {
        Expression::Identifier(id) => Some((id.name.to_string(), vec![innermost_property])),
        Expression::StaticMemberExpression(inner) => {
            let property = inner.property.name.to_string();
            let (base, mut chain) = flatten_object(&inner.object, property)?;
            chain.push(innermost_property);
            Some((base, chain))
        }
        _ => None,
    }
}

impl<'a> Visit<'a> for MemberAccessFinder<'a> {
    fn visit_member_expression(&mut self, member: &MemberExpression<'a>) {
        self.record_if_contains(member);
        walk::walk_member_expression(self, member);
    }
}

/// `parseMemberAccess(text, line, col)`: at a cursor within a chained member
/// expression, returns the base identifier and the full property chain.
pub fn parse_member_access(uri: &str, content: &str, pos: Position) -> Option<MemberAccess> {
    let lines = LineIndex::new(content);
    let target_offset = lines.offset_at(pos);

    let allocator = Allocator::default();
    let path = Path::new(uri);
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let source_type = SourceType::from_path(path)
        .unwrap_or_default()
        .with_typescript(true)
        .with_jsx(matches!(ext, "tsx" | "jsx"));
    let ret = Parser::new(&allocator, content, source_type).parse();

    let mut finder = MemberAccessFinder {
        lines: &lines,
        target_offset,
        found: None,
    };
    finder.visit_program(&ret.program);
    finder.found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_at_cursor_finds_function_declaration() {
        let content = "export function calculateTotal(a: number, b: number) { return a + b; }\n";
        let col = content.find("calculateTotal").unwrap() as u32;
        let symbol = symbol_at_cursor("/a.ts", content, Position::new(0, col + 2));
        assert_eq!(symbol.unwrap().name, "calculateTotal");
    }

    #[test]
    fn parse_member_access_returns_base_and_chain() {
        let content = "const x = ns.foo.bar;\n";
        let col = content.find("bar").unwrap() as u32;
        let access = parse_member_access("/a.ts", content, Position::new(0, col + 1)).unwrap();
        assert_eq!(access.base_name, "ns");
        assert_eq!(access.property_chain, vec!["foo".to_string(), "bar".to_string()]);
    }
}
