use super::TextRange;
use crate::parser::{walk, walk_module, Expr, Module, NodeRef};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("range {range} is outside the source: {reason}")]
    OutOfBounds { range: TextRange, reason: String },
}

/// Finds the expression whose range is exactly `range`.
pub fn find_expression<'a>(module: &'a Module, range: &TextRange) -> Option<&'a Expr> {
    walk_module(module)
        .filter_map(NodeRef::as_expr)
        .find(|expr| expr.range().as_ref() == Some(range))
}

/// Like [`find_expression`], searching only below (and including) `start`.
pub fn find_expression_from<'a>(start: NodeRef<'a>, range: &TextRange) -> Option<&'a Expr> {
    walk(start)
        .filter_map(NodeRef::as_expr)
        .find(|expr| expr.range().as_ref() == Some(range))
}

/// Returns the exact text `range` denotes in `source`.
pub fn extract_text_range(source: &str, range: &TextRange) -> Result<String, ExtractError> {
    let out_of_bounds = |reason: String| ExtractError::OutOfBounds {
        range: *range,
        reason,
    };

    if !range.is_well_formed() {
        return Err(out_of_bounds("end precedes start".to_string()));
    }
    let lines: Vec<&str> = source.split_inclusive('\n').collect();
    if range.start_line == 0 || range.end_line > lines.len() {
        return Err(out_of_bounds(format!(
            "lines {}..={} requested, source has {}",
            range.start_line,
            range.end_line,
            lines.len()
        )));
    }

    let mut selected: Vec<String> = lines[range.start_line - 1..range.end_line]
        .iter()
        .map(|line| line.to_string())
        .collect();

    let last = selected.len() - 1;
    selected[last] = take_chars(&selected[last], 0, range.end_col)
        .ok_or_else(|| out_of_bounds(format!("end column {} past end of line", range.end_col)))?;
    let first_len = selected[0].chars().count();
    selected[0] = take_chars(&selected[0], range.start_col, first_len)
        .ok_or_else(|| out_of_bounds(format!("start column {} past end of line", range.start_col)))?;

    Ok(selected.concat())
}

/// Characters `from..to` of `line`, or `None` if `to` is past its end.
fn take_chars(line: &str, from: usize, to: usize) -> Option<String> {
    if to > line.chars().count() || from > to {
        return None;
    }
    Some(line.chars().skip(from).take(to - from).collect())
}
