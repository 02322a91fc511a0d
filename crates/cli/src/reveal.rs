// ==============================================================================
// `based-typing reveal`
// ==============================================================================
//
// Prints `line:col name: type` for every assignment target and function in a
// file, in source order.

use py_ast::{parse_file, ParseError};
use py_check::{EvalMode, TypeEvalContext};

#[derive(Debug, Clone)]
pub struct RevealOptions {
    /// Only reveal these names; everything when empty.
    pub names: Vec<String>,
    pub mode: EvalMode,
    pub extension: bool,
}

pub fn reveal(source: &str, options: &RevealOptions) -> Result<Vec<String>, ParseError> {
    let tree = parse_file(source)?;
    let ctx = if options.extension {
        TypeEvalContext::with_extension(options.mode)
    } else {
        TypeEvalContext::new(options.mode)
    };
    log::debug!("revealing with {ctx:?}");

    let lines = tree
        .declarations()
        .into_iter()
        .filter(|(name, _)| options.names.is_empty() || options.names.iter().any(|n| n == name))
        .map(|(name, node)| {
            let (line, col) = tree.line_col(node.span().start);
            format!("{line}:{col} {name}: {}", ctx.type_of(node))
        })
        .collect();
    Ok(lines)
}
