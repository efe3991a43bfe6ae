//! Canonical source rendering of lowered expressions.
//!
//! Produces the annotation text stored in the API model, e.g.
//! `Optional[Dict[str, 'pkg.Widget']]` or `Widget | None`.

use super::Expr;

impl Expr {
    /// Renders the expression as normalized Python source.
    pub fn to_source(&self) -> String {
        match self {
            Expr::Name(id) => id.clone(),
            Expr::Attribute { value, attr } => format!("{}.{}", value.to_source(), attr),
            Expr::Subscript { value, slice } => {
                format!("{}[{}]", value.to_source(), render_slice(slice))
            }
            Expr::Union { left, right } => format!("{} | {}", left.to_source(), right.to_source()),
            Expr::Str(s) => quote(s),
            Expr::Constant(text) => text.clone(),
            Expr::Tuple(items) => match items.as_slice() {
                [single] => format!("({},)", single.to_source()),
                _ => format!("({})", join(items)),
            },
            Expr::List(items) => format!("[{}]", join(items)),
            Expr::Call { func, args, .. } => format!("{}({})", func.to_source(), join(args)),
            Expr::Await(inner) => format!("await {}", inner.to_source()),
            Expr::Other { text, .. } => collapse_whitespace(text),
        }
    }
}

fn join(items: &[Expr]) -> String {
    items
        .iter()
        .map(Expr::to_source)
        .collect::<Vec<_>>()
        .join(", ")
}

// Tuples inside brackets render without parentheses: `Dict[str, int]`.
fn render_slice(slice: &Expr) -> String {
    match slice {
        Expr::Tuple(items) if !items.is_empty() => join(items),
        other => other.to_source(),
    }
}

fn quote(s: &str) -> String {
    if s.contains('\'') && !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        format!("'{}'", s.replace('\'', "\\'"))
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
