//! Call-site attribution: `receiver.method(...)` -> `(client, method)`.

use super::usage_index::ClientIndex;
use super::usage_infer::{expr_path, VarTypes};
use crate::syntax::{walk_expr, walk_module, Expr, ParsedModule, Visit};

/// One attributed call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSighting {
    pub client: String,
    pub method: String,
    pub line: usize,
    /// Resolved through inferred receiver types, not by method name alone.
    pub precise: bool,
}

/// Resolves the client type of a call receiver from the variable map.
///
/// Handles `x.m()`, `a.b.m()` (path lookup, bare attribute lookup, then one
/// property hop), and one level of chained calls: `f().m()`,
/// `Client().m()`, `Client.create().m()`, `x.g().m()`.
pub fn resolve_receiver(receiver: &Expr, vars: &VarTypes, index: &ClientIndex) -> Option<String> {
    match receiver {
        Expr::Name(id) => vars.get(id).cloned(),
        Expr::Attribute { value, attr } => vars
            .get(&format!("{}.{}", expr_path(value), attr))
            .or_else(|| vars.get(attr))
            .cloned()
            .or_else(|| {
                let owner = vars.get(&expr_path(value))?;
                index.property_type(owner, attr).map(String::from)
            }),
        Expr::Call { func, .. } => match func.as_ref() {
            Expr::Name(id) if index.is_client(id) => Some(id.clone()),
            Expr::Name(id) => index.function_return(id).map(String::from),
            Expr::Attribute { value, attr } => match value.as_ref() {
                Expr::Name(id) if index.is_client(id) => Some(id.clone()),
                Expr::Name(id) => {
                    let owner = vars.get(id)?;
                    index.method_return(owner, attr).map(String::from)
                }
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

/// Attributes one call, precise inference first, name matching second.
pub fn attribute_call(call: &Expr, vars: &VarTypes, index: &ClientIndex) -> Option<CallSighting> {
    let Expr::Call { func, line, .. } = call else {
        return None;
    };
    let Expr::Attribute { value, attr } = func.as_ref() else {
        return None;
    };

    if let Some(client) = resolve_receiver(value, vars, index) {
        if index.exposes(&client, attr) {
            return Some(CallSighting {
                client,
                method: attr.clone(),
                line: *line,
                precise: true,
            });
        }
    }

    index.attribute_by_name(attr).map(|client| CallSighting {
        client: client.to_string(),
        method: attr.clone(),
        line: *line,
        precise: false,
    })
}

struct CallCollector<'v> {
    vars: &'v VarTypes,
    index: &'v ClientIndex,
    sightings: Vec<CallSighting>,
}

impl<'ast, 'v> Visit<'ast> for CallCollector<'v> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let Some(sighting) = attribute_call(expr, self.vars, self.index) {
            self.sightings.push(sighting);
        }
        walk_expr(self, expr);
    }
}

/// Every attributed call in `module`, in source order.
pub fn attribute_calls(module: &ParsedModule, vars: &VarTypes, index: &ClientIndex) -> Vec<CallSighting> {
    let mut collector = CallCollector {
        vars,
        index,
        sightings: Vec::new(),
    };
    walk_module(&mut collector, module);
    collector.sightings
}
