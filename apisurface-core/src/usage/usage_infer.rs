//! Flow-insensitive receiver-type inference for one sample file.
//!
//! A single walk over every assignment in the file, in source order; the
//! last assignment seen for a variable wins. Only facts from the
//! [`ClientIndex`] are used, never name similarity.

use std::collections::HashMap;

use super::usage_index::ClientIndex;
use crate::syntax::{walk_module, walk_stmt, Expr, ParsedModule, Stmt, Visit};

/// Variable or dotted attribute path (`self.client`) -> client type.
pub type VarTypes = HashMap<String, String>;

/// Map key for an expression: `a`, `a.b.c`, or `?` for anything else.
pub fn expr_path(expr: &Expr) -> String {
    match expr {
        Expr::Name(id) => id.clone(),
        Expr::Attribute { value, attr } => format!("{}.{}", expr_path(value), attr),
        _ => "?".to_string(),
    }
}

/// Client named by an annotation (`Client` or `module.Client`).
pub fn client_from_annotation(annotation: &Expr, index: &ClientIndex) -> Option<String> {
    let name = match annotation {
        Expr::Name(id) => id,
        Expr::Attribute { attr, .. } => attr,
        _ => return None,
    };
    index.is_client(name).then(|| name.clone())
}

/// Client type produced by an assigned expression.
pub fn infer_expr_type(expr: &Expr, index: &ClientIndex, vars: &VarTypes) -> Option<String> {
    match expr {
        // client.sub_client
        Expr::Attribute { value, attr } => {
            if !matches!(value.as_ref(), Expr::Name(_) | Expr::Attribute { .. }) {
                return None;
            }
            let receiver = vars.get(&expr_path(value))?;
            index.property_type(receiver, attr).map(String::from)
        }
        Expr::Await(inner) => infer_expr_type(inner, index, vars),
        Expr::Call { func, .. } => match func.as_ref() {
            // Client(...) or make_client(...)
            Expr::Name(id) if index.is_client(id) => Some(id.clone()),
            Expr::Name(id) => index.function_return(id).map(String::from),
            // module.Client(...)
            Expr::Attribute { attr, .. } if index.is_client(attr) => Some(attr.clone()),
            // Client.from_config(...)
            Expr::Attribute { value, .. }
                if matches!(value.as_ref(), Expr::Name(id) if index.is_client(id)) =>
            {
                value.dotted_name()
            }
            // service.get_client(...)
            Expr::Attribute { value, attr } => match value.as_ref() {
                Expr::Name(id) => {
                    let receiver = vars.get(id)?;
                    index.method_return(receiver, attr).map(String::from)
                }
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

fn bind(target: &Expr, client: &str, vars: &mut VarTypes) {
    match target {
        Expr::Name(id) => {
            vars.insert(id.clone(), client.to_string());
        }
        Expr::Attribute { value, attr } => {
            vars.insert(format!("{}.{}", expr_path(value), attr), client.to_string());
        }
        _ => {}
    }
}

struct VarTypeBuilder<'i> {
    index: &'i ClientIndex,
    vars: VarTypes,
}

impl<'ast, 'i> Visit<'ast> for VarTypeBuilder<'i> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::Assign { targets, value } => {
                if let Some(client) = infer_expr_type(value, self.index, &self.vars) {
                    for target in targets {
                        bind(target, &client, &mut self.vars);
                    }
                }
            }
            Stmt::AnnAssign {
                target,
                annotation,
                value,
            } => {
                let client = client_from_annotation(annotation, self.index).or_else(|| {
                    value
                        .as_ref()
                        .and_then(|v| infer_expr_type(v, self.index, &self.vars))
                });
                if let Some(client) = client {
                    bind(target, &client, &mut self.vars);
                }
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }
}

/// Builds the variable-type map of one parsed sample file.
pub fn build_var_types(module: &ParsedModule, index: &ClientIndex) -> VarTypes {
    let mut builder = VarTypeBuilder {
        index,
        vars: VarTypes::new(),
    };
    walk_module(&mut builder, module);
    builder.vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiModel, Class, Function, Module, Property};
    use crate::syntax::parse_module;

    fn method(name: &str, ret: Option<&str>) -> Function {
        Function {
            name: name.into(),
            sig: "self".into(),
            ret: ret.map(String::from),
            ..Default::default()
        }
    }

    fn index() -> ClientIndex {
        let mut service = Class {
            name: "Service".into(),
            entry_point: true,
            methods: vec![
                method("get_chat", Some("ChatClient")),
                method("list", None),
            ],
            ..Default::default()
        };
        service.properties.push(Property {
            name: "admin".into(),
            type_name: Some("AdminClient".into()),
            doc: None,
        });
        let chat = Class {
            name: "ChatClient".into(),
            methods: vec![method("send", None)],
            ..Default::default()
        };
        let admin = Class {
            name: "AdminClient".into(),
            methods: vec![method("purge", None)],
            ..Default::default()
        };
        ClientIndex::build(&ApiModel {
            package: "pkg".into(),
            modules: vec![Module {
                name: "pkg".into(),
                classes: vec![service, chat, admin],
                functions: vec![method("connect", Some("Service"))],
            }],
            dependencies: vec![],
        })
    }

    fn vars_of(src: &str) -> VarTypes {
        build_var_types(&parse_module(src).unwrap(), &index())
    }

    #[test]
    fn test_inference_sources() {
        let vars = vars_of(
            r#"
import pkg
svc = connect()
direct = pkg.ChatClient()
factory = Service.from_env()
chat = svc.get_chat()
admin = svc.admin
typed: AdminClient = make_something()
unknown = other()

class Sample:
    def __init__(self):
        self.client = Service()

async def main():
    awaited = await connect()
"#,
        );
        assert_eq!(vars.get("svc").map(String::as_str), Some("Service"));
        assert_eq!(vars.get("direct").map(String::as_str), Some("ChatClient"));
        assert_eq!(vars.get("factory").map(String::as_str), Some("Service"));
        assert_eq!(vars.get("chat").map(String::as_str), Some("ChatClient"));
        assert_eq!(vars.get("admin").map(String::as_str), Some("AdminClient"));
        assert_eq!(vars.get("typed").map(String::as_str), Some("AdminClient"));
        assert_eq!(vars.get("self.client").map(String::as_str), Some("Service"));
        assert_eq!(vars.get("awaited").map(String::as_str), Some("Service"));
        assert!(!vars.contains_key("unknown"));
    }

    #[test]
    fn test_last_assignment_wins() {
        let vars = vars_of("c = Service()\nif flag:\n    c = ChatClient()\n");
        assert_eq!(vars.get("c").map(String::as_str), Some("ChatClient"));
    }
}
