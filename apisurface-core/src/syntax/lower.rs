//! Lowering from the tree-sitter concrete tree to [`ParsedModule`].

use tree_sitter::{Node, Parser};

use super::{
    Block, BlockKind, ClassDef, Expr, FunctionDef, ImportAlias, ImportFrom, Param, ParamKind,
    ParsedModule, Stmt, SyntaxError,
};

/// Clause nodes whose contents are folded into the enclosing [`Block`].
const CLAUSE_KINDS: &[&str] = &[
    "elif_clause",
    "else_clause",
    "except_clause",
    "except_group_clause",
    "finally_clause",
    "with_clause",
    "with_item",
    "case_clause",
];

pub(super) fn parse_module(source: &str) -> Result<ParsedModule, SyntaxError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::language())
        .map_err(|e| SyntaxError::new(format!("grammar unavailable: {}", e), 0, 0))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| SyntaxError::new("parser produced no tree", 1, 1))?;
    let root = tree.root_node();

    if root.has_error() {
        let bad = first_error(root).unwrap_or(root);
        let pos = bad.start_position();
        let message = if bad.is_missing() {
            format!("missing '{}'", bad.kind())
        } else {
            "invalid syntax".to_string()
        };
        return Err(SyntaxError::new(message, pos.row + 1, pos.column + 1));
    }

    let lowerer = Lowerer {
        src: source.as_bytes(),
    };
    Ok(ParsedModule {
        body: lowerer.body(root),
    })
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error() || c.is_missing())
        .find_map(first_error)
}

fn named<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node
        .named_children(&mut cursor)
        .filter(|c| !c.is_extra())
        .collect();
    children
}

fn field_all<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.children_by_field_name(field, &mut cursor).collect();
    children
}

fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

fn starts_with_async(node: Node) -> bool {
    node.child(0).is_some_and(|c| c.kind() == "async")
}

struct Lowerer<'s> {
    src: &'s [u8],
}

impl<'s> Lowerer<'s> {
    fn text(&self, node: Node) -> String {
        node.utf8_text(self.src).unwrap_or_default().to_string()
    }

    fn body(&self, node: Node) -> Vec<Stmt> {
        named(node)
            .into_iter()
            .filter_map(|child| self.stmt(child))
            .collect()
    }

    fn stmt(&self, node: Node) -> Option<Stmt> {
        match node.kind() {
            "class_definition" => Some(Stmt::ClassDef(self.class_def(node, Vec::new()))),
            "function_definition" => Some(Stmt::FunctionDef(self.function_def(node, Vec::new()))),
            "decorated_definition" => self.decorated(node),
            "expression_statement" => self.expression_statement(node),
            "import_statement" => Some(Stmt::Import(self.import_names(node))),
            "import_from_statement" | "future_import_statement" => {
                Some(Stmt::ImportFrom(self.import_from(node)))
            }
            "if_statement" => Some(self.compound(node, BlockKind::If)),
            "for_statement" => {
                let kind = if starts_with_async(node) {
                    BlockKind::AsyncFor
                } else {
                    BlockKind::For
                };
                Some(self.compound(node, kind))
            }
            "while_statement" => Some(self.compound(node, BlockKind::While)),
            "with_statement" => {
                let kind = if starts_with_async(node) {
                    BlockKind::AsyncWith
                } else {
                    BlockKind::With
                };
                Some(self.compound(node, kind))
            }
            "try_statement" => Some(self.compound(node, BlockKind::Try)),
            "comment" => None,
            _ => Some(self.compound(node, BlockKind::Other)),
        }
    }

    fn decorated(&self, node: Node) -> Option<Stmt> {
        let decorators: Vec<Expr> = named(node)
            .into_iter()
            .filter(|c| c.kind() == "decorator")
            .filter_map(|d| named(d).into_iter().next())
            .map(|e| self.expr(e))
            .collect();
        let definition = node.child_by_field_name("definition")?;
        match definition.kind() {
            "class_definition" => Some(Stmt::ClassDef(self.class_def(definition, decorators))),
            "function_definition" => {
                Some(Stmt::FunctionDef(self.function_def(definition, decorators)))
            }
            _ => None,
        }
    }

    fn class_def(&self, node: Node, decorators: Vec<Expr>) -> ClassDef {
        let bases = node
            .child_by_field_name("superclasses")
            .map(|args| {
                named(args)
                    .into_iter()
                    .filter(|a| {
                        !matches!(
                            a.kind(),
                            "keyword_argument" | "list_splat" | "dictionary_splat"
                        )
                    })
                    .map(|a| self.expr(a))
                    .collect()
            })
            .unwrap_or_default();

        ClassDef {
            name: self.field_text(node, "name"),
            bases,
            decorators,
            body: node
                .child_by_field_name("body")
                .map(|b| self.body(b))
                .unwrap_or_default(),
            line: line_of(node),
        }
    }

    fn function_def(&self, node: Node, decorators: Vec<Expr>) -> FunctionDef {
        FunctionDef {
            name: self.field_text(node, "name"),
            params: node
                .child_by_field_name("parameters")
                .map(|p| self.params(p))
                .unwrap_or_default(),
            returns: node.child_by_field_name("return_type").map(|r| self.expr(r)),
            decorators,
            body: node
                .child_by_field_name("body")
                .map(|b| self.body(b))
                .unwrap_or_default(),
            is_async: starts_with_async(node),
            line: line_of(node),
        }
    }

    fn params(&self, node: Node) -> Vec<Param> {
        let mut params: Vec<Param> = Vec::new();
        let mut keyword_only = false;

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();

        for child in children {
            let plain = if keyword_only {
                ParamKind::KeywordOnly
            } else {
                ParamKind::Regular
            };

            match child.kind() {
                "identifier" => params.push(Param {
                    name: self.text(child),
                    kind: plain,
                    annotation: None,
                    default: None,
                }),
                "typed_parameter" => {
                    let annotation = child.child_by_field_name("type").map(|t| self.expr(t));
                    let Some(inner) = named(child).into_iter().find(|n| n.kind() != "type")
                    else {
                        continue;
                    };
                    let (name, kind) = self.splat_or_plain(inner, plain);
                    if kind == ParamKind::VarArgs {
                        keyword_only = true;
                    }
                    params.push(Param {
                        name,
                        kind,
                        annotation,
                        default: None,
                    });
                }
                "default_parameter" | "typed_default_parameter" => params.push(Param {
                    name: self.field_text(child, "name"),
                    kind: plain,
                    annotation: child.child_by_field_name("type").map(|t| self.expr(t)),
                    default: child.child_by_field_name("value").map(|v| self.expr(v)),
                }),
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    let (name, kind) = self.splat_or_plain(child, plain);
                    if kind == ParamKind::VarArgs {
                        keyword_only = true;
                    }
                    params.push(Param {
                        name,
                        kind,
                        annotation: None,
                        default: None,
                    });
                }
                "keyword_separator" | "*" => keyword_only = true,
                "positional_separator" | "/" => {
                    for p in params.iter_mut().filter(|p| p.kind == ParamKind::Regular) {
                        p.kind = ParamKind::PositionalOnly;
                    }
                }
                _ => {}
            }
        }

        params
    }

    fn splat_or_plain(&self, node: Node, plain: ParamKind) -> (String, ParamKind) {
        match node.kind() {
            "list_splat_pattern" => (
                self.text(node).trim_start_matches('*').trim().to_string(),
                ParamKind::VarArgs,
            ),
            "dictionary_splat_pattern" => (
                self.text(node).trim_start_matches('*').trim().to_string(),
                ParamKind::KwArgs,
            ),
            _ => (self.text(node), plain),
        }
    }

    fn expression_statement(&self, node: Node) -> Option<Stmt> {
        let children = named(node);
        match children.as_slice() {
            [] => None,
            [single] if single.kind() == "assignment" => self.assignment(*single),
            [single] => Some(Stmt::Expr(self.expr(*single))),
            many => Some(Stmt::Expr(Expr::Tuple(
                many.iter().map(|c| self.expr(*c)).collect(),
            ))),
        }
    }

    fn assignment(&self, node: Node) -> Option<Stmt> {
        let left = self.expr(node.child_by_field_name("left")?);
        let right = node.child_by_field_name("right");

        if let Some(annotation) = node.child_by_field_name("type") {
            return Some(Stmt::AnnAssign {
                target: left,
                annotation: self.expr(annotation),
                value: right.map(|r| self.expr(r)),
            });
        }

        let mut targets = vec![left];
        let mut value = right?;
        while value.kind() == "assignment" && value.child_by_field_name("type").is_none() {
            targets.push(self.expr(value.child_by_field_name("left")?));
            value = value.child_by_field_name("right")?;
        }

        Some(Stmt::Assign {
            targets,
            value: self.expr(value),
        })
    }

    fn import_alias(&self, node: Node) -> Option<ImportAlias> {
        match node.kind() {
            "dotted_name" | "identifier" => Some(ImportAlias {
                name: self.text(node),
                asname: None,
            }),
            "aliased_import" => Some(ImportAlias {
                name: self.field_text(node, "name"),
                asname: node.child_by_field_name("alias").map(|a| self.text(a)),
            }),
            _ => None,
        }
    }

    fn import_names(&self, node: Node) -> Vec<ImportAlias> {
        field_all(node, "name")
            .into_iter()
            .filter_map(|n| self.import_alias(n))
            .collect()
    }

    fn import_from(&self, node: Node) -> ImportFrom {
        let (module, level) = if node.kind() == "future_import_statement" {
            (Some("__future__".to_string()), 0)
        } else {
            match node.child_by_field_name("module_name") {
                Some(m) if m.kind() == "relative_import" => {
                    let children = named(m);
                    let level = children
                        .iter()
                        .find(|c| c.kind() == "import_prefix")
                        .map(|p| self.text(*p).chars().filter(|c| *c == '.').count())
                        .unwrap_or(0);
                    let module = children
                        .iter()
                        .find(|c| c.kind() == "dotted_name")
                        .map(|d| self.text(*d));
                    (module, level)
                }
                Some(m) => (Some(self.text(m)), 0),
                None => (None, 0),
            }
        };

        ImportFrom {
            module,
            level,
            names: self.import_names(node),
            wildcard: named(node).iter().any(|c| c.kind() == "wildcard_import"),
        }
    }

    fn compound(&self, node: Node, kind: BlockKind) -> Stmt {
        let mut block = Block {
            kind,
            exprs: Vec::new(),
            body: Vec::new(),
        };
        self.fold_into(node, &mut block);
        Stmt::Block(block)
    }

    fn fold_into(&self, node: Node, block: &mut Block) {
        for child in named(node) {
            match child.kind() {
                "block" => block.body.extend(self.body(child)),
                kind if CLAUSE_KINDS.contains(&kind) => self.fold_into(child, block),
                "comment" => {}
                _ => block.exprs.push(self.expr(child)),
            }
        }
    }

    fn field_text(&self, node: Node, field: &str) -> String {
        node.child_by_field_name(field)
            .map(|n| self.text(n))
            .unwrap_or_default()
    }

    fn field_expr(&self, node: Node, field: &str) -> Expr {
        match node.child_by_field_name(field) {
            Some(n) => self.expr(n),
            None => Expr::Other {
                text: String::new(),
                children: Vec::new(),
            },
        }
    }

    fn pack(&self, nodes: Vec<Node>) -> Expr {
        let mut exprs: Vec<Expr> = nodes.into_iter().map(|n| self.expr(n)).collect();
        if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::Tuple(exprs)
        }
    }

    fn other(&self, node: Node) -> Expr {
        Expr::Other {
            text: self.text(node),
            children: named(node).into_iter().map(|c| self.expr(c)).collect(),
        }
    }

    fn expr(&self, node: Node) -> Expr {
        match node.kind() {
            "identifier" | "keyword_identifier" => Expr::Name(self.text(node)),
            "attribute" => Expr::Attribute {
                value: Box::new(self.field_expr(node, "object")),
                attr: self.field_text(node, "attribute"),
            },
            "subscript" => Expr::Subscript {
                value: Box::new(self.field_expr(node, "value")),
                slice: Box::new(self.pack(field_all(node, "subscript"))),
            },
            "type" => match named(node).into_iter().next() {
                Some(inner) => self.expr(inner),
                None => self.other(node),
            },
            "generic_type" => {
                let children = named(node);
                let Some(base) = children.first() else {
                    return self.other(node);
                };
                let args = children
                    .iter()
                    .find(|c| c.kind() == "type_parameter")
                    .map(|tp| named(*tp))
                    .unwrap_or_default();
                Expr::Subscript {
                    value: Box::new(self.expr(*base)),
                    slice: Box::new(self.pack(args)),
                }
            }
            "union_type" => match named(node).as_slice() {
                [left, right] => Expr::Union {
                    left: Box::new(self.expr(*left)),
                    right: Box::new(self.expr(*right)),
                },
                _ => self.other(node),
            },
            "member_type" => match named(node).as_slice() {
                [value, attr] => Expr::Attribute {
                    value: Box::new(self.expr(*value)),
                    attr: self.text(*attr),
                },
                _ => self.other(node),
            },
            "binary_operator" => {
                let is_union = node
                    .child_by_field_name("operator")
                    .is_some_and(|op| op.kind() == "|");
                if is_union {
                    Expr::Union {
                        left: Box::new(self.field_expr(node, "left")),
                        right: Box::new(self.field_expr(node, "right")),
                    }
                } else {
                    self.other(node)
                }
            }
            "string" => Expr::Str(self.string_value(node)),
            "concatenated_string" => Expr::Str(
                named(node)
                    .into_iter()
                    .filter(|c| c.kind() == "string")
                    .map(|c| self.string_value(c))
                    .collect(),
            ),
            "integer" | "float" | "true" | "false" | "none" | "ellipsis" => {
                Expr::Constant(self.text(node))
            }
            "tuple" | "expression_list" | "pattern_list" | "tuple_pattern" => {
                Expr::Tuple(named(node).into_iter().map(|c| self.expr(c)).collect())
            }
            "list" | "list_pattern" => {
                Expr::List(named(node).into_iter().map(|c| self.expr(c)).collect())
            }
            "parenthesized_expression" => match named(node).into_iter().next() {
                Some(inner) => self.expr(inner),
                None => self.other(node),
            },
            "call" => Expr::Call {
                func: Box::new(self.field_expr(node, "function")),
                args: node
                    .child_by_field_name("arguments")
                    .map(|a| named(a).into_iter().map(|c| self.expr(c)).collect())
                    .unwrap_or_default(),
                line: line_of(node),
            },
            "await" => match named(node).into_iter().next() {
                Some(inner) => Expr::Await(Box::new(self.expr(inner))),
                None => self.other(node),
            },
            _ => self.other(node),
        }
    }

    fn string_value(&self, node: Node) -> String {
        let raw = self.text(node);
        let unprefixed = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        for quote in ["\"\"\"", "'''", "\"", "'"] {
            if unprefixed.len() >= 2 * quote.len()
                && unprefixed.starts_with(quote)
                && unprefixed.ends_with(quote)
            {
                return unprefixed[quote.len()..unprefixed.len() - quote.len()].to_string();
            }
        }
        unprefixed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> ParsedModule {
        parse_module(src).unwrap()
    }

    fn only_function(module: &ParsedModule) -> &FunctionDef {
        match &module.body[0] {
            Stmt::FunctionDef(f) => f,
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_has_location() {
        let err = parse_module("def broken(:\n    pass\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.column >= 1);
    }

    #[test]
    fn test_class_with_bases_and_docstring() {
        let module = parse(
            "class Client(BaseClient, Generic[T], metaclass=ABCMeta):\n    \"\"\"Talks to the service.\n\n    More text.\n    \"\"\"\n    def send(self): ...\n",
        );
        let Stmt::ClassDef(cls) = &module.body[0] else {
            panic!("expected class");
        };
        assert_eq!(cls.name, "Client");
        assert_eq!(cls.bases.len(), 2);
        assert_eq!(cls.bases[0], Expr::Name("BaseClient".into()));
        assert!(matches!(cls.bases[1], Expr::Subscript { .. }));
        assert!(cls.docstring().unwrap().trim_start().starts_with("Talks to the service."));
        assert!(matches!(cls.body[1], Stmt::FunctionDef(_)));
    }

    #[test]
    fn test_parameter_kinds() {
        let module = parse(
            "def f(a, b: int, /, c=1, d: str = 'x', *args: Any, e, f: bool = False, **kw: Any) -> None: ...\n",
        );
        let func = only_function(&module);
        let kinds: Vec<(String, ParamKind)> = func
            .params
            .iter()
            .map(|p| (p.name.clone(), p.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("a".to_string(), ParamKind::PositionalOnly),
                ("b".to_string(), ParamKind::PositionalOnly),
                ("c".to_string(), ParamKind::Regular),
                ("d".to_string(), ParamKind::Regular),
                ("args".to_string(), ParamKind::VarArgs),
                ("e".to_string(), ParamKind::KeywordOnly),
                ("f".to_string(), ParamKind::KeywordOnly),
                ("kw".to_string(), ParamKind::KwArgs),
            ]
        );
        assert_eq!(func.params[1].annotation, Some(Expr::Name("int".into())));
        assert_eq!(func.params[2].default, Some(Expr::Constant("1".into())));
        assert!(func.returns.is_some());
    }

    #[test]
    fn test_bare_keyword_separator() {
        let module = parse("def f(self, *, flag: bool = False): ...\n");
        let func = only_function(&module);
        assert_eq!(func.params[0].kind, ParamKind::Regular);
        assert_eq!(func.params[1].kind, ParamKind::KeywordOnly);
    }

    #[test]
    fn test_async_function_and_decorators() {
        let module = parse("@classmethod\nasync def create(cls) -> 'Client': ...\n");
        let func = only_function(&module);
        assert!(func.is_async);
        assert!(func.has_name_decorator("classmethod"));
        assert_eq!(func.returns, Some(Expr::Str("Client".into())));
    }

    #[test]
    fn test_subscript_with_multiple_arguments() {
        let module = parse("x: Dict[str, Widget] = {}\n");
        let Stmt::AnnAssign { annotation, .. } = &module.body[0] else {
            panic!("expected annotated assignment");
        };
        let Expr::Subscript { value, slice } = annotation else {
            panic!("expected subscript");
        };
        assert_eq!(**value, Expr::Name("Dict".into()));
        assert!(matches!(&**slice, Expr::Tuple(items) if items.len() == 2));
    }

    #[test]
    fn test_union_operator() {
        let module = parse("def f(x: Widget | None): ...\n");
        let func = only_function(&module);
        assert!(matches!(func.params[0].annotation, Some(Expr::Union { .. })));
    }

    #[test]
    fn test_chained_assignment_flattened() {
        let module = parse("a = b = Client()\n");
        let Stmt::Assign { targets, value } = &module.body[0] else {
            panic!("expected assignment");
        };
        assert_eq!(targets.len(), 2);
        assert!(matches!(value, Expr::Call { .. }));
    }

    #[test]
    fn test_imports() {
        let module = parse(
            "import os.path as osp, json\nfrom ..models import Widget as W, Gadget\nfrom pkg import *\nfrom __future__ import annotations\n",
        );
        let Stmt::Import(aliases) = &module.body[0] else {
            panic!("expected import");
        };
        assert_eq!(aliases[0].name, "os.path");
        assert_eq!(aliases[0].bound_name(), "osp");
        assert_eq!(aliases[1].bound_name(), "json");

        let Stmt::ImportFrom(relative) = &module.body[1] else {
            panic!("expected from-import");
        };
        assert_eq!(relative.level, 2);
        assert_eq!(relative.module.as_deref(), Some("models"));
        assert_eq!(relative.names[0].bound_name(), "W");

        let Stmt::ImportFrom(star) = &module.body[2] else {
            panic!("expected wildcard import");
        };
        assert!(star.wildcard);

        let Stmt::ImportFrom(future) = &module.body[3] else {
            panic!("expected future import");
        };
        assert_eq!(future.module.as_deref(), Some("__future__"));
    }

    #[test]
    fn test_compound_blocks() {
        let module = parse(
            "async def main():\n    async with Client() as c:\n        async for item in c.stream():\n            pass\n    try:\n        await c.close()\n    except ValueError:\n        pass\n",
        );
        let func = only_function(&module);
        let kinds: Vec<BlockKind> = func
            .body
            .iter()
            .filter_map(|s| match s {
                Stmt::Block(b) => Some(b.kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![BlockKind::AsyncWith, BlockKind::Try]);
    }

    #[test]
    fn test_call_line_numbers() {
        let module = parse("\n\nclient.send(1)\n");
        let Stmt::Expr(Expr::Call { line, .. }) = &module.body[0] else {
            panic!("expected call");
        };
        assert_eq!(*line, 3);
    }
}
