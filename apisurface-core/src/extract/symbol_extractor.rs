//! Symbol extraction from one parsed module.
//!
//! Produces visibility-filtered, overload-merged [`Class`] and [`Function`]
//! records. Every annotation visited is fed to the pass's
//! [`TypeReferenceCollector`], and every class seen is registered as a
//! locally defined type.

use crate::model::{self, Class, Function, Module, Parameter, ParameterKind, Property};
use crate::syntax::{ClassDef, Expr, FunctionDef, ParamKind, ParsedModule, Stmt};
use crate::typeref::TypeReferenceCollector;

use super::entry_points::EntryPoints;

/// Maximum documentation length before truncation.
pub const DOC_MAX_CHARS: usize = 150;

/// First non-blank docstring line, trimmed and truncated.
pub fn short_doc(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    if line.chars().count() > DOC_MAX_CHARS {
        let cut: String = line.chars().take(DOC_MAX_CHARS).collect();
        Some(format!("{}...", cut))
    } else {
        Some(line.to_string())
    }
}

/// Method names kept on a class: public names and dunders.
pub fn is_public_method_name(name: &str) -> bool {
    !name.starts_with('_') || (name.starts_with("__") && name.ends_with("__") && name.len() > 4)
}

impl From<ParamKind> for ParameterKind {
    fn from(kind: ParamKind) -> Self {
        match kind {
            ParamKind::PositionalOnly => ParameterKind::PositionalOnly,
            ParamKind::Regular => ParameterKind::Regular,
            ParamKind::VarArgs => ParameterKind::VarArgs,
            ParamKind::KeywordOnly => ParameterKind::KeywordOnly,
            ParamKind::KwArgs => ParameterKind::KwArgs,
        }
    }
}

/// Extracts one function or method, collecting its annotations.
pub fn extract_function(func: &FunctionDef, collector: &mut TypeReferenceCollector) -> Function {
    let params: Vec<Parameter> = func
        .params
        .iter()
        .map(|p| {
            if let Some(annotation) = &p.annotation {
                collector.collect(annotation);
            }
            Parameter {
                name: p.name.clone(),
                kind: p.kind.into(),
                annotation: p.annotation.as_ref().map(Expr::to_source),
                default: p.default.as_ref().map(Expr::to_source),
            }
        })
        .collect();

    if let Some(returns) = &func.returns {
        collector.collect(returns);
    }

    Function {
        name: func.name.clone(),
        sig: model::render_signature(&params),
        params,
        ret: func.returns.as_ref().map(Expr::to_source),
        doc: func.docstring().and_then(short_doc),
        is_async: func.is_async,
        classmethod: func.has_name_decorator("classmethod"),
        staticmethod: func.has_name_decorator("staticmethod"),
        property: func.has_name_decorator("property"),
        overload: func.is_overload(),
        entry_point: false,
        re_exported_from: None,
    }
}

/// Collects overload sets while preserving declaration order.
#[derive(Default)]
struct OverloadMerge {
    emitted: Vec<Function>,
    pending: Vec<(String, Vec<Function>)>,
}

impl OverloadMerge {
    fn push(&mut self, func: Function) {
        if func.overload {
            match self.pending.iter_mut().find(|(name, _)| *name == func.name) {
                Some((_, set)) => set.push(func),
                None => self.pending.push((func.name.clone(), vec![func])),
            }
            return;
        }

        let Some(pos) = self.pending.iter().position(|(name, _)| *name == func.name) else {
            self.emitted.push(func);
            return;
        };

        // The implementation is replaced by its overloads; its doc goes to
        // the first overload that has none.
        let (_, set) = self.pending.remove(pos);
        let mut inherited = func.doc.is_none();
        for mut overload in set {
            if !inherited && overload.doc.is_none() {
                overload.doc = func.doc.clone();
                inherited = true;
            }
            self.emitted.push(overload);
        }
    }

    fn finish(mut self) -> Vec<Function> {
        for (_, set) in self.pending {
            self.emitted.extend(set);
        }
        self.emitted
    }
}

/// Extracts a class: bases, public methods and properties.
///
/// The class name is registered as locally defined.
pub fn extract_class(class: &ClassDef, collector: &mut TypeReferenceCollector) -> Class {
    collector.add_defined_type(&class.name);

    let bases: Vec<String> = class
        .bases
        .iter()
        .filter(|b| {
            matches!(
                b,
                Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. }
            )
        })
        .map(|b| {
            collector.collect(b);
            b.to_source()
        })
        .collect();

    let mut methods = OverloadMerge::default();
    let mut properties = Vec::new();

    for stmt in &class.body {
        let Stmt::FunctionDef(func) = stmt else {
            continue;
        };
        if !is_public_method_name(&func.name) || func.is_property_accessor() {
            continue;
        }

        let extracted = extract_function(func, collector);
        if extracted.property {
            let type_name = extracted.ret.clone().or_else(|| {
                extracted
                    .sig
                    .split_once(" -> ")
                    .map(|(_, ret)| ret.trim().to_string())
            });
            properties.push(Property {
                name: extracted.name,
                type_name,
                doc: extracted.doc,
            });
        } else {
            methods.push(extracted);
        }
    }

    Class {
        name: class.name.clone(),
        base: (!bases.is_empty()).then(|| bases.join(", ")),
        doc: class.docstring().and_then(short_doc),
        entry_point: false,
        re_exported_from: None,
        methods: methods.finish(),
        properties,
    }
}

/// Extracts the public top-level classes and functions of one module.
///
/// Also records the module's import map in `collector`. Private top-level
/// classes are still registered as locally defined.
pub fn extract_module(
    name: &str,
    parsed: &ParsedModule,
    entry: &EntryPoints,
    collector: &mut TypeReferenceCollector,
) -> Module {
    collector.record_imports(name, parsed);

    let mut classes = Vec::new();
    let mut functions = OverloadMerge::default();

    for stmt in &parsed.body {
        match stmt {
            Stmt::ClassDef(class) if class.name.starts_with('_') => {
                collector.add_defined_type(&class.name);
            }
            Stmt::ClassDef(class) => {
                let mut extracted = extract_class(class, collector);
                extracted.entry_point = entry.is_entry(&extracted.name);
                extracted.re_exported_from = entry.reexported_from(&extracted.name).map(String::from);
                classes.push(extracted);
            }
            Stmt::FunctionDef(func) if !func.name.starts_with('_') => {
                let mut extracted = extract_function(func, collector);
                extracted.entry_point = entry.is_entry(&extracted.name);
                extracted.re_exported_from = entry.reexported_from(&extracted.name).map(String::from);
                functions.push(extracted);
            }
            _ => {}
        }
    }

    Module {
        name: name.to_string(),
        classes,
        functions: functions.finish(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_module;

    fn module_of(src: &str, entry: &EntryPoints) -> (Module, TypeReferenceCollector) {
        let parsed = parse_module(src).unwrap();
        let mut collector = TypeReferenceCollector::new();
        let module = extract_module("pkg.mod", &parsed, entry, &mut collector);
        (module, collector)
    }

    #[test]
    fn test_short_doc() {
        assert_eq!(short_doc("\n   Send a request.\n\n More.").as_deref(), Some("Send a request."));
        assert_eq!(short_doc("   \n  "), None);
        let long = "x".repeat(200);
        let doc = short_doc(&long).unwrap();
        assert_eq!(doc.chars().count(), DOC_MAX_CHARS + 3);
        assert!(doc.ends_with("..."));
    }

    #[test]
    fn test_method_visibility() {
        assert!(is_public_method_name("send"));
        assert!(is_public_method_name("__init__"));
        assert!(!is_public_method_name("_helper"));
        assert!(!is_public_method_name("__mangled"));
    }

    #[test]
    fn test_class_extraction() {
        let (module, collector) = module_of(
            r#"
class Client(BaseClient, Generic[T], metaclass=ABCMeta):
    """A client.

    Longer text.
    """

    def __init__(self, endpoint: str, credential: "TokenCredential") -> None: ...

    def _private(self): ...

    async def send(self, request: HttpRequest, *, stream: bool = False) -> HttpResponse:
        """Send it."""

    @classmethod
    def from_url(cls, url: str) -> "Client": ...

    @property
    def endpoint(self) -> str:
        """The endpoint."""

    @endpoint.setter
    def endpoint(self, value: str): ...
"#,
            &EntryPoints::default(),
        );

        let client = &module.classes[0];
        assert_eq!(client.base.as_deref(), Some("BaseClient, Generic[T]"));
        assert_eq!(client.doc.as_deref(), Some("A client."));
        let names: Vec<&str> = client.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["__init__", "send", "from_url"]);

        let send = &client.methods[1];
        assert!(send.is_async);
        assert_eq!(send.sig, "self, request: HttpRequest, *, stream: bool = False");
        assert_eq!(send.ret.as_deref(), Some("HttpResponse"));
        assert!(client.methods[2].classmethod);

        assert_eq!(client.properties.len(), 1);
        assert_eq!(client.properties[0].type_name.as_deref(), Some("str"));
        assert_eq!(client.properties[0].doc.as_deref(), Some("The endpoint."));

        let external = collector.external_refs();
        assert!(external.contains("BaseClient"));
        assert!(external.contains("TokenCredential"));
        assert!(external.contains("HttpRequest"));
        assert!(!external.contains("Client"));
    }

    #[test]
    fn test_overload_merge() {
        let (module, _) = module_of(
            r#"
@overload
def get(key: str) -> str: ...
@overload
def get(key: int) -> int:
    """Integer lookup."""
def get(key):
    """Look up a value."""
    return key

def other(): ...

@overload
def orphan(x: int) -> int: ...
"#,
            &EntryPoints::default(),
        );

        let names: Vec<&str> = module.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["get", "get", "other", "orphan"]);
        assert!(module.functions[0].overload);
        assert_eq!(module.functions[0].doc.as_deref(), Some("Look up a value."));
        assert_eq!(module.functions[1].doc.as_deref(), Some("Integer lookup."));
        assert!(module.functions[3].overload);
    }

    #[test]
    fn test_module_visibility_and_entry_points() {
        let mut entry = EntryPoints::default();
        entry.symbols.insert("Client".into());
        entry.symbols.insert("connect".into());
        entry
            .external_reexports
            .insert("connect".into(), "transport".into());

        let (module, collector) = module_of(
            "class Client: ...\nclass _Hidden: ...\ndef connect(): ...\ndef _helper(): ...\n",
            &entry,
        );

        assert_eq!(module.classes.len(), 1);
        assert!(module.classes[0].entry_point);
        assert_eq!(module.functions.len(), 1);
        assert_eq!(module.functions[0].re_exported_from.as_deref(), Some("transport"));
        assert!(collector.defined().contains("_Hidden"));
    }
}
