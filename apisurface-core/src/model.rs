//! The API model: what extraction produces and usage analysis consumes.
//!
//! Serialized as camelCase JSON. Flags that are `false` and collections
//! that are empty are omitted, and every field has a default so models
//! written by other producers still deserialize.

use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

/// Extracted public surface of one package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiModel {
    pub package: String,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

impl ApiModel {
    /// Every class across all modules, in module order.
    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.modules.iter().flat_map(|m| m.classes.iter())
    }

    /// Every module-level function across all modules.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.modules.iter().flat_map(|m| m.functions.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Dotted path relative to the package root (`pkg.sub.mod`).
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<Class>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<Function>,
}

impl Module {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.functions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub name: String,
    /// Base expressions joined with `", "`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub entry_point: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub re_exported_from: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<Function>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
}

impl Class {
    /// Name without generic brackets.
    pub fn base_name(&self) -> &str {
        crate::builtins::strip_generics(&self.name)
    }

    pub fn has_methods(&self) -> bool {
        !self.methods.is_empty()
    }

    /// Individual base references, split on top-level commas.
    pub fn bases(&self) -> Vec<&str> {
        self.base.as_deref().map(split_top_level).unwrap_or_default()
    }
}

/// Splits `A, Generic[K, V], pkg.B` into its three top-level entries.
pub fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Function or method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    pub name: String,
    /// Rendered parameter list, e.g. `self, x: int, *, flag: bool = False`.
    #[serde(default)]
    pub sig: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, rename = "async", skip_serializing_if = "is_false")]
    pub is_async: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub classmethod: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub staticmethod: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub property: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub overload: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub entry_point: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub re_exported_from: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterKind {
    PositionalOnly,
    Regular,
    VarArgs,
    KeywordOnly,
    KwArgs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Parameter {
    fn render(&self) -> String {
        let prefix = match self.kind {
            ParameterKind::VarArgs => "*",
            ParameterKind::KwArgs => "**",
            _ => "",
        };
        let mut out = format!("{}{}", prefix, self.name);
        if let Some(annotation) = &self.annotation {
            out.push_str(": ");
            out.push_str(annotation);
        }
        if let Some(default) = &self.default {
            out.push_str(if self.annotation.is_some() { " = " } else { "=" });
            out.push_str(default);
        }
        out
    }
}

/// Renders a parameter list with `/` and bare `*` markers where needed.
pub fn render_signature(params: &[Parameter]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(params.len() + 2);
    let mut saw_star = false;

    for (i, param) in params.iter().enumerate() {
        match param.kind {
            ParameterKind::VarArgs => saw_star = true,
            ParameterKind::KeywordOnly if !saw_star => {
                parts.push("*".to_string());
                saw_star = true;
            }
            _ => {}
        }
        parts.push(param.render());

        let next_is_positional_only = params
            .get(i + 1)
            .is_some_and(|p| p.kind == ParameterKind::PositionalOnly);
        if param.kind == ParameterKind::PositionalOnly && !next_is_positional_only {
            parts.push("/".to_string());
        }
    }

    parts.join(", ")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// External package that surface types come from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub package: String,
    #[serde(default)]
    pub is_stdlib: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<Class>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, kind: ParameterKind, annotation: Option<&str>) -> Parameter {
        Parameter {
            name: name.to_string(),
            kind,
            annotation: annotation.map(String::from),
            default: None,
        }
    }

    #[test]
    fn test_render_signature_markers() {
        let mut flag = param("flag", ParameterKind::KeywordOnly, Some("bool"));
        flag.default = Some("False".into());
        let params = vec![
            param("a", ParameterKind::PositionalOnly, None),
            param("b", ParameterKind::Regular, Some("int")),
            flag,
            param("kw", ParameterKind::KwArgs, Some("Any")),
        ];
        assert_eq!(
            render_signature(&params),
            "a, /, b: int, *, flag: bool = False, **kw: Any"
        );
    }

    #[test]
    fn test_render_signature_varargs_replaces_star() {
        let params = vec![
            param("self", ParameterKind::Regular, None),
            param("args", ParameterKind::VarArgs, None),
            param("key", ParameterKind::KeywordOnly, Some("str")),
        ];
        assert_eq!(render_signature(&params), "self, *args, key: str");
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("Base, Generic[K, V], pkg.Mixin"),
            vec!["Base", "Generic[K, V]", "pkg.Mixin"]
        );
        assert!(split_top_level("").is_empty());
    }

    #[test]
    fn test_json_omits_defaults() {
        let func = Function {
            name: "send".into(),
            sig: "self".into(),
            is_async: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&func).unwrap();
        assert_eq!(json["async"], serde_json::json!(true));
        assert!(json.get("classmethod").is_none());
        assert!(json.get("ret").is_none());
        assert!(json.get("params").is_none());
    }

    #[test]
    fn test_deserialize_minimal_model() {
        let model: ApiModel = serde_json::from_str(
            r#"{"package": "pkg", "modules": [{"name": "pkg", "classes": [{"name": "Client", "entryPoint": true, "methods": [{"name": "send", "sig": "self"}]}]}]}"#,
        )
        .unwrap();
        let client = model.classes().next().unwrap();
        assert!(client.entry_point);
        assert!(client.has_methods());
        assert!(model.dependencies.is_empty());
    }
}
