//! Output formatting - JSON, Python stubs and plain usage summaries.

use anyhow::{Context, Result};
use serde::Serialize;

#[cfg(feature = "stubs")]
use crate::model::{ApiModel, Class, Function};
use crate::usage::UsageReport;

/// Serializes any report type as pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("JSON serialization failed")
}

/// Prints a report as pretty JSON on stdout.
///
/// Serialization of these plain data types cannot fail in practice; if it
/// does, the error goes to stderr and nothing is printed.
pub fn print_json<T: Serialize>(value: &T) {
    match to_json(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("[WARN] {:#}", e),
    }
}

#[cfg(feature = "stubs")]
const RULE_WIDTH: usize = 77;

#[cfg(feature = "stubs")]
fn push_function(lines: &mut Vec<String>, func: &Function, indent: &str) {
    if let Some(doc) = &func.doc {
        lines.push(format!("{}\"\"\"{}\"\"\"", indent, doc));
    }
    for (flag, decorator) in [
        (func.overload, "@overload"),
        (func.classmethod, "@classmethod"),
        (func.staticmethod, "@staticmethod"),
    ] {
        if flag {
            lines.push(format!("{}{}", indent, decorator));
        }
    }
    let prefix = if func.is_async { "async " } else { "" };
    let ret = func
        .ret
        .as_deref()
        .map(|r| format!(" -> {}", r))
        .unwrap_or_default();
    lines.push(format!("{}{}def {}({}){}: ...", indent, prefix, func.name, func.sig, ret));
}

#[cfg(feature = "stubs")]
fn push_class(lines: &mut Vec<String>, class: &Class) {
    let base = class
        .base
        .as_deref()
        .map(|b| format!("({})", b))
        .unwrap_or_default();
    lines.push(format!("class {}{}:", class.name, base));
    if let Some(doc) = &class.doc {
        lines.push(format!("    \"\"\"{}\"\"\"", doc));
    }
    for prop in &class.properties {
        match &prop.type_name {
            Some(t) => lines.push(format!("    {}: {}", prop.name, t)),
            None => lines.push(format!("    {}", prop.name)),
        }
    }
    for method in &class.methods {
        push_function(lines, method, "    ");
    }
    if class.methods.is_empty() && class.properties.is_empty() {
        lines.push("    ...".to_string());
    }
    lines.push(String::new());
}

/// Renders the model as Python stub text.
///
/// Standard-library dependencies are left out of the trailing
/// "Dependency Types" section.
#[cfg(feature = "stubs")]
pub fn format_stubs(model: &ApiModel) -> String {
    let mut lines = vec![
        format!("# {} - Public API Surface", model.package),
        "# Extracted by apisurface".to_string(),
        String::new(),
    ];

    for module in &model.modules {
        lines.push(format!("# Module: {}", module.name));
        lines.push(String::new());
        for func in &module.functions {
            push_function(&mut lines, func, "");
            lines.push(String::new());
        }
        for class in &module.classes {
            push_class(&mut lines, class);
        }
    }

    let external: Vec<_> = model.dependencies.iter().filter(|d| !d.is_stdlib).collect();
    if !external.is_empty() {
        let rule = format!("# {}", "=".repeat(RULE_WIDTH));
        lines.push(String::new());
        lines.push(rule.clone());
        lines.push("# Dependency Types (from external packages)".to_string());
        lines.push(rule);
        lines.push(String::new());

        for dep in external {
            lines.push(format!("# From: {}", dep.package));
            lines.push(String::new());
            for class in &dep.classes {
                push_class(&mut lines, class);
            }
        }
    }

    lines.join("\n")
}

/// Terminal summary of a usage report.
pub fn format_usage_plain(report: &UsageReport) -> String {
    let mut out = format!("Scanned {} sample file(s).\n", report.file_count);

    if report.covered.is_empty() {
        out.push_str("No covered operations.\n");
    } else {
        out.push_str(&format!("COVERED ({}):\n", report.covered.len()));
        for op in &report.covered {
            out.push_str(&format!("- {}.{}  {}:{}\n", op.client, op.method, op.file, op.line));
        }
    }

    if report.uncovered.is_empty() {
        out.push_str("All operations covered.\n");
    } else {
        out.push_str(&format!("UNCOVERED ({}):\n", report.uncovered.len()));
        for op in &report.uncovered {
            out.push_str(&format!("- {}.{}\n", op.client, op.sig));
        }
    }

    if !report.patterns.is_empty() {
        let names: Vec<&str> = report.patterns.iter().map(|p| p.as_str()).collect();
        out.push_str(&format!("PATTERNS: {}\n", names.join(", ")));
    }
    out
}
