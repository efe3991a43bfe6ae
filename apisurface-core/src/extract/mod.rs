//! Public-surface extraction from package sources.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────────┐
//! │  entry_points.rs     │        │   symbol_extractor.rs    │
//! │  ──────────────────  │        │  ──────────────────────  │
//! │  root __init__.py    │ ─────▶ │  classes, functions,     │
//! │  __all__, re-exports │  read  │  properties, overloads   │
//! └──────────────────────┘  only  └────────────┬─────────────┘
//!                                              │ annotations
//!                                              ▼
//!                                  ┌──────────────────────────┐
//!                                  │ typeref::TypeReference-  │
//!                                  │ Collector (per pass)     │
//!                                  └──────────────────────────┘
//! ```

pub mod entry_points;
pub mod symbol_extractor;

use std::path::Path;

pub use entry_points::{find_main_init_file, resolve_entry_points, EntryPoints};
pub use symbol_extractor::{extract_class, extract_function, extract_module, short_doc};

/// Dotted module name of `path` relative to `root`.
///
/// `pkg/sub/mod.py` → `pkg.sub.mod`, `pkg/__init__.py` → `pkg`. A root-level
/// `__init__.py` takes the package name.
pub fn module_name(root: &Path, path: &Path, package_name: &str) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path).with_extension("");
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    let parts = match parts.split_last() {
        Some((last, rest)) if last == "__init__" => rest,
        _ => parts.as_slice(),
    };

    if parts.is_empty() {
        package_name.to_string()
    } else {
        parts.join(".")
    }
}
