//! apisurface-core: public API surface extraction for Python packages
//!
//! This library scans a Python package tree, extracts its public surface
//! into a serializable model, resolves the external types that surface
//! mentions, and measures which client operations a set of sample programs
//! actually exercise.
//!
//! # Features
//!
//! - **Surface extraction**: public classes, functions, properties and
//!   overloads, with entry points taken from the package initializer
//! - **Type references**: every type an annotation mentions, with import
//!   provenance per module
//! - **Dependency resolution**: external types located in installed
//!   `site-packages`, stubs before sources
//! - **Usage coverage**: reachable client classes, receiver-type inference
//!   over sample code, covered and uncovered operations
//!
//! # Quick Start
//!
//! Use the [`prelude`] module for convenient imports:
//!
//! ```rust,ignore
//! use apisurface_core::prelude::*;
//!
//! let result = ApiSurface::new("/path/to/package").extract()?;
//! let report = analyze_usage(
//!     Path::new("/path/to/samples"),
//!     &result.model,
//!     &SourceFilter::default(),
//! )?;
//!
//! for op in &report.uncovered {
//!     println!("uncovered: {}.{}", op.client, op.method);
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`syntax`]: tree-sitter parsing lowered to a closed syntax model
//! - [`typeref`]: type-reference collection and import maps
//! - [`extract`]: entry points and symbol extraction
//! - [`deps`]: installed-package discovery and dependency resolution
//! - [`usage`]: reachability, inference and coverage over samples
//! - [`scan`]: parallel file discovery
//! - [`builder`]: fluent builder API for one extraction pass
//! - [`error`]: typed error handling
//!
//! # Cargo Features
//!
//! - `stubs` (default): Python stub rendering of the API model
//! - `full`: Enable all optional features

// Core modules (always available)
pub mod builder;
pub mod builtins;
pub mod common;
pub mod config;
pub mod deps;
pub mod error;
pub mod extract;
pub mod logging;
pub mod manifest;
pub mod model;
pub mod prelude;
pub mod report;
pub mod scan;
pub mod syntax;
pub mod typeref;
pub mod usage;

// Common trait re-exports
pub use common::GraphTraversal;

// ============================================================================
// Explicit Re-exports (avoiding glob imports for clear API surface)
// ============================================================================

// Error types
pub use error::{ApiResult, ApiSurfaceError, IoResultExt};

// Builder API
pub use builder::{ApiSurface, ExtractionResult};

// Configuration
pub use config::{load_config, load_config_or_default, ApiSurfaceConfig};

// Logging
pub use logging::{init_logging, init_plain_logging, init_structured_logging, LogFormat};

// Model
pub use model::{ApiModel, Class, Dependency, Function, Module, Parameter, ParameterKind, Property};

// Classification
pub use builtins::{is_builtin, is_stdlib_package, strip_generics};

// Manifest discovery
pub use manifest::find_package_name;

// File scanning
pub use scan::{gather_py_files, SourceFilter};

// Parsing
pub use syntax::{parse_file, parse_module, ParsedModule, SyntaxError};

// Type references
pub use typeref::{collect_type_refs, TypeReferenceCollector};

// Extraction
pub use extract::{extract_module, module_name, resolve_entry_points, EntryPoints};

// Dependencies
pub use deps::{find_class_in_package, resolve_dependencies, InstalledPackages};

// Usage analysis
pub use usage::{
    analyze_usage, ClassGraph, ClientIndex, CoveredOperation, Pattern, UncoveredOperation,
    UsageReport,
};

// Reporting
pub use report::{format_usage_plain, print_json, to_json};

#[cfg(feature = "stubs")]
pub use report::format_stubs;
