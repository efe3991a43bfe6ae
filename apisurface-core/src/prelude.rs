//! Prelude module for convenient imports.
//!
//! Import commonly used types with a single line:
//!
//! ```rust,ignore
//! use apisurface_core::prelude::*;
//! ```
//!
//! This provides the most commonly needed types for extraction and usage
//! analysis without polluting the namespace with rarely-used items.

pub use std::path::Path;

// Core types
pub use crate::error::{ApiResult, ApiSurfaceError};
pub use crate::model::{ApiModel, Class, Dependency, Function, Module};

// Builder API
pub use crate::builder::{ApiSurface, ExtractionResult};

// Configuration
pub use crate::config::{load_config_or_default, ApiSurfaceConfig};

// File scanning
pub use crate::scan::SourceFilter;

// Usage analysis
pub use crate::usage::{analyze_usage, UsageReport};

// Reporting
pub use crate::report::{format_usage_plain, print_json};

#[cfg(feature = "stubs")]
pub use crate::report::format_stubs;
