//! Transitive dependency resolution for external type references.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐   external_refs()   ┌──────────────────────┐
//! │ TypeReference-    │ ──────────────────▶ │   dep_resolver.rs    │
//! │ Collector         │ ◀────────────────── │ 1. import map        │
//! └───────────────────┘   resolve_package   │ 2. dotted prefixes   │
//!                                           │ 3. search package    │
//! ┌───────────────────┐                     │ 4. exhaustive scan   │
//! │ package_index.rs  │ ──────────────────▶ │ 5. bare import root  │
//! │ site-packages     │   InstalledPackages └──────────┬───────────┘
//! └───────────────────┘                                ▼
//!                                               Vec<Dependency>
//! ```

pub mod dep_resolver;
pub mod package_index;

pub use dep_resolver::{find_class_in_package, resolve_dependencies};
pub use package_index::InstalledPackages;
