//! Type reference collection for dependency attribution.
//!
//! ```text
//! ┌─────────────────────┐     ┌─────────────────────┐
//! │   import_map.rs     │     │  type_collector.rs  │
//! │  ─────────────────  │     │  ─────────────────  │
//! │  name -> module per │     │  walk annotations,  │
//! │  source module      │     │  track defined names│
//! └──────────┬──────────┘     └──────────┬──────────┘
//!            └───────────┬───────────────┘
//!                        ▼
//!            ┌─────────────────────┐
//!            │ external_refs() +   │
//!            │ resolve_package()   │──▶ deps::resolve_dependencies
//!            └─────────────────────┘
//! ```

pub mod import_map;
pub mod type_collector;

pub use import_map::{build_import_map, ImportMap};
pub use type_collector::{collect_type_refs, TypeReferenceCollector};
