//! Usage reachability analysis of sample code against an API model.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌────────────────┐    ┌──────────────────┐
//! │  ApiModel    │──▶ │ usage_graph.rs │──▶ │ usage_index.rs   │
//! │  (JSON)      │    │ references +   │    │ clients, methods │
//! └──────────────┘    │ reachability   │    │ return/prop maps │
//!                     └────────────────┘    └────────┬─────────┘
//!                                                    │
//!   sample files (parallel, rayon)                   ▼
//! ┌──────────────┐    ┌────────────────┐    ┌──────────────────┐
//! │ parse_file   │──▶ │ usage_infer.rs │──▶ │ usage_calls.rs   │
//! │              │    │ var -> client  │    │ precise, then by │
//! │              │    └────────────────┘    │ name             │
//! │              │──▶ usage_patterns.rs     └────────┬─────────┘
//! └──────────────┘                                   ▼
//!                                    merge in path order -> UsageReport
//! ```
//!
//! Inference is approximate by design: single pass, flow-insensitive,
//! last assignment wins.

pub mod usage_calls;
pub mod usage_graph;
pub mod usage_index;
pub mod usage_infer;
pub mod usage_patterns;

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::ApiModel;
use crate::scan::SourceFilter;
use crate::syntax::parse_file;

pub use usage_calls::{attribute_call, attribute_calls, resolve_receiver, CallSighting};
pub use usage_graph::ClassGraph;
pub use usage_index::ClientIndex;
pub use usage_infer::{build_var_types, VarTypes};
pub use usage_patterns::{detect_patterns, Pattern};

/// A client operation seen in a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoveredOperation {
    pub client: String,
    pub method: String,
    /// Sample path relative to the samples root, `/`-separated.
    pub file: String,
    pub line: usize,
}

/// A client operation no sample exercises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UncoveredOperation {
    pub client: String,
    pub method: String,
    pub sig: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub file_count: usize,
    pub covered: Vec<CoveredOperation>,
    pub uncovered: Vec<UncoveredOperation>,
    pub patterns: Vec<Pattern>,
}

impl UsageReport {
    pub fn is_covered(&self, client: &str, method: &str) -> bool {
        self.covered
            .iter()
            .any(|c| c.client == client && c.method == method)
    }

    pub fn is_uncovered(&self, client: &str, method: &str) -> bool {
        self.uncovered
            .iter()
            .any(|u| u.client == client && u.method == method)
    }
}

/// Per-file result, merged after the parallel pass.
struct FileUsage {
    rel_path: String,
    /// `None` when the file could not be read or parsed.
    sightings: Option<Vec<CallSighting>>,
    patterns: BTreeSet<Pattern>,
}

fn scan_sample(root: &Path, path: &Path, index: &ClientIndex) -> FileUsage {
    let rel_path = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");

    match parse_file(path) {
        Ok(module) => {
            let vars = build_var_types(&module, index);
            FileUsage {
                rel_path,
                sightings: Some(attribute_calls(&module, &vars, index)),
                patterns: detect_patterns(&module),
            }
        }
        Err(e) => {
            warn!(file = %path.display(), error = %e, "skipping unparseable sample");
            FileUsage {
                rel_path,
                sightings: None,
                patterns: BTreeSet::new(),
            }
        }
    }
}

/// Analyzes every sample file below `samples_root` against `model`.
///
/// A model without client classes yields the empty report without
/// scanning. An unreadable samples root is an error; unparseable files are
/// counted and skipped.
pub fn analyze_usage(samples_root: &Path, model: &ApiModel, filter: &SourceFilter) -> Result<UsageReport> {
    let index = ClientIndex::build(model);
    if index.is_empty() {
        info!("no client classes in model");
        return Ok(UsageReport::default());
    }

    let files = filter.gather(samples_root)?;
    let per_file: Vec<FileUsage> = files
        .par_iter()
        .map(|path| scan_sample(samples_root, path, &index))
        .collect();

    let report = merge(per_file, &index);
    info!(
        files = report.file_count,
        covered = report.covered.len(),
        uncovered = report.uncovered.len(),
        "usage analysis complete"
    );
    Ok(report)
}

fn merge(per_file: Vec<FileUsage>, index: &ClientIndex) -> UsageReport {
    let mut report = UsageReport {
        file_count: per_file.len(),
        ..Default::default()
    };
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut patterns: BTreeSet<Pattern> = BTreeSet::new();

    for file in per_file {
        patterns.extend(file.patterns);
        for sighting in file.sightings.into_iter().flatten() {
            if seen.insert((sighting.client.clone(), sighting.method.clone())) {
                report.covered.push(CoveredOperation {
                    client: sighting.client,
                    method: sighting.method,
                    file: file.rel_path.clone(),
                    line: sighting.line,
                });
            }
        }
    }

    let is_seen = |client: &str, method: &str| seen.contains(&(client.to_string(), method.to_string()));

    for (client, methods) in index.clients() {
        for method in methods {
            let related = index
                .bases_of(client)
                .chain(index.subclasses_of(client))
                .any(|other| is_seen(other, method));
            if is_seen(client, method) || related {
                continue;
            }
            let sig = index
                .signature(client, method)
                .map(|s| format!("{}({})", method, s))
                .unwrap_or_else(|| format!("{}(...)", method));
            report.uncovered.push(UncoveredOperation {
                client: client.to_string(),
                method: method.clone(),
                sig,
            });
        }
    }

    report.patterns = patterns.into_iter().collect();
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_model_yields_empty_report() {
        let report = analyze_usage(
            Path::new("/nonexistent/samples"),
            &ApiModel::default(),
            &SourceFilter::default(),
        )
        .unwrap();
        assert_eq!(report, UsageReport::default());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"fileCount": 0, "covered": [], "uncovered": [], "patterns": []})
        );
    }
}
