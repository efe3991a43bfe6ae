//! Structural usage patterns detected from node kinds alone.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::syntax::{walk_block, walk_expr, walk_module, walk_stmt, Block, BlockKind, Expr, ParsedModule, Stmt, Visit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pattern {
    /// `await`, `async with` or `async for`.
    #[serde(rename = "async")]
    Async,
    /// `try` blocks.
    #[serde(rename = "error-handling")]
    ErrorHandling,
    /// `async for`.
    #[serde(rename = "streaming")]
    Streaming,
}

impl Pattern {
    pub const ALL: [Pattern; 3] = [Pattern::Async, Pattern::ErrorHandling, Pattern::Streaming];

    pub fn as_str(self) -> &'static str {
        match self {
            Pattern::Async => "async",
            Pattern::ErrorHandling => "error-handling",
            Pattern::Streaming => "streaming",
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Default)]
struct PatternDetector {
    found: BTreeSet<Pattern>,
}

impl PatternDetector {
    fn done(&self) -> bool {
        self.found.len() == Pattern::ALL.len()
    }
}

impl<'ast> Visit<'ast> for PatternDetector {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        if !self.done() {
            walk_stmt(self, stmt);
        }
    }

    fn visit_block(&mut self, block: &'ast Block) {
        if self.done() {
            return;
        }
        match block.kind {
            BlockKind::AsyncFor => {
                self.found.insert(Pattern::Async);
                self.found.insert(Pattern::Streaming);
            }
            BlockKind::AsyncWith => {
                self.found.insert(Pattern::Async);
            }
            BlockKind::Try => {
                self.found.insert(Pattern::ErrorHandling);
            }
            _ => {}
        }
        walk_block(self, block);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        if self.done() {
            return;
        }
        if matches!(expr, Expr::Await(_)) {
            self.found.insert(Pattern::Async);
        }
        walk_expr(self, expr);
    }
}

/// Patterns present in one file; the walk stops once all are seen.
pub fn detect_patterns(module: &ParsedModule) -> BTreeSet<Pattern> {
    let mut detector = PatternDetector::default();
    walk_module(&mut detector, module);
    detector.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_module;

    fn patterns(src: &str) -> Vec<&'static str> {
        detect_patterns(&parse_module(src).unwrap())
            .into_iter()
            .map(Pattern::as_str)
            .collect()
    }

    #[test]
    fn test_detects_each_pattern() {
        assert_eq!(patterns("async def f():\n    await g()\n"), vec!["async"]);
        assert_eq!(
            patterns("try:\n    x()\nexcept ValueError:\n    pass\n"),
            vec!["error-handling"]
        );
        assert_eq!(
            patterns("async def f(stream):\n    async for item in stream:\n        print(item)\n"),
            vec!["async", "streaming"]
        );
        assert_eq!(
            patterns("async def f(c):\n    async with c:\n        pass\n"),
            vec!["async"]
        );
    }

    #[test]
    fn test_plain_code_has_no_patterns() {
        assert!(patterns("for x in items():\n    with open(x) as f:\n        f.read()\n").is_empty());
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(
            serde_json::to_string(&Pattern::ErrorHandling).unwrap(),
            "\"error-handling\""
        );
        assert_eq!(Pattern::Streaming.to_string(), "streaming");
    }
}
