//! Span bookkeeping for bottom-up node construction.
//!
//! A rule takes a [`Marker`] before consuming its first token and completes
//! it once its last token is consumed. Nodes are built from already-finished
//! children in one step, so a node's span is fixed at construction.

use crate::ast::ErrorNode;
use crate::span::Span;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Marker {
    start: u32,
}

impl Marker {
    pub(crate) fn new(start: u32) -> Self {
        Marker { start }
    }

    /// Span from the marker to `end`. A rule that consumed nothing gets an
    /// empty span at the marker.
    pub(crate) fn complete(self, end: u32) -> Span {
        Span::new(self.start, end.max(self.start))
    }

    pub(crate) fn error_node(self, end: u32) -> ErrorNode {
        ErrorNode {
            span: self.complete(end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_never_runs_backwards() {
        let m = Marker::new(10);
        assert_eq!(m.complete(14), Span::new(10, 14));
        assert_eq!(m.complete(3), Span::empty(10));
    }
}
