//! Arena allocation for the flat AST.

use crate::{Expr, ExprId, ExprKind, Span};

/// Contiguous storage for all expressions in a template.
///
/// The parser builds the arena once; later phases hold `&ExprArena` and
/// never mutate it, so independent compilations of the same tree can run
/// concurrently.
#[derive(Clone, Default, Debug)]
pub struct ExprArena {
    /// All expressions (indexed by `ExprId`).
    exprs: Vec<Expr>,
}

impl ExprArena {
    /// Create a new empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an expression, returning its ID.
    #[inline]
    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::new(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    /// Get an expression by ID.
    ///
    /// # Panics
    /// Panics if `id` is invalid or out of bounds.
    #[inline]
    #[track_caller]
    pub fn get_expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    /// Get the kind of an expression.
    ///
    /// # Panics
    /// Panics if `id` is invalid or out of bounds.
    #[inline]
    #[track_caller]
    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.exprs[id.index()].kind
    }

    /// Get the span of an expression.
    ///
    /// # Panics
    /// Panics if `id` is invalid or out of bounds.
    #[inline]
    #[track_caller]
    pub fn span(&self, id: ExprId) -> Span {
        self.exprs[id.index()].span
    }

    /// Number of allocated expressions.
    #[inline]
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }
}
