//! Expression nodes.
//!
//! Every expression that can appear inside a Weft template interpolation is
//! one of these variants. There is deliberately no catch-all variant: passes
//! that only care about a handful of kinds (the provider compiler, for one)
//! still match exhaustively, so new kinds are surfaced as compile errors in
//! every consumer.

use crate::{ExprId, Name, Span, Spanned};

/// Expression node: a kind plus its source span.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

impl Spanned for Expr {
    fn span(&self) -> Span {
        self.span
    }
}

/// Referent kind of a variable reference.
///
/// The binding service resolves each kind to a different runtime location:
/// template parameters and `let`-bound locals are stored as value providers,
/// while loop variables may be raw primitives when iterating an integer
/// range.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum VarKind {
    /// Template parameter.
    Param,
    /// `let`-bound local.
    Local,
    /// `for` loop variable.
    LoopVar,
}

/// Binary operators over plain values.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Eq,
    NotEq,
}

/// Expression variants.
///
/// All children are [`ExprId`] indices into the owning arena, not boxes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ExprKind {
    /// Null literal.
    Null,

    /// Boolean literal.
    Bool(bool),

    /// Integer literal.
    Int(i64),

    /// Float literal (stored as bits for Eq/Hash).
    Float(u64),

    /// String literal (interned).
    Str(Name),

    /// Variable reference, tagged by referent kind.
    Var { name: Name, kind: VarKind },

    /// Field access: `base.field`.
    DataAccess { base: ExprId, field: Name },

    /// Conditional operator: `cond ? then : else`.
    Conditional {
        cond: ExprId,
        then_branch: ExprId,
        else_branch: ExprId,
    },

    /// Null-coalescing operator: `left ?: right`.
    NullCoalescing { left: ExprId, right: ExprId },

    /// Binary operator application.
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
}
