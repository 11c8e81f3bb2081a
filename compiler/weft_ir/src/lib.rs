//! Expression AST for the Weft template compiler.
//!
//! Weft templates embed an expression language; this crate holds the flat,
//! arena-allocated representation of that language that every later phase
//! (type checking, eager compilation, provider compilation) reads:
//!
//! - [`ExprArena`]: contiguous storage for all expressions in a template,
//!   addressed by [`ExprId`] indices instead of `Box<Expr>` pointers.
//! - [`Expr`] / [`ExprKind`]: the expression nodes themselves.
//! - [`Name`] / [`StringInterner`]: compact interned identifiers.
//! - [`Span`]: byte-offset source locations.
//!
//! The arena is built once by the parser and is read-only afterwards; a
//! single template's tree may be compiled many times (eagerly, or to a
//! value provider) without mutation.

mod arena;
mod expr;
mod expr_id;
mod interner;
mod name;
mod span;

pub use arena::ExprArena;
pub use expr::{BinaryOp, Expr, ExprKind, VarKind};
pub use expr_id::ExprId;
pub use interner::{InternError, StringInterner};
pub use name::Name;
pub use span::{Span, Spanned};
