//! Emitted code fragments.
//!
//! The provider compiler does not execute anything; it emits [`CodeExpr`]
//! fragments that the surrounding code generator splices into a template's
//! render function. A fragment is an immutable tree with a structurally
//! determined static type ([`CodeExpr::ty`]); the renderer evaluates it
//! against the template's frame at render time.
//!
//! [`CodeExpr::Force`] is the only fragment that can suspend: evaluating it
//! may pause rendering at its reattach [`Label`] and resume there later.
//! Everything else is suspension-free by construction, which is what lets
//! the no-suspension compilation mode make its static guarantee.

use weft_ir::{BinaryOp, Name};

/// Static result type of a [`CodeExpr`] fragment.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum StaticType {
    /// A value provider handle.
    Provider,
    /// A provider handle that may be the null reference (after
    /// [`provider_or_null`] normalization).
    NullableProvider,
    /// A plain value of statically unknown shape.
    Value,
    Bool,
    Int,
    Float,
    Str,
    /// The null literal.
    Null,
}

/// Opaque resumption-point identifier.
///
/// Allocated by the surrounding code generator; one suspension-capable
/// compilation is bound to exactly one label, and every suspend point it
/// emits reattaches there.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label(u32);

impl Label {
    pub const fn new(raw: u32) -> Self {
        Label(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Identifier of a compiler-introduced binding in emitted code.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TempId(u32);

impl TempId {
    pub const fn new(raw: u32) -> Self {
        TempId(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Which variable-binding table a [`CodeExpr::ReadSlot`] reads from.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SlotKind {
    Param,
    Local,
    LoopVar,
}

/// An emitted code fragment.
#[derive(Clone, PartialEq, Debug)]
pub enum CodeExpr {
    /// Read of the shared null-provider constant. Free; never suspends.
    NullProvider,

    /// Plain constants.
    ConstNull,
    ConstBool(bool),
    ConstInt(i64),
    /// Float constant (bits, matching the AST encoding).
    ConstFloat(u64),
    ConstStr(Name),

    /// Read of an already-compiled variable binding. The declared type comes
    /// from the binding service: provider-shaped for params and locals, and
    /// possibly a raw primitive for loop variables.
    ReadSlot {
        kind: SlotKind,
        name: Name,
        ty: StaticType,
    },

    /// Read of a compiler-introduced binding (always provider-shaped).
    ReadTemp(TempId),

    /// Bind a provider once, then evaluate `body` with the binding in
    /// scope. Both reads of the binding observe the same provider object;
    /// this is how the fork/force-twin idiom expresses "the same provider
    /// twice" without a bytecode stack.
    BindProvider {
        temp: TempId,
        init: Box<CodeExpr>,
        body: Box<CodeExpr>,
    },

    /// Evaluate `discard` for its effects, drop the result, then evaluate
    /// `then`. `discard` is fully evaluated before `then` starts.
    DiscardThen {
        discard: Box<CodeExpr>,
        then: Box<CodeExpr>,
    },

    /// Force a provider to its value. May suspend; if it does, rendering
    /// resumes at `reattach` with completed work preserved.
    Force {
        provider: Box<CodeExpr>,
        reattach: Label,
    },

    /// Box a plain value into provider form.
    BoxValue { value: Box<CodeExpr> },

    /// Normalize a provider-wrapping-null to the null reference, so a plain
    /// null check can decide whether the provider "is null" without keeping
    /// the forced value around.
    ProviderOrNull(Box<CodeExpr>),

    /// Render-time branch between two provider fragments. Selection is
    /// structural; neither branch is forced here.
    Ternary {
        cond: Box<CodeExpr>,
        then_branch: Box<CodeExpr>,
        else_branch: Box<CodeExpr>,
    },

    /// Render-time pick of the first non-null of two provider fragments.
    /// Picking never forces either side.
    FirstNonNull {
        left: Box<CodeExpr>,
        right: Box<CodeExpr>,
    },

    /// Coerce a plain value to a boolean.
    CoerceToBool(Box<CodeExpr>),

    /// Binary operation over plain values.
    Binary {
        op: BinaryOp,
        lhs: Box<CodeExpr>,
        rhs: Box<CodeExpr>,
    },
}

impl CodeExpr {
    /// Static result type of this fragment.
    pub fn ty(&self) -> StaticType {
        match self {
            CodeExpr::NullProvider | CodeExpr::ReadTemp(_) | CodeExpr::BoxValue { .. } => {
                StaticType::Provider
            }
            CodeExpr::ConstNull => StaticType::Null,
            CodeExpr::ConstBool(_) | CodeExpr::CoerceToBool(_) => StaticType::Bool,
            CodeExpr::ConstInt(_) => StaticType::Int,
            CodeExpr::ConstFloat(_) => StaticType::Float,
            CodeExpr::ConstStr(_) => StaticType::Str,
            CodeExpr::ReadSlot { ty, .. } => *ty,
            CodeExpr::BindProvider { body, .. } => body.ty(),
            CodeExpr::DiscardThen { then, .. } => then.ty(),
            CodeExpr::Force { .. } => StaticType::Value,
            CodeExpr::ProviderOrNull(_) => StaticType::NullableProvider,
            CodeExpr::Ternary { then_branch, .. } => then_branch.ty(),
            CodeExpr::FirstNonNull { .. } => StaticType::Provider,
            CodeExpr::Binary { op, lhs, .. } => match op {
                BinaryOp::Eq | BinaryOp::NotEq => StaticType::Bool,
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => lhs.ty(),
            },
        }
    }

    /// Whether evaluating this fragment can ever suspend.
    ///
    /// True iff a [`CodeExpr::Force`] occurs anywhere in the tree; no other
    /// fragment suspends.
    pub fn has_suspend_points(&self) -> bool {
        match self {
            CodeExpr::Force { .. } => true,
            CodeExpr::NullProvider
            | CodeExpr::ConstNull
            | CodeExpr::ConstBool(_)
            | CodeExpr::ConstInt(_)
            | CodeExpr::ConstFloat(_)
            | CodeExpr::ConstStr(_)
            | CodeExpr::ReadSlot { .. }
            | CodeExpr::ReadTemp(_) => false,
            CodeExpr::BindProvider { init, body, .. } => {
                init.has_suspend_points() || body.has_suspend_points()
            }
            CodeExpr::DiscardThen { discard, then } => {
                discard.has_suspend_points() || then.has_suspend_points()
            }
            CodeExpr::BoxValue { value } => value.has_suspend_points(),
            CodeExpr::ProviderOrNull(inner) | CodeExpr::CoerceToBool(inner) => {
                inner.has_suspend_points()
            }
            CodeExpr::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.has_suspend_points()
                    || then_branch.has_suspend_points()
                    || else_branch.has_suspend_points()
            }
            CodeExpr::FirstNonNull { left, right } => {
                left.has_suspend_points() || right.has_suspend_points()
            }
            CodeExpr::Binary { lhs, rhs, .. } => {
                lhs.has_suspend_points() || rhs.has_suspend_points()
            }
        }
    }
}

/// Render-time branch between two provider fragments.
pub fn ternary(cond: CodeExpr, then_branch: CodeExpr, else_branch: CodeExpr) -> CodeExpr {
    CodeExpr::Ternary {
        cond: Box::new(cond),
        then_branch: Box::new(then_branch),
        else_branch: Box::new(else_branch),
    }
}

/// Normalize a provider-wrapping-null to the null reference.
pub fn provider_or_null(provider: CodeExpr) -> CodeExpr {
    CodeExpr::ProviderOrNull(Box::new(provider))
}

/// First-non-null-of-two-providers combinator.
///
/// Lazy: building the fragment and picking a side at render time never
/// forces either provider; only the eventual consumer of the picked handle
/// does.
pub fn select_first_non_null(left: CodeExpr, right: CodeExpr) -> CodeExpr {
    CodeExpr::FirstNonNull {
        left: Box::new(left),
        right: Box::new(right),
    }
}
