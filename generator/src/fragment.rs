// fragment.rs — Inline code fragments and expression precedence
//
// Reporter blocks produce expressions that a parent block splices into a
// larger expression. Each expression carries the precedence of its outermost
// operator so the composing layer can decide whether parentheses are needed.
// Inside this crate the composing layer is parameter splicing: a reporter
// plugged into an input arrives as a tagged `ParameterValue` and is wrapped
// for the slot it lands in (`block::BlockInvocation::operand`). Command
// blocks produce whole statements.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Operator precedence of an expression's outermost construct, following the
/// C/Arduino generator's table. Lower binds tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    /// Literals, identifiers, member calls: `0x29`, `tof400c.distance()`.
    Atomic,
    UnaryPostfix,
    UnaryPrefix,
    Multiplicative,
    Additive,
    Shift,
    Relational,
    Equality,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    LogicalAnd,
    LogicalOr,
    Conditional,
    Assignment,
    /// Comma operator. Also the slot precedence of a call argument.
    Comma,
    /// Context that never requires parentheses (statement position, call args).
    None,
}

impl Order {
    pub fn precedence(self) -> u8 {
        match self {
            Order::Atomic => 0,
            Order::UnaryPostfix => 1,
            Order::UnaryPrefix => 2,
            Order::Multiplicative => 3,
            Order::Additive => 4,
            Order::Shift => 5,
            Order::Relational => 6,
            Order::Equality => 7,
            Order::BitwiseAnd => 8,
            Order::BitwiseXor => 9,
            Order::BitwiseOr => 10,
            Order::LogicalAnd => 11,
            Order::LogicalOr => 12,
            Order::Conditional => 13,
            Order::Assignment => 14,
            Order::Comma => 15,
            Order::None => 99,
        }
    }
}

/// An expression fragment with its precedence tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expr {
    pub code: String,
    pub order: Order,
}

impl Expr {
    pub fn new(code: impl Into<String>, order: Order) -> Self {
        Expr {
            code: code.into(),
            order,
        }
    }

    pub fn atomic(code: impl Into<String>) -> Self {
        Self::new(code, Order::Atomic)
    }

    /// Render this expression as an operand of a construct with precedence
    /// `outer`, parenthesizing when the inner expression binds no tighter.
    ///
    /// Equal `Atomic` or `None` orders never wrap: an atomic value is always
    /// safe in an atomic slot, and `None` slots accept anything.
    pub fn in_context(&self, outer: Order) -> Cow<'_, str> {
        parenthesize(&self.code, self.order, outer)
    }
}

/// Wrap `code` of precedence `inner` for a slot of precedence `outer`.
pub fn parenthesize(code: &str, inner: Order, outer: Order) -> Cow<'_, str> {
    let inner_p = inner.precedence();
    let outer_p = outer.precedence();
    let needs_parens =
        outer_p <= inner_p && !(outer_p == inner_p && matches!(outer, Order::Atomic | Order::None));
    if needs_parens {
        Cow::Owned(format!("({})", code))
    } else {
        Cow::Borrowed(code)
    }
}

/// One entry of the append-only inline stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fragment {
    /// A complete statement, including its terminating `;`.
    Statement { code: String },
    Expression { expr: Expr },
}

impl Fragment {
    pub fn code(&self) -> &str {
        match self {
            Fragment::Statement { code } => code,
            Fragment::Expression { expr } => &expr.code,
        }
    }
}
