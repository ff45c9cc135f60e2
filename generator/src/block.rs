// block.rs — Block invocations and parameter extraction
//
// A block invocation is one configured block instance as handed over by the
// editor: an opcode plus resolved parameter values. Each value carries the
// literal source text to splice into the sketch, and a precedence tag when it
// came from a plugged-in reporter or a tagged expression.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fragment::{parenthesize, Expr, Order};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("unknown block opcode '{0}'")]
    UnknownOpcode(String),

    #[error("block '{block}' is missing parameter '{param}'")]
    MissingParameter { block: String, param: String },

    #[error("block '{0}' does not produce a value and cannot fill an input")]
    NotAReporter(String),
}

/// A resolved parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterValue {
    /// Literal source text, e.g. `A4` or `0x29`.
    pub code: String,
    /// Precedence of `code` when it came from an expression-producing input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

impl ParameterValue {
    pub fn code(code: impl Into<String>) -> Self {
        ParameterValue {
            code: code.into(),
            order: None,
        }
    }
}

impl From<Expr> for ParameterValue {
    fn from(expr: Expr) -> Self {
        ParameterValue {
            code: expr.code,
            order: Some(expr.order),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInvocation {
    pub opcode: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParameterValue>,
}

impl BlockInvocation {
    pub fn new(opcode: impl Into<String>) -> Self {
        BlockInvocation {
            opcode: opcode.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder helper: attach a plain code parameter.
    pub fn with(mut self, name: &str, code: impl Into<String>) -> Self {
        self.params
            .insert(name.to_string(), ParameterValue::code(code));
        self
    }

    pub fn param(&self, name: &str) -> Result<&ParameterValue, BlockError> {
        self.params
            .get(name)
            .ok_or_else(|| BlockError::MissingParameter {
                block: self.opcode.clone(),
                param: name.to_string(),
            })
    }

    /// The literal code text of parameter `name`.
    pub fn code(&self, name: &str) -> Result<&str, BlockError> {
        self.param(name).map(|p| p.code.as_str())
    }

    /// Parameter `name` rendered for a slot of precedence `outer`. Untagged
    /// code literals are taken to be atomic and spliced as written.
    pub fn operand(&self, name: &str, outer: Order) -> Result<Cow<'_, str>, BlockError> {
        let p = self.param(name)?;
        Ok(parenthesize(&p.code, p.order.unwrap_or(Order::Atomic), outer))
    }
}
