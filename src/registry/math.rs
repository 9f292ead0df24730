// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Arithmetic operator
//!
//! Operands are converted to [`Decimal`] so that `0.1 + 0.2` is exactly
//! `0.3`. Results without a fractional part are returned as JSON integers.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde_json::{Number, Value};

use super::{ArgumentShape, FieldSpec, OperatorCategory, OperatorRegistryBuilder, RecordShape};
use crate::compiler::{Compiler, MapperFn, mapper};
use crate::core::{RemapperError, Result};
use crate::parser::OperatorNode;
use crate::register_operator;

static MATH_ARGUMENT: RecordShape = RecordShape {
    fields: &[
        FieldSpec::required("operation", ArgumentShape::Raw),
        FieldSpec::required("operands", ArgumentShape::List),
    ],
    shorthand: None,
};

/// Binary operation folded left to right over the operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Min,
    Max,
}

impl MathOperation {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "add" | "+" => Self::Add,
            "subtract" | "-" => Self::Subtract,
            "multiply" | "*" => Self::Multiply,
            "divide" | "/" => Self::Divide,
            "modulo" | "%" => Self::Modulo,
            "min" => Self::Min,
            "max" => Self::Max,
            _ => return None,
        })
    }

    /// Apply to two operands
    pub fn apply(self, left: Decimal, right: Decimal) -> Result<Decimal> {
        let result = match self {
            Self::Add => left.checked_add(right),
            Self::Subtract => left.checked_sub(right),
            Self::Multiply => left.checked_mul(right),
            Self::Divide | Self::Modulo if right.is_zero() => {
                return Err(RemapperError::division_by_zero("math"));
            }
            Self::Divide => left.checked_div(right),
            Self::Modulo => left.checked_rem(right),
            Self::Min => Some(left.min(right)),
            Self::Max => Some(left.max(right)),
        };
        result.ok_or_else(|| RemapperError::overflow("math"))
    }
}

impl fmt::Display for MathOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Modulo => "modulo",
            Self::Min => "min",
            Self::Max => "max",
        };
        f.write_str(name)
    }
}

impl OperatorRegistryBuilder {
    pub fn register_math_operators(&mut self) {
        register_operator!(
            self,
            "math",
            category: OperatorCategory::Math,
            argument: ArgumentShape::Record(&MATH_ARGUMENT),
            description: "Folds the operands with add, subtract, multiply, divide, modulo, min or max using exact decimal arithmetic.",
            examples: [
                r#"{"math": {"operation": "add", "operands": [{"prop": "price"}, {"prop": "tax"}]}}"#,
                r#"{"math": {"operation": "/", "operands": [{"prop": "total"}, 2]}}"#
            ],
            compile: compile_math
        );
    }
}

/// Convert a JSON number to a decimal
pub fn to_decimal(value: &Value) -> Result<Decimal> {
    let Value::Number(number) = value else {
        return Err(RemapperError::type_mismatch("math", "number", value));
    };
    let decimal = if let Some(i) = number.as_i64() {
        Some(Decimal::from(i))
    } else if let Some(u) = number.as_u64() {
        Some(Decimal::from(u))
    } else {
        number.as_f64().and_then(Decimal::from_f64)
    };
    decimal.ok_or_else(|| RemapperError::overflow("math"))
}

/// Convert a decimal back to JSON, preferring integers
pub fn from_decimal(decimal: Decimal) -> Result<Value> {
    if decimal.fract().is_zero() {
        if let Some(i) = decimal.to_i64() {
            return Ok(Value::from(i));
        }
    }
    decimal
        .to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| RemapperError::overflow("math"))
}

fn compile_math(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let record = node.argument.as_record().ok_or_else(|| node.malformed("expected a record"))?;
    let name = record
        .raw("operation")
        .and_then(Value::as_str)
        .ok_or_else(|| node.malformed("operation must be a string"))?;
    let operation = MathOperation::from_name(name)
        .ok_or_else(|| node.malformed(format!("unknown operation '{name}'")))?;
    let operands = record.list("operands").unwrap_or_default();
    if operands.is_empty() {
        return Err(node.malformed("expected at least one operand"));
    }
    let operands = compiler.compile_list(operands)?;

    Ok(mapper(move |data, ctx| {
        let mut operands = operands.iter();
        let mut acc = match operands.next() {
            Some(first) => to_decimal(&first(data, ctx)?)?,
            None => return Ok(Value::Null),
        };
        for operand in operands {
            acc = operation.apply(acc, to_decimal(&operand(data, ctx)?)?)?;
        }
        from_decimal(acc)
    }))
}
