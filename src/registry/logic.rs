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

//! Conditional and boolean operators
//!
//! `if`, `and`, `or` and `match` evaluate their operands lazily: an operand
//! that is not needed for the result is never evaluated.

use std::cmp::Ordering;

use serde_json::Value;

use super::{ArgumentShape, FieldSpec, OperatorCategory, OperatorRegistryBuilder, RecordShape};
use crate::compiler::{Compiler, MapperFn, mapper};
use crate::core::{RemapperError, Result, deep_equal, is_truthy};
use crate::parser::OperatorNode;
use crate::register_operator;

static IF_ARGUMENT: RecordShape = RecordShape {
    fields: &[
        FieldSpec::required("condition", ArgumentShape::Remapper),
        FieldSpec::optional("then", ArgumentShape::Remapper),
        FieldSpec::optional("else", ArgumentShape::Remapper),
    ],
    shorthand: None,
};

static MATCH_CASE: RecordShape = RecordShape {
    fields: &[
        FieldSpec::required("case", ArgumentShape::Remapper),
        FieldSpec::required("value", ArgumentShape::Remapper),
    ],
    shorthand: None,
};

impl OperatorRegistryBuilder {
    pub fn register_logic_operators(&mut self) {
        register_operator!(
            self,
            "if",
            category: OperatorCategory::Logic,
            argument: ArgumentShape::Record(&IF_ARGUMENT),
            description: "Evaluates the condition and then exactly one of the branches. A missing branch yields null.",
            examples: [
                r#"{"if": {"condition": {"prop": "active"}, "then": "Active", "else": "Inactive"}}"#
            ],
            compile: compile_if
        );

        register_operator!(
            self,
            "equals",
            category: OperatorCategory::Logic,
            argument: ArgumentShape::List,
            description: "True when all operands are structurally equal.",
            examples: [r#"{"equals": [{"prop": "status"}, "done"]}"#],
            compile: compile_equals
        );

        register_operator!(
            self,
            "not",
            category: OperatorCategory::Logic,
            argument: ArgumentShape::Remapper,
            description: "Negates the truthiness of its operand.",
            examples: [r#"{"not": {"prop": "archived"}}"#],
            compile: compile_not
        );

        register_operator!(
            self,
            "and",
            category: OperatorCategory::Logic,
            argument: ArgumentShape::List,
            description: "True when every operand is truthy. Stops at the first falsy operand.",
            examples: [r#"{"and": [{"prop": "a"}, {"prop": "b"}]}"#],
            compile: compile_and
        );

        register_operator!(
            self,
            "or",
            category: OperatorCategory::Logic,
            argument: ArgumentShape::List,
            description: "True when any operand is truthy. Stops at the first truthy operand.",
            examples: [r#"{"or": [{"prop": "a"}, {"prop": "b"}]}"#],
            compile: compile_or
        );

        register_operator!(
            self,
            "gt",
            category: OperatorCategory::Logic,
            argument: ArgumentShape::List,
            description: "True when the first operand is greater than the second. Compares numbers or strings.",
            examples: [r#"{"gt": [{"prop": "age"}, 17]}"#],
            compile: compile_gt
        );

        register_operator!(
            self,
            "lt",
            category: OperatorCategory::Logic,
            argument: ArgumentShape::List,
            description: "True when the first operand is less than the second. Compares numbers or strings.",
            examples: [r#"{"lt": [{"prop": "stock"}, 5]}"#],
            compile: compile_lt
        );

        register_operator!(
            self,
            "match",
            category: OperatorCategory::Logic,
            argument: ArgumentShape::Records(&MATCH_CASE),
            description: "Returns the value of the first case whose condition is truthy, or null.",
            examples: [
                r#"{"match": [{"case": {"equals": [{"prop": "t"}, "a"]}, "value": 1}, {"case": true, "value": 0}]}"#
            ],
            compile: compile_match
        );
    }
}

fn compile_if(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let record = node.argument.as_record().ok_or_else(|| node.malformed("expected a record"))?;
    let condition = compiler.compile_or_null(record.remapper("condition"))?;
    let then = compiler.compile_or_null(record.remapper("then"))?;
    let otherwise = compiler.compile_or_null(record.remapper("else"))?;

    Ok(mapper(move |data, ctx| {
        if is_truthy(&condition(data, ctx)?) {
            then(data, ctx)
        } else {
            otherwise(data, ctx)
        }
    }))
}

fn list<'n>(node: &'n OperatorNode) -> Result<&'n [crate::parser::RemapperNode]> {
    node.argument
        .as_list()
        .ok_or_else(|| node.malformed("expected an array of remappers"))
}

fn compile_equals(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let operands = compiler.compile_list(list(node)?)?;

    Ok(mapper(move |data, ctx| {
        let mut operands = operands.iter();
        let Some(first) = operands.next() else {
            return Ok(Value::Bool(true));
        };
        let first = first(data, ctx)?;
        for operand in operands {
            if !deep_equal(&first, &operand(data, ctx)?) {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    }))
}

fn compile_not(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let operand = compiler.compile_or_null(node.argument.as_remapper())?;
    Ok(mapper(move |data, ctx| Ok(Value::Bool(!is_truthy(&operand(data, ctx)?)))))
}

fn compile_and(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let operands = compiler.compile_list(list(node)?)?;
    Ok(mapper(move |data, ctx| {
        for operand in &operands {
            if !is_truthy(&operand(data, ctx)?) {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    }))
}

fn compile_or(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let operands = compiler.compile_list(list(node)?)?;
    Ok(mapper(move |data, ctx| {
        for operand in &operands {
            if is_truthy(&operand(data, ctx)?) {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    }))
}

/// Ordering of two numbers or two strings
pub(crate) fn compare(operator: &str, left: &Value, right: &Value) -> Result<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            let ordering = match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => a.as_f64().zip(b.as_f64()).and_then(|(x, y)| x.partial_cmp(&y)),
            };
            ordering
                .ok_or_else(|| RemapperError::type_mismatch(operator, "comparable numbers", right))
        }
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Number(_), other) | (Value::String(_), other) => Err(RemapperError::type_mismatch(
            operator,
            format!("{} operand", crate::core::type_name(left)),
            other,
        )),
        (other, _) => Err(RemapperError::type_mismatch(operator, "number or string", other)),
    }
}

fn compile_comparison(
    node: &OperatorNode,
    compiler: &Compiler<'_>,
    expected: Ordering,
) -> Result<MapperFn> {
    let operands = list(node)?;
    if operands.len() != 2 {
        return Err(node.malformed(format!("expected 2 operands, got {}", operands.len())));
    }
    let left = compiler.compile_node(&operands[0])?;
    let right = compiler.compile_node(&operands[1])?;
    let name = node.name.clone();

    Ok(mapper(move |data, ctx| {
        let left = left(data, ctx)?;
        let right = right(data, ctx)?;
        Ok(Value::Bool(compare(&name, &left, &right)? == expected))
    }))
}

fn compile_gt(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    compile_comparison(node, compiler, Ordering::Greater)
}

fn compile_lt(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    compile_comparison(node, compiler, Ordering::Less)
}

fn compile_match(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let records = node
        .argument
        .as_records()
        .ok_or_else(|| node.malformed("expected an array of cases"))?;
    let cases = records
        .iter()
        .map(|record| {
            Ok((
                compiler.compile_or_null(record.remapper("case"))?,
                compiler.compile_or_null(record.remapper("value"))?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(mapper(move |data, ctx| {
        for (case, value) in &cases {
            if is_truthy(&case(data, ctx)?) {
                return value(data, ctx);
            }
        }
        Ok(Value::Null)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use rstest::rstest;
    use serde_json::{Map, json};

    fn remap(definition: Value, data: Value) -> Result<Value> {
        compile(&definition)?.evaluate(&data, &Map::new())
    }

    #[test]
    fn test_if_takes_one_branch() {
        let definition = json!({"if": {"condition": {"prop": "x"}, "then": "Y", "else": "N"}});
        assert_eq!(remap(definition.clone(), json!({"x": true})).unwrap(), json!("Y"));
        assert_eq!(remap(definition, json!({"x": false})).unwrap(), json!("N"));
    }

    #[test]
    fn test_if_does_not_evaluate_untaken_branch() {
        // the `then` branch would fail on this data
        let definition = json!({"if": {
            "condition": {"prop": "x"},
            "then": {"string.case": {"case": "upper", "value": {"prop": "missing.deep.path"}}},
            "else": "safe"
        }});
        assert_eq!(remap(definition, json!({"x": false})).unwrap(), json!("safe"));
    }

    #[test]
    fn test_if_missing_else_yields_null() {
        let definition = json!({"if": {"condition": false, "then": 1}});
        assert_eq!(remap(definition, json!(null)).unwrap(), json!(null));
    }

    #[rstest]
    #[case(json!([]), true)]
    #[case(json!([1]), true)]
    #[case(json!([1, 1.0, {"static": 1}]), true)]
    #[case(json!([{"prop": "a"}, {"prop": "b"}]), true)]
    #[case(json!([{"prop": "a"}, {"prop": "c"}]), false)]
    fn test_equals(#[case] operands: Value, #[case] expected: bool) {
        let data = json!({"a": {"k": [1, 2]}, "b": {"k": [1, 2]}, "c": {"k": [2, 1]}});
        assert_eq!(
            remap(json!({"equals": operands}), data).unwrap(),
            json!(expected)
        );
    }

    #[test]
    fn test_boolean_combinators_short_circuit() {
        let failing = json!({"array.map": {"prop": "x"}});
        // data is not an array, so `failing` would raise a type mismatch
        assert_eq!(remap(json!({"and": [false, failing]}), json!({})).unwrap(), json!(false));
        assert_eq!(remap(json!({"or": [1, failing]}), json!({})).unwrap(), json!(true));
        assert!(remap(json!({"and": [true, failing]}), json!({})).is_err());
        assert_eq!(remap(json!({"and": []}), json!(null)).unwrap(), json!(true));
        assert_eq!(remap(json!({"or": []}), json!(null)).unwrap(), json!(false));
        assert_eq!(remap(json!({"not": {"prop": "a"}}), json!({"a": ""})).unwrap(), json!(true));
    }

    #[rstest]
    #[case(json!({"gt": [2, 1]}), json!(true))]
    #[case(json!({"gt": [1, 1.5]}), json!(false))]
    #[case(json!({"lt": ["apple", "banana"]}), json!(true))]
    #[case(json!({"lt": [3, 3]}), json!(false))]
    fn test_comparisons(#[case] definition: Value, #[case] expected: Value) {
        assert_eq!(remap(definition, json!(null)).unwrap(), expected);
    }

    #[test]
    fn test_comparison_errors() {
        let err = remap(json!({"gt": [1, "1"]}), json!(null)).unwrap_err();
        assert!(matches!(err, RemapperError::TypeMismatch { .. }));
        let err = compile(&json!({"lt": [1]})).unwrap_err();
        assert!(matches!(err, RemapperError::MalformedArgument { .. }));
    }

    #[test]
    fn test_match() {
        let definition = json!({"match": [
            {"case": {"equals": [{"prop": "t"}, "a"]}, "value": "first"},
            {"case": {"equals": [{"prop": "t"}, "b"]}, "value": {"prop": "v"}}
        ]});
        assert_eq!(remap(definition.clone(), json!({"t": "a"})).unwrap(), json!("first"));
        assert_eq!(remap(definition.clone(), json!({"t": "b", "v": 7})).unwrap(), json!(7));
        assert_eq!(remap(definition, json!({"t": "z"})).unwrap(), json!(null));
    }
}
