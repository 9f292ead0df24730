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

//! Array operators
//!
//! The iterating operators (`array.map`, `array.filter`, `array.find`,
//! `array.unique`) push the whole array onto the history stack once and
//! evaluate their sub-remapper with each element as the current data.
//! Iteration is a plain loop, so input breadth never grows the call stack.

use serde_json::Value;

use super::{ArgumentShape, OperatorCategory, OperatorRegistryBuilder};
use crate::compiler::{Compiler, MapperFn, mapper};
use crate::core::{RemapperError, Result, deep_equal, is_truthy};
use crate::evaluator::EvaluationContext;
use crate::parser::{OperatorNode, RemapperNode};
use crate::register_operator;

impl OperatorRegistryBuilder {
    pub fn register_array_operators(&mut self) {
        register_operator!(
            self,
            "array.map",
            category: OperatorCategory::Array,
            argument: ArgumentShape::Remapper,
            description: "Evaluates the remapper for every element and collects the results.",
            examples: [r#"{"array.map": {"prop": "name"}}"#],
            compile: compile_map
        );

        register_operator!(
            self,
            "array.filter",
            category: OperatorCategory::Array,
            argument: ArgumentShape::Remapper,
            description: "Keeps the elements for which the remapper is truthy.",
            examples: [r#"{"array.filter": {"prop": "active"}}"#],
            compile: compile_filter
        );

        register_operator!(
            self,
            "array.find",
            category: OperatorCategory::Array,
            argument: ArgumentShape::Remapper,
            description: "Returns the first element for which the remapper is truthy, or null.",
            examples: [r#"{"array.find": {"equals": [{"prop": "id"}, 3]}}"#],
            compile: compile_find
        );

        register_operator!(
            self,
            "array.unique",
            category: OperatorCategory::Array,
            argument: ArgumentShape::Remapper,
            description: "Removes elements whose key equals the key of an earlier element. The key is the element itself when the argument is null.",
            examples: [r#"{"array.unique": null}"#, r#"{"array.unique": {"prop": "id"}}"#],
            compile: compile_unique
        );

        register_operator!(
            self,
            "array.from",
            category: OperatorCategory::Array,
            argument: ArgumentShape::List,
            description: "Builds an array from the results of the remappers.",
            examples: [r#"{"array.from": [{"prop": "first"}, {"prop": "last"}]}"#],
            compile: compile_from
        );

        register_operator!(
            self,
            "array.append",
            category: OperatorCategory::Array,
            argument: ArgumentShape::List,
            description: "Appends the results of the remappers to the current array.",
            examples: [r#"{"array.append": [{"root": {"prop": "extra"}}]}"#],
            compile: compile_append
        );

        register_operator!(
            self,
            "array.omit",
            category: OperatorCategory::Array,
            argument: ArgumentShape::List,
            description: "Removes the elements at the given indices. Negative indices count from the end.",
            examples: [r#"{"array.omit": [0, -1]}"#],
            compile: compile_omit
        );
    }
}

fn expect_array<'v>(operator: &str, data: &'v Value) -> Result<&'v Vec<Value>> {
    data.as_array()
        .ok_or_else(|| RemapperError::type_mismatch(operator, "array", data))
}

/// Run `f` for every element with the array pushed onto history
fn each_element<T>(
    array: &[Value],
    ancestor: &Value,
    ctx: &mut EvaluationContext<'_>,
    mut f: impl FnMut(&Value, &mut EvaluationContext<'_>) -> Result<Option<T>>,
) -> Result<Vec<T>> {
    ctx.descend(ancestor.clone(), |ctx| {
        let mut out = Vec::with_capacity(array.len());
        for item in array {
            if let Some(value) = f(item, ctx)? {
                out.push(value);
            }
        }
        Ok(out)
    })
}

fn iteratee(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let inner = node
        .argument
        .as_remapper()
        .ok_or_else(|| node.malformed("expected a remapper"))?;
    compiler.compile_node(inner)
}

fn compile_map(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let inner = iteratee(node, compiler)?;
    Ok(mapper(move |data, ctx| {
        let array = expect_array("array.map", data)?;
        let results = each_element(array, data, ctx, |item, ctx| inner(item, ctx).map(Some))?;
        Ok(Value::Array(results))
    }))
}

fn compile_filter(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let predicate = iteratee(node, compiler)?;
    Ok(mapper(move |data, ctx| {
        let array = expect_array("array.filter", data)?;
        let kept = each_element(array, data, ctx, |item, ctx| {
            Ok(is_truthy(&predicate(item, ctx)?).then(|| item.clone()))
        })?;
        Ok(Value::Array(kept))
    }))
}

fn compile_find(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let predicate = iteratee(node, compiler)?;
    Ok(mapper(move |data, ctx| {
        let array = expect_array("array.find", data)?;
        ctx.descend(data.clone(), |ctx| {
            for item in array {
                if is_truthy(&predicate(item, ctx)?) {
                    return Ok(item.clone());
                }
            }
            Ok(Value::Null)
        })
    }))
}

fn compile_unique(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let key = match node.argument.as_remapper() {
        Some(inner) if inner.as_literal() == Some(&Value::Null) => None,
        Some(inner) => Some(compiler.compile_node(inner)?),
        None => None,
    };

    Ok(mapper(move |data, ctx| {
        let array = expect_array("array.unique", data)?;
        let mut seen: Vec<Value> = Vec::new();
        let kept = each_element(array, data, ctx, |item, ctx| {
            let k = match &key {
                Some(key) => key(item, ctx)?,
                None => item.clone(),
            };
            if seen.iter().any(|s| deep_equal(s, &k)) {
                return Ok(None);
            }
            seen.push(k);
            Ok(Some(item.clone()))
        })?;
        Ok(Value::Array(kept))
    }))
}

fn operands(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<Vec<MapperFn>> {
    let list: &[RemapperNode] = node
        .argument
        .as_list()
        .ok_or_else(|| node.malformed("expected an array of remappers"))?;
    compiler.compile_list(list)
}

fn evaluate_all(
    operands: &[MapperFn],
    data: &Value,
    ctx: &mut EvaluationContext<'_>,
) -> Result<Vec<Value>> {
    operands.iter().map(|operand| operand(data, ctx)).collect()
}

fn compile_from(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let operands = operands(node, compiler)?;
    Ok(mapper(move |data, ctx| Ok(Value::Array(evaluate_all(&operands, data, ctx)?))))
}

fn compile_append(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let operands = operands(node, compiler)?;
    Ok(mapper(move |data, ctx| {
        let mut array = expect_array("array.append", data)?.clone();
        array.extend(evaluate_all(&operands, data, ctx)?);
        Ok(Value::Array(array))
    }))
}

fn compile_omit(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let operands = operands(node, compiler)?;
    Ok(mapper(move |data, ctx| {
        let array = expect_array("array.omit", data)?;
        let len = array.len() as i64;
        let mut omitted = Vec::with_capacity(operands.len());
        for index in evaluate_all(&operands, data, ctx)? {
            let i = index.as_i64().ok_or_else(|| {
                RemapperError::type_mismatch("array.omit", "integer index", &index)
            })?;
            let i = if i < 0 { len + i } else { i };
            if (0..len).contains(&i) {
                omitted.push(i as usize);
            }
        }
        let kept = array
            .iter()
            .enumerate()
            .filter(|(i, _)| !omitted.contains(i))
            .map(|(_, item)| item.clone())
            .collect();
        Ok(Value::Array(kept))
    }))
}
