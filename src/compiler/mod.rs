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

//! Compiler from parsed definitions to composed evaluator closures
//!
//! Each node of the parsed tree is bound exactly once to its evaluation
//! function; the resulting [`CompiledMapper`] owns the whole closure tree and
//! never looks at the definition again.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::core::{RemapperError, Result};
use crate::evaluator::EvaluationContext;
use crate::parser::RemapperNode;
use crate::registry::OperatorRegistry;

/// Evaluator closure produced for a single node
pub type MapperFn = Arc<dyn Fn(&Value, &mut EvaluationContext<'_>) -> Result<Value> + Send + Sync>;

/// Wrap a closure as a [`MapperFn`].
///
/// Going through this function lets the closure signature be inferred as
/// higher-ranked over the data and context lifetimes.
pub fn mapper<F>(f: F) -> MapperFn
where
    F: Fn(&Value, &mut EvaluationContext<'_>) -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Mapper returning a fixed value
pub fn constant(value: Value) -> MapperFn {
    mapper(move |_, _| Ok(value.clone()))
}

/// Binds parsed nodes to operator implementations
pub struct Compiler<'r> {
    registry: &'r OperatorRegistry,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r OperatorRegistry) -> Self {
        Self { registry }
    }

    pub fn compile(&self, node: &RemapperNode) -> Result<CompiledMapper> {
        Ok(CompiledMapper {
            mapper: self.compile_node(node)?,
        })
    }

    pub fn compile_node(&self, node: &RemapperNode) -> Result<MapperFn> {
        match node {
            RemapperNode::Literal(value) => Ok(constant(value.clone())),
            RemapperNode::Array(items) => {
                let items = self.compile_list(items)?;
                Ok(mapper(move |data, ctx| {
                    let mut out = Vec::with_capacity(items.len());
                    for item in &items {
                        out.push(item(data, ctx)?);
                    }
                    Ok(Value::Array(out))
                }))
            }
            RemapperNode::Object(entries) => {
                let entries = self.compile_map(entries)?;
                Ok(mapper(move |data, ctx| {
                    let mut out = Map::with_capacity(entries.len());
                    for (key, entry) in &entries {
                        out.insert(key.clone(), entry(data, ctx)?);
                    }
                    Ok(Value::Object(out))
                }))
            }
            RemapperNode::Operator(op) => {
                let definition = self
                    .registry
                    .get(&op.name)
                    .ok_or_else(|| RemapperError::unknown_operator(&op.name, &op.location))?;
                log::trace!("compiling operator '{}' at {}", op.name, op.location);
                (definition.compile)(op, self)
            }
        }
    }

    pub fn compile_list(&self, nodes: &[RemapperNode]) -> Result<Vec<MapperFn>> {
        nodes.iter().map(|node| self.compile_node(node)).collect()
    }

    pub fn compile_map(
        &self,
        entries: &IndexMap<String, RemapperNode>,
    ) -> Result<Vec<(String, MapperFn)>> {
        entries
            .iter()
            .map(|(key, node)| Ok((key.clone(), self.compile_node(node)?)))
            .collect()
    }

    /// Compile an optional node, substituting `null` when absent
    pub fn compile_or_null(&self, node: Option<&RemapperNode>) -> Result<MapperFn> {
        match node {
            Some(node) => self.compile_node(node),
            None => Ok(constant(Value::Null)),
        }
    }
}

/// Immutable, thread-safe compiled remapper
///
/// Cloning is cheap and shares the closure tree.
#[derive(Clone)]
pub struct CompiledMapper {
    mapper: MapperFn,
}

impl CompiledMapper {
    /// Evaluate against `data` with the given context bag.
    ///
    /// A fresh [`EvaluationContext`] is created for the call, with `data` as
    /// its root.
    pub fn evaluate(&self, data: &Value, variables: &Map<String, Value>) -> Result<Value> {
        let mut ctx = EvaluationContext::new(data, variables);
        (self.mapper)(data, &mut ctx)
    }

    /// Evaluate with a caller-prepared context, e.g. one with a pinned clock.
    pub fn evaluate_with(&self, data: &Value, ctx: &mut EvaluationContext<'_>) -> Result<Value> {
        (self.mapper)(data, ctx)
    }

    /// The mapper as a plain `(data, context) -> value` function
    pub fn as_fn(
        &self,
    ) -> impl Fn(&Value, &Map<String, Value>) -> Result<Value> + Send + Sync + '_ {
        move |data, variables| self.evaluate(data, variables)
    }
}

impl fmt::Debug for CompiledMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledMapper").finish_non_exhaustive()
    }
}
