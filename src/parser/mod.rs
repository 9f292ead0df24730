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

//! Definition parser
//!
//! Turns a raw remapper definition into a tree of [`RemapperNode`]s. Every
//! decision about whether an object is an operator invocation or a literal is
//! made here, once, so that the compiler and evaluator never look at operator
//! names again.
//!
//! Resolution rules:
//!
//! - scalars are literals;
//! - arrays are resolved element-wise;
//! - an object with exactly one key that is a registered operator is always an
//!   operator node, even if the author meant a literal map (use `static` for
//!   that);
//! - an object with exactly one unregistered key is rejected with
//!   `UnknownOperator` under [`OperatorResolution::Strict`] and treated as a
//!   literal under [`OperatorResolution::Lenient`];
//! - any other object is a literal whose values are resolved recursively.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::core::{RemapperError, Result};
use crate::evaluator::{EngineConfig, OperatorResolution};
use crate::registry::{ArgumentShape, OperatorRegistry, RecordShape};

/// Parsed remapper definition
#[derive(Debug, Clone, PartialEq)]
pub enum RemapperNode {
    /// Value returned as-is
    Literal(Value),
    /// Array literal containing at least one operator
    Array(Vec<RemapperNode>),
    /// Object literal containing at least one operator
    Object(IndexMap<String, RemapperNode>),
    /// Operator invocation
    Operator(OperatorNode),
}

impl RemapperNode {
    pub fn is_literal(&self) -> bool {
        matches!(self, RemapperNode::Literal(_))
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            RemapperNode::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Number of operator nodes in this tree
    pub fn operator_count(&self) -> usize {
        match self {
            RemapperNode::Literal(_) => 0,
            RemapperNode::Array(items) => items.iter().map(RemapperNode::operator_count).sum(),
            RemapperNode::Object(entries) => {
                entries.values().map(RemapperNode::operator_count).sum()
            }
            RemapperNode::Operator(node) => 1 + node.argument.operator_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorNode {
    pub name: String,
    pub argument: Argument,
    /// Location of the operator object inside the definition
    pub location: String,
}

impl OperatorNode {
    /// Build a malformed argument error pointing at this node
    pub fn malformed(&self, message: impl Into<String>) -> RemapperError {
        RemapperError::malformed_argument(&self.name, message, &self.location)
    }
}

/// Operator argument resolved according to its [`ArgumentShape`]
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Raw(Value),
    Remapper(Box<RemapperNode>),
    List(Vec<RemapperNode>),
    Map(IndexMap<String, RemapperNode>),
    Record(Record),
    Records(Vec<Record>),
}

impl Argument {
    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            Argument::Raw(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_remapper(&self) -> Option<&RemapperNode> {
        match self {
            Argument::Remapper(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[RemapperNode]> {
        match self {
            Argument::List(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, RemapperNode>> {
        match self {
            Argument::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Argument::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_records(&self) -> Option<&[Record]> {
        match self {
            Argument::Records(records) => Some(records),
            _ => None,
        }
    }

    fn operator_count(&self) -> usize {
        match self {
            Argument::Raw(_) => 0,
            Argument::Remapper(node) => node.operator_count(),
            Argument::List(nodes) => nodes.iter().map(RemapperNode::operator_count).sum(),
            Argument::Map(entries) => entries.values().map(RemapperNode::operator_count).sum(),
            Argument::Record(record) => record.operator_count(),
            Argument::Records(records) => records.iter().map(Record::operator_count).sum(),
        }
    }
}

/// Fields of a record-shaped argument, in definition order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: IndexMap<String, Argument>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(Argument::as_raw)
    }

    pub fn remapper(&self, name: &str) -> Option<&RemapperNode> {
        self.get(name).and_then(Argument::as_remapper)
    }

    pub fn list(&self, name: &str) -> Option<&[RemapperNode]> {
        self.get(name).and_then(Argument::as_list)
    }

    pub fn map(&self, name: &str) -> Option<&IndexMap<String, RemapperNode>> {
        self.get(name).and_then(Argument::as_map)
    }

    fn operator_count(&self) -> usize {
        self.fields.values().map(Argument::operator_count).sum()
    }
}

/// Parses definitions against a registry and configuration
pub struct DefinitionParser<'a> {
    registry: &'a OperatorRegistry,
    config: &'a EngineConfig,
}

impl<'a> DefinitionParser<'a> {
    pub fn new(registry: &'a OperatorRegistry, config: &'a EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn parse(&self, definition: &Value) -> Result<RemapperNode> {
        self.parse_node(definition, "$", 0)
    }

    fn parse_node(&self, value: &Value, location: &str, depth: usize) -> Result<RemapperNode> {
        if depth > self.config.max_definition_depth {
            return Err(RemapperError::definition_too_deep(
                self.config.max_definition_depth,
                location,
            ));
        }

        match value {
            Value::Array(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    nodes.push(self.parse_node(item, &format!("{location}[{i}]"), depth + 1)?);
                }
                if self.config.fold_literals && nodes.iter().all(RemapperNode::is_literal) {
                    return Ok(RemapperNode::Literal(value.clone()));
                }
                Ok(RemapperNode::Array(nodes))
            }
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some((key, argument)) = map.iter().next() {
                        if let Some(definition) = self.registry.get(key) {
                            let argument_location = format!("{location}.{key}");
                            let argument = self.parse_argument(
                                key,
                                definition.metadata.argument,
                                argument,
                                &argument_location,
                                depth + 1,
                            )?;
                            return Ok(RemapperNode::Operator(OperatorNode {
                                name: key.clone(),
                                argument,
                                location: location.to_string(),
                            }));
                        }
                        if self.config.operator_resolution == OperatorResolution::Strict {
                            return Err(RemapperError::unknown_operator(key, location));
                        }
                    }
                }
                self.parse_object(value, map, location, depth)
            }
            _ => Ok(RemapperNode::Literal(value.clone())),
        }
    }

    fn parse_object(
        &self,
        value: &Value,
        map: &Map<String, Value>,
        location: &str,
        depth: usize,
    ) -> Result<RemapperNode> {
        let mut entries = IndexMap::with_capacity(map.len());
        for (key, item) in map {
            let node = self.parse_node(item, &format!("{location}.{key}"), depth + 1)?;
            entries.insert(key.clone(), node);
        }
        if self.config.fold_literals && entries.values().all(RemapperNode::is_literal) {
            return Ok(RemapperNode::Literal(value.clone()));
        }
        Ok(RemapperNode::Object(entries))
    }

    fn parse_argument(
        &self,
        operator: &str,
        shape: ArgumentShape,
        value: &Value,
        location: &str,
        depth: usize,
    ) -> Result<Argument> {
        match shape {
            ArgumentShape::Raw => Ok(Argument::Raw(value.clone())),
            ArgumentShape::Remapper => Ok(Argument::Remapper(Box::new(
                self.parse_node(value, location, depth)?,
            ))),
            ArgumentShape::List => {
                let items = value.as_array().ok_or_else(|| {
                    RemapperError::malformed_argument(
                        operator,
                        "expected an array of remappers",
                        location,
                    )
                })?;
                let mut nodes = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    nodes.push(self.parse_node(item, &format!("{location}[{i}]"), depth + 1)?);
                }
                Ok(Argument::List(nodes))
            }
            ArgumentShape::Map => {
                let map = value.as_object().ok_or_else(|| {
                    RemapperError::malformed_argument(
                        operator,
                        "expected an object mapping keys to remappers",
                        location,
                    )
                })?;
                let mut entries = IndexMap::with_capacity(map.len());
                for (key, item) in map {
                    let node = self.parse_node(item, &format!("{location}.{key}"), depth + 1)?;
                    entries.insert(key.clone(), node);
                }
                Ok(Argument::Map(entries))
            }
            ArgumentShape::Record(record) => Ok(Argument::Record(
                self.parse_record(operator, record, value, location, depth)?,
            )),
            ArgumentShape::Records(record) => {
                let items = value.as_array().ok_or_else(|| {
                    RemapperError::malformed_argument(
                        operator,
                        format!("expected an array of {record}"),
                        location,
                    )
                })?;
                let mut records = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    records.push(self.parse_record(
                        operator,
                        record,
                        item,
                        &format!("{location}[{i}]"),
                        depth + 1,
                    )?);
                }
                Ok(Argument::Records(records))
            }
        }
    }

    fn parse_record(
        &self,
        operator: &str,
        shape: &RecordShape,
        value: &Value,
        location: &str,
        depth: usize,
    ) -> Result<Record> {
        let mut fields = IndexMap::new();

        match value {
            Value::Object(map) => {
                for (key, item) in map {
                    let field = shape.field(key).ok_or_else(|| {
                        RemapperError::malformed_argument(
                            operator,
                            format!("unknown field '{key}', expected {shape}"),
                            location,
                        )
                    })?;
                    let argument = self.parse_argument(
                        operator,
                        field.shape,
                        item,
                        &format!("{location}.{key}"),
                        depth + 1,
                    )?;
                    fields.insert(key.clone(), argument);
                }
            }
            Value::Null => {}
            other => match shape.shorthand.and_then(|name| shape.field(name)) {
                Some(field) => {
                    let argument =
                        self.parse_argument(operator, field.shape, other, location, depth + 1)?;
                    fields.insert(field.name.to_string(), argument);
                }
                None => {
                    return Err(RemapperError::malformed_argument(
                        operator,
                        format!("expected {shape}"),
                        location,
                    ));
                }
            },
        }

        if let Some(missing) = shape
            .fields
            .iter()
            .find(|field| field.required && !fields.contains_key(field.name))
        {
            return Err(RemapperError::malformed_argument(
                operator,
                format!("missing required field '{}'", missing.name),
                location,
            ));
        }

        Ok(Record { fields })
    }
}
