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

//! Operator registry
//!
//! The registry maps operator names to their metadata (category, argument
//! shape, documentation) and to a compile function. The parser consults the
//! argument shape to resolve nested definitions, the compiler calls the
//! compile function once per operator node to obtain the evaluator closure.
//!
//! A registry is assembled with [`OperatorRegistryBuilder`] and is immutable
//! afterwards, so a single instance can be shared between threads behind an
//! `Arc`.

use std::collections::HashMap;
use std::fmt;

use crate::compiler::{Compiler, MapperFn};
use crate::core::Result;
use crate::parser::OperatorNode;

pub mod array;
pub mod builder;
pub mod datetime;
pub mod datetime_utils;
pub mod defaults;
pub mod logic;
pub mod math;
pub mod null;
pub mod object;
pub mod path;
pub mod string;
pub mod utility;

pub use builder::OperatorBuilder;
pub use datetime_utils::{DateDuration, DateTimeUtils, ParsedDate};


#[cfg(test)]
mod array_tests;

#[cfg(test)]
mod datetime_tests;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorCategory {
    Path,
    Literal,
    String,
    Logic,
    Array,
    Object,
    DateTime,
    Math,
    Context,
    Null,
    Utility,
}

impl fmt::Display for OperatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatorCategory::Path => "path",
            OperatorCategory::Literal => "literal",
            OperatorCategory::String => "string",
            OperatorCategory::Logic => "logic",
            OperatorCategory::Array => "array",
            OperatorCategory::Object => "object",
            OperatorCategory::DateTime => "date",
            OperatorCategory::Math => "math",
            OperatorCategory::Context => "context",
            OperatorCategory::Null => "null",
            OperatorCategory::Utility => "utility",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for OperatorCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(OperatorCategory::Path),
            "literal" => Ok(OperatorCategory::Literal),
            "string" => Ok(OperatorCategory::String),
            "logic" => Ok(OperatorCategory::Logic),
            "array" => Ok(OperatorCategory::Array),
            "object" => Ok(OperatorCategory::Object),
            "date" | "datetime" => Ok(OperatorCategory::DateTime),
            "math" => Ok(OperatorCategory::Math),
            "context" => Ok(OperatorCategory::Context),
            "null" => Ok(OperatorCategory::Null),
            "utility" => Ok(OperatorCategory::Utility),
            other => Err(format!("unknown operator category '{other}'")),
        }
    }
}

/// How the parser resolves an operator's argument
#[derive(Debug, Clone, Copy)]
pub enum ArgumentShape {
    /// Used verbatim, never interpreted as a remapper
    Raw,
    /// A single nested remapper definition
    Remapper,
    /// An array of remapper definitions
    List,
    /// An object whose values are remapper definitions
    Map,
    /// An object with declared fields
    Record(&'static RecordShape),
    /// An array of objects with declared fields
    Records(&'static RecordShape),
}

impl fmt::Display for ArgumentShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentShape::Raw => f.write_str("value"),
            ArgumentShape::Remapper => f.write_str("remapper"),
            ArgumentShape::List => f.write_str("[remapper]"),
            ArgumentShape::Map => f.write_str("{key: remapper}"),
            ArgumentShape::Record(shape) => write!(f, "{shape}"),
            ArgumentShape::Records(shape) => write!(f, "[{shape}]"),
        }
    }
}

#[derive(Debug)]
pub struct RecordShape {
    pub fields: &'static [FieldSpec],
    /// Field that receives the argument when it is given as a bare value
    /// instead of an object, e.g. `{"string.case": "upper"}`.
    pub shorthand: Option<&'static str>,
}

impl RecordShape {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl fmt::Display for RecordShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let marker = if field.required { "" } else { "?" };
            write!(f, "{}{}: {}", field.name, marker, field.shape)?;
        }
        f.write_str("}")
    }
}

#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: ArgumentShape,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, shape: ArgumentShape) -> Self {
        Self {
            name,
            shape,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, shape: ArgumentShape) -> Self {
        Self {
            name,
            shape,
            required: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperatorMetadata {
    pub name: String,
    pub category: OperatorCategory,
    pub description: String,
    pub argument: ArgumentShape,
    pub examples: Vec<String>,
}

/// Turns a parsed operator node into its evaluator closure.
///
/// Called once per node at compile time; argument validation that the
/// parser cannot express through [`ArgumentShape`] happens here.
pub type CompileFn = fn(&OperatorNode, &Compiler<'_>) -> Result<MapperFn>;

#[derive(Debug, Clone)]
pub struct OperatorDefinition {
    pub metadata: OperatorMetadata,
    pub compile: CompileFn,
}

/// Immutable table of operators
#[derive(Debug, Clone, Default)]
pub struct OperatorRegistry {
    operators: HashMap<String, OperatorDefinition>,
}

impl OperatorRegistry {
    pub fn builder() -> OperatorRegistryBuilder {
        OperatorRegistryBuilder::new()
    }

    /// Registry containing every built-in operator
    pub fn standard() -> Self {
        OperatorRegistryBuilder::new()
            .with_standard_operators()
            .build()
    }

    pub fn get(&self, name: &str) -> Option<&OperatorDefinition> {
        self.operators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Metadata of all operators, sorted by name
    pub fn list_operators(&self) -> Vec<&OperatorMetadata> {
        let mut operators: Vec<_> = self.operators.values().map(|op| &op.metadata).collect();
        operators.sort_by(|a, b| a.name.cmp(&b.name));
        operators
    }

    pub fn list_operators_by_category(&self, category: OperatorCategory) -> Vec<&OperatorMetadata> {
        self.list_operators()
            .into_iter()
            .filter(|metadata| metadata.category == category)
            .collect()
    }

    /// Human readable signature and documentation of an operator
    pub fn operator_help(&self, name: &str) -> Option<String> {
        self.get(name).map(|definition| {
            let metadata = &definition.metadata;
            let mut help = format!(
                "{}: {}\n\n{}",
                metadata.name, metadata.argument, metadata.description
            );
            if !metadata.examples.is_empty() {
                help.push_str("\n\nExamples:\n");
                for example in &metadata.examples {
                    help.push_str("  ");
                    help.push_str(example);
                    help.push('\n');
                }
            }
            help
        })
    }
}

/// Mutable staging area for an [`OperatorRegistry`]
#[derive(Debug, Default)]
pub struct OperatorRegistryBuilder {
    operators: HashMap<String, OperatorDefinition>,
}

impl OperatorRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an operator, returning the previous definition.
    pub fn register(&mut self, definition: OperatorDefinition) -> Option<OperatorDefinition> {
        log::trace!("registering operator '{}'", definition.metadata.name);
        self.operators
            .insert(definition.metadata.name.clone(), definition)
    }

    /// Remove an operator, e.g. to sandbox `date.now` or `log`.
    pub fn unregister(&mut self, name: &str) -> Option<OperatorDefinition> {
        self.operators.remove(name)
    }

    pub fn with_standard_operators(mut self) -> Self {
        self.register_standard_operators();
        self
    }

    pub fn build(self) -> OperatorRegistry {
        log::debug!("operator registry built with {} operators", self.operators.len());
        OperatorRegistry {
            operators: self.operators,
        }
    }
}
