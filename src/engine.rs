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

//! Remapper engine - the main entry point for compiling definitions

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::compiler::{CompiledMapper, Compiler};
use crate::core::Result;
use crate::evaluator::EngineConfig;
use crate::parser::{DefinitionParser, RemapperNode};
use crate::registry::OperatorRegistry;

static DEFAULT_ENGINE: Lazy<RemapperEngine> = Lazy::new(RemapperEngine::new);

/// Compiles remapper definitions against an operator registry
///
/// The engine is cheap to clone and can be shared between threads; compiled
/// mappers do not borrow from it.
#[derive(Debug, Clone)]
pub struct RemapperEngine {
    /// Operators available to definitions
    registry: Arc<OperatorRegistry>,
    /// Parser limits and resolution rules
    config: EngineConfig,
}

impl RemapperEngine {
    /// Create an engine with the standard operators and default configuration
    ///
    /// # Example
    /// ```rust
    /// use remapper::RemapperEngine;
    /// use serde_json::{Map, json};
    ///
    /// let engine = RemapperEngine::new();
    /// let mapper = engine.compile(&json!({"prop": "name"})).unwrap();
    /// assert_eq!(mapper.evaluate(&json!({"name": "Ada"}), &Map::new()).unwrap(), json!("Ada"));
    /// ```
    pub fn new() -> Self {
        Self::with_registry(OperatorRegistry::standard())
    }

    /// Create an engine with a custom registry
    pub fn with_registry(registry: impl Into<Arc<OperatorRegistry>>) -> Self {
        let registry = registry.into();
        log::debug!("remapper engine created with {} operators", registry.len());
        Self {
            registry,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse a definition without compiling it
    pub fn parse(&self, definition: &Value) -> Result<RemapperNode> {
        DefinitionParser::new(&self.registry, &self.config).parse(definition)
    }

    /// Parse and compile a definition.
    ///
    /// Every structural problem (unknown operator, malformed argument,
    /// excessive depth) is reported here; the returned mapper only fails on
    /// data-dependent errors.
    pub fn compile(&self, definition: &Value) -> Result<CompiledMapper> {
        let node = self.parse(definition)?;
        let mapper = Compiler::new(&self.registry).compile(&node)?;
        log::debug!("compiled definition with {} operators", node.operator_count());
        Ok(mapper)
    }

    /// Compile and evaluate in one step
    pub fn remap(
        &self,
        definition: &Value,
        data: &Value,
        variables: &Map<String, Value>,
    ) -> Result<Value> {
        self.compile(definition)?.evaluate(data, variables)
    }
}

impl Default for RemapperEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile a definition with the standard operators
pub fn compile(definition: &Value) -> Result<CompiledMapper> {
    DEFAULT_ENGINE.compile(definition)
}

/// Compile and evaluate a definition with the standard operators
pub fn remap(definition: &Value, data: &Value, variables: &Map<String, Value>) -> Result<Value> {
    DEFAULT_ENGINE.remap(definition, data, variables)
}
