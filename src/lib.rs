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

//! JSON remapper expressions in Rust
//!
//! A remapper definition is a JSON value describing how to transform input
//! data. Single-key objects whose key names a registered operator are
//! operator calls (`{"prop": "name"}`); every other value is a literal, with
//! arrays and objects traversed for nested operators.
//!
//! Definitions are compiled once into a [`CompiledMapper`], an immutable
//! closure tree that can be evaluated any number of times and from any
//! number of threads.
//!
//! ```rust
//! use serde_json::{Map, json};
//!
//! let mapper = remapper::compile(&json!({
//!     "array.map": {"string.case": {"case": "upper", "value": {"prop": "name"}}}
//! }))
//! .unwrap();
//!
//! let result = mapper
//!     .evaluate(&json!([{"name": "ada"}, {"name": "grace"}]), &Map::new())
//!     .unwrap();
//! assert_eq!(result, json!(["ADA", "GRACE"]));
//! ```

pub mod compiler;
pub mod core;
pub mod engine;
pub mod evaluator;
pub mod parser;
pub mod registry;

// Primary engine
pub use engine::{RemapperEngine, compile, remap};

pub use compiler::{CompiledMapper, Compiler, MapperFn};
pub use crate::core::{ErrorCode, PropertyPath, RemapperError, Result};
pub use evaluator::{EngineConfig, EvaluationContext, OperatorResolution};
pub use parser::{Argument, DefinitionParser, OperatorNode, RemapperNode};
pub use registry::{
    ArgumentShape, OperatorBuilder, OperatorCategory, OperatorDefinition, OperatorMetadata,
    OperatorRegistry, OperatorRegistryBuilder,
};
