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

//! Operator builder pattern for easy registration

use super::{
    ArgumentShape, CompileFn, OperatorCategory, OperatorDefinition, OperatorMetadata,
    OperatorRegistryBuilder,
};

pub struct OperatorBuilder {
    name: String,
    category: OperatorCategory,
    description: String,
    argument: ArgumentShape,
    examples: Vec<String>,
}

impl OperatorBuilder {
    pub fn new(name: impl Into<String>, category: OperatorCategory) -> Self {
        Self {
            name: name.into(),
            category,
            description: String::new(),
            argument: ArgumentShape::Raw,
            examples: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn argument(mut self, argument: ArgumentShape) -> Self {
        self.argument = argument;
        self
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn build(self, compile: CompileFn) -> OperatorDefinition {
        OperatorDefinition {
            metadata: OperatorMetadata {
                name: self.name,
                category: self.category,
                description: self.description,
                argument: self.argument,
                examples: self.examples,
            },
            compile,
        }
    }

    pub fn register(self, registry: &mut OperatorRegistryBuilder, compile: CompileFn) {
        registry.register(self.build(compile));
    }
}

/// Convenience macro for operator registration
#[macro_export]
macro_rules! register_operator {
    (
        $registry:expr,
        $name:literal,
        category: $category:expr,
        argument: $argument:expr,
        description: $desc:literal,
        examples: [$($example:literal),* $(,)?],
        compile: $compile:expr
    ) => {
        {
            let mut builder = $crate::registry::builder::OperatorBuilder::new($name, $category)
                .description($desc)
                .argument($argument);

            $(
                builder = builder.example($example);
            )*

            builder.register($registry, $compile)
        }
    };
}
