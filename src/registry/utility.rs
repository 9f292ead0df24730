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

//! Composition and debugging operators

use log::Level;
use serde_json::Value;

use super::{ArgumentShape, OperatorCategory, OperatorRegistryBuilder};
use crate::compiler::{Compiler, MapperFn, mapper};
use crate::core::Result;
use crate::parser::OperatorNode;
use crate::register_operator;

impl OperatorRegistryBuilder {
    pub fn register_utility_operators(&mut self) {
        register_operator!(
            self,
            "pipe",
            category: OperatorCategory::Utility,
            argument: ArgumentShape::List,
            description: "Runs the remappers in sequence, feeding each result to the next as data.",
            examples: [r#"{"pipe": [{"prop": "items"}, {"array.map": {"prop": "id"}}]}"#],
            compile: compile_pipe
        );

        register_operator!(
            self,
            "log",
            category: OperatorCategory::Utility,
            argument: ArgumentShape::Raw,
            description: "Logs the current data at the given level (info when null) and returns it unchanged.",
            examples: [r#"{"log": "debug"}"#, r#"{"log": null}"#],
            compile: compile_log
        );
    }
}

fn compile_pipe(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let steps = node
        .argument
        .as_list()
        .ok_or_else(|| node.malformed("expected an array of remappers"))?;
    let steps = compiler.compile_list(steps)?;

    Ok(mapper(move |data, ctx| {
        ctx.descend(data.clone(), |ctx| {
            let mut current = data.clone();
            for step in &steps {
                current = step(&current, ctx)?;
            }
            Ok(current)
        })
    }))
}

fn compile_log(node: &OperatorNode, _compiler: &Compiler<'_>) -> Result<MapperFn> {
    let level = match node.argument.as_raw() {
        None | Some(Value::Null) => Level::Info,
        Some(Value::String(level)) => level
            .parse::<Level>()
            .map_err(|_| node.malformed(format!("unknown log level '{level}'")))?,
        Some(other) => return Err(node.malformed(format!("expected a log level, got {other}"))),
    };
    let location = node.location.clone();

    Ok(mapper(move |data, ctx| {
        let depth = ctx.history_len();
        log::log!(target: "remapper", level, "{location}: {data} (history depth {depth})");
        Ok(data.clone())
    }))
}
