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

//! Object operators

use serde_json::{Map, Value};

use super::{ArgumentShape, OperatorCategory, OperatorRegistryBuilder};
use crate::compiler::{Compiler, MapperFn, mapper};
use crate::core::{PropertyPath, RemapperError, Result};
use crate::parser::OperatorNode;
use crate::register_operator;

impl OperatorRegistryBuilder {
    pub fn register_object_operators(&mut self) {
        register_operator!(
            self,
            "object.from",
            category: OperatorCategory::Object,
            argument: ArgumentShape::Map,
            description: "Builds an object whose values are the results of the remappers. Keys keep their definition order.",
            examples: [r#"{"object.from": {"fullName": {"prop": "name"}, "kind": "person"}}"#],
            compile: compile_from
        );

        register_operator!(
            self,
            "object.assign",
            category: OperatorCategory::Object,
            argument: ArgumentShape::Map,
            description: "Copies the current object and sets the remapped values on it. Null data is treated as an empty object.",
            examples: [r#"{"object.assign": {"updated": true}}"#],
            compile: compile_assign
        );

        register_operator!(
            self,
            "object.omit",
            category: OperatorCategory::Object,
            argument: ArgumentShape::Raw,
            description: "Copies the current object without the listed keys. Entries may be dotted paths or arrays of path segments.",
            examples: [r#"{"object.omit": ["password", "meta.internal"]}"#],
            compile: compile_omit
        );
    }
}

fn entries(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<Vec<(String, MapperFn)>> {
    let map = node
        .argument
        .as_map()
        .ok_or_else(|| node.malformed("expected an object of remappers"))?;
    compiler.compile_map(map)
}

fn compile_from(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let entries = entries(node, compiler)?;
    Ok(mapper(move |data, ctx| {
        let mut out = Map::with_capacity(entries.len());
        for (key, value) in &entries {
            out.insert(key.clone(), value(data, ctx)?);
        }
        Ok(Value::Object(out))
    }))
}

fn compile_assign(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let entries = entries(node, compiler)?;
    Ok(mapper(move |data, ctx| {
        let mut out = match data {
            Value::Object(object) => object.clone(),
            Value::Null => Map::new(),
            other => return Err(RemapperError::type_mismatch("object.assign", "object", other)),
        };
        for (key, value) in &entries {
            out.insert(key.clone(), value(data, ctx)?);
        }
        Ok(Value::Object(out))
    }))
}

fn compile_omit(node: &OperatorNode, _compiler: &Compiler<'_>) -> Result<MapperFn> {
    let keys = match node.argument.as_raw() {
        Some(Value::Array(keys)) => keys.as_slice(),
        Some(key @ Value::String(_)) => std::slice::from_ref(key),
        _ => return Err(node.malformed("expected a key or an array of keys")),
    };
    let paths = keys
        .iter()
        .map(|key| match key {
            Value::String(_) | Value::Array(_) => {
                PropertyPath::from_value(key).map_err(|message| node.malformed(message))
            }
            other => Err(node.malformed(format!("keys must be strings or paths, got {other}"))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(mapper(move |data, _ctx| {
        if !data.is_object() {
            return Err(RemapperError::type_mismatch("object.omit", "object", data));
        }
        let mut out = data.clone();
        for path in &paths {
            path.remove(&mut out);
        }
        Ok(out)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn remap(definition: Value, data: Value) -> Result<Value> {
        compile(&definition)?.evaluate(&data, &Map::new())
    }

    #[test]
    fn test_object_from_keeps_key_order() {
        let result = remap(
            json!({"object.from": {"z": {"prop": "a"}, "a": {"static": {"prop": "b"}}, "m": 1}}),
            json!({"a": 10}),
        )
        .unwrap();
        assert_eq!(result, json!({"z": 10, "a": {"prop": "b"}, "m": 1}));
        let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_object_assign() {
        let definition = json!({"object.assign": {"b": {"prop": "a"}, "a": 2}});
        assert_eq!(
            remap(definition.clone(), json!({"a": 1, "c": 3})).unwrap(),
            json!({"a": 2, "c": 3, "b": 1})
        );
        assert_eq!(remap(definition.clone(), json!(null)).unwrap(), json!({"b": null, "a": 2}));
        let err = remap(definition, json!([1])).unwrap_err();
        assert!(matches!(err, RemapperError::TypeMismatch { .. }));
    }

    #[test]
    fn test_object_omit() {
        let data = json!({"user": "ada", "password": "x", "meta": {"internal": 1, "public": 2}});
        assert_eq!(
            remap(
                json!({"object.omit": ["password", "meta.internal", "absent"]}),
                data.clone()
            )
            .unwrap(),
            json!({"user": "ada", "meta": {"public": 2}})
        );
        assert_eq!(
            remap(json!({"object.omit": "user"}), data).unwrap(),
            json!({"password": "x", "meta": {"internal": 1, "public": 2}})
        );
        let err = compile(&json!({"object.omit": [1]})).unwrap_err();
        assert!(matches!(err, RemapperError::MalformedArgument { .. }));
    }
}
