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

//! Null handling operators

use serde_json::Value;

use super::{ArgumentShape, FieldSpec, OperatorCategory, OperatorRegistryBuilder, RecordShape};
use crate::compiler::{Compiler, MapperFn, mapper};
use crate::core::Result;
use crate::parser::OperatorNode;
use crate::register_operator;

static STRIP_ARGUMENT: RecordShape = RecordShape {
    fields: &[FieldSpec::optional("depth", ArgumentShape::Raw)],
    shorthand: None,
};

static DEFAULT_ARGUMENT: RecordShape = RecordShape {
    fields: &[
        FieldSpec::required("value", ArgumentShape::Remapper),
        FieldSpec::required("fallback", ArgumentShape::Remapper),
    ],
    shorthand: None,
};

impl OperatorRegistryBuilder {
    pub fn register_null_operators(&mut self) {
        register_operator!(
            self,
            "null.strip",
            category: OperatorCategory::Null,
            argument: ArgumentShape::Record(&STRIP_ARGUMENT),
            description: "Removes null object values and null array items. Recurses through all levels unless a depth is given.",
            examples: [r#"{"null.strip": null}"#, r#"{"null.strip": {"depth": 1}}"#],
            compile: compile_strip
        );

        register_operator!(
            self,
            "default",
            category: OperatorCategory::Null,
            argument: ArgumentShape::Record(&DEFAULT_ARGUMENT),
            description: "Returns value, or the fallback when value is null. The fallback is only evaluated when needed.",
            examples: [r#"{"default": {"value": {"prop": "nickname"}, "fallback": {"prop": "name"}}}"#],
            compile: compile_default
        );
    }
}

/// Remove nulls from objects and arrays down to `depth` levels
pub fn strip_nulls(value: &Value, depth: Option<u64>) -> Value {
    if depth == Some(0) {
        return value.clone();
    }
    let next = depth.map(|d| d - 1);
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v, next)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| strip_nulls(v, next))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn compile_strip(node: &OperatorNode, _compiler: &Compiler<'_>) -> Result<MapperFn> {
    let record = node.argument.as_record().ok_or_else(|| node.malformed("expected a record"))?;
    let depth = match record.raw("depth") {
        None | Some(Value::Null) => None,
        Some(depth) => Some(
            depth
                .as_u64()
                .ok_or_else(|| node.malformed("depth must be a non-negative integer"))?,
        ),
    };
    Ok(mapper(move |data, _ctx| Ok(strip_nulls(data, depth))))
}

fn compile_default(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let record = node.argument.as_record().ok_or_else(|| node.malformed("expected a record"))?;
    let value = compiler.compile_or_null(record.remapper("value"))?;
    let fallback = compiler.compile_or_null(record.remapper("fallback"))?;
    Ok(mapper(move |data, ctx| match value(data, ctx)? {
        Value::Null => fallback(data, ctx),
        other => Ok(other),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use crate::core::RemapperError;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};

    fn remap(definition: Value, data: Value) -> Result<Value> {
        compile(&definition)?.evaluate(&data, &Map::new())
    }

    #[test]
    fn test_strip_all_levels() {
        let data = json!({"a": null, "b": [1, null, {"c": null, "d": 2}], "e": {"f": null}});
        assert_eq!(
            remap(json!({"null.strip": null}), data).unwrap(),
            json!({"b": [1, {"d": 2}], "e": {}})
        );
    }

    #[test]
    fn test_strip_with_depth() {
        let data = json!({"a": null, "b": {"c": null, "d": {"e": null}}});
        assert_eq!(
            remap(json!({"null.strip": {"depth": 1}}), data.clone()).unwrap(),
            json!({"b": {"c": null, "d": {"e": null}}})
        );
        assert_eq!(
            remap(json!({"null.strip": {"depth": 2}}), data.clone()).unwrap(),
            json!({"b": {"d": {"e": null}}})
        );
        assert_eq!(remap(json!({"null.strip": {"depth": 0}}), data.clone()).unwrap(), data);
        assert_eq!(remap(json!({"null.strip": null}), json!("x")).unwrap(), json!("x"));

        let err = compile(&json!({"null.strip": {"depth": -1}})).unwrap_err();
        assert!(matches!(err, RemapperError::MalformedArgument { .. }));
    }

    #[test]
    fn test_default() {
        let definition = json!({"default": {
            "value": {"prop": "nick"},
            "fallback": {"prop": "name"}
        }});
        assert_eq!(
            remap(definition.clone(), json!({"nick": "ada", "name": "Ada"})).unwrap(),
            json!("ada")
        );
        assert_eq!(remap(definition.clone(), json!({"name": "Ada"})).unwrap(), json!("Ada"));
        // falsy but non-null values are kept
        assert_eq!(remap(definition, json!({"nick": "", "name": "Ada"})).unwrap(), json!(""));
    }

    #[test]
    fn test_default_fallback_is_lazy() {
        let definition = json!({"default": {"value": 1, "fallback": {"array.map": {"prop": "x"}}}});
        assert_eq!(remap(definition, json!({})).unwrap(), json!(1));
    }
}
