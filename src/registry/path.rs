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

//! Identity, path, literal and context operators

use serde_json::Value;

use super::{ArgumentShape, OperatorCategory, OperatorRegistryBuilder};
use crate::compiler::{Compiler, MapperFn, constant, mapper};
use crate::core::{PropertyPath, Result};
use crate::parser::OperatorNode;
use crate::register_operator;

impl OperatorRegistryBuilder {
    pub fn register_path_operators(&mut self) {
        register_operator!(
            self,
            "prop",
            category: OperatorCategory::Path,
            argument: ArgumentShape::Raw,
            description: "Reads a property path from the current data. Missing paths yield null.",
            examples: [
                r#"{"prop": "address.city"}"#,
                r#"{"prop": "items[0].name"}"#,
                r#"{"prop": ["key.with.dots", 0]}"#
            ],
            compile: compile_prop
        );

        register_operator!(
            self,
            "root",
            category: OperatorCategory::Path,
            argument: ArgumentShape::Remapper,
            description: "Evaluates its argument against the top-level input data. With a null argument it returns the root itself.",
            examples: [r#"{"root": null}"#, r#"{"root": {"prop": "title"}}"#],
            compile: compile_root
        );

        register_operator!(
            self,
            "history",
            category: OperatorCategory::Path,
            argument: ArgumentShape::Raw,
            description: "Returns the N-th ancestor data value, counting from the innermost (0).",
            examples: [r#"{"array.map": {"history": 0}}"#],
            compile: compile_history
        );

        register_operator!(
            self,
            "static",
            category: OperatorCategory::Literal,
            argument: ArgumentShape::Raw,
            description: "Returns its argument unevaluated.",
            examples: [r#"{"static": {"prop": "not an operator"}}"#],
            compile: compile_static
        );

        register_operator!(
            self,
            "context",
            category: OperatorCategory::Context,
            argument: ArgumentShape::Raw,
            description: "Reads a value from the context bag supplied by the caller. Missing keys yield null.",
            examples: [r#"{"context": "locale"}"#, r#"{"context": "user.name"}"#],
            compile: compile_context
        );
    }
}

fn parse_path(node: &OperatorNode) -> Result<PropertyPath> {
    let raw = node.argument.as_raw().ok_or_else(|| node.malformed("expected a path"))?;
    PropertyPath::from_value(raw).map_err(|message| node.malformed(message))
}

fn compile_prop(node: &OperatorNode, _compiler: &Compiler<'_>) -> Result<MapperFn> {
    let path = parse_path(node)?;
    Ok(mapper(move |data, _ctx| {
        Ok(path.lookup(data).cloned().unwrap_or(Value::Null))
    }))
}

fn compile_root(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let inner = match node.argument.as_remapper() {
        Some(inner) if inner.as_literal() == Some(&Value::Null) => None,
        Some(inner) => Some(compiler.compile_node(inner)?),
        None => None,
    };

    Ok(mapper(move |data, ctx| {
        let root = ctx.root();
        match &inner {
            Some(inner) => ctx.descend(data.clone(), |ctx| inner(root, ctx)),
            None => Ok(root.clone()),
        }
    }))
}

fn compile_history(node: &OperatorNode, _compiler: &Compiler<'_>) -> Result<MapperFn> {
    let index = node
        .argument
        .as_raw()
        .and_then(Value::as_u64)
        .and_then(|index| usize::try_from(index).ok())
        .ok_or_else(|| node.malformed("expected a non-negative integer"))?;

    Ok(mapper(move |_data, ctx| {
        Ok(ctx.history(index).cloned().unwrap_or(Value::Null))
    }))
}

fn compile_static(node: &OperatorNode, _compiler: &Compiler<'_>) -> Result<MapperFn> {
    let value = node.argument.as_raw().cloned().unwrap_or(Value::Null);
    Ok(constant(value))
}

fn compile_context(node: &OperatorNode, _compiler: &Compiler<'_>) -> Result<MapperFn> {
    let path = parse_path(node)?;
    if path.is_empty() {
        return Err(node.malformed("expected a non-empty context key"));
    }
    Ok(mapper(move |_data, ctx| {
        Ok(ctx.variable(&path).cloned().unwrap_or(Value::Null))
    }))
}

#[cfg(test)]
mod tests {
    use crate::compile;
    use crate::core::RemapperError;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::{Map, Value, json};

    fn remap(definition: Value, data: Value) -> crate::core::Result<Value> {
        compile(&definition)?.evaluate(&data, &Map::new())
    }

    #[rstest]
    #[case(json!({"prop": "name"}), json!("Ada"))]
    #[case(json!({"prop": "langs[1]"}), json!("fr"))]
    #[case(json!({"prop": "langs.-1"}), json!("de"))]
    #[case(json!({"prop": ["a.b", 0]}), json!(true))]
    #[case(json!({"prop": "langs[7]"}), json!(null))]
    fn test_prop(#[case] definition: Value, #[case] expected: Value) {
        let data = json!({"name": "Ada", "langs": ["en", "fr", "de"], "a.b": [true]});
        assert_eq!(remap(definition, data).unwrap(), expected);
    }

    #[test]
    fn test_prop_integer_indexes_arrays() {
        assert_eq!(remap(json!({"prop": 1}), json!(["x", "y"])).unwrap(), json!("y"));
        assert_eq!(remap(json!({"prop": 1}), json!("xy")).unwrap(), json!(null));
    }

    #[rstest]
    #[case(json!({"prop": true}))]
    #[case(json!({"prop": "a[x]"}))]
    #[case(json!({"history": -1}))]
    #[case(json!({"history": "0"}))]
    #[case(json!({"context": ""}))]
    fn test_malformed_arguments(#[case] definition: Value) {
        let err = compile(&definition).unwrap_err();
        assert!(matches!(err, RemapperError::MalformedArgument { .. }), "{err}");
    }

    #[test]
    fn test_root_without_argument_returns_root() {
        let data = json!({"items": [1, 2]});
        let definition = json!({"pipe": [{"prop": "items"}, {"root": null}]});
        assert_eq!(remap(definition, data.clone()).unwrap(), data);
    }

    #[test]
    fn test_history_out_of_range_is_null() {
        assert_eq!(remap(json!({"history": 0}), json!(1)).unwrap(), json!(null));
        assert_eq!(
            remap(json!({"array.map": {"history": 3}}), json!([1])).unwrap(),
            json!([null])
        );
        assert_eq!(
            remap(json!({"array.map": {"history": u64::MAX}}), json!([1])).unwrap(),
            json!([null])
        );
    }

    #[test]
    fn test_static_and_context() {
        assert_eq!(
            remap(json!({"static": [{"prop": "x"}]}), json!({"x": 1})).unwrap(),
            json!([{"prop": "x"}])
        );
        assert_eq!(remap(json!({"static": null}), json!(1)).unwrap(), json!(null));

        let mut vars = Map::new();
        vars.insert("page".into(), json!({"params": {"id": "42"}}));
        let mapper = compile(&json!({"context": "page.params.id"})).unwrap();
        assert_eq!(mapper.evaluate(&json!(null), &vars).unwrap(), json!("42"));
        assert_eq!(mapper.evaluate(&json!(null), &Map::new()).unwrap(), json!(null));
    }
}
