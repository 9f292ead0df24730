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

//! String operators

use regex::Regex;
use serde_json::Value;

use super::{ArgumentShape, FieldSpec, OperatorCategory, OperatorRegistryBuilder, RecordShape};
use crate::compiler::{Compiler, MapperFn, mapper};
use crate::core::{RemapperError, Result, display_string};
use crate::parser::OperatorNode;
use crate::register_operator;

static FORMAT_ARGUMENT: RecordShape = RecordShape {
    fields: &[
        FieldSpec::required("template", ArgumentShape::Raw),
        FieldSpec::optional("values", ArgumentShape::Map),
    ],
    shorthand: Some("template"),
};

static CASE_ARGUMENT: RecordShape = RecordShape {
    fields: &[
        FieldSpec::required("case", ArgumentShape::Raw),
        FieldSpec::optional("value", ArgumentShape::Remapper),
    ],
    shorthand: Some("case"),
};

static REPLACE_ARGUMENT: RecordShape = RecordShape {
    fields: &[
        FieldSpec::required("pattern", ArgumentShape::Raw),
        FieldSpec::required("replacement", ArgumentShape::Raw),
    ],
    shorthand: None,
};

impl OperatorRegistryBuilder {
    pub fn register_string_operators(&mut self) {
        register_operator!(
            self,
            "string.format",
            category: OperatorCategory::String,
            argument: ArgumentShape::Record(&FORMAT_ARGUMENT),
            description: "Fills {name} placeholders in the template with remapped values. Use {{ and }} for literal braces; placeholders without a value are kept as written.",
            examples: [
                r#"{"string.format": {"template": "Hello {name}", "values": {"name": {"prop": "firstName"}}}}"#
            ],
            compile: compile_format
        );

        register_operator!(
            self,
            "string.case",
            category: OperatorCategory::String,
            argument: ArgumentShape::Record(&CASE_ARGUMENT),
            description: "Converts a string to upper or lower case. Applies to the current data unless a value remapper is given.",
            examples: [
                r#"{"string.case": "upper"}"#,
                r#"{"string.case": {"case": "lower", "value": {"prop": "email"}}}"#
            ],
            compile: compile_case
        );

        register_operator!(
            self,
            "string.replace",
            category: OperatorCategory::String,
            argument: ArgumentShape::Record(&REPLACE_ARGUMENT),
            description: "Replaces every match of a regular expression in the current string.",
            examples: [r#"{"string.replace": {"pattern": "\\s+", "replacement": " "}}"#],
            compile: compile_replace
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TemplatePart {
    Text(String),
    Placeholder(String),
}

fn parse_template(template: &str) -> std::result::Result<Vec<TemplatePart>, String> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err(format!("unclosed placeholder in '{template}'")),
                    }
                }
                let name = name.trim();
                if name.is_empty() {
                    return Err(format!("empty placeholder in '{template}'"));
                }
                if !text.is_empty() {
                    parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                }
                parts.push(TemplatePart::Placeholder(name.to_string()));
            }
            '}' => return Err(format!("unmatched '}}' in '{template}'")),
            c => text.push(c),
        }
    }

    if !text.is_empty() {
        parts.push(TemplatePart::Text(text));
    }
    Ok(parts)
}

enum FormatPart {
    Text(String),
    Value(MapperFn),
}

fn compile_format(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let record = node.argument.as_record().ok_or_else(|| node.malformed("expected a record"))?;
    let template = record
        .raw("template")
        .and_then(Value::as_str)
        .ok_or_else(|| node.malformed("template must be a string"))?;
    let template = parse_template(template).map_err(|message| node.malformed(message))?;

    let values = match record.map("values") {
        Some(values) => compiler.compile_map(values)?,
        None => Vec::new(),
    };

    let parts: Vec<FormatPart> = template
        .into_iter()
        .map(|part| match part {
            TemplatePart::Text(text) => FormatPart::Text(text),
            TemplatePart::Placeholder(name) => values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| FormatPart::Value(value.clone()))
                .unwrap_or_else(|| FormatPart::Text(format!("{{{name}}}"))),
        })
        .collect();

    Ok(mapper(move |data, ctx| {
        let mut out = String::new();
        for part in &parts {
            match part {
                FormatPart::Text(text) => out.push_str(text),
                FormatPart::Value(value) => out.push_str(&display_string(&value(data, ctx)?)),
            }
        }
        Ok(Value::String(out))
    }))
}

#[derive(Debug, Clone, Copy)]
enum Case {
    Upper,
    Lower,
}

fn compile_case(node: &OperatorNode, compiler: &Compiler<'_>) -> Result<MapperFn> {
    let record = node.argument.as_record().ok_or_else(|| node.malformed("expected a record"))?;
    let case = match record.raw("case").and_then(Value::as_str) {
        Some("upper") => Case::Upper,
        Some("lower") => Case::Lower,
        _ => return Err(node.malformed("case must be \"upper\" or \"lower\"")),
    };
    let value = record
        .remapper("value")
        .map(|value| compiler.compile_node(value))
        .transpose()?;

    Ok(mapper(move |data, ctx| {
        let input = match &value {
            Some(value) => value(data, ctx)?,
            None => data.clone(),
        };
        match input {
            Value::String(s) => Ok(Value::String(match case {
                Case::Upper => s.to_uppercase(),
                Case::Lower => s.to_lowercase(),
            })),
            other => Err(RemapperError::type_mismatch("string.case", "string", &other)),
        }
    }))
}

fn compile_replace(node: &OperatorNode, _compiler: &Compiler<'_>) -> Result<MapperFn> {
    let record = node.argument.as_record().ok_or_else(|| node.malformed("expected a record"))?;
    let pattern = record
        .raw("pattern")
        .and_then(Value::as_str)
        .ok_or_else(|| node.malformed("pattern must be a string"))?;
    let regex = Regex::new(pattern)
        .map_err(|err| node.malformed(format!("invalid pattern: {err}")))?;
    let replacement = record
        .raw("replacement")
        .and_then(Value::as_str)
        .ok_or_else(|| node.malformed("replacement must be a string"))?
        .to_string();

    Ok(mapper(move |data, _ctx| match data {
        Value::String(s) => Ok(Value::String(
            regex.replace_all(s, replacement.as_str()).into_owned(),
        )),
        other => Err(RemapperError::type_mismatch("string.replace", "string", other)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};

    fn remap(definition: Value, data: Value) -> Result<Value> {
        compile(&definition)?.evaluate(&data, &Map::new())
    }

    #[test]
    fn test_parse_template() {
        assert_eq!(
            parse_template("a {x} {{b}} {y}").unwrap(),
            vec![
                TemplatePart::Text("a ".into()),
                TemplatePart::Placeholder("x".into()),
                TemplatePart::Text(" {b} ".into()),
                TemplatePart::Placeholder("y".into()),
            ]
        );
        assert!(parse_template("open {x").is_err());
        assert!(parse_template("empty {}").is_err());
        assert!(parse_template("stray }").is_err());
    }

    #[test]
    fn test_string_format() {
        let definition = json!({"string.format": {
            "template": "{greeting}, {name}! You have {count} messages{missing}",
            "values": {
                "greeting": "Hello",
                "name": {"prop": "user.name"},
                "count": {"prop": "inbox.length"}
            }
        }});
        let result = remap(
            definition,
            json!({"user": {"name": "Ada"}, "inbox": {"length": 3}}),
        )
        .unwrap();
        assert_eq!(result, json!("Hello, Ada! You have 3 messages{missing}"));
    }

    #[test]
    fn test_string_format_shorthand_and_null_values() {
        let result = remap(json!({"string.format": "plain {{text}}"}), json!(null)).unwrap();
        assert_eq!(result, json!("plain {text}"));

        let definition = json!({"string.format": {
            "template": "[{v}]",
            "values": {"v": {"prop": "nope"}}
        }});
        assert_eq!(remap(definition, json!({})).unwrap(), json!("[]"));
    }

    #[test]
    fn test_string_case() {
        assert_eq!(remap(json!({"string.case": "upper"}), json!("abc")).unwrap(), json!("ABC"));
        assert_eq!(
            remap(
                json!({"string.case": {"case": "lower", "value": {"prop": "e"}}}),
                json!({"e": "A@B.COM"})
            )
            .unwrap(),
            json!("a@b.com")
        );
        let err = remap(json!({"string.case": "upper"}), json!(42)).unwrap_err();
        assert!(matches!(err, RemapperError::TypeMismatch { .. }));
        let err = compile(&json!({"string.case": "title"})).unwrap_err();
        assert!(matches!(err, RemapperError::MalformedArgument { .. }));
    }

    #[test]
    fn test_string_replace() {
        let definition = json!({"string.replace": {"pattern": "\\s+", "replacement": "-"}});
        assert_eq!(remap(definition, json!("a  b \t c")).unwrap(), json!("a-b-c"));

        let err =
            compile(&json!({"string.replace": {"pattern": "(", "replacement": ""}})).unwrap_err();
        assert!(err.is_compile_error());
    }
}
