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

//! Date operators

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use serde_json::Value;

use super::datetime_utils::{DateDuration, DateTimeUtils};
use super::{ArgumentShape, FieldSpec, OperatorCategory, OperatorRegistryBuilder, RecordShape};
use crate::compiler::{Compiler, MapperFn, mapper};
use crate::core::{RemapperError, Result};
use crate::parser::OperatorNode;
use crate::register_operator;

static ADD_ARGUMENT: RecordShape = RecordShape {
    fields: &[
        FieldSpec::optional("duration", ArgumentShape::Raw),
        FieldSpec::optional("years", ArgumentShape::Raw),
        FieldSpec::optional("months", ArgumentShape::Raw),
        FieldSpec::optional("weeks", ArgumentShape::Raw),
        FieldSpec::optional("days", ArgumentShape::Raw),
        FieldSpec::optional("hours", ArgumentShape::Raw),
        FieldSpec::optional("minutes", ArgumentShape::Raw),
        FieldSpec::optional("seconds", ArgumentShape::Raw),
    ],
    shorthand: Some("duration"),
};

impl OperatorRegistryBuilder {
    pub fn register_datetime_operators(&mut self) {
        register_operator!(
            self,
            "date.now",
            category: OperatorCategory::DateTime,
            argument: ArgumentShape::Raw,
            description: "Returns the evaluation instant as an RFC 3339 UTC timestamp. The argument is ignored.",
            examples: [r#"{"date.now": null}"#],
            compile: compile_now
        );

        register_operator!(
            self,
            "date.add",
            category: OperatorCategory::DateTime,
            argument: ArgumentShape::Record(&ADD_ARGUMENT),
            description: "Shifts the current date by an ISO 8601 duration or by explicit units. Months clamp to the end of the month.",
            examples: [
                r#"{"date.add": "P1M"}"#,
                r#"{"date.add": {"days": -7, "hours": 12}}"#
            ],
            compile: compile_add
        );

        register_operator!(
            self,
            "date.format",
            category: OperatorCategory::DateTime,
            argument: ArgumentShape::Raw,
            description: "Formats the current date with a strftime pattern, or as RFC 3339 when the pattern is null.",
            examples: [r#"{"date.format": "%d/%m/%Y"}"#],
            compile: compile_format
        );

        register_operator!(
            self,
            "date.parse",
            category: OperatorCategory::DateTime,
            argument: ArgumentShape::Raw,
            description: "Parses the current string with a strftime pattern and normalizes it. A null pattern accepts RFC 3339 and YYYY-MM-DD.",
            examples: [r#"{"date.parse": "%d/%m/%Y"}"#, r#"{"date.parse": null}"#],
            compile: compile_parse
        );
    }
}

fn compile_now(_node: &OperatorNode, _compiler: &Compiler<'_>) -> Result<MapperFn> {
    Ok(mapper(|_data, ctx| {
        Ok(Value::String(DateTimeUtils::format_now(ctx.now())))
    }))
}

fn duration_from_record(node: &OperatorNode) -> Result<DateDuration> {
    let record = node.argument.as_record().ok_or_else(|| node.malformed("expected a duration"))?;

    if let Some(duration) = record.raw("duration") {
        if record.len() > 1 {
            return Err(node.malformed("'duration' cannot be combined with explicit units"));
        }
        let text = duration
            .as_str()
            .ok_or_else(|| node.malformed("duration must be an ISO 8601 string"))?;
        return DateDuration::parse_iso8601(text).map_err(|message| node.malformed(message));
    }

    if record.is_empty() {
        return Err(node.malformed("expected a duration or at least one unit"));
    }

    let unit = |name: &str| -> Result<i64> {
        match record.raw(name) {
            None => Ok(0),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| node.malformed(format!("'{name}' must be an integer"))),
        }
    };

    Ok(DateDuration {
        years: unit("years")?,
        months: unit("months")?,
        weeks: unit("weeks")?,
        days: unit("days")?,
        hours: unit("hours")?,
        minutes: unit("minutes")?,
        seconds: unit("seconds")?,
    })
}

fn compile_add(node: &OperatorNode, _compiler: &Compiler<'_>) -> Result<MapperFn> {
    let duration = duration_from_record(node)?;
    Ok(mapper(move |data, _ctx| {
        let date = DateTimeUtils::from_value("date.add", data)?;
        let shifted = duration.apply(date).ok_or_else(|| {
            RemapperError::invalid_date("date.add", format!("{data} shifted out of range"))
        })?;
        Ok(shifted.to_value())
    }))
}

/// Read an optional strftime pattern, rejecting unknown specifiers up front
fn pattern(node: &OperatorNode) -> Result<Option<String>> {
    match node.argument.as_raw() {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(pattern)) => {
            if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                return Err(node.malformed(format!("invalid date pattern '{pattern}'")));
            }
            Ok(Some(pattern.clone()))
        }
        Some(other) => Err(node.malformed(format!("expected a pattern string, got {other}"))),
    }
}

fn compile_format(node: &OperatorNode, _compiler: &Compiler<'_>) -> Result<MapperFn> {
    let pattern = pattern(node)?;
    Ok(mapper(move |data, _ctx| {
        let date = DateTimeUtils::from_value("date.format", data)?;
        let Some(pattern) = &pattern else {
            return Ok(Value::String(DateTimeUtils::format_rfc3339(&date.to_datetime())));
        };
        let mut out = String::new();
        // fails when the pattern asks for fields the value cannot supply
        write!(out, "{}", date.to_datetime().format(pattern))
            .map_err(|_| RemapperError::invalid_date("date.format", data.to_string()))?;
        Ok(Value::String(out))
    }))
}

fn compile_parse(node: &OperatorNode, _compiler: &Compiler<'_>) -> Result<MapperFn> {
    let pattern = pattern(node)?;
    Ok(mapper(move |data, _ctx| {
        let text = data
            .as_str()
            .ok_or_else(|| RemapperError::type_mismatch("date.parse", "string", data))?;
        let parsed = match &pattern {
            Some(pattern) => DateTimeUtils::parse_with_format(text, pattern),
            None => DateTimeUtils::parse_str(text),
        };
        parsed
            .map(|date| date.to_value())
            .ok_or_else(|| RemapperError::invalid_date("date.parse", format!("'{text}'")))
    }))
}
