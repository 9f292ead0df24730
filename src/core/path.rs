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

//! Property paths used by `prop`, `context` and `object.omit`
//!
//! A path is parsed once at compile time. Accepted spellings:
//!
//! - dotted strings: `address.city`, `items.0.name`
//! - bracket indices: `items[0].name`, `matrix[1][-1]`
//! - integers: `2` (array index)
//! - arrays of segments: `["items", 0, "name"]`, useful for keys containing dots

use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object key; also used as an array index when it parses as an integer
    Key(String),
    /// Array index, negative values count from the end
    Index(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyPath {
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Parse a path from its definition value.
    pub fn from_value(value: &Value) -> std::result::Result<Self, String> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => n
                .as_i64()
                .map(|i| Self::new(vec![PathSegment::Index(i)]))
                .ok_or_else(|| format!("path index must be an integer, got {n}")),
            Value::Array(items) => {
                let mut segments = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => segments.push(PathSegment::Key(s.clone())),
                        Value::Number(n) => match n.as_i64() {
                            Some(i) => segments.push(PathSegment::Index(i)),
                            None => return Err(format!("path index must be an integer, got {n}")),
                        },
                        other => {
                            return Err(format!(
                                "path segments must be strings or integers, got {other}"
                            ));
                        }
                    }
                }
                Ok(Self::new(segments))
            }
            other => Err(format!(
                "expected a path string, integer or array, got {other}"
            )),
        }
    }

    /// Parse a dotted/bracketed path string.
    pub fn parse(path: &str) -> std::result::Result<Self, String> {
        let mut segments = Vec::new();
        if path.is_empty() {
            return Ok(Self::new(segments));
        }

        for part in path.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };

            if key.is_empty() && rest.is_empty() {
                return Err(format!("empty segment in path '{path}'"));
            }
            if !key.is_empty() {
                segments.push(PathSegment::Key(key.to_string()));
            }

            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| format!("unclosed '[' in path '{path}'"))?;
                let index = rest[1..close]
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| format!("invalid index '{}' in path '{path}'", &rest[1..close]))?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(format!("unexpected '{rest}' after index in path '{path}'"));
                }
            }
        }

        Ok(Self::new(segments))
    }

    /// Resolve the path against a value. Missing steps yield `None`.
    pub fn lookup<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| step(current, segment))
    }

    /// Resolve the path against a map, as used for the context bag.
    pub fn lookup_in<'v>(&self, map: &'v Map<String, Value>) -> Option<&'v Value> {
        let (first, rest) = self.segments.split_first()?;
        let start = match first {
            PathSegment::Key(key) => map.get(key)?,
            PathSegment::Index(index) => map.get(&index.to_string())?,
        };
        rest.iter()
            .try_fold(start, |current, segment| step(current, segment))
    }

    /// Remove the value at this path, returning whether anything was removed.
    pub fn remove(&self, value: &mut Value) -> bool {
        let Some((last, parents)) = self.segments.split_last() else {
            return false;
        };

        let mut current = value;
        for segment in parents {
            current = match step_mut(current, segment) {
                Some(next) => next,
                None => return false,
            };
        }

        match (current, last) {
            (Value::Object(map), PathSegment::Key(key)) => map.shift_remove(key).is_some(),
            (Value::Object(map), PathSegment::Index(index)) => {
                map.shift_remove(&index.to_string()).is_some()
            }
            (Value::Array(items), segment) => match array_index(items.len(), segment) {
                Some(i) => {
                    items.remove(i);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

fn array_index(len: usize, segment: &PathSegment) -> Option<usize> {
    let index = match segment {
        PathSegment::Index(i) => *i,
        PathSegment::Key(key) => key.parse::<i64>().ok()?,
    };
    let resolved = if index < 0 { len as i64 + index } else { index };
    (0..len as i64).contains(&resolved).then_some(resolved as usize)
}

fn step<'v>(value: &'v Value, segment: &PathSegment) -> Option<&'v Value> {
    match (value, segment) {
        (Value::Object(map), PathSegment::Key(key)) => map.get(key),
        (Value::Object(map), PathSegment::Index(index)) => map.get(&index.to_string()),
        (Value::Array(items), segment) => items.get(array_index(items.len(), segment)?),
        _ => None,
    }
}

fn step_mut<'v>(value: &'v mut Value, segment: &PathSegment) -> Option<&'v mut Value> {
    match (value, segment) {
        (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key),
        (Value::Object(map), PathSegment::Index(index)) => map.get_mut(&index.to_string()),
        (Value::Array(items), segment) => {
            let i = array_index(items.len(), segment)?;
            items.get_mut(i)
        }
        _ => None,
    }
}
