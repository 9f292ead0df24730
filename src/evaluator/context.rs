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

//! Per-call evaluation state

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::core::PropertyPath;

/// State of a single top-level evaluation
///
/// Created fresh for every call of a compiled mapper and never shared between
/// calls. The history is a depth-ordered stack: operators that evaluate a
/// sub-remapper against narrowed data go through [`descend`](Self::descend),
/// which pushes the current data before and pops it after the nested
/// evaluation, so sibling branches always see the same ancestors.
#[derive(Debug)]
pub struct EvaluationContext<'a> {
    root: &'a Value,
    variables: &'a Map<String, Value>,
    history: Vec<Value>,
    now: DateTime<Utc>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(root: &'a Value, variables: &'a Map<String, Value>) -> Self {
        Self {
            root,
            variables,
            history: Vec::new(),
            now: Utc::now(),
        }
    }

    /// Pin the instant returned by `date.now` for this evaluation
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Top-level data the evaluation started with
    pub fn root(&self) -> &'a Value {
        self.root
    }

    /// Context bag supplied by the caller
    pub fn variables(&self) -> &'a Map<String, Value> {
        self.variables
    }

    /// Look up a context variable, `None` if absent
    pub fn variable(&self, path: &PropertyPath) -> Option<&'a Value> {
        path.lookup_in(self.variables)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// History entry `index` positions from the end (0 is the nearest ancestor)
    pub fn history(&self, index: usize) -> Option<&Value> {
        let position = self.history.len().checked_sub(index)?.checked_sub(1)?;
        self.history.get(position)
    }

    /// Run `f` with `ancestor` pushed onto the history stack.
    ///
    /// The entry is popped before returning, whether `f` succeeded or not.
    pub fn descend<T>(&mut self, ancestor: Value, f: impl FnOnce(&mut Self) -> T) -> T {
        self.history.push(ancestor);
        let depth = self.history.len();
        let result = f(self);
        debug_assert_eq!(self.history.len(), depth, "unbalanced history stack");
        self.history.pop();
        result
    }
}
