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

//! Engine configuration

use serde::{Deserialize, Serialize};

/// How single-key objects with an unregistered key are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorResolution {
    /// Reject them with `UnknownOperator` (RM0001)
    #[default]
    Strict,
    /// Treat them as literal objects
    Lenient,
}

/// Engine configuration for [`RemapperEngine`](crate::RemapperEngine)
///
/// # Examples
///
/// ```rust
/// use remapper::{EngineConfig, OperatorResolution};
///
/// let config = EngineConfig::default()
///     .with_max_definition_depth(64)
///     .with_operator_resolution(OperatorResolution::Lenient);
/// assert_eq!(config.max_definition_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum nesting depth of a definition
    ///
    /// Bounds the recursion of both the parser and the compiled evaluator,
    /// which mirrors the definition tree. Default: 128
    pub max_definition_depth: usize,

    /// Treatment of unknown single-key objects. Default: `Strict`
    pub operator_resolution: OperatorResolution,

    /// Collapse operator-free arrays and objects into a single literal node
    /// so they are cloned instead of rebuilt on every evaluation. Default: true
    pub fold_literals: bool,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_definition_depth(mut self, depth: usize) -> Self {
        self.max_definition_depth = depth;
        self
    }

    pub fn with_operator_resolution(mut self, resolution: OperatorResolution) -> Self {
        self.operator_resolution = resolution;
        self
    }

    pub fn with_fold_literals(mut self, enabled: bool) -> Self {
        self.fold_literals = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_definition_depth: 128,
            operator_resolution: OperatorResolution::Strict,
            fold_literals: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_value(json!({"operator_resolution": "lenient"})).unwrap();
        assert_eq!(
            config,
            EngineConfig::default().with_operator_resolution(OperatorResolution::Lenient)
        );
    }

    #[test]
    fn test_config_from_yaml() {
        let config: EngineConfig =
            serde_yaml::from_str("max_definition_depth: 16\nfold_literals: false\n").unwrap();
        assert_eq!(config.max_definition_depth, 16);
        assert!(!config.fold_literals);
        assert_eq!(config.operator_resolution, OperatorResolution::Strict);
    }
}
