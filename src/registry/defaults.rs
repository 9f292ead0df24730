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

//! Standard operator set

use super::OperatorRegistryBuilder;

impl OperatorRegistryBuilder {
    pub fn register_standard_operators(&mut self) {
        // prop, root, history, static, context
        self.register_path_operators();

        self.register_string_operators();

        // if, equals, not, and, or, gt, lt, match
        self.register_logic_operators();

        self.register_array_operators();
        self.register_object_operators();
        self.register_datetime_operators();
        self.register_math_operators();

        // null.strip, default
        self.register_null_operators();

        // pipe, log
        self.register_utility_operators();
    }
}
