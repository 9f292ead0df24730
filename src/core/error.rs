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

//! Core error types with rich error code system

use serde_json::Value;
use thiserror::Error;

pub use super::error_code::*;
use super::value::type_name;

/// Main remapper error type
///
/// Compile-time variants carry the location of the offending node inside the
/// definition (`$.object.from.name`), evaluation variants name the operator
/// that rejected its input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemapperError {
    /// Single-key object naming an operator that is not registered
    #[error("{error_code}: unknown operator '{name}' at {location}")]
    UnknownOperator {
        error_code: ErrorCode,
        name: String,
        location: String,
    },

    /// Operator argument does not match the declared shape
    #[error("{error_code}: malformed argument for '{operator}' at {location}: {message}")]
    MalformedArgument {
        error_code: ErrorCode,
        operator: String,
        message: String,
        location: String,
    },

    /// Definition exceeds the configured nesting depth
    #[error("{error_code}: definition exceeds maximum depth of {limit} at {location}")]
    DefinitionTooDeep {
        error_code: ErrorCode,
        limit: usize,
        location: String,
    },

    /// Operator received data of the wrong shape
    #[error("{error_code}: '{operator}' expected {expected}, got {actual}")]
    TypeMismatch {
        error_code: ErrorCode,
        operator: String,
        expected: String,
        actual: String,
    },

    /// Division by zero or numeric overflow
    #[error("{error_code}: '{operator}': {message}")]
    Arithmetic {
        error_code: ErrorCode,
        operator: String,
        message: String,
    },

    /// Unparseable date or date arithmetic out of range
    #[error("{error_code}: '{operator}' cannot handle date {value}")]
    InvalidDate {
        error_code: ErrorCode,
        operator: String,
        value: String,
    },
}

impl RemapperError {
    /// Create an unknown operator error
    pub fn unknown_operator(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self::UnknownOperator {
            error_code: RM0001,
            name: name.into(),
            location: location.into(),
        }
    }

    /// Create a malformed argument error
    pub fn malformed_argument(
        operator: impl Into<String>,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self::MalformedArgument {
            error_code: RM0002,
            operator: operator.into(),
            message: message.into(),
            location: location.into(),
        }
    }

    /// Create a depth limit error
    pub fn definition_too_deep(limit: usize, location: impl Into<String>) -> Self {
        Self::DefinitionTooDeep {
            error_code: RM0003,
            limit,
            location: location.into(),
        }
    }

    /// Create a type mismatch error from the offending value
    pub fn type_mismatch(
        operator: impl Into<String>,
        expected: impl Into<String>,
        actual: &Value,
    ) -> Self {
        Self::TypeMismatch {
            error_code: RM0051,
            operator: operator.into(),
            expected: expected.into(),
            actual: type_name(actual).to_string(),
        }
    }

    pub fn division_by_zero(operator: impl Into<String>) -> Self {
        Self::Arithmetic {
            error_code: RM0052,
            operator: operator.into(),
            message: "division by zero".to_string(),
        }
    }

    pub fn overflow(operator: impl Into<String>) -> Self {
        Self::Arithmetic {
            error_code: RM0053,
            operator: operator.into(),
            message: "numeric overflow".to_string(),
        }
    }

    pub fn invalid_date(operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidDate {
            error_code: RM0054,
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &ErrorCode {
        match self {
            Self::UnknownOperator { error_code, .. } => error_code,
            Self::MalformedArgument { error_code, .. } => error_code,
            Self::DefinitionTooDeep { error_code, .. } => error_code,
            Self::TypeMismatch { error_code, .. } => error_code,
            Self::Arithmetic { error_code, .. } => error_code,
            Self::InvalidDate { error_code, .. } => error_code,
        }
    }

    /// Get error information with help text
    pub fn error_info(&self) -> &'static ErrorInfo {
        self.error_code().info()
    }

    /// Whether this error was raised while compiling a definition
    pub fn is_compile_error(&self) -> bool {
        self.error_code().category() == ErrorCategory::Compile
    }
}

/// Result type for remapper operations
pub type Result<T> = std::result::Result<T, RemapperError>;
