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

//! Error code system in the style of the Rust compiler (E0001, E0002, ...)
//!
//! Every remapper error carries an `RMxxxx` code. Codes below 51 are raised
//! while compiling a definition, codes from 51 upwards while evaluating a
//! compiled mapper against concrete data.

use std::fmt;

/// Error categories for organizing error codes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Compile-time errors (RM0001-RM0050)
    Compile,
    /// Evaluation errors (RM0051-RM0100)
    Evaluation,
}

/// Error code following the Rust compiler pattern (RM0001, RM0002, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    pub code: u16,
}

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self { code }
    }

    /// Get the full error code string (e.g., "RM0001")
    pub fn code_str(&self) -> String {
        format!("RM{:04}", self.code)
    }

    /// Get error information from the registry
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_REGISTRY.get_error_info(self)
    }

    /// Get error category for this error code
    pub fn category(&self) -> ErrorCategory {
        match self.code {
            1..=50 => ErrorCategory::Compile,
            _ => ErrorCategory::Evaluation,
        }
    }

    /// Get human-readable description for this error code
    pub fn description(&self) -> &'static str {
        self.info().title
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RM{:04}", self.code)
    }
}

/// Rich error information
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Error code number
    pub code: u16,
    /// Human-readable error title
    pub title: &'static str,
    /// Detailed description of the error
    pub description: &'static str,
    /// Help information and suggested solutions
    pub help: &'static str,
}

impl ErrorInfo {
    pub const fn new(
        code: u16,
        title: &'static str,
        description: &'static str,
        help: &'static str,
    ) -> Self {
        Self {
            code,
            title,
            description,
            help,
        }
    }
}

/// Central error registry containing all error definitions
pub struct ErrorRegistry;

impl ErrorRegistry {
    /// Get error information for a given error code
    pub fn get_error_info(&self, error_code: &ErrorCode) -> &'static ErrorInfo {
        match error_code.code {
            // Compile errors (RM0001-RM0050)
            1 => &RM0001_INFO,
            2 => &RM0002_INFO,
            3 => &RM0003_INFO,

            // Evaluation errors (RM0051-RM0100)
            51 => &RM0051_INFO,
            52 => &RM0052_INFO,
            53 => &RM0053_INFO,
            54 => &RM0054_INFO,

            _ => &UNKNOWN_ERROR_INFO,
        }
    }
}

/// Global error registry instance
pub static ERROR_REGISTRY: ErrorRegistry = ErrorRegistry;

// ========== Error Code Definitions ==========

// Compile error codes (RM0001-RM0050)
pub const RM0001: ErrorCode = ErrorCode::new(1); // Unknown operator
pub const RM0002: ErrorCode = ErrorCode::new(2); // Malformed operator argument
pub const RM0003: ErrorCode = ErrorCode::new(3); // Definition nested too deeply

// Evaluation error codes (RM0051-RM0100)
pub const RM0051: ErrorCode = ErrorCode::new(51); // Type mismatch
pub const RM0052: ErrorCode = ErrorCode::new(52); // Division by zero
pub const RM0053: ErrorCode = ErrorCode::new(53); // Numeric overflow
pub const RM0054: ErrorCode = ErrorCode::new(54); // Invalid date value

// ========== Error Information Definitions ==========

static RM0001_INFO: ErrorInfo = ErrorInfo::new(
    1,
    "Unknown operator",
    "A single-key object in the definition names an operator that is not registered.",
    "Check the operator name for typos. To produce a literal object with exactly one key, wrap it in {\"static\": ...} or build it with object.from.",
);

static RM0002_INFO: ErrorInfo = ErrorInfo::new(
    2,
    "Malformed operator argument",
    "The argument given to an operator does not have the shape the operator expects.",
    "Consult the operator list (`remapper operators`) for the expected argument shape, including required fields.",
);

static RM0003_INFO: ErrorInfo = ErrorInfo::new(
    3,
    "Definition nested too deeply",
    "The definition exceeds the configured maximum nesting depth.",
    "Flatten the definition, for instance with `pipe`, or raise `max_definition_depth` in the engine configuration.",
);

static RM0051_INFO: ErrorInfo = ErrorInfo::new(
    51,
    "Type mismatch",
    "An operator received data of a type it cannot work with, such as an array operator applied to an object.",
    "Make sure the data reaching the operator has the expected shape. Use `prop` or `default` to select or substitute values first.",
);

static RM0052_INFO: ErrorInfo = ErrorInfo::new(
    52,
    "Division by zero",
    "A `math` division or modulo had a zero divisor.",
    "Guard the operation with `if` or supply a non-zero value through `default`.",
);

static RM0053_INFO: ErrorInfo = ErrorInfo::new(
    53,
    "Numeric overflow",
    "An arithmetic result does not fit the supported numeric range.",
    "Reduce the magnitude of the operands.",
);

static RM0054_INFO: ErrorInfo = ErrorInfo::new(
    54,
    "Invalid date value",
    "A date operator received a string that is not a valid date, or date arithmetic left the supported range.",
    "Date operators accept RFC 3339 date-times, YYYY-MM-DD dates and epoch milliseconds.",
);

static UNKNOWN_ERROR_INFO: ErrorInfo = ErrorInfo::new(
    0,
    "Unknown error",
    "An unknown error occurred.",
    "This error code is not registered.",
);
