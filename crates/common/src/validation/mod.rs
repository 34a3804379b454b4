// Validation Module - errors and warnings collected in a single pass
use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of validating a configuration payload
///
/// Built once through [`ValidationCollector`] and never mutated afterwards.
/// Errors make the payload unusable; warnings are advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    is_valid: bool,
    errors: Vec<FieldError>,
    warnings: Vec<FieldError>,
}

impl ValidationResult {
    /// A result with no errors and no warnings
    pub const fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new(), warnings: Vec::new() }
    }

    /// Whether the payload may be applied
    pub const fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Blocking problems, in discovery order
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Advisory problems, in discovery order
    pub fn warnings(&self) -> &[FieldError] {
        &self.warnings
    }

    /// Errors rendered as `field: message`
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Warnings rendered as `field: message`
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    /// Get errors for a specific field
    pub fn field_errors(&self, field: &str) -> Vec<&FieldError> {
        self.errors.iter().filter(|e| e.field == field).collect()
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            write!(f, "Validation passed")?;
        } else if self.errors.len() == 1 {
            write!(f, "Validation failed: {}", self.errors[0])?;
        } else {
            write!(f, "Validation failed with {} errors: ", self.errors.len())?;
            for (i, error) in self.errors.iter().enumerate() {
                if i > 0 {
                    write!(f, "; ")?;
                }
                write!(f, "{error}")?;
            }
        }
        if !self.warnings.is_empty() {
            write!(f, " ({} warnings)", self.warnings.len())?;
        }
        Ok(())
    }
}

/// Individual field problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl FieldError {
    /// Create a new field error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into(), code: None }
    }

    /// Set error code
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Accumulates problems during a validation pass
///
/// Nested objects push a path segment so field names come out as
/// `operation_overrides.summarize`.
#[derive(Debug, Default)]
pub struct ValidationCollector {
    path: Vec<String>,
    errors: Vec<FieldError>,
    warnings: Vec<FieldError>,
}

impl ValidationCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Add path segment for nested validation
    pub fn push_path(&mut self, segment: impl Into<String>) {
        self.path.push(segment.into());
    }

    /// Remove last path segment
    pub fn pop_path(&mut self) {
        self.path.pop();
    }

    fn qualify(&self, field: &str) -> String {
        if self.path.is_empty() {
            field.to_string()
        } else if field.is_empty() {
            self.path.join(".")
        } else {
            format!("{}.{field}", self.path.join("."))
        }
    }

    /// Record a blocking problem
    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        let field = self.qualify(field);
        self.errors.push(FieldError::new(field, message));
    }

    /// Record a blocking problem with a machine-readable code
    pub fn error_with_code(&mut self, field: &str, message: impl Into<String>, code: &str) {
        let field = self.qualify(field);
        self.errors.push(FieldError::new(field, message).with_code(code));
    }

    /// Record an advisory problem
    pub fn warning(&mut self, field: &str, message: impl Into<String>) {
        let field = self.qualify(field);
        self.warnings.push(FieldError::new(field, message));
    }

    /// Record an error unless `min <= value <= max`
    ///
    /// Returns whether the value was in range.
    pub fn check_range(&mut self, field: &str, value: i128, (min, max): (u64, u64)) -> bool {
        if value < i128::from(min) || value > i128::from(max) {
            self.error_with_code(
                field,
                format!("must be between {min} and {max}, got {value}"),
                "out_of_range",
            );
            false
        } else {
            true
        }
    }

    /// Whether any blocking problem has been recorded so far
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Freeze the collected problems into a result
    pub fn finish(self) -> ValidationResult {
        ValidationResult {
            is_valid: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}
