//! Field definitions for the form-state manager.
//!
//! A field is pure metadata: key, label, kind, plus an ordered list of
//! validators. The first failing validator provides the field's message.
//!
//! ```ignore
//! let name = FormField::new("name", "Name", FieldKind::Text).required("Name is required");
//! let distance = FormField::new("distance", "Distance", FieldKind::Number)
//!     .required("Distance is required");
//! ```

use lazy_static::lazy_static;
use regex::Regex;

pub const NUMBER_MESSAGE: &str = "Must be a number";
pub const EMAIL_MESSAGE: &str = "Invalid email address";

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles");
}

/// Input widget type of a field.
///
/// - Text / Email / Number edit as single-line text
/// - Bool toggles with Space
/// - Email and Number carry a built-in format check for non-empty values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Number,
    Bool,
}

/// Finite decimal value of `value`; `inf`, `NaN` and overflowing input are not numbers.
pub fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

pub type Validator = Box<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

pub struct FormField {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    validators: Vec<Validator>,
}

impl FormField {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            validators: Vec::new(),
        }
    }

    /// Reject empty and whitespace-only values.
    pub fn required(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.validator(move |v| {
            if v.trim().is_empty() {
                Err(message.clone())
            } else {
                Ok(())
            }
        })
    }

    /// Attach a custom validator; runs after the ones added before it.
    pub fn validator(
        mut self,
        f: impl Fn(&str) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validators.push(Box::new(f));
        self
    }

    pub fn is_required(&self) -> bool {
        !self.validators.is_empty() && self.validate("").is_err()
    }

    /// First validation message for `value`, if any.
    pub fn validate(&self, value: &str) -> Result<(), String> {
        for v in &self.validators {
            v(value)?;
        }
        if value.trim().is_empty() {
            return Ok(());
        }
        match self.kind {
            FieldKind::Number if parse_number(value).is_none() => Err(NUMBER_MESSAGE.into()),
            FieldKind::Email if !EMAIL_RE.is_match(value.trim()) => Err(EMAIL_MESSAGE.into()),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormField")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("validators", &self.validators.len())
            .finish()
    }
}
