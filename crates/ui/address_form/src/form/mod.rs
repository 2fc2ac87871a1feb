//! Form-state manager.
//!
//! Holds registered fields and their values, revalidates every field on each
//! change and exposes the per-field messages once a field has been touched.
//! Submission validates everything, marks all fields touched and, when the
//! form is valid, hands out the values as a JSON object keyed by field key
//! (numbers as JSON numbers, empty optional numbers as `null`, bools as bools).

mod field;
mod schema;
mod state;

pub use field::{EMAIL_MESSAGE, FieldKind, FormField, NUMBER_MESSAGE, Validator, parse_number};
pub use schema::FormSchema;
pub use state::FormState;

use serde_json::{Map as JsonMap, Value as JsonValue, json};

#[derive(Debug, Default)]
pub struct FormManager {
    schema: FormSchema,
    state: FormState,
}

impl FormManager {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            schema: FormSchema::new(title),
            state: FormState::default(),
        }
    }

    pub fn register(&mut self, field: FormField) {
        self.schema.insert(field);
        self.revalidate();
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn fields(&self) -> &[FormField] {
        &self.schema.fields
    }

    pub fn set_value(&mut self, key: &str, value: impl Into<String>) {
        self.state.set_value(key, value);
        self.revalidate();
    }

    pub fn value(&self, key: &str) -> &str {
        self.state.get_value(key).unwrap_or("")
    }

    pub fn flag(&self, key: &str) -> bool {
        self.value(key) == "true"
    }

    pub fn toggle(&mut self, key: &str) {
        let next = if self.flag(key) { "false" } else { "true" };
        self.set_value(key, next);
        self.touch(key);
    }

    pub fn touch(&mut self, key: &str) {
        self.state.touch(key);
    }

    /// Message for `key`, hidden until the field was touched.
    pub fn error(&self, key: &str) -> Option<&str> {
        if !self.state.is_touched(key) {
            return None;
        }
        self.state.errors.get(key).map(|s| s.as_str())
    }

    pub fn is_valid(&self) -> bool {
        self.state.errors.is_empty()
    }

    /// Empty every value and forget touched state.
    pub fn reset(&mut self) {
        self.state = FormState::default();
        self.revalidate();
    }

    pub fn handle_submit(&mut self) -> Option<JsonMap<String, JsonValue>> {
        let keys: Vec<String> = self.schema.fields.iter().map(|f| f.key.clone()).collect();
        for key in &keys {
            self.state.touch(key);
        }
        self.revalidate();
        if !self.is_valid() {
            return None;
        }

        let mut map = JsonMap::new();
        for f in &self.schema.fields {
            let v = self.value(&f.key).trim();
            let entry = match f.kind {
                FieldKind::Text | FieldKind::Email => JsonValue::String(v.to_string()),
                FieldKind::Number => parse_number(v).map_or(JsonValue::Null, |n| json!(n)),
                FieldKind::Bool => json!(v == "true"),
            };
            map.insert(f.key.clone(), entry);
        }
        Some(map)
    }

    fn revalidate(&mut self) {
        self.state.errors.clear();
        for f in &self.schema.fields {
            let v = self.state.get_value(&f.key).unwrap_or("");
            if let Err(msg) = f.validate(v) {
                self.state.errors.insert(f.key.clone(), msg);
            }
        }
    }
}
