use super::FormField;

/// Ordered set of registered fields.
#[derive(Debug, Default)]
pub struct FormSchema {
    pub title: String,
    pub fields: Vec<FormField>,
}

impl FormSchema {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field, replacing an earlier registration under the same key in place.
    pub fn insert(&mut self, field: FormField) {
        match self.fields.iter_mut().find(|f| f.key == field.key) {
            Some(slot) => *slot = field,
            None => self.fields.push(field),
        }
    }

    pub fn field_by_key(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.key == key)
    }
}
