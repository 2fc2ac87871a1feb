use std::collections::{HashMap, HashSet};

/// Mutable values of a form.
///
/// Bool values are stored as `"true"` / `"false"`; a missing value reads as
/// empty. `errors` always reflects the current values, `touched` decides which
/// of them are shown.
#[derive(Debug, Default, Clone)]
pub struct FormState {
    pub values: HashMap<String, String>,
    pub errors: HashMap<String, String>,
    pub touched: HashSet<String>,
}

impl FormState {
    pub fn set_value(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn touch(&mut self, key: &str) {
        self.touched.insert(key.to_string());
    }

    pub fn is_touched(&self, key: &str) -> bool {
        self.touched.contains(key)
    }
}
