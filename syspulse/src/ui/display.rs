//! Terminal-side render sink: keeps the latest text for every display field.

use std::collections::BTreeMap;

use crate::monitor::{Field, RenderSink};

#[derive(Debug, Default, Clone)]
pub struct DisplayState {
    fields: BTreeMap<Field, String>,
}

impl DisplayState {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, field: Field, fallback: &'a str) -> &'a str {
        self.get(field).unwrap_or(fallback)
    }
}

impl RenderSink for DisplayState {
    fn render(&mut self, field: Field, value: String) {
        self.fields.insert(field, value);
    }
}
