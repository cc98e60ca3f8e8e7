use crate::patient::Attachment;
use indexmap::IndexMap;
use serde::Serialize;
use time::{Date, PrimitiveDateTime};

/// Current value of one form field.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Flag(bool),
    Date(Date),
    DateTime(PrimitiveDateTime),
    File(Attachment),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> bool {
        matches!(self, Self::Flag(true))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<Date> for FieldValue {
    fn from(value: Date) -> Self {
        Self::Date(value)
    }
}

impl From<Attachment> for FieldValue {
    fn from(value: Attachment) -> Self {
        Self::File(value)
    }
}

/// Field values keyed by field name, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormValues(IndexMap<String, FieldValue>);

impl FormValues {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text value of a field, empty when missing or not textual.
    pub fn text(&self, name: &str) -> String {
        self.get(name)
            .and_then(FieldValue::as_text)
            .unwrap_or_default()
            .to_string()
    }

    /// Text value of a field, `None` when missing or blank.
    pub fn opt_text(&self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(FieldValue::as_text)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.get(name).is_some_and(FieldValue::as_flag)
    }

    pub fn date(&self, name: &str) -> Option<Date> {
        match self.get(name)? {
            FieldValue::Date(d) => Some(*d),
            FieldValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    pub fn attachment(&self, name: &str) -> Option<Attachment> {
        match self.get(name)? {
            FieldValue::File(file) => Some(file.clone()),
            _ => None,
        }
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FormValues {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Build a typed candidate record out of raw form values.
///
/// Conversion is total: anything that cannot be interpreted is left empty for
/// the validation schema to report.
pub trait FromFormValues: Sized {
    fn from_values(values: &FormValues) -> Self;
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn typed_getters() {
        let mut values = FormValues::new();
        values.set("name", "Jo");
        values.set("blank", "   ");
        values.set("consent", true);
        values.set("born", date!(2000 - 01 - 02));
        values.set("at", FieldValue::DateTime(datetime!(2024-05-06 07:08)));

        assert_eq!(values.text("name"), "Jo");
        assert_eq!(values.text("missing"), "");
        assert_eq!(values.opt_text("blank"), None);
        assert!(values.flag("consent"));
        assert!(!values.flag("name"));
        assert_eq!(values.date("born"), Some(date!(2000 - 01 - 02)));
        assert_eq!(values.date("at"), Some(date!(2024 - 05 - 06)));
        assert!(values.attachment("born").is_none());
    }

    #[test]
    fn preserves_declaration_order() {
        let values: FormValues = [("b", "2"), ("a", "1"), ("c", "3")].into_iter().collect();
        let keys: Vec<&str> = values.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn emptiness() {
        assert!(FieldValue::Empty.is_empty());
        assert!(FieldValue::from("").is_empty());
        assert!(!FieldValue::Flag(false).is_empty());
    }
}
