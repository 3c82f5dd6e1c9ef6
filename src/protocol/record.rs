use super::value::{hash_entries, Value};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Named fields of a message, kept in insertion order.
///
/// Two records are equal when they have the same field names and pairwise
/// equal values, regardless of order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Overwrites every field present in `fields`.
    pub fn update<I, K, V>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in fields {
            self.set(name, value);
        }
    }

    /// Fills only the fields that are not present yet.
    pub fn set_default<I, K, V>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in fields {
            self.fields.entry(name.into()).or_insert_with(|| value.into());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    pub fn as_map(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn into_map(self) -> IndexMap<String, Value> {
        self.fields
    }
}

impl From<IndexMap<String, Value>> for Record {
    fn from(fields: IndexMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        record.update(iter);
        record
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// `name=value` pairs sorted by name, so equal records print the same.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.fields.keys().collect();
        names.sort();
        for (i, name) in names.into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, self.fields[name.as_str()])?;
        }
        Ok(())
    }
}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_entries(&self.fields, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(record: &Record) -> u64 {
        let mut hasher = DefaultHasher::new();
        record.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = Record::new().with("x", 1).with("y", "two");
        let b = Record::new().with("y", "two").with("x", 1);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "x=1, y='two'");
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_equality_is_type_sensitive() {
        let a = Record::new().with("n", 1);
        let b = Record::new().with("n", "1");
        assert_ne!(a, b);
        assert_ne!(a, Record::new().with("n", 1).with("m", 2));
    }

    #[test]
    fn test_update_and_set_default() {
        let mut record: Record = [("a", 1), ("b", 2)].into_iter().collect();
        record.update([("b", 20), ("c", 30)]);
        record.set_default([("a", 100), ("d", 4)]);
        assert_eq!(record.get("a"), Some(&Value::Int(1)));
        assert_eq!(record.get("b"), Some(&Value::Int(20)));
        assert_eq!(record.get("c"), Some(&Value::Int(30)));
        assert_eq!(record.get("d"), Some(&Value::Int(4)));
        let names: Vec<&str> = record.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_equal_records_hash_equal() {
        let inner_ab: IndexMap<String, Value> = [("a".to_string(), Value::Int(1)), ("b".to_string(), Value::Int(2))]
            .into_iter()
            .collect();
        let inner_ba: IndexMap<String, Value> = [("b".to_string(), Value::Int(2)), ("a".to_string(), Value::Int(1))]
            .into_iter()
            .collect();
        let a = Record::new().with("d", Value::List(vec![Value::Dict(inner_ab)]));
        let b = Record::new().with("d", Value::List(vec![Value::Dict(inner_ba)]));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let zero = Record::new().with("x", 0.0);
        let negative_zero = Record::new().with("x", -0.0);
        assert_eq!(zero, negative_zero);
        assert_eq!(hash_of(&zero), hash_of(&negative_zero));

        assert_ne!(
            hash_of(&Record::new().with("v", Value::Tuple(vec![]))),
            hash_of(&Record::new().with("v", Value::List(vec![])))
        );
    }
}
