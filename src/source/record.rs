use serde::Serialize;

/// A field value as returned by an adapter. At most two levels deep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    List(Vec<String>),
    Map(Vec<(String, String)>),
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Ordered label → value mapping produced by one adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((label.into(), value.into()));
    }

    pub fn with(mut self, label: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(label, value);
        self
    }

    #[cfg(test)]
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(l, v)| (l.as_str(), v))
    }
}

/// Render a JSON scalar the way a person would read it. Nested values fall
/// back to compact JSON so the record never grows a third level.
pub fn json_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => super::NOT_AVAILABLE.to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Look up `key` in a JSON object and render it, with `N/A` for missing or null.
pub fn json_field(obj: &serde_json::Value, key: &str) -> String {
    obj.get(key)
        .map(json_scalar)
        .unwrap_or_else(|| super::NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_keeps_insertion_order() {
        let record = Record::new()
            .with("b", "2")
            .with("a", "1")
            .with("c", Value::List(vec!["x".into(), "y".into()]));
        let labels: Vec<_> = record.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, ["b", "a", "c"]);
        assert_eq!(record.get("a"), Some(&Value::Text("1".into())));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn json_field_renders_scalars() {
        let obj = json!({"s": "text", "n": 12.5, "b": true, "z": null, "arr": [1, 2]});
        assert_eq!(json_field(&obj, "s"), "text");
        assert_eq!(json_field(&obj, "n"), "12.5");
        assert_eq!(json_field(&obj, "b"), "true");
        assert_eq!(json_field(&obj, "z"), "N/A");
        assert_eq!(json_field(&obj, "missing"), "N/A");
        assert_eq!(json_field(&obj, "arr"), "[1,2]");
    }
}
