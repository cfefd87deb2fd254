use std::fmt;

/// Backend-neutral bind value derived from a record field.
///
/// Each runner converts these into its driver's own parameter type, which keeps
/// statement building independent of the database in use.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    /// Arrays and objects, bound as JSON
    Json(serde_json::Value),
}

impl From<&serde_json::Value> for ParameterValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ParameterValue::Null,
            serde_json::Value::Bool(b) => ParameterValue::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ParameterValue::Integer(i),
                // u64 beyond i64::MAX and real numbers both land here
                None => ParameterValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => ParameterValue::String(s.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                ParameterValue::Json(value.clone())
            }
        }
    }
}

impl ParameterValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ParameterValue::Null)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Null => write!(f, "null"),
            ParameterValue::Integer(i) => write!(f, "{i}"),
            ParameterValue::Float(v) => write!(f, "{v}"),
            ParameterValue::Boolean(b) => write!(f, "{b}"),
            ParameterValue::String(s) => write!(f, "{s:?}"),
            ParameterValue::Json(v) => write!(f, "{v}"),
        }
    }
}
