use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Declarative schema for composition props.
///
/// Serialized with a `type` tag, e.g. `{"type":"object","fields":{"title":{"type":"string"}}}`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PropsSchema {
    /// Accepts any value.
    Any,
    /// JSON boolean.
    Bool,
    /// Any JSON number, optionally bounded (inclusive).
    Number {
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Integral JSON number, optionally bounded (inclusive).
    Integer {
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    /// JSON string, optionally restricted to a set of literals.
    String {
        /// Allowed literals.
        #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
        one_of: Option<Vec<String>>,
    },
    /// Homogeneous JSON array.
    Array {
        /// Schema for every element.
        items: Box<PropsSchema>,
    },
    /// JSON object with known fields.
    Object {
        /// Field schemas.
        #[serde(default)]
        fields: BTreeMap<String, PropsSchema>,
        /// Fields that must be present.
        #[serde(default)]
        required: Vec<String>,
        /// Allow fields not listed in `fields`.
        #[serde(default = "default_additional")]
        additional: bool,
    },
    /// `null` or the inner schema.
    Nullable {
        /// Schema for non-null values.
        inner: Box<PropsSchema>,
    },
}

fn default_additional() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SchemaPathElem {
    Field(String),
    Index(usize),
}

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    path: Vec<SchemaPathElem>,
    /// What was wrong at `path`.
    pub message: String,
}

impl SchemaError {
    fn at(path: &[SchemaPathElem], message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            message: message.into(),
        }
    }

    /// JSON-path style location, e.g. `$.items[2].src`.
    pub fn path(&self) -> String {
        format_path(&self.path)
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", format_path(&self.path), self.message)
    }
}

fn format_path(path: &[SchemaPathElem]) -> String {
    let mut s = String::from("$");
    for p in path {
        match p {
            SchemaPathElem::Field(name) => {
                s.push('.');
                s.push_str(name);
            }
            SchemaPathElem::Index(i) => {
                s.push('[');
                s.push_str(&i.to_string());
                s.push(']');
            }
        }
    }
    s
}

/// All violations found in one validation run, in document order.
#[derive(Debug, Clone)]
pub struct SchemaErrors {
    /// Individual violations; never empty.
    pub errors: Vec<SchemaError>,
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

impl PropsSchema {
    /// Validate `value`, collecting every violation.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaErrors> {
        let mut errors = Vec::new();
        check(self, value, &mut Vec::new(), &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaErrors { errors })
        }
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check(
    schema: &PropsSchema,
    value: &Value,
    path: &mut Vec<SchemaPathElem>,
    errors: &mut Vec<SchemaError>,
) {
    match (schema, value) {
        (PropsSchema::Any, _) => {}
        (PropsSchema::Nullable { .. }, Value::Null) => {}
        (PropsSchema::Nullable { inner }, v) => check(inner, v, path, errors),
        (PropsSchema::Bool, Value::Bool(_)) => {}
        (PropsSchema::Number { min, max }, Value::Number(n)) => {
            let Some(x) = n.as_f64() else {
                errors.push(SchemaError::at(path, "number is not representable as f64"));
                return;
            };
            if let Some(lo) = min
                && x < *lo
            {
                errors.push(SchemaError::at(path, format!("must be >= {lo}, got {x}")));
            }
            if let Some(hi) = max
                && x > *hi
            {
                errors.push(SchemaError::at(path, format!("must be <= {hi}, got {x}")));
            }
        }
        (PropsSchema::Integer { min, max }, Value::Number(n)) => {
            let Some(x) = n.as_i64() else {
                errors.push(SchemaError::at(path, format!("expected integer, got {n}")));
                return;
            };
            if let Some(lo) = min
                && x < *lo
            {
                errors.push(SchemaError::at(path, format!("must be >= {lo}, got {x}")));
            }
            if let Some(hi) = max
                && x > *hi
            {
                errors.push(SchemaError::at(path, format!("must be <= {hi}, got {x}")));
            }
        }
        (PropsSchema::String { one_of }, Value::String(s)) => {
            if let Some(allowed) = one_of
                && !allowed.iter().any(|a| a == s)
            {
                errors.push(SchemaError::at(
                    path,
                    format!("must be one of [{}], got \"{s}\"", allowed.join(", ")),
                ));
            }
        }
        (PropsSchema::Array { items }, Value::Array(xs)) => {
            for (i, x) in xs.iter().enumerate() {
                path.push(SchemaPathElem::Index(i));
                check(items, x, path, errors);
                path.pop();
            }
        }
        (
            PropsSchema::Object {
                fields,
                required,
                additional,
            },
            Value::Object(map),
        ) => {
            for name in required {
                if !map.contains_key(name) {
                    path.push(SchemaPathElem::Field(name.clone()));
                    errors.push(SchemaError::at(path, "required field is missing"));
                    path.pop();
                }
            }
            for (k, v) in map {
                path.push(SchemaPathElem::Field(k.clone()));
                match fields.get(k) {
                    Some(s) => check(s, v, path, errors),
                    None if !additional => {
                        errors.push(SchemaError::at(path, "unknown field"));
                    }
                    None => {}
                }
                path.pop();
            }
        }
        (s, v) => {
            let expected = match s {
                PropsSchema::Bool => "boolean",
                PropsSchema::Number { .. } => "number",
                PropsSchema::Integer { .. } => "integer",
                PropsSchema::String { .. } => "string",
                PropsSchema::Array { .. } => "array",
                PropsSchema::Object { .. } => "object",
                PropsSchema::Any | PropsSchema::Nullable { .. } => "any",
            };
            errors.push(SchemaError::at(
                path,
                format!("expected {expected}, got {}", type_name(v)),
            ));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/schema.rs"]
mod tests;
