//! Prop schema descriptors.
//!
//! Component schemas are plain data: each type maps to a set of prop
//! descriptors (kind, required flag, default, numeric range). The registry
//! compiles these once at load and validation walks the description, so no
//! reflection is involved and frontend-supplied schemas can extend the
//! built-in set.

use std::collections::BTreeMap;

use serde_json::Value;

// =============================================================================
// Prop Kinds
// =============================================================================

/// The value shape a prop accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum PropKind {
    String,
    Number,
    Boolean,
    /// Hex color string: `#RGB`, `#RRGGBB`, or `#RRGGBBAA`.
    Color,
    Object,
    Array,
    /// One of a fixed set of string values.
    Enum(Vec<&'static str>),
}

/// Descriptor for a single prop.
#[derive(Debug, Clone, PartialEq)]
pub struct PropSpec {
    pub kind: PropKind,
    pub required: bool,
    /// Injected when the prop is missing.
    pub default: Option<Value>,
    /// Inclusive numeric bounds, applied after coercion.
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PropSpec {
    pub fn new(kind: PropKind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            min: None,
            max: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Validate and coerce a value against this descriptor.
    ///
    /// Coercions are the forgiving ones the AI output actually needs:
    /// numeric strings become numbers, numbers stringify for string props,
    /// and out-of-range numbers clamp to the declared bounds. A value that
    /// cannot be coerced is rejected with a reason.
    pub fn coerce(&self, value: Value) -> Result<Value, String> {
        match &self.kind {
            PropKind::String => match value {
                Value::String(s) => Ok(Value::String(s)),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                other => Err(format!("expected string, got {}", type_name(&other))),
            },
            PropKind::Number => {
                let n = match &value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| format!("expected number, got {}", type_name(&value)))?;
                let clamped = match (self.min, self.max) {
                    (Some(min), Some(max)) => n.clamp(min, max),
                    (Some(min), None) => n.max(min),
                    (None, Some(max)) => n.min(max),
                    (None, None) => n,
                };
                serde_json::Number::from_f64(clamped)
                    .map(Value::Number)
                    .ok_or_else(|| "non-finite number".to_string())
            }
            PropKind::Boolean => match value {
                Value::Bool(b) => Ok(Value::Bool(b)),
                Value::String(s) if s == "true" || s == "false" => Ok(Value::Bool(s == "true")),
                other => Err(format!("expected boolean, got {}", type_name(&other))),
            },
            PropKind::Color => match value {
                Value::String(s) if is_hex_color(&s) => Ok(Value::String(s)),
                Value::String(s) => Err(format!("invalid color '{s}'")),
                other => Err(format!("expected color string, got {}", type_name(&other))),
            },
            PropKind::Object => match value {
                Value::Object(_) => Ok(value),
                other => Err(format!("expected object, got {}", type_name(&other))),
            },
            PropKind::Array => match value {
                Value::Array(_) => Ok(value),
                other => Err(format!("expected array, got {}", type_name(&other))),
            },
            PropKind::Enum(allowed) => match value {
                Value::String(s) if allowed.contains(&s.as_str()) => Ok(Value::String(s)),
                Value::String(s) => Err(format!(
                    "'{s}' is not one of {}",
                    allowed.join(", ")
                )),
                other => Err(format!("expected enum string, got {}", type_name(&other))),
            },
        }
    }
}

/// Schema for one component type: named prop descriptors.
#[derive(Debug, Clone, Default)]
pub struct ComponentSpec {
    props: BTreeMap<String, PropSpec>,
}

impl ComponentSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prop(mut self, name: impl Into<String>, spec: PropSpec) -> Self {
        self.props.insert(name.into(), spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropSpec> {
        self.props.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.props.contains_key(name)
    }

    /// Iterate descriptors in stable (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropSpec)> {
        self.props.iter()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether a string is a `#`-prefixed hex color of length 3, 6, or 8.
pub fn is_hex_color(s: &str) -> bool {
    let Some(hex) = s.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_coercion_and_clamp() {
        let spec = PropSpec::new(PropKind::Number).with_range(1.0, 100.0);
        assert_eq!(spec.coerce(json!(42)).unwrap(), json!(42.0));
        assert_eq!(spec.coerce(json!("17.5")).unwrap(), json!(17.5));
        assert_eq!(spec.coerce(json!(500)).unwrap(), json!(100.0));
        assert_eq!(spec.coerce(json!(-3)).unwrap(), json!(1.0));
        assert!(spec.coerce(json!("not a number")).is_err());
    }

    #[test]
    fn test_string_accepts_numbers() {
        let spec = PropSpec::new(PropKind::String);
        assert_eq!(spec.coerce(json!("a")).unwrap(), json!("a"));
        assert_eq!(spec.coerce(json!(7)).unwrap(), json!("7"));
        assert!(spec.coerce(json!({})).is_err());
    }

    #[test]
    fn test_color_validation() {
        let spec = PropSpec::new(PropKind::Color);
        assert!(spec.coerce(json!("#FFF")).is_ok());
        assert!(spec.coerce(json!("#00D4FF")).is_ok());
        assert!(spec.coerce(json!("#00D4FF80")).is_ok());
        assert!(spec.coerce(json!("red")).is_err());
        assert!(spec.coerce(json!("#GGHHII")).is_err());
    }

    #[test]
    fn test_enum_membership() {
        let spec = PropSpec::new(PropKind::Enum(vec!["left", "center", "right"]));
        assert!(spec.coerce(json!("center")).is_ok());
        let err = spec.coerce(json!("justified")).unwrap_err();
        assert!(err.contains("left, center, right"));
    }

    #[test]
    fn test_boolean_string_coercion() {
        let spec = PropSpec::new(PropKind::Boolean);
        assert_eq!(spec.coerce(json!("true")).unwrap(), json!(true));
        assert!(spec.coerce(json!(1)).is_err());
    }
}
