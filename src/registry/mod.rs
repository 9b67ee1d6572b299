//! Component schema registry.
//!
//! The registry owns one [`ComponentSpec`] per component type and is the
//! single source of truth for which types exist, which props they accept,
//! and what defaults fill missing props. Validation never inspects concrete
//! Rust types: it walks the compiled descriptors, so schemas supplied by a
//! frontend at runtime behave exactly like the built-in set.
//!
//! # Example
//!
//! ```
//! use deck_composer::registry::ComponentRegistry;
//!
//! let registry = ComponentRegistry::builtin();
//! assert!(registry.contains("TextBlock"));
//! assert!(registry.spec("TextBlock").unwrap().contains("fontSize"));
//! ```

mod component;
mod schema;

pub use component::{Component, ComponentType, Position};
pub use schema::{is_hex_color, ComponentSpec, PropKind, PropSpec};

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::error::ConfigError;

// =============================================================================
// Component Registry
// =============================================================================

/// Registry of component types and their compiled prop schemas.
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    specs: HashMap<String, ComponentSpec>,
}

impl ComponentRegistry {
    /// An empty registry. Useful for tests that register types explicitly.
    pub fn empty() -> Self {
        Self {
            specs: HashMap::new(),
        }
    }

    /// The built-in schema set covering every type the pipeline generates.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        registry.register(
            "Background",
            ComponentSpec::new()
                .prop(
                    "backgroundColor",
                    PropSpec::new(PropKind::Color).with_default(json!("#0A0A0A")),
                )
                .prop("gradient", PropSpec::new(PropKind::Object)),
        );

        registry.register("Title", text_spec(96.0));
        registry.register("Heading", text_spec(48.0));
        registry.register(
            "TextBlock",
            text_spec(24.0).prop(
                "lineHeight",
                PropSpec::new(PropKind::Number)
                    .with_default(json!(1.2))
                    .with_range(0.8, 3.0),
            ),
        );
        registry.register(
            "TiptapTextBlock",
            text_spec(24.0).prop("texts", PropSpec::new(PropKind::Array).with_default(json!([]))),
        );

        registry.register(
            "Image",
            ComponentSpec::new()
                .prop("src", PropSpec::new(PropKind::String).with_default(json!("")))
                .prop("alt", PropSpec::new(PropKind::String).with_default(json!("")))
                .prop(
                    "objectFit",
                    PropSpec::new(PropKind::Enum(vec!["cover", "contain", "fill"]))
                        .with_default(json!("cover")),
                )
                .prop("animation", PropSpec::new(PropKind::Object)),
        );

        registry.register(
            "Shape",
            ComponentSpec::new()
                .prop(
                    "shape",
                    PropSpec::new(PropKind::Enum(vec![
                        "rectangle", "ellipse", "triangle", "line",
                    ]))
                    .with_default(json!("rectangle")),
                )
                .prop("fill", PropSpec::new(PropKind::Color).with_default(json!("#1A1A2E")))
                .prop("stroke", PropSpec::new(PropKind::Color))
                .prop(
                    "strokeWidth",
                    PropSpec::new(PropKind::Number).with_range(0.0, 64.0),
                )
                .prop(
                    "cornerRadius",
                    PropSpec::new(PropKind::Number).with_range(0.0, 256.0),
                ),
        );

        registry.register(
            "Chart",
            ComponentSpec::new()
                .prop(
                    "chartType",
                    PropSpec::new(PropKind::Enum(vec!["bar", "line", "pie", "area", "scatter"]))
                        .with_default(json!("bar")),
                )
                .prop("data", PropSpec::new(PropKind::Array).required().with_default(json!([])))
                .prop(
                    "showLegend",
                    PropSpec::new(PropKind::Boolean).with_default(json!(true)),
                )
                .prop("colors", PropSpec::new(PropKind::Array)),
        );

        registry.register(
            "Table",
            ComponentSpec::new()
                .prop("headers", PropSpec::new(PropKind::Array).with_default(json!([])))
                .prop("rows", PropSpec::new(PropKind::Array).required().with_default(json!([])))
                .prop("headerColor", PropSpec::new(PropKind::Color))
                .prop("cellColor", PropSpec::new(PropKind::Color)),
        );

        registry.register(
            "Lines",
            ComponentSpec::new()
                .prop("points", PropSpec::new(PropKind::Array).with_default(json!([])))
                .prop("stroke", PropSpec::new(PropKind::Color).with_default(json!("#FFFFFF")))
                .prop(
                    "strokeWidth",
                    PropSpec::new(PropKind::Number)
                        .with_default(json!(2.0))
                        .with_range(0.5, 32.0),
                ),
        );

        registry.register(
            "Icon",
            ComponentSpec::new()
                .prop("name", PropSpec::new(PropKind::String).required().with_default(json!("circle")))
                .prop("color", PropSpec::new(PropKind::Color).with_default(json!("#FFFFFF")))
                .prop(
                    "strokeWidth",
                    PropSpec::new(PropKind::Number).with_range(0.5, 8.0),
                ),
        );

        registry
    }

    /// Compile additional schemas from registry-definition JSON.
    ///
    /// The expected shape is the one the frontend ships:
    /// `{ "<Type>": { "schema": { "properties": { "<prop>": { "type": ...,
    /// "default": ..., "minimum": ..., "maximum": ..., "enum": [...] } },
    /// "required": [...] } } }`. Unknown prop types fail with
    /// `configuration_invalid` rather than being guessed.
    pub fn load_schemas(&mut self, schemas: &Value) -> Result<(), ConfigError> {
        let Some(entries) = schemas.as_object() else {
            return Err(ConfigError::Invalid(
                "registry schemas must be an object".into(),
            ));
        };

        for (type_name, entry) in entries {
            let schema = entry
                .get("schema")
                .and_then(Value::as_object)
                .ok_or_else(|| {
                    ConfigError::Invalid(format!("registry entry '{type_name}' has no schema"))
                })?;

            let required: Vec<&str> = schema
                .get("required")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();

            let mut spec = ComponentSpec::new();
            if let Some(props) = schema.get("properties").and_then(Value::as_object) {
                for (prop_name, descriptor) in props {
                    let mut prop = compile_prop(type_name, prop_name, descriptor)?;
                    if required.contains(&prop_name.as_str()) {
                        prop = prop.required();
                    }
                    spec = spec.prop(prop_name.clone(), prop);
                }
            }

            self.register(type_name.clone(), spec);
        }

        Ok(())
    }

    /// Register (or replace) a component type.
    pub fn register(&mut self, type_name: impl Into<String>, spec: ComponentSpec) {
        self.specs.insert(type_name.into(), spec);
    }

    /// Whether the type is known.
    pub fn contains(&self, type_name: &str) -> bool {
        self.specs.contains_key(type_name)
    }

    /// The compiled schema for a type.
    pub fn spec(&self, type_name: &str) -> Option<&ComponentSpec> {
        self.specs.get(type_name)
    }

    /// All registered type names, sorted.
    pub fn types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.specs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Shared descriptor set for text-bearing components.
fn text_spec(default_size: f64) -> ComponentSpec {
    ComponentSpec::new()
        .prop("text", PropSpec::new(PropKind::String).required().with_default(json!("")))
        .prop(
            "fontSize",
            PropSpec::new(PropKind::Number)
                .with_default(json!(default_size))
                .with_range(1.0, 1920.0),
        )
        .prop(
            "fontFamily",
            PropSpec::new(PropKind::String).with_default(json!("Inter")),
        )
        .prop(
            "fontWeight",
            PropSpec::new(PropKind::Enum(vec!["normal", "medium", "semibold", "bold"]))
                .with_default(json!("normal")),
        )
        .prop("color", PropSpec::new(PropKind::Color).with_default(json!("#FFFFFF")))
        .prop(
            "alignment",
            PropSpec::new(PropKind::Enum(vec!["left", "center", "right"]))
                .with_default(json!("left")),
        )
}

fn compile_prop(
    type_name: &str,
    prop_name: &str,
    descriptor: &Value,
) -> Result<PropSpec, ConfigError> {
    let kind_name = descriptor
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "prop '{prop_name}' on '{type_name}' has no type"
            ))
        })?;

    let kind = if let Some(variants) = descriptor.get("enum").and_then(Value::as_array) {
        // Enum variants are leaked once at registry load; registries are
        // process-lifetime objects.
        let owned: Vec<&'static str> = variants
            .iter()
            .filter_map(Value::as_str)
            .map(|s| &*Box::leak(s.to_string().into_boxed_str()))
            .collect();
        PropKind::Enum(owned)
    } else {
        match kind_name {
            "string" => PropKind::String,
            "number" | "integer" => PropKind::Number,
            "boolean" => PropKind::Boolean,
            "color" => PropKind::Color,
            "object" => PropKind::Object,
            "array" => PropKind::Array,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "prop '{prop_name}' on '{type_name}' has unknown type '{other}'"
                )))
            }
        }
    };

    let mut spec = PropSpec::new(kind);
    if let Some(default) = descriptor.get("default") {
        spec = spec.with_default(default.clone());
    }
    if let (Some(min), Some(max)) = (
        descriptor.get("minimum").and_then(Value::as_f64),
        descriptor.get("maximum").and_then(Value::as_f64),
    ) {
        spec = spec.with_range(min, max);
    }

    Ok(spec)
}

// =============================================================================
// Tests
// =============================================================================
