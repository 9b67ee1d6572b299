//! Positioned slide components.
//!
//! A component is a typed, positioned element on the 1920x1080 canvas. The
//! type tag selects which registry schema its props are validated against.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::deck::{CANVAS_HEIGHT, CANVAS_WIDTH};

// =============================================================================
// Component Type Tag
// =============================================================================

/// Tag identifying a component's schema in the registry.
///
/// The well-known set covers everything the generation pipeline produces
/// itself; `Custom` carries registry-provided extensions so a frontend can
/// register additional types without a crate change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Background,
    Title,
    Heading,
    TextBlock,
    TiptapTextBlock,
    Image,
    Shape,
    Chart,
    Table,
    Lines,
    Icon,
    Custom(String),
}

impl ComponentType {
    /// Parse a type tag; unknown names become `Custom`.
    pub fn parse(name: &str) -> Self {
        match name {
            "Background" => ComponentType::Background,
            "Title" => ComponentType::Title,
            "Heading" => ComponentType::Heading,
            "TextBlock" => ComponentType::TextBlock,
            "TiptapTextBlock" => ComponentType::TiptapTextBlock,
            "Image" => ComponentType::Image,
            "Shape" => ComponentType::Shape,
            "Chart" => ComponentType::Chart,
            "Table" => ComponentType::Table,
            "Lines" => ComponentType::Lines,
            "Icon" => ComponentType::Icon,
            other => ComponentType::Custom(other.to_string()),
        }
    }

    /// The registry key for this tag.
    pub fn as_str(&self) -> &str {
        match self {
            ComponentType::Background => "Background",
            ComponentType::Title => "Title",
            ComponentType::Heading => "Heading",
            ComponentType::TextBlock => "TextBlock",
            ComponentType::TiptapTextBlock => "TiptapTextBlock",
            ComponentType::Image => "Image",
            ComponentType::Shape => "Shape",
            ComponentType::Chart => "Chart",
            ComponentType::Table => "Table",
            ComponentType::Lines => "Lines",
            ComponentType::Icon => "Icon",
            ComponentType::Custom(name) => name,
        }
    }

    /// Whether this type carries text that adaptive font sizing applies to.
    pub fn is_text_bearing(&self) -> bool {
        matches!(
            self,
            ComponentType::Title
                | ComponentType::Heading
                | ComponentType::TextBlock
                | ComponentType::TiptapTextBlock
        )
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ComponentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ComponentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        if name.is_empty() {
            return Err(de::Error::custom("component type must be non-empty"));
        }
        Ok(ComponentType::parse(&name))
    }
}

// =============================================================================
// Position and Component
// =============================================================================

/// Top-left anchor of a component on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A validated, positioned element on a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Unique identifier within the slide.
    pub id: String,

    /// Registry type tag.
    #[serde(rename = "type")]
    pub component_type: ComponentType,

    /// Top-left anchor.
    #[serde(default)]
    pub position: Position,

    #[serde(default)]
    pub width: f64,

    #[serde(default)]
    pub height: f64,

    /// Type-specific props, validated against the registry schema.
    #[serde(default)]
    pub props: Map<String, Value>,

    /// Validator-written annotations (adaptive sizing, confidence).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Component {
    /// Create a component with empty props, spanning the given rectangle.
    pub fn new(
        id: impl Into<String>,
        component_type: ComponentType,
        position: Position,
        width: f64,
        height: f64,
    ) -> Self {
        Self {
            id: id.into(),
            component_type,
            position,
            width,
            height,
            props: Map::new(),
            metadata: Map::new(),
        }
    }

    /// A full-canvas component, used for backgrounds.
    pub fn full_canvas(id: impl Into<String>, component_type: ComponentType) -> Self {
        Self::new(
            id,
            component_type,
            Position::default(),
            CANVAS_WIDTH,
            CANVAS_HEIGHT,
        )
    }

    /// Set a prop, builder style.
    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    /// Read a string prop.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    /// Read a numeric prop, accepting integers and floats.
    pub fn prop_f64(&self, key: &str) -> Option<f64> {
        self.props.get(key).and_then(Value::as_f64)
    }

    /// Whether the component lies entirely within the canvas.
    pub fn fits_canvas(&self) -> bool {
        self.position.x >= 0.0
            && self.position.y >= 0.0
            && self.position.x + self.width <= CANVAS_WIDTH
            && self.position.y + self.height <= CANVAS_HEIGHT
    }
}

// =============================================================================
// Tests
// =============================================================================
