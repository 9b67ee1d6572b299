//! Component validation.
//!
//! Every AI-produced component passes through here before persistence:
//! unknown types are dropped (or fail the slide in strict mode), missing
//! props get registry defaults, numeric fields are coerced and clamped,
//! geometry is clamped onto the canvas, and text-bearing components get an
//! adaptively fitted font size.

use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::deck::{CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::error::ValidateError;
use crate::registry::{Component, ComponentRegistry, ComponentType};
use crate::sizing::AdaptiveFontSizer;
use crate::theme::ThemeSpec;

/// Horizontal text padding assumed inside text containers.
const TEXT_PADDING_X: f64 = 16.0;

/// Vertical text padding assumed inside text containers.
const TEXT_PADDING_Y: f64 = 8.0;

// =============================================================================
// Component Validator
// =============================================================================

/// Normalizes and validates components against the registry.
pub struct ComponentValidator {
    sizer: AdaptiveFontSizer,
    /// In strict mode an unknown component type fails validation instead of
    /// being dropped. Unknown props are warned and dropped in both modes.
    strict: bool,
}

impl ComponentValidator {
    pub fn new(strict: bool) -> Self {
        Self {
            sizer: AdaptiveFontSizer::new(),
            strict,
        }
    }

    /// Validate a slide's components.
    ///
    /// Returns the normalized component list. Errors are reserved for the
    /// non-recoverable cases: unknown types in strict mode, and props that
    /// fail coercion with no default to fall back on.
    pub fn validate(
        &self,
        components: Vec<Component>,
        registry: &ComponentRegistry,
        theme: &ThemeSpec,
    ) -> Result<Vec<Component>, ValidateError> {
        let mut validated = Vec::with_capacity(components.len());

        for component in components {
            let type_name = component.component_type.as_str().to_string();

            if !registry.contains(&type_name) {
                if self.strict {
                    return Err(ValidateError::UnknownType {
                        component_type: type_name,
                    });
                }
                warn!(component_type = %type_name, "dropping unknown component type");
                continue;
            }

            let mut component = component;
            if component.id.is_empty() {
                component.id = Uuid::new_v4().to_string();
            }

            self.apply_schema(&mut component, registry)?;
            clamp_geometry(&mut component);

            if component.component_type.is_text_bearing() {
                self.apply_adaptive_sizing(&mut component, theme);
            }

            validated.push(component);
        }

        Ok(validated)
    }

    /// Fill defaults, coerce present values, drop unknown props.
    fn apply_schema(
        &self,
        component: &mut Component,
        registry: &ComponentRegistry,
    ) -> Result<(), ValidateError> {
        let type_name = component.component_type.as_str().to_string();
        let spec = registry
            .spec(&type_name)
            .expect("caller checked registry membership");

        // Unknown props are dropped in both modes.
        let unknown: Vec<String> = component
            .props
            .keys()
            .filter(|key| !spec.contains(key))
            .cloned()
            .collect();
        for key in unknown {
            warn!(component_type = %type_name, prop = %key, "dropping unknown prop");
            component.props.remove(&key);
        }

        for (name, prop_spec) in spec.iter() {
            match component.props.remove(name) {
                Some(value) => match prop_spec.coerce(value) {
                    Ok(coerced) => {
                        component.props.insert(name.clone(), coerced);
                    }
                    Err(reason) => {
                        if let Some(default) = &prop_spec.default {
                            debug!(
                                component_type = %type_name,
                                prop = %name,
                                %reason,
                                "replacing invalid prop with default"
                            );
                            component.props.insert(name.clone(), default.clone());
                        } else {
                            return Err(ValidateError::Schema {
                                component_type: type_name,
                                field: name.clone(),
                                message: reason,
                            });
                        }
                    }
                },
                None => {
                    if let Some(default) = &prop_spec.default {
                        component.props.insert(name.clone(), default.clone());
                    } else if prop_spec.required {
                        return Err(ValidateError::Schema {
                            component_type: type_name,
                            field: name.clone(),
                            message: "required prop missing".into(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Fit the font size to the component's box and record the sizing
    /// metadata. Empty text keeps its schema-default size.
    fn apply_adaptive_sizing(&self, component: &mut Component, theme: &ThemeSpec) {
        let text = text_content(component);
        if text.is_empty() {
            return;
        }

        let family = component
            .prop_str("fontFamily")
            .filter(|f| !f.is_empty())
            .map(String::from)
            .unwrap_or_else(|| theme_font(component, theme));

        let result = self.sizer.find_optimal_size(
            &text,
            component.width,
            component.height,
            &family,
            TEXT_PADDING_X,
            TEXT_PADDING_Y,
        );

        component
            .props
            .insert("fontSize".into(), json!(result.font_size));
        component.props.insert("fontFamily".into(), json!(family));
        component
            .metadata
            .insert("adaptiveSizing".into(), json!(true));
        component
            .metadata
            .insert("confidence".into(), json!(result.confidence));
    }
}

impl Default for ComponentValidator {
    fn default() -> Self {
        Self::new(false)
    }
}

/// The text a component renders, for sizing purposes.
fn text_content(component: &Component) -> String {
    if let Some(text) = component.prop_str("text") {
        if !text.is_empty() {
            return text.to_string();
        }
    }
    // TiptapTextBlock carries a list of rich-text runs.
    if let Some(Value::Array(runs)) = component.props.get("texts") {
        return runs
            .iter()
            .filter_map(|run| {
                run.as_str()
                    .map(String::from)
                    .or_else(|| run.get("text").and_then(Value::as_str).map(String::from))
            })
            .collect::<Vec<_>>()
            .join(" ");
    }
    String::new()
}

/// Theme font by role: titles and headings use the hero font, body text the
/// body font.
fn theme_font(component: &Component, theme: &ThemeSpec) -> String {
    match component.component_type {
        ComponentType::Title | ComponentType::Heading => theme.fonts.hero.clone(),
        _ => theme.fonts.body.clone(),
    }
}

/// Clamp a component onto the canvas, shrinking and shifting as needed.
fn clamp_geometry(component: &mut Component) {
    let original = (
        component.position.x,
        component.position.y,
        component.width,
        component.height,
    );

    component.width = component.width.clamp(1.0, CANVAS_WIDTH);
    component.height = component.height.clamp(1.0, CANVAS_HEIGHT);
    component.position.x = component
        .position
        .x
        .clamp(0.0, CANVAS_WIDTH - component.width);
    component.position.y = component
        .position
        .y
        .clamp(0.0, CANVAS_HEIGHT - component.height);

    let clamped = (
        component.position.x,
        component.position.y,
        component.width,
        component.height,
    );
    if original != clamped {
        warn!(
            component_id = %component.id,
            ?original,
            ?clamped,
            "clamped off-canvas component"
        );
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Position;
    use serde_json::json;

    fn theme() -> ThemeSpec {
        ThemeSpec::fallback()
    }

    fn registry() -> ComponentRegistry {
        ComponentRegistry::builtin()
    }

    fn text_block(text: &str, width: f64, height: f64) -> Component {
        Component::new(
            "tb1",
            ComponentType::TextBlock,
            Position::new(100.0, 100.0),
            width,
            height,
        )
        .with_prop("text", json!(text))
    }

    #[test]
    fn test_defaults_injected() {
        let validator = ComponentValidator::new(false);
        let background = Component::full_canvas("bg", ComponentType::Background);

        let result = validator
            .validate(vec![background], &registry(), &theme())
            .unwrap();
        assert_eq!(result[0].prop_str("backgroundColor"), Some("#0A0A0A"));
    }

    #[test]
    fn test_unknown_type_dropped_when_lenient() {
        let validator = ComponentValidator::new(false);
        let unknown = Component::new(
            "v1",
            ComponentType::Custom("Video".into()),
            Position::default(),
            100.0,
            100.0,
        );
        let keep = Component::full_canvas("bg", ComponentType::Background);

        let result = validator
            .validate(vec![unknown, keep], &registry(), &theme())
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "bg");
    }

    #[test]
    fn test_unknown_type_fails_when_strict() {
        let validator = ComponentValidator::new(true);
        let unknown = Component::new(
            "v1",
            ComponentType::Custom("Video".into()),
            Position::default(),
            100.0,
            100.0,
        );

        let err = validator
            .validate(vec![unknown], &registry(), &theme())
            .unwrap_err();
        assert!(matches!(err, ValidateError::UnknownType { .. }));
    }

    #[test]
    fn test_unknown_props_dropped_in_strict_mode_too() {
        let validator = ComponentValidator::new(true);
        let component = Component::full_canvas("bg", ComponentType::Background)
            .with_prop("sparkles", json!(true));

        let result = validator
            .validate(vec![component], &registry(), &theme())
            .unwrap();
        assert!(result[0].props.get("sparkles").is_none());
    }

    #[test]
    fn test_numeric_coercion_from_string() {
        let validator = ComponentValidator::new(false);
        let shape = Component::new(
            "s1",
            ComponentType::Shape,
            Position::new(10.0, 10.0),
            200.0,
            100.0,
        )
        .with_prop("strokeWidth", json!("3.5"));

        let result = validator
            .validate(vec![shape], &registry(), &theme())
            .unwrap();
        assert_eq!(result[0].prop_f64("strokeWidth"), Some(3.5));
    }

    #[test]
    fn test_invalid_prop_with_default_recovers() {
        let validator = ComponentValidator::new(false);
        let component = Component::full_canvas("bg", ComponentType::Background)
            .with_prop("backgroundColor", json!("not-a-color"));

        let result = validator
            .validate(vec![component], &registry(), &theme())
            .unwrap();
        assert_eq!(result[0].prop_str("backgroundColor"), Some("#0A0A0A"));
    }

    #[test]
    fn test_off_canvas_component_clamped() {
        let validator = ComponentValidator::new(false);
        let shape = Component::new(
            "s1",
            ComponentType::Shape,
            Position::new(1800.0, 1000.0),
            400.0,
            300.0,
        );

        let result = validator
            .validate(vec![shape], &registry(), &theme())
            .unwrap();
        let clamped = &result[0];
        assert!(clamped.fits_canvas());
        assert_eq!(clamped.position.x + clamped.width, CANVAS_WIDTH);
        assert_eq!(clamped.position.y + clamped.height, CANVAS_HEIGHT);
    }

    #[test]
    fn test_oversized_component_shrinks_to_canvas() {
        let validator = ComponentValidator::new(false);
        let shape = Component::new(
            "s1",
            ComponentType::Shape,
            Position::new(0.0, 0.0),
            5000.0,
            3000.0,
        );

        let result = validator
            .validate(vec![shape], &registry(), &theme())
            .unwrap();
        assert_eq!(result[0].width, CANVAS_WIDTH);
        assert_eq!(result[0].height, CANVAS_HEIGHT);
    }

    #[test]
    fn test_adaptive_sizing_marks_metadata() {
        let validator = ComponentValidator::new(false);
        let block = text_block("Fit me into this box please", 600.0, 200.0);

        let result = validator
            .validate(vec![block], &registry(), &theme())
            .unwrap();
        let sized = &result[0];

        assert_eq!(sized.metadata.get("adaptiveSizing"), Some(&json!(true)));
        let confidence = sized.metadata["confidence"].as_f64().unwrap();
        assert!(confidence > 0.0);
        // Font size was replaced by the fitted value.
        assert!(sized.prop_f64("fontSize").unwrap() >= 1.0);
        // Body text falls back to the theme body font.
        assert_eq!(sized.prop_str("fontFamily"), Some("system-ui"));
    }

    #[test]
    fn test_title_uses_hero_font() {
        let validator = ComponentValidator::new(false);
        let title = Component::new(
            "t1",
            ComponentType::Title,
            Position::new(100.0, 100.0),
            1000.0,
            200.0,
        )
        .with_prop("text", json!("Big Title"));

        let result = validator
            .validate(vec![title], &registry(), &theme())
            .unwrap();
        assert_eq!(result[0].prop_str("fontFamily"), Some("Inter"));
    }

    #[test]
    fn test_empty_text_keeps_default_size() {
        let validator = ComponentValidator::new(false);
        let block = text_block("", 600.0, 200.0);

        let result = validator
            .validate(vec![block], &registry(), &theme())
            .unwrap();
        // Schema default, not the sizer's floor.
        assert_eq!(result[0].prop_f64("fontSize"), Some(24.0));
        assert!(result[0].metadata.get("adaptiveSizing").is_none());
    }

    #[test]
    fn test_tiptap_runs_are_sized() {
        let validator = ComponentValidator::new(false);
        let tiptap = Component::new(
            "tt1",
            ComponentType::TiptapTextBlock,
            Position::new(100.0, 100.0),
            600.0,
            300.0,
        )
        .with_prop("texts", json!([{"text": "Run one"}, {"text": "run two"}]));

        let result = validator
            .validate(vec![tiptap], &registry(), &theme())
            .unwrap();
        assert_eq!(result[0].metadata.get("adaptiveSizing"), Some(&json!(true)));
    }

    #[test]
    fn test_generated_id_for_blank() {
        let validator = ComponentValidator::new(false);
        let mut component = Component::full_canvas("", ComponentType::Background);
        component.id = String::new();

        let result = validator
            .validate(vec![component], &registry(), &theme())
            .unwrap();
        assert!(!result[0].id.is_empty());
    }
}
