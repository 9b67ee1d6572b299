//! Compact design knowledge base.
//!
//! Slides are classified into a small signature set; each signature maps to
//! a curated record of component predictions, layout hints, design
//! guidelines, and critical rules. The records are the distilled knowledge
//! the slide prompts quote.

use std::collections::HashMap;

// =============================================================================
// Slide Signature
// =============================================================================

/// The design archetype of a slide, derived from its outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlideSignature {
    /// First slide of the deck.
    TitleSlide,
    /// Carries chartable extracted data.
    DataDriven,
    /// Carries structured two-column comparison content.
    Comparison,
    /// Closing slide: summary, thanks, next steps.
    Conclusion,
    /// Long-form content that needs dense text layout.
    ContentHeavy,
    /// Everything else.
    Standard,
}

impl SlideSignature {
    pub fn as_str(self) -> &'static str {
        match self {
            SlideSignature::TitleSlide => "title_slide",
            SlideSignature::DataDriven => "data_driven",
            SlideSignature::Comparison => "comparison",
            SlideSignature::Conclusion => "conclusion",
            SlideSignature::ContentHeavy => "content_heavy",
            SlideSignature::Standard => "standard",
        }
    }
}

// =============================================================================
// Knowledge Base
// =============================================================================

/// One knowledge record.
#[derive(Debug, Clone)]
pub struct KbEntry {
    pub predicted_components: Vec<&'static str>,
    pub layout_hints: Vec<&'static str>,
    pub design_guidelines: Vec<&'static str>,
    pub critical_rules: Vec<&'static str>,
}

/// Signature-indexed design knowledge.
pub struct KnowledgeBase {
    entries: HashMap<SlideSignature, KbEntry>,
}

impl KnowledgeBase {
    /// The curated built-in knowledge base.
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();

        entries.insert(
            SlideSignature::TitleSlide,
            KbEntry {
                predicted_components: vec!["Background", "Title", "TextBlock"],
                layout_hints: vec![
                    "title dominates the upper two thirds",
                    "subtitle or presenter line near the bottom",
                ],
                design_guidelines: vec![
                    "use the hero font at maximum comfortable size",
                    "keep the canvas nearly empty; one accent element at most",
                ],
                critical_rules: vec![
                    "exactly one Title component",
                    "no body paragraphs on the opening slide",
                ],
            },
        );

        entries.insert(
            SlideSignature::DataDriven,
            KbEntry {
                predicted_components: vec!["Background", "Heading", "Chart", "TextBlock"],
                layout_hints: vec![
                    "chart takes at least 60% of the canvas",
                    "one-line takeaway above or beside the chart",
                ],
                design_guidelines: vec![
                    "label axes with the body font",
                    "use accent colors for series, background colors stay neutral",
                ],
                critical_rules: vec![
                    "never fabricate data points beyond the provided rows",
                    "a Chart component must carry the extracted data",
                ],
            },
        );

        entries.insert(
            SlideSignature::Comparison,
            KbEntry {
                predicted_components: vec![
                    "Background",
                    "Heading",
                    "TextBlock",
                    "TextBlock",
                    "Shape",
                ],
                layout_hints: vec![
                    "two columns split near the middle",
                    "column labels above each side",
                ],
                design_guidelines: vec![
                    "mirror the column layouts so the eye compares like with like",
                    "use one accent per side at most",
                ],
                critical_rules: vec![
                    "left content stays left, right content stays right",
                    "keep bullets parallel in grammar and depth",
                ],
            },
        );

        entries.insert(
            SlideSignature::Conclusion,
            KbEntry {
                predicted_components: vec!["Background", "Title", "TextBlock"],
                layout_hints: vec!["single centered statement", "call to action near the bottom"],
                design_guidelines: vec![
                    "echo the opening slide's composition",
                    "largest type of the deck after the title slide",
                ],
                critical_rules: vec!["no new information on the closing slide"],
            },
        );

        entries.insert(
            SlideSignature::ContentHeavy,
            KbEntry {
                predicted_components: vec!["Background", "Heading", "TextBlock", "TextBlock"],
                layout_hints: vec![
                    "split long content into two or three text blocks",
                    "heading anchored top-left",
                ],
                design_guidelines: vec![
                    "prefer more slides over smaller text when content overflows",
                    "line length under ninety characters",
                ],
                critical_rules: vec!["body text never overlaps other components"],
            },
        );

        entries.insert(
            SlideSignature::Standard,
            KbEntry {
                predicted_components: vec!["Background", "Heading", "TextBlock"],
                layout_hints: vec!["heading top-left, content below"],
                design_guidelines: vec![
                    "one idea per slide",
                    "whitespace is part of the design, leave margins alone",
                ],
                critical_rules: vec!["every slide carries a Background component"],
            },
        );

        Self { entries }
    }

    pub fn lookup(&self, signature: SlideSignature) -> Option<&KbEntry> {
        self.entries.get(&signature)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_all_signatures() {
        let kb = KnowledgeBase::builtin();
        for signature in [
            SlideSignature::TitleSlide,
            SlideSignature::DataDriven,
            SlideSignature::Comparison,
            SlideSignature::Conclusion,
            SlideSignature::ContentHeavy,
            SlideSignature::Standard,
        ] {
            let entry = kb.lookup(signature).unwrap();
            assert!(!entry.predicted_components.is_empty(), "{signature:?}");
            assert!(!entry.critical_rules.is_empty(), "{signature:?}");
        }
    }

    #[test]
    fn test_every_entry_predicts_a_background() {
        let kb = KnowledgeBase::builtin();
        for signature in [
            SlideSignature::TitleSlide,
            SlideSignature::DataDriven,
            SlideSignature::Comparison,
            SlideSignature::Conclusion,
            SlideSignature::ContentHeavy,
            SlideSignature::Standard,
        ] {
            assert!(kb
                .lookup(signature)
                .unwrap()
                .predicted_components
                .contains(&"Background"));
        }
    }
}
