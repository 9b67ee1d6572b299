//! Per-slide design context retrieval.
//!
//! Before prompting the AI for a slide, the generator asks the RAG service
//! what a slide of this shape usually needs: predicted component types,
//! layout hints, design guidelines, and critical rules. Lookups are served
//! from the compact knowledge base indexed by slide signature, with a small
//! cache in front. A failed lookup never blocks a slide; callers fall back
//! to [`RagService::fallback_context`].

mod kb;

pub use kb::{KbEntry, KnowledgeBase, SlideSignature};

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::debug;

use crate::compose::SlideContext;
use crate::error::RagError;
use crate::outline::SlideOutline;

/// Signature-context cache capacity.
const CONTEXT_CACHE_CAPACITY: usize = 32;

// =============================================================================
// Design Context
// =============================================================================

/// Retrieved design guidance for one slide.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignContext {
    pub signature: &'static str,
    pub predicted_components: Vec<String>,
    pub layout_hints: Vec<String>,
    pub design_guidelines: Vec<String>,
    pub critical_rules: Vec<String>,
}

// =============================================================================
// Signature Classification
// =============================================================================

/// Classify a slide into its design archetype.
pub fn classify_slide(outline: &SlideOutline, index: usize, total_slides: usize) -> SlideSignature {
    if outline.has_chart_data() {
        return SlideSignature::DataDriven;
    }
    if outline.comparison.is_some() {
        return SlideSignature::Comparison;
    }
    if index == 0 {
        return SlideSignature::TitleSlide;
    }
    if index + 1 == total_slides && looks_like_conclusion(&outline.title) {
        return SlideSignature::Conclusion;
    }
    if outline.content.len() > 400 {
        return SlideSignature::ContentHeavy;
    }
    SlideSignature::Standard
}

fn looks_like_conclusion(title: &str) -> bool {
    let lower = title.to_lowercase();
    ["thank", "summary", "conclusion", "next steps", "takeaway", "recap", "questions"]
        .iter()
        .any(|marker| lower.contains(marker))
}

// =============================================================================
// RAG Service
// =============================================================================

/// Signature-indexed design context retrieval with caching.
pub struct RagService {
    kb: KnowledgeBase,
    cache: Mutex<LruCache<SlideSignature, Arc<DesignContext>>>,
}

impl RagService {
    pub fn new() -> Self {
        Self {
            kb: KnowledgeBase::builtin(),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CONTEXT_CACHE_CAPACITY).unwrap(),
            )),
        }
    }

    /// Retrieve the design context for a slide.
    ///
    /// The base record comes from the knowledge base by signature; slide
    /// specifics (image availability, tagged media) are layered on top.
    pub async fn get_context(&self, context: &SlideContext) -> Result<DesignContext, RagError> {
        let signature = classify_slide(&context.outline, context.index, context.total_slides);

        let base = {
            let mut cache = self.cache.lock().expect("rag cache poisoned");
            if let Some(cached) = cache.get(&signature) {
                cached.clone()
            } else {
                let entry = self.kb.lookup(signature).ok_or_else(|| {
                    RagError::KnowledgeBase(format!(
                        "no record for signature '{}'",
                        signature.as_str()
                    ))
                })?;
                let built = Arc::new(DesignContext {
                    signature: signature.as_str(),
                    predicted_components: to_owned(&entry.predicted_components),
                    layout_hints: to_owned(&entry.layout_hints),
                    design_guidelines: to_owned(&entry.design_guidelines),
                    critical_rules: to_owned(&entry.critical_rules),
                });
                cache.put(signature, built.clone());
                built
            }
        };

        let mut design = (*base).clone();

        if !context.available_images.is_empty()
            && !design.predicted_components.iter().any(|c| c == "Image")
        {
            design.predicted_components.push("Image".into());
            design
                .layout_hints
                .push("reserve a region for one supporting image".into());
        }
        if context.has_tabular_data && !context.has_chart_data {
            design.predicted_components.push("Table".into());
        }

        debug!(
            slide_id = %context.outline.id,
            signature = design.signature,
            "rag context resolved"
        );
        Ok(design)
    }

    /// Static minimal context used when retrieval fails.
    pub fn fallback_context() -> DesignContext {
        DesignContext {
            signature: "fallback",
            predicted_components: vec!["Background".into(), "Heading".into(), "TextBlock".into()],
            layout_hints: vec!["heading top-left, content below".into()],
            design_guidelines: vec!["one idea per slide".into()],
            critical_rules: vec!["every slide carries a Background component".into()],
        }
    }
}

impl Default for RagService {
    fn default() -> Self {
        Self::new()
    }
}

fn to_owned(items: &[&'static str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Tests
// =============================================================================
