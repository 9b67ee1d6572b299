//! Topic derivation from outlines.
//!
//! Image search does not query full slide text; it derives a small set of
//! topics from slide titles and content, then maps each topic back to the
//! slides that produced it.

use std::collections::HashSet;

use crate::outline::DeckOutline;

/// Most topics a single slide contributes.
pub const MAX_TOPICS_PER_SLIDE: usize = 3;

/// Most topics derived for one deck.
pub const MAX_TOPICS_PER_DECK: usize = 12;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "into", "over", "our", "your", "their",
    "about", "what", "when", "where", "how", "why", "are", "was", "were", "will", "have", "has",
    "been", "more", "most", "than", "then", "them", "they", "you", "its", "per", "via", "each",
    "all", "any", "new", "key",
];

/// A derived search topic and the slides that want its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub name: String,
    pub slide_ids: Vec<String>,
}

/// Derive the deck's topic set.
///
/// Per slide: lowercase keywords from the title (falling back to content),
/// longest first, capped per slide; deck-wide the first
/// [`MAX_TOPICS_PER_DECK`] distinct topics win, in order of appearance.
pub fn derive_topics(outline: &DeckOutline) -> Vec<Topic> {
    let mut topics: Vec<Topic> = Vec::new();

    for slide in &outline.slides {
        let mut keywords = keywords_of(&slide.title);
        if keywords.is_empty() {
            keywords = keywords_of(&slide.content);
        }
        keywords.truncate(MAX_TOPICS_PER_SLIDE);

        for keyword in keywords {
            if let Some(existing) = topics.iter_mut().find(|t| t.name == keyword) {
                if !existing.slide_ids.contains(&slide.id) {
                    existing.slide_ids.push(slide.id.clone());
                }
            } else if topics.len() < MAX_TOPICS_PER_DECK {
                topics.push(Topic {
                    name: keyword,
                    slide_ids: vec![slide.id.clone()],
                });
            }
        }
    }

    topics
}

/// Topics relevant to one slide, in deck topic order.
pub fn topics_for_slide<'a>(topics: &'a [Topic], slide_id: &str) -> Vec<&'a Topic> {
    topics
        .iter()
        .filter(|t| t.slide_ids.iter().any(|id| id == slide_id))
        .collect()
}

/// Lowercased candidate keywords, longest first, deduplicated.
fn keywords_of(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.len() > 3 && !STOPWORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect();
    words.sort_by_key(|w| std::cmp::Reverse(w.len()));
    words
}

// =============================================================================
// Tests
// =============================================================================
