//! Slide model: the declaration tree produced by the parser and the flat,
//! ordered deck the navigator is built from.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

/// Composites may expand into further composites; anything nested deeper than
/// this is treated as a failed expansion.
const MAX_EXPANSION_DEPTH: usize = 32;

/// A leaf slide as declared in the deck source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideUnit {
    pub content: String,
    pub notes: Option<String>,
    /// Explicit step count; `None` means the slide has no sub-steps.
    pub steps: Option<usize>,
}

pub type Expander = Arc<dyn Fn() -> anyhow::Result<Vec<DeckNode>> + Send + Sync>;

/// A unit that expands, at extraction time, into further nodes.
#[derive(Clone)]
pub struct Composite {
    pub label: String,
    expand: Expander,
}

impl Composite {
    pub fn new(
        label: impl Into<String>,
        expand: impl Fn() -> anyhow::Result<Vec<DeckNode>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            expand: Arc::new(expand),
        }
    }

    pub fn expand(&self) -> anyhow::Result<Vec<DeckNode>> {
        (self.expand)()
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum DeckNode {
    Slide(SlideUnit),
    Composite(Composite),
    /// Transparent wrapper: contributes its children, never a slide itself.
    Group(Vec<DeckNode>),
}

/// One normalized slide. Content and notes are opaque to navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideRecord {
    pub content: String,
    pub notes: Option<String>,
    pub step_count: usize,
}

impl From<&SlideUnit> for SlideRecord {
    fn from(unit: &SlideUnit) -> Self {
        let notes = unit
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        Self {
            content: unit.content.trim().to_string(),
            notes,
            step_count: unit.steps.unwrap_or(0),
        }
    }
}

impl SlideRecord {
    /// First non-blank content line without heading markers.
    pub fn heading(&self) -> &str {
        self.content
            .lines()
            .map(|l| l.trim().trim_start_matches('#').trim())
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }
}

/// Ordered slides; insertion order is presentation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deck {
    slides: Vec<SlideRecord>,
}

impl Deck {
    pub fn new(slides: Vec<SlideRecord>) -> Self {
        Self { slides }
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SlideRecord> {
        self.slides.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SlideRecord> {
        self.slides.iter()
    }
}

/// Flatten a declaration tree into a deck, in document (pre-)order.
///
/// Never fails: a composite whose expansion errors contributes nothing and
/// extraction carries on with its siblings.
pub fn extract(root: &DeckNode) -> Deck {
    let mut slides = Vec::new();
    visit(root, 0, &mut slides);
    Deck::new(slides)
}

fn visit(node: &DeckNode, depth: usize, out: &mut Vec<SlideRecord>) {
    match node {
        DeckNode::Slide(unit) => out.push(SlideRecord::from(unit)),
        DeckNode::Group(children) => {
            for child in children {
                visit(child, depth, out);
            }
        }
        DeckNode::Composite(composite) => {
            if depth >= MAX_EXPANSION_DEPTH {
                warn!(label = %composite.label, "skipping composite: nested too deeply");
                return;
            }
            match composite.expand() {
                Ok(children) => {
                    for child in &children {
                        visit(child, depth + 1, out);
                    }
                }
                Err(e) => warn!(label = %composite.label, "skipping composite: {e:#}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(content: &str) -> DeckNode {
        DeckNode::Slide(SlideUnit {
            content: content.to_string(),
            notes: None,
            steps: None,
        })
    }

    fn contents(deck: &Deck) -> Vec<&str> {
        deck.iter().map(|s| s.content.as_str()).collect()
    }

    #[test]
    fn test_preorder_document_order() {
        let tree = DeckNode::Group(vec![
            slide("a"),
            DeckNode::Group(vec![slide("b"), DeckNode::Group(vec![slide("c")])]),
            DeckNode::Composite(Composite::new("pair", || Ok(vec![slide("d"), slide("e")]))),
            slide("f"),
        ]);
        assert_eq!(contents(&extract(&tree)), ["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_failed_composite_is_skipped() {
        let tree = DeckNode::Group(vec![
            slide("a"),
            DeckNode::Composite(Composite::new("broken", || anyhow::bail!("no such file"))),
            slide("b"),
        ]);
        assert_eq!(contents(&extract(&tree)), ["a", "b"]);
    }

    #[test]
    fn test_composite_expanding_to_wrapper_and_composite() {
        let inner = Composite::new("inner", || Ok(vec![slide("y")]));
        let outer = Composite::new("outer", move || {
            Ok(vec![DeckNode::Group(vec![
                slide("x"),
                DeckNode::Composite(inner.clone()),
            ])])
        });
        let tree = DeckNode::Group(vec![DeckNode::Composite(outer), slide("z")]);
        assert_eq!(contents(&extract(&tree)), ["x", "y", "z"]);
    }

    #[test]
    fn test_self_expanding_composite_terminates() {
        fn looping() -> DeckNode {
            DeckNode::Composite(Composite::new("loop", || Ok(vec![looping()])))
        }
        let tree = DeckNode::Group(vec![looping(), slide("after")]);
        assert_eq!(contents(&extract(&tree)), ["after"]);
    }

    #[test]
    fn test_record_normalization() {
        let tree = DeckNode::Group(vec![
            DeckNode::Slide(SlideUnit {
                content: "  # Title\n".to_string(),
                notes: Some("   \n".to_string()),
                steps: None,
            }),
            DeckNode::Slide(SlideUnit {
                content: "Body".to_string(),
                notes: Some(" remember the demo ".to_string()),
                steps: Some(3),
            }),
        ]);
        let deck = extract(&tree);
        assert_eq!(
            deck.get(0),
            Some(&SlideRecord {
                content: "# Title".to_string(),
                notes: None,
                step_count: 0,
            })
        );
        assert_eq!(deck.get(1).and_then(|s| s.notes.as_deref()), Some("remember the demo"));
        assert_eq!(deck.get(1).map(|s| s.step_count), Some(3));
        assert_eq!(deck.get(0).map(SlideRecord::heading), Some("Title"));
        assert_eq!(deck.get(1).map(SlideRecord::heading), Some("Body"));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let tree = DeckNode::Group(vec![
            slide("a"),
            DeckNode::Composite(Composite::new("c", || Ok(vec![slide("b")]))),
        ]);
        assert_eq!(extract(&tree), extract(&tree));
    }

    #[test]
    fn test_empty_tree() {
        let deck = extract(&DeckNode::Group(Vec::new()));
        assert!(deck.is_empty());
        assert_eq!(deck.get(0), None);
    }
}
