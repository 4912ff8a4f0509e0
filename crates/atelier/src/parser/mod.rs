pub mod splitter;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;
use serde::Deserialize;

use crate::deck::{Composite, DeckNode, SlideUnit};
use crate::protocol::AspectRatio;

/// Includes nested deeper than this fail to expand.
const MAX_INCLUDE_DEPTH: usize = 8;

/// Separates slide content (above) from speaker notes (below).
const NOTES_SEPARATOR: &str = "???";

/// Marks a progressively revealed line; the n-th one shows at step n.
pub const REVEAL_MARKER: &str = "+ ";

static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([A-Za-z0-9_-]+):\s*(.*?)\s*$").expect("valid directive regex"));

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeckMeta {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub aspect: Option<String>,
}

impl DeckMeta {
    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        self.aspect.as_deref().and_then(AspectRatio::from_token)
    }
}

#[derive(Debug, Clone)]
pub struct DeckSource {
    pub meta: DeckMeta,
    pub root: DeckNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub value: String,
}

/// Read and parse a deck file. Only reading the top-level file can fail.
pub fn load(path: &Path) -> anyhow::Result<DeckSource> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read deck {}", path.display()))?;
    Ok(parse(&content, base_dir(path)))
}

pub fn parse(content: &str, base_path: &Path) -> DeckSource {
    parse_at_depth(content, base_path, 0)
}

fn parse_at_depth(content: &str, base_path: &Path, depth: usize) -> DeckSource {
    let (meta, body) = extract_frontmatter(content);
    let children = splitter::split(&body)
        .iter()
        .map(|raw| parse_unit(raw, base_path, depth))
        .collect();
    DeckSource {
        meta,
        root: DeckNode::Group(children),
    }
}

fn parse_unit(raw: &str, base_path: &Path, depth: usize) -> DeckNode {
    let (content, notes) = split_notes(raw);
    let (directives, body) = extract_directives(&content);

    if body.trim().is_empty() {
        if let Some(include) = directives.iter().find(|d| d.name == "include") {
            return include_node(base_path.join(&include.value), depth);
        }
    }

    // `@steps` can add steps past the last reveal item but never hide one.
    let reveal_items = count_reveal_items(&body);
    let steps = directives
        .iter()
        .find(|d| d.name == "steps")
        .and_then(|d| d.value.parse::<usize>().ok())
        .map_or(reveal_items, |declared| declared.max(reveal_items));

    DeckNode::Slide(SlideUnit {
        content: body,
        notes,
        steps: (steps > 0).then_some(steps),
    })
}

fn include_node(path: PathBuf, depth: usize) -> DeckNode {
    let label = path.display().to_string();
    DeckNode::Composite(Composite::new(label, move || {
        if depth + 1 > MAX_INCLUDE_DEPTH {
            anyhow::bail!("includes nested more than {MAX_INCLUDE_DEPTH} levels deep");
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read included deck {}", path.display()))?;
        let source = parse_at_depth(&content, base_dir(&path), depth + 1);
        Ok(vec![source.root])
    }))
}

fn base_dir(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new("."))
}

/// Split a slide at its first `???` line outside a code fence.
fn split_notes(raw: &str) -> (String, Option<String>) {
    let mut content = Vec::new();
    let mut in_fence = false;
    let mut lines = raw.lines();
    for line in lines.by_ref() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }
        if !in_fence && trimmed == NOTES_SEPARATOR {
            let notes = lines.collect::<Vec<_>>().join("\n");
            return (content.join("\n"), Some(notes.trim_start_matches('\n').to_string()));
        }
        content.push(line);
    }
    (content.join("\n"), None)
}

/// Split leading-or-anywhere `@key: value` lines from the slide body.
pub fn extract_directives(raw: &str) -> (Vec<Directive>, String) {
    let mut directives = Vec::new();
    let mut body = Vec::new();
    let mut in_fence = false;
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }
        match DIRECTIVE.captures(trimmed).filter(|_| !in_fence) {
            Some(caps) => directives.push(Directive {
                name: caps[1].to_string(),
                value: caps[2].to_string(),
            }),
            None => body.push(line),
        }
    }
    (directives, body.join("\n").trim().to_string())
}

pub fn count_reveal_items(body: &str) -> usize {
    body.lines()
        .filter(|l| l.trim_start().starts_with(REVEAL_MARKER))
        .count()
}

/// Split optional YAML frontmatter (between leading `---` lines) from the body.
/// Malformed frontmatter is left in the body.
fn extract_frontmatter(content: &str) -> (DeckMeta, String) {
    let content = content.replace("\r\n", "\n");
    let Some(rest) = content.strip_prefix("---\n") else {
        return (DeckMeta::default(), content);
    };
    let Some(end) = rest.find("\n---") else {
        return (DeckMeta::default(), content);
    };
    match serde_yaml::from_str::<DeckMeta>(&rest[..end]) {
        Ok(meta) => {
            let body = rest[end + 4..].trim_start_matches('-').to_string();
            (meta, body)
        }
        Err(_) => (DeckMeta::default(), content),
    }
}
