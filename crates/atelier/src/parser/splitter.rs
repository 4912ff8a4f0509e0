/// Split a deck body (frontmatter already removed) into raw slide chunks.
///
/// A new slide starts at:
/// 1. a `---` line with blank lines (or the document edge) on both sides
/// 2. a `# ` heading when the current slide already has content
///
/// Fenced code blocks are opaque: nothing inside them starts a slide.
pub fn split(body: &str) -> Vec<String> {
    let body = body.replace("\r\n", "\n");
    let lines: Vec<&str> = body.split('\n').collect();

    let mut slides = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut fence: Option<(char, usize)> = None;

    for (i, &line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if let Some((ch, len)) = fence {
            if closes_fence(trimmed, ch, len) {
                fence = None;
            }
            current.push(line);
            continue;
        }

        if let Some(opened) = opens_fence(trimmed) {
            fence = Some(opened);
            current.push(line);
            continue;
        }

        if is_dash_separator(trimmed) {
            let prev_blank = current.last().is_none_or(|l| l.trim().is_empty());
            let next_blank = lines.get(i + 1).is_none_or(|l| l.trim().is_empty());
            if prev_blank && next_blank {
                flush(&mut current, &mut slides);
                continue;
            }
        }

        if line.starts_with("# ") && has_content(&current) {
            // `@key: value` lines just above a heading belong to the heading's slide.
            let carried = take_trailing_directives(&mut current);
            flush(&mut current, &mut slides);
            current = carried;
        }

        current.push(line);
    }

    flush(&mut current, &mut slides);
    slides
}

fn flush(current: &mut Vec<&str>, slides: &mut Vec<String>) {
    let text = current.join("\n").trim().to_string();
    current.clear();
    if !text.is_empty() {
        slides.push(text);
    }
}

fn has_content(lines: &[&str]) -> bool {
    lines.iter().any(|l| {
        let t = l.trim();
        !t.is_empty() && !is_directive(t)
    })
}

fn take_trailing_directives<'a>(current: &mut Vec<&'a str>) -> Vec<&'a str> {
    let keep = current
        .iter()
        .rposition(|l| {
            let t = l.trim();
            !t.is_empty() && !is_directive(t)
        })
        .map_or(0, |i| i + 1);
    current
        .split_off(keep)
        .into_iter()
        .filter(|l| !l.trim().is_empty())
        .collect()
}

fn opens_fence(trimmed: &str) -> Option<(char, usize)> {
    let ch = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|&c| c == ch).count();
    (len >= 3).then_some((ch, len))
}

fn closes_fence(trimmed: &str, ch: char, len: usize) -> bool {
    let run = trimmed.chars().take_while(|&c| c == ch).count();
    run >= len && trimmed.chars().skip(run).all(char::is_whitespace)
}

fn is_dash_separator(line: &str) -> bool {
    line.len() >= 3 && line.chars().all(|c| c == '-')
}

pub(crate) fn is_directive(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('@') else {
        return false;
    };
    match rest.split_once(':') {
        Some((key, _)) => {
            !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        }
        None => false,
    }
}
