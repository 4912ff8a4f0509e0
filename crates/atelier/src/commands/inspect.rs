use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::deck::{self, SlideRecord};
use crate::parser;

pub fn run(file: &Path) -> Result<()> {
    let source = parser::load(file)?;
    let deck = deck::extract(&source.root);

    let title = source.meta.title.as_deref().unwrap_or("untitled");
    println!("{} {}", title.bold(), format!("({} slides)", deck.len()).dimmed());
    if let Some(aspect) = source.meta.aspect_ratio() {
        println!("{} {aspect}", "aspect:".dimmed());
    }
    for (index, slide) in deck.iter().enumerate() {
        println!("{}", summary_line(index, slide));
    }
    if deck.is_empty() {
        println!("{}", "No slides found.".yellow());
    }
    Ok(())
}

fn summary_line(index: usize, slide: &SlideRecord) -> String {
    let heading = match slide.heading() {
        "" => "(empty)",
        heading => heading,
    };
    let notes = if slide.notes.is_some() { "notes" } else { "     " };
    format!(
        "{:>3}  steps {:<2} {}  {}",
        index + 1,
        slide.step_count,
        notes,
        heading
    )
}
