use anyhow::Result;
use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::Config;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(),
        ConfigCommands::Set { key, value } => set(&key, &value),
    }
}

fn show() -> Result<()> {
    let path = Config::path()?;
    let config = if path.exists() {
        Config::load_from(&path)?
    } else {
        Config::default()
    };

    println!("{} {}", "Config file:".bold(), path.display());
    if !path.exists() {
        println!("{}", "(not created yet, showing defaults)".dimmed());
    }
    println!();
    let aspect = config.aspect_ratio().unwrap_or_default();
    let [width, height] = config.presenter_size();
    let rows = [
        ("defaults.aspect", aspect.to_string()),
        ("defaults.border", config.show_border().to_string()),
        ("defaults.windowed", config.windowed().to_string()),
        ("presenter.channel", config.channel()),
        ("presenter.width", width.to_string()),
        ("presenter.height", height.to_string()),
    ];
    for (key, value) in rows {
        println!("  {:<20} {}", key.cyan(), value);
    }
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load_or_default();
    config.set(key, value)?;
    let path = config.save()?;
    println!(
        "{} {} = {} ({})",
        "Saved".green().bold(),
        key,
        value,
        path.display()
    );
    Ok(())
}
