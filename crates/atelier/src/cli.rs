use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::app::LaunchOptions;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(author, version, about)]
#[command(long_about = "A markdown slide viewer with a synchronized presenter console.\n\n\
    Examples:\n  \
    atelier talk.md                Present fullscreen\n  \
    atelier talk.md --windowed     Present in a window\n  \
    atelier talk.md --presenter    Open the presenter console at start-up\n  \
    atelier inspect talk.md        List the slides the deck resolves to")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Markdown deck to present
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Launch in a window instead of fullscreen
    #[arg(long, global = false)]
    pub windowed: bool,

    /// Start on a specific slide (1-indexed)
    #[arg(long, global = false)]
    pub slide: Option<usize>,

    /// Open the presenter console in its own window
    #[arg(long, global = false)]
    pub presenter: bool,

    /// Channel name shared with the presenter console
    #[arg(long, global = false)]
    pub channel: Option<String>,

    /// Increase output verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the slides a deck resolves to
    Inspect {
        /// Markdown deck to inspect
        file: PathBuf,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. defaults.aspect, presenter.channel)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    /// Log filter for the verbosity flags; `RUST_LOG` takes precedence.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Commands::Inspect { file }) => {
                if !file.exists() {
                    anyhow::bail!("File not found: {}", file.display());
                }
                crate::commands::inspect::run(&file)
            }
            Some(Commands::Config { command }) => crate::commands::config::run(command),
            Some(Commands::Completion { shell }) => {
                crate::commands::completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                crate::commands::print_version();
                Ok(())
            }
            None => {
                if let Some(file) = self.file {
                    if !file.exists() {
                        anyhow::bail!("File not found: {}", file.display());
                    }
                    crate::app::run(
                        file,
                        LaunchOptions {
                            windowed: self.windowed,
                            start_slide: self.slide,
                            open_presenter: self.presenter,
                            channel: self.channel,
                        },
                    )
                } else {
                    use clap::CommandFactory;
                    let mut cmd = Self::command();
                    cmd.print_help()?;
                    println!();
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_present_flags() {
        let cli = Cli::try_parse_from([
            "atelier",
            "talk.md",
            "--windowed",
            "--slide",
            "3",
            "--presenter",
            "--channel",
            "room-1",
        ])
        .unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("talk.md")));
        assert!(cli.windowed);
        assert_eq!(cli.slide, Some(3));
        assert!(cli.presenter);
        assert_eq!(cli.channel.as_deref(), Some("room-1"));
    }

    #[test]
    fn test_log_level() {
        let level = |args: &[&str]| Cli::try_parse_from(args).unwrap().log_level();
        assert_eq!(level(&["atelier"]), "warn");
        assert_eq!(level(&["atelier", "-v"]), "info");
        assert_eq!(level(&["atelier", "-vv"]), "debug");
        assert_eq!(level(&["atelier", "-vvvv"]), "trace");
        assert_eq!(level(&["atelier", "-q", "-v"]), "error");
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from(["atelier", "config", "set", "defaults.border", "false"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                command: ConfigCommands::Set { .. }
            })
        ));
        let cli = Cli::try_parse_from(["atelier", "inspect", "talk.md"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Inspect { .. })));
    }
}
