pub mod completion;
pub mod config;
pub mod inspect;

use colored::Colorize;

pub fn print_version() {
    println!(
        "{} {}",
        env!("CARGO_PKG_NAME").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", env!("CARGO_PKG_DESCRIPTION").dimmed());
}
