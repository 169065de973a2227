//! Minimal colorized console output, used by `check-config`.

use std::fmt::Display;

use owo_colors::OwoColorize;

pub fn section(title: &str) {
    println!();
    println!("{}", title.bold());
}

pub fn field(label: &str, value: impl Display) {
    println!("  {:<24} {}", label.dimmed(), value);
}

pub fn success(message: &str) {
    println!("  {} {}", "✓".green(), message);
}

pub fn warning(message: &str) {
    println!("  {} {}", "⚠".yellow(), message);
}
