//! One-line console status helpers, sharing the palette in `utils::colors`.

use crate::utils::colors::{CYAN, GREEN, RED, RESET, YELLOW};
use std::fmt;

fn status_line<T: fmt::Display>(color: &str, tag: &str, msg: T) -> String {
    format!("{color}{tag}{RESET} {msg}")
}

pub fn info<T: fmt::Display>(msg: T) {
    println!("{}", status_line(CYAN, "»", msg));
}

pub fn success<T: fmt::Display>(msg: T) {
    println!("{}", status_line(GREEN, "✓", msg));
}

pub fn warning<T: fmt::Display>(msg: T) {
    println!("{}", status_line(YELLOW, "warning:", msg));
}

/// Errors go to stderr; everything else prints to stdout.
pub fn error<T: fmt::Display>(msg: T) {
    eprintln!("{}", status_line(RED, "error:", msg));
}
