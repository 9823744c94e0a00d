//! Output formatting for the deploy pipeline.
//!
//! Progress and diagnostics go to stderr; only the scriptable result (the slug
//! ID, or slug info) goes to stdout.

use std::fmt::Display;
use std::io::{self, Write};

use colored::Colorize;

use crate::deploy::Outcome;

/// Destination for progress messages and results.
pub struct Console {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Console {
    pub fn new(out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self { out, err }
    }

    /// Console bound to the process stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Print a `Label: value` progress line.
    pub fn field(&mut self, label: &str, value: impl Display) {
        let _ = writeln!(self.err, "{} {}", format!("{label}:").bold(), value);
    }

    /// Print an info message.
    pub fn info(&mut self, message: &str) {
        let _ = writeln!(self.err, "{} {}", "Info:".blue().bold(), message);
    }

    /// Print diagnostic text verbatim to stderr.
    pub fn diagnostic(&mut self, text: &str) {
        let _ = write!(self.err, "{text}");
        let _ = self.err.flush();
    }

    /// Print a line of result output.
    pub fn print(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{line}")
    }

    /// Print a JSON value as pretty-printed text. Object keys come out sorted.
    pub fn print_json(&mut self, value: &serde_json::Value) -> io::Result<()> {
        let text = serde_json::to_string_pretty(value)?;
        self.print(&text)
    }

    /// Print the final result of a deploy.
    pub fn report(&mut self, outcome: &Outcome) -> io::Result<()> {
        if let Outcome::Deployed { slug_id, .. } = outcome {
            self.print("Slug ID:")?;
            self.print(slug_id)?;
        }
        self.out.flush()
    }
}

/// Human-readable size in SI units (e.g. `12 MB`).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];

    if bytes < 10 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    let rounded = (value * 10.0 + 0.5).floor() / 10.0;
    if rounded < 10.0 {
        format!("{rounded:.1} {}", UNITS[unit])
    } else {
        format!("{rounded:.0} {}", UNITS[unit])
    }
}


#[cfg(test)]
mod tests {
    use super::testing::captured_console;
    use super::*;

    #[test]
    fn format_bytes_matches_si_rounding() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(9), "9 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1_500), "1.5 kB");
        assert_eq!(format_bytes(12 * 1024 * 1024), "13 MB");
        assert_eq!(format_bytes(12_000_000), "12 MB");
        assert_eq!(format_bytes(3_200_000_000), "3.2 GB");
    }

    #[test]
    fn report_prints_slug_id_last() {
        let (mut console, out, err) = captured_console();
        console.field("Deployed version", 7);
        console
            .report(&Outcome::Deployed {
                slug_id: "abc123".to_string(),
                version: Some(7),
            })
            .unwrap();

        assert_eq!(out.text(), "Slug ID:\nabc123\n");
        assert_eq!(err.text(), "Deployed version: 7\n");
    }

    #[test]
    fn report_is_silent_after_inspect() {
        let (mut console, out, _err) = captured_console();
        console.report(&Outcome::Inspected).unwrap();
        assert!(out.text().is_empty());
    }

    #[test]
    fn print_json_sorts_keys() {
        let (mut console, out, _err) = captured_console();
        let info = serde_json::json!({ "id": "abc", "blob": { "url": "u", "method": "put" } });
        console.print_json(&info).unwrap();
        let text = out.text();
        assert!(text.find("\"blob\"").unwrap() < text.find("\"id\"").unwrap());
        assert!(text.find("\"method\"").unwrap() < text.find("\"url\"").unwrap());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn report_surfaces_stdout_write_failure() {
        let mut console = Console::new(Box::new(ClosedPipe), Box::new(io::sink()));
        let err = console
            .report(&Outcome::Deployed {
                slug_id: "abc123".to_string(),
                version: None,
            })
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
