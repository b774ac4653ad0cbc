//! Human-readable diagnostic output.

use std::io::{self, Write};

use crate::{Diagnostic, Severity};

mod colors {
    pub const ERROR: &str = "\x1b[1;31m";
    pub const WARNING: &str = "\x1b[1;33m";
    pub const NOTE: &str = "\x1b[1;36m";
    pub const BOLD: &str = "\x1b[1m";
    pub const RESET: &str = "\x1b[0m";
}

/// Writes diagnostics to `writer`, one per call, with optional ANSI color.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
}

impl<W: Write> TerminalEmitter<W> {
    #[must_use]
    pub fn new(writer: W, colors: bool) -> Self {
        TerminalEmitter { writer, colors }
    }

    pub fn emit(&mut self, diag: &Diagnostic) -> io::Result<()> {
        let (color, reset) = if self.colors {
            (
                match diag.severity {
                    Severity::Error => colors::ERROR,
                    Severity::Warning => colors::WARNING,
                    Severity::Note => colors::NOTE,
                },
                colors::RESET,
            )
        } else {
            ("", "")
        };
        let bold = if self.colors { colors::BOLD } else { "" };

        writeln!(
            self.writer,
            "{color}{}{reset}{bold} [{}]{reset}: {}",
            diag.severity, diag.code, diag.message
        )?;

        for label in &diag.labels {
            let marker = if label.is_primary { "-->" } else { "   " };
            writeln!(self.writer, "  {marker} {:?}: {}", label.span, label.message)?;
        }
        for note in &diag.notes {
            writeln!(self.writer, "  = note: {note}")?;
        }
        Ok(())
    }

    pub fn emit_all(&mut self, diagnostics: &[Diagnostic]) -> io::Result<()> {
        for diag in diagnostics {
            self.emit(diag)?;
        }
        Ok(())
    }
}
