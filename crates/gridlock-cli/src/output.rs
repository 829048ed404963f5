//! Shared output layer for pretty/text/JSON parity across all commands.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format`
//! 2. `GRIDLOCK_FORMAT` env var: `"pretty"` | `"text"` | `"json"`
//! 3. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use serde::Serialize;

use gridlock_core::ErrorCode;
use gridlock_core::error::{CacheError, ConfigError, DocumentError, GraphError};

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<24} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output (sections, aligned columns).
    Pretty,
    /// Plain whitespace-separated rows for scripts and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

fn resolve_output_mode_inner(
    format_flag: Option<OutputMode>,
    format_env: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }

    if let Some(val) = format_env {
        match val.to_lowercase().as_str() {
            "json" => return OutputMode::Json,
            "text" => return OutputMode::Text,
            "pretty" => return OutputMode::Pretty,
            _ => {} // unknown value, fall through to TTY detection
        }
    }

    if is_tty {
        OutputMode::Pretty
    } else {
        OutputMode::Text
    }
}

/// Resolve the output mode from the `--format` flag, environment, and TTY.
pub fn resolve_output_mode(format_flag: Option<OutputMode>) -> OutputMode {
    let env_val = std::env::var("GRIDLOCK_FORMAT").ok();
    resolve_output_mode_inner(format_flag, env_val.as_deref(), io::stdout().is_terminal())
}

/// Render a serializable value with explicit pretty/text renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    out.flush()?;
    Ok(())
}

/// A structured error with optional hint and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    /// Build from an error chain, picking up the first typed error that
    /// carries an [`ErrorCode`].
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let code = err.chain().find_map(|cause| {
            cause
                .downcast_ref::<DocumentError>()
                .map(DocumentError::code)
                .or_else(|| cause.downcast_ref::<GraphError>().map(GraphError::code))
                .or_else(|| cause.downcast_ref::<ConfigError>().map(ConfigError::code))
                .or_else(|| cause.downcast_ref::<CacheError>().map(CacheError::code))
        });
        Self::new(format!("{err:#}"), code)
    }

    fn new(message: String, code: Option<ErrorCode>) -> Self {
        Self {
            message,
            summary: code.map(|c| c.message().to_string()),
            hint: code.and_then(ErrorCode::hint).map(str::to_string),
            error_code: code.map(|c| c.code().to_string()),
        }
    }
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({ "error": error });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match (&error.error_code, &error.summary) {
                (Some(code), Some(summary)) => {
                    writeln!(out, "error[{code}]: {summary}: {}", error.message)?;
                }
                (Some(code), None) => writeln!(out, "error[{code}]: {}", error.message)?,
                _ => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(hint) = &error.hint {
                writeln!(out, "  hint: {hint}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use gridlock_core::graph::VertexId;

    #[test]
    fn format_flag_wins_over_env() {
        let mode = resolve_output_mode_inner(Some(OutputMode::Text), Some("json"), true);
        assert_eq!(mode, OutputMode::Text);
    }

    #[test]
    fn env_is_case_insensitive() {
        assert_eq!(resolve_output_mode_inner(None, Some("JSON"), true), OutputMode::Json);
        assert_eq!(resolve_output_mode_inner(None, Some("Text"), true), OutputMode::Text);
    }

    #[test]
    fn unknown_env_falls_back_to_tty_detection() {
        assert_eq!(resolve_output_mode_inner(None, Some("yaml"), true), OutputMode::Pretty);
        assert_eq!(resolve_output_mode_inner(None, Some("yaml"), false), OutputMode::Text);
        assert_eq!(resolve_output_mode_inner(None, None, false), OutputMode::Text);
    }

    #[test]
    fn error_code_is_found_through_context() {
        let err = Err::<(), _>(GraphError::UnknownVertex(VertexId(4)))
            .context("ranked removal")
            .context("removal level k=3")
            .expect_err("error");
        let cli = CliError::from_anyhow(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2004"));
        assert_eq!(cli.summary.as_deref(), Some("Vertex not found"));
        assert!(cli.message.contains("k=3"));
    }

    #[test]
    fn untyped_errors_have_no_code() {
        let cli = CliError::from_anyhow(&anyhow::anyhow!("plain failure"));
        assert!(cli.error_code.is_none());
        assert!(cli.summary.is_none());
        assert!(cli.hint.is_none());
        assert_eq!(cli.message, "plain failure");
    }

    #[test]
    fn pretty_kv_aligns_values() {
        let mut buf = Vec::new();
        pretty_kv(&mut buf, "vertices", "12").expect("write");
        let line = String::from_utf8(buf).expect("utf8");
        assert!(line.starts_with("vertices:"));
        assert!(line.trim_end().ends_with("12"));
    }
}
