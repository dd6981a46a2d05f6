//! Rule engine error types

use crate::{ErrorCode, Span};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Evaluation of the affected unit could not complete
    Error,
    /// Something was degraded (a condition failed closed, a lookup returned 0)
    Warning,
    Info,
    Hint,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
            Severity::Hint => write!(f, "hint"),
        }
    }
}

/// A diagnostic message tied to a criterion and the record unit being evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    /// Criterion code the problem belongs to (e.g. `PS2`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criterion: Option<String>,
    /// Record unit, rendered as `gene/source:phenotype`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Condition text the span points into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            criterion: None,
            subject: None,
            source: None,
            span: None,
            help: None,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    pub fn info(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Info, code, message)
    }

    pub fn with_criterion(mut self, criterion: impl Into<String>) -> Self {
        self.criterion = Some(criterion.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attach the condition text, optionally pointing at a span inside it
    pub fn with_source(mut self, source: impl Into<String>, span: Option<Span>) -> Self {
        self.source = Some(source.into());
        self.span = span;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Multi-line rendering with the source snippet, used by the CLI
    pub fn render(&self) -> String {
        let mut out = self.header();
        if let Some(subject) = &self.subject {
            out.push_str(&format!("\n  --> {subject}"));
        }
        if let Some(source) = &self.source {
            let snippet = match self.span {
                Some(span) => span.snippet(source),
                None => source.clone(),
            };
            for line in snippet.lines() {
                out.push_str("\n   | ");
                out.push_str(line);
            }
        }
        if let Some(help) = self.help.as_deref().or(self.code.info().help) {
            out.push_str(&format!("\n   = help: {help}"));
        }
        out
    }

    #[cfg(feature = "colored")]
    pub fn render_colored(&self) -> String {
        use colored::Colorize;

        let rendered = self.render();
        let (head, tail) = rendered.split_once('\n').unwrap_or((rendered.as_str(), ""));
        let head = match self.severity {
            Severity::Error => head.red().bold(),
            Severity::Warning => head.yellow().bold(),
            Severity::Info | Severity::Hint => head.cyan(),
        };
        if tail.is_empty() {
            head.to_string()
        } else {
            format!("{head}\n{}", tail.dimmed())
        }
    }

    fn header(&self) -> String {
        match &self.criterion {
            Some(criterion) => format!("{}[{}]: {}: {}", self.severity, self.code, criterion, self.message),
            None => format!("{}[{}]: {}", self.severity, self.code, self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())?;
        if let Some(subject) = &self.subject {
            write!(f, " ({subject})")?;
        }
        Ok(())
    }
}

/// Main rule engine error type
#[derive(Debug, Clone, Error)]
pub enum AcmgError {
    /// Condition text could not be parsed
    #[error("{code}: {message}")]
    Parse {
        code: ErrorCode,
        message: String,
        expression: String,
        span: Option<Span>,
    },

    /// Rule set is structurally invalid (unknown level key, reference cycle)
    #[error("{code}: {message}")]
    Definition {
        code: ErrorCode,
        message: String,
        criterion: Option<String>,
    },

    /// Configuration document is invalid
    #[error("{code}: {message}")]
    Config { code: ErrorCode, message: String },

    /// Expression evaluation failed
    #[error("{code}: {message}")]
    Evaluation {
        code: ErrorCode,
        message: String,
        criterion: Option<String>,
    },

    /// History store failed or rejected a query
    #[error("{code}: {message}")]
    History { code: ErrorCode, message: String },

    /// Variant record failed required-field validation
    #[error("{code}: {message}")]
    Record {
        code: ErrorCode,
        message: String,
        record_id: Option<String>,
    },

    /// I/O, cancellation and internal errors
    #[error("{code}: {message}")]
    System { code: ErrorCode, message: String },

    /// Multiple errors collected
    #[error("Multiple errors: {}", .0.len())]
    Multiple(Vec<AcmgError>),
}

impl AcmgError {
    pub fn parse(code: ErrorCode, message: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            expression: expression.into(),
            span: None,
        }
    }

    pub fn parse_at(
        code: ErrorCode,
        message: impl Into<String>,
        expression: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::Parse {
            code,
            message: message.into(),
            expression: expression.into(),
            span: Some(span),
        }
    }

    pub fn definition(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Definition {
            code,
            message: message.into(),
            criterion: None,
        }
    }

    pub fn definition_in(code: ErrorCode, criterion: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Definition {
            code,
            message: message.into(),
            criterion: Some(criterion.into()),
        }
    }

    pub fn config(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
        }
    }

    pub fn evaluation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Evaluation {
            code,
            message: message.into(),
            criterion: None,
        }
    }

    pub fn history(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::History {
            code,
            message: message.into(),
        }
    }

    pub fn record(code: ErrorCode, record_id: Option<String>, message: impl Into<String>) -> Self {
        Self::Record {
            code,
            message: message.into(),
            record_id,
        }
    }

    pub fn system(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::System {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Parse { code, .. }
            | Self::Definition { code, .. }
            | Self::Config { code, .. }
            | Self::Evaluation { code, .. }
            | Self::History { code, .. }
            | Self::Record { code, .. }
            | Self::System { code, .. } => *code,
            Self::Multiple(errors) => errors.first().map(|e| e.code()).unwrap_or(ErrorCode::new(0)),
        }
    }

    /// Convert to error diagnostics; `Multiple` flattens into one entry per error
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Parse {
                code,
                message,
                expression,
                span,
            } => vec![Diagnostic::error(*code, message.clone()).with_source(expression.clone(), *span)],
            Self::Definition {
                code,
                message,
                criterion,
            }
            | Self::Evaluation {
                code,
                message,
                criterion,
            } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(criterion) = criterion {
                    diag = diag.with_criterion(criterion.clone());
                }
                vec![diag]
            }
            Self::Record {
                code,
                message,
                record_id,
            } => {
                let mut diag = Diagnostic::error(*code, message.clone());
                if let Some(id) = record_id {
                    diag = diag.with_subject(id.clone());
                }
                vec![diag]
            }
            Self::Config { code, message }
            | Self::History { code, message }
            | Self::System { code, message } => vec![Diagnostic::error(*code, message.clone())],
            Self::Multiple(errors) => errors.iter().flat_map(|e| e.to_diagnostics()).collect(),
        }
    }

    /// Collapse a list of errors: one stays as-is, several become `Multiple`
    pub fn from_many(mut errors: Vec<AcmgError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }
}

impl From<std::io::Error> for AcmgError {
    fn from(err: std::io::Error) -> Self {
        Self::system(crate::ACMG0401, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ACMG0003, ACMG0102, ACMG0201};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::warning(ACMG0201, "unknown variable `foo`")
            .with_criterion("PM2")
            .with_subject("BRCA1/omim:Breast cancer");

        assert_eq!(
            diag.to_string(),
            "warning[ACMG0201]: PM2: unknown variable `foo` (BRCA1/omim:Breast cancer)"
        );
    }

    #[test]
    fn test_render_includes_snippet() {
        let diag = Diagnostic::warning(ACMG0003, "unterminated string")
            .with_source("'abc", Some(Span::new(0, 4)));
        let rendered = diag.render();

        assert!(rendered.starts_with("warning[ACMG0003]: unterminated string"));
        assert!(rendered.contains("   | 'abc\n   | ^^^^"));
    }

    #[test]
    fn test_multiple_flattens_to_diagnostics() {
        let err = AcmgError::from_many(vec![
            AcmgError::definition_in(ACMG0102, "PM4", "cycle PM4 -> PVS1 -> PM4"),
            AcmgError::parse(ACMG0003, "unterminated string", "'x"),
        ])
        .unwrap();

        assert_eq!(err.code(), ACMG0102);
        let diags = err.to_diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].criterion.as_deref(), Some("PM4"));
        assert!(diags.iter().all(Diagnostic::is_error));
    }

    #[test]
    fn test_from_many_single_is_unwrapped() {
        let err = AcmgError::from_many(vec![AcmgError::config(crate::ACMG0104, "bad")]).unwrap();
        assert!(matches!(err, AcmgError::Config { .. }));
        assert!(AcmgError::from_many(Vec::new()).is_none());
    }
}
