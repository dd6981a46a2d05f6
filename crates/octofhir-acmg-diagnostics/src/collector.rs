//! Per-session diagnostics collector

use crate::{Diagnostic, ErrorCode, Severity};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Accumulates every diagnostic raised during one evaluation session.
///
/// Shared by reference between concurrently evaluated phenotype units; each
/// push is also forwarded to the `log` facade at the matching level.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Mutex<Vec<Diagnostic>>,
    reported: Mutex<HashSet<String>>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => log::error!("{diagnostic}"),
            Severity::Warning => log::warn!("{diagnostic}"),
            Severity::Info | Severity::Hint => log::debug!("{diagnostic}"),
        }
        self.entries.lock().push(diagnostic);
    }

    /// Push unless a diagnostic with the same key was pushed before.
    /// Returns whether the diagnostic was recorded.
    pub fn push_once(&self, key: impl Into<String>, diagnostic: Diagnostic) -> bool {
        if !self.reported.lock().insert(key.into()) {
            return false;
        }
        self.push(diagnostic);
        true
    }

    pub fn extend(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.lock().iter().any(Diagnostic::is_error)
    }

    /// Copy of the entries collected so far
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    pub fn with_code(&self, code: ErrorCode) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.code == code)
            .cloned()
            .collect()
    }

    pub fn for_criterion(&self, criterion: &str) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.criterion.as_deref() == Some(criterion))
            .cloned()
            .collect()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries.into_inner()
    }
}
