//! Non-fatal conditions met while converting.
//!
//! Skipped primitives and dropped attributes never abort a conversion, but
//! they are never silent either: each one becomes a [`Diagnostic`] carried
//! in the return value and is also logged at `warn` level.

use std::fmt;

/// What kind of non-fatal condition occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// An encoding, topology or extension the reader cannot decode.
    UnsupportedFeature,
    /// A mesh was dropped because it has nothing drawable.
    SkippedMesh,
    /// An optional attribute (normals, colors) was dropped; the mesh was kept.
    SkippedAttribute,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::UnsupportedFeature => "unsupported feature",
            DiagnosticKind::SkippedMesh => "skipped mesh",
            DiagnosticKind::SkippedAttribute => "skipped attribute",
        };
        f.write_str(name)
    }
}

/// A single non-fatal condition.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,

    /// What the condition applies to, e.g. `mesh 0 primitive 1`
    pub subject: String,

    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic and log it.
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        let diagnostic = Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        };
        log::warn!("{} ({})", diagnostic, diagnostic.kind);
        diagnostic
    }

    pub fn unsupported(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::UnsupportedFeature, subject, message)
    }

    pub fn skipped_mesh(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::SkippedMesh, subject, message)
    }

    pub fn skipped_attribute(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::SkippedAttribute, subject, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}
