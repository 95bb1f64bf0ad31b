//! Non-fatal diagnostics raised during translation.
//!
//! Fatal conditions (missing shader annotation, untyped device function)
//! are returned as `anyhow::Error` from the call that detects them.
//! Everything else degrades: the offending construct is skipped or
//! replaced with a safe default and a `Diagnostic` is pushed to whatever
//! sink the caller supplied.

use std::fmt;

/// One non-fatal finding from a single translation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A kernel call site's type argument was not a tuple of numeric
    /// literals; the call site was left unchanged.
    MalformedWorkgroupCount { function: String },
    /// A surface type annotation matched no mapping rule; `f32` was
    /// substituted.
    UnknownType { surface_type: String },
    /// An AST node inside a shader body has no translation; a comment
    /// placeholder was emitted in its place.
    UnknownNode { kind: String, function: String },
    /// A struct declaration had zero fields and was not emitted.
    EmptyStruct { name: String },
    /// A type alias did not resolve to an object literal and was not
    /// emitted as a struct.
    NonLiteralTypeAlias { name: String },
    /// A struct reference closure contains a cycle; the cycle-closing
    /// struct was not re-emitted.
    CyclicStructReference { name: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedWorkgroupCount { function } => write!(
                f,
                "malformed workgroup-count type argument at call to `{function}`; call site left unchanged"
            ),
            Diagnostic::UnknownType { surface_type } => write!(
                f,
                "unrecognized type `{surface_type}`; mapped to f32"
            ),
            Diagnostic::UnknownNode { kind, function } => write!(
                f,
                "unsupported node `{kind}` in body of `{function}`; emitted as comment"
            ),
            Diagnostic::EmptyStruct { name } => {
                write!(f, "struct `{name}` has no fields; not emitted")
            }
            Diagnostic::NonLiteralTypeAlias { name } => write!(
                f,
                "type alias `{name}` is not an object literal; not emitted as a struct"
            ),
            Diagnostic::CyclicStructReference { name } => write!(
                f,
                "struct `{name}` participates in a cyclic reference; cycle broken"
            ),
        }
    }
}

/// Receives diagnostics as translation proceeds.
///
/// A simple write-line sink suffices; this crate never requires anything
/// richer than "append one message."
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Writes each diagnostic to stderr as it arrives.
#[derive(Debug, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        eprintln!("warning: {diagnostic}");
    }
}

/// Collects diagnostics in order, for callers that want to inspect them
/// instead of printing them (library use, tests).
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
