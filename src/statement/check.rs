//! Check diagnostics

use std::fmt;

/// Severity of a check diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational; execution proceeds
    Hint,
    /// Execution is refused
    Fatal,
}

/// Location of a fragment in the statement text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Byte offset into the source
    pub offset: usize,
    pub len: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column, in characters
    pub column: usize,
}

impl Span {
    /// Locate the first case-insensitive occurrence of `fragment` in `source`
    /// that is not part of a longer identifier.
    pub fn locate(source: &str, fragment: &str) -> Option<Span> {
        if fragment.is_empty() {
            return None;
        }
        let haystack = source.to_ascii_lowercase();
        let needle = fragment.to_ascii_lowercase();
        let is_ident = |c: char| c.is_alphanumeric() || c == '_';

        let mut from = 0;
        while let Some(found) = haystack[from..].find(&needle) {
            let offset = from + found;
            let end = offset + needle.len();
            let before_ok = haystack[..offset].chars().next_back().map_or(true, |c| !is_ident(c));
            let after_ok = haystack[end..].chars().next().map_or(true, |c| !is_ident(c));
            if before_ok && after_ok {
                return Some(Self::at(source, offset, needle.len()));
            }
            from = offset + 1;
            while !haystack.is_char_boundary(from) {
                from += 1;
            }
        }
        None
    }

    /// Span of `len` bytes starting at byte `offset`
    pub fn at(source: &str, offset: usize, len: usize) -> Span {
        let prefix = &source[..offset];
        let line = prefix.matches('\n').count() + 1;
        let line_start = prefix.rfind('\n').map_or(0, |i| i + 1);
        let column = source[line_start..offset].chars().count() + 1;
        Span {
            offset,
            len,
            line,
            column,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A problem found while building or checking a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    /// Replacement text for the spanned fragment, when one is known
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            message: message.into(),
            span: None,
            suggestion: None,
        }
    }

    pub fn hint(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Hint,
            message: message.into(),
            span: None,
            suggestion: None,
        }
    }

    pub fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Hint => "hint",
            Severity::Fatal => "error",
        };
        write!(f, "{}", level)?;
        if let Some(span) = &self.span {
            write!(f, " at {}", span)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean {}?)", suggestion)?;
        }
        Ok(())
    }
}

/// Receives diagnostics from `Statement::check`
pub trait Reporter {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Reporter that keeps every diagnostic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_fatal(&self) -> bool {
        self.items.iter().any(Diagnostic::is_fatal)
    }

    pub fn fatal(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_fatal())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Reporter for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.items.iter().map(|d| d.to_string()).collect();
        f.write_str(&lines.join("; "))
    }
}
