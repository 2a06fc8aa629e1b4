//! Binding error types and path-aware error formatting.
//!
//! All binding failures share one taxonomy, [`BindError`]. Every
//! path-scoped variant carries an [`ErrorPath`], which renders the dotted
//! configuration path of the failing operation, wrapping it in one bracket
//! pair per list descent (`list2[l[b]]`).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The formatted configuration path attached to a binding error.
///
/// A path is the dotted concatenation of contract entry names from the root
/// to the erroring operation. Values reached by descending into list
/// elements record the list's own path as a parent segment; each such
/// segment wraps the leaf path in brackets, innermost first.
///
/// An empty path renders as nothing at all; a non-empty path is followed by
/// `": "` so it can prefix a message directly.
///
/// # Example
///
/// ```
/// use konfig::ErrorPath;
///
/// let path = ErrorPath::new(&["list2".to_string(), "l".to_string()], "b");
/// assert_eq!(path.as_str(), "list2[l[b]]");
/// assert_eq!(format!("{path}value is null"), "list2[l[b]]: value is null");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPath(String);

impl ErrorPath {
    /// Fold the parent segments (oldest first) around the leaf path.
    #[must_use]
    pub fn new(parents: &[String], leaf: &str) -> Self {
        let folded = parents
            .iter()
            .rev()
            .fold(leaf.to_string(), |acc, parent| format!("{parent}[{acc}]"));
        Self(folded)
    }

    /// A path with no parent segments.
    #[must_use]
    pub fn root(leaf: &str) -> Self {
        Self::new(&[], leaf)
    }

    /// The folded path without the trailing separator.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the path is empty (root-level contract errors).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ErrorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            Ok(())
        } else {
            write!(f, "{}: ", self.0)
        }
    }
}

/// Why a required value was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingReason {
    /// The path does not resolve at all.
    Undefined,
    /// The path resolves to an explicit null.
    Null,
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// The offending constraint of a rejected type-descriptor argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeParamKind {
    /// The descriptor denotes an array type.
    Array,
    /// The descriptor denotes a concrete sequence type.
    Sequence,
    /// The descriptor denotes a map-like type.
    Mapping,
}

impl fmt::Display for TypeParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array => f.write_str("an array"),
            Self::Sequence => f.write_str("a sequence"),
            Self::Mapping => f.write_str("a mapping"),
        }
    }
}

/// Errors raised while loading configuration or binding values.
///
/// One taxonomy covers contract-shape rejection at load time, overlay parse
/// failures, missing required values, type-conversion mismatches, and
/// invalid type-descriptor arguments. None are retried; every failure
/// propagates to the caller of the failing operation. A type mismatch is
/// always reported, never silently replaced with a default.
#[derive(Error, Debug)]
pub enum BindError {
    /// The contract declares a shape the engine cannot implement.
    #[error("{path}{message}")]
    Contract {
        /// Dotted path of the offending operation, empty at the root.
        path: ErrorPath,
        /// What makes the shape unacceptable.
        message: String,
    },

    /// A per-call overlay value could not be parsed.
    #[error("{path}Syntax error")]
    Syntax {
        /// Dotted path of the operation whose overlay value failed.
        path: ErrorPath,
    },

    /// A primitive-typed operation has no backing value.
    #[error("{path}value is {reason}, but must be of type {ty}")]
    Missing {
        /// Dotted path of the operation.
        path: ErrorPath,
        /// Whether the path was undefined or explicitly null.
        reason: MissingReason,
        /// Name of the required type.
        ty: &'static str,
    },

    /// A configuration node's kind or numeric range is incompatible with
    /// the requested type.
    #[error("{path}cannot convert {src} to {dst}")]
    Conversion {
        /// Dotted path of the value.
        path: ErrorPath,
        /// The node's actual kind (numbers report their runtime subtype).
        src: &'static str,
        /// The requested type.
        dst: String,
    },

    /// A type-descriptor argument denotes a disallowed type.
    #[error("{path}type parameter cannot be {kind}")]
    TypeParameter {
        /// Dotted path of the operation.
        path: ErrorPath,
        /// The offending constraint.
        kind: TypeParamKind,
    },

    /// The invoked name is not part of the contract's dispatch table.
    #[error("{path}unknown operation")]
    UnknownOperation {
        /// Dotted path of the attempted operation.
        path: ErrorPath,
    },

    /// A default or override configuration fragment failed to parse.
    /// Fatal for the whole `load` call; there is no partial recovery.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] konfig_value::ParseError),

    /// A configuration source could not be read.
    #[error("failed to read configuration source: {}", path.display())]
    Io {
        /// Path of the unreadable source.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An invariant the validator is supposed to uphold was violated.
    #[error("{path}internal error: {detail}")]
    Internal {
        /// Dotted path of the value.
        path: ErrorPath,
        /// Description of the broken invariant.
        detail: String,
    },
}

impl BindError {
    /// Create a contract-shape error.
    pub fn contract(path: ErrorPath, message: impl Into<String>) -> Self {
        Self::Contract {
            path,
            message: message.into(),
        }
    }

    /// Create an overlay parse error.
    pub fn syntax(path: ErrorPath) -> Self {
        Self::Syntax { path }
    }

    /// Create a missing-value error.
    pub fn missing(path: ErrorPath, reason: MissingReason, ty: &'static str) -> Self {
        Self::Missing { path, reason, ty }
    }

    /// Create a conversion error.
    pub fn conversion(path: ErrorPath, src: &'static str, dst: impl Into<String>) -> Self {
        Self::Conversion {
            path,
            src,
            dst: dst.into(),
        }
    }

    /// Create a type-parameter error.
    pub fn type_parameter(path: ErrorPath, kind: TypeParamKind) -> Self {
        Self::TypeParameter { path, kind }
    }

    /// Create an unknown-operation error.
    pub fn unknown_operation(path: ErrorPath) -> Self {
        Self::UnknownOperation { path }
    }

    /// Create a source read error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an internal-invariant error.
    pub fn internal(path: ErrorPath, detail: impl Into<String>) -> Self {
        Self::Internal {
            path,
            detail: detail.into(),
        }
    }
}
