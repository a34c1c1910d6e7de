//! Error types with fix suggestions
//!
//! Error code ranges:
//! - VB-000-009: Binding syntax errors
//! - VB-010-019: Resolution errors (nested references, expressions)
//! - VB-020-029: Type errors (non-scalar segments, unwired host callbacks)
//! - VB-030-039: Structural errors (empty nested paths, unusable views)
//! - VB-050-059: Configuration and IO errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewbindError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Broad error taxonomy shared by the resolver and the view builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Resolution,
    Type,
    Structural,
    Config,
    Io,
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum ViewbindError {
    // ═══════════════════════════════════════════
    // SYNTAX ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[VB-001] Cannot normalize path \"{input}\": {details} (at position {position})")]
    Syntax {
        input: String,
        position: usize,
        details: String,
    },

    // ═══════════════════════════════════════════
    // RESOLUTION ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[VB-010] Cannot resolve binding: {path}")]
    Resolution {
        path: String,
        #[source]
        source: Box<ViewbindError>,
    },

    #[error("[VB-011] Unable to resolve path segment: {segment}")]
    SegmentResolution {
        segment: String,
        #[source]
        source: Box<ViewbindError>,
    },

    #[error("[VB-012] Unable to resolve value for node: {node}")]
    UnsupportedNode { node: String },

    // ═══════════════════════════════════════════
    // TYPE ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[VB-020] Attempting to convert {found} to a binding path")]
    NotScalar { found: String },

    #[error("[VB-021] Attempted to convert undefined value to binding path")]
    Undefined,

    #[error("[VB-022] Not Implemented: no '{operation}' callback is wired into the binding parser")]
    NotImplemented { operation: &'static str },

    // ═══════════════════════════════════════════
    // STRUCTURAL ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[VB-030] Nested path resolved to an empty path")]
    EmptyNestedPath,

    #[error("[VB-031] Unable to parse object into a view: {reason}")]
    InvalidView { reason: String },

    // ═══════════════════════════════════════════
    // CONFIG / IO ERRORS (050-059)
    // ═══════════════════════════════════════════
    #[error("[VB-050] Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("[VB-051] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[VB-052] JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("[VB-053] YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ViewbindError {
    /// Get the error code (e.g., "VB-001")
    pub fn code(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "VB-001",
            Self::Resolution { .. } => "VB-010",
            Self::SegmentResolution { .. } => "VB-011",
            Self::UnsupportedNode { .. } => "VB-012",
            Self::NotScalar { .. } => "VB-020",
            Self::Undefined => "VB-021",
            Self::NotImplemented { .. } => "VB-022",
            Self::EmptyNestedPath => "VB-030",
            Self::InvalidView { .. } => "VB-031",
            Self::Config { .. } => "VB-050",
            Self::Io(_) => "VB-051",
            Self::Json(_) => "VB-052",
            Self::Yaml(_) => "VB-053",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::Resolution { .. } | Self::SegmentResolution { .. } | Self::UnsupportedNode { .. } => {
                ErrorKind::Resolution
            }
            Self::NotScalar { .. } | Self::Undefined | Self::NotImplemented { .. } => ErrorKind::Type,
            Self::EmptyNestedPath | Self::InvalidView { .. } => ErrorKind::Structural,
            Self::Config { .. } | Self::Json(_) | Self::Yaml(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Innermost error of a resolution chain
    pub fn root_cause(&self) -> &ViewbindError {
        match self {
            Self::Resolution { source, .. } | Self::SegmentResolution { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    pub(crate) fn wrap_resolution(path: impl Into<String>, source: ViewbindError) -> Self {
        Self::Resolution {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn wrap_segment(segment: impl Into<String>, source: ViewbindError) -> Self {
        Self::SegmentResolution {
            segment: segment.into(),
            source: Box::new(source),
        }
    }
}

impl FixSuggestion for ViewbindError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            Self::Syntax { .. } => {
                Some("Check brackets, quotes and {{nested}} references are balanced")
            }
            Self::Resolution { .. } | Self::SegmentResolution { .. } => {
                Some("Ensure every nested reference resolves to a value in the data model")
            }
            Self::UnsupportedNode { .. } => Some("Queries cannot be concatenated with other segments"),
            Self::NotScalar { .. } => {
                Some("Nested references must resolve to a string, number or boolean")
            }
            Self::Undefined => Some("Provide a value at the referenced path"),
            Self::NotImplemented { .. } => {
                Some("Wire get/set/evaluate callbacks into BindingParserOptions")
            }
            Self::EmptyNestedPath => Some("Nested references must not resolve to an empty string"),
            Self::InvalidView { .. } => Some("A view must be a JSON object that parses to a view node"),
            Self::Config { .. } => Some("Check the config file against the documented keys"),
            Self::Io(_) => Some("Check file path and permissions"),
            Self::Json(_) => Some("Check JSON syntax"),
            Self::Yaml(_) => Some("Check YAML syntax: indentation and quoting"),
        }
    }
}
