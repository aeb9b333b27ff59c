use crate::QName;

pub type Result<T> = std::result::Result<T, Error>;

/// Broad classes of failure, used by callers that need to tell bad input
/// apart from a codec tree that was asked to do something it cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The external representation is malformed.
    Malformed,
    /// The value or tag has no valid mapping onto the codec tree.
    Invalid,
    /// The operation is not supported by this codec at all.
    Unsupported,
    /// The codec tree could not be built.
    Construction,
    /// The underlying sink or source failed.
    Io,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Expected {expected}, found {found}")]
    UnexpectedEvent {
        expected: &'static str,
        found: String,
    },

    #[error("Key <{0}> without value")]
    KeyWithoutValue(QName),

    #[error("Namespace prefix `{0}` is not bound")]
    UnboundPrefix(String),

    #[error("Prefix `{prefix}` is already bound to `{bound}`, cannot rebind it to `{namespace}`")]
    PrefixConflict {
        prefix: String,
        bound: String,
        namespace: String,
    },

    #[error("Empty local name in qualified name `{0}`")]
    EmptyLocalName(String),

    #[error("Invalid {kind} value `{text}`")]
    InvalidLexical { kind: &'static str, text: String },

    #[error("Attribute {name} not found in {type_name}")]
    UnknownAttribute { name: QName, type_name: String },

    #[error("Child <{name}> not found in {type_name}")]
    UnknownChild { name: QName, type_name: String },

    #[error("Payload is not a valid {mime} document")]
    InvalidPayload { mime: String },

    #[error("{0} may not be null")]
    MayNotBeNull(&'static str),

    #[error("Unexpected element <{0}>")]
    UnexpectedElement(QName),

    #[error("Unexpected value of type `{0}`")]
    UnexpectedValue(String),

    #[error("No codec registered for type `{0}`")]
    UnknownType(String),

    #[error("{codec} codec does not support {operation}")]
    Unsupported {
        codec: &'static str,
        operation: &'static str,
    },

    #[error("No concrete implementation for collection type `{0}`")]
    AbstractCollection(String),

    #[error("Unsupported attachment MIME type `{0}`")]
    UnknownMimeType(String),

    #[error("Invalid codec definition: {0}")]
    Definition(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;

        match self {
            Xml(_)
            | UnexpectedEvent { .. }
            | KeyWithoutValue(_)
            | UnboundPrefix(_)
            | EmptyLocalName(_)
            | InvalidLexical { .. }
            | UnknownAttribute { .. }
            | UnknownChild { .. }
            | InvalidPayload { .. } => ErrorKind::Malformed,
            MayNotBeNull(_)
            | UnexpectedElement(_)
            | UnexpectedValue(_)
            | UnknownType(_)
            | PrefixConflict { .. } => ErrorKind::Invalid,
            Unsupported { .. } => ErrorKind::Unsupported,
            AbstractCollection(_) | UnknownMimeType(_) | Definition(_) => ErrorKind::Construction,
            Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid_lexical(kind: &'static str, text: &str) -> Error {
        Error::InvalidLexical {
            kind,
            text: text.to_string(),
        }
    }

    pub(crate) fn prefix_conflict(prefix: &str, bound: &str, namespace: &str) -> Error {
        Error::PrefixConflict {
            prefix: prefix.to_string(),
            bound: bound.to_string(),
            namespace: namespace.to_string(),
        }
    }

    pub(crate) fn xml(err: impl std::fmt::Display) -> Error {
        Error::Xml(err.to_string())
    }
}
