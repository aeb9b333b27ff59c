use std::path::PathBuf;

use miette::Diagnostic;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error("Cannot read `{}`", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write `{}`", .path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write to stdout")]
    WriteStdout {
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid binding `{}`", .path.display())]
    #[diagnostic(help("Every referenced type must be a builtin, an enum or a declared type"))]
    Binding {
        path: PathBuf,
        #[source]
        source: xbind_format::Error,
    },

    #[error("No type in the binding is bound to <{element}>")]
    #[diagnostic(help("Pass --root to pick the type of the document element"))]
    UnknownRoot { element: String },

    #[error("Type `{type_name}` has no element name")]
    #[diagnostic(help("Give the type an \"element\" in the binding"))]
    NoRootElement { type_name: String },

    #[error("`{}` has no document element", .path.display())]
    EmptyDocument { path: PathBuf },

    #[error("Cannot decode `{}`", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: xbind_format::Error,
    },

    #[error("Cannot encode value")]
    Encode {
        #[source]
        source: xbind_format::Error,
    },

    #[error("Cannot bind onto `{}`", .path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: xbind_format::Error,
    },

    #[error("Cannot render JSON")]
    Json {
        #[source]
        source: serde_json::Error,
    },
}
