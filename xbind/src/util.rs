use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use xbind_format::stream;
use xbind_format::{Binding, Codec, Document, EventReader, NodeId, QName, Registry};

use crate::cli::BindingArgs;
use crate::error::{Error, Result};

/// A binding description with the registry built from it.
pub struct Loaded {
    pub binding: Binding,
    pub registry: Registry,
    root: Option<String>,
    path: std::path::PathBuf,
}

impl Loaded {
    pub fn open(args: &BindingArgs) -> Result<Loaded> {
        let binding_err = |source| Error::Binding {
            path: args.path.clone(),
            source,
        };
        let binding = Binding::from_path(&args.path).map_err(binding_err)?;
        let registry = binding.build().map_err(binding_err)?;
        tracing::debug!(path = %args.path.display(), "loaded binding");

        Ok(Loaded {
            binding,
            registry,
            root: args.root.clone(),
            path: args.path.clone(),
        })
    }

    /// The type of the document in `xml`, from `--root` or from the name of
    /// its document element.
    pub fn root_type(&self, xml: &str, path: &Path) -> Result<String> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }

        let element = document_element(xml).map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        self.registry
            .element_type(&element)
            .map(str::to_string)
            .ok_or_else(|| Error::UnknownRoot {
                element: element.to_string(),
            })
    }

    pub fn root_codec(&self, type_name: &str) -> Result<Codec> {
        self.binding
            .root_codec(Some(type_name))
            .map_err(|source| Error::Binding {
                path: self.path.clone(),
                source,
            })
    }

    pub fn root_element(&self, type_name: &str) -> Result<QName> {
        self.binding
            .root_element(type_name)
            .ok_or_else(|| Error::NoRootElement {
                type_name: type_name.to_string(),
            })
    }
}

fn document_element(xml: &str) -> xbind_format::Result<QName> {
    let mut reader = EventReader::from_str(xml)?;
    stream::skip_to_start(&mut reader)?;
    Ok(stream::expect_start(&reader)?.clone())
}

pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `text` to `path`, or to stdout when there is none.
pub fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, text).map_err(|source| Error::WriteFile {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", text).map_err(|source| Error::WriteStdout { source })
        }
    }
}

/// Every element reachable from `node`, including itself.
pub fn elements(doc: &Document, node: NodeId) -> HashSet<NodeId> {
    let mut out = HashSet::new();
    let mut stack = vec![node];
    while let Some(id) = stack.pop() {
        out.insert(id);
        stack.extend(doc.child_elements(id));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const BINDING: &str = r#"{
        "namespace": "urn:t",
        "types": { "Note": { "element": "note", "text": { "field": "body", "type": "string" } } }
    }"#;

    fn loaded(root: Option<&str>) -> (tempfile::TempDir, Loaded) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binding.json");
        std::fs::write(&path, BINDING).unwrap();
        let args = BindingArgs {
            path,
            root: root.map(str::to_string),
        };
        let loaded = Loaded::open(&args).unwrap();
        (dir, loaded)
    }

    #[test]
    fn test_root_type_from_element() {
        let (_dir, loaded) = loaded(None);
        let xml = r#"<?xml version="1.0"?><note xmlns="urn:t">hi</note>"#;
        assert_eq!(loaded.root_type(xml, Path::new("n.xml")).unwrap(), "Note");

        let err = loaded
            .root_type("<other/>", Path::new("o.xml"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownRoot { element } if element == "other"));
    }

    #[test]
    fn test_root_type_override() {
        let (_dir, loaded) = loaded(Some("Note"));
        assert_eq!(loaded.root_type("<other/>", Path::new("o.xml")).unwrap(), "Note");
        assert_eq!(
            loaded.root_element("Note").unwrap(),
            QName::new("urn:t", "note")
        );
    }

    #[test]
    fn test_invalid_binding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binding.json");
        std::fs::write(&path, r#"{ "types": { "A": { "elements": [{ "field": "b" }] } } }"#)
            .unwrap();
        let args = BindingArgs { path, root: None };
        assert!(matches!(Loaded::open(&args), Err(Error::Binding { .. })));
    }

    #[test]
    fn test_elements() {
        let doc = Document::parse("<a><b><c/></b>text<d/></a>").unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(elements(&doc, root).len(), 4);
    }
}
