//! Qualified names as character data, e.g. `xsi:type="n:Order"`.

use crate::stream::{XmlReader, XmlWriter};
use crate::{Error, QName, Result};

/// Resolves prefixes while decoding.
pub trait NamespaceContext {
    /// The namespace bound to `prefix`. The empty prefix resolves the default
    /// namespace.
    fn namespace_uri(&self, prefix: &str) -> Option<String>;
}

/// Looks up and declares prefixes while encoding.
pub trait PrefixScope {
    /// Prefix bound to `namespace` in scope, `Some("")` for the default
    /// namespace.
    fn bound_prefix(&self, namespace: &str) -> Option<String>;

    /// Namespace `prefix` resolves to in scope.
    fn bound_namespace(&self, prefix: &str) -> Option<String>;

    /// Prefix used by the tag of the element whose content is being written.
    fn enclosing_prefix(&self) -> Option<String>;

    /// Bind `prefix` to `namespace` on the element being written.
    fn declare(&mut self, prefix: &str, namespace: &str) -> Result<()>;
}

pub(crate) struct ReaderScope<'a>(pub &'a dyn XmlReader);

impl NamespaceContext for ReaderScope<'_> {
    fn namespace_uri(&self, prefix: &str) -> Option<String> {
        self.0.namespace_uri(prefix).map(str::to_string)
    }
}

pub(crate) struct WriterScope<'a>(pub &'a mut dyn XmlWriter);

impl PrefixScope for WriterScope<'_> {
    fn bound_prefix(&self, namespace: &str) -> Option<String> {
        self.0.prefix_for(namespace)
    }

    fn bound_namespace(&self, prefix: &str) -> Option<String> {
        self.0.namespace_for(prefix)
    }

    fn enclosing_prefix(&self) -> Option<String> {
        self.0
            .current_element()
            .and_then(QName::prefix)
            .map(str::to_string)
    }

    fn declare(&mut self, prefix: &str, namespace: &str) -> Result<()> {
        self.0.write_namespace(prefix, namespace)
    }
}

/// Render `name` as character data, declaring a prefix if none is in scope.
///
/// An explicit prefix on `name` is honored unless it is bound to another
/// namespace. Otherwise the prefix already bound to the namespace is reused,
/// or the first free one of `n`, `d`, `n1`, `n2`, ... is declared. `n` is
/// skipped when the enclosing tag itself uses it.
pub fn qname_to_text(name: &QName, scope: &mut dyn PrefixScope) -> Result<String> {
    let namespace = name.namespace();
    if namespace.is_empty() {
        return Ok(name.local_part().to_string());
    }

    let bound = scope.bound_prefix(namespace);
    let explicit = name.prefix().filter(|p| {
        scope
            .bound_namespace(p)
            .is_none_or(|uri| uri == namespace)
    });

    let prefix = match (bound, explicit) {
        (Some(bound), None) => bound,
        (Some(bound), Some(explicit)) if bound == explicit => bound,
        (_, Some(explicit)) => {
            scope.declare(explicit, namespace)?;
            explicit.to_string()
        }
        (None, None) => {
            let prefix = filler_prefix(scope);
            scope.declare(&prefix, namespace)?;
            prefix
        }
    };

    if prefix.is_empty() {
        Ok(name.local_part().to_string())
    } else {
        Ok(format!("{}:{}", prefix, name.local_part()))
    }
}

fn filler_prefix(scope: &dyn PrefixScope) -> String {
    let skip_n = scope.enclosing_prefix().as_deref() == Some("n");
    ["n", "d"]
        .into_iter()
        .map(str::to_string)
        .chain((1..).map(|i| format!("n{}", i)))
        .filter(|p| !(skip_n && p == "n"))
        .find(|p| scope.bound_namespace(p).is_none())
        .unwrap_or_else(|| "n".to_string())
}

/// Parse `prefix:local` character data. Surrounding whitespace is ignored and
/// an unprefixed name takes the default namespace.
pub fn text_to_qname(text: &str, ns: &dyn NamespaceContext) -> Result<QName> {
    let text = text.trim();
    if text.starts_with(':') {
        return Err(Error::UnboundPrefix(String::new()));
    }

    let (prefix, local) = QName::split_raw(text);
    if local.is_empty() {
        return Err(Error::EmptyLocalName(text.to_string()));
    }

    if prefix.is_empty() {
        let namespace = ns.namespace_uri("").unwrap_or_default();
        return Ok(QName::new(namespace, local));
    }

    let namespace = ns
        .namespace_uri(prefix)
        .ok_or_else(|| Error::UnboundPrefix(prefix.to_string()))?;
    Ok(QName::with_prefix(namespace, local, prefix))
}

/// Write `xsi:type` naming `type_name` on the open start tag.
pub(crate) fn write_type_attribute(w: &mut dyn XmlWriter, type_name: &QName) -> Result<()> {
    let text = qname_to_text(type_name, &mut WriterScope(&mut *w))?;
    w.write_attribute(&QName::xsi("type"), &text)
}
