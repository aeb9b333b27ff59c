use std::fmt;
use std::hash::{Hash, Hasher};

/// The XML Schema namespace, bound to `xs` when this crate has to pick a prefix.
pub const XS_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// The XML Schema instance namespace (`xsi:nil`, `xsi:type`).
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Reserved namespace of `xmlns` declarations.
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";

/// Reserved namespace of the `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// A qualified XML name.
///
/// Two names are equal when their namespace and local part are equal. The
/// prefix is only a hint for output and never takes part in comparisons.
#[derive(Clone)]
pub struct QName {
    namespace: String,
    local: String,
    prefix: Option<String>,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> QName {
        QName {
            namespace: namespace.into(),
            local: local.into(),
            prefix: None,
        }
    }

    /// A name with no namespace.
    pub fn local(local: impl Into<String>) -> QName {
        QName::new("", local)
    }

    pub fn with_prefix(
        namespace: impl Into<String>,
        local: impl Into<String>,
        prefix: impl Into<String>,
    ) -> QName {
        let prefix = prefix.into();
        QName {
            namespace: namespace.into(),
            local: local.into(),
            prefix: if prefix.is_empty() { None } else { Some(prefix) },
        }
    }

    /// A name in the XML Schema namespace, e.g. `xs:int`.
    pub fn xs(local: &str) -> QName {
        QName::with_prefix(XS_NS, local, "xs")
    }

    /// A name in the XML Schema instance namespace, e.g. `xsi:nil`.
    pub fn xsi(local: &str) -> QName {
        QName::with_prefix(XSI_NS, local, "xsi")
    }

    #[inline(always)]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline(always)]
    pub fn local_part(&self) -> &str {
        &self.local
    }

    /// The explicit prefix carried by this name, if any. Never `Some("")`.
    #[inline(always)]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Render as it would appear in a tag, `prefix:local` or `local`.
    pub fn to_lexical(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }

    /// Split a raw `prefix:local` tag into its two halves.
    pub(crate) fn split_raw(raw: &str) -> (&str, &str) {
        match raw.find(':') {
            Some(colon) => (&raw[..colon], &raw[colon + 1..]),
            None => ("", raw),
        }
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.local == other.local
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.local.hash(state);
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "QName({}:{} = {})", prefix, self.local, self),
            None => write!(f, "QName({})", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_prefix_ignored_by_equality() {
        let a = QName::with_prefix("urn:a", "item", "a");
        let b = QName::with_prefix("urn:a", "item", "b");
        let c = QName::new("urn:a", "item");
        assert_eq!(a, b);
        assert_eq!(a, c);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_empty_prefix_is_none() {
        let name = QName::with_prefix("urn:a", "item", "");
        assert_eq!(name.prefix(), None);
        assert_eq!(name.to_lexical(), "item");
    }

    #[test]
    fn test_display() {
        assert_eq!(QName::local("a").to_string(), "a");
        assert_eq!(QName::new("urn:x", "a").to_string(), "{urn:x}a");
        assert_eq!(QName::xs("int").to_lexical(), "xs:int");
    }

    #[test]
    fn test_split_raw() {
        assert_eq!(QName::split_raw("p:local"), ("p", "local"));
        assert_eq!(QName::split_raw("local"), ("", "local"));
        assert_eq!(QName::split_raw("p:"), ("p", ""));
    }
}
