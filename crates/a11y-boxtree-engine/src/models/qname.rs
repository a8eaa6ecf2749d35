use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// XML qualified name of an element or attribute: `<prefix:local xmlns:prefix="namespace"/>`.
///
/// Empty namespace and prefix strings are normalized to `None`, so names
/// coming from different loaders compare equal when they mean the same thing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedName {
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    local: String,
}

impl QualifiedName {
    pub fn new(namespace: Option<&str>, prefix: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: non_empty(namespace.map(str::to_string)),
            prefix: non_empty(prefix.map(str::to_string)),
            local: local.into(),
        }
    }

    /// A name without namespace or prefix.
    pub fn local(local: impl Into<String>) -> Self {
        Self::new(None, None, local)
    }

    /// A name in the given namespace, without prefix.
    pub fn namespaced(namespace: &str, local: impl Into<String>) -> Self {
        Self::new(Some(namespace), None, local)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn local_part(&self) -> &str {
        &self.local
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.prefix, &self.namespace) {
            (Some(prefix), _) => write!(f, "{prefix}:{}", self.local),
            (None, Some(namespace)) => write!(f, "{{{namespace}}}{}", self.local),
            (None, None) => f.write_str(&self.local),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QualifiedNameRepr {
    Local(String),
    Full {
        #[serde(default)]
        namespace: Option<String>,
        #[serde(default)]
        prefix: Option<String>,
        local: String,
    },
}

impl<'de> Deserialize<'de> for QualifiedName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match QualifiedNameRepr::deserialize(deserializer)? {
            QualifiedNameRepr::Local(local) => QualifiedName::local(local),
            QualifiedNameRepr::Full {
                namespace,
                prefix,
                local,
            } => QualifiedName {
                namespace: non_empty(namespace),
                prefix: non_empty(prefix),
                local,
            },
        })
    }
}

/// Well-known XHTML and EPUB names used by the rewrite catalog.
pub mod html {
    use super::QualifiedName;

    pub const HTML_NS: &str = "http://www.w3.org/1999/xhtml";
    pub const EPUB_NS: &str = "http://www.idpf.org/2007/ops";

    fn element(local: &str) -> QualifiedName {
        QualifiedName::namespaced(HTML_NS, local)
    }

    pub fn div() -> QualifiedName {
        element("div")
    }
    pub fn p() -> QualifiedName {
        element("p")
    }
    pub fn span() -> QualifiedName {
        element("span")
    }
    pub fn strong() -> QualifiedName {
        element("strong")
    }
    pub fn em() -> QualifiedName {
        element("em")
    }
    pub fn small() -> QualifiedName {
        element("small")
    }
    pub fn img() -> QualifiedName {
        element("img")
    }
    pub fn li() -> QualifiedName {
        element("li")
    }
    pub fn ul() -> QualifiedName {
        element("ul")
    }
    pub fn ol() -> QualifiedName {
        element("ol")
    }
    pub fn a() -> QualifiedName {
        element("a")
    }
    pub fn figure() -> QualifiedName {
        element("figure")
    }
    pub fn figcaption() -> QualifiedName {
        element("figcaption")
    }

    /// `h1`..`h6`; `None` outside that range.
    pub fn heading(level: u8) -> Option<QualifiedName> {
        (1..=6)
            .contains(&level)
            .then(|| element(&format!("h{level}")))
    }

    pub fn is_heading(name: &QualifiedName) -> bool {
        (1..=6).any(|level| heading(level).as_ref() == Some(name))
    }

    /// Attribute names live in no namespace.
    pub fn href() -> QualifiedName {
        QualifiedName::local("href")
    }

    pub fn epub_type() -> QualifiedName {
        QualifiedName::namespaced(EPUB_NS, "type")
    }

    /// Resolves the element names accepted in rewrite invocations, e.g.
    /// `H1`, `h1`, `Transformer.H1`, `DIV`.
    pub fn by_constant(constant: &str) -> Option<QualifiedName> {
        let constant = constant.strip_prefix("Transformer.").unwrap_or(constant);
        let lower = constant.to_ascii_lowercase();
        match lower.as_str() {
            "div" | "p" | "span" | "strong" | "em" | "small" | "img" | "li" | "ul" | "ol" | "a"
            | "figure" | "figcaption" | "header" | "section" | "aside" | "nav" => {
                Some(element(&lower))
            }
            _ => lower
                .strip_prefix('h')
                .and_then(|level| level.parse::<u8>().ok())
                .and_then(heading),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn equality_uses_all_three_fields() {
        let a = QualifiedName::namespaced(html::HTML_NS, "div");
        let b = QualifiedName::new(Some(html::HTML_NS), None, "div");
        let c = QualifiedName::new(Some(html::HTML_NS), Some("h"), "div");
        let d = QualifiedName::local("div");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn empty_prefix_and_namespace_are_absent() {
        let name = QualifiedName::new(Some(""), Some(""), "href");
        assert_eq!(name, html::href());
        assert_eq!(name.namespace(), None);
        assert_eq!(name.prefix(), None);
    }

    #[test]
    fn display_forms() {
        assert_eq!(html::div().to_string(), format!("{{{}}}div", html::HTML_NS));
        assert_eq!(
            QualifiedName::new(Some(html::EPUB_NS), Some("epub"), "type").to_string(),
            "epub:type"
        );
        assert_eq!(QualifiedName::local("x").to_string(), "x");
    }

    #[test]
    fn deserializes_from_object_or_string() {
        let full: QualifiedName = serde_json::from_str(
            r#"{"namespace":"http://www.w3.org/1999/xhtml","prefix":"","local":"p"}"#,
        )
        .unwrap();
        assert_eq!(full, html::p());

        let bare: QualifiedName = serde_json::from_str(r#""href""#).unwrap();
        assert_eq!(bare, html::href());
    }

    #[test]
    fn resolves_invocation_constants() {
        assert_eq!(html::by_constant("Transformer.H1"), html::heading(1));
        assert_eq!(html::by_constant("h3"), html::heading(3));
        assert_eq!(html::by_constant("DIV"), Some(html::div()));
        assert_eq!(html::by_constant("H7"), None);
        assert_eq!(html::by_constant("blink"), None);
    }

    #[test]
    fn heading_levels() {
        assert!(html::is_heading(&html::heading(6).unwrap()));
        assert!(!html::is_heading(&html::p()));
        assert_eq!(html::heading(0), None);
    }
}
