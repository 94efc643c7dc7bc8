//! Dotted paths into a document tree.

use std::fmt;

use crate::Node;

/// Key denoting the whole document.
pub const ROOT: &str = "";

const SEPARATOR: char = '.';

/// Ordered key segments addressing a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The root path.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Split a dotted key into segments. [`ROOT`] yields the root path.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascade_config::{Path, ROOT};
    /// assert!(Path::parse(ROOT).is_root());
    /// assert_eq!(Path::parse("server.tls").segments(), ["server", "tls"]);
    /// ```
    #[must_use]
    pub fn parse(key: &str) -> Self {
        if key == ROOT {
            return Self::root();
        }
        Self {
            segments: key.split(SEPARATOR).map(str::to_owned).collect(),
        }
    }

    /// Returns `true` for the whole-document path.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Borrow the segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Extend this path with a dotted `key`.
    #[must_use]
    pub fn join(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(Self::parse(key).segments);
        Self { segments }
    }

    /// Append the segments of `other`.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut segments = self.segments.clone();
        segments.extend_from_slice(&other.segments);
        Self { segments }
    }

    /// Find the node this path addresses inside `document`.
    ///
    /// Each segment first matches a string key literally, then as a YAML
    /// scalar so integer or boolean keys are reachable. Descending into
    /// anything other than a mapping yields `None`.
    #[must_use]
    pub fn resolve<'a>(&self, document: &'a Node) -> Option<&'a Node> {
        self.segments.iter().try_fold(document, |node, segment| {
            let map = node.as_mapping()?;
            map.get_str(segment).or_else(|| {
                let key = Node::parse_literal(segment).ok()?;
                if key.is_scalar() { map.get(&key) } else { None }
            })
        })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl From<&str> for Path {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::{Path, ROOT};
    use crate::{Node, codec::parse_yaml};

    #[fixture]
    fn document() -> Node {
        parse_yaml("server:\n  tls: true\n  ports:\n    80: http\n    \"443\": https\nlist: [1, 2]\n")
            .ok()
            .flatten()
            .unwrap_or_else(|| panic!("fixture should parse"))
    }

    #[rstest]
    fn root_returns_whole_document(document: Node) {
        assert_eq!(Path::parse(ROOT).resolve(&document), Some(&document));
    }

    #[rstest]
    #[case("server.tls", Some(Node::Bool(true)))]
    #[case("server.ports.80", Some(Node::from("http")))]
    #[case("server.ports.443", Some(Node::from("https")))]
    #[case("server.missing", None)]
    #[case("list.0", None)]
    #[case("server.tls.deeper", None)]
    fn resolves_segments(document: Node, #[case] key: &str, #[case] expected: Option<Node>) {
        assert_eq!(Path::parse(key).resolve(&document).cloned(), expected);
    }

    #[rstest]
    fn join_extends_segments() {
        let path = Path::parse("a").join("b.c");
        assert_eq!(path.to_string(), "a.b.c");
        assert_eq!(Path::root().join(ROOT), Path::root());
    }
}
