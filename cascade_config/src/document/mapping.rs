//! Insertion-ordered mapping with typed keys.

use super::Node;

/// Ordered list of key/value pairs.
///
/// Keys may be any scalar, so documents keyed by integers or booleans survive
/// decoding. Decoders may push duplicate keys; [`Mapping::insert`] keeps keys
/// unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(Node, Node)>,
}

impl Mapping {
    /// Create an empty mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of entries, duplicates included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the mapping has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Node, &Node)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterate over the values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Node> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub(crate) fn entries(&self) -> &[(Node, Node)] {
        &self.entries
    }

    /// Look up the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &Node) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Mutable lookup of the value stored under `key`.
    pub fn get_mut(&mut self, key: &Node) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Look up the value stored under a string key.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    /// Mutable lookup of the value stored under a string key.
    pub fn get_str_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    /// Return the slot for a string key, inserting `Null` when absent.
    #[expect(
        clippy::indexing_slicing,
        reason = "index comes from position() or from the entry just pushed"
    )]
    pub fn slot(&mut self, key: &str) -> &mut Node {
        let index = self
            .entries
            .iter()
            .position(|(k, _)| k.as_str() == Some(key))
            .unwrap_or_else(|| {
                self.entries.push((Node::from(key), Node::Null));
                self.entries.len() - 1
            });
        &mut self.entries[index].1
    }

    /// Insert `value` under `key`, replacing and returning any previous value.
    pub fn insert(&mut self, key: Node, value: Node) -> Option<Node> {
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Append an entry without checking for an existing key.
    pub(crate) fn push_raw(&mut self, key: Node, value: Node) {
        self.entries.push((key, value));
    }

    /// Remove the entry stored under `key`.
    pub fn remove(&mut self, key: &Node) -> Option<Node> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }
}

impl IntoIterator for Mapping {
    type Item = (Node, Node);
    type IntoIter = std::vec::IntoIter<(Node, Node)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(Node, Node)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (Node, Node)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
