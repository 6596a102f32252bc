//! Longest-prefix-match subscription table.
//!
//! Maps name prefixes to callbacks. Dispatch picks the entry whose prefix
//! is the longest one prefixing the publication's name, so a publication is
//! delivered at most once even when nested subscriptions overlap.

use syncps_types::{Name, Prefix};

/// Ordered prefix → callback table, generic over the callback type.
#[derive(Debug)]
pub struct SubTable<C> {
    // Sorted by component count, longest first; at most one entry per prefix.
    subs: Vec<(Prefix, C)>,
}

impl<C> Default for SubTable<C> {
    fn default() -> Self {
        Self { subs: Vec::new() }
    }
}

impl<C> SubTable<C> {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscriptions.
    pub fn len(&self) -> usize {
        self.subs.len()
    }

    /// True when no subscriptions exist.
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// True when `prefix` already has an entry.
    pub fn contains(&self, prefix: &Prefix) -> bool {
        self.subs.iter().any(|(p, _)| p == prefix)
    }

    /// Insert `cb` under `prefix`, replacing any existing entry for the
    /// same prefix. Returns true when the prefix was new.
    pub fn insert(&mut self, prefix: Prefix, cb: C) -> bool {
        if let Some(slot) = self.subs.iter_mut().find(|(p, _)| *p == prefix) {
            slot.1 = cb;
            return false;
        }
        let pos = self
            .subs
            .partition_point(|(p, _)| p.len() >= prefix.len());
        self.subs.insert(pos, (prefix, cb));
        true
    }

    /// Remove the entry for `prefix`; true when one existed.
    pub fn remove(&mut self, prefix: &Prefix) -> bool {
        let before = self.subs.len();
        self.subs.retain(|(p, _)| p != prefix);
        self.subs.len() != before
    }

    /// The callback under the longest prefix of `name`, if any.
    pub fn find_longest_match(&self, name: &Name) -> Option<&C> {
        self.subs
            .iter()
            .find(|(p, _)| p.is_prefix_of(name))
            .map(|(_, cb)| cb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Prefix {
        Prefix::new(Name::parse(s))
    }

    #[test]
    fn longest_prefix_wins() {
        let mut t: SubTable<&str> = SubTable::new();
        t.insert(p("/a"), "short");
        t.insert(p("/a/b"), "long");

        assert_eq!(t.find_longest_match(&Name::parse("/a/b/c")), Some(&"long"));
        assert_eq!(t.find_longest_match(&Name::parse("/a/x")), Some(&"short"));
        assert_eq!(t.find_longest_match(&Name::parse("/z")), None);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut t: SubTable<&str> = SubTable::new();
        t.insert(p("/a/b"), "long");
        t.insert(p("/a"), "short");
        assert_eq!(t.find_longest_match(&Name::parse("/a/b/c")), Some(&"long"));
    }

    #[test]
    fn reinsert_replaces() {
        let mut t: SubTable<&str> = SubTable::new();
        assert!(t.insert(p("/a"), "one"));
        assert!(!t.insert(p("/a"), "two"));
        assert_eq!(t.len(), 1);
        assert_eq!(t.find_longest_match(&Name::parse("/a")), Some(&"two"));
    }

    #[test]
    fn remove_works() {
        let mut t: SubTable<&str> = SubTable::new();
        t.insert(p("/a"), "x");
        assert!(t.remove(&p("/a")));
        assert!(!t.remove(&p("/a")));
        assert_eq!(t.find_longest_match(&Name::parse("/a")), None);
    }

    #[test]
    fn equal_length_siblings_coexist() {
        let mut t: SubTable<&str> = SubTable::new();
        t.insert(p("/a/b"), "ab");
        t.insert(p("/a/c"), "ac");
        assert_eq!(t.find_longest_match(&Name::parse("/a/c/1")), Some(&"ac"));
        assert_eq!(t.find_longest_match(&Name::parse("/a/b/1")), Some(&"ab"));
    }
}
