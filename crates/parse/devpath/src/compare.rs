//! Prefix-aware ordering of device paths.

use core::cmp::Ordering;

use crate::path::DevicePathView;

/// Compares the first instances of `a` and `b` node by node.
///
/// Comparison stops as soon as either path runs out of nodes, so a path
/// that is a node-exact prefix of the other compares [`Ordering::Equal`].
/// The first differing node decides the result: by declared length first,
/// then by its raw bytes.
#[must_use]
pub fn match_paths(a: DevicePathView<'_>, b: DevicePathView<'_>) -> Ordering {
    for (na, nb) in a.nodes().zip(b.nodes()) {
        let ord = na
            .length()
            .cmp(&nb.length())
            .then_with(|| na.as_bytes().cmp(nb.as_bytes()));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Returns `true` if the first instance of `prefix` is a node-exact prefix
/// of the first instance of `path`.
///
/// Identical instances count as a prefix.
#[must_use]
pub fn is_prefix_of(prefix: DevicePathView<'_>, path: DevicePathView<'_>) -> bool {
    // A byte prefix of a well-formed node sequence that starts at the same
    // offset is necessarily node aligned.
    path.instance_bytes().starts_with(prefix.instance_bytes())
}

impl DevicePathView<'_> {
    /// See [`match_paths`].
    #[must_use]
    pub fn match_prefix(&self, other: DevicePathView<'_>) -> Ordering {
        match_paths(*self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{emit_end, emit_node, simple_path};
    use alloc::vec::Vec;

    fn parse(v: &[u8]) -> DevicePathView<'_> {
        DevicePathView::parse(v).unwrap()
    }

    #[test]
    fn equal_paths() {
        let a = simple_path(&[1, 2]);
        let b = simple_path(&[1, 2]);
        assert_eq!(match_paths(parse(&a), parse(&b)), Ordering::Equal);
    }

    #[test]
    fn prefix_is_equal_both_ways() {
        let short = simple_path(&[1]);
        let long = simple_path(&[1, 2, 3]);
        assert_eq!(match_paths(parse(&short), parse(&long)), Ordering::Equal);
        assert_eq!(match_paths(parse(&long), parse(&short)), Ordering::Equal);
        assert!(is_prefix_of(parse(&short), parse(&long)));
        assert!(!is_prefix_of(parse(&long), parse(&short)));
    }

    #[test]
    fn end_only_matches_everything() {
        let end = simple_path(&[]);
        let other = simple_path(&[7]);
        assert_eq!(match_paths(parse(&end), parse(&other)), Ordering::Equal);
        assert!(is_prefix_of(parse(&end), parse(&other)));
    }

    #[test]
    fn content_orders_by_bytes() {
        let a = simple_path(&[1, 2]);
        let b = simple_path(&[1, 3]);
        assert_eq!(match_paths(parse(&a), parse(&b)), Ordering::Less);
        assert_eq!(parse(&b).match_prefix(parse(&a)), Ordering::Greater);
        assert!(!is_prefix_of(parse(&a), parse(&b)));
    }

    #[test]
    fn length_decides_before_content() {
        let mut a = Vec::new();
        emit_node(&mut a, 0x04, 0x04, &[0xff, 0]);
        emit_end(&mut a);
        let mut b = Vec::new();
        emit_node(&mut b, 0x01, 0x05, &[0, 0, 0, 0]);
        emit_end(&mut b);
        assert_eq!(match_paths(parse(&a), parse(&b)), Ordering::Less);
    }

    #[test]
    fn only_first_instance_is_compared() {
        let a = simple_path(&[1]);
        let mut b = Vec::new();
        emit_node(&mut b, 0x01, 0x05, &[1, 0, 0, 0]);
        crate::testutil::emit_end_instance(&mut b);
        emit_node(&mut b, 0x01, 0x05, &[9, 0, 0, 0]);
        emit_end(&mut b);
        assert_eq!(match_paths(parse(&a), parse(&b)), Ordering::Equal);
        assert!(is_prefix_of(parse(&b), parse(&a)));
    }
}
