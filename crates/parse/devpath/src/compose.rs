//! Duplication, concatenation and appending.
//!
//! Every public entry point reduces its arguments to two runs of node bytes
//! and hands them to [`assemble`], which is the only code that writes end
//! nodes into a result.

use crate::node::{DevicePathNode, EndKind};
use crate::path::{DevicePath, DevicePathView};
use crate::{DevicePathError, END_NODE_SIZE, try_vec};

/// How [`concat`] joins its two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConcatMode {
    /// Join into one instance: the first path's terminator is dropped.
    Merge = 0,
    /// Start a new instance: an `EndInstance` separates the operands.
    NewInstance = 1,
}

/// What [`assemble`] writes between head and tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Joint {
    /// Nothing.
    Merge,
    /// An `EndInstance` separator.
    Instance,
}

/// Builds `head`, the joint, `tail` and a final `EndEntire` into a new path.
///
/// `head` and `tail` must be whole nodes with no `EndEntire` among them.
pub(crate) fn assemble(
    head: &[u8],
    joint: Joint,
    tail: &[u8],
) -> Result<DevicePath, DevicePathError> {
    let joint_len = match joint {
        Joint::Merge => 0,
        Joint::Instance => END_NODE_SIZE,
    };
    let mut buf = try_vec(head.len() + joint_len + tail.len() + END_NODE_SIZE)?;
    buf.extend_from_slice(head);
    if joint == Joint::Instance {
        buf.extend_from_slice(&EndKind::Instance.to_bytes());
    }
    buf.extend_from_slice(tail);
    buf.extend_from_slice(&EndKind::Entire.to_bytes());
    Ok(DevicePath::from_validated(buf))
}

/// Copies a whole path, every instance and the terminator included.
///
/// # Errors
///
/// Returns [`DevicePathError::MissingPath`] for `None` and
/// [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn dup(dp: Option<DevicePathView<'_>>) -> Result<DevicePath, DevicePathError> {
    dp.ok_or(DevicePathError::MissingPath)?.dup()
}

/// Concatenates two paths.
///
/// With [`ConcatMode::Merge`] the nodes of `dp2` continue the last instance
/// of `dp1`. With [`ConcatMode::NewInstance`] they form a new instance after
/// an `EndInstance` separator. A missing operand yields a copy of the other;
/// two missing operands yield an `EndEntire`-only path.
///
/// # Errors
///
/// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn concat(
    dp1: Option<DevicePathView<'_>>,
    dp2: Option<DevicePathView<'_>>,
    mode: ConcatMode,
) -> Result<DevicePath, DevicePathError> {
    match (dp1, dp2) {
        (None, None) => DevicePath::end(),
        (None, Some(dp2)) => dp2.dup(),
        (Some(dp1), None) => assemble(dp1.node_bytes(), Joint::Merge, &[]),
        (Some(dp1), Some(dp2)) => {
            let joint = match mode {
                ConcatMode::Merge => Joint::Merge,
                ConcatMode::NewInstance => Joint::Instance,
            };
            assemble(dp1.node_bytes(), joint, dp2.node_bytes())
        }
    }
}

/// Appends a single node after the last node of `dp`.
///
/// # Errors
///
/// Returns [`DevicePathError::InvalidEndNode`] if `node` is an end node and
/// [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn append_node(
    dp: Option<DevicePathView<'_>>,
    node: Option<DevicePathNode<'_>>,
) -> Result<DevicePath, DevicePathError> {
    if node.is_some_and(|node| node.is_end()) {
        return Err(DevicePathError::InvalidEndNode { offset: 0 });
    }
    match (dp, node) {
        (None, None) => DevicePath::end(),
        (Some(dp), None) => dp.dup(),
        (None, Some(node)) => assemble(node.as_bytes(), Joint::Merge, &[]),
        (Some(dp), Some(node)) => assemble(dp.node_bytes(), Joint::Merge, node.as_bytes()),
    }
}

/// Appends the first instance of `dpi` to `dp` as a new instance.
///
/// # Errors
///
/// Returns [`DevicePathError::MissingInstance`] if `dpi` is `None` and
/// [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn append_instance(
    dp: Option<DevicePathView<'_>>,
    dpi: Option<DevicePathView<'_>>,
) -> Result<DevicePath, DevicePathError> {
    let dpi = dpi.ok_or(DevicePathError::MissingInstance)?;
    match dp {
        None => dpi.dup(),
        Some(dp) => assemble(dp.node_bytes(), Joint::Instance, dpi.instance_bytes()),
    }
}

impl DevicePathView<'_> {
    /// See [`append_node`].
    ///
    /// # Errors
    ///
    /// As for [`append_node`].
    pub fn append_node(&self, node: DevicePathNode<'_>) -> Result<DevicePath, DevicePathError> {
        append_node(Some(*self), Some(node))
    }

    /// See [`append_instance`].
    ///
    /// # Errors
    ///
    /// As for [`append_instance`].
    pub fn append_instance(&self, dpi: DevicePathView<'_>) -> Result<DevicePath, DevicePathError> {
        append_instance(Some(*self), Some(dpi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeBuf;
    use crate::testutil::{emit_end, emit_end_instance, emit_node, simple_path};
    use alloc::vec::Vec;

    fn parse(v: &[u8]) -> DevicePathView<'_> {
        DevicePathView::parse(v).unwrap()
    }

    fn tag_node(tag: u8) -> NodeBuf {
        NodeBuf::with_payload(0x01, 0x05, &[tag, 0, 0, 0]).unwrap()
    }

    #[test]
    fn dup_none_fails() {
        assert_eq!(dup(None), Err(DevicePathError::MissingPath));
        let v = simple_path(&[1]);
        assert_eq!(dup(Some(parse(&v))).unwrap().as_bytes(), v.as_slice());
    }

    #[test]
    fn concat_merge() {
        let a = simple_path(&[1]);
        let b = simple_path(&[2, 3]);
        let joined = concat(Some(parse(&a)), Some(parse(&b)), ConcatMode::Merge).unwrap();
        assert_eq!(joined.as_bytes(), simple_path(&[1, 2, 3]).as_slice());
    }

    #[test]
    fn concat_new_instance() {
        let a = simple_path(&[1]);
        let b = simple_path(&[2]);
        let joined = concat(Some(parse(&a)), Some(parse(&b)), ConcatMode::NewInstance).unwrap();

        let mut expected = Vec::new();
        emit_node(&mut expected, 0x01, 0x05, &[1, 0, 0, 0]);
        emit_end_instance(&mut expected);
        emit_node(&mut expected, 0x01, 0x05, &[2, 0, 0, 0]);
        emit_end(&mut expected);
        assert_eq!(joined.as_bytes(), expected.as_slice());
        assert!(joined.view().is_multi_instance());
    }

    #[test]
    fn concat_missing_operands() {
        let a = simple_path(&[1]);
        assert_eq!(
            concat(None, None, ConcatMode::Merge).unwrap().as_bytes(),
            &[0x7f, 0xff, 4, 0]
        );
        assert_eq!(
            concat(None, Some(parse(&a)), ConcatMode::NewInstance)
                .unwrap()
                .as_bytes(),
            a.as_slice()
        );
        assert_eq!(
            concat(Some(parse(&a)), None, ConcatMode::NewInstance)
                .unwrap()
                .as_bytes(),
            a.as_slice()
        );
    }

    #[test]
    fn append_node_cases() {
        let a = simple_path(&[1]);
        let node = tag_node(2);

        let both = append_node(Some(parse(&a)), Some(node.as_node())).unwrap();
        assert_eq!(both.as_bytes(), simple_path(&[1, 2]).as_slice());
        assert_eq!(both.size(), parse(&a).size() + usize::from(node.as_node().length()));

        let no_dp = append_node(None, Some(node.as_node())).unwrap();
        assert_eq!(no_dp.as_bytes(), simple_path(&[2]).as_slice());

        let no_node = append_node(Some(parse(&a)), None).unwrap();
        assert_eq!(no_node.as_bytes(), a.as_slice());

        let neither = append_node(None, None).unwrap();
        assert_eq!(neither.as_bytes(), &[0x7f, 0xff, 4, 0]);
    }

    #[test]
    fn append_node_rejects_end_node() {
        let end = [0x7f, 0xff, 4, 0];
        let node = DevicePathNode::parse(&end).unwrap();
        assert_eq!(
            append_node(None, Some(node)),
            Err(DevicePathError::InvalidEndNode { offset: 0 })
        );
    }

    #[test]
    fn append_node_follows_last_instance() {
        let mut v = Vec::new();
        emit_node(&mut v, 0x01, 0x05, &[1, 0, 0, 0]);
        emit_end_instance(&mut v);
        emit_node(&mut v, 0x01, 0x05, &[2, 0, 0, 0]);
        emit_end(&mut v);
        let node = tag_node(3);
        let out = parse(&v).append_node(node.as_node()).unwrap();
        let second = out.view().next_instance_view().unwrap();
        assert_eq!(second.as_bytes(), simple_path(&[2, 3]).as_slice());
    }

    #[test]
    fn append_instance_cases() {
        let a = simple_path(&[1]);
        let b = simple_path(&[2]);
        assert_eq!(
            append_instance(Some(parse(&a)), None),
            Err(DevicePathError::MissingInstance)
        );
        assert_eq!(
            append_instance(None, Some(parse(&b))).unwrap().as_bytes(),
            b.as_slice()
        );

        let multi = parse(&a).append_instance(parse(&b)).unwrap();
        assert!(multi.view().is_multi_instance());
        assert_eq!(multi.view().instance_bytes(), &a[..8]);
        assert_eq!(
            multi.view().next_instance_view().unwrap().as_bytes(),
            b.as_slice()
        );
    }

    #[test]
    fn append_instance_takes_first_instance_only() {
        let a = simple_path(&[1]);
        let mut dpi = Vec::new();
        emit_node(&mut dpi, 0x01, 0x05, &[2, 0, 0, 0]);
        emit_end_instance(&mut dpi);
        emit_node(&mut dpi, 0x01, 0x05, &[3, 0, 0, 0]);
        emit_end(&mut dpi);
        let out = append_instance(Some(parse(&a)), Some(parse(&dpi))).unwrap();
        assert_eq!(out.view().total_len(), 8 + 4 + 8 + 4);
    }
}
