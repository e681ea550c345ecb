//! Owned device paths and borrowed, validated views over them.
//!
//! A [`DevicePathView`] always covers a complete, well-formed path: zero or
//! more nodes, optional `EndInstance` separators, and exactly one final
//! `EndEntire`. Views are produced by validation, by borrowing a
//! [`DevicePath`], or by slicing an existing view at a node boundary, so
//! every accessor below can index without further checks.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::iter::FusedIterator;

use crate::node::{DevicePathNode, EndKind};
use crate::validate::check_length;
use crate::{DevicePathError, END_NODE_SIZE, try_vec};

// ---- DevicePathView -------------------------------------------------------

/// A borrowed, validated device path.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DevicePathView<'a> {
    bytes: &'a [u8],
}

impl<'a> DevicePathView<'a> {
    /// Validates `data` and returns a view of the path at its start.
    ///
    /// Bytes after the terminating `EndEntire` node are ignored; use
    /// [`DevicePath::from_bytes`] to reject them.
    ///
    /// # Errors
    ///
    /// Returns the first structural violation reported by [`check_length`].
    pub fn parse(data: &'a [u8]) -> Result<Self, DevicePathError> {
        Self::parse_bounded(data, data.len())
    }

    /// Like [`parse`](Self::parse), but the path may not exceed `maxlen`
    /// bytes.
    ///
    /// # Errors
    ///
    /// Returns the first structural violation reported by [`check_length`].
    pub fn parse_bounded(data: &'a [u8], maxlen: usize) -> Result<Self, DevicePathError> {
        match check_length(data, maxlen) {
            Ok(total) => Ok(Self {
                bytes: &data[..total],
            }),
            Err(err) => {
                log::debug!("devpath: rejected {} byte buffer: {}", data.len(), err);
                Err(err)
            }
        }
    }

    /// Wraps bytes already known to hold exactly one well-formed path.
    pub(crate) const fn from_validated(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes, `EndEntire` included.
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns the full buffer length, `EndEntire` included.
    #[must_use]
    pub const fn total_len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the node at the start of the view, which may be an end node.
    #[must_use]
    pub fn first_node(&self) -> DevicePathNode<'a> {
        self.node_at(0)
    }

    /// Decodes the node at a boundary that validation already proved sound.
    fn node_at(&self, offset: usize) -> DevicePathNode<'a> {
        match DevicePathNode::read_at(self.bytes, offset) {
            Some(node) => node,
            None => unreachable!("validated device path has a node at every boundary"),
        }
    }

    /// Advances by one node.
    ///
    /// Returns `None` if the view starts with an end node or if the node
    /// after the first one is an end node of either kind.
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        let first = self.first_node();
        if first.is_end() {
            return None;
        }
        let rest = Self::from_validated(&self.bytes[usize::from(first.length())..]);
        if rest.first_node().is_end() {
            None
        } else {
            Some(rest)
        }
    }

    /// Iterates over the non-end nodes of the first instance.
    #[must_use]
    pub fn nodes(&self) -> Nodes<'a> {
        Nodes {
            cursor: (!self.first_node().is_end()).then_some(*self),
        }
    }

    /// Iterates over every node in the buffer, end nodes included.
    #[must_use]
    pub fn raw_nodes(&self) -> RawNodes<'a> {
        RawNodes {
            bytes: self.bytes,
            offset: 0,
        }
    }

    /// Returns the node immediately before the first end node, or `None` for
    /// a path whose first instance is empty.
    #[must_use]
    pub fn last_node(&self) -> Option<DevicePathNode<'a>> {
        self.nodes().last()
    }

    /// Returns the byte length of every instance, separators included,
    /// excluding the final `EndEntire`.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.bytes.len() - END_NODE_SIZE
    }

    /// Returns the byte length of the first instance, excluding its end
    /// node.
    #[must_use]
    pub fn instance_size(&self) -> usize {
        let mut offset = 0;
        for node in self.raw_nodes() {
            if node.is_end() {
                break;
            }
            offset += usize::from(node.length());
        }
        offset
    }

    /// Returns `true` if the path is nothing but an `EndEntire` node.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.len() == END_NODE_SIZE
    }

    /// Returns `true` if an `EndInstance` separator precedes the final
    /// `EndEntire`.
    #[must_use]
    pub fn is_multi_instance(&self) -> bool {
        self.raw_nodes().any(|node| node.is_end_instance())
    }

    /// Returns the nodes of the first instance without its end node.
    #[must_use]
    pub fn instance_bytes(&self) -> &'a [u8] {
        &self.bytes[..self.instance_size()]
    }

    /// Returns the nodes of every instance without the final `EndEntire`.
    #[must_use]
    pub fn node_bytes(&self) -> &'a [u8] {
        &self.bytes[..self.size()]
    }

    /// Returns the view that starts after the first instance's separator,
    /// or `None` if the first instance ends with `EndEntire`.
    #[must_use]
    pub fn next_instance_view(&self) -> Option<Self> {
        let end = self.instance_size();
        if self.node_at(end).is_end_instance() {
            Some(Self::from_validated(&self.bytes[end + END_NODE_SIZE..]))
        } else {
            None
        }
    }

    /// Returns the rest of this path if `prefix` covers a whole number of
    /// its leading nodes.
    ///
    /// The remainder always starts on a node boundary; it is an
    /// `EndEntire`-only view when `prefix` covers every node.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &[u8]) -> Option<Self> {
        if !self.bytes.starts_with(prefix) || prefix.len() >= self.bytes.len() {
            return None;
        }
        let mut offset = 0;
        for node in self.raw_nodes() {
            if offset == prefix.len() {
                return Some(Self::from_validated(&self.bytes[offset..]));
            }
            offset += usize::from(node.length());
        }
        None
    }

    /// Copies this path into a new owned buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
    pub fn dup(&self) -> Result<DevicePath, DevicePathError> {
        let mut buf = try_vec(self.bytes.len())?;
        buf.extend_from_slice(self.bytes);
        Ok(DevicePath::from_validated(buf))
    }
}

impl core::fmt::Debug for DevicePathView<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "DevicePathView({self})")
    }
}

// ---- DevicePath -----------------------------------------------------------

/// An owned, well-formed device path.
///
/// There is deliberately no `Clone`; copies are made with
/// [`dup`](Self::dup).
#[derive(PartialEq, Eq)]
pub struct DevicePath {
    bytes: Box<[u8]>,
}

impl DevicePath {
    /// Validates `data` and copies it into an owned path.
    ///
    /// # Errors
    ///
    /// Returns the first structural violation reported by [`check_length`],
    /// [`DevicePathError::TrailingData`] if bytes follow the `EndEntire`
    /// node, or [`DevicePathError::OutOfMemory`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, DevicePathError> {
        let view = DevicePathView::parse(data)?;
        if view.total_len() != data.len() {
            let err = DevicePathError::TrailingData {
                len: data.len() - view.total_len(),
            };
            log::debug!("devpath: rejected {} byte buffer: {}", data.len(), err);
            return Err(err);
        }
        view.dup()
    }

    /// Returns a path consisting of a single `EndEntire` node.
    ///
    /// # Errors
    ///
    /// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
    pub fn end() -> Result<Self, DevicePathError> {
        let mut buf = try_vec(END_NODE_SIZE)?;
        buf.extend_from_slice(&EndKind::Entire.to_bytes());
        Ok(Self::from_validated(buf))
    }

    /// Takes ownership of a buffer the composer has just assembled.
    pub(crate) fn from_validated(bytes: Vec<u8>) -> Self {
        debug_assert_eq!(check_length(&bytes, bytes.len()), Ok(bytes.len()));
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Borrows this path as a view.
    #[must_use]
    pub fn view(&self) -> DevicePathView<'_> {
        DevicePathView::from_validated(&self.bytes)
    }

    /// Returns the raw bytes, `EndEntire` included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Releases the buffer to the caller.
    #[must_use]
    pub fn into_boxed_bytes(self) -> Box<[u8]> {
        self.bytes
    }

    /// See [`DevicePathView::size`].
    #[must_use]
    pub fn size(&self) -> usize {
        self.view().size()
    }

    /// See [`DevicePathView::nodes`].
    #[must_use]
    pub fn nodes(&self) -> Nodes<'_> {
        self.view().nodes()
    }

    /// Copies this path into a new owned buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
    pub fn dup(&self) -> Result<Self, DevicePathError> {
        self.view().dup()
    }
}

impl AsRef<[u8]> for DevicePath {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl TryFrom<&[u8]> for DevicePath {
    type Error = DevicePathError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(data)
    }
}

impl<'a> From<&'a DevicePath> for DevicePathView<'a> {
    fn from(path: &'a DevicePath) -> Self {
        path.view()
    }
}

impl core::fmt::Debug for DevicePath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "DevicePath({})", self.view())
    }
}

// ---- Iterators ------------------------------------------------------------

/// Iterator over the non-end nodes of a path's first instance.
#[derive(Clone)]
pub struct Nodes<'a> {
    cursor: Option<DevicePathView<'a>>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = DevicePathNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let view = self.cursor?;
        self.cursor = view.next();
        Some(view.first_node())
    }
}

impl FusedIterator for Nodes<'_> {}

/// Iterator over every node of a path, end nodes included.
#[derive(Clone)]
pub struct RawNodes<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for RawNodes<'a> {
    type Item = DevicePathNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = DevicePathNode::read_at(self.bytes, self.offset)?;
        self.offset += usize::from(node.length());
        Some(node)
    }
}

impl FusedIterator for RawNodes<'_> {}
