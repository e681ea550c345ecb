//! `bootpath-devpath` --- a standalone, `no_std` UEFI device path engine.
//!
//! A device path is a chain of variable-length binary nodes naming a device,
//! a partition, a file or a network endpoint. This crate validates such
//! chains, accounts their size, matches them against each other, and builds
//! new ones by duplication, concatenation, node and instance appends.
//!
//! Bytes from outside (NVRAM variables, load options, other firmware) enter
//! only through [`DevicePathView::parse`] or [`DevicePath::from_bytes`], both
//! of which run [`check_length`] over the whole buffer first. Every other
//! operation works on already validated views.
//!
//! # Usage
//!
//! ```ignore
//! let persisted = DevicePathView::parse(nvram_bytes)?;
//! let (device, file) = split_file_path(persisted)?;
//! let short = shorten(device.view());
//! let with_file = append_node(Some(device.view()), file_node.as_ref())?;
//! ```

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod build;
pub mod compare;
pub mod compose;
pub mod instance;
pub mod node;
pub mod path;
pub mod split;
pub mod text;
pub mod validate;

pub use compare::{is_prefix_of, match_paths};
pub use compose::{ConcatMode, append_instance, append_node, concat, dup};
pub use instance::{Instances, get_next_instance, is_multi_instance};
pub use node::{DevicePathNode, EndKind, NodeBuf, create_node};
pub use path::{DevicePath, DevicePathView, Nodes, RawNodes};
pub use split::{find_gpt_partition_node, shorten, split_file_path};
pub use validate::check_length;

use alloc::vec::Vec;

/// Size of the Type/SubType/Length header that starts every node.
pub const NODE_HEADER_SIZE: usize = 4;

/// Size of an end node (`EndEntire` or `EndInstance`), which has no payload.
pub const END_NODE_SIZE: usize = 4;

/// Errors produced while validating or building device paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DevicePathError {
    /// The buffer ended before a node header or node body.
    #[error("device path truncated at offset {offset}")]
    Truncated {
        /// Offset of the node that does not fit.
        offset: usize,
    },
    /// A node declared a length smaller than its own header.
    #[error("node at offset {offset} declares length {length}, shorter than its header")]
    NodeTooShort {
        /// Offset of the offending node.
        offset: usize,
        /// Declared length.
        length: u16,
    },
    /// The running total exceeded the caller-supplied maximum.
    #[error("device path exceeds the maximum length of {max} bytes")]
    ExceedsMaxLength {
        /// The maximum that was exceeded.
        max: usize,
    },
    /// An end node had a payload or an unknown subtype.
    #[error("malformed end node at offset {offset}")]
    InvalidEndNode {
        /// Offset of the offending node.
        offset: usize,
    },
    /// Bytes follow the terminating `EndEntire` node.
    #[error("{len} bytes follow the end of the device path")]
    TrailingData {
        /// Number of bytes after the terminator.
        len: usize,
    },
    /// A node would not fit in the 16-bit length field.
    #[error("node length {length} does not fit in 16 bits")]
    NodeTooLong {
        /// The length that was requested.
        length: usize,
    },
    /// An encoder argument was out of range.
    #[error("invalid node argument")]
    InvalidArgument,
    /// The allocator could not satisfy the request.
    #[error("out of memory")]
    OutOfMemory,
    /// A required device path argument was absent.
    #[error("device path argument is missing")]
    MissingPath,
    /// The instance to append was absent.
    #[error("device path instance argument is missing")]
    MissingInstance,
}

/// Allocates an empty byte vector able to hold `capacity` bytes without
/// reallocating, or fails with [`DevicePathError::OutOfMemory`].
pub(crate) fn try_vec(capacity: usize) -> Result<Vec<u8>, DevicePathError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(capacity)
        .map_err(|_| DevicePathError::OutOfMemory)?;
    Ok(buf)
}
