//! Structural validation of externally sourced device path buffers.

use crate::node::{node_type, read_u16_at, sub_type};
use crate::{DevicePathError, END_NODE_SIZE, NODE_HEADER_SIZE};

/// Walks `data` node by node and returns the total length of the path,
/// `EndEntire` included.
///
/// Each node must carry a full header, declare a length of at least 4,
/// fit inside `data`, and keep the running total at or below `maxlen`. End
/// nodes must be exactly 4 bytes with subtype `EndInstance` or `EndEntire`.
/// Bytes after the `EndEntire` node are not examined.
///
/// # Errors
///
/// Returns the first violation found; the buffer is never partially
/// accepted.
pub fn check_length(data: &[u8], maxlen: usize) -> Result<usize, DevicePathError> {
    let mut offset = 0usize;
    loop {
        let header_end = offset + NODE_HEADER_SIZE;
        if header_end > maxlen {
            return Err(DevicePathError::ExceedsMaxLength { max: maxlen });
        }
        let length = read_u16_at(data, offset + 2).ok_or(DevicePathError::Truncated { offset })?;
        if usize::from(length) < NODE_HEADER_SIZE {
            return Err(DevicePathError::NodeTooShort { offset, length });
        }

        let end = offset + usize::from(length);
        if end > maxlen {
            return Err(DevicePathError::ExceedsMaxLength { max: maxlen });
        }
        if end > data.len() {
            return Err(DevicePathError::Truncated { offset });
        }

        if data[offset] == node_type::END {
            if usize::from(length) != END_NODE_SIZE {
                return Err(DevicePathError::InvalidEndNode { offset });
            }
            match data[offset + 1] {
                sub_type::END_ENTIRE => return Ok(end),
                sub_type::END_INSTANCE => {}
                _ => return Err(DevicePathError::InvalidEndNode { offset }),
            }
        }

        offset = end;
    }
}
