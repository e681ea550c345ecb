//! `bootpath-handles` --- live firmware objects and device path resolution.
//!
//! An [`ObjectTable`] records every live object (a [`Handle`]) together with
//! the protocols installed on it. Objects that carry a device path can be
//! looked up by path: [`ObjectTable::find_obj`] maps a persisted boot path to
//! the object that serves it, and [`ObjectTable::locate_device_path`]
//! implements the `LocateDevicePath` boot service on top of the same table.

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

mod resolve;
mod table;

pub use resolve::{FindOptions, Resolved};
pub use table::ObjectTable;

use core::num::NonZeroUsize;

use bootpath_devpath::DevicePathError;
use uguid::{Guid, guid};

/// GUID of the device path protocol.
pub const DEVICE_PATH_PROTOCOL_GUID: Guid = guid!("09576e91-6d3f-11d2-8e39-00a0c969723b");

/// Opaque identifier of a live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(NonZeroUsize);

impl Handle {
    /// Returns the raw handle value.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0.get()
    }
}

impl core::fmt::Display for Handle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors produced by the object table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    /// No object or protocol matched the request.
    #[error("not found")]
    NotFound,
    /// The handle does not name a live object.
    #[error("invalid handle {0}")]
    InvalidHandle(Handle),
    /// The protocol is already installed on the object.
    #[error("protocol {0} is already installed")]
    AlreadyInstalled(Guid),
    /// A device path operation failed.
    #[error(transparent)]
    DevicePath(#[from] DevicePathError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn error_messages() {
        let h = Handle(NonZeroUsize::MIN);
        assert_eq!(format!("{}", HandleError::InvalidHandle(h)), "invalid handle #1");
        assert_eq!(
            format!("{}", HandleError::AlreadyInstalled(DEVICE_PATH_PROTOCOL_GUID)),
            "protocol 09576e91-6d3f-11d2-8e39-00a0c969723b is already installed"
        );
        assert_eq!(
            format!("{}", HandleError::from(DevicePathError::OutOfMemory)),
            "out of memory"
        );
    }
}
