//! `bootpath-loadopt` --- UEFI load options.
//!
//! A load option is the persisted form of a boot menu entry (`Boot####`).
//! Its file path list holds the device path of the image to start, followed
//! by optional sub-paths for an initrd or a device tree. Each sub-path starts
//! with a Vendor Media node whose GUID names its role.
//!
//! # Usage
//!
//! ```ignore
//! let option = LoadOption::deserialize(&nvram_bytes)?;
//! let image = option.device_path_for(None)?;
//! let initrd = option.device_path_for(Some(&INITRD_MEDIA_GUID))?;
//! ```

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

mod file_paths;
mod option;

pub use file_paths::{FilePathList, FilePaths};
pub use option::LoadOption;

use bootpath_devpath::DevicePathError;
use uguid::{Guid, guid};

/// Vendor Media GUID tagging the initrd sub-path.
pub const INITRD_MEDIA_GUID: Guid = guid!("5568e427-68fc-4f3d-ac74-ca555231cc68");

/// Vendor Media GUID tagging the device tree sub-path.
pub const FDT_GUID: Guid = guid!("b1b621d5-f19c-41a5-830b-d9152c69aae0");

bitflags::bitflags! {
    /// Load option attribute bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LoadOptionAttributes: u32 {
        /// The option is offered for booting.
        const ACTIVE          = 1 << 0;
        /// Controllers are reconnected before the option is started.
        const FORCE_RECONNECT = 1 << 1;
        /// The option is not shown in the boot menu.
        const HIDDEN          = 1 << 3;
        /// The option is an application rather than a boot target.
        const CATEGORY_APP    = 1 << 8;
    }
}

/// Errors produced while decoding or encoding load options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LoadOptionError {
    /// The buffer is shorter than the fixed header.
    #[error("load option truncated")]
    Truncated,
    /// The description has no NUL terminator inside the buffer.
    #[error("load option description is not terminated")]
    UnterminatedDescription,
    /// The file path list does not fit its length field or the buffer.
    #[error("file path list of {len} bytes does not fit")]
    FilePathListTooLong {
        /// Length of the offending list.
        len: usize,
    },
    /// The file path list is too short to hold a device path.
    #[error("load option has no device path")]
    NoDevicePath,
    /// The boot device path is malformed, or allocation failed.
    #[error(transparent)]
    DevicePath(#[from] DevicePathError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn attribute_bits() {
        assert_eq!(LoadOptionAttributes::ACTIVE.bits(), 0x1);
        assert_eq!(LoadOptionAttributes::HIDDEN.bits(), 0x8);
        assert_eq!(LoadOptionAttributes::CATEGORY_APP.bits(), 0x100);
        let kept = LoadOptionAttributes::from_bits_retain(0x8000_0001);
        assert!(kept.contains(LoadOptionAttributes::ACTIVE));
        assert_eq!(kept.bits(), 0x8000_0001);
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            format!("{}", LoadOptionError::FilePathListTooLong { len: 70_000 }),
            "file path list of 70000 bytes does not fit"
        );
        assert_eq!(
            format!("{}", LoadOptionError::from(DevicePathError::MissingPath)),
            "device path argument is missing"
        );
    }
}
