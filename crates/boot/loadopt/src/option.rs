//! The `EFI_LOAD_OPTION` wire format.
//!
//! ```text
//! u32     attributes
//! u16     file path list length
//! [u16]   description, UTF-16LE, NUL terminated
//! [u8]    file path list
//! [u8]    optional data (rest of the buffer)
//! ```

use alloc::string::String;
use alloc::vec::Vec;

use bootpath_devpath::{DevicePath, DevicePathError};
use uguid::Guid;

use crate::file_paths::FilePathList;
use crate::{LoadOptionAttributes, LoadOptionError};

const HEADER_SIZE: usize = 6;

/// A decoded load option.
#[derive(Debug, PartialEq, Eq)]
pub struct LoadOption {
    /// Attribute bits; unknown bits are preserved.
    pub attributes: LoadOptionAttributes,
    /// Human-readable label shown in the boot menu.
    pub description: String,
    /// Boot path and tagged sub-paths.
    pub file_paths: FilePathList,
    /// Opaque data passed to the started image.
    pub optional_data: Vec<u8>,
}

fn oom<E>(_: E) -> LoadOptionError {
    LoadOptionError::DevicePath(DevicePathError::OutOfMemory)
}

impl LoadOption {
    /// Decodes a load option.
    ///
    /// # Errors
    ///
    /// Returns [`LoadOptionError::Truncated`] for a buffer shorter than the
    /// header, [`LoadOptionError::UnterminatedDescription`],
    /// [`LoadOptionError::FilePathListTooLong`] if the declared list runs
    /// past the buffer, or the boot path's validation error.
    pub fn deserialize(data: &[u8]) -> Result<Self, LoadOptionError> {
        if data.len() < HEADER_SIZE + 2 {
            return Err(LoadOptionError::Truncated);
        }
        let attributes =
            LoadOptionAttributes::from_bits_retain(u32::from_le_bytes([data[0], data[1], data[2], data[3]]));
        let list_len = usize::from(u16::from_le_bytes([data[4], data[5]]));

        let body = &data[HEADER_SIZE..];
        let units = body.len() / 2;
        let desc_units = (0..units)
            .position(|i| body[2 * i] == 0 && body[2 * i + 1] == 0)
            .ok_or(LoadOptionError::UnterminatedDescription)?;
        let description = decode_description(&body[..2 * desc_units])?;

        let rest = &body[2 * (desc_units + 1)..];
        if list_len > rest.len() {
            return Err(LoadOptionError::FilePathListTooLong { len: list_len });
        }
        let file_paths = FilePathList::parse(&rest[..list_len])?;

        let tail = &rest[list_len..];
        let mut optional_data = Vec::new();
        optional_data.try_reserve_exact(tail.len()).map_err(oom)?;
        optional_data.extend_from_slice(tail);

        Ok(Self {
            attributes,
            description,
            file_paths,
            optional_data,
        })
    }

    /// Encodes this load option.
    ///
    /// # Errors
    ///
    /// Returns [`LoadOptionError::FilePathListTooLong`] if the list does
    /// not fit its 16-bit length field, or an allocation failure.
    pub fn serialize(&self) -> Result<Vec<u8>, LoadOptionError> {
        let list_len = self.file_paths.encoded_len();
        let list_len16 = u16::try_from(list_len)
            .map_err(|_| LoadOptionError::FilePathListTooLong { len: list_len })?;
        let desc_units = self.description.encode_utf16().count() + 1;

        let mut out = Vec::new();
        out.try_reserve_exact(HEADER_SIZE + 2 * desc_units + list_len + self.optional_data.len())
            .map_err(oom)?;
        out.extend_from_slice(&self.attributes.bits().to_le_bytes());
        out.extend_from_slice(&list_len16.to_le_bytes());
        for unit in self.description.encode_utf16().chain(core::iter::once(0)) {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        self.file_paths.write_to(&mut out);
        out.extend_from_slice(&self.optional_data);
        Ok(out)
    }

    /// Returns `true` if the option is offered for booting.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.attributes.contains(LoadOptionAttributes::ACTIVE)
    }

    /// Returns a copy of the path selected by `guid`; see
    /// [`FilePathList::device_path_for`].
    ///
    /// # Errors
    ///
    /// Returns [`LoadOptionError::DevicePath`] if allocation fails.
    pub fn device_path_for(&self, guid: Option<&Guid>) -> Result<Option<DevicePath>, LoadOptionError> {
        let found = self.file_paths.device_path_for(guid)?;
        if found.is_none() {
            log::debug!("loadopt: no matching path in \"{}\"", self.description);
        }
        Ok(found)
    }
}

/// Decodes UTF-16LE, replacing unpaired surrogates.
fn decode_description(bytes: &[u8]) -> Result<String, LoadOptionError> {
    let mut out = String::new();
    out.try_reserve(bytes.len() / 2).map_err(oom)?;
    let units = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]));
    for c in char::decode_utf16(units) {
        out.push(c.unwrap_or(char::REPLACEMENT_CHARACTER));
    }
    Ok(out)
}
