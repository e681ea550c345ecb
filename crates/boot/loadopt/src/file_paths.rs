//! File path lists: the boot path plus GUID-tagged sub-paths.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::iter::FusedIterator;

use bootpath_devpath::node::{node_type, sub_type};
use bootpath_devpath::{
    ConcatMode, DevicePath, DevicePathError, DevicePathView, END_NODE_SIZE, build, concat,
};
use uguid::Guid;

use crate::LoadOptionError;

/// The device paths of a load option, packed back to back.
///
/// Only the first path, the one naming the image to start, is validated
/// when the list is parsed. The sub-paths after it are validated as they
/// are visited, so a damaged sub-path leaves the option bootable.
#[derive(Debug, PartialEq, Eq)]
pub struct FilePathList {
    boot: DevicePath,
    rest: Box<[u8]>,
}

impl FilePathList {
    /// Parses a packed file path list.
    ///
    /// # Errors
    ///
    /// Returns [`LoadOptionError::NoDevicePath`] if `data` cannot hold a
    /// node, and [`LoadOptionError::DevicePath`] if the boot path is
    /// malformed or allocation fails.
    pub fn parse(data: &[u8]) -> Result<Self, LoadOptionError> {
        if data.len() < END_NODE_SIZE {
            return Err(LoadOptionError::NoDevicePath);
        }
        let boot = DevicePathView::parse(data)?;
        let tail = &data[boot.total_len()..];
        let mut rest = Vec::new();
        rest.try_reserve_exact(tail.len())
            .map_err(|_| DevicePathError::OutOfMemory)?;
        rest.extend_from_slice(tail);
        Ok(Self {
            boot: boot.dup()?,
            rest: rest.into_boxed_slice(),
        })
    }

    /// Builds a list from a boot path and optional initrd and device tree
    /// paths, tagging each sub-path with its Vendor Media node.
    ///
    /// # Errors
    ///
    /// Returns [`LoadOptionError::DevicePath`] if allocation fails.
    pub fn join(
        boot: DevicePathView<'_>,
        initrd: Option<DevicePathView<'_>>,
        fdt: Option<DevicePathView<'_>>,
    ) -> Result<Self, LoadOptionError> {
        let mut rest = Vec::new();
        for (guid, sub) in [(crate::INITRD_MEDIA_GUID, initrd), (crate::FDT_GUID, fdt)] {
            let Some(sub) = sub else { continue };
            let tag = build::vendor_media(guid, &[])?.to_path()?;
            let tagged = concat(Some(tag.view()), Some(sub), ConcatMode::Merge)?;
            rest.try_reserve(tagged.as_bytes().len())
                .map_err(|_| DevicePathError::OutOfMemory)?;
            rest.extend_from_slice(tagged.as_bytes());
        }
        Ok(Self {
            boot: boot.dup()?,
            rest: rest.into_boxed_slice(),
        })
    }

    /// Returns the path of the image to start.
    #[must_use]
    pub fn boot_path(&self) -> DevicePathView<'_> {
        self.boot.view()
    }

    /// Iterates over the boot path and every well-formed sub-path after
    /// it, stopping at the first malformed one.
    #[must_use]
    pub fn paths(&self) -> FilePaths<'_> {
        FilePaths {
            boot: Some(self.boot.view()),
            rest: &self.rest,
        }
    }

    /// Returns the encoded length of the list.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.boot.as_bytes().len() + self.rest.len()
    }

    /// Appends the encoded list to `out`.
    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.boot.as_bytes());
        out.extend_from_slice(&self.rest);
    }

    /// Returns a copy of the path selected by `guid`.
    ///
    /// `None` selects the boot path. Otherwise the nodes following the
    /// Vendor Media node tagged with `guid` are returned, or `None` if no
    /// such node exists or nothing follows it.
    ///
    /// # Errors
    ///
    /// Returns [`LoadOptionError::DevicePath`] if allocation fails.
    pub fn device_path_for(&self, guid: Option<&Guid>) -> Result<Option<DevicePath>, LoadOptionError> {
        let Some(guid) = guid else {
            return Ok(Some(self.boot.dup()?));
        };
        let tag = guid.to_bytes();
        for path in self.paths() {
            let mut cursor = Some(path);
            while let Some(view) = cursor {
                let node = view.first_node();
                if node.is(node_type::MEDIA, sub_type::MEDIA_VENDOR)
                    && node.payload().starts_with(&tag)
                {
                    return match view.next() {
                        Some(sub) => Ok(Some(sub.dup()?)),
                        None => Ok(None),
                    };
                }
                cursor = view.next();
            }
        }
        log::debug!("loadopt: VenMedia({}) not found", guid);
        Ok(None)
    }
}

/// Iterator returned by [`FilePathList::paths`].
pub struct FilePaths<'a> {
    boot: Option<DevicePathView<'a>>,
    rest: &'a [u8],
}

impl<'a> Iterator for FilePaths<'a> {
    type Item = DevicePathView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(boot) = self.boot.take() {
            return Some(boot);
        }
        if self.rest.len() < END_NODE_SIZE {
            return None;
        }
        match DevicePathView::parse(self.rest) {
            Ok(view) => {
                self.rest = &self.rest[view.total_len()..];
                Some(view)
            }
            Err(err) => {
                log::debug!("loadopt: file path list ends at a malformed sub-path: {}", err);
                self.rest = &[];
                None
            }
        }
    }
}

impl FusedIterator for FilePaths<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FDT_GUID, INITRD_MEDIA_GUID};

    fn file(path: &str) -> DevicePath {
        build::file_path(path).unwrap().to_path().unwrap()
    }

    #[test]
    fn parse_keeps_sub_paths() {
        let boot = file("\\EFI\\BOOT\\BOOTX64.EFI");
        let initrd = file("\\initrd.img");
        let joined = FilePathList::join(boot.view(), Some(initrd.view()), None).unwrap();

        let mut bytes = Vec::new();
        joined.write_to(&mut bytes);
        assert_eq!(bytes.len(), joined.encoded_len());

        let parsed = FilePathList::parse(&bytes).unwrap();
        assert_eq!(parsed, joined);
        assert_eq!(parsed.boot_path(), boot.view());
        assert_eq!(parsed.paths().count(), 2);
    }

    #[test]
    fn ven_media_selects_sub_path() {
        let boot = file("\\vmlinuz");
        let initrd = file("\\initrd.img");
        let fdt = file("\\board.dtb");
        let list =
            FilePathList::join(boot.view(), Some(initrd.view()), Some(fdt.view())).unwrap();

        assert_eq!(list.device_path_for(None).unwrap(), Some(boot.dup().unwrap()));
        assert_eq!(
            list.device_path_for(Some(&INITRD_MEDIA_GUID)).unwrap(),
            Some(initrd.dup().unwrap())
        );
        assert_eq!(
            list.device_path_for(Some(&FDT_GUID)).unwrap(),
            Some(fdt.dup().unwrap())
        );
    }

    #[test]
    fn missing_sub_path_is_none() {
        let boot = file("\\vmlinuz");
        let list = FilePathList::join(boot.view(), None, None).unwrap();
        assert_eq!(list.paths().count(), 1);
        assert_eq!(list.device_path_for(Some(&INITRD_MEDIA_GUID)).unwrap(), None);
    }

    #[test]
    fn bare_tag_is_none() {
        let boot = file("\\vmlinuz");
        let empty = DevicePath::end().unwrap();
        let list = FilePathList::join(boot.view(), Some(empty.view()), None).unwrap();
        assert_eq!(list.paths().count(), 2);
        assert_eq!(list.device_path_for(Some(&INITRD_MEDIA_GUID)).unwrap(), None);
    }

    #[test]
    fn malformed_sub_path_stops_scan() {
        let boot = file("\\vmlinuz");
        let fdt = file("\\board.dtb");
        let good = FilePathList::join(boot.view(), None, Some(fdt.view())).unwrap();
        let mut bytes = Vec::new();
        good.write_to(&mut bytes);

        // Insert a node claiming length 3 between the boot path and the
        // device tree sub-path.
        let boot_len = boot.as_bytes().len();
        let mut corrupted = bytes[..boot_len].to_vec();
        corrupted.extend_from_slice(&[0x04, 0x03, 0x03, 0x00]);
        corrupted.extend_from_slice(&bytes[boot_len..]);

        let list = FilePathList::parse(&corrupted).unwrap();
        assert_eq!(list.paths().count(), 1);
        assert_eq!(list.device_path_for(Some(&FDT_GUID)).unwrap(), None);
        assert_eq!(list.device_path_for(None).unwrap(), Some(boot.dup().unwrap()));
    }

    #[test]
    fn parse_rejects_bad_boot_path() {
        assert_eq!(
            FilePathList::parse(&[0x7f, 0xff]),
            Err(LoadOptionError::NoDevicePath)
        );
        assert_eq!(
            FilePathList::parse(&[0x04, 0x04, 0x03, 0x00]),
            Err(LoadOptionError::DevicePath(DevicePathError::NodeTooShort {
                offset: 0,
                length: 3
            }))
        );
    }
}
