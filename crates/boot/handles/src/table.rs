//! The table of live objects and their installed protocols.

use alloc::vec::Vec;
use core::num::NonZeroUsize;

use bootpath_devpath::{DevicePath, DevicePathError, DevicePathView};
use uguid::Guid;

use crate::{DEVICE_PATH_PROTOCOL_GUID, Handle, HandleError};

/// One live object.
struct Object {
    /// Identifier handed out by [`ObjectTable::create_object`].
    handle: Handle,
    /// Installed protocols other than the device path protocol.
    protocols: Vec<Guid>,
    /// Installed device path, if any.
    device_path: Option<DevicePath>,
}

impl Object {
    fn has_protocol(&self, guid: &Guid) -> bool {
        if *guid == DEVICE_PATH_PROTOCOL_GUID {
            self.device_path.is_some()
        } else {
            self.protocols.contains(guid)
        }
    }
}

/// Live objects in creation order.
///
/// Lookups that find several equally good objects return the one created
/// first.
#[derive(Default)]
pub struct ObjectTable {
    objects: Vec<Object>,
    created: usize,
}

impl ObjectTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            objects: Vec::new(),
            created: 0,
        }
    }

    /// Creates an object with no protocols and returns its handle.
    ///
    /// Handles are never reused within one table.
    pub fn create_object(&mut self) -> Handle {
        let handle = Handle(NonZeroUsize::MIN.saturating_add(self.created));
        self.created += 1;
        self.objects.push(Object {
            handle,
            protocols: Vec::new(),
            device_path: None,
        });
        log::trace!("handles: created object {}", handle);
        handle
    }

    fn object_mut(&mut self, handle: Handle) -> Result<&mut Object, HandleError> {
        self.objects
            .iter_mut()
            .find(|o| o.handle == handle)
            .ok_or(HandleError::InvalidHandle(handle))
    }

    fn object(&self, handle: Handle) -> Option<&Object> {
        self.objects.iter().find(|o| o.handle == handle)
    }

    /// Installs an interface-less protocol on `handle`.
    ///
    /// Device paths are installed with
    /// [`install_device_path`](Self::install_device_path); passing the
    /// device path protocol GUID here fails with
    /// [`DevicePathError::MissingPath`].
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::InvalidHandle`] for an unknown handle and
    /// [`HandleError::AlreadyInstalled`] if the protocol is present.
    pub fn install_protocol(&mut self, handle: Handle, guid: Guid) -> Result<(), HandleError> {
        if guid == DEVICE_PATH_PROTOCOL_GUID {
            return Err(DevicePathError::MissingPath.into());
        }
        let object = self.object_mut(handle)?;
        if object.protocols.contains(&guid) {
            return Err(HandleError::AlreadyInstalled(guid));
        }
        object.protocols.push(guid);
        log::debug!("handles: installed {} on {}", guid, handle);
        Ok(())
    }

    /// Installs the device path protocol on `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::InvalidHandle`] for an unknown handle and
    /// [`HandleError::AlreadyInstalled`] if the object already has a path.
    pub fn install_device_path(
        &mut self,
        handle: Handle,
        path: DevicePath,
    ) -> Result<(), HandleError> {
        let object = self.object_mut(handle)?;
        if object.device_path.is_some() {
            return Err(HandleError::AlreadyInstalled(DEVICE_PATH_PROTOCOL_GUID));
        }
        log::debug!("handles: installed device path {} on {}", path, handle);
        object.device_path = Some(path);
        Ok(())
    }

    /// Removes a protocol from `handle`. Uninstalling the device path
    /// protocol drops the installed path.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::InvalidHandle`] for an unknown handle and
    /// [`HandleError::NotFound`] if the protocol is not installed.
    pub fn uninstall_protocol(&mut self, handle: Handle, guid: &Guid) -> Result<(), HandleError> {
        let object = self.object_mut(handle)?;
        if *guid == DEVICE_PATH_PROTOCOL_GUID {
            object.device_path.take().ok_or(HandleError::NotFound)?;
        } else {
            let pos = object
                .protocols
                .iter()
                .position(|g| g == guid)
                .ok_or(HandleError::NotFound)?;
            object.protocols.remove(pos);
        }
        log::debug!("handles: uninstalled {} from {}", guid, handle);
        Ok(())
    }

    /// Removes an object and everything installed on it.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::InvalidHandle`] for an unknown handle.
    pub fn remove_object(&mut self, handle: Handle) -> Result<(), HandleError> {
        let pos = self
            .objects
            .iter()
            .position(|o| o.handle == handle)
            .ok_or(HandleError::InvalidHandle(handle))?;
        self.objects.remove(pos);
        log::trace!("handles: removed object {}", handle);
        Ok(())
    }

    /// Returns the device path installed on `handle`.
    #[must_use]
    pub fn device_path(&self, handle: Handle) -> Option<DevicePathView<'_>> {
        self.object(handle)?.device_path.as_ref().map(DevicePath::view)
    }

    /// Returns `true` if `guid` is installed on `handle`.
    #[must_use]
    pub fn has_protocol(&self, handle: Handle, guid: &Guid) -> bool {
        self.object(handle).is_some_and(|o| o.has_protocol(guid))
    }

    /// Iterates over live handles in creation order.
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.objects.iter().map(|o| o.handle)
    }

    /// Returns the number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the table holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects that carry a device path and expose `capability`, in
    /// creation order.
    pub(crate) fn candidates<'t>(
        &'t self,
        capability: Option<&'t Guid>,
    ) -> impl Iterator<Item = (Handle, DevicePathView<'t>)> + 't {
        self.objects
            .iter()
            .filter(move |o| capability.is_none_or(|g| o.has_protocol(g)))
            .filter_map(|o| Some((o.handle, o.device_path.as_ref()?.view())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootpath_devpath::build;
    use uguid::guid;

    const BLOCK_IO: Guid = guid!("964e5b21-6459-11d2-8e39-00a0c969723b");

    #[test]
    fn handles_are_unique() {
        let mut table = ObjectTable::new();
        let a = table.create_object();
        let b = table.create_object();
        assert_ne!(a, b);
        table.remove_object(a).unwrap();
        let c = table.create_object();
        assert_ne!(a, c);
        assert_eq!(table.handles().collect::<Vec<_>>(), [b, c]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn protocol_lifecycle() {
        let mut table = ObjectTable::new();
        let h = table.create_object();
        table.install_protocol(h, BLOCK_IO).unwrap();
        assert!(table.has_protocol(h, &BLOCK_IO));
        assert_eq!(
            table.install_protocol(h, BLOCK_IO),
            Err(HandleError::AlreadyInstalled(BLOCK_IO))
        );
        table.uninstall_protocol(h, &BLOCK_IO).unwrap();
        assert!(!table.has_protocol(h, &BLOCK_IO));
        assert_eq!(
            table.uninstall_protocol(h, &BLOCK_IO),
            Err(HandleError::NotFound)
        );
    }

    #[test]
    fn device_path_lifecycle() {
        let mut table = ObjectTable::new();
        let h = table.create_object();
        assert!(!table.has_protocol(h, &DEVICE_PATH_PROTOCOL_GUID));
        let path = build::controller(0).unwrap().to_path().unwrap();
        table.install_device_path(h, path.dup().unwrap()).unwrap();
        assert!(table.has_protocol(h, &DEVICE_PATH_PROTOCOL_GUID));
        assert_eq!(table.device_path(h), Some(path.view()));
        assert_eq!(
            table.install_device_path(h, path.dup().unwrap()),
            Err(HandleError::AlreadyInstalled(DEVICE_PATH_PROTOCOL_GUID))
        );
        table
            .uninstall_protocol(h, &DEVICE_PATH_PROTOCOL_GUID)
            .unwrap();
        assert!(table.device_path(h).is_none());
    }

    #[test]
    fn device_path_guid_needs_a_path() {
        let mut table = ObjectTable::new();
        let h = table.create_object();
        assert_eq!(
            table.install_protocol(h, DEVICE_PATH_PROTOCOL_GUID),
            Err(HandleError::DevicePath(DevicePathError::MissingPath))
        );
    }

    #[test]
    fn stale_handle_rejected() {
        let mut table = ObjectTable::new();
        let h = table.create_object();
        table.remove_object(h).unwrap();
        assert_eq!(table.remove_object(h), Err(HandleError::InvalidHandle(h)));
        assert_eq!(
            table.install_protocol(h, BLOCK_IO),
            Err(HandleError::InvalidHandle(h))
        );
        assert!(!table.has_protocol(h, &BLOCK_IO));
        assert!(table.is_empty());
    }
}
