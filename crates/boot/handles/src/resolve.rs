//! Longest-prefix resolution of device paths to live objects.

use bootpath_devpath::{DevicePathView, shorten};
use uguid::Guid;

use crate::table::ObjectTable;
use crate::{Handle, HandleError};

/// Knobs for [`ObjectTable::find_obj_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    /// Retry with the short form of every object's path when no full path
    /// matches.
    pub short_form_fallback: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            short_form_fallback: true,
        }
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved<'p> {
    /// The object that serves the path.
    pub handle: Handle,
    /// The part of the searched path after the object's own path, when it
    /// was requested.
    pub remaining: Option<DevicePathView<'p>>,
}

impl ObjectTable {
    /// Finds the object whose device path serves `dp`, with default
    /// [`FindOptions`].
    ///
    /// Only the first instance of each path takes part. With `want_rem`
    /// unset the object's path must equal `dp`; with it set the longest
    /// object path that is a prefix of `dp` wins and the rest of `dp` is
    /// returned in [`Resolved::remaining`]. Only objects exposing
    /// `capability` are considered, or every object if it is `None`.
    #[must_use]
    pub fn find_obj<'p>(
        &self,
        dp: DevicePathView<'p>,
        capability: Option<&Guid>,
        want_rem: bool,
    ) -> Option<Resolved<'p>> {
        self.find_obj_with(dp, capability, want_rem, FindOptions::default())
    }

    /// [`find_obj`](Self::find_obj) with explicit options.
    #[must_use]
    pub fn find_obj_with<'p>(
        &self,
        dp: DevicePathView<'p>,
        capability: Option<&Guid>,
        want_rem: bool,
        options: FindOptions,
    ) -> Option<Resolved<'p>> {
        self.find_handle(dp, capability, false, want_rem)
            .or_else(|| {
                if options.short_form_fallback {
                    self.find_handle(dp, capability, true, want_rem)
                } else {
                    None
                }
            })
    }

    fn find_handle<'p>(
        &self,
        dp: DevicePathView<'p>,
        capability: Option<&Guid>,
        short_form: bool,
        want_rem: bool,
    ) -> Option<Resolved<'p>> {
        let target = dp.instance_bytes();
        let mut best: Option<(Handle, usize)> = None;

        for (handle, obj_path) in self.candidates(capability) {
            let obj_path = if short_form {
                match shorten(obj_path) {
                    Some(short) => short,
                    None => continue,
                }
            } else {
                obj_path
            };
            let candidate = obj_path.instance_bytes();
            let fits = if want_rem {
                candidate.len() <= target.len()
            } else {
                candidate.len() == target.len()
            };
            if !fits || !target.starts_with(candidate) {
                continue;
            }
            // An empty object path never wins, and ties go to the earlier
            // object.
            if candidate.len() > best.map_or(0, |(_, len)| len) {
                log::trace!(
                    "handles: {} matches {} bytes{}",
                    handle,
                    candidate.len(),
                    if short_form { " (short form)" } else { "" }
                );
                best = Some((handle, candidate.len()));
            }
        }

        let (handle, len) = best?;
        let remaining = if want_rem {
            Some(dp.strip_prefix(&target[..len])?)
        } else {
            None
        };
        Some(Resolved { handle, remaining })
    }

    /// `LocateDevicePath`: finds the object exposing `protocol` whose whole
    /// device path, every instance included, is the longest byte prefix of
    /// `dp`, and returns it with the rest of `dp`.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::NotFound`] if no object qualifies.
    pub fn locate_device_path<'p>(
        &self,
        protocol: &Guid,
        dp: DevicePathView<'p>,
    ) -> Result<Resolved<'p>, HandleError> {
        let target = dp.node_bytes();
        let mut best: Option<(Handle, usize)> = None;

        for (handle, obj_path) in self.candidates(Some(protocol)) {
            let candidate = obj_path.node_bytes();
            let best_len = best.map_or(0, |(_, len)| len);
            if candidate.len() <= best_len || candidate.len() > target.len() {
                continue;
            }
            if target.starts_with(candidate) {
                best = Some((handle, candidate.len()));
            }
        }

        let Some((handle, len)) = best else {
            log::trace!("handles: no {} object serves {}", protocol, dp);
            return Err(HandleError::NotFound);
        };
        let remaining = dp.strip_prefix(&target[..len]).ok_or(HandleError::NotFound)?;
        Ok(Resolved {
            handle,
            remaining: Some(remaining),
        })
    }
}
