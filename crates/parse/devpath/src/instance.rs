//! Multi-instance paths: detection and splitting into standalone paths.

use core::iter::FusedIterator;

use crate::compose::{Joint, assemble};
use crate::path::{DevicePath, DevicePathView};
use crate::{DevicePathError, END_NODE_SIZE};

/// Returns `true` if `dp` holds more than one instance.
#[must_use]
pub fn is_multi_instance(dp: DevicePathView<'_>) -> bool {
    dp.is_multi_instance()
}

/// Takes the first instance off `cursor`.
///
/// The instance is copied into a standalone path terminated by `EndEntire`
/// and returned with its size, end node included. The cursor then moves past
/// the consumed end node, becoming `None` once the final instance is taken.
/// A `None` cursor yields `Ok(None)`.
///
/// # Errors
///
/// Returns [`DevicePathError::OutOfMemory`] if allocation fails; the cursor
/// is left where it was.
pub fn get_next_instance<'a>(
    cursor: &mut Option<DevicePathView<'a>>,
) -> Result<Option<(DevicePath, usize)>, DevicePathError> {
    let Some(view) = *cursor else {
        return Ok(None);
    };
    let instance = assemble(view.instance_bytes(), Joint::Merge, &[])?;
    let size = view.instance_size() + END_NODE_SIZE;
    *cursor = view.next_instance_view();
    Ok(Some((instance, size)))
}

/// Iterator over the instances of a path, each copied into its own buffer.
///
/// Yields at most one error, after which it is exhausted.
pub struct Instances<'a> {
    cursor: Option<DevicePathView<'a>>,
}

impl Iterator for Instances<'_> {
    type Item = Result<DevicePath, DevicePathError>;

    fn next(&mut self) -> Option<Self::Item> {
        match get_next_instance(&mut self.cursor) {
            Ok(Some((instance, _))) => Some(Ok(instance)),
            Ok(None) => None,
            Err(err) => {
                self.cursor = None;
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for Instances<'_> {}

impl<'a> DevicePathView<'a> {
    /// Iterates over the instances of this path.
    #[must_use]
    pub fn instances(&self) -> Instances<'a> {
        Instances {
            cursor: Some(*self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{emit_end, emit_end_instance, emit_node, simple_path};
    use alloc::vec::Vec;

    #[test]
    fn single_instance() {
        let v = simple_path(&[1, 2]);
        let view = DevicePathView::parse(&v).unwrap();
        assert!(!is_multi_instance(view));

        let mut cursor = Some(view);
        let (inst, size) = get_next_instance(&mut cursor).unwrap().unwrap();
        assert_eq!(inst.as_bytes(), v.as_slice());
        assert_eq!(size, 20);
        assert!(cursor.is_none());
        assert!(get_next_instance(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn splits_every_instance() {
        let mut v = Vec::new();
        emit_node(&mut v, 0x01, 0x05, &[1, 0, 0, 0]);
        emit_end_instance(&mut v);
        emit_node(&mut v, 0x01, 0x05, &[2, 0, 0, 0]);
        emit_node(&mut v, 0x01, 0x05, &[3, 0, 0, 0]);
        emit_end_instance(&mut v);
        emit_node(&mut v, 0x01, 0x05, &[4, 0, 0, 0]);
        emit_end(&mut v);
        let view = DevicePathView::parse(&v).unwrap();
        assert!(is_multi_instance(view));

        let mut cursor = Some(view);
        let mut sizes = Vec::new();
        let mut parts = Vec::new();
        while let Some((inst, size)) = get_next_instance(&mut cursor).unwrap() {
            sizes.push(size);
            parts.push(inst);
        }
        assert_eq!(sizes, [12, 20, 12]);
        assert_eq!(parts[0].as_bytes(), simple_path(&[1]).as_slice());
        assert_eq!(parts[1].as_bytes(), simple_path(&[2, 3]).as_slice());
        assert_eq!(parts[2].as_bytes(), simple_path(&[4]).as_slice());
    }

    #[test]
    fn iterator_matches_cursor_loop() {
        let mut v = Vec::new();
        emit_node(&mut v, 0x01, 0x05, &[1, 0, 0, 0]);
        emit_end_instance(&mut v);
        emit_end(&mut v);
        let view = DevicePathView::parse(&v).unwrap();
        let parts: Vec<DevicePath> = view.instances().map(Result::unwrap).collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].as_bytes(), simple_path(&[1]).as_slice());
        assert!(parts[1].view().is_empty());
    }
}
