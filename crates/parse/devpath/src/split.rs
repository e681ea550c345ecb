//! Short-form matching, device/file splitting and GPT node search.

use crate::compose::{Joint, assemble};
use crate::node::{DevicePathNode, node_type, sub_type};
use crate::path::{DevicePath, DevicePathView};
use crate::DevicePathError;

/// Partition format of a GPT disk in a Hard Drive node.
pub const PART_FORMAT_GPT: u8 = 0x02;
/// Signature type of a GUID-signed partition in a Hard Drive node.
pub const SIG_TYPE_GUID: u8 = 0x02;

/// Offsets of the format and signature type bytes in a Hard Drive payload.
const HD_FORMAT_OFFSET: usize = 36;
const HD_SIG_TYPE_OFFSET: usize = 37;

/// Node kinds that identify a device independent of the slot or port it
/// is attached through.
fn is_slot_independent(node: DevicePathNode<'_>) -> bool {
    node.is(node_type::MESSAGING, sub_type::MSG_USB_WWID)
        || node.is(node_type::MEDIA, sub_type::HARD_DRIVE)
        || node.is(node_type::MEDIA, sub_type::FILE_PATH)
}

/// Returns the first node position that satisfies `pred`, as a view.
fn find_view<'a>(
    dp: DevicePathView<'a>,
    mut pred: impl FnMut(DevicePathNode<'a>) -> bool,
) -> Option<DevicePathView<'a>> {
    let mut cursor = Some(dp);
    while let Some(view) = cursor {
        if pred(view.first_node()) {
            return Some(view);
        }
        cursor = view.next();
    }
    None
}

/// Returns the short form of `dp`: a view starting at its first USB WWID,
/// Hard Drive or File Path node, or `None` if it has none.
#[must_use]
pub fn shorten(dp: DevicePathView<'_>) -> Option<DevicePathView<'_>> {
    find_view(dp, is_slot_independent)
}

/// Splits `full` at its first File Path node.
///
/// Returns the device part, re-terminated, and a copy of everything from
/// the File Path node onwards. Without a File Path node the device part is
/// a copy of the whole path and the file part is `None`.
///
/// # Errors
///
/// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn split_file_path(
    full: DevicePathView<'_>,
) -> Result<(DevicePath, Option<DevicePath>), DevicePathError> {
    let Some(file) = find_view(full, |node| node.is(node_type::MEDIA, sub_type::FILE_PATH)) else {
        return Ok((full.dup()?, None));
    };
    let boundary = full.total_len() - file.total_len();
    let device = assemble(&full.as_bytes()[..boundary], Joint::Merge, &[])?;
    Ok((device, Some(file.dup()?)))
}

/// Returns the first Hard Drive node that describes a GPT partition with a
/// GUID signature.
#[must_use]
pub fn find_gpt_partition_node(dp: DevicePathView<'_>) -> Option<DevicePathNode<'_>> {
    dp.nodes().find(|node| {
        let payload = node.payload();
        node.is(node_type::MEDIA, sub_type::HARD_DRIVE)
            && payload.get(HD_FORMAT_OFFSET) == Some(&PART_FORMAT_GPT)
            && payload.get(HD_SIG_TYPE_OFFSET) == Some(&SIG_TYPE_GUID)
    })
}
