//! Device path nodes: header decoding, type constants and owned nodes.
//!
//! Every node starts with a 4-byte header: Type, SubType and a little-endian
//! 16-bit Length that includes the header itself. The payload follows.

use alloc::boxed::Box;

use crate::path::DevicePath;
use crate::{DevicePathError, NODE_HEADER_SIZE, try_vec};

/// Device path node type constants.
pub mod node_type {
    /// Hardware Device Path.
    pub const HARDWARE: u8 = 0x01;
    /// ACPI Device Path.
    pub const ACPI: u8 = 0x02;
    /// Messaging Device Path.
    pub const MESSAGING: u8 = 0x03;
    /// Media Device Path.
    pub const MEDIA: u8 = 0x04;
    /// BIOS Boot Specification Device Path.
    pub const BIOS_BOOT_SPEC: u8 = 0x05;
    /// End of Hardware Device Path.
    pub const END: u8 = 0x7F;
}

/// Device path node subtype constants, grouped by node type.
pub mod sub_type {
    // ── End ──────────────────────────────────────────────────────────

    /// End this instance and start a new one.
    pub const END_INSTANCE: u8 = 0x01;
    /// End of the entire device path.
    pub const END_ENTIRE: u8 = 0xFF;

    // ── Hardware ─────────────────────────────────────────────────────

    /// Memory-mapped range.
    pub const MEMORY_MAPPED: u8 = 0x03;
    /// Vendor-defined hardware node.
    pub const HW_VENDOR: u8 = 0x04;
    /// Controller number.
    pub const CONTROLLER: u8 = 0x05;

    // ── Messaging ────────────────────────────────────────────────────

    /// USB port.
    pub const MSG_USB: u8 = 0x05;
    /// MAC address.
    pub const MSG_MAC_ADDR: u8 = 0x0B;
    /// IPv4 endpoint.
    pub const MSG_IPV4: u8 = 0x0C;
    /// UART.
    pub const MSG_UART: u8 = 0x0E;
    /// USB device identified by its World Wide ID.
    pub const MSG_USB_WWID: u8 = 0x10;
    /// SATA port.
    pub const MSG_SATA: u8 = 0x12;
    /// NVM Express namespace.
    pub const MSG_NVME: u8 = 0x17;
    /// Uniform Resource Identifier.
    pub const MSG_URI: u8 = 0x18;
    /// SD card slot.
    pub const MSG_SD: u8 = 0x1A;
    /// eMMC slot.
    pub const MSG_EMMC: u8 = 0x1D;

    // ── Media ────────────────────────────────────────────────────────

    /// Hard drive partition.
    pub const HARD_DRIVE: u8 = 0x01;
    /// El Torito CD-ROM boot entry.
    pub const CDROM: u8 = 0x02;
    /// Vendor-defined media node.
    pub const MEDIA_VENDOR: u8 = 0x03;
    /// File path.
    pub const FILE_PATH: u8 = 0x04;
}

/// The two kinds of end node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndKind {
    /// Separates two instances of a multi-instance path.
    Instance,
    /// Terminates the whole buffer.
    Entire,
}

impl EndKind {
    /// Returns the SubType byte for this end node.
    #[must_use]
    pub const fn sub_type(self) -> u8 {
        match self {
            Self::Instance => sub_type::END_INSTANCE,
            Self::Entire => sub_type::END_ENTIRE,
        }
    }

    /// Returns the complete 4-byte encoding of this end node.
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 4] {
        [node_type::END, self.sub_type(), 0x04, 0x00]
    }
}

// ---- Little-endian field helpers ------------------------------------------

/// Reads a little-endian `u16` at `offset` in `data`.
pub(crate) fn read_u16_at(data: &[u8], offset: usize) -> Option<u16> {
    let bytes: [u8; 2] = data.get(offset..offset + 2)?.try_into().ok()?;
    Some(u16::from_le_bytes(bytes))
}

/// Reads a little-endian `u32` at `offset` in `data`.
pub(crate) fn read_u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

/// Reads a little-endian `u64` at `offset` in `data`.
pub(crate) fn read_u64_at(data: &[u8], offset: usize) -> Option<u64> {
    let bytes: [u8; 8] = data.get(offset..offset + 8)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

// ---- DevicePathNode -------------------------------------------------------

/// A single decoded node borrowed from a device path buffer.
///
/// The slice covers exactly `length` bytes: the header and the payload.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DevicePathNode<'a> {
    bytes: &'a [u8],
}

impl<'a> DevicePathNode<'a> {
    /// Decodes the node at the start of `data`.
    ///
    /// Only the header and the declared length are checked; the payload is
    /// not interpreted.
    ///
    /// # Errors
    ///
    /// Returns [`DevicePathError::Truncated`] if `data` is shorter than the
    /// header or the declared length, and [`DevicePathError::NodeTooShort`]
    /// if the declared length is below 4.
    pub fn parse(data: &'a [u8]) -> Result<Self, DevicePathError> {
        let length = read_u16_at(data, 2).ok_or(DevicePathError::Truncated { offset: 0 })?;
        if usize::from(length) < NODE_HEADER_SIZE {
            return Err(DevicePathError::NodeTooShort { offset: 0, length });
        }
        let bytes = data
            .get(..usize::from(length))
            .ok_or(DevicePathError::Truncated { offset: 0 })?;
        Ok(Self { bytes })
    }

    /// Reads the node at `offset`, or `None` if it does not fit.
    pub(crate) fn read_at(data: &'a [u8], offset: usize) -> Option<Self> {
        let length = usize::from(read_u16_at(data, offset.checked_add(2)?)?);
        if length < NODE_HEADER_SIZE {
            return None;
        }
        let bytes = data.get(offset..offset.checked_add(length)?)?;
        Some(Self { bytes })
    }

    /// Returns the node Type byte.
    #[must_use]
    pub fn node_type(&self) -> u8 {
        self.bytes[0]
    }

    /// Returns the node SubType byte.
    #[must_use]
    pub fn sub_type(&self) -> u8 {
        self.bytes[1]
    }

    /// Returns the declared node length, header included.
    #[must_use]
    pub fn length(&self) -> u16 {
        u16::from_le_bytes([self.bytes[2], self.bytes[3]])
    }

    /// Returns the payload following the header.
    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[NODE_HEADER_SIZE..]
    }

    /// Returns the raw node bytes, header included.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns `true` if this node has the given type and subtype.
    #[must_use]
    pub fn is(&self, node_type: u8, sub_type: u8) -> bool {
        self.node_type() == node_type && self.sub_type() == sub_type
    }

    /// Returns `true` for either kind of end node.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.node_type() == node_type::END
    }

    /// Returns `true` if this node terminates the entire path.
    #[must_use]
    pub fn is_end_entire(&self) -> bool {
        self.is(node_type::END, sub_type::END_ENTIRE)
    }

    /// Returns `true` if this node separates two instances.
    #[must_use]
    pub fn is_end_instance(&self) -> bool {
        self.is(node_type::END, sub_type::END_INSTANCE)
    }
}

impl core::fmt::Debug for DevicePathNode<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DevicePathNode")
            .field("type", &self.node_type())
            .field("sub_type", &self.sub_type())
            .field("length", &self.length())
            .finish_non_exhaustive()
    }
}

// ---- NodeBuf --------------------------------------------------------------

/// An owned, heap-allocated single node.
///
/// Produced by [`create_node`] and by the encoders in [`crate::build`].
#[derive(PartialEq, Eq)]
pub struct NodeBuf {
    bytes: Box<[u8]>,
}

impl NodeBuf {
    /// Allocates a node whose payload is a copy of `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`DevicePathError::NodeTooLong`] if the node would exceed
    /// `u16::MAX` bytes, or [`DevicePathError::OutOfMemory`].
    pub fn with_payload(
        node_type: u8,
        sub_type: u8,
        payload: &[u8],
    ) -> Result<Self, DevicePathError> {
        let length = payload.len() + NODE_HEADER_SIZE;
        let length16 =
            u16::try_from(length).map_err(|_| DevicePathError::NodeTooLong { length })?;
        let mut node = create_node(node_type, sub_type, length16)?;
        node.payload_mut().copy_from_slice(payload);
        Ok(node)
    }

    /// Borrows this node as a decoded view.
    #[must_use]
    pub fn as_node(&self) -> DevicePathNode<'_> {
        DevicePathNode { bytes: &self.bytes }
    }

    /// Returns the mutable payload, for encoders filling in content.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[NODE_HEADER_SIZE..]
    }

    /// Returns the raw node bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Wraps this node in a one-node path terminated by `EndEntire`.
    ///
    /// # Errors
    ///
    /// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
    pub fn to_path(&self) -> Result<DevicePath, DevicePathError> {
        crate::compose::append_node(None, Some(self.as_node()))
    }
}

impl core::fmt::Debug for NodeBuf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.as_node().fmt(f)
    }
}

/// Allocates a zero-filled node of `length` bytes with its header set.
///
/// # Errors
///
/// Returns [`DevicePathError::NodeTooShort`] if `length` is below the
/// 4-byte header, or [`DevicePathError::OutOfMemory`].
pub fn create_node(node_type: u8, sub_type: u8, length: u16) -> Result<NodeBuf, DevicePathError> {
    let len = usize::from(length);
    if len < NODE_HEADER_SIZE {
        return Err(DevicePathError::NodeTooShort { offset: 0, length });
    }
    let mut buf = try_vec(len)?;
    buf.resize(len, 0);
    buf[0] = node_type;
    buf[1] = sub_type;
    buf[2..4].copy_from_slice(&length.to_le_bytes());
    Ok(NodeBuf {
        bytes: buf.into_boxed_slice(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_kind_encoding() {
        assert_eq!(EndKind::Entire.to_bytes(), [0x7f, 0xff, 4, 0]);
        assert_eq!(EndKind::Instance.to_bytes(), [0x7f, 0x01, 4, 0]);
    }

    #[test]
    fn parse_reads_header() {
        let data = [0x04, 0x04, 0x06, 0x00, b'a', 0x00, 0xaa];
        let node = DevicePathNode::parse(&data).unwrap();
        assert_eq!(node.node_type(), node_type::MEDIA);
        assert_eq!(node.sub_type(), sub_type::FILE_PATH);
        assert_eq!(node.length(), 6);
        assert_eq!(node.payload(), &[b'a', 0]);
        assert!(!node.is_end());
    }

    #[test]
    fn parse_rejects_short_length() {
        let data = [0x01, 0x01, 0x03, 0x00, 0, 0, 0, 0];
        assert_eq!(
            DevicePathNode::parse(&data),
            Err(DevicePathError::NodeTooShort { offset: 0, length: 3 })
        );
    }

    #[test]
    fn parse_rejects_overlong_length() {
        let data = [0x01, 0x01, 0x10, 0x00, 0, 0];
        assert_eq!(
            DevicePathNode::parse(&data),
            Err(DevicePathError::Truncated { offset: 0 })
        );
        assert_eq!(
            DevicePathNode::parse(&data[..3]),
            Err(DevicePathError::Truncated { offset: 0 })
        );
    }

    #[test]
    fn read_at_never_overreads() {
        let data = [0x7f, 0xff, 0x04, 0x00];
        assert!(DevicePathNode::read_at(&data, 0).is_some());
        assert!(DevicePathNode::read_at(&data, 1).is_none());
        assert!(DevicePathNode::read_at(&data, usize::MAX - 1).is_none());
    }

    #[test]
    fn create_node_zero_fills() {
        let node = create_node(0x03, 0x0b, 37).unwrap();
        assert_eq!(node.as_bytes().len(), 37);
        assert_eq!(&node.as_bytes()[..4], &[0x03, 0x0b, 37, 0]);
        assert!(node.as_node().payload().iter().all(|&b| b == 0));
    }

    #[test]
    fn create_node_rejects_below_header() {
        assert_eq!(
            create_node(0x01, 0x01, 3),
            Err(DevicePathError::NodeTooShort { offset: 0, length: 3 })
        );
        assert!(create_node(0x01, 0x01, 4).is_ok());
    }

    #[test]
    fn with_payload_rejects_oversized() {
        let big = alloc::vec![0u8; usize::from(u16::MAX)];
        assert_eq!(
            NodeBuf::with_payload(0x04, 0x04, &big),
            Err(DevicePathError::NodeTooLong {
                length: usize::from(u16::MAX) + 4
            })
        );
    }

    #[test]
    fn node_to_path() {
        let node = NodeBuf::with_payload(0x01, 0x05, &[7, 0, 0, 0]).unwrap();
        let path = node.to_path().unwrap();
        assert_eq!(
            path.as_bytes(),
            &[0x01, 0x05, 8, 0, 7, 0, 0, 0, 0x7f, 0xff, 4, 0]
        );
    }
}
