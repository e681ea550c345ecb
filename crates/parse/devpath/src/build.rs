//! Node encoders: turn plain values into node content.
//!
//! The encoders never look at live devices. Callers that know a partition,
//! a MAC address or a memory range pass the values in and get a [`NodeBuf`]
//! back, which the composer then splices into a path. The `from_*` helpers
//! at the bottom combine encoders with the composer for the common cases.

use core::net::Ipv4Addr;

use alloc::vec::Vec;
use uguid::Guid;

use crate::compose::append_node;
use crate::node::{DevicePathNode, NodeBuf, node_type, read_u32_at, read_u64_at, sub_type};
use crate::path::{DevicePath, DevicePathView};
use crate::{DevicePathError, try_vec};

/// Largest URI, NUL terminator included, that [`from_http`] will encode.
pub const MAX_URI_LEN: usize = 128;

/// Width of the MAC address field in a MAC Address node.
pub const MAC_ADDR_FIELD_LEN: usize = 32;

/// IP protocol number for TCP.
pub const IP_PROTOCOL_TCP: u16 = 6;

const HTTP_SCHEME: &str = "http://";

// ---- Payload assembly -----------------------------------------------------

/// Accumulates a little-endian payload before it becomes a node.
struct Payload(Vec<u8>);

impl Payload {
    fn with_capacity(capacity: usize) -> Result<Self, DevicePathError> {
        try_vec(capacity).map(Self)
    }

    fn bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, DevicePathError> {
        self.0
            .try_reserve(bytes.len())
            .map_err(|_| DevicePathError::OutOfMemory)?;
        self.0.extend_from_slice(bytes);
        Ok(self)
    }

    fn u8(&mut self, v: u8) -> Result<&mut Self, DevicePathError> {
        self.bytes(&[v])
    }

    fn u16(&mut self, v: u16) -> Result<&mut Self, DevicePathError> {
        self.bytes(&v.to_le_bytes())
    }

    fn u32(&mut self, v: u32) -> Result<&mut Self, DevicePathError> {
        self.bytes(&v.to_le_bytes())
    }

    fn u64(&mut self, v: u64) -> Result<&mut Self, DevicePathError> {
        self.bytes(&v.to_le_bytes())
    }

    fn utf16(&mut self, s: &str) -> Result<&mut Self, DevicePathError> {
        for unit in s.encode_utf16() {
            self.u16(unit)?;
        }
        Ok(self)
    }

    fn finish(&self, node_type: u8, sub_type: u8) -> Result<NodeBuf, DevicePathError> {
        NodeBuf::with_payload(node_type, sub_type, &self.0)
    }
}

// ---- Hardware -------------------------------------------------------------

/// Memory-mapped range `[start, start + size)` of the given memory type.
///
/// # Errors
///
/// Returns [`DevicePathError::InvalidArgument`] if the range wraps the
/// address space.
pub fn memory_mapped(memory_type: u32, start: u64, size: u64) -> Result<NodeBuf, DevicePathError> {
    let Some(end) = start.checked_add(size) else {
        log::warn!("devpath: memory range {start:#x}+{size:#x} wraps");
        return Err(DevicePathError::InvalidArgument);
    };
    Payload::with_capacity(20)?
        .u32(memory_type)?
        .u64(start)?
        .u64(end)?
        .finish(node_type::HARDWARE, sub_type::MEMORY_MAPPED)
}

/// Vendor-defined hardware node.
///
/// # Errors
///
/// Returns [`DevicePathError::NodeTooLong`] if `data` does not fit.
pub fn vendor_hw(guid: Guid, data: &[u8]) -> Result<NodeBuf, DevicePathError> {
    vendor(node_type::HARDWARE, sub_type::HW_VENDOR, guid, data)
}

/// Controller number node.
///
/// # Errors
///
/// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn controller(number: u32) -> Result<NodeBuf, DevicePathError> {
    Payload::with_capacity(4)?
        .u32(number)?
        .finish(node_type::HARDWARE, sub_type::CONTROLLER)
}

// ---- Messaging ------------------------------------------------------------

/// MAC address node. The address is zero padded to 32 bytes.
///
/// # Errors
///
/// Returns [`DevicePathError::InvalidArgument`] if `mac` is longer than
/// [`MAC_ADDR_FIELD_LEN`].
pub fn mac_addr(mac: &[u8], if_type: u8) -> Result<NodeBuf, DevicePathError> {
    if mac.len() > MAC_ADDR_FIELD_LEN {
        log::warn!("devpath: {} byte MAC address rejected", mac.len());
        return Err(DevicePathError::InvalidArgument);
    }
    let mut field = [0u8; MAC_ADDR_FIELD_LEN];
    field[..mac.len()].copy_from_slice(mac);
    Payload::with_capacity(MAC_ADDR_FIELD_LEN + 1)?
        .bytes(&field)?
        .u8(if_type)?
        .finish(node_type::MESSAGING, sub_type::MSG_MAC_ADDR)
}

/// Content of an IPv4 node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4 {
    /// Local address.
    pub local: Ipv4Addr,
    /// Remote (server) address.
    pub remote: Ipv4Addr,
    /// Local port.
    pub local_port: u16,
    /// Remote port.
    pub remote_port: u16,
    /// IP protocol number.
    pub protocol: u16,
    /// `true` if the local address is static rather than from DHCP.
    pub static_ip: bool,
    /// Gateway address.
    pub gateway: Ipv4Addr,
    /// Subnet mask.
    pub subnet_mask: Ipv4Addr,
}

impl Ipv4 {
    /// A TCP endpoint with the given local address and mask, everything
    /// else unspecified.
    #[must_use]
    pub const fn tcp(local: Ipv4Addr, subnet_mask: Ipv4Addr) -> Self {
        Self {
            local,
            remote: Ipv4Addr::UNSPECIFIED,
            local_port: 0,
            remote_port: 0,
            protocol: IP_PROTOCOL_TCP,
            static_ip: false,
            gateway: Ipv4Addr::UNSPECIFIED,
            subnet_mask,
        }
    }
}

impl Default for Ipv4 {
    fn default() -> Self {
        Self::tcp(Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED)
    }
}

/// IPv4 node (27 bytes).
///
/// # Errors
///
/// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn ipv4(ip: &Ipv4) -> Result<NodeBuf, DevicePathError> {
    Payload::with_capacity(23)?
        .bytes(&ip.local.octets())?
        .bytes(&ip.remote.octets())?
        .u16(ip.local_port)?
        .u16(ip.remote_port)?
        .u16(ip.protocol)?
        .u8(u8::from(ip.static_ip))?
        .bytes(&ip.gateway.octets())?
        .bytes(&ip.subnet_mask.octets())?
        .finish(node_type::MESSAGING, sub_type::MSG_IPV4)
}

/// UART node with every setting left at its default.
///
/// # Errors
///
/// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn uart() -> Result<NodeBuf, DevicePathError> {
    Payload::with_capacity(15)?
        .u32(0)?
        .u64(0)?
        .u8(0)?
        .u8(0)?
        .u8(0)?
        .finish(node_type::MESSAGING, sub_type::MSG_UART)
}

/// USB device identified by interface, vendor, product and serial number.
///
/// # Errors
///
/// Returns [`DevicePathError::NodeTooLong`] if the serial does not fit.
pub fn usb_wwid(
    interface: u16,
    vendor_id: u16,
    product_id: u16,
    serial: &str,
) -> Result<NodeBuf, DevicePathError> {
    Payload::with_capacity(6 + 2 * serial.len())?
        .u16(interface)?
        .u16(vendor_id)?
        .u16(product_id)?
        .utf16(serial)?
        .finish(node_type::MESSAGING, sub_type::MSG_USB_WWID)
}

/// SD card slot.
///
/// # Errors
///
/// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn sd(slot: u8) -> Result<NodeBuf, DevicePathError> {
    NodeBuf::with_payload(node_type::MESSAGING, sub_type::MSG_SD, &[slot])
}

/// eMMC slot.
///
/// # Errors
///
/// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn emmc(slot: u8) -> Result<NodeBuf, DevicePathError> {
    NodeBuf::with_payload(node_type::MESSAGING, sub_type::MSG_EMMC, &[slot])
}

/// URI node. The URI is stored with a NUL terminator.
///
/// # Errors
///
/// Returns [`DevicePathError::NodeTooLong`] if the URI does not fit.
pub fn uri(uri: &str) -> Result<NodeBuf, DevicePathError> {
    Payload::with_capacity(uri.len() + 1)?
        .bytes(uri.as_bytes())?
        .u8(0)?
        .finish(node_type::MESSAGING, sub_type::MSG_URI)
}

// ---- Media ----------------------------------------------------------------

/// Partitioning scheme named by a Hard Drive node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PartitionFormat {
    /// Legacy MBR partition table.
    Mbr = 0x01,
    /// GUID partition table.
    Gpt = 0x02,
}

/// Disk signature carried by a Hard Drive node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionSignature {
    /// No signature.
    None,
    /// 32-bit MBR disk signature.
    Mbr(u32),
    /// GPT unique partition GUID.
    Guid(Guid),
}

impl PartitionSignature {
    const fn type_byte(&self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Mbr(_) => 0x01,
            Self::Guid(_) => 0x02,
        }
    }

    fn to_field(self) -> [u8; 16] {
        let mut field = [0u8; 16];
        match self {
            Self::None => {}
            Self::Mbr(sig) => field[..4].copy_from_slice(&sig.to_le_bytes()),
            Self::Guid(guid) => field = guid.to_bytes(),
        }
        field
    }
}

/// Content of a Hard Drive node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardDrive {
    /// One-based partition number; zero names the whole disk.
    pub partition_number: u32,
    /// First LBA of the partition.
    pub partition_start: u64,
    /// Partition size in blocks.
    pub partition_size: u64,
    /// Partition table format.
    pub format: PartitionFormat,
    /// Disk or partition signature.
    pub signature: PartitionSignature,
}

impl HardDrive {
    /// Decodes a Hard Drive node, or returns `None` for any other node or a
    /// payload with unknown format or signature type.
    #[must_use]
    pub fn from_node(node: DevicePathNode<'_>) -> Option<Self> {
        if !node.is(node_type::MEDIA, sub_type::HARD_DRIVE) {
            return None;
        }
        let p = node.payload();
        let field: [u8; 16] = p.get(20..36)?.try_into().ok()?;
        let format = match *p.get(36)? {
            0x01 => PartitionFormat::Mbr,
            0x02 => PartitionFormat::Gpt,
            _ => return None,
        };
        let signature = match *p.get(37)? {
            0x00 => PartitionSignature::None,
            0x01 => PartitionSignature::Mbr(read_u32_at(&field, 0)?),
            0x02 => PartitionSignature::Guid(Guid::from_bytes(field)),
            _ => return None,
        };
        Some(Self {
            partition_number: read_u32_at(p, 0)?,
            partition_start: read_u64_at(p, 4)?,
            partition_size: read_u64_at(p, 12)?,
            format,
            signature,
        })
    }
}

/// Hard Drive node (42 bytes).
///
/// # Errors
///
/// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn hard_drive(hd: &HardDrive) -> Result<NodeBuf, DevicePathError> {
    Payload::with_capacity(38)?
        .u32(hd.partition_number)?
        .u64(hd.partition_start)?
        .u64(hd.partition_size)?
        .bytes(&hd.signature.to_field())?
        .u8(hd.format as u8)?
        .u8(hd.signature.type_byte())?
        .finish(node_type::MEDIA, sub_type::HARD_DRIVE)
}

/// El Torito boot entry on a CD-ROM.
///
/// # Errors
///
/// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn cdrom(boot_entry: u32, start: u64, size: u64) -> Result<NodeBuf, DevicePathError> {
    Payload::with_capacity(20)?
        .u32(boot_entry)?
        .u64(start)?
        .u64(size)?
        .finish(node_type::MEDIA, sub_type::CDROM)
}

/// Vendor-defined media node.
///
/// # Errors
///
/// Returns [`DevicePathError::NodeTooLong`] if `data` does not fit.
pub fn vendor_media(guid: Guid, data: &[u8]) -> Result<NodeBuf, DevicePathError> {
    vendor(node_type::MEDIA, sub_type::MEDIA_VENDOR, guid, data)
}

/// File path node. Forward slashes become backslashes and a NUL terminator
/// is appended.
///
/// # Errors
///
/// Returns [`DevicePathError::NodeTooLong`] if the encoded path does not fit.
pub fn file_path(path: &str) -> Result<NodeBuf, DevicePathError> {
    let mut payload = Payload::with_capacity(2 * (path.len() + 1))?;
    for unit in path.encode_utf16() {
        payload.u16(if unit == u16::from(b'/') { u16::from(b'\\') } else { unit })?;
    }
    payload.u16(0)?.finish(node_type::MEDIA, sub_type::FILE_PATH)
}

fn vendor(node_type: u8, sub_type: u8, guid: Guid, data: &[u8]) -> Result<NodeBuf, DevicePathError> {
    Payload::with_capacity(16 + data.len())?
        .bytes(&guid.to_bytes())?
        .bytes(data)?
        .finish(node_type, sub_type)
}

// ---- Composite paths ------------------------------------------------------

/// Appends a File Path node for `path` to `dp`. An empty `path` appends
/// nothing.
///
/// # Errors
///
/// Returns [`DevicePathError::NodeTooLong`] for an oversized path and
/// [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn from_file(dp: Option<DevicePathView<'_>>, path: &str) -> Result<DevicePath, DevicePathError> {
    if path.is_empty() {
        return append_node(dp, None);
    }
    let node = file_path(path)?;
    append_node(dp, Some(node.as_node()))
}

/// One-node path naming a memory-mapped image.
///
/// # Errors
///
/// As for [`memory_mapped`].
pub fn from_mem(memory_type: u32, start: u64, size: u64) -> Result<DevicePath, DevicePathError> {
    memory_mapped(memory_type, start, size)?.to_path()
}

/// Appends an IPv4 node to the network device path `eth`.
///
/// # Errors
///
/// Returns [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn from_ipv4(eth: Option<DevicePathView<'_>>, ip: &Ipv4) -> Result<DevicePath, DevicePathError> {
    let node = ipv4(ip)?;
    append_node(eth, Some(node.as_node()))
}

/// Network device path, IPv4 node and `http://<server>` URI node.
///
/// # Errors
///
/// Returns [`DevicePathError::InvalidArgument`] if the URI would exceed
/// [`MAX_URI_LEN`] bytes with its terminator, and
/// [`DevicePathError::OutOfMemory`] if allocation fails.
pub fn from_http(
    eth: Option<DevicePathView<'_>>,
    ip: &Ipv4,
    server: &str,
) -> Result<DevicePath, DevicePathError> {
    if HTTP_SCHEME.len() + server.len() + 1 > MAX_URI_LEN {
        log::warn!("devpath: server name of {} bytes is too long for a URI", server.len());
        return Err(DevicePathError::InvalidArgument);
    }
    let mut text = try_vec(HTTP_SCHEME.len() + server.len())?;
    text.extend_from_slice(HTTP_SCHEME.as_bytes());
    text.extend_from_slice(server.as_bytes());
    let uri_node = Payload(text)
        .u8(0)?
        .finish(node_type::MESSAGING, sub_type::MSG_URI)?;
    log::debug!("devpath: uri node for {}{}", HTTP_SCHEME, server);

    let base = from_ipv4(eth, ip)?;
    base.view().append_node(uri_node.as_node())
}
