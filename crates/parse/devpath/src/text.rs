//! UEFI text notation for nodes and paths, used in log messages.
//!
//! Nodes are separated by `/` and instances by `,`. Node kinds without a
//! dedicated rendering fall back to `Path(type,subtype,hex)`.

use core::fmt::{self, Display, Formatter, Write};
use core::net::Ipv4Addr;

use uguid::Guid;

use crate::build::{HardDrive, PartitionSignature};
use crate::node::{DevicePathNode, node_type, read_u16_at, read_u32_at, read_u64_at, sub_type};
use crate::path::{DevicePath, DevicePathView};

/// Lower-case hex rendering of a byte string.
struct Hex<'a>(&'a [u8]);

impl Display for Hex<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

fn guid_at(data: &[u8], offset: usize) -> Guid {
    data.get(offset..offset + 16)
        .and_then(|b| <[u8; 16]>::try_from(b).ok())
        .map_or(Guid::ZERO, Guid::from_bytes)
}

fn ipv4_at(data: &[u8], offset: usize) -> Ipv4Addr {
    data.get(offset..offset + 4)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .map_or(Ipv4Addr::UNSPECIFIED, Ipv4Addr::from)
}

fn u16_at(data: &[u8], offset: usize) -> u16 {
    read_u16_at(data, offset).unwrap_or(0)
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    read_u32_at(data, offset).unwrap_or(0)
}

fn u64_at(data: &[u8], offset: usize) -> u64 {
    read_u64_at(data, offset).unwrap_or(0)
}

fn byte_at(data: &[u8], offset: usize) -> u8 {
    data.get(offset).copied().unwrap_or(0)
}

/// Writes UTF-16LE units up to the first NUL.
fn write_utf16(f: &mut Formatter<'_>, data: &[u8]) -> fmt::Result {
    let units = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0);
    for c in char::decode_utf16(units) {
        f.write_char(c.unwrap_or(char::REPLACEMENT_CHARACTER))?;
    }
    Ok(())
}

fn write_vendor(f: &mut Formatter<'_>, name: &str, p: &[u8]) -> fmt::Result {
    let guid = guid_at(p, 0);
    let data = p.get(16..).unwrap_or_default();
    if data.is_empty() {
        write!(f, "{name}({guid})")
    } else {
        write!(f, "{name}({guid},{})", Hex(data))
    }
}

/// Smallest payload of each node kind with a text rendering, `None` for
/// kinds that always render raw.
fn min_payload(node: DevicePathNode<'_>) -> Option<usize> {
    let min = match (node.node_type(), node.sub_type()) {
        (node_type::HARDWARE, sub_type::MEMORY_MAPPED) | (node_type::MEDIA, sub_type::CDROM) => 20,
        (node_type::HARDWARE, sub_type::HW_VENDOR) | (node_type::MEDIA, sub_type::MEDIA_VENDOR) => 16,
        (node_type::HARDWARE, sub_type::CONTROLLER) => 4,
        (node_type::MESSAGING, sub_type::MSG_USB) => 2,
        (node_type::MESSAGING, sub_type::MSG_MAC_ADDR) => 33,
        (node_type::MESSAGING, sub_type::MSG_IPV4) => 23,
        (node_type::MESSAGING, sub_type::MSG_UART) => 15,
        (node_type::MESSAGING, sub_type::MSG_USB_WWID | sub_type::MSG_SATA) => 6,
        (node_type::MESSAGING, sub_type::MSG_NVME) => 12,
        (node_type::MESSAGING, sub_type::MSG_SD | sub_type::MSG_EMMC) => 1,
        (node_type::MEDIA, sub_type::HARD_DRIVE) => 38,
        (node_type::MESSAGING, sub_type::MSG_URI) | (node_type::MEDIA, sub_type::FILE_PATH) => 0,
        _ => return None,
    };
    Some(min)
}

/// Returns `true` if `node` has a text rendering and a payload that
/// supports it.
fn has_rendering(node: DevicePathNode<'_>) -> bool {
    let Some(min) = min_payload(node) else {
        return false;
    };
    if node.payload().len() < min {
        return false;
    }
    !node.is(node_type::MEDIA, sub_type::HARD_DRIVE) || HardDrive::from_node(node).is_some()
}

/// Renders a node for which [`has_rendering`] holds.
fn write_known(f: &mut Formatter<'_>, node: DevicePathNode<'_>) -> fmt::Result {
    let p = node.payload();
    match (node.node_type(), node.sub_type()) {
        (node_type::HARDWARE, sub_type::MEMORY_MAPPED) => write!(
            f,
            "MemoryMapped(0x{:x},0x{:x},0x{:x})",
            u32_at(p, 0),
            u64_at(p, 4),
            u64_at(p, 12)
        ),
        (node_type::HARDWARE, sub_type::HW_VENDOR) => write_vendor(f, "VenHw", p),
        (node_type::HARDWARE, sub_type::CONTROLLER) => write!(f, "Ctrl(0x{:x})", u32_at(p, 0)),
        (node_type::MESSAGING, sub_type::MSG_USB) => {
            write!(f, "USB(0x{:x},0x{:x})", byte_at(p, 0), byte_at(p, 1))
        }
        (node_type::MESSAGING, sub_type::MSG_MAC_ADDR) => {
            let if_type = byte_at(p, 32);
            let len = if if_type <= 1 { 6 } else { 32 };
            write!(f, "MAC({},0x{:x})", Hex(&p[..len]), if_type)
        }
        (node_type::MESSAGING, sub_type::MSG_IPV4) => {
            write!(f, "IPv4({},", ipv4_at(p, 4))?;
            match u16_at(p, 12) {
                6 => f.write_str("TCP,")?,
                17 => f.write_str("UDP,")?,
                n => write!(f, "0x{n:x},")?,
            }
            let kind = if byte_at(p, 14) == 0 { "DHCP" } else { "Static" };
            write!(
                f,
                "{kind},{},{},{})",
                ipv4_at(p, 0),
                ipv4_at(p, 15),
                ipv4_at(p, 19)
            )
        }
        (node_type::MESSAGING, sub_type::MSG_UART) => write!(
            f,
            "Uart({},{},{},{})",
            u64_at(p, 4),
            byte_at(p, 12),
            byte_at(p, 13),
            byte_at(p, 14)
        ),
        (node_type::MESSAGING, sub_type::MSG_USB_WWID) => {
            write!(
                f,
                "UsbWwid(0x{:x},0x{:x},0x{:x},\"",
                u16_at(p, 2),
                u16_at(p, 4),
                u16_at(p, 0)
            )?;
            write_utf16(f, &p[6..])?;
            f.write_str("\")")
        }
        (node_type::MESSAGING, sub_type::MSG_SATA) => write!(
            f,
            "Sata(0x{:x},0x{:x},0x{:x})",
            u16_at(p, 0),
            u16_at(p, 2),
            u16_at(p, 4)
        ),
        (node_type::MESSAGING, sub_type::MSG_NVME) => {
            write!(f, "NVMe(0x{:x},{})", u32_at(p, 0), Hex(&p[4..12]))
        }
        (node_type::MESSAGING, sub_type::MSG_URI) => {
            let text = p.split(|&b| b == 0).next().unwrap_or_default();
            f.write_str("Uri(")?;
            for chunk in text.utf8_chunks() {
                f.write_str(chunk.valid())?;
                if !chunk.invalid().is_empty() {
                    f.write_char(char::REPLACEMENT_CHARACTER)?;
                }
            }
            f.write_str(")")
        }
        (node_type::MESSAGING, sub_type::MSG_SD) => write!(f, "SD({})", byte_at(p, 0)),
        (node_type::MESSAGING, sub_type::MSG_EMMC) => write!(f, "eMMC({})", byte_at(p, 0)),
        (node_type::MEDIA, sub_type::HARD_DRIVE) => {
            let Some(hd) = HardDrive::from_node(node) else {
                return Ok(());
            };
            write!(f, "HD({},", hd.partition_number)?;
            match hd.signature {
                PartitionSignature::Guid(guid) => write!(f, "GPT,{guid},")?,
                PartitionSignature::Mbr(sig) => write!(f, "MBR,0x{sig:08x},")?,
                PartitionSignature::None => f.write_str("MBR,0,")?,
            }
            write!(f, "0x{:x},0x{:x})", hd.partition_start, hd.partition_size)
        }
        (node_type::MEDIA, sub_type::CDROM) => write!(
            f,
            "CDROM(0x{:x},0x{:x},0x{:x})",
            u32_at(p, 0),
            u64_at(p, 4),
            u64_at(p, 12)
        ),
        (node_type::MEDIA, sub_type::MEDIA_VENDOR) => write_vendor(f, "VenMedia", p),
        (node_type::MEDIA, sub_type::FILE_PATH) => write_utf16(f, p),
        _ => Ok(()),
    }
}

impl Display for DevicePathNode<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if has_rendering(*self) {
            write_known(f, *self)
        } else {
            write!(
                f,
                "Path({},{},{})",
                self.node_type(),
                self.sub_type(),
                Hex(self.payload())
            )
        }
    }
}

impl Display for DevicePathView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for node in self.raw_nodes() {
            if node.is_end_entire() {
                break;
            }
            if node.is_end_instance() {
                f.write_char(',')?;
                first = true;
                continue;
            }
            if !first {
                f.write_char('/')?;
            }
            first = false;
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

impl Display for DevicePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.view().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use crate::build::{self, HardDrive, Ipv4, PartitionFormat, PartitionSignature};
    use crate::compose::{ConcatMode, concat};
    use crate::node::NodeBuf;
    use alloc::string::ToString;
    use core::net::Ipv4Addr;
    use uguid::guid;

    #[test]
    fn hard_drive_gpt() {
        let hd = build::hard_drive(&HardDrive {
            partition_number: 1,
            partition_start: 0x800,
            partition_size: 0x10_0000,
            format: PartitionFormat::Gpt,
            signature: PartitionSignature::Guid(guid!("0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0")),
        })
        .unwrap();
        assert_eq!(
            hd.as_node().to_string(),
            "HD(1,GPT,0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0,0x800,0x100000)"
        );
    }

    #[test]
    fn file_path_node() {
        let node = build::file_path("/EFI/BOOT/BOOTX64.EFI").unwrap();
        assert_eq!(node.as_node().to_string(), "\\EFI\\BOOT\\BOOTX64.EFI");
    }

    #[test]
    fn network_nodes() {
        let mac = build::mac_addr(&[0x52, 0x54, 0, 0x12, 0x34, 0x56], 1).unwrap();
        assert_eq!(mac.as_node().to_string(), "MAC(525400123456,0x1)");

        let ip = Ipv4 {
            remote: Ipv4Addr::new(192, 168, 0, 1),
            ..Ipv4::tcp(Ipv4Addr::new(192, 168, 0, 10), Ipv4Addr::new(255, 255, 255, 0))
        };
        assert_eq!(
            build::ipv4(&ip).unwrap().as_node().to_string(),
            "IPv4(192.168.0.1,TCP,DHCP,192.168.0.10,0.0.0.0,255.255.255.0)"
        );
        assert_eq!(
            build::uri("http://x/a.efi").unwrap().as_node().to_string(),
            "Uri(http://x/a.efi)"
        );
    }

    #[test]
    fn small_nodes() {
        assert_eq!(build::sd(2).unwrap().as_node().to_string(), "SD(2)");
        assert_eq!(build::emmc(0).unwrap().as_node().to_string(), "eMMC(0)");
        assert_eq!(build::controller(16).unwrap().as_node().to_string(), "Ctrl(0x10)");
        assert_eq!(
            build::memory_mapped(0, 0x1000, 0x1000).unwrap().as_node().to_string(),
            "MemoryMapped(0x0,0x1000,0x2000)"
        );
        assert_eq!(
            build::usb_wwid(0, 0x1234, 0x5678, "SN1").unwrap().as_node().to_string(),
            "UsbWwid(0x1234,0x5678,0x0,\"SN1\")"
        );
    }

    #[test]
    fn unknown_and_short_nodes_render_raw() {
        let node = NodeBuf::with_payload(0x05, 0x01, &[0xab, 0xcd]).unwrap();
        assert_eq!(node.as_node().to_string(), "Path(5,1,abcd)");
        let short = NodeBuf::with_payload(0x01, 0x05, &[1]).unwrap();
        assert_eq!(short.as_node().to_string(), "Path(1,5,01)");
    }

    #[test]
    fn path_separators() {
        let a = build::controller(1).unwrap().to_path().unwrap();
        let b = build::sd(0).unwrap().to_path().unwrap();
        let merged = concat(Some(a.view()), Some(b.view()), ConcatMode::Merge).unwrap();
        assert_eq!(merged.to_string(), "Ctrl(0x1)/SD(0)");
        let multi = concat(Some(a.view()), Some(b.view()), ConcatMode::NewInstance).unwrap();
        assert_eq!(multi.to_string(), "Ctrl(0x1),SD(0)");
        assert_eq!(alloc::format!("{multi:?}"), "DevicePath(Ctrl(0x1),SD(0))");
    }
}
