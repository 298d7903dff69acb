// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! OXM (OpenFlow eXtensible Match) TLV encode/decode.
//!
//! Grounded on the `oxm_class`/`oxm_field`/`HM`/`oxm_length` TLV layout and the
//! parse/`buffer_len`/emit `Repr`-style trait split used for protocol field codecs elsewhere in
//! this ecosystem, trimmed to the field set this pipeline actually matches on: input port,
//! Ethernet addresses and type, VLAN id, IPv4 addresses and protocol, and L4 ports.

use byteorder::{BigEndian, ByteOrder};

use crate::error::{DecodeError, EncodeError};

/// `oxm_class` for standard OpenFlow basic match fields.
pub const CLASS_OPEN_FLOW_BASIC: u16 = 0x8000;
/// `oxm_class` for vendor/experimenter-defined match fields.
pub const CLASS_EXPERIMENTER: u16 = 0xffff;

const OXM_HEADER_LEN: usize = 4;

/// `oxm_field` codes for [`CLASS_OPEN_FLOW_BASIC`].
#[allow(missing_docs)] // names are the wire protocol's own field identifiers
pub mod field_code {
    pub const IN_PORT: u8 = 0;
    pub const ETH_DST: u8 = 3;
    pub const ETH_SRC: u8 = 4;
    pub const ETH_TYPE: u8 = 5;
    pub const VLAN_VID: u8 = 6;
    pub const IP_PROTO: u8 = 10;
    pub const IPV4_SRC: u8 = 11;
    pub const IPV4_DST: u8 = 12;
    pub const TCP_SRC: u8 = 13;
    pub const TCP_DST: u8 = 14;
    pub const UDP_SRC: u8 = 15;
    pub const UDP_DST: u8 = 16;
    pub const METADATA: u8 = 2;
}

/// A 6-byte Ethernet address.
pub type EthAddr = [u8; 6];

/// One parsed match field, value and (for maskable fields) mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OxmField {
    /// Ingress switch port.
    InPort(u32),
    /// 64-bit pipeline metadata register, with an optional mask.
    Metadata(u64, Option<u64>),
    /// Destination MAC address, with an optional mask (used by table 62/63 mirroring).
    EthDst(EthAddr, Option<EthAddr>),
    /// Source MAC address, with an optional mask.
    EthSrc(EthAddr, Option<EthAddr>),
    /// EtherType.
    EthType(u16),
    /// 802.1Q VLAN id (includes the `OFPVID_PRESENT` bit per OpenFlow 1.3 convention).
    VlanVid(u16),
    /// IP protocol number.
    IpProto(u8),
    /// IPv4 source address, with an optional prefix mask.
    Ipv4Src(u32, Option<u32>),
    /// IPv4 destination address, with an optional prefix mask (used by table 61 LPM).
    Ipv4Dst(u32, Option<u32>),
    /// TCP source port.
    TcpSrc(u16),
    /// TCP destination port.
    TcpDst(u16),
    /// UDP source port.
    UdpSrc(u16),
    /// UDP destination port.
    UdpDst(u16),
}

impl OxmField {
    /// The `oxm_field` code identifying this field's type, ignoring its value/mask.
    #[must_use]
    pub fn field_code(self) -> u8 {
        use field_code::*;
        match self {
            OxmField::InPort(_) => IN_PORT,
            OxmField::Metadata(..) => METADATA,
            OxmField::EthDst(..) => ETH_DST,
            OxmField::EthSrc(..) => ETH_SRC,
            OxmField::EthType(_) => ETH_TYPE,
            OxmField::VlanVid(_) => VLAN_VID,
            OxmField::IpProto(_) => IP_PROTO,
            OxmField::Ipv4Src(..) => IPV4_SRC,
            OxmField::Ipv4Dst(..) => IPV4_DST,
            OxmField::TcpSrc(_) => TCP_SRC,
            OxmField::TcpDst(_) => TCP_DST,
            OxmField::UdpSrc(_) => UDP_SRC,
            OxmField::UdpDst(_) => UDP_DST,
        }
    }

    fn has_mask(self) -> bool {
        matches!(
            self,
            OxmField::Metadata(_, Some(_))
                | OxmField::EthDst(_, Some(_))
                | OxmField::EthSrc(_, Some(_))
                | OxmField::Ipv4Src(_, Some(_))
                | OxmField::Ipv4Dst(_, Some(_))
        )
    }

    /// Length of the value (and mask, if present) payload, excluding the 4-byte TLV header.
    #[must_use]
    pub fn value_len(self) -> usize {
        match self {
            OxmField::InPort(_) => 4,
            OxmField::Metadata(_, mask) => if mask.is_some() { 16 } else { 8 },
            OxmField::EthDst(_, mask) | OxmField::EthSrc(_, mask) => {
                if mask.is_some() { 12 } else { 6 }
            }
            OxmField::EthType(_) | OxmField::VlanVid(_) => 2,
            OxmField::IpProto(_) => 1,
            OxmField::Ipv4Src(_, mask) | OxmField::Ipv4Dst(_, mask) => {
                if mask.is_some() { 8 } else { 4 }
            }
            OxmField::TcpSrc(_) | OxmField::TcpDst(_) | OxmField::UdpSrc(_) | OxmField::UdpDst(_) => 2,
        }
    }

    /// Total TLV length including the 4-byte header.
    #[must_use]
    pub fn buffer_len(self) -> usize {
        OXM_HEADER_LEN + self.value_len()
    }

    /// Encode this field's TLV into `buf`.
    pub fn emit(self, buf: &mut [u8]) -> Result<(), EncodeError> {
        let needed = self.buffer_len();
        if buf.len() < needed {
            return Err(EncodeError { needed, available: buf.len() });
        }
        BigEndian::write_u16(&mut buf[0..2], CLASS_OPEN_FLOW_BASIC);
        buf[2] = (self.field_code() << 1) | u8::from(self.has_mask());
        #[allow(clippy::cast_possible_truncation)] // value_len() is always <= 16
        {
            buf[3] = self.value_len() as u8;
        }
        let payload = &mut buf[OXM_HEADER_LEN..needed];
        match self {
            OxmField::InPort(v) => BigEndian::write_u32(&mut payload[0..4], v),
            OxmField::Metadata(v, mask) => {
                BigEndian::write_u64(&mut payload[0..8], v);
                if let Some(m) = mask {
                    BigEndian::write_u64(&mut payload[8..16], m);
                }
            }
            OxmField::EthDst(v, mask) | OxmField::EthSrc(v, mask) => {
                payload[0..6].copy_from_slice(&v);
                if let Some(m) = mask {
                    payload[6..12].copy_from_slice(&m);
                }
            }
            OxmField::EthType(v) | OxmField::VlanVid(v) => BigEndian::write_u16(&mut payload[0..2], v),
            OxmField::IpProto(v) => payload[0] = v,
            OxmField::Ipv4Src(v, mask) | OxmField::Ipv4Dst(v, mask) => {
                BigEndian::write_u32(&mut payload[0..4], v);
                if let Some(m) = mask {
                    BigEndian::write_u32(&mut payload[4..8], m);
                }
            }
            OxmField::TcpSrc(v) | OxmField::TcpDst(v) | OxmField::UdpSrc(v) | OxmField::UdpDst(v) => {
                BigEndian::write_u16(&mut payload[0..2], v);
            }
        }
        Ok(())
    }

    /// Parse one OXM TLV from the start of `buf`, returning the field and the number of bytes
    /// consumed.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), DecodeError> {
        if buf.len() < OXM_HEADER_LEN {
            return Err(DecodeError::Truncated);
        }
        let class = BigEndian::read_u16(&buf[0..2]);
        if class != CLASS_OPEN_FLOW_BASIC {
            return Err(DecodeError::UnsupportedOxmClass(class));
        }
        let field = buf[2] >> 1;
        let has_mask = buf[2] & 1 == 1;
        let len = buf[3] as usize;
        let total = OXM_HEADER_LEN + len;
        if buf.len() < total {
            return Err(DecodeError::Truncated);
        }
        let payload = &buf[OXM_HEADER_LEN..total];

        use field_code::*;
        let parsed = match field {
            IN_PORT if len == 4 => OxmField::InPort(BigEndian::read_u32(payload)),
            METADATA if !has_mask && len == 8 => OxmField::Metadata(BigEndian::read_u64(payload), None),
            METADATA if has_mask && len == 16 => OxmField::Metadata(
                BigEndian::read_u64(&payload[0..8]),
                Some(BigEndian::read_u64(&payload[8..16])),
            ),
            ETH_DST if !has_mask && len == 6 => OxmField::EthDst(eth(payload), None),
            ETH_DST if has_mask && len == 12 => {
                OxmField::EthDst(eth(&payload[0..6]), Some(eth(&payload[6..12])))
            }
            ETH_SRC if !has_mask && len == 6 => OxmField::EthSrc(eth(payload), None),
            ETH_SRC if has_mask && len == 12 => {
                OxmField::EthSrc(eth(&payload[0..6]), Some(eth(&payload[6..12])))
            }
            ETH_TYPE if len == 2 => OxmField::EthType(BigEndian::read_u16(payload)),
            VLAN_VID if len == 2 => OxmField::VlanVid(BigEndian::read_u16(payload)),
            IP_PROTO if len == 1 => OxmField::IpProto(payload[0]),
            IPV4_SRC if !has_mask && len == 4 => OxmField::Ipv4Src(BigEndian::read_u32(payload), None),
            IPV4_SRC if has_mask && len == 8 => OxmField::Ipv4Src(
                BigEndian::read_u32(&payload[0..4]),
                Some(BigEndian::read_u32(&payload[4..8])),
            ),
            IPV4_DST if !has_mask && len == 4 => OxmField::Ipv4Dst(BigEndian::read_u32(payload), None),
            IPV4_DST if has_mask && len == 8 => OxmField::Ipv4Dst(
                BigEndian::read_u32(&payload[0..4]),
                Some(BigEndian::read_u32(&payload[4..8])),
            ),
            TCP_SRC if len == 2 => OxmField::TcpSrc(BigEndian::read_u16(payload)),
            TCP_DST if len == 2 => OxmField::TcpDst(BigEndian::read_u16(payload)),
            UDP_SRC if len == 2 => OxmField::UdpSrc(BigEndian::read_u16(payload)),
            UDP_DST if len == 2 => OxmField::UdpDst(BigEndian::read_u16(payload)),
            IN_PORT | METADATA | ETH_DST | ETH_SRC | ETH_TYPE | VLAN_VID | IP_PROTO | IPV4_SRC
            | IPV4_DST | TCP_SRC | TCP_DST | UDP_SRC | UDP_DST => return Err(DecodeError::Malformed),
            other => return Err(DecodeError::UnsupportedOxmField(other)),
        };
        Ok((parsed, total))
    }

    /// `true` if this (potentially masked) field, as stored in a flow entry's match, is
    /// satisfied by `concrete`, an unmasked field of the same type extracted from a packet.
    /// Returns `false` if `concrete` is a different field type.
    #[must_use]
    pub fn matches(self, concrete: OxmField) -> bool {
        match (self, concrete) {
            (OxmField::InPort(a), OxmField::InPort(b)) => a == b,
            (OxmField::Metadata(a, mask), OxmField::Metadata(b, _)) => {
                let m = mask.unwrap_or(u64::MAX);
                a & m == b & m
            }
            (OxmField::EthDst(a, mask), OxmField::EthDst(b, _))
            | (OxmField::EthSrc(a, mask), OxmField::EthSrc(b, _)) => {
                let m = mask.unwrap_or([0xff; 6]);
                (0..6).all(|i| a[i] & m[i] == b[i] & m[i])
            }
            (OxmField::EthType(a), OxmField::EthType(b)) => a == b,
            (OxmField::VlanVid(a), OxmField::VlanVid(b)) => a == b,
            (OxmField::IpProto(a), OxmField::IpProto(b)) => a == b,
            (OxmField::Ipv4Src(a, mask), OxmField::Ipv4Src(b, _))
            | (OxmField::Ipv4Dst(a, mask), OxmField::Ipv4Dst(b, _)) => {
                let m = mask.unwrap_or(u32::MAX);
                a & m == b & m
            }
            (OxmField::TcpSrc(a), OxmField::TcpSrc(b))
            | (OxmField::TcpDst(a), OxmField::TcpDst(b))
            | (OxmField::UdpSrc(a), OxmField::UdpSrc(b))
            | (OxmField::UdpDst(a), OxmField::UdpDst(b)) => a == b,
            _ => false,
        }
    }
}

fn eth(buf: &[u8]) -> EthAddr {
    let mut out = [0u8; 6];
    out.copy_from_slice(&buf[0..6]);
    out
}

/// An ordered set of match fields, the TLV list carried by `ofp_match`.
///
/// A `smallvec` backs this because the overwhelming majority of flow-mods match on a handful of
/// fields (in-port, eth type, one or two L3/L4 fields); only wildcard-free debug rules approach
/// double digits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Match(pub smallvec::SmallVec<[OxmField; 8]>);

impl Match {
    /// An empty (match-all) match.
    #[must_use]
    pub fn any() -> Self {
        Match::default()
    }

    /// Find the first field of the given oxm_field code, if present.
    #[must_use]
    pub fn find(&self, code: u8) -> Option<&OxmField> {
        self.0.iter().find(|f| f.field_code() == code)
    }

    /// Parse a sequence of back-to-back OXM TLVs (as they appear in `ofp_match.oxm_fields`).
    pub fn parse(mut buf: &[u8]) -> Result<Self, DecodeError> {
        let mut fields = smallvec::SmallVec::new();
        while !buf.is_empty() {
            let (field, consumed) = OxmField::parse(buf)?;
            fields.push(field);
            buf = &buf[consumed..];
        }
        Ok(Match(fields))
    }

    /// Total encoded length of every field in this match.
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.0.iter().map(|f| f.buffer_len()).sum()
    }

    /// Encode every field back-to-back into `buf`.
    pub fn emit(&self, buf: &mut [u8]) -> Result<(), EncodeError> {
        let mut offset = 0;
        for field in &self.0 {
            let len = field.buffer_len();
            field.emit(&mut buf[offset..])?;
            offset += len;
        }
        Ok(())
    }

    /// `true` if every field in `self` (a flow entry's match, which may carry masks and
    /// wildcards by omission) is satisfied by the concrete fields extracted from a packet.
    /// A field present in `self` but absent from `packet` never matches.
    #[must_use]
    pub fn is_satisfied_by(&self, packet: &Match) -> bool {
        self.0.iter().all(|want| {
            packet
                .0
                .iter()
                .any(|have| have.field_code() == want.field_code() && want.matches(*have))
        })
    }
}

/// Decode an IPv4 netmask as a CIDR prefix length, rejecting non-contiguous masks.
///
/// Scans bits LSB-to-MSB: once a `1` bit is seen, every following (more significant) bit must
/// also be `1`. Returns `None` for a mask with a "hole" (e.g. `0xff00_ffff`).
#[must_use]
pub fn mask_prefix_len(mask: u32) -> Option<u8> {
    let mut found_one = false;
    let mut ones = 0u8;
    for bit in 0..32 {
        let set = (mask >> bit) & 1 == 1;
        if set {
            found_one = true;
            ones += 1;
        } else if found_one {
            // a zero bit after a one bit was seen: hole in the mask
            return None;
        }
    }
    Some(ones)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eth_dst_masked_roundtrip() {
        let field = OxmField::EthDst([1, 2, 3, 4, 5, 6], Some([0xff; 6]));
        let mut buf = [0u8; 16];
        field.emit(&mut buf).unwrap();
        let (parsed, consumed) = OxmField::parse(&buf).unwrap();
        assert_eq!(parsed, field);
        assert_eq!(consumed, field.buffer_len());
    }

    #[test]
    fn ipv4_dst_lpm_mask_roundtrip() {
        let field = OxmField::Ipv4Dst(0xc0a8_0000, Some(0xffff_0000));
        let mut buf = [0u8; 12];
        field.emit(&mut buf).unwrap();
        let (parsed, _) = OxmField::parse(&buf).unwrap();
        assert_eq!(parsed, field);
    }

    #[test]
    fn match_multi_field_roundtrip() {
        let m = Match(smallvec::smallvec![
            OxmField::InPort(3),
            OxmField::EthType(0x0800),
            OxmField::Ipv4Dst(0x0a00_0001, None),
        ]);
        let mut buf = vec![0u8; m.buffer_len()];
        m.emit(&mut buf).unwrap();
        let parsed = Match::parse(&buf).unwrap();
        assert_eq!(parsed, m);
    }

    #[test]
    fn truncated_header_is_rejected() {
        assert_eq!(OxmField::parse(&[0x80, 0x00]), Err(DecodeError::Truncated));
    }

    #[test]
    fn contiguous_masks_decode_to_prefix_len() {
        assert_eq!(mask_prefix_len(0xffff_ff00), Some(24));
        assert_eq!(mask_prefix_len(0xffff_ffff), Some(32));
        assert_eq!(mask_prefix_len(0x0000_0000), Some(0));
        assert_eq!(mask_prefix_len(0xffff_0000), Some(16));
    }

    #[test]
    fn mask_with_hole_is_rejected() {
        assert_eq!(mask_prefix_len(0xff00_ffff), None);
        assert_eq!(mask_prefix_len(0x0000_ffff), None);
    }
}
