//! Helper functions for prefix masking and CIDR parsing

use crate::constants::{MAX_PREFIX_LEN, SECTION_SIZE};
use crate::errors::Error;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Network mask with the top `prefix_len` bits set.
#[inline]
pub const fn mask(prefix_len: u8) -> u32 {
    match u32::MAX.checked_shl(MAX_PREFIX_LEN as u32 - prefix_len as u32) {
        Some(m) => m,
        None => 0,
    }
}

// Canonicalise an address: zero host bits beyond `prefix_len`.
#[inline(always)]
pub const fn canonical(addr: u32, prefix_len: u8) -> u32 {
    addr & mask(prefix_len)
}

/// Slot index of a prefix length; /32 is slot 0, /0 is the last slot.
#[inline(always)]
pub const fn slot_index(prefix_len: u8) -> usize {
    (MAX_PREFIX_LEN - prefix_len) as usize
}

/// (section, bit within section) owning a slot index.
#[inline(always)]
pub const fn section_of(slot: usize) -> (usize, usize) {
    (slot / SECTION_SIZE, slot % SECTION_SIZE)
}

/// Parse `A.B.C.D/N` into its canonical network address and prefix length.
pub fn parse_cidr(s: &str) -> Result<(u32, u8), Error> {
    let invalid = || Error::InvalidInput(s.to_owned());
    // a bare address is not a network
    let (addr, len) = s.split_once('/').ok_or_else(invalid)?;
    // std's parser rejects zero-padded octets ("010" is octal to some parsers); ipnet's does not.
    let addr: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
    if len.is_empty()
        || !len.bytes().all(|b| b.is_ascii_digit())
        || (len.len() > 1 && len.starts_with('0'))
    {
        return Err(invalid());
    }
    let plen: u8 = len.parse().map_err(|_| invalid())?;
    let net = Ipv4Net::new(addr, plen).map_err(|_| invalid())?;
    Ok((canonical(u32::from(net.addr()), plen), plen))
}

/// Parse a bare dotted-quad IPv4 address.
pub fn parse_addr(s: &str) -> Result<u32, Error> {
    s.parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| Error::InvalidInput(s.to_owned()))
}

/// Rebuild the `Ipv4Net` for a stored (canonical) key.
#[inline]
pub fn to_net(network: u32, prefix_len: u8) -> Ipv4Net {
    // prefix_len never exceeds 32 for stored keys
    let addr = Ipv4Addr::from(network);
    Ipv4Net::new(addr, prefix_len).unwrap_or_else(|_| Ipv4Net::from(addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_boundaries() {
        assert_eq!(mask(0), 0);
        assert_eq!(mask(1), 0x8000_0000);
        assert_eq!(mask(8), 0xFF00_0000);
        assert_eq!(mask(24), 0xFFFF_FF00);
        assert_eq!(mask(31), 0xFFFF_FFFE);
        assert_eq!(mask(32), u32::MAX);
    }

    #[test]
    fn slot_and_section_layout() {
        assert_eq!(slot_index(32), 0);
        assert_eq!(slot_index(0), 32);
        assert_eq!(section_of(slot_index(32)), (0, 0));
        assert_eq!(section_of(slot_index(25)), (0, 7));
        assert_eq!(section_of(slot_index(24)), (1, 0));
        assert_eq!(section_of(slot_index(0)), (4, 0));
    }

    #[test]
    fn parse_cidr_masks_host_bits() {
        assert_eq!(parse_cidr("10.0.0.0/24").unwrap(), (0x0A00_0000, 24));
        assert_eq!(parse_cidr("10.1.2.3/16").unwrap(), (0x0A01_0000, 16));
        assert_eq!(parse_cidr("192.168.1.7/32").unwrap(), (0xC0A8_0107, 32));
        assert_eq!(parse_cidr("255.255.255.255/0").unwrap(), (0, 0));
    }

    #[test]
    fn parse_cidr_and_parse_addr_agree_on_zero_padding() {
        assert!(parse_addr("010.0.0.0").is_err());
        assert!(parse_cidr("010.0.0.0/8").is_err());
        assert_eq!(parse_cidr("0.0.0.0/0").unwrap(), (0, 0));
        assert_eq!(parse_cidr("10.0.0.0/0").unwrap(), (0, 0));
    }

    #[test]
    fn parse_cidr_rejects_garbage() {
        for bad in [
            "",
            "10.0.0.0",
            "10.0.0.0/",
            "10.0.0.0/33",
            "10.0.0.256/8",
            "10.0.0/8",
            "10.0.0.0/-1",
            "10.0.0.0/+8",
            "10.0.0.0/08",
            "010.0.0.0/8",
            "10.00.0.0/8",
            " 10.0.0.0/8",
            "10.0.0.0/8 ",
            "10.0.0.0/8/8",
            "10.0.0.0/256",
            "2001:db8::/32",
            "::/0",
            "not a cidr",
        ] {
            assert_eq!(
                parse_cidr(bad),
                Err(Error::InvalidInput(bad.to_owned())),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn parse_addr_accepts_dotted_quad_only() {
        assert_eq!(parse_addr("10.0.0.5").unwrap(), 0x0A00_0005);
        assert!(parse_addr("10.0.0.5/32").is_err());
        assert!(parse_addr("010.0.0.5").is_err());
        assert!(parse_addr("::1").is_err());
    }

    #[test]
    fn to_net_round_trips_canonical_keys() {
        let net = to_net(0x0A00_0000, 8);
        assert_eq!(net.to_string(), "10.0.0.0/8");
    }
}
