//! TTL walkers over DNS response packets.
//!
//! Both helpers walk the answer, authority and additional sections of a
//! wire-format message, visiting each resource record's TTL field. The EDNS
//! OPT pseudo-RR is skipped: its "TTL" field carries extended-rcode,
//! version and flags rather than a lifetime (RFC 6891).

use crate::error::Result;
use crate::wire::WireReader;
use crate::QTYPE_OPT;
use smallvec::SmallVec;

/// Walks the RR sections of `packet`, invoking `visit` with the record
/// type, the byte offset of its TTL field, and the TTL value.
///
/// Only the section counts are read from the header; the flags word is
/// not decoded, so an unassigned rcode nibble never stops the walk.
fn for_each_ttl(packet: &[u8], mut visit: impl FnMut(u16, usize, u32)) -> Result<()> {
    let mut reader = WireReader::new(packet);
    reader.skip(4)?; // id + flags
    let qd_count = reader.read_u16()?;
    let an_count = reader.read_u16()?;
    let ns_count = reader.read_u16()?;
    let ar_count = reader.read_u16()?;

    for _ in 0..qd_count {
        reader.skip_name()?;
        reader.skip(4)?; // qtype + qclass
    }

    let records = usize::from(an_count) + usize::from(ns_count) + usize::from(ar_count);
    for _ in 0..records {
        reader.skip_name()?;
        let rtype = reader.read_u16()?;
        reader.skip(2)?; // class
        let ttl_offset = reader.position();
        let ttl = reader.read_u32()?;
        let rdlen = reader.read_u16()?;
        reader.skip(rdlen as usize)?;
        visit(rtype, ttl_offset, ttl);
    }

    Ok(())
}

/// Returns the minimum TTL across the answer, authority and additional
/// sections, or `None` when no record carries one or the packet cannot be
/// walked to completion. An uncacheable response either way.
pub fn min_ttl(packet: &[u8]) -> Option<u32> {
    let mut min: Option<u32> = None;
    for_each_ttl(packet, |rtype, _, ttl| {
        if rtype != QTYPE_OPT {
            min = Some(min.map_or(ttl, |m| m.min(ttl)));
        }
    })
    .ok()?;
    min
}

/// Subtracts `age` seconds from every RR TTL in place, saturating at zero.
///
/// The packet is left untouched up to the point of a walk failure; callers
/// treating the buffer as best-effort output can ignore the error.
pub fn age_ttls(packet: &mut [u8], age: u32) -> Result<()> {
    let mut offsets: SmallVec<[(usize, u32); 8]> = SmallVec::new();
    for_each_ttl(packet, |rtype, offset, ttl| {
        if rtype != QTYPE_OPT {
            offsets.push((offset, ttl));
        }
    })?;

    for (offset, ttl) in offsets {
        let aged = ttl.saturating_sub(age);
        packet[offset..offset + 4].copy_from_slice(&aged.to_be_bytes());
    }

    Ok(())
}
