//! Packet cache keying.
//!
//! The key is a 32-bit hash over the features that distinguish one query
//! from another: the header minus the volatile transaction ID, the
//! lower-cased qname, everything after the qname (qtype, qclass, EDNS and
//! other trailers), and the transport. Lookups and inserts must agree on
//! this function bit for bit; it is fixed per cache, not randomized.
//!
//! Collisions are possible by design and are resolved by the entry's
//! full-attribute comparison, never by the key alone.

use smallvec::SmallVec;
use tarn_proto::{Error, Name, Result, HEADER_SIZE};

/// Bob Jenkins' 1996 "lookup2" mixer.
#[inline]
fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 13);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 8);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 13);
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 12);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 16);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 5);
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 3);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 10);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 15);
}

#[inline]
fn load_u32_le(bytes: &[u8]) -> u32 {
    u32::from(bytes[0])
        | u32::from(bytes[1]) << 8
        | u32::from(bytes[2]) << 16
        | u32::from(bytes[3]) << 24
}

/// Jenkins "burtle" (lookup2) hash of `data`, seeded with `initval`.
///
/// Stable across platforms and versions; cached keys computed at insert
/// time must keep matching lookups for the lifetime of the cache.
pub fn burtle(data: &[u8], initval: u32) -> u32 {
    let mut a = 0x9e37_79b9u32;
    let mut b = 0x9e37_79b9u32;
    let mut c = initval;

    let mut chunks = data.chunks_exact(12);
    for chunk in &mut chunks {
        a = a.wrapping_add(load_u32_le(&chunk[0..4]));
        b = b.wrapping_add(load_u32_le(&chunk[4..8]));
        c = c.wrapping_add(load_u32_le(&chunk[8..12]));
        mix(&mut a, &mut b, &mut c);
    }

    let tail = chunks.remainder();
    c = c.wrapping_add(data.len() as u32);

    // lookup2's tail switch, high case falling through to low; the first
    // byte of c stays reserved for the length.
    if tail.len() >= 11 {
        c = c.wrapping_add(u32::from(tail[10]) << 24);
    }
    if tail.len() >= 10 {
        c = c.wrapping_add(u32::from(tail[9]) << 16);
    }
    if tail.len() >= 9 {
        c = c.wrapping_add(u32::from(tail[8]) << 8);
    }
    if tail.len() >= 8 {
        b = b.wrapping_add(u32::from(tail[7]) << 24);
    }
    if tail.len() >= 7 {
        b = b.wrapping_add(u32::from(tail[6]) << 16);
    }
    if tail.len() >= 6 {
        b = b.wrapping_add(u32::from(tail[5]) << 8);
    }
    if tail.len() >= 5 {
        b = b.wrapping_add(u32::from(tail[4]));
    }
    if tail.len() >= 4 {
        a = a.wrapping_add(u32::from(tail[3]) << 24);
    }
    if tail.len() >= 3 {
        a = a.wrapping_add(u32::from(tail[2]) << 16);
    }
    if tail.len() >= 2 {
        a = a.wrapping_add(u32::from(tail[1]) << 8);
    }
    if !tail.is_empty() {
        a = a.wrapping_add(u32::from(tail[0]));
    }
    mix(&mut a, &mut b, &mut c);

    c
}

/// Computes the cache key for a query packet.
///
/// `consumed` is the number of bytes the qname occupies inside the packet
/// (which differs from the name's own wire length when the query used
/// compression). The transaction ID is excluded; qname case is folded.
///
/// # Errors
///
/// Fails when the packet is shorter than a DNS header or shorter than the
/// declared qname. Normal traffic never triggers this; it indicates a bug
/// in the caller's parsing.
pub fn packet_key(qname: &Name, consumed: usize, packet: &[u8], tcp: bool) -> Result<u32> {
    if packet.len() < HEADER_SIZE {
        return Err(Error::buffer_too_short(HEADER_SIZE, packet.len()));
    }
    if packet.len() < HEADER_SIZE + consumed {
        return Err(Error::buffer_too_short(HEADER_SIZE + consumed, packet.len()));
    }

    // Header minus the transaction ID.
    let mut result = burtle(&packet[2..HEADER_SIZE], 0);

    let mut lowered: SmallVec<[u8; 64]> = SmallVec::from_slice(qname.as_wire());
    for byte in lowered.iter_mut() {
        byte.make_ascii_lowercase();
    }
    result = burtle(&lowered, result);

    // Everything after the qname: qtype, qclass, EDNS and other trailers.
    let trailer = &packet[HEADER_SIZE + consumed..];
    if !trailer.is_empty() {
        result = burtle(trailer, result);
    }

    result = burtle(&[u8::from(tcp)], result);
    Ok(result)
}
