//! Cache entry.

use bytes::Bytes;
use tarn_proto::Name;

/// One cached response packet.
///
/// The payload is the full wire-format response as received from the
/// backend. Its first two bytes (the transaction ID) are meaningless in
/// storage; lookups always splice the caller's own ID on the way out.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Canonical (lower-cased) query name.
    qname: Name,

    /// Query type.
    qtype: u16,

    /// Query class.
    qclass: u16,

    /// Transport flag; TCP and UDP answers share no entries.
    tcp: bool,

    /// Full response packet.
    payload: Bytes,

    /// Insertion time, unix seconds.
    added: u64,

    /// Expiry deadline, unix seconds.
    validity: u64,
}

impl CacheEntry {
    /// Creates a new entry. The qname is canonicalized to lower case.
    pub fn new(
        qname: &Name,
        qtype: u16,
        qclass: u16,
        tcp: bool,
        payload: Bytes,
        added: u64,
        validity: u64,
    ) -> Self {
        Self {
            qname: qname.lowercased(),
            qtype,
            qclass,
            tcp,
            payload,
            added,
            validity,
        }
    }

    /// Returns the canonical query name.
    #[inline]
    pub fn qname(&self) -> &Name {
        &self.qname
    }

    /// Returns the query type.
    #[inline]
    pub fn qtype(&self) -> u16 {
        self.qtype
    }

    /// Returns the query class.
    #[inline]
    pub fn qclass(&self) -> u16 {
        self.qclass
    }

    /// Returns the transport flag.
    #[inline]
    pub fn tcp(&self) -> bool {
        self.tcp
    }

    /// Returns the response payload.
    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Returns the insertion time, unix seconds.
    #[inline]
    pub fn added(&self) -> u64 {
        self.added
    }

    /// Returns the expiry deadline, unix seconds.
    #[inline]
    pub fn validity(&self) -> u64 {
        self.validity
    }

    /// Returns true if the entry has expired at `now`.
    #[inline]
    pub fn is_expired(&self, now: u64) -> bool {
        self.validity < now
    }

    /// Full-attribute comparison backing the collision check.
    ///
    /// Two entries under the same 32-bit key are the same logical answer
    /// iff qname (case-insensitively), qtype, qclass and transport all
    /// match. This runs on every lookup hit and on every insert that finds
    /// an existing key; a mismatch means a hash collision, never a shared
    /// answer.
    #[inline]
    pub fn matches(&self, qname: &Name, qtype: u16, qclass: u16, tcp: bool) -> bool {
        self.tcp == tcp && self.qtype == qtype && self.qclass == qclass && self.qname == *qname
    }
}
