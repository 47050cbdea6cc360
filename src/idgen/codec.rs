/// Identifier layout and encoding
///
/// A 128-bit identifier packs, big-endian:
/// - bytes 0..8:  1 reserved sign bit (always zero) + 63-bit millisecond
///   timestamp
/// - bytes 8..16: 48-bit machine tag shifted over a 16-bit sequence
///
/// Identifiers are immutable once minted and have two usable
/// representations (raw bytes and a 32-character zero-padded hex string).
/// Collapsing one into a single u64 is not supported: the layout needs all
/// 128 bits.
use crate::error::{WaypointError, WaypointResult};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Per-millisecond sequence capacity. The minter waits once a millisecond
/// has handed out this many sequence numbers.
pub const MAX_SEQUENCE: u32 = 1 << 16;

/// Bits reserved for the machine tag in the low half
pub const MACHINE_TAG_BITS: u32 = 48;

/// Bits reserved for the sequence in the low half
pub const SEQUENCE_BITS: u32 = 16;

/// A minted 128-bit entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    /// Sign bit + 63-bit millisecond timestamp
    hi: u64,
    /// (machine tag << 16) | sequence
    lo: u64,
}

impl EntityId {
    /// Pack timestamp, machine tag and sequence into an identifier.
    ///
    /// The timestamp must be non-negative (the top bit is reserved) and the
    /// machine tag must fit in 48 bits; the sequence is type-bounded.
    pub fn from_parts(timestamp_ms: i64, machine_tag: u64, sequence: u16) -> WaypointResult<Self> {
        if timestamp_ms < 0 {
            return Err(WaypointError::Validation(
                "Identifier timestamp cannot be negative".to_string(),
            ));
        }
        if machine_tag >= (1 << MACHINE_TAG_BITS) {
            return Err(WaypointError::Validation(
                "Machine tag must fit in 48 bits".to_string(),
            ));
        }

        Ok(Self {
            hi: timestamp_ms as u64,
            lo: (machine_tag << SEQUENCE_BITS) | sequence as u64,
        })
    }

    /// Millisecond timestamp component
    pub fn timestamp_ms(&self) -> i64 {
        self.hi as i64
    }

    /// Machine tag component
    pub fn machine_tag(&self) -> u64 {
        self.lo >> SEQUENCE_BITS
    }

    /// Per-millisecond sequence component
    pub fn sequence(&self) -> u16 {
        (self.lo & 0xFFFF) as u16
    }

    /// Raw 16-byte big-endian form
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.hi.to_be_bytes());
        out[8..].copy_from_slice(&self.lo.to_be_bytes());
        out
    }

    /// Rebuild an identifier from its 16-byte form
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut hi = [0u8; 8];
        let mut lo = [0u8; 8];
        hi.copy_from_slice(&bytes[..8]);
        lo.copy_from_slice(&bytes[8..]);
        Self {
            hi: u64::from_be_bytes(hi),
            lo: u64::from_be_bytes(lo),
        }
    }

    /// 32-character zero-padded hex form, two 16-hex-digit groups
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse the hex form produced by [`EntityId::to_hex`]
    pub fn from_hex(s: &str) -> WaypointResult<Self> {
        let raw = hex::decode(s)
            .map_err(|e| WaypointError::Validation(format!("Invalid identifier hex: {}", e)))?;
        let bytes: [u8; 16] = raw.try_into().map_err(|_| {
            WaypointError::Validation("Identifier hex must be 32 characters".to_string())
        })?;
        Ok(Self::from_bytes(bytes))
    }

    /// A 64-bit rendition of the identifier. The layout occupies 128 bits,
    /// so this always fails.
    pub fn to_u64(&self) -> WaypointResult<u64> {
        Err(WaypointError::Unsupported(
            "identifier exceeds 64 bits; use the byte or hex form",
        ))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for EntityId {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_bytes_and_hex() {
        let id = EntityId::from_parts(1_754_500_000_123, 0x1A2B3C4D5E6F, 42).unwrap();

        assert_eq!(id.timestamp_ms(), 1_754_500_000_123);
        assert_eq!(id.machine_tag(), 0x1A2B3C4D5E6F);
        assert_eq!(id.sequence(), 42);

        let from_bytes = EntityId::from_bytes(id.to_bytes());
        assert_eq!(from_bytes, id);

        let hex = id.to_hex();
        assert_eq!(hex.len(), 32);
        assert_eq!(EntityId::from_hex(&hex).unwrap(), id);
    }

    #[test]
    fn test_byte_layout() {
        let id = EntityId::from_parts(1, 2, 3).unwrap();
        let bytes = id.to_bytes();

        // Big-endian timestamp in the first 8 bytes
        assert_eq!(&bytes[..8], &[0, 0, 0, 0, 0, 0, 0, 1]);
        // (machine_tag << 16) | sequence in the last 8 bytes
        assert_eq!(&bytes[8..], &[0, 0, 0, 0, 0, 2, 0, 3]);
    }

    #[test]
    fn test_u64_unsupported() {
        let id = EntityId::from_parts(0, 0, 0).unwrap();
        assert!(matches!(
            id.to_u64(),
            Err(WaypointError::Unsupported(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_parts() {
        assert!(EntityId::from_parts(-1, 0, 0).is_err());
        assert!(EntityId::from_parts(0, 1 << MACHINE_TAG_BITS, 0).is_err());
    }

    #[test]
    fn test_hex_parse_errors() {
        assert!(EntityId::from_hex("zz").is_err());
        assert!(EntityId::from_hex("00ff").is_err()); // too short
    }

    #[test]
    fn test_ordering_follows_timestamp() {
        let early = EntityId::from_parts(100, 7, 9).unwrap();
        let late = EntityId::from_parts(101, 7, 0).unwrap();
        assert!(early < late);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let id = EntityId::from_parts(5, 6, 7).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));

        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
