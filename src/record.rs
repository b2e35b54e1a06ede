//! On-disk record schema.
//!
//! Two record kinds share the canonical 48-byte layout ([`MboMsg`] and
//! [`TradeMsg`]). A third, [`HeaderedMboMsg`], carries a leading
//! [`RecordHeader`] and is 58 bytes wide; it is never mixed with the other
//! two and is read with [`Layout::HEADERED`](crate::geometry::Layout::HEADERED).
//!
//! All multi-byte integers are little-endian. Decoding copies fields out of
//! the byte span; no decoded value borrows from the source.
use serde::{Deserialize, Serialize};

/// Last record in an event for a given instrument.
pub const F_LAST: u8 = 0x80;
/// Top-of-book message.
pub const F_TOB: u8 = 0x01;

const PRICE_SCALE: f64 = 1e9;

/// A fixed-width record that can be decoded from a byte span.
pub trait DbnRecord: Copy {
    const WIDTH: usize;

    /// Decode one record from the first `WIDTH` bytes of `bytes`.
    ///
    /// # Panics
    /// If `bytes` is shorter than `WIDTH`. Callers range check first.
    fn decode(bytes: &[u8]) -> Self;
}

#[inline]
fn read_u16(b: &[u8], o: usize) -> u16 { let mut t = [0u8; 2]; t.copy_from_slice(&b[o..o + 2]); u16::from_le_bytes(t) }
#[inline]
fn read_u32(b: &[u8], o: usize) -> u32 { let mut t = [0u8; 4]; t.copy_from_slice(&b[o..o + 4]); u32::from_le_bytes(t) }
#[inline]
fn read_u64(b: &[u8], o: usize) -> u64 { let mut t = [0u8; 8]; t.copy_from_slice(&b[o..o + 8]); u64::from_le_bytes(t) }
#[inline]
fn read_i64(b: &[u8], o: usize) -> i64 { let mut t = [0u8; 8]; t.copy_from_slice(&b[o..o + 8]); i64::from_le_bytes(t) }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Add,
    Cancel,
    Modify,
    Clear,
    Trade,
    Fill,
}

impl TryFrom<u8> for Action {
    type Error = u8;
    fn try_from(code: u8) -> Result<Self, u8> {
        Ok(match code {
            b'A' => Action::Add,
            b'C' => Action::Cancel,
            b'M' => Action::Modify,
            b'R' => Action::Clear,
            b'T' => Action::Trade,
            b'F' => Action::Fill,
            other => return Err(other),
        })
    }
}

impl From<Action> for u8 {
    fn from(a: Action) -> u8 {
        match a {
            Action::Add => b'A',
            Action::Cancel => b'C',
            Action::Modify => b'M',
            Action::Clear => b'R',
            Action::Trade => b'T',
            Action::Fill => b'F',
        }
    }
}

impl From<Action> for char {
    fn from(a: Action) -> char { u8::from(a) as char }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
    None,
}

impl TryFrom<u8> for Side {
    type Error = u8;
    fn try_from(code: u8) -> Result<Self, u8> {
        Ok(match code {
            b'B' => Side::Bid,
            b'A' => Side::Ask,
            b'N' => Side::None,
            other => return Err(other),
        })
    }
}

impl From<Side> for u8 {
    fn from(s: Side) -> u8 {
        match s {
            Side::Bid => b'B',
            Side::Ask => b'A',
            Side::None => b'N',
        }
    }
}

impl From<Side> for char {
    fn from(s: Side) -> char { u8::from(s) as char }
}

/// Market-by-order event, 48 bytes on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MboMsg {
    /// Event timestamp, nanoseconds since the UNIX epoch.
    pub ts_event: u64,
    pub instrument_id: u32,
    /// Raw action code, see [`Action`].
    pub action: u8,
    /// Raw side code, see [`Side`].
    pub side: u8,
    pub flags: u8,
    pub depth: u8,
    /// Fixed-point price, 1 unit = 1e-9.
    pub price: i64,
    pub size: u32,
    pub channel_id: u32,
    pub order_id: u64,
    pub sequence: u32,
    pub ts_in_delta: u8,
    pub reserved: [u8; 3],
}

/// Trade event. Same layout as [`MboMsg`], kept as its own type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TradeMsg {
    pub ts_event: u64,
    pub instrument_id: u32,
    pub action: u8,
    pub side: u8,
    pub flags: u8,
    pub depth: u8,
    pub price: i64,
    pub size: u32,
    pub channel_id: u32,
    pub order_id: u64,
    pub sequence: u32,
    pub ts_in_delta: u8,
    pub reserved: [u8; 3],
}

// MboMsg and TradeMsg share one layout.
macro_rules! flat_record {
    ($ty:ident) => {
        impl DbnRecord for $ty {
            const WIDTH: usize = 48;

            #[inline]
            fn decode(b: &[u8]) -> Self {
                $ty {
                    ts_event: read_u64(b, 0),
                    instrument_id: read_u32(b, 8),
                    action: b[12],
                    side: b[13],
                    flags: b[14],
                    depth: b[15],
                    price: read_i64(b, 16),
                    size: read_u32(b, 24),
                    channel_id: read_u32(b, 28),
                    order_id: read_u64(b, 32),
                    sequence: read_u32(b, 40),
                    ts_in_delta: b[44],
                    reserved: [b[45], b[46], b[47]],
                }
            }
        }

        impl $ty {
            pub fn action(&self) -> Option<Action> { Action::try_from(self.action).ok() }

            pub fn side(&self) -> Option<Side> { Side::try_from(self.side).ok() }

            pub fn price_f64(&self) -> f64 { price_to_float(self.price) }

            /// Write the 48-byte on-disk form into `out[..48]`.
            pub fn encode_into(&self, out: &mut [u8]) {
                out[0..8].copy_from_slice(&self.ts_event.to_le_bytes());
                out[8..12].copy_from_slice(&self.instrument_id.to_le_bytes());
                out[12] = self.action;
                out[13] = self.side;
                out[14] = self.flags;
                out[15] = self.depth;
                out[16..24].copy_from_slice(&self.price.to_le_bytes());
                out[24..28].copy_from_slice(&self.size.to_le_bytes());
                out[28..32].copy_from_slice(&self.channel_id.to_le_bytes());
                out[32..40].copy_from_slice(&self.order_id.to_le_bytes());
                out[40..44].copy_from_slice(&self.sequence.to_le_bytes());
                out[44] = self.ts_in_delta;
                out[45..48].copy_from_slice(&self.reserved);
            }
        }
    };
}

flat_record!(MboMsg);
flat_record!(TradeMsg);

/// Record type codes carried in [`RecordHeader::rtype`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RType {
    Mbo = 0x00,
    Trade = 0x01,
    Mbp1 = 0x02,
    Mbp10 = 0x03,
    Ohlcv1S = 0x10,
    Ohlcv1M = 0x11,
    Ohlcv1H = 0x12,
    Ohlcv1D = 0x13,
    Definition = 0x20,
    Imbalance = 0x21,
    Error = 0x22,
    SymbolMapping = 0x23,
    System = 0x24,
    Statistics = 0x25,
}

impl TryFrom<u8> for RType {
    type Error = u8;
    fn try_from(code: u8) -> Result<Self, u8> {
        Ok(match code {
            0x00 => RType::Mbo,
            0x01 => RType::Trade,
            0x02 => RType::Mbp1,
            0x03 => RType::Mbp10,
            0x10 => RType::Ohlcv1S,
            0x11 => RType::Ohlcv1M,
            0x12 => RType::Ohlcv1H,
            0x13 => RType::Ohlcv1D,
            0x20 => RType::Definition,
            0x21 => RType::Imbalance,
            0x22 => RType::Error,
            0x23 => RType::SymbolMapping,
            0x24 => RType::System,
            0x25 => RType::Statistics,
            other => return Err(other),
        })
    }
}

impl From<RType> for u8 {
    fn from(r: RType) -> u8 { r as u8 }
}

/// Generic header leading a [`HeaderedMboMsg`], 14 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordHeader {
    pub length: u8,
    pub rtype: u8,
    pub publisher_id: u16,
    pub product_id: u16,
    pub ts_event: u64,
}

impl RecordHeader {
    /// Named record type, `None` for codes outside [`RType`].
    pub fn rtype(&self) -> Option<RType> { RType::try_from(self.rtype).ok() }
}

/// MBO record with a leading header, 58 bytes on disk.
///
/// Incompatible with [`MboMsg`] despite the shared name in the wild; files
/// of this kind carry no metadata prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeaderedMboMsg {
    pub hd: RecordHeader,
    pub order_id: u64,
    pub price: i64,
    pub size: u32,
    pub flags: u8,
    pub channel_id: u8,
    pub action: u8,
    pub side: u8,
    pub ts_recv: u64,
    pub ts_in_delta: u32,
    pub sequence: u32,
    pub symbol_id: u32,
}

impl DbnRecord for HeaderedMboMsg {
    const WIDTH: usize = 58;

    #[inline]
    fn decode(b: &[u8]) -> Self {
        HeaderedMboMsg {
            hd: RecordHeader {
                length: b[0],
                rtype: b[1],
                publisher_id: read_u16(b, 2),
                product_id: read_u16(b, 4),
                ts_event: read_u64(b, 6),
            },
            order_id: read_u64(b, 14),
            price: read_i64(b, 22),
            size: read_u32(b, 30),
            flags: b[34],
            channel_id: b[35],
            action: b[36],
            side: b[37],
            ts_recv: read_u64(b, 38),
            ts_in_delta: read_u32(b, 46),
            sequence: read_u32(b, 50),
            symbol_id: read_u32(b, 54),
        }
    }
}

impl HeaderedMboMsg {
    pub fn price_f64(&self) -> f64 { price_to_float(self.price) }

    /// Write the 58-byte on-disk form into `out[..58]`.
    pub fn encode_into(&self, out: &mut [u8]) {
        out[0] = self.hd.length;
        out[1] = self.hd.rtype;
        out[2..4].copy_from_slice(&self.hd.publisher_id.to_le_bytes());
        out[4..6].copy_from_slice(&self.hd.product_id.to_le_bytes());
        out[6..14].copy_from_slice(&self.hd.ts_event.to_le_bytes());
        out[14..22].copy_from_slice(&self.order_id.to_le_bytes());
        out[22..30].copy_from_slice(&self.price.to_le_bytes());
        out[30..34].copy_from_slice(&self.size.to_le_bytes());
        out[34] = self.flags;
        out[35] = self.channel_id;
        out[36] = self.action;
        out[37] = self.side;
        out[38..46].copy_from_slice(&self.ts_recv.to_le_bytes());
        out[46..50].copy_from_slice(&self.ts_in_delta.to_le_bytes());
        out[50..54].copy_from_slice(&self.sequence.to_le_bytes());
        out[54..58].copy_from_slice(&self.symbol_id.to_le_bytes());
    }
}

/// Fixed-point price to a float.
#[inline]
pub fn price_to_float(raw: i64) -> f64 { raw as f64 / PRICE_SCALE }

/// Float to fixed-point price, rounded to the nearest nanounit.
#[inline]
pub fn float_to_price(value: f64) -> i64 { (value * PRICE_SCALE).round() as i64 }

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_documented_offsets() {
        let mut b = [0u8; 48];
        b[0..8].copy_from_slice(&1_700_000_000_123_456_789u64.to_le_bytes());
        b[8..12].copy_from_slice(&42u32.to_le_bytes());
        b[12] = b'T';
        b[13] = b'A';
        b[14] = F_LAST | F_TOB;
        b[15] = 3;
        b[16..24].copy_from_slice(&(-1_250_000_000i64).to_le_bytes());
        b[24..28].copy_from_slice(&7u32.to_le_bytes());
        b[28..32].copy_from_slice(&9u32.to_le_bytes());
        b[32..40].copy_from_slice(&u64::MAX.to_le_bytes());
        b[40..44].copy_from_slice(&11u32.to_le_bytes());
        b[44] = 5;
        b[45..48].copy_from_slice(&[1, 2, 3]);

        let m = MboMsg::decode(&b);
        assert_eq!(m.ts_event, 1_700_000_000_123_456_789);
        assert_eq!(m.instrument_id, 42);
        assert_eq!(m.action(), Some(Action::Trade));
        assert_eq!(m.side(), Some(Side::Ask));
        assert_eq!(m.flags, 0x81);
        assert_eq!(m.depth, 3);
        assert_eq!(m.price, -1_250_000_000);
        assert!((m.price_f64() + 1.25).abs() < 1e-12);
        assert_eq!(m.size, 7);
        assert_eq!(m.channel_id, 9);
        assert_eq!(m.order_id, u64::MAX);
        assert_eq!(m.sequence, 11);
        assert_eq!(m.ts_in_delta, 5);
        assert_eq!(m.reserved, [1, 2, 3]);

        let t = TradeMsg::decode(&b);
        assert_eq!(t.price, m.price);
        assert_eq!(t.order_id, m.order_id);

        let mut out = [0u8; 48];
        m.encode_into(&mut out);
        assert_eq!(out, b);
    }

    #[test]
    fn unknown_codes_decode_without_validation() {
        let mut b = [0u8; 48];
        b[12] = b'Z';
        b[13] = 0;
        let m = MboMsg::decode(&b);
        assert_eq!(m.action, b'Z');
        assert_eq!(m.action(), None);
        assert_eq!(m.side(), None);
    }

    #[test]
    fn codes_map_to_ascii() {
        for a in [Action::Add, Action::Cancel, Action::Modify, Action::Clear, Action::Trade, Action::Fill] {
            assert_eq!(Action::try_from(u8::from(a)), Ok(a));
        }
        assert_eq!(char::from(Action::Clear), 'R');
        assert_eq!(char::from(Side::Bid), 'B');
        assert_eq!(Side::try_from(b'N'), Ok(Side::None));
        assert_eq!(Side::try_from(b'x'), Err(b'x'));
    }

    #[test]
    fn rtype_codes() {
        for r in [RType::Mbo, RType::Trade, RType::Mbp10, RType::Ohlcv1D, RType::Definition, RType::Statistics] {
            assert_eq!(RType::try_from(u8::from(r)), Ok(r));
        }
        assert_eq!(u8::from(RType::SymbolMapping), 0x23);
        assert_eq!(RType::try_from(0x14), Err(0x14));
        let hd = RecordHeader { rtype: 0x01, ..Default::default() };
        assert_eq!(hd.rtype(), Some(RType::Trade));
        assert_eq!(RecordHeader { rtype: 160, ..Default::default() }.rtype(), None);
    }

    #[test]
    fn headered_layout_is_58_bytes() {
        let m = HeaderedMboMsg {
            hd: RecordHeader { length: 58, rtype: 160, publisher_id: 1, product_id: 100, ts_event: 1_000_000_007 },
            order_id: 8,
            price: 1_000_800,
            size: 108,
            flags: F_LAST,
            channel_id: 1,
            action: b'A',
            side: b'B',
            ts_recv: 1_000_000_107,
            ts_in_delta: 100,
            sequence: 7,
            symbol_id: 1234,
        };
        let mut buf = [0u8; 58];
        m.encode_into(&mut buf);
        assert_eq!(&buf[14..22], &8u64.to_le_bytes());
        assert_eq!(&buf[54..58], &1234u32.to_le_bytes());
        assert_eq!(HeaderedMboMsg::decode(&buf), m);
    }

    #[test]
    fn price_conversion() {
        assert_eq!(price_to_float(5_000_000_000_000), 5000.0);
        assert_eq!(float_to_price(1.5), 1_500_000_000);
        assert_eq!(float_to_price(-0.000000001), -1);
        assert_eq!(float_to_price(0.1), 100_000_000);
    }

    proptest! {
        #[test]
        fn price_round_trip(x in -(1i64 << 50)..(1i64 << 50)) {
            prop_assert_eq!(float_to_price(price_to_float(x)), x);
        }
    }
}
