//! Field dtypes of a structured array and their decoding.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Float,
    Int,
    UInt,
    Bool,
    /// UTF-32 code units.
    Unicode,
    Bytes,
    /// Padding.
    Void,
}

/// A decoded dtype string such as `<f8` or `|S12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DType {
    order: ByteOrder,
    pub(crate) kind: Kind,
    /// Width in bytes.
    pub(crate) size: usize,
}

const NATIVE: ByteOrder = if cfg!(target_endian = "big") {
    ByteOrder::Big
} else {
    ByteOrder::Little
};

impl DType {
    /// Parse a NumPy type string. Returns `None` for kinds or widths the
    /// reader cannot decode.
    pub(crate) fn parse(descr: &str) -> Option<Self> {
        let mut chars = descr.chars();
        let (order, kind_char) = match chars.next()? {
            '<' | '|' => (ByteOrder::Little, chars.next()?),
            '>' => (ByteOrder::Big, chars.next()?),
            '=' => (NATIVE, chars.next()?),
            c => (NATIVE, c),
        };
        let count: usize = chars.as_str().parse().ok()?;
        let (kind, size) = match kind_char {
            'f' if matches!(count, 4 | 8) => (Kind::Float, count),
            'i' if matches!(count, 1 | 2 | 4 | 8) => (Kind::Int, count),
            'u' if matches!(count, 1 | 2 | 4 | 8) => (Kind::UInt, count),
            'b' if count == 1 => (Kind::Bool, 1),
            'U' if count > 0 => (Kind::Unicode, count.checked_mul(4)?),
            'S' | 'a' if count > 0 => (Kind::Bytes, count),
            'V' => (Kind::Void, count),
            _ => return None,
        };
        Some(Self { order, kind, size })
    }

    /// Whether values of this dtype land in a numeric column.
    pub(crate) fn is_numeric(self) -> bool {
        matches!(self.kind, Kind::Float | Kind::Int | Kind::UInt | Kind::Bool)
    }

    /// Decode one numeric value; `bytes` is exactly `self.size` long.
    pub(crate) fn decode_number(self, bytes: &[u8]) -> f64 {
        match (self.kind, self.size) {
            (Kind::Float, 4) => f64::from(f32::from_le_bytes(self.little::<4>(bytes))),
            (Kind::Float, _) => f64::from_le_bytes(self.little::<8>(bytes)),
            (Kind::Int, 1) => f64::from(bytes[0] as i8),
            (Kind::Int, 2) => f64::from(i16::from_le_bytes(self.little::<2>(bytes))),
            (Kind::Int, 4) => f64::from(i32::from_le_bytes(self.little::<4>(bytes))),
            (Kind::Int, _) => i64::from_le_bytes(self.little::<8>(bytes)) as f64,
            (Kind::UInt, 1) => f64::from(bytes[0]),
            (Kind::UInt, 2) => f64::from(u16::from_le_bytes(self.little::<2>(bytes))),
            (Kind::UInt, 4) => f64::from(u32::from_le_bytes(self.little::<4>(bytes))),
            (Kind::UInt, _) => u64::from_le_bytes(self.little::<8>(bytes)) as f64,
            (Kind::Bool, _) => f64::from(u8::from(bytes[0] != 0)),
            _ => f64::NAN,
        }
    }

    /// Decode one string value with trailing NULs stripped.
    /// `None` means an invalid code point or byte sequence.
    pub(crate) fn decode_text(self, bytes: &[u8]) -> Option<String> {
        match self.kind {
            Kind::Unicode => {
                let mut out = String::with_capacity(bytes.len() / 4);
                for unit in bytes.chunks_exact(4) {
                    let code = u32::from_le_bytes(self.little::<4>(unit));
                    out.push(char::from_u32(code)?);
                }
                Some(out.trim_end_matches('\0').to_string())
            }
            Kind::Bytes => {
                let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                String::from_utf8(bytes[..end].to_vec()).ok()
            }
            _ => None,
        }
    }

    /// Copy `N` bytes into little-endian order.
    fn little<const N: usize>(self, bytes: &[u8]) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes[..N]);
        if self.order == ByteOrder::Big {
            out.reverse();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_descriptors() {
        let f8 = DType::parse("<f8").unwrap();
        assert_eq!((f8.kind, f8.size), (Kind::Float, 8));
        let u10 = DType::parse("<U10").unwrap();
        assert_eq!((u10.kind, u10.size), (Kind::Unicode, 40));
        assert_eq!(DType::parse("|S7").unwrap().kind, Kind::Bytes);
        assert_eq!(DType::parse("|b1").unwrap().kind, Kind::Bool);
        assert_eq!(DType::parse("|V4").unwrap().size, 4);
    }

    #[test]
    fn rejects_unsupported() {
        for descr in ["<c16", "<f2", "<i3", "<M8[ns]", "|O", ""] {
            assert!(DType::parse(descr).is_none(), "{descr} should be rejected");
        }
    }

    #[test]
    fn decodes_both_byte_orders() {
        let value = 2.5f64;
        let little = DType::parse("<f8").unwrap();
        let big = DType::parse(">f8").unwrap();
        assert_eq!(little.decode_number(&value.to_le_bytes()), 2.5);
        assert_eq!(big.decode_number(&value.to_be_bytes()), 2.5);

        let i2 = DType::parse(">i2").unwrap();
        assert_eq!(i2.decode_number(&(-300i16).to_be_bytes()), -300.0);
        let f4 = DType::parse("<f4").unwrap();
        assert_eq!(f4.decode_number(&0.25f32.to_le_bytes()), 0.25);
    }

    #[test]
    fn decodes_padded_strings() {
        let u = DType::parse("<U8").unwrap();
        let mut bytes = Vec::new();
        for c in "spiral".chars() {
            bytes.extend_from_slice(&(c as u32).to_le_bytes());
        }
        bytes.resize(32, 0);
        assert_eq!(u.decode_text(&bytes).as_deref(), Some("spiral"));

        let s = DType::parse("|S6").unwrap();
        assert_eq!(s.decode_text(b"merger").as_deref(), Some("merger"));
        assert_eq!(s.decode_text(b"ell\0\0\0").as_deref(), Some("ell"));
    }

    #[test]
    fn invalid_code_point_is_none() {
        let u = DType::parse("<U1").unwrap();
        assert!(u.decode_text(&0xD800u32.to_le_bytes()).is_none());
    }
}
