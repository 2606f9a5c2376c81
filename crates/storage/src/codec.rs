//! Record codec
//!
//! Packs one value per schema field into a fixed-size record and unpacks
//! records back into values. All bytes passing between callers and the
//! data file go through [`RecordCodec`]; projected reads and the typed
//! array target reuse its per-token decoding so every representation sees
//! the same interpretation of the same bytes.
//!
//! # Value rules
//!
//! | token | accepts | decodes to |
//! |-------|---------|------------|
//! | `?` | `Bool` | `Bool` |
//! | `b h i l q` | `Int`, `UInt` in range | `Int` |
//! | `B H I L Q` | `UInt`, non-negative `Int` in range | `UInt` |
//! | `e f d` | `Float` | `Float` |
//! | `c` | `Bytes` of length 1 | `Bytes` |
//! | `Ns` | `Bytes` up to N long, zero padded | `Bytes`, trailing NULs stripped |
//! | `Nx` (repeated) | `Array` of N scalars | `Array` |

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use recstore_core::{Endian, Error, FormatToken, Result, Schema, TypeCode, Value};

/// Encoder/decoder bound to one schema
#[derive(Debug, Clone)]
pub struct RecordCodec {
    tokens: Vec<FormatToken>,
    keys: Vec<String>,
    endian: Endian,
    record_size: usize,
}

impl RecordCodec {
    /// Codec for `schema`
    pub fn new(schema: &Schema) -> Self {
        RecordCodec {
            tokens: schema.tokens().to_vec(),
            keys: schema.keys().map(str::to_string).collect(),
            endian: schema.endian(),
            record_size: schema.record_size(),
        }
    }

    /// Bytes per record
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Pack `values` positionally into one record
    pub fn encode(&self, values: &[Value]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.record_size);
        self.encode_into(values, &mut out)?;
        Ok(out)
    }

    /// Pack `values` and append the record to `out`
    ///
    /// On error `out` is left as it was.
    pub fn encode_into(&self, values: &[Value], out: &mut Vec<u8>) -> Result<()> {
        if values.len() != self.tokens.len() {
            return Err(Error::encoding(format!(
                "expected {} values, got {}",
                self.tokens.len(),
                values.len()
            )));
        }

        let start = out.len();
        out.resize(start + self.record_size, 0);
        let result = if self.endian.is_little() {
            self.encode_with::<LittleEndian>(values, &mut out[start..])
        } else {
            self.encode_with::<BigEndian>(values, &mut out[start..])
        };
        if result.is_err() {
            out.truncate(start);
        }
        result
    }

    fn encode_with<B: ByteOrder>(&self, values: &[Value], buf: &mut [u8]) -> Result<()> {
        let mut offset = 0;
        for ((token, value), key) in self.tokens.iter().zip(values).zip(&self.keys) {
            let size = token.size(self.endian);
            encode_token::<B>(*token, self.endian, value, &mut buf[offset..offset + size])
                .map_err(|e| Error::encoding(format!("field '{}': {}", key, e)))?;
            offset += size;
        }
        Ok(())
    }

    /// Unpack the record starting at `offset`
    pub fn decode_one(&self, bytes: &[u8], offset: usize) -> Result<Vec<Value>> {
        let end = offset
            .checked_add(self.record_size)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                Error::decoding(format!(
                    "need {} bytes at offset {}, buffer holds {}",
                    self.record_size,
                    offset,
                    bytes.len()
                ))
            })?;
        let record = &bytes[offset..end];
        Ok(if self.endian.is_little() {
            self.decode_with::<LittleEndian>(record)
        } else {
            self.decode_with::<BigEndian>(record)
        })
    }

    fn decode_with<B: ByteOrder>(&self, record: &[u8]) -> Vec<Value> {
        let mut offset = 0;
        self.tokens
            .iter()
            .map(|token| {
                let size = token.size(self.endian);
                let value = decode_token::<B>(*token, self.endian, &record[offset..offset + size]);
                offset += size;
                value
            })
            .collect()
    }

    /// Lazily unpack consecutive records
    ///
    /// A clean end yields nothing more; a tail shorter than one record
    /// yields a single `Decoding` error.
    pub fn decode_many<'a>(&'a self, bytes: &'a [u8]) -> DecodeIter<'a> {
        DecodeIter {
            codec: self,
            bytes,
            offset: 0,
            failed: false,
        }
    }
}

/// Iterator returned by [`RecordCodec::decode_many`]
pub struct DecodeIter<'a> {
    codec: &'a RecordCodec,
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl Iterator for DecodeIter<'_> {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.codec.record_size == 0 {
            return None;
        }
        let remaining = self.bytes.len() - self.offset;
        if remaining == 0 {
            return None;
        }
        if remaining < self.codec.record_size {
            self.failed = true;
            return Some(Err(Error::decoding(format!(
                "{} trailing bytes do not form a whole {}-byte record",
                remaining, self.codec.record_size
            ))));
        }
        let item = self.codec.decode_one(self.bytes, self.offset);
        self.offset += self.codec.record_size;
        Some(item)
    }
}

/// Decode one token from exactly `token.size(endian)` bytes
pub(crate) fn decode_token<B: ByteOrder>(token: FormatToken, endian: Endian, buf: &[u8]) -> Value {
    match token.code {
        TypeCode::Bytes => {
            let end = buf.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            Value::Bytes(buf[..end].to_vec())
        }
        _ if token.is_repeated() => {
            let width = token.code.width(endian);
            Value::Array(
                buf.chunks_exact(width)
                    .map(|chunk| decode_scalar::<B>(token.code, chunk))
                    .collect(),
            )
        }
        code => decode_scalar::<B>(code, buf),
    }
}

fn decode_scalar<B: ByteOrder>(code: TypeCode, buf: &[u8]) -> Value {
    match code {
        TypeCode::Bool => Value::Bool(buf[0] != 0),
        TypeCode::Char => Value::Bytes(vec![buf[0]]),
        TypeCode::F16 => Value::Float(f16_bits_to_f64(B::read_u16(buf))),
        TypeCode::F32 => Value::Float(B::read_f32(buf) as f64),
        TypeCode::F64 => Value::Float(B::read_f64(buf)),
        c if c.is_signed_int() => Value::Int(B::read_int(buf, buf.len())),
        _ => Value::UInt(B::read_uint(buf, buf.len())),
    }
}

fn encode_token<B: ByteOrder>(
    token: FormatToken,
    endian: Endian,
    value: &Value,
    buf: &mut [u8],
) -> std::result::Result<(), String> {
    match token.code {
        TypeCode::Bytes => {
            let bytes = value
                .as_bytes()
                .ok_or_else(|| format!("expected Bytes, got {}", value.type_name()))?;
            if bytes.len() > buf.len() {
                return Err(format!(
                    "{} bytes do not fit a {}-byte string",
                    bytes.len(),
                    buf.len()
                ));
            }
            buf[..bytes.len()].copy_from_slice(bytes);
            buf[bytes.len()..].fill(0);
            Ok(())
        }
        _ if token.is_repeated() => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("expected Array of {}, got {}", token.count, value.type_name()))?;
            if items.len() != token.count {
                return Err(format!(
                    "expected {} elements, got {}",
                    token.count,
                    items.len()
                ));
            }
            let width = token.code.width(endian);
            for (item, chunk) in items.iter().zip(buf.chunks_exact_mut(width)) {
                encode_scalar::<B>(token.code, item, chunk)?;
            }
            Ok(())
        }
        code => encode_scalar::<B>(code, value, buf),
    }
}

fn encode_scalar<B: ByteOrder>(
    code: TypeCode,
    value: &Value,
    buf: &mut [u8],
) -> std::result::Result<(), String> {
    let mismatch = || format!("'{}' cannot hold {}", code.as_char(), value.type_name());
    match code {
        TypeCode::Bool => {
            buf[0] = value.as_bool().ok_or_else(mismatch)? as u8;
        }
        TypeCode::Char => match value.as_bytes() {
            Some([b]) => buf[0] = *b,
            _ => return Err("'c' needs Bytes of length 1".to_string()),
        },
        TypeCode::F16 => {
            let x = value.as_float().ok_or_else(mismatch)?;
            let bits = f64_to_f16_bits(x).ok_or_else(|| format!("{} is too large for 'e'", x))?;
            B::write_u16(buf, bits);
        }
        TypeCode::F32 => {
            let x = value.as_float().ok_or_else(mismatch)?;
            let narrowed = x as f32;
            if x.is_finite() && narrowed.is_infinite() {
                return Err(format!("{} is too large for 'f'", x));
            }
            B::write_f32(buf, narrowed);
        }
        TypeCode::F64 => {
            B::write_f64(buf, value.as_float().ok_or_else(mismatch)?);
        }
        c if c.is_signed_int() => {
            let n = match value {
                Value::Int(i) => *i,
                Value::UInt(u) => i64::try_from(*u).map_err(|_| format!("{} out of range", u))?,
                _ => return Err(mismatch()),
            };
            let bits = buf.len() as u32 * 8;
            if bits < 64 {
                let (min, max) = (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1);
                if n < min || n > max {
                    return Err(format!("{} out of range for '{}'", n, c.as_char()));
                }
            }
            B::write_int(buf, n, buf.len());
        }
        c => {
            let n = match value {
                Value::UInt(u) => *u,
                Value::Int(i) => u64::try_from(*i).map_err(|_| format!("{} out of range", i))?,
                _ => return Err(mismatch()),
            };
            let bits = buf.len() as u32 * 8;
            if bits < 64 && n >> bits != 0 {
                return Err(format!("{} out of range for '{}'", n, c.as_char()));
            }
            B::write_uint(buf, n, buf.len());
        }
    }
    Ok(())
}

fn f16_bits_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exp = ((bits >> 10) & 0x1f) as i32;
    let frac = (bits & 0x3ff) as f64;
    let magnitude = match exp {
        0 => frac * 2f64.powi(-24),
        0x1f if frac == 0.0 => f64::INFINITY,
        0x1f => f64::NAN,
        _ => (1.0 + frac / 1024.0) * 2f64.powi(exp - 15),
    };
    sign * magnitude
}

/// Round-to-nearest-even conversion; `None` when a finite value overflows.
fn f64_to_f16_bits(value: f64) -> Option<u16> {
    let x = (value as f32).to_bits();
    let sign = ((x >> 16) & 0x8000) as u16;
    let exp = ((x >> 23) & 0xff) as i32;
    let man = x & 0x007f_ffff;

    if exp == 0xff {
        let nan = if man != 0 { 0x0200 } else { 0 };
        return Some(sign | 0x7c00 | nan);
    }
    if value.is_finite() && (value as f32).is_infinite() {
        return None;
    }

    let half_exp = exp - 127 + 15;
    if half_exp >= 0x1f {
        return None;
    }
    if half_exp <= 0 {
        if 14 - half_exp > 24 {
            return Some(sign);
        }
        let m = man | 0x0080_0000;
        let mut half_man = m >> (14 - half_exp);
        let round_bit = 1u32 << (13 - half_exp);
        if (m & round_bit) != 0 && (m & (3 * round_bit - 1)) != 0 {
            half_man += 1;
        }
        return Some(sign | half_man as u16);
    }

    let mut bits = ((half_exp as u32) << 10) | (man >> 13);
    let round_bit = 0x0000_1000;
    if (man & round_bit) != 0 && (man & (3 * round_bit - 1)) != 0 {
        bits += 1;
    }
    if bits >= 0x7c00 {
        return None;
    }
    Some(sign | bits as u16)
}
