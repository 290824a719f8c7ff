//! rencode codec mapped onto `serde_json::Value`.
//!
//! # Design
//! - The daemon speaks rencode; callers work with `serde_json::Value` so the rest of
//!   the workspace never sees wire types.
//! - Dictionary keys that are not strings are rendered with their JSON text form.
//! - Byte strings that are not valid UTF-8 are decoded lossily.
//! - Encoding picks the smallest integer form and always emits float64 for
//!   non-integral numbers so configured thresholds survive the round trip exactly.

use serde_json::{Map, Number, Value};

use crate::error::CodecError;

const CHR_LIST: u8 = 59;
const CHR_DICT: u8 = 60;
const CHR_INT: u8 = 61;
const CHR_INT1: u8 = 62;
const CHR_INT2: u8 = 63;
const CHR_INT4: u8 = 64;
const CHR_INT8: u8 = 65;
const CHR_FLOAT32: u8 = 66;
const CHR_FLOAT64: u8 = 44;
const CHR_TRUE: u8 = 67;
const CHR_FALSE: u8 = 68;
const CHR_NONE: u8 = 69;
const CHR_TERM: u8 = 127;

const INT_POS_FIXED_START: u8 = 0;
const INT_POS_FIXED_COUNT: u8 = 44;
const INT_POS_FIXED_END: u8 = INT_POS_FIXED_START + INT_POS_FIXED_COUNT - 1;
const INT_NEG_FIXED_START: u8 = 70;
const INT_NEG_FIXED_COUNT: u8 = 32;
const INT_NEG_FIXED_END: u8 = INT_NEG_FIXED_START + INT_NEG_FIXED_COUNT - 1;
const DICT_FIXED_START: u8 = 102;
const DICT_FIXED_COUNT: u8 = 25;
const DICT_FIXED_END: u8 = DICT_FIXED_START + DICT_FIXED_COUNT - 1;
const STR_FIXED_START: u8 = 128;
const STR_FIXED_COUNT: u8 = 64;
const STR_FIXED_END: u8 = STR_FIXED_START + STR_FIXED_COUNT - 1;
const LIST_FIXED_START: u8 = 192;
const LIST_FIXED_COUNT: u8 = 64;

/// Maximum container nesting accepted by the decoder.
pub const MAX_DEPTH: usize = 128;

/// Encode a value into its rencode representation.
#[must_use]
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

/// Decode a complete rencode payload.
///
/// # Errors
///
/// Returns a [`CodecError`] when the input is truncated, malformed, nested deeper
/// than [`MAX_DEPTH`], or followed by trailing bytes.
pub fn decode(bytes: &[u8]) -> Result<Value, CodecError> {
    let mut decoder = Decoder { bytes, offset: 0 };
    let value = decoder.value(0)?;
    if decoder.offset != bytes.len() {
        return Err(CodecError::TrailingBytes {
            offset: decoder.offset,
        });
    }
    Ok(value)
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(CHR_NONE),
        Value::Bool(true) => out.push(CHR_TRUE),
        Value::Bool(false) => out.push(CHR_FALSE),
        Value::Number(number) => encode_number(number, out),
        Value::String(text) => encode_bytes(text.as_bytes(), out),
        Value::Array(items) => {
            let fixed = u8::try_from(items.len())
                .ok()
                .filter(|len| *len < LIST_FIXED_COUNT);
            out.push(fixed.map_or(CHR_LIST, |len| LIST_FIXED_START + len));
            for item in items {
                encode_into(item, out);
            }
            if fixed.is_none() {
                out.push(CHR_TERM);
            }
        }
        Value::Object(entries) => {
            let fixed = u8::try_from(entries.len())
                .ok()
                .filter(|len| *len < DICT_FIXED_COUNT);
            out.push(fixed.map_or(CHR_DICT, |len| DICT_FIXED_START + len));
            for (key, item) in entries {
                encode_bytes(key.as_bytes(), out);
                encode_into(item, out);
            }
            if fixed.is_none() {
                out.push(CHR_TERM);
            }
        }
    }
}

fn encode_number(number: &Number, out: &mut Vec<u8>) {
    if let Some(value) = number.as_i64() {
        encode_int(value, out);
    } else if let Some(value) = number.as_u64() {
        out.push(CHR_INT);
        out.extend_from_slice(value.to_string().as_bytes());
        out.push(CHR_TERM);
    } else {
        out.push(CHR_FLOAT64);
        out.extend_from_slice(&number.as_f64().unwrap_or(f64::NAN).to_be_bytes());
    }
}

fn encode_int(value: i64, out: &mut Vec<u8>) {
    if let Some(small) = u8::try_from(value)
        .ok()
        .filter(|small| *small < INT_POS_FIXED_COUNT)
    {
        out.push(INT_POS_FIXED_START + small);
    } else if let Some(code) = (-i64::from(INT_NEG_FIXED_COUNT)..0)
        .contains(&value)
        .then(|| u8::try_from(i64::from(INT_NEG_FIXED_START) - 1 - value).ok())
        .flatten()
    {
        out.push(code);
    } else if let Ok(narrow) = i8::try_from(value) {
        out.push(CHR_INT1);
        out.extend_from_slice(&narrow.to_be_bytes());
    } else if let Ok(narrow) = i16::try_from(value) {
        out.push(CHR_INT2);
        out.extend_from_slice(&narrow.to_be_bytes());
    } else if let Ok(narrow) = i32::try_from(value) {
        out.push(CHR_INT4);
        out.extend_from_slice(&narrow.to_be_bytes());
    } else {
        out.push(CHR_INT8);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    match u8::try_from(bytes.len())
        .ok()
        .filter(|len| *len < STR_FIXED_COUNT)
    {
        Some(len) => out.push(STR_FIXED_START + len),
        None => {
            out.extend_from_slice(bytes.len().to_string().as_bytes());
            out.push(b':');
        }
    }
    out.extend_from_slice(bytes);
}

struct Decoder<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    fn byte(&mut self) -> Result<u8, CodecError> {
        let byte = self.peek()?;
        self.offset += 1;
        Ok(byte)
    }

    fn peek(&self) -> Result<u8, CodecError> {
        self.bytes
            .get(self.offset)
            .copied()
            .ok_or(CodecError::UnexpectedEof {
                offset: self.offset,
            })
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(CodecError::UnexpectedEof {
                offset: self.bytes.len(),
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut buf = [0_u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    /// Bytes up to (not including) `delimiter`; the delimiter is consumed.
    fn take_until(&mut self, delimiter: u8) -> Result<&'a [u8], CodecError> {
        let rest = &self.bytes[self.offset..];
        let end = rest
            .iter()
            .position(|byte| *byte == delimiter)
            .ok_or(CodecError::UnexpectedEof {
                offset: self.bytes.len(),
            })?;
        self.offset += end + 1;
        Ok(&rest[..end])
    }

    fn value(&mut self, depth: usize) -> Result<Value, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::NestingTooDeep { limit: MAX_DEPTH });
        }
        let start = self.offset;
        let code = self.byte()?;
        match code {
            CHR_NONE => Ok(Value::Null),
            CHR_TRUE => Ok(Value::Bool(true)),
            CHR_FALSE => Ok(Value::Bool(false)),
            CHR_INT1 => Ok(Value::from(i8::from_be_bytes(self.take_array()?))),
            CHR_INT2 => Ok(Value::from(i16::from_be_bytes(self.take_array()?))),
            CHR_INT4 => Ok(Value::from(i32::from_be_bytes(self.take_array()?))),
            CHR_INT8 => Ok(Value::from(i64::from_be_bytes(self.take_array()?))),
            CHR_INT => self.text_int(start),
            CHR_FLOAT32 => Ok(float_value(f64::from(f32::from_be_bytes(
                self.take_array()?,
            )))),
            CHR_FLOAT64 => Ok(float_value(f64::from_be_bytes(self.take_array()?))),
            CHR_LIST => {
                let mut items = Vec::new();
                while self.peek()? != CHR_TERM {
                    items.push(self.value(depth + 1)?);
                }
                self.offset += 1;
                Ok(Value::Array(items))
            }
            CHR_DICT => {
                let mut entries = Map::new();
                while self.peek()? != CHR_TERM {
                    let key = key_string(self.value(depth + 1)?);
                    let item = self.value(depth + 1)?;
                    entries.insert(key, item);
                }
                self.offset += 1;
                Ok(Value::Object(entries))
            }
            b'0'..=b'9' => {
                self.offset = start;
                let digits = self.take_until(b':')?;
                let len = std::str::from_utf8(digits)
                    .ok()
                    .and_then(|text| text.parse::<usize>().ok())
                    .ok_or(CodecError::InvalidInteger { offset: start })?;
                Ok(text_value(self.take(len)?))
            }
            INT_POS_FIXED_START..=INT_POS_FIXED_END => {
                Ok(Value::from(code - INT_POS_FIXED_START))
            }
            INT_NEG_FIXED_START..=INT_NEG_FIXED_END => Ok(Value::from(
                i64::from(INT_NEG_FIXED_START) - 1 - i64::from(code),
            )),
            DICT_FIXED_START..=DICT_FIXED_END => {
                let count = code - DICT_FIXED_START;
                let mut entries = Map::new();
                for _ in 0..count {
                    let key = key_string(self.value(depth + 1)?);
                    let item = self.value(depth + 1)?;
                    entries.insert(key, item);
                }
                Ok(Value::Object(entries))
            }
            STR_FIXED_START..=STR_FIXED_END => {
                let len = usize::from(code - STR_FIXED_START);
                Ok(text_value(self.take(len)?))
            }
            LIST_FIXED_START..=u8::MAX => {
                let count = code - LIST_FIXED_START;
                let mut items = Vec::with_capacity(usize::from(count));
                for _ in 0..count {
                    items.push(self.value(depth + 1)?);
                }
                Ok(Value::Array(items))
            }
            _ => Err(CodecError::UnknownTypeCode {
                code,
                offset: start,
            }),
        }
    }

    fn text_int(&mut self, start: usize) -> Result<Value, CodecError> {
        let digits = std::str::from_utf8(self.take_until(CHR_TERM)?)
            .map_err(|_| CodecError::InvalidInteger { offset: start })?;
        if let Ok(value) = digits.parse::<i64>() {
            Ok(Value::from(value))
        } else if let Ok(value) = digits.parse::<u64>() {
            Ok(Value::from(value))
        } else {
            Err(CodecError::InvalidInteger { offset: start })
        }
    }
}

fn float_value(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn text_value(raw: &[u8]) -> Value {
    Value::String(String::from_utf8_lossy(raw).into_owned())
}

fn key_string(key: Value) -> String {
    match key {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integers_use_the_smallest_form() {
        assert_eq!(encode(&json!(0)), vec![0]);
        assert_eq!(encode(&json!(43)), vec![43]);
        assert_eq!(encode(&json!(44)), vec![CHR_INT1, 44]);
        assert_eq!(encode(&json!(-1)), vec![70]);
        assert_eq!(encode(&json!(-32)), vec![101]);
        assert_eq!(encode(&json!(-33)), vec![CHR_INT1, 0xDF]);
        assert_eq!(encode(&json!(1_000)), vec![CHR_INT2, 0x03, 0xE8]);
        assert_eq!(
            encode(&json!(100_000)),
            vec![CHR_INT4, 0x00, 0x01, 0x86, 0xA0]
        );
        assert_eq!(
            encode(&json!(u64::MAX)),
            [
                vec![CHR_INT],
                u64::MAX.to_string().into_bytes(),
                vec![CHR_TERM]
            ]
            .concat()
        );
    }

    #[test]
    fn floats_are_always_encoded_as_float64() {
        assert_eq!(
            encode(&json!(50.0)),
            vec![CHR_FLOAT64, 0x40, 0x49, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(encode(&json!(-1.0))[0], CHR_FLOAT64);
    }

    #[test]
    fn strings_switch_to_length_prefix_past_fixed_range() {
        assert_eq!(encode(&json!("abc")), vec![131, b'a', b'b', b'c']);

        let long = "x".repeat(64);
        let encoded = encode(&json!(long));
        assert!(encoded.starts_with(b"64:"));
        assert_eq!(encoded.len(), 67);
        assert_eq!(decode(&encoded).ok(), Some(json!(long)));
    }

    #[test]
    fn containers_use_fixed_headers_when_small() {
        assert_eq!(encode(&json!([1, 2])), vec![194, 1, 2]);
        assert_eq!(
            encode(&json!({"paused": true})),
            vec![103, 134, b'p', b'a', b'u', b's', b'e', b'd', CHR_TRUE]
        );

        let many: Vec<u8> = (0..70).map(|_| 1).collect();
        let encoded = encode(&json!(many));
        assert_eq!(encoded.first(), Some(&CHR_LIST));
        assert_eq!(encoded.last(), Some(&CHR_TERM));
    }

    #[test]
    fn decodes_daemon_forms_not_produced_by_the_encoder() {
        assert_eq!(
            decode(&[CHR_FLOAT32, 0x42, 0x48, 0, 0]).ok(),
            Some(json!(50.0))
        );
        assert_eq!(
            decode(&[CHR_INT, b'1', b'2', b'3', CHR_TERM]).ok(),
            Some(json!(123))
        );
        assert_eq!(
            decode(&[CHR_LIST, 1, 2, CHR_TERM]).ok(),
            Some(json!([1, 2]))
        );
        assert_eq!(
            decode(&[CHR_DICT, 129, b'a', 1, CHR_TERM]).ok(),
            Some(json!({"a": 1}))
        );
        assert_eq!(decode(&[103, 1, CHR_TRUE]).ok(), Some(json!({"1": true})));
        assert_eq!(decode(&[CHR_NONE]).ok(), Some(Value::Null));
    }

    #[test]
    fn torrent_status_payload_round_trips() {
        let payload = json!({
            "8a3c1f6b2d9e4a7c5b0f1e2d3c4b5a6978695a4b": {"paused": true},
            "0f1e2d3c4b5a69788a3c1f6b2d9e4a7c5b695a4b": {"paused": false},
        });
        assert_eq!(decode(&encode(&payload)).ok(), Some(payload));
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert_eq!(
            decode(&[CHR_INT2, 0x03]),
            Err(CodecError::UnexpectedEof { offset: 2 })
        );
        assert_eq!(
            decode(&[45]),
            Err(CodecError::UnknownTypeCode { code: 45, offset: 0 })
        );
        assert_eq!(
            decode(&[1, 2]),
            Err(CodecError::TrailingBytes { offset: 1 })
        );
        assert_eq!(
            decode(&[CHR_INT, b'x', CHR_TERM]),
            Err(CodecError::InvalidInteger { offset: 0 })
        );
        assert_eq!(
            decode(&[CHR_LIST, 1]),
            Err(CodecError::UnexpectedEof { offset: 2 })
        );
    }

    #[test]
    fn nesting_is_bounded() {
        let mut bytes = vec![LIST_FIXED_START + 1; MAX_DEPTH + 2];
        bytes.push(0);
        assert_eq!(
            decode(&bytes),
            Err(CodecError::NestingTooDeep { limit: MAX_DEPTH })
        );
    }
}
