//! The serialized form of an assembled program: a flat stream of objects,
//! each written as one postcard record.

use super::{Opcode, Result, Timestamp};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Parses `#rrggbb` or `#rrggbbaa`
    pub fn parse(text: &str) -> Option<Self> {
        let hex = text.strip_prefix('#')?;
        if !matches!(hex.len(), 6 | 8) || !hex.bytes().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if hex.len() == 8 { channel(6)? } else { 255 },
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

/// The type tags a docasm literal may carry, in their fixed order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TypeTag {
    Null,
    String,
    Timestamp,
    Color,
    Bool,
    U64,
    I64,
    F64,
    Uuid,
}

impl TypeTag {
    pub const ALL: [TypeTag; 9] = [
        TypeTag::Null,
        TypeTag::String,
        TypeTag::Timestamp,
        TypeTag::Color,
        TypeTag::Bool,
        TypeTag::U64,
        TypeTag::I64,
        TypeTag::F64,
        TypeTag::Uuid,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.to_string() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Object {
    Op(Opcode),
    Null,
    String(String),
    Timestamp(Timestamp),
    Color(Color),
    Bool(bool),
    U64(u64),
    I64(i64),
    F64(OrderedFloat<f64>),
    Uuid(u128),
}

impl Object {
    /// Converts the body of a tagged literal, `None` if it does not parse
    /// as the tagged type.
    pub fn from_literal(tag: TypeTag, text: &str) -> Option<Self> {
        Some(match tag {
            TypeTag::Null if text.is_empty() || text == "null" => Object::Null,
            TypeTag::Null => return None,
            TypeTag::String => Object::String(text.to_owned()),
            TypeTag::Timestamp => Object::Timestamp(Timestamp::parse(text)?),
            TypeTag::Color => Object::Color(Color::parse(text)?),
            TypeTag::Bool => Object::Bool(text.parse().ok()?),
            TypeTag::U64 => Object::U64(text.parse().ok()?),
            TypeTag::I64 => Object::I64(text.parse().ok()?),
            TypeTag::F64 => Object::F64(OrderedFloat(text.parse().ok()?)),
            TypeTag::Uuid => Object::Uuid(parse_uuid(text)?),
        })
    }
}

/// Accepts the hyphenated and the plain 32 digit hex form
pub fn parse_uuid(text: &str) -> Option<u128> {
    let digits: String = text.chars().filter(|c| *c != '-').collect();
    if digits.len() != 32 {
        return None;
    }
    u128::from_str_radix(&digits, 16).ok()
}

pub fn format_uuid(id: u128) -> String {
    let hex = format!("{:032x}", id);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..]
    )
}

/// Receives the objects produced by the emitter
pub trait ObjectSink {
    fn emit(&mut self, obj: Object) -> Result<()>;
}

impl ObjectSink for Vec<Object> {
    fn emit(&mut self, obj: Object) -> Result<()> {
        self.push(obj);
        Ok(())
    }
}

/// Writes every object as one postcard record
#[derive(Debug, Clone, Default)]
pub struct ByteStream {
    pub bytes: Vec<u8>,
    pub count: usize,
}

impl ObjectSink for ByteStream {
    fn emit(&mut self, obj: Object) -> Result<()> {
        let mut record = postcard::to_allocvec(&obj)?;
        self.bytes.append(&mut record);
        self.count += 1;
        Ok(())
    }
}

pub fn serialize(objects: &[Object]) -> Result<Vec<u8>> {
    let mut stream = ByteStream::default();
    for obj in objects {
        stream.emit(obj.clone())?;
    }
    Ok(stream.bytes)
}

/// Reads back a stream written by [`ByteStream`]
pub fn deserialize(mut bytes: &[u8]) -> Result<Vec<Object>> {
    let mut objects = vec![];
    while !bytes.is_empty() {
        let (obj, rest) = postcard::take_from_bytes::<Object>(bytes)?;
        objects.push(obj);
        bytes = rest;
    }
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_color() {
        let c = Color::parse("#ff8000").unwrap();
        assert_eq!((c.r, c.g, c.b, c.a), (255, 128, 0, 255));
        assert_eq!(c.to_string(), "#ff8000");
        assert_eq!(Color::parse("#ff800080").unwrap().a, 128);
        assert_eq!(Color::parse("#ff80"), None);
        assert_eq!(Color::parse("ff8000"), None);
        assert_eq!(Color::parse("#gg8000"), None);
    }

    #[test]
    fn test_type_tags() {
        assert_eq!(TypeTag::from_name("u64"), Some(TypeTag::U64));
        assert_eq!(TypeTag::from_name("timestamp"), Some(TypeTag::Timestamp));
        assert_eq!(TypeTag::from_name("U64"), None);
    }

    #[test]
    fn test_from_literal() {
        assert_eq!(
            Object::from_literal(TypeTag::Color, "#000000"),
            Some(Object::Color(Color {
                r: 0,
                g: 0,
                b: 0,
                a: 255
            }))
        );
        assert_eq!(Object::from_literal(TypeTag::U64, "12"), Some(Object::U64(12)));
        assert_eq!(Object::from_literal(TypeTag::U64, "-12"), None);
        assert_eq!(Object::from_literal(TypeTag::Bool, "true"), Some(Object::Bool(true)));
        assert_eq!(
            Object::from_literal(TypeTag::Uuid, "00000000-0000-0000-0000-00000000002a"),
            Some(Object::Uuid(42))
        );
    }

    #[test]
    fn test_uuid_format() {
        let text = format_uuid(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        assert_eq!(text, "01234567-89ab-cdef-0123-456789abcdef");
        assert_eq!(parse_uuid(&text), Some(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef));
    }

    #[test]
    fn test_stream() {
        let objects = vec![
            Object::Op(Opcode::Push),
            Object::String("hello".into()),
            Object::Op(Opcode::Ja),
            Object::U64(0),
            Object::F64(OrderedFloat(1.5)),
            Object::Uuid(u128::MAX),
        ];
        let bytes = serialize(&objects).unwrap();
        assert_eq!(deserialize(&bytes).unwrap(), objects);
    }
}
