use serde::de::{EnumAccess, SeqAccess, VariantAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Runtime values stored per variable and produced by evaluation.
///
/// Serialization is untagged in human-readable formats so the wire shape
/// matches plain JSON: numbers as numbers, strings as strings, multi-select
/// lists as arrays, null as null. Binary formats get an externally tagged
/// shape instead, because non-self-describing codecs like the bincode-based
/// session artifact cannot decode untagged data.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
    Null,
}

const VALUE_VARIANTS: &[&str] = &["Bool", "Number", "Text", "List", "Null"];

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            match self {
                Value::Bool(b) => serializer.serialize_bool(*b),
                Value::Number(n) => serializer.serialize_f64(*n),
                Value::Text(s) => serializer.serialize_str(s),
                Value::List(items) => items.serialize(serializer),
                Value::Null => serializer.serialize_unit(),
            }
        } else {
            match self {
                Value::Bool(b) => serializer.serialize_newtype_variant("Value", 0, "Bool", b),
                Value::Number(n) => serializer.serialize_newtype_variant("Value", 1, "Number", n),
                Value::Text(s) => serializer.serialize_newtype_variant("Value", 2, "Text", s),
                Value::List(items) => {
                    serializer.serialize_newtype_variant("Value", 3, "List", items)
                }
                Value::Null => serializer.serialize_unit_variant("Value", 4, "Null"),
            }
        }
    }
}

/// Dispatches on the self-described input shape, mirroring what the untagged
/// derive accepts: booleans, any number, strings, arrays of strings, null.
struct UntaggedVisitor;

impl<'de> Visitor<'de> for UntaggedVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean, number, string, list of strings or null")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(v))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Text(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::Text(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(UntaggedVisitor)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<String>()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }
}

/// Variant tag read back from binary input, by index or by name.
struct Tag(u32);

struct TagVisitor;

impl Visitor<'_> for TagVisitor {
    type Value = u32;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a Value variant tag")
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<u32, E> {
        if v < VALUE_VARIANTS.len() as u64 {
            Ok(v as u32)
        } else {
            Err(E::invalid_value(serde::de::Unexpected::Unsigned(v), &self))
        }
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<u32, E> {
        match v {
            "Bool" => Ok(0),
            "Number" => Ok(1),
            "Text" => Ok(2),
            "List" => Ok(3),
            "Null" => Ok(4),
            _ => Err(E::unknown_variant(v, VALUE_VARIANTS)),
        }
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Tag, D::Error> {
        deserializer.deserialize_identifier(TagVisitor).map(Tag)
    }
}

struct TaggedVisitor;

impl<'de> Visitor<'de> for TaggedVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an externally tagged Value enum")
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Value, A::Error> {
        let (Tag(tag), variant) = data.variant::<Tag>()?;
        match tag {
            0 => variant.newtype_variant().map(Value::Bool),
            1 => variant.newtype_variant().map(Value::Number),
            2 => variant.newtype_variant().map(Value::Text),
            3 => variant.newtype_variant().map(Value::List),
            _ => variant.unit_variant().map(|()| Value::Null),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(UntaggedVisitor)
        } else {
            deserializer.deserialize_enum("Value", VALUE_VARIANTS, TaggedVisitor)
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value. Text parses leniently; booleans, lists and
    /// null never coerce.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Strict boolean identity, no coercion.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this value counts as "unset" for the declared type, which is
    /// what `set_if_unset` checks before writing.
    pub fn is_default_for(&self, var_type: VarType) -> bool {
        match self {
            Value::Null => true,
            Value::Number(n) => var_type == VarType::Number && *n == 0.0,
            Value::Text(s) => {
                matches!(
                    var_type,
                    VarType::Text | VarType::RichText | VarType::Date | VarType::Select
                ) && s.is_empty()
            }
            Value::Bool(b) => var_type == VarType::Boolean && !*b,
            Value::List(items) => var_type == VarType::MultiSelect && items.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
            Value::List(items) => write!(f, "[{}]", items.join(", ")),
            Value::Null => write!(f, "null"),
        }
    }
}

/// Declared variable types as authored on sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarType {
    Number,
    Text,
    RichText,
    Boolean,
    Date,
    Select,
    MultiSelect,
}

impl VarType {
    /// The empty value a freshly declared variable of this type holds.
    pub fn default_value(self) -> Value {
        match self {
            VarType::Number => Value::Number(0.0),
            VarType::Text | VarType::RichText | VarType::Date | VarType::Select => {
                Value::Text(String::new())
            }
            VarType::Boolean => Value::Bool(false),
            VarType::MultiSelect => Value::List(Vec::new()),
        }
    }
}
