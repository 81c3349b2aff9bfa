//! MsgPack codec using `rmp-serde`.
//!
//! **Always** encode with `to_vec_named`: tagged values are written as maps,
//! and the peer recognises them by their keys.
//!
//! Decoding runs in two steps. `rmp-serde` first produces plain [`Value`]s
//! (maps, arrays, scalars); [`WireShape::classify`] then rewrites tagged maps
//! bottom-up into tensors, slices and node references.
//!
//! # Example
//!
//! ```
//! use hurray_client::codec::{MsgPackCodec, Slice, Tensor, Value};
//!
//! let value = Value::Array(vec![
//!     Value::Tensor(Tensor::from_slice(&[1i64, 2, 3])),
//!     Value::Range(Slice::from(1..4)),
//! ]);
//! let encoded = MsgPackCodec::encode(&value).unwrap();
//! let decoded = MsgPackCodec::decode_detached(&encoded).unwrap();
//! assert_eq!(decoded, value);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::tensor::{DType, Tensor};
use super::value::{Slice, Value};
use crate::error::{HurrayError, Result};
use crate::node::{NodeKind, NodeRef};

/// Tag and field names of the extension shapes.
pub mod tags {
    pub const NDARRAY: &str = "__ndarray__";
    pub const DESCR: &str = "descr";
    pub const FORTRAN_ORDER: &str = "fortran_order";
    pub const SHAPE: &str = "shape";
    pub const ARRAYDATA: &str = "arraydata";

    pub const SLICE: &str = "__slice__";

    pub const NODE_TYPE: &str = "type";
    pub const NODE_FILE: &str = "h5file";
    pub const NODE_PATH: &str = "path";
    pub const NODE_SHAPE: &str = "shape";
    pub const NODE_DTYPE: &str = "dtype";
}

/// Closed set of shapes a decoded map can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireShape {
    NdArray,
    Slice,
    Node(NodeKind),
    Plain,
}

impl WireShape {
    /// Classify a map by its tags; the first matching tag wins.
    pub fn classify(map: &BTreeMap<String, Value>) -> WireShape {
        if map.contains_key(tags::NDARRAY) {
            return WireShape::NdArray;
        }
        if map.contains_key(tags::SLICE) {
            return WireShape::Slice;
        }
        match map
            .get(tags::NODE_TYPE)
            .and_then(Value::as_str)
            .and_then(NodeKind::parse)
        {
            Some(kind) => WireShape::Node(kind),
            None => WireShape::Plain,
        }
    }
}

/// Turns decoded node references into values.
///
/// The connection implements this to bind proxies to itself before they
/// reach the caller.
pub trait Resolver {
    fn resolve(&mut self, reference: NodeRef) -> Result<Value>;
}

/// Leaves node references as plain maps.
#[derive(Debug, Default, Clone, Copy)]
pub struct Detached;

impl Resolver for Detached {
    fn resolve(&mut self, reference: NodeRef) -> Result<Value> {
        Ok(reference.into_value())
    }
}

/// MessagePack codec for wire values.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes.
    ///
    /// # Errors
    ///
    /// Returns `HurrayError::MsgPackEncode` if rmp-serde rejects the value.
    #[inline]
    pub fn encode(value: &Value) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes, resolving node references through `resolver`.
    ///
    /// # Errors
    ///
    /// Returns `HurrayError::MsgPackDecode` for malformed MessagePack and
    /// `HurrayError::Protocol` for a malformed tensor, slice or node map.
    /// Errors from `resolver` are passed through.
    pub fn decode(bytes: &[u8], resolver: &mut dyn Resolver) -> Result<Value> {
        let raw: Value = rmp_serde::from_slice(bytes)?;
        dispatch(raw, resolver)
    }

    /// Decode MsgPack bytes; node references stay plain maps.
    ///
    /// # Errors
    ///
    /// Same as [`MsgPackCodec::decode`].
    pub fn decode_detached(bytes: &[u8]) -> Result<Value> {
        Self::decode(bytes, &mut Detached)
    }
}

fn dispatch(value: Value, resolver: &mut dyn Resolver) -> Result<Value> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| dispatch(item, resolver))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Map(map) => {
            let map = map
                .into_iter()
                .map(|(key, item)| Ok((key, dispatch(item, resolver)?)))
                .collect::<Result<BTreeMap<_, _>>>()?;
            match WireShape::classify(&map) {
                WireShape::NdArray => decode_tensor(map).map(Value::Tensor),
                WireShape::Slice => decode_slice(&map).map(Value::Range),
                WireShape::Node(kind) => resolver.resolve(NodeRef::from_map(kind, &map)?),
                WireShape::Plain => Ok(Value::Map(map)),
            }
        }
        other => Ok(other),
    }
}

fn decode_tensor(mut map: BTreeMap<String, Value>) -> Result<Tensor> {
    let dtype = match map.get(tags::DESCR) {
        Some(Value::Str(descr)) => DType::parse_descr(descr)?,
        _ => {
            return Err(HurrayError::Protocol(
                "Tensor map needs a string 'descr'".into(),
            ))
        }
    };
    let fortran_order = map
        .get(tags::FORTRAN_ORDER)
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let shape = map
        .get(tags::SHAPE)
        .and_then(Value::to_shape)
        .ok_or_else(|| HurrayError::Protocol("Tensor map needs a 'shape' tuple".into()))?;
    let data = match map.remove(tags::ARRAYDATA) {
        Some(Value::Bin(data)) => data,
        Some(Value::Str(data)) => data.into_bytes(),
        _ => {
            return Err(HurrayError::Protocol(
                "Tensor map needs binary 'arraydata'".into(),
            ))
        }
    };
    if fortran_order {
        Tensor::from_column_major(dtype, shape, data)
    } else {
        Tensor::new(dtype, shape, data)
    }
}

fn decode_slice(map: &BTreeMap<String, Value>) -> Result<Slice> {
    let invalid = || HurrayError::Protocol("Slice map needs 1 to 3 integers or nils".into());
    let parts = map
        .get(tags::SLICE)
        .and_then(Value::as_array)
        .ok_or_else(invalid)?;
    let bound = |v: &Value| -> Result<Option<i64>> {
        match v {
            Value::Nil => Ok(None),
            other => other.as_i64().map(Some).ok_or_else(invalid),
        }
    };
    match parts {
        [stop] => Ok(Slice::new(None, bound(stop)?, None)),
        [start, stop] => Ok(Slice::new(bound(start)?, bound(stop)?, None)),
        [start, stop, step] => Ok(Slice::new(bound(start)?, bound(stop)?, bound(step)?)),
        _ => Err(invalid()),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Bin(b) => serializer.serialize_bytes(b),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, item) in map {
                    out.serialize_entry(key, item)?;
                }
                out.end()
            }
            Value::Tensor(tensor) => {
                let mut out = serializer.serialize_map(Some(5))?;
                out.serialize_entry(tags::NDARRAY, &true)?;
                out.serialize_entry(tags::DESCR, &tensor.dtype().descr())?;
                out.serialize_entry(tags::FORTRAN_ORDER, &false)?;
                out.serialize_entry(tags::SHAPE, tensor.shape())?;
                out.serialize_entry(tags::ARRAYDATA, serde_bytes::Bytes::new(tensor.as_bytes()))?;
                out.end()
            }
            Value::Range(slice) => {
                let mut out = serializer.serialize_map(Some(1))?;
                out.serialize_entry(tags::SLICE, &(slice.start, slice.stop, slice.step))?;
                out.end()
            }
            Value::Node(node) => node
                .reference()
                .map_err(serde::ser::Error::custom)?
                .into_value()
                .serialize(serializer),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a msgpack value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f32<E: de::Error>(self, v: f32) -> std::result::Result<Value, E> {
        Ok(Value::Float(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Value, E> {
        Ok(Value::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Value, E> {
        Ok(Value::Str(v))
    }

    // invalid UTF-8 in a str payload lands here as well
    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<Value, E> {
        Ok(Value::Bin(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> std::result::Result<Value, E> {
        Ok(Value::Bin(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Nil)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Nil)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<Value, D::Error> {
        Value::deserialize(d)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(4096));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Value, A::Error> {
        let mut map = BTreeMap::new();
        while let Some(key) = access.next_key::<Value>()? {
            let key = match key {
                Value::Str(s) => s,
                Value::Bin(b) => String::from_utf8(b).map_err(de::Error::custom)?,
                Value::Int(i) => i.to_string(),
                Value::UInt(u) => u.to_string(),
                other => {
                    return Err(de::Error::custom(format!(
                        "unsupported map key of type {}",
                        other.type_name()
                    )))
                }
            };
            let item = access.next_value()?;
            map.insert(key, item);
        }
        Ok(Value::Map(map))
    }
}

/// Yields undispatched values; use [`MsgPackCodec::decode`] for tagged maps.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}
