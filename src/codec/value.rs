//! The value universe carried on the wire.
//!
//! [`Value`] covers msgpack primitives plus the three extension shapes:
//! tensors, ranges ("slices") and references to remote nodes. Node
//! references only ever appear as bound proxies ([`Node`]); the decoder
//! attaches the connection before a value is handed out.

use std::collections::BTreeMap;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use super::tensor::{DType, Tensor};
use crate::node::Node;

/// A decoded (or to-be-encoded) wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    /// Only for unsigned values above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Tensor(Tensor),
    Range(Slice),
    Node(Node),
}

impl Value {
    /// Binary value (kept distinct from strings end to end).
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Value::Bin(data.into())
    }

    /// A shape tuple as an array of integers.
    pub fn shape(dims: &[usize]) -> Self {
        Value::Array(dims.iter().map(|&d| Value::from(d)).collect())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int(i) => u64::try_from(*i).ok(),
            Value::UInt(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bin(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Value::Tensor(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_tensor(self) -> Option<Tensor> {
        match self {
            Value::Tensor(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<&Slice> {
        match self {
            Value::Range(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Interpret an array of non-negative integers as a shape.
    pub fn to_shape(&self) -> Option<Vec<usize>> {
        self.as_array()?
            .iter()
            .map(|d| d.as_u64().and_then(|d| usize::try_from(d).ok()))
            .collect()
    }

    /// Interpret an array of strings as a list of names.
    pub fn to_string_list(&self) -> Option<Vec<String>> {
        self.as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::UInt(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bin(_) => "bin",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Tensor(_) => "tensor",
            Value::Range(_) => "slice",
            Value::Node(_) => "node",
        }
    }
}

macro_rules! value_from_signed {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(v: $t) -> Self { Value::Int(v as i64) }
        }
    )*};
}

macro_rules! value_from_unsigned {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                match i64::try_from(v) {
                    Ok(i) => Value::Int(i),
                    Err(_) => Value::UInt(v as u64),
                }
            }
        }
    )*};
}

value_from_signed!(i8, i16, i32, i64);
value_from_unsigned!(u8, u16, u32, u64, usize);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl From<Tensor> for Value {
    fn from(v: Tensor) -> Self {
        Value::Tensor(v)
    }
}

impl From<Slice> for Value {
    fn from(v: Slice) -> Self {
        Value::Range(v)
    }
}

impl From<Node> for Value {
    fn from(v: Node) -> Self {
        Value::Node(v)
    }
}

/// Dtypes travel as their name.
impl From<DType> for Value {
    fn from(v: DType) -> Self {
        Value::Str(v.name())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

/// A stepped, half-open index range over one axis.
///
/// `None` components are unbounded, as in conventional slice syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    /// The whole axis (`:`).
    pub fn full() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }
}

/// One axis of a dataset selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    At(i64),
    Range(Slice),
}

impl From<Index> for Value {
    fn from(v: Index) -> Self {
        match v {
            Index::At(i) => Value::Int(i),
            Index::Range(s) => Value::Range(s),
        }
    }
}

impl From<Slice> for Index {
    fn from(v: Slice) -> Self {
        Index::Range(v)
    }
}

impl From<RangeFull> for Slice {
    fn from(_: RangeFull) -> Self {
        Slice::full()
    }
}

impl From<RangeFull> for Index {
    fn from(_: RangeFull) -> Self {
        Index::Range(Slice::full())
    }
}

/// Indices past `i64::MAX` saturate and are rejected by the server as out
/// of range; they never wrap to a negative index.
fn wire_index<T: TryInto<i64>>(v: T) -> i64 {
    v.try_into().unwrap_or(i64::MAX)
}

macro_rules! index_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Index {
            fn from(v: $t) -> Self { Index::At(wire_index(v)) }
        }
        impl From<Range<$t>> for Slice {
            fn from(r: Range<$t>) -> Self {
                Slice::new(Some(wire_index(r.start)), Some(wire_index(r.end)), None)
            }
        }
        impl From<RangeFrom<$t>> for Slice {
            fn from(r: RangeFrom<$t>) -> Self {
                Slice::new(Some(wire_index(r.start)), None, None)
            }
        }
        impl From<RangeTo<$t>> for Slice {
            fn from(r: RangeTo<$t>) -> Self {
                Slice::new(None, Some(wire_index(r.end)), None)
            }
        }
        impl From<Range<$t>> for Index {
            fn from(r: Range<$t>) -> Self { Index::Range(r.into()) }
        }
        impl From<RangeFrom<$t>> for Index {
            fn from(r: RangeFrom<$t>) -> Self { Index::Range(r.into()) }
        }
        impl From<RangeTo<$t>> for Index {
            fn from(r: RangeTo<$t>) -> Self { Index::Range(r.into()) }
        }
        impl From<$t> for Selection {
            fn from(v: $t) -> Self { Selection(vec![v.into()]) }
        }
        impl From<Range<$t>> for Selection {
            fn from(r: Range<$t>) -> Self { Selection(vec![r.into()]) }
        }
        impl From<RangeFrom<$t>> for Selection {
            fn from(r: RangeFrom<$t>) -> Self { Selection(vec![r.into()]) }
        }
        impl From<RangeTo<$t>> for Selection {
            fn from(r: RangeTo<$t>) -> Self { Selection(vec![r.into()]) }
        }
    )*};
}

index_from_int!(i32, i64, usize);

/// A dataset selection: one [`Index`] per leading axis.
///
/// A single index travels bare; several travel as a tuple (msgpack array).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection(pub Vec<Index>);

impl Selection {
    pub fn all() -> Self {
        Selection(vec![Index::Range(Slice::full())])
    }

    pub fn axes(&self) -> &[Index] {
        &self.0
    }
}

impl From<Selection> for Value {
    fn from(sel: Selection) -> Self {
        let mut axes = sel.0;
        if axes.len() == 1 {
            return axes.remove(0).into();
        }
        Value::Array(axes.into_iter().map(Value::from).collect())
    }
}

impl From<Index> for Selection {
    fn from(v: Index) -> Self {
        Selection(vec![v])
    }
}

impl From<Slice> for Selection {
    fn from(v: Slice) -> Self {
        Selection(vec![Index::Range(v)])
    }
}

impl From<RangeFull> for Selection {
    fn from(_: RangeFull) -> Self {
        Selection::all()
    }
}

impl From<Vec<Index>> for Selection {
    fn from(v: Vec<Index>) -> Self {
        Selection(v)
    }
}

impl<A: Into<Index>, B: Into<Index>> From<(A, B)> for Selection {
    fn from((a, b): (A, B)) -> Self {
        Selection(vec![a.into(), b.into()])
    }
}

impl<A: Into<Index>, B: Into<Index>, C: Into<Index>> From<(A, B, C)> for Selection {
    fn from((a, b, c): (A, B, C)) -> Self {
        Selection(vec![a.into(), b.into(), c.into()])
    }
}
