//! Codec module - the extended MessagePack value codec.
//!
//! - [`Value`] - the value universe (primitives, maps, tensors, slices, nodes)
//! - [`Tensor`] / [`DType`] - dense arrays with their element type
//! - [`MsgPackCodec`] - encoding via `rmp-serde` plus tag dispatch on decode
//!
//! # Design
//!
//! Codecs are marker structs with static methods. Node references are the
//! only values that need context to decode; that context is passed in as a
//! [`Resolver`].

mod msgpack;
mod tensor;
mod value;

pub use msgpack::{tags, Detached, MsgPackCodec, Resolver, WireShape};
pub use tensor::{element_count, ByteOrder, DType, DTypeKind, Element, Tensor, TimeUnit};
pub use value::{Index, Selection, Slice, Value};
