//! N-dimensional arrays of fixed-width elements.
//!
//! A [`Tensor`] always stores its elements in row-major order. Column-major
//! payloads are reordered once, at decode time.

use std::fmt;
use std::str::FromStr;

use crate::error::{HurrayError, Result};

/// Byte order of multi-byte elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Little,
    Big,
    /// Single-byte elements.
    NotApplicable,
}

impl ByteOrder {
    fn marker(self) -> char {
        match self {
            ByteOrder::Little => '<',
            ByteOrder::Big => '>',
            ByteOrder::NotApplicable => '|',
        }
    }
}

/// Unit of a datetime or timedelta element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    /// No unit given (`<M8`).
    Generic,
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
    Millis,
    Micros,
    Nanos,
    Picos,
    Femtos,
    Attos,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Generic => "",
            TimeUnit::Years => "Y",
            TimeUnit::Months => "M",
            TimeUnit::Weeks => "W",
            TimeUnit::Days => "D",
            TimeUnit::Hours => "h",
            TimeUnit::Minutes => "m",
            TimeUnit::Seconds => "s",
            TimeUnit::Millis => "ms",
            TimeUnit::Micros => "us",
            TimeUnit::Nanos => "ns",
            TimeUnit::Picos => "ps",
            TimeUnit::Femtos => "fs",
            TimeUnit::Attos => "as",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let unit = match s {
            "" => TimeUnit::Generic,
            "Y" => TimeUnit::Years,
            "M" => TimeUnit::Months,
            "W" => TimeUnit::Weeks,
            "D" => TimeUnit::Days,
            "h" => TimeUnit::Hours,
            "m" => TimeUnit::Minutes,
            "s" => TimeUnit::Seconds,
            "ms" => TimeUnit::Millis,
            "us" => TimeUnit::Micros,
            "ns" => TimeUnit::Nanos,
            "ps" => TimeUnit::Picos,
            "fs" => TimeUnit::Femtos,
            "as" => TimeUnit::Attos,
            _ => return None,
        };
        Some(unit)
    }

    /// `[s]`, or nothing for the generic unit.
    fn suffix(&self) -> String {
        match self {
            TimeUnit::Generic => String::new(),
            unit => format!("[{}]", unit.as_str()),
        }
    }
}

/// Element family.
///
/// Only the numeric and boolean families convert to Rust values through
/// [`Element`]; the others travel as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DTypeKind {
    Bool,
    Int,
    UInt,
    Float,
    Complex,
    /// Fixed-width byte strings (`S`).
    Bytes,
    /// Fixed-width UCS-4 strings (`U`), four bytes per character.
    Unicode,
    Datetime(TimeUnit),
    Timedelta(TimeUnit),
    /// Untyped fixed-width records (`V`).
    Void,
    /// Any other one-letter type code.
    Other(char),
}

impl DTypeKind {
    fn code(&self) -> char {
        match self {
            DTypeKind::Bool => 'b',
            DTypeKind::Int => 'i',
            DTypeKind::UInt => 'u',
            DTypeKind::Float => 'f',
            DTypeKind::Complex => 'c',
            DTypeKind::Bytes => 'S',
            DTypeKind::Unicode => 'U',
            DTypeKind::Datetime(_) => 'M',
            DTypeKind::Timedelta(_) => 'm',
            DTypeKind::Void => 'V',
            DTypeKind::Other(code) => *code,
        }
    }
}

/// Element type of a tensor or dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DType {
    kind: DTypeKind,
    itemsize: usize,
    order: ByteOrder,
}

impl DType {
    pub const BOOL: DType = DType::single(DTypeKind::Bool);
    pub const INT8: DType = DType::single(DTypeKind::Int);
    pub const UINT8: DType = DType::single(DTypeKind::UInt);
    pub const INT16: DType = DType::little(DTypeKind::Int, 2);
    pub const INT32: DType = DType::little(DTypeKind::Int, 4);
    pub const INT64: DType = DType::little(DTypeKind::Int, 8);
    pub const UINT16: DType = DType::little(DTypeKind::UInt, 2);
    pub const UINT32: DType = DType::little(DTypeKind::UInt, 4);
    pub const UINT64: DType = DType::little(DTypeKind::UInt, 8);
    pub const FLOAT16: DType = DType::little(DTypeKind::Float, 2);
    pub const FLOAT32: DType = DType::little(DTypeKind::Float, 4);
    pub const FLOAT64: DType = DType::little(DTypeKind::Float, 8);
    pub const COMPLEX64: DType = DType::little(DTypeKind::Complex, 8);
    pub const COMPLEX128: DType = DType::little(DTypeKind::Complex, 16);

    const fn single(kind: DTypeKind) -> Self {
        Self {
            kind,
            itemsize: 1,
            order: ByteOrder::NotApplicable,
        }
    }

    const fn little(kind: DTypeKind, itemsize: usize) -> Self {
        Self {
            kind,
            itemsize,
            order: ByteOrder::Little,
        }
    }

    /// Build a dtype, validating the kind/width combination.
    ///
    /// # Errors
    ///
    /// Returns `HurrayError::Protocol` for a width the kind cannot have,
    /// e.g. a 3-byte integer.
    pub fn new(kind: DTypeKind, itemsize: usize, order: ByteOrder) -> Result<Self> {
        let valid = match kind {
            DTypeKind::Bool => itemsize == 1,
            DTypeKind::Int | DTypeKind::UInt => matches!(itemsize, 1 | 2 | 4 | 8),
            DTypeKind::Float => matches!(itemsize, 2 | 4 | 8 | 16),
            DTypeKind::Complex => matches!(itemsize, 8 | 16 | 32),
            DTypeKind::Unicode => itemsize % 4 == 0,
            DTypeKind::Datetime(_) | DTypeKind::Timedelta(_) => itemsize == 8,
            DTypeKind::Bytes | DTypeKind::Void | DTypeKind::Other(_) => true,
        };
        if !valid {
            return Err(HurrayError::Protocol(format!(
                "Unsupported element type {:?} of {} bytes",
                kind, itemsize
            )));
        }
        let order = match kind {
            DTypeKind::Bytes | DTypeKind::Void => ByteOrder::NotApplicable,
            DTypeKind::Other(_) => order,
            _ if itemsize == 1 => ByteOrder::NotApplicable,
            _ if order == ByteOrder::NotApplicable => ByteOrder::Little,
            _ => order,
        };
        Ok(Self {
            kind,
            itemsize,
            order,
        })
    }

    pub fn kind(&self) -> DTypeKind {
        self.kind
    }

    pub fn itemsize(&self) -> usize {
        self.itemsize
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Same element type regardless of byte order.
    pub fn same_kind(&self, other: &DType) -> bool {
        self.kind == other.kind && self.itemsize == other.itemsize
    }

    /// Parse an array-protocol descriptor such as `<i8`, `|S5` or `<M8[s]`.
    ///
    /// # Errors
    ///
    /// Returns `HurrayError::Protocol` if the descriptor is not a simple
    /// one-letter type code with a width (structured dtypes are not).
    pub fn parse_descr(descr: &str) -> Result<Self> {
        let invalid = || HurrayError::Protocol(format!("Invalid dtype descriptor '{}'", descr));
        let mut chars = descr.chars();
        let order = match chars.next().ok_or_else(invalid)? {
            '<' => ByteOrder::Little,
            '>' => ByteOrder::Big,
            '|' | '=' => ByteOrder::NotApplicable,
            _ => return Err(invalid()),
        };
        let code = chars.next().ok_or_else(invalid)?;
        let rest = chars.as_str();
        let (width, unit) = match rest.split_once('[') {
            Some((width, unit)) => (width, Some(unit.strip_suffix(']').ok_or_else(invalid)?)),
            None => (rest, None),
        };
        let width: usize = width.parse().map_err(|_| invalid())?;
        let time_unit = || TimeUnit::parse(unit.unwrap_or("")).ok_or_else(invalid);

        let kind = match (code, unit) {
            ('M', _) => DTypeKind::Datetime(time_unit()?),
            ('m', _) => DTypeKind::Timedelta(time_unit()?),
            (_, Some(_)) => return Err(invalid()),
            ('b', None) => DTypeKind::Bool,
            ('i', None) => DTypeKind::Int,
            ('u', None) => DTypeKind::UInt,
            ('f', None) => DTypeKind::Float,
            ('c', None) => DTypeKind::Complex,
            ('S', None) => DTypeKind::Bytes,
            ('U', None) => DTypeKind::Unicode,
            ('V', None) => DTypeKind::Void,
            (code, None) if code.is_ascii_alphabetic() => DTypeKind::Other(code),
            _ => return Err(invalid()),
        };
        let itemsize = match kind {
            DTypeKind::Unicode => width.checked_mul(4).ok_or_else(invalid)?,
            _ => width,
        };
        Self::new(kind, itemsize, order)
    }

    /// Array-protocol descriptor, e.g. `<i8`.
    pub fn descr(&self) -> String {
        let marker = self.order.marker();
        match self.kind {
            DTypeKind::Unicode => format!("{}U{}", marker, self.itemsize / 4),
            DTypeKind::Datetime(unit) | DTypeKind::Timedelta(unit) => {
                format!("{}{}8{}", marker, self.kind.code(), unit.suffix())
            }
            kind => format!("{}{}{}", marker, kind.code(), self.itemsize),
        }
    }

    /// Canonical name, e.g. `int64` or `datetime64[s]`.
    ///
    /// Flexible and unnamed types use their descriptor (`|S5`).
    pub fn name(&self) -> String {
        let bits = self.itemsize * 8;
        match self.kind {
            DTypeKind::Bool => "bool".to_string(),
            DTypeKind::Int => format!("int{}", bits),
            DTypeKind::UInt => format!("uint{}", bits),
            DTypeKind::Float => format!("float{}", bits),
            DTypeKind::Complex => format!("complex{}", bits),
            DTypeKind::Datetime(unit) => format!("datetime64{}", unit.suffix()),
            DTypeKind::Timedelta(unit) => format!("timedelta64{}", unit.suffix()),
            DTypeKind::Bytes | DTypeKind::Unicode | DTypeKind::Void | DTypeKind::Other(_) => {
                self.descr()
            }
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        if name == "bool" {
            return Some(Self::BOOL);
        }
        let temporal: [(&str, fn(TimeUnit) -> DTypeKind); 2] = [
            ("datetime64", DTypeKind::Datetime),
            ("timedelta64", DTypeKind::Timedelta),
        ];
        for (prefix, time) in temporal {
            if let Some(rest) = name.strip_prefix(prefix) {
                let unit = match rest {
                    "" => TimeUnit::Generic,
                    _ => TimeUnit::parse(rest.strip_prefix('[')?.strip_suffix(']')?)?,
                };
                return Self::new(time(unit), 8, ByteOrder::Little).ok();
            }
        }
        // "uint" before "int"
        let (kind, bits) = [
            ("uint", DTypeKind::UInt),
            ("int", DTypeKind::Int),
            ("float", DTypeKind::Float),
            ("complex", DTypeKind::Complex),
        ]
        .into_iter()
        .find_map(|(prefix, kind)| name.strip_prefix(prefix).map(|bits| (kind, bits)))?;
        let bits: usize = bits.parse().ok()?;
        if bits % 8 != 0 {
            return None;
        }
        Self::new(kind, bits / 8, ByteOrder::Little).ok()
    }
}

/// Accepts both names (`float32`) and descriptors (`<f4`).
impl FromStr for DType {
    type Err = HurrayError;

    fn from_str(s: &str) -> Result<Self> {
        match Self::from_name(s) {
            Some(dtype) => Ok(dtype),
            None => Self::parse_descr(s),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Rust scalar types that map onto a [`DType`].
pub trait Element: Copy + sealed::Sealed {
    const DTYPE: DType;

    /// Append the little-endian encoding of `self`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Read one element; `bytes` is exactly `DTYPE.itemsize()` long.
    fn read(bytes: &[u8], order: ByteOrder) -> Self;
}

macro_rules! numeric_element {
    ($($t:ty => $dtype:expr),*) => {$(
        impl sealed::Sealed for $t {}
        impl Element for $t {
            const DTYPE: DType = $dtype;

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read(bytes: &[u8], order: ByteOrder) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(bytes);
                match order {
                    ByteOrder::Big => <$t>::from_be_bytes(raw),
                    _ => <$t>::from_le_bytes(raw),
                }
            }
        }
    )*};
}

numeric_element!(
    i8 => DType::INT8,
    i16 => DType::INT16,
    i32 => DType::INT32,
    i64 => DType::INT64,
    u8 => DType::UINT8,
    u16 => DType::UINT16,
    u32 => DType::UINT32,
    u64 => DType::UINT64,
    f32 => DType::FLOAT32,
    f64 => DType::FLOAT64
);

impl sealed::Sealed for bool {}
impl Element for bool {
    const DTYPE: DType = DType::BOOL;

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }

    fn read(bytes: &[u8], _order: ByteOrder) -> Self {
        bytes[0] != 0
    }
}

/// Number of elements for a shape; the empty shape is a scalar.
///
/// `None` if the count does not fit in `usize`.
pub fn element_count(shape: &[usize]) -> Option<usize> {
    if shape.contains(&0) {
        return Some(0);
    }
    shape.iter().try_fold(1usize, |count, &dim| count.checked_mul(dim))
}

/// For each row-major position, the matching column-major position.
fn column_major_positions(shape: &[usize]) -> Vec<usize> {
    let count = element_count(shape).unwrap_or(0);
    let mut strides = Vec::with_capacity(shape.len());
    let mut stride = 1usize;
    for &dim in shape {
        strides.push(stride);
        // only the last stride can saturate, and it is never used
        stride = stride.saturating_mul(dim);
    }

    let mut index = vec![0usize; shape.len()];
    let mut positions = Vec::with_capacity(count);
    for _ in 0..count {
        positions.push(index.iter().zip(&strides).map(|(i, s)| i * s).sum());
        for axis in (0..shape.len()).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    positions
}

/// A dense n-dimensional array.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    dtype: DType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl Tensor {
    /// Wrap row-major raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `HurrayError::Protocol` unless
    /// `data.len() == product(shape) * itemsize`, including when that
    /// product overflows.
    pub fn new(dtype: DType, shape: impl Into<Vec<usize>>, data: Vec<u8>) -> Result<Self> {
        let shape = shape.into();
        let expected = element_count(&shape)
            .and_then(|count| count.checked_mul(dtype.itemsize()))
            .ok_or_else(|| {
                HurrayError::Protocol(format!(
                    "Tensor of shape {:?} and dtype {} is too large",
                    shape, dtype
                ))
            })?;
        if data.len() != expected {
            return Err(HurrayError::Protocol(format!(
                "Tensor of shape {:?} and dtype {} needs {} bytes, got {}",
                shape,
                dtype.name(),
                expected,
                data.len()
            )));
        }
        Ok(Self { dtype, shape, data })
    }

    /// Wrap column-major raw bytes, reordering them to row-major.
    ///
    /// # Errors
    ///
    /// Same as [`Tensor::new`].
    pub fn from_column_major(
        dtype: DType,
        shape: impl Into<Vec<usize>>,
        data: Vec<u8>,
    ) -> Result<Self> {
        let column_major = Self::new(dtype, shape, data)?;
        if column_major.shape.len() < 2 {
            return Ok(column_major);
        }
        let size = dtype.itemsize();
        let mut data = Vec::with_capacity(column_major.data.len());
        for pos in column_major_positions(&column_major.shape) {
            data.extend_from_slice(&column_major.data[pos * size..(pos + 1) * size]);
        }
        Ok(Self {
            data,
            ..column_major
        })
    }

    /// Build from typed values in row-major order.
    ///
    /// # Errors
    ///
    /// Same as [`Tensor::new`].
    pub fn from_vec<T: Element>(shape: impl Into<Vec<usize>>, values: Vec<T>) -> Result<Self> {
        let mut data = Vec::with_capacity(values.len() * T::DTYPE.itemsize());
        for v in values {
            v.write_le(&mut data);
        }
        Self::new(T::DTYPE, shape, data)
    }

    /// One-dimensional tensor.
    pub fn from_slice<T: Element>(values: &[T]) -> Self {
        let mut data = Vec::with_capacity(values.len() * T::DTYPE.itemsize());
        for &v in values {
            v.write_le(&mut data);
        }
        Self {
            dtype: T::DTYPE,
            shape: vec![values.len()],
            data,
        }
    }

    /// Zero-dimensional tensor.
    pub fn scalar<T: Element>(value: T) -> Self {
        let mut data = Vec::with_capacity(T::DTYPE.itemsize());
        value.write_le(&mut data);
        Self {
            dtype: T::DTYPE,
            shape: Vec::new(),
            data,
        }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        // shape was checked on construction
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Raw bytes in column-major order.
    pub fn to_column_major(&self) -> Vec<u8> {
        if self.shape.len() < 2 {
            return self.data.clone();
        }
        let size = self.dtype.itemsize();
        let mut out = vec![0u8; self.data.len()];
        for (row, pos) in column_major_positions(&self.shape).into_iter().enumerate() {
            out[pos * size..(pos + 1) * size]
                .copy_from_slice(&self.data[row * size..(row + 1) * size]);
        }
        out
    }

    /// Same elements under a different shape.
    ///
    /// # Errors
    ///
    /// Same as [`Tensor::new`]: the element count must not change.
    pub fn reshape(self, shape: impl Into<Vec<usize>>) -> Result<Self> {
        Self::new(self.dtype, shape, self.data)
    }

    /// Typed copy of the elements in row-major order.
    ///
    /// # Errors
    ///
    /// Returns `HurrayError::Usage` if `T` does not match the dtype.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if !self.dtype.same_kind(&T::DTYPE) {
            return Err(HurrayError::Usage(format!(
                "Tensor holds {} elements, not {}",
                self.dtype.name(),
                T::DTYPE.name()
            )));
        }
        let order = self.dtype.byte_order();
        Ok(self
            .data
            .chunks_exact(self.dtype.itemsize())
            .map(|chunk| T::read(chunk, order))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descr_roundtrip() {
        for descr in ["<i8", "|u1", "|b1", "<f8", ">i4", "<u2", "<f4"] {
            assert_eq!(DType::parse_descr(descr).unwrap().descr(), descr);
        }
    }

    #[test]
    fn test_single_byte_descr_ignores_order() {
        assert_eq!(DType::parse_descr("<i1").unwrap(), DType::INT8);
        assert_eq!("int8".parse::<DType>().unwrap().descr(), "|i1");
    }

    #[test]
    fn test_invalid_descr() {
        for descr in ["", "<", "<ix", "<f3", "<c4", "<U5x", "<M4[s]", "<M8[xx]", "<i8[s]", "<18"] {
            assert!(DType::parse_descr(descr).is_err(), "{}", descr);
        }
    }

    #[test]
    fn test_extended_descr() {
        let cases = [
            ("<f2", "float16", 2),
            ("<c8", "complex64", 8),
            ("<c16", "complex128", 16),
            ("|S5", "|S5", 5),
            ("<U3", "<U3", 12),
            ("<M8[s]", "datetime64[s]", 8),
            ("<m8[us]", "timedelta64[us]", 8),
            ("<M8", "datetime64", 8),
            ("|V16", "|V16", 16),
        ];
        for (descr, name, itemsize) in cases {
            let dtype = DType::parse_descr(descr).unwrap();
            assert_eq!(dtype.descr(), descr);
            assert_eq!(dtype.name(), name);
            assert_eq!(dtype.itemsize(), itemsize);
            assert_eq!(name.parse::<DType>().unwrap(), dtype);
        }
        assert_eq!(DType::parse_descr("<c16").unwrap(), DType::COMPLEX128);
        assert_eq!(DType::parse_descr("<S5").unwrap().descr(), "|S5");
    }

    #[test]
    fn test_unknown_type_code_is_carried() {
        let dtype = DType::parse_descr("<O8").unwrap();
        assert_eq!(dtype.kind(), DTypeKind::Other('O'));
        assert_eq!(dtype.descr(), "<O8");
        let t = Tensor::new(dtype, vec![2], vec![7; 16]).unwrap();
        assert!(t.to_vec::<i64>().is_err());
    }

    #[test]
    fn test_element_count() {
        assert_eq!(element_count(&[]), Some(1));
        assert_eq!(element_count(&[2, 3, 4]), Some(24));
        assert_eq!(element_count(&[usize::MAX, 0]), Some(0));
        assert_eq!(element_count(&[1 << 40, 1 << 40]), None);
    }

    #[test]
    fn test_oversized_shape_is_rejected() {
        let err = Tensor::new(DType::INT64, vec![1 << 40, 1 << 40], Vec::new()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Protocol);
        // fits as a count, overflows once scaled by the itemsize
        let err = Tensor::new(DType::INT64, vec![usize::MAX / 4], Vec::new()).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_empty_axis_with_huge_neighbours() {
        let shape = vec![1 << 40, 1 << 40, 0];
        let t = Tensor::from_column_major(DType::UINT8, shape.clone(), Vec::new()).unwrap();
        assert!(t.is_empty());
        assert!(t.to_column_major().is_empty());
    }

    #[test]
    fn test_name_and_parse() {
        assert_eq!(DType::INT64.name(), "int64");
        assert_eq!("float32".parse::<DType>().unwrap(), DType::FLOAT32);
        assert_eq!("<f4".parse::<DType>().unwrap(), DType::FLOAT32);
        assert_eq!(DType::BOOL.to_string(), "bool");
    }

    #[test]
    fn test_new_checks_length() {
        assert!(Tensor::new(DType::INT32, vec![2, 2], vec![0; 16]).is_ok());
        let err = Tensor::new(DType::INT32, vec![2, 2], vec![0; 15]).unwrap_err();
        assert!(err.to_string().contains("needs 16 bytes"));
    }

    #[test]
    fn test_scalar_is_zero_dimensional() {
        let t = Tensor::scalar(3.5f64);
        assert_eq!(t.ndim(), 0);
        assert_eq!(t.len(), 1);
        assert_eq!(t.to_vec::<f64>().unwrap(), vec![3.5]);
    }

    #[test]
    fn test_empty_axis() {
        let t = Tensor::from_vec::<i64>(vec![0, 3], vec![]).unwrap();
        assert!(t.is_empty());
        assert!(t.as_bytes().is_empty());
    }

    #[test]
    fn test_column_major_is_reordered() {
        // [[1, 2, 3], [4, 5, 6]] laid out column by column
        let column: Vec<u8> = [1i16, 4, 2, 5, 3, 6]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let t = Tensor::from_column_major(DType::INT16, vec![2, 3], column.clone()).unwrap();
        assert_eq!(t.to_vec::<i16>().unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(t.to_column_major(), column);
    }

    #[test]
    fn test_column_major_rank_three() {
        let values: Vec<u8> = (0..24).collect();
        let t = Tensor::new(DType::UINT8, vec![2, 3, 4], values).unwrap();
        let back = Tensor::from_column_major(DType::UINT8, vec![2, 3, 4], t.to_column_major())
            .unwrap();
        assert_eq!(back, t);
        // element (1, 0, 0) is the second byte of the column-major layout
        assert_eq!(t.to_column_major()[1], 12);
    }

    #[test]
    fn test_big_endian_elements() {
        let t = Tensor::new(
            DType::parse_descr(">i4").unwrap(),
            vec![2],
            vec![0, 0, 0, 1, 0, 0, 1, 0],
        )
        .unwrap();
        assert_eq!(t.to_vec::<i32>().unwrap(), vec![1, 256]);
    }

    #[test]
    fn test_to_vec_rejects_other_dtype() {
        let t = Tensor::from_slice(&[1i64, 2]);
        assert!(t.to_vec::<f64>().is_err());
        assert_eq!(t.to_vec::<i64>().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_bool_elements() {
        let t = Tensor::from_slice(&[true, false, true]);
        assert_eq!(t.dtype(), DType::BOOL);
        assert_eq!(t.as_bytes(), &[1, 0, 1]);
        assert_eq!(t.to_vec::<bool>().unwrap(), vec![true, false, true]);
    }

    #[test]
    fn test_reshape() {
        let t = Tensor::from_slice(&[1u8, 2, 3, 4]).reshape(vec![2, 2]).unwrap();
        assert_eq!(t.shape(), &[2, 2]);
        assert!(Tensor::from_slice(&[1u8]).reshape(vec![2]).is_err());
    }
}
