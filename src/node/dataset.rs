//! Datasets and dataset creation options.

use std::fmt;

use super::{NodeHandle, NodeLike};
use crate::codec::{DType, Selection, Tensor, Value};
use crate::error::{HurrayError, Result};
use crate::protocol::{commands, keys, Request};

/// Compression filters the server understands.
pub const COMPRESSION_FILTERS: &[&str] = &["gzip", "lzf", "szip"];

/// A remote n-dimensional array.
///
/// Shape and dtype are the ones reported when the proxy was created.
#[derive(Debug, Clone)]
pub struct Dataset {
    handle: NodeHandle,
    shape: Vec<usize>,
    dtype: DType,
}

impl Dataset {
    pub(crate) fn from_handle(handle: NodeHandle, shape: Vec<usize>, dtype: DType) -> Self {
        Self {
            handle,
            shape,
            dtype,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Read the elements selected by `selection`.
    ///
    /// A selection that picks one element yields a scalar; anything else a
    /// tensor.
    pub fn get(&self, selection: impl Into<Selection>) -> Result<Value> {
        let selection: Selection = selection.into();
        let request = self
            .handle
            .request(commands::SLICE_DATASET)
            .arg(keys::KEY, selection);
        let reply = self.handle.send(request)?;
        reply.ok_or_else(|| HurrayError::Protocol("Slice reply carries no data".into()))
    }

    /// Write `value` into the selected region.
    ///
    /// # Errors
    ///
    /// A value that does not fit the region is `VALUE_ERROR`; an illegal
    /// index is `TYPE_ERROR`. Both come back as node errors.
    pub fn set(&self, selection: impl Into<Selection>, value: impl Into<Value>) -> Result<()> {
        let selection: Selection = selection.into();
        let request = self
            .handle
            .request(commands::BROADCAST_DATASET)
            .arg(keys::KEY, selection)
            .data(value);
        self.handle.send(request)?;
        Ok(())
    }

    /// The whole dataset.
    ///
    /// # Errors
    ///
    /// `Protocol` if the server answers with something other than a tensor.
    pub fn read(&self) -> Result<Tensor> {
        match self.get(Selection::all())? {
            Value::Tensor(tensor) => Ok(tensor),
            other => Err(HurrayError::Protocol(format!(
                "Expected a tensor, got {}",
                other.type_name()
            ))),
        }
    }
}

impl NodeLike for Dataset {
    fn handle(&self) -> &NodeHandle {
        &self.handle
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Dataset {} {} (db={}, path={})>",
            format_shape(&self.shape),
            self.dtype,
            self.handle.file_label(),
            self.handle.path
        )
    }
}

/// Tuple notation: `(2, 3)`, `(5,)`, `()`.
pub(crate) fn format_shape(shape: &[usize]) -> String {
    match shape {
        [single] => format!("({},)", single),
        _ => {
            let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
            format!("({})", dims.join(", "))
        }
    }
}

/// Arguments of `create_dataset` / `require_dataset`.
///
/// Either `data` or `shape` must be given. Explicit `shape`/`dtype` win over
/// what `data` implies.
///
/// ```
/// use hurray_client::codec::{DType, Tensor};
/// use hurray_client::node::DatasetOptions;
///
/// let zeros = DatasetOptions::new().shape(vec![100, 3]).dtype(DType::FLOAT32);
/// let filled = DatasetOptions::with_data(Tensor::from_slice(&[1i64, 2, 3]))
///     .compression("gzip")
///     .compression_opts(4);
/// ```
#[derive(Debug, Clone)]
pub struct DatasetOptions {
    shape: Option<Vec<usize>>,
    dtype: Option<DType>,
    data: Option<Value>,
    chunks: bool,
    compression: Option<String>,
    compression_opts: Option<Value>,
    fillvalue: Option<Value>,
    exact: bool,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            shape: None,
            dtype: None,
            data: None,
            chunks: true,
            compression: None,
            compression_opts: None,
            fillvalue: None,
            exact: false,
        }
    }
}

impl DatasetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options initialised from existing data.
    pub fn with_data(data: impl Into<Value>) -> Self {
        Self::new().data(data)
    }

    pub fn shape(mut self, shape: impl Into<Vec<usize>>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn chunks(mut self, chunks: bool) -> Self {
        self.chunks = chunks;
        self
    }

    /// One of [`COMPRESSION_FILTERS`]; checked before sending.
    pub fn compression(mut self, filter: &str) -> Self {
        self.compression = Some(filter.to_string());
        self
    }

    pub fn compression_opts(mut self, opts: impl Into<Value>) -> Self {
        self.compression_opts = Some(opts.into());
        self
    }

    pub fn fillvalue(mut self, fillvalue: impl Into<Value>) -> Self {
        self.fillvalue = Some(fillvalue.into());
        self
    }

    /// `require_dataset` only: demand an exact shape and dtype match.
    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    /// Build the request, enforcing the local preconditions.
    pub(crate) fn into_request(self, command: &str, path: &str, require: bool) -> Result<Request> {
        if self.data.is_none() && self.shape.is_none() {
            return Err(HurrayError::Usage(
                "A dataset needs either 'data' or 'shape'".into(),
            ));
        }
        if let Some(filter) = &self.compression {
            if !COMPRESSION_FILTERS.contains(&filter.as_str()) {
                return Err(HurrayError::Usage(format!(
                    "Unknown compression filter '{}' (expected one of {})",
                    filter,
                    COMPRESSION_FILTERS.join(", ")
                )));
            }
        }

        let inferred = self.data.as_ref().and_then(Value::as_tensor);
        let shape = self
            .shape
            .or_else(|| inferred.map(|t| t.shape().to_vec()));
        let dtype = self.dtype.or_else(|| inferred.map(Tensor::dtype));

        let mut request = Request::new(command)
            .arg(keys::PATH, path)
            .arg_opt(keys::SHAPE, shape.map(|s| Value::shape(&s)))
            .arg_opt(keys::DTYPE, dtype)
            .arg(keys::CHUNKS, self.chunks)
            .arg_opt(keys::COMPRESSION, self.compression)
            .arg_opt(keys::COMPRESSION_OPTS, self.compression_opts)
            .arg_opt(keys::FILLVALUE, self.fillvalue);
        if require {
            request = request.arg(keys::EXACT, self.exact);
        }
        request.data = self.data;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_format_shape() {
        assert_eq!(format_shape(&[2, 3]), "(2, 3)");
        assert_eq!(format_shape(&[5]), "(5,)");
        assert_eq!(format_shape(&[]), "()");
    }

    #[test]
    fn test_options_need_data_or_shape() {
        let err = DatasetOptions::new()
            .dtype(DType::INT8)
            .into_request(commands::CREATE_DATASET, "/d", false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_options_infer_from_data() {
        let data = Tensor::from_vec(vec![2, 2], vec![1.0f32; 4]).unwrap();
        let request = DatasetOptions::with_data(data)
            .into_request(commands::CREATE_DATASET, "/d", false)
            .unwrap();
        assert_eq!(request.args[keys::SHAPE], Value::shape(&[2, 2]));
        assert_eq!(request.args[keys::DTYPE], Value::from("float32"));
        assert_eq!(request.args[keys::CHUNKS], Value::Bool(true));
        assert!(!request.args.contains_key(keys::EXACT));
        assert!(request.data.is_some());
    }

    #[test]
    fn test_explicit_shape_and_dtype_override_data() {
        let request = DatasetOptions::with_data(Tensor::from_slice(&[1i32, 2, 3, 4]))
            .shape(vec![4, 1])
            .dtype(DType::FLOAT64)
            .into_request(commands::REQUIRE_DATASET, "/d", true)
            .unwrap();
        assert_eq!(request.args[keys::SHAPE], Value::shape(&[4, 1]));
        assert_eq!(request.args[keys::DTYPE], Value::from("float64"));
        assert_eq!(request.args[keys::EXACT], Value::Bool(false));
    }

    #[test]
    fn test_unknown_compression_is_rejected() {
        let err = DatasetOptions::new()
            .shape(vec![10])
            .compression("zstd")
            .into_request(commands::CREATE_DATASET, "/d", false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.to_string().contains("zstd"));

        for filter in COMPRESSION_FILTERS {
            assert!(DatasetOptions::new()
                .shape(vec![10])
                .compression(filter)
                .into_request(commands::CREATE_DATASET, "/d", false)
                .is_ok());
        }
    }
}
