//! In-process mock of a Hurray server.
//!
//! Speaks the real framing and codec over loopback TCP and keeps files in
//! memory. Two extra commands let tests provoke transport failures.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use hurray_client::codec::{element_count, DType, MsgPackCodec, Slice, Tensor, Value};
use hurray_client::protocol::{commands, keys, Request, Response, Status};
use hurray_client::transport::FrameTransport;
use hurray_client::Connection;

/// Closes the socket without replying.
pub const HANG_UP: &str = "__hang_up__";
/// Replies with a status outside every defined range.
pub const BAD_STATUS: &str = "__bad_status__";

/// Fixed overhead reported by `get_filesize` on top of the stored data.
pub const FILE_OVERHEAD: u64 = 1_000;

const KNOWN_COMMANDS: &[&str] = &[
    commands::CREATE_FILE,
    commands::USE_FILE,
    commands::RENAME_FILE,
    commands::DELETE_FILE,
    commands::FILE_SIZE,
    commands::CREATE_GROUP,
    commands::REQUIRE_GROUP,
    commands::CREATE_DATASET,
    commands::REQUIRE_DATASET,
    commands::GET_NODE,
    commands::GET_KEYS,
    commands::GET_TREE,
    commands::SLICE_DATASET,
    commands::BROADCAST_DATASET,
    commands::ATTRS_GET,
    commands::ATTRS_SET,
    commands::ATTRS_CONTAINS,
    commands::ATTRS_KEYS,
];

type Failure = (Status, String);
type Outcome = Result<(Status, Option<Value>), Failure>;
type Nodes = BTreeMap<String, Entry>;

fn fail<T>(status: Status, detail: impl Into<String>) -> Result<T, Failure> {
    Err((status, detail.into()))
}

/// A group (no tensor) or a dataset.
#[derive(Default)]
struct Entry {
    tensor: Option<Tensor>,
    attrs: BTreeMap<String, Value>,
}

#[derive(Default)]
struct Store {
    files: BTreeMap<String, Nodes>,
}

pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
}

impl MockServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        let store = Arc::new(Mutex::new(Store::default()));
        let requests = Arc::new(AtomicUsize::new(0));

        let counter = requests.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let store = store.clone();
                let counter = counter.clone();
                thread::spawn(move || serve(stream, store, counter));
            }
        });

        Self { addr, requests }
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub fn connect(&self) -> Connection {
        Connection::connect(&self.address()).expect("connect to mock server")
    }

    /// Number of request frames received so far, over all connections.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

fn serve(stream: TcpStream, store: Arc<Mutex<Store>>, counter: Arc<AtomicUsize>) {
    let mut transport = FrameTransport::new(stream);
    loop {
        let Ok(frame) = transport.read_frame() else {
            return;
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let response = match MsgPackCodec::decode_detached(&frame.payload).and_then(Request::from_value) {
            Ok(request) if request.command == HANG_UP => return,
            Ok(request) if request.command == BAD_STATUS => Response::new(Status(700), None),
            Ok(request) => {
                let mut store = store.lock().unwrap_or_else(|e| e.into_inner());
                match store.handle(&request) {
                    Ok((status, data)) => Response::new(status, data),
                    Err((status, detail)) => Response::new(status, Some(Value::from(detail))),
                }
            }
            Err(e) => Response::new(Status::INVALID_ARGUMENT, Some(Value::from(e.to_string()))),
        };

        let payload = MsgPackCodec::encode(&response.into_value()).expect("encode reply");
        if transport.write_frame(&payload).is_err() {
            return;
        }
    }
}

fn text(request: &Request, key: &str) -> Result<String, Failure> {
    match request.args.get(key).and_then(Value::as_str) {
        Some(value) => Ok(value.to_string()),
        None => fail(Status::MISSING_ARGUMENT, format!("Missing argument '{}'", key)),
    }
}

impl Store {
    fn handle(&mut self, request: &Request) -> Outcome {
        if !KNOWN_COMMANDS.contains(&request.command.as_str()) {
            return fail(
                Status::UNKNOWN_COMMAND,
                format!("Unknown command '{}'", request.command),
            );
        }
        let db = text(request, keys::FILE)?;

        match request.command.as_str() {
            commands::CREATE_FILE => {
                if self.files.contains_key(&db) {
                    return fail(Status::FILE_EXISTS, format!("File {} exists", db));
                }
                let mut nodes = Nodes::new();
                nodes.insert("/".to_string(), Entry::default());
                self.files.insert(db, nodes);
                Ok((Status::CREATED, None))
            }
            commands::USE_FILE => {
                self.nodes(&db)?;
                Ok((Status::OK, None))
            }
            commands::RENAME_FILE => {
                let new_name = text(request, keys::NEW_NAME)?;
                if self.files.contains_key(&new_name) {
                    return fail(Status::FILE_EXISTS, format!("File {} exists", new_name));
                }
                let Some(nodes) = self.files.remove(&db) else {
                    return fail(Status::FILE_NOT_FOUND, format!("No file {}", db));
                };
                self.files.insert(new_name, nodes);
                Ok((Status::OK, None))
            }
            commands::DELETE_FILE => match self.files.remove(&db) {
                Some(_) => Ok((Status::OK, None)),
                None => fail(Status::FILE_NOT_FOUND, format!("No file {}", db)),
            },
            commands::FILE_SIZE => {
                let stored: usize = self
                    .nodes(&db)?
                    .values()
                    .filter_map(|entry| entry.tensor.as_ref())
                    .map(|tensor| tensor.as_bytes().len())
                    .sum();
                Ok((Status::OK, Some(Value::from(FILE_OVERHEAD + stored as u64))))
            }
            _ => {
                let nodes = self.nodes(&db)?;
                handle_node(&db, nodes, request)
            }
        }
    }

    fn nodes(&mut self, db: &str) -> Result<&mut Nodes, Failure> {
        match self.files.get_mut(db) {
            Some(nodes) => Ok(nodes),
            None => fail(Status::FILE_NOT_FOUND, format!("No file {}", db)),
        }
    }
}

fn handle_node(db: &str, nodes: &mut Nodes, request: &Request) -> Outcome {
    let path = text(request, keys::PATH)?;

    match request.command.as_str() {
        commands::CREATE_GROUP => {
            if nodes.contains_key(&path) {
                return fail(Status::GROUP_EXISTS, format!("{} exists", path));
            }
            make_parents(nodes, &path)?;
            nodes.insert(path, Entry::default());
            Ok((Status::CREATED, None))
        }
        commands::REQUIRE_GROUP => match nodes.get(&path) {
            Some(entry) if entry.tensor.is_some() => {
                fail(Status::TYPE_ERROR, format!("{} is a dataset", path))
            }
            Some(_) => Ok((Status::OK, None)),
            None => {
                make_parents(nodes, &path)?;
                nodes.insert(path, Entry::default());
                Ok((Status::CREATED, None))
            }
        },
        commands::CREATE_DATASET => {
            if nodes.contains_key(&path) {
                return fail(Status::DATASET_EXISTS, format!("{} exists", path));
            }
            create_dataset(db, nodes, path, request)
        }
        commands::REQUIRE_DATASET => match nodes.get(&path) {
            Some(Entry { tensor: None, .. }) => {
                fail(Status::TYPE_ERROR, format!("{} is a group", path))
            }
            Some(Entry {
                tensor: Some(existing),
                ..
            }) => {
                check_compatible(existing, request)?;
                Ok((Status::OK, Some(dataset_ref(db, &path, existing))))
            }
            None => create_dataset(db, nodes, path, request),
        },
        commands::GET_NODE => {
            let entry = entry(nodes, &path)?;
            Ok((Status::OK, Some(node_ref(db, &path, entry))))
        }
        commands::GET_KEYS => {
            entry(nodes, &path)?;
            let names = children(nodes, &path)
                .into_iter()
                .map(|child| Value::from(base_name(&child)))
                .collect();
            Ok((Status::OK, Some(reply_map(keys::KEYS, Value::Array(names)))))
        }
        commands::GET_TREE => {
            entry(nodes, &path)?;
            Ok((Status::OK, Some(reply_map(keys::TREE, tree(db, nodes, &path)))))
        }
        commands::SLICE_DATASET => {
            let tensor = dataset(nodes, &path)?;
            let (offsets, shape) = select(request.args.get(keys::KEY), tensor.shape())?;
            let size = tensor.dtype().itemsize();
            let mut data = Vec::with_capacity(offsets.len() * size);
            for offset in offsets {
                data.extend_from_slice(&tensor.as_bytes()[offset * size..(offset + 1) * size]);
            }
            let picked = Tensor::new(tensor.dtype(), shape, data).expect("selected tensor");
            let reply = if picked.ndim() == 0 {
                scalar(picked)
            } else {
                Value::Tensor(picked)
            };
            Ok((Status::OK, Some(reply)))
        }
        commands::BROADCAST_DATASET => {
            let tensor = dataset(nodes, &path)?;
            let (offsets, shape) = select(request.args.get(keys::KEY), tensor.shape())?;
            let source = region_bytes(tensor, request.data.as_ref(), &shape, offsets.len())?;
            let size = tensor.dtype().itemsize();
            let mut data = tensor.as_bytes().to_vec();
            for (k, offset) in offsets.into_iter().enumerate() {
                data[offset * size..(offset + 1) * size]
                    .copy_from_slice(&source[k * size..(k + 1) * size]);
            }
            let updated =
                Tensor::new(tensor.dtype(), tensor.shape().to_vec(), data).expect("updated tensor");
            if let Some(entry) = nodes.get_mut(&path) {
                entry.tensor = Some(updated);
            }
            Ok((Status::OK, None))
        }
        commands::ATTRS_GET => {
            let key = text(request, keys::KEY)?;
            match entry(nodes, &path)?.attrs.get(&key) {
                Some(value) => Ok((Status::OK, Some(value.clone()))),
                None => fail(Status::KEY_ERROR, format!("Attribute '{}' not found", key)),
            }
        }
        commands::ATTRS_SET => {
            let key = text(request, keys::KEY)?;
            let Some(value) = request.data.clone() else {
                return fail(Status::MISSING_DATA, "Attribute value missing");
            };
            entry(nodes, &path)?;
            if let Some(entry) = nodes.get_mut(&path) {
                entry.attrs.insert(key, value);
            }
            Ok((Status::OK, None))
        }
        commands::ATTRS_CONTAINS => {
            let key = text(request, keys::KEY)?;
            let found = entry(nodes, &path)?.attrs.contains_key(&key);
            Ok((Status::OK, Some(reply_map(keys::CONTAINS, Value::Bool(found)))))
        }
        commands::ATTRS_KEYS => {
            let names = entry(nodes, &path)?
                .attrs
                .keys()
                .map(|k| Value::from(k.as_str()))
                .collect();
            Ok((Status::OK, Some(reply_map(keys::KEYS, Value::Array(names)))))
        }
        other => fail(Status::UNKNOWN_COMMAND, format!("Unknown command '{}'", other)),
    }
}

fn entry<'a>(nodes: &'a Nodes, path: &str) -> Result<&'a Entry, Failure> {
    match nodes.get(path) {
        Some(entry) => Ok(entry),
        None => fail(Status::NODE_NOT_FOUND, format!("No node at {}", path)),
    }
}

fn dataset<'a>(nodes: &'a Nodes, path: &str) -> Result<&'a Tensor, Failure> {
    match &entry(nodes, path)?.tensor {
        Some(tensor) => Ok(tensor),
        None => fail(Status::TYPE_ERROR, format!("{} is a group", path)),
    }
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn children(nodes: &Nodes, path: &str) -> Vec<String> {
    nodes
        .keys()
        .filter(|key| key.as_str() != "/" && parent(key) == path)
        .cloned()
        .collect()
}

/// Create missing intermediate groups of `path`.
fn make_parents(nodes: &mut Nodes, path: &str) -> Result<(), Failure> {
    let mut missing = Vec::new();
    let mut current = parent(path);
    while current != "/" {
        match nodes.get(current) {
            Some(entry) if entry.tensor.is_some() => {
                return fail(Status::TYPE_ERROR, format!("{} is a dataset", current))
            }
            Some(_) => break,
            None => missing.push(current.to_string()),
        }
        current = parent(current);
    }
    for group in missing {
        nodes.insert(group, Entry::default());
    }
    Ok(())
}

fn reply_map(key: &str, value: Value) -> Value {
    let mut map = BTreeMap::new();
    map.insert(key.to_string(), value);
    Value::Map(map)
}

fn node_ref(db: &str, path: &str, entry: &Entry) -> Value {
    match &entry.tensor {
        Some(tensor) => dataset_ref(db, path, tensor),
        None => {
            let mut map = BTreeMap::new();
            map.insert("type".to_string(), Value::from("group"));
            map.insert("h5file".to_string(), Value::from(db));
            map.insert("path".to_string(), Value::from(path));
            Value::Map(map)
        }
    }
}

fn dataset_ref(db: &str, path: &str, tensor: &Tensor) -> Value {
    let mut map = BTreeMap::new();
    map.insert("type".to_string(), Value::from("dataset"));
    map.insert("h5file".to_string(), Value::from(db));
    map.insert("path".to_string(), Value::from(path));
    map.insert("shape".to_string(), Value::shape(tensor.shape()));
    map.insert("dtype".to_string(), Value::from(tensor.dtype()));
    Value::Map(map)
}

fn tree(db: &str, nodes: &Nodes, path: &str) -> Value {
    let node = nodes
        .get(path)
        .map(|entry| node_ref(db, path, entry))
        .unwrap_or(Value::Nil);
    let children = children(nodes, path)
        .iter()
        .map(|child| tree(db, nodes, child))
        .collect();
    Value::Array(vec![node, Value::Array(children)])
}

fn requested_layout(request: &Request) -> Result<(Option<Vec<usize>>, Option<DType>), Failure> {
    let data = request.data.as_ref().and_then(Value::as_tensor);
    let shape = request
        .args
        .get(keys::SHAPE)
        .and_then(Value::to_shape)
        .or_else(|| data.map(|t| t.shape().to_vec()));
    let dtype = match request.args.get(keys::DTYPE).and_then(Value::as_str) {
        Some(name) => match name.parse::<DType>() {
            Ok(dtype) => Some(dtype),
            Err(e) => return fail(Status::INVALID_ARGUMENT, e.to_string()),
        },
        None => data.map(Tensor::dtype),
    };
    Ok((shape, dtype))
}

fn create_dataset(db: &str, nodes: &mut Nodes, path: String, request: &Request) -> Outcome {
    let (shape, dtype) = requested_layout(request)?;
    let tensor = match &request.data {
        Some(Value::Tensor(data)) => {
            if dtype.is_some_and(|d| !d.same_kind(&data.dtype())) {
                return fail(Status::TYPE_ERROR, "dtype does not match the data");
            }
            match shape {
                Some(shape) if shape.as_slice() != data.shape() => {
                    match data.clone().reshape(shape) {
                        Ok(tensor) => tensor,
                        Err(e) => return fail(Status::VALUE_ERROR, e.to_string()),
                    }
                }
                _ => data.clone(),
            }
        }
        Some(other) => {
            return fail(
                Status::INVALID_ARGUMENT,
                format!("Cannot store {} as a dataset", other.type_name()),
            )
        }
        None => {
            let Some(shape) = shape else {
                return fail(Status::MISSING_ARGUMENT, "Missing argument 'shape'");
            };
            let dtype = dtype.unwrap_or(DType::FLOAT32);
            let Some(size) = element_count(&shape).and_then(|n| n.checked_mul(dtype.itemsize()))
            else {
                return fail(Status::VALUE_ERROR, "Dataset too large");
            };
            Tensor::new(dtype, shape, vec![0u8; size]).expect("zero tensor")
        }
    };

    make_parents(nodes, &path)?;
    let reply = dataset_ref(db, &path, &tensor);
    nodes.insert(
        path,
        Entry {
            tensor: Some(tensor),
            attrs: BTreeMap::new(),
        },
    );
    Ok((Status::CREATED, Some(reply)))
}

fn check_compatible(existing: &Tensor, request: &Request) -> Result<(), Failure> {
    let (shape, dtype) = requested_layout(request)?;
    let exact = request
        .args
        .get(keys::EXACT)
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if let Some(shape) = shape {
        if shape.as_slice() != existing.shape() {
            return fail(
                Status::INCOMPATIBLE_DATA,
                format!("Shapes do not match ({:?} vs {:?})", shape, existing.shape()),
            );
        }
    }
    if let Some(dtype) = dtype {
        let fits = if exact {
            dtype.same_kind(&existing.dtype())
        } else {
            dtype.kind() == existing.dtype().kind()
        };
        if !fits {
            return fail(
                Status::INCOMPATIBLE_DATA,
                format!("Datatypes do not match ({} vs {})", dtype, existing.dtype()),
            );
        }
    }
    Ok(())
}

/// Row-major element offsets picked by `key`, and the shape of the result.
fn select(key: Option<&Value>, shape: &[usize]) -> Result<(Vec<usize>, Vec<usize>), Failure> {
    let axes: Vec<&Value> = match key {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
        None => Vec::new(),
    };
    if axes.len() > shape.len() {
        return fail(Status::TYPE_ERROR, "Too many indices");
    }

    let mut picks: Vec<Vec<usize>> = Vec::new();
    let mut result_shape = Vec::new();
    for (axis, &dim) in shape.iter().enumerate() {
        match axes.get(axis) {
            None => {
                picks.push((0..dim).collect());
                result_shape.push(dim);
            }
            Some(Value::Range(slice)) => {
                let indices = slice_indices(slice, dim)?;
                result_shape.push(indices.len());
                picks.push(indices);
            }
            Some(other) => {
                let Some(index) = other.as_i64() else {
                    return fail(
                        Status::TYPE_ERROR,
                        format!("Illegal index of type {}", other.type_name()),
                    );
                };
                let len = dim as i64;
                let resolved = if index < 0 { index + len } else { index };
                if resolved < 0 || resolved >= len {
                    return fail(
                        Status::TYPE_ERROR,
                        format!("Index {} out of range for axis of size {}", index, dim),
                    );
                }
                picks.push(vec![resolved as usize]);
            }
        }
    }

    let mut strides = vec![1usize; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    let mut offsets = vec![0usize];
    for (pick, &stride) in picks.iter().zip(&strides) {
        offsets = offsets
            .iter()
            .flat_map(|&base| pick.iter().map(move |&i| base + i * stride))
            .collect();
    }
    Ok((offsets, result_shape))
}

fn slice_indices(slice: &Slice, dim: usize) -> Result<Vec<usize>, Failure> {
    let step = slice.step.unwrap_or(1);
    if step <= 0 {
        return fail(Status::VALUE_ERROR, "Slice step must be positive");
    }
    let len = dim as i64;
    let clamp = |bound: i64| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(0, len)
    };
    let start = slice.start.map_or(0, clamp);
    let stop = slice.stop.map_or(len, clamp);
    Ok((start..stop)
        .step_by(step as usize)
        .map(|i| i as usize)
        .collect())
}

/// Bytes for `count` elements written into a region of `shape`.
fn region_bytes(
    target: &Tensor,
    data: Option<&Value>,
    shape: &[usize],
    count: usize,
) -> Result<Vec<u8>, Failure> {
    let dtype = target.dtype();
    match data {
        Some(Value::Tensor(source)) => {
            if !source.dtype().same_kind(&dtype) {
                return fail(
                    Status::TYPE_ERROR,
                    format!("Cannot write {} into {}", source.dtype(), dtype),
                );
            }
            if source.shape() == shape {
                Ok(source.as_bytes().to_vec())
            } else if source.len() == 1 {
                Ok(source.as_bytes().repeat(count))
            } else {
                fail(
                    Status::VALUE_ERROR,
                    format!(
                        "Could not broadcast input of shape {:?} into shape {:?}",
                        source.shape(),
                        shape
                    ),
                )
            }
        }
        Some(value) => {
            let one = if dtype.same_kind(&DType::INT64) {
                value.as_i64().map(|v| v.to_le_bytes().to_vec())
            } else if dtype.same_kind(&DType::FLOAT64) {
                value.as_f64().map(|v| v.to_le_bytes().to_vec())
            } else {
                None
            };
            match one {
                Some(one) => Ok(one.repeat(count)),
                None => fail(
                    Status::TYPE_ERROR,
                    format!("Cannot write {} into {}", value.type_name(), dtype),
                ),
            }
        }
        None => fail(Status::MISSING_DATA, "Nothing to write"),
    }
}

fn scalar(tensor: Tensor) -> Value {
    match (
        tensor.to_vec::<i64>(),
        tensor.to_vec::<f64>(),
        tensor.to_vec::<bool>(),
    ) {
        (Ok(v), ..) => Value::from(v[0]),
        (_, Ok(v), _) => Value::from(v[0]),
        (.., Ok(v)) => Value::from(v[0]),
        _ => Value::Tensor(tensor),
    }
}
