//! # hurray-client
//!
//! Rust client for the Hurray protocol: remote HDF5-like files with groups,
//! datasets and attributes, served over TCP or a Unix Domain Socket.
//!
//! ## Architecture
//!
//! - **Frames**: 8-byte header (version, length) plus a MessagePack payload
//! - **Codec**: MessagePack extended with tensors, slices and node references
//! - **Protocol**: one `{cmd, args, data}` request, one `{status, data}` reply
//! - **Object model**: [`File`], [`Group`], [`Dataset`] and
//!   [`AttributeView`] proxies bound to a [`Connection`]
//!
//! ## Example
//!
//! ```ignore
//! use hurray_client::prelude::*;
//!
//! fn main() -> hurray_client::Result<()> {
//!     let conn = Connection::connect("localhost:2222")?;
//!     let file = conn.create_file("weather.h5")?;
//!
//!     let temps = file.create_dataset(
//!         "stations/bern/temperature",
//!         DatasetOptions::with_data(Tensor::from_vec(vec![2, 3], vec![1.5f64; 6])?),
//!     )?;
//!     temps.set((0, ..), Tensor::from_slice(&[20.1f64, 20.4, 19.8]))?;
//!     temps.attrs().set("unit", "celsius")?;
//!
//!     file.visit(|path| {
//!         println!("{}", path);
//!         None::<()>
//!     })?;
//!     conn.close()
//! }
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod node;
pub mod protocol;
pub mod transport;

pub use codec::{DType, Index, Selection, Slice, Tensor, Value};
pub use config::{Address, ClientConfig};
pub use connection::{Connection, ConnectionBuilder};
pub use error::{ErrorKind, HurrayError, Result};
pub use node::{AttributeView, Container, Dataset, DatasetOptions, File, Group, Node, NodeLike, Tree};
pub use protocol::Status;

/// Everything needed for everyday use.
pub mod prelude {
    pub use crate::codec::{DType, Index, Selection, Slice, Tensor, Value};
    pub use crate::config::{Address, ClientConfig};
    pub use crate::connection::{Connection, ConnectionBuilder};
    pub use crate::error::{ErrorKind, HurrayError};
    pub use crate::node::{
        AttributeView, Container, Dataset, DatasetOptions, File, Group, Node, NodeLike, Tree,
    };
    pub use crate::protocol::Status;
}
