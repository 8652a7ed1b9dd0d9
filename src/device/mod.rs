mod connection;
mod poller;
mod proxy;
mod snapshot;
mod transport;

pub use connection::{Connection, Endpoint, Token};
pub use poller::{Poller, refresh_all};
pub use proxy::{DeviceState, MiotDevice};
pub use snapshot::{SnapshotValue, StateSnapshot};
pub use transport::{MiotTransport, PropertyResult, TransportError};

use crate::spec::PropertyError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DeviceError {
    #[error("device {host} is unreachable: {reason}")]
    Unreachable { host: String, reason: String },
    #[error("unknown property '{0}'")]
    PropertyUnknown(String),
    #[error("property '{0}' is not writable")]
    PropertyNotWritable(String),
    #[error("property '{0}' is not readable")]
    PropertyNotReadable(String),
    #[error("property '{0}' could not be read from the device")]
    PropertyUnavailable(String),
    #[error(transparent)]
    InvalidValue(#[from] PropertyError),
    #[error("device {host} rejected {operation}")]
    Rejected { host: String, operation: String },
}
