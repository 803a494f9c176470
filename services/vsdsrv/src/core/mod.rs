//! Register access core: catalog, codec, transports, session, instrument

pub mod catalog;
pub mod codec;
pub mod connection;
pub mod instrument;
pub mod link;
pub mod poller;
pub mod session;

pub use catalog::{Access, PrimitiveType, RegisterCatalog, RegisterDescriptor};
pub use codec::{PointValue, RawValue};
pub use connection::{ConnectionConfig, Parity, TransportKind};
pub use instrument::{Instrument, InstrumentSettings, InstrumentStatus, WriteAck};
pub use link::{AddressingConvention, Connector, ModbusConnector, RegisterLink};
pub use poller::BatchResult;
pub use session::Session;
