//! Socket transports: connection state, registry, fan-out and the
//! per-connection loop.

pub mod connection;
pub mod dispatcher;
pub mod heartbeat;
pub mod registry;
pub mod session;
pub mod upgrade;

pub use connection::{ClientConnection, ConnectionRole};
pub use dispatcher::{BroadcastDispatcher, DispatchReport};
pub use registry::{ConnectionRegistry, Registration};
