//! Local JSON-RPC 2.0 server exposing the recall engine over a Unix domain
//! socket: wire protocol, service registry, lifecycle state machine, and the
//! core service adapters.

pub mod lifecycle;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod services;

pub use lifecycle::{LifecycleEvent, ServerState};
pub use registry::ServiceRegistry;
pub use server::{IpcServer, ServerConfig};
pub use services::build_registry;
