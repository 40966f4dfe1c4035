/// Socket surface of the relay
///
/// 1. `messages`: wire events in both directions
/// 2. `transport`: per-connection outbound channels behind the `Transport` seam
/// 3. `dispatch`: inbound event name to handler table
/// 4. `session`: the actor owning one socket
pub mod dispatch;
pub mod messages;
pub mod session;
pub mod transport;

pub use dispatch::Dispatcher;
pub use messages::ServerEvent;
pub use session::WsSession;
pub use transport::{SessionHub, Transport, TransportError};
