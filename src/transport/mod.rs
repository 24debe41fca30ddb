mod local;
mod node_transport;

pub use local::LinkFault;
pub use local::LocalTransport;
pub use node_transport::NodeTransport;
pub use node_transport::TransportError;
