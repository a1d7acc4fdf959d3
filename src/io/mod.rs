//! I/O infrastructure: wire messages, topics, and transports.

pub mod bus;
pub mod messages;
pub mod topics;
pub mod udp;

pub use bus::{Envelope, LocalBus, MessageBus};
pub use messages::{
    decode, encode, InterRobotLoopClosure, KeyframeOdom, NeighborsQuery,
    OptimizationResultMsg, OptimizerStateMsg, PoseGraphMsg, RobotIds, WireError,
};
pub use udp::UdpTransport;
