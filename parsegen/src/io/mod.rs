//! Side-effecting operations: filesystem layout, configuration, process
//! execution, the completion capability and the candidate sandbox.

pub mod attempt_log;
pub mod completion;
pub mod config;
pub mod paths;
pub mod process;
pub mod sandbox;
