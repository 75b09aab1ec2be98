//! Connectivity checking and the network-resilience state machine
//!
//! While a run is active the `NetworkMonitor` samples connectivity in the
//! background. Whenever it is not satisfied the network is up it holds the
//! shared pause flag, which stops the scheduler from dispatching new probes;
//! in-flight probes are left to finish or fail on their own.

mod check;
mod monitor;

pub use check::{ConnectivityProbe, HttpConnectivityProbe};
pub use monitor::{NetEvent, NetworkMonitor, NetworkState};
