//! Analysis jobs: ports to the API and its collaborators, and the poller

pub mod poller;
pub mod ports;
