//! Twin Interview - chat with a candidate's digital twin
//!
//! A conversation state machine drives a remote interview service where an
//! AI persona answers on the candidate's behalf. The service and its profile
//! store are reached over HTTP through [`client`].

pub mod client;
pub mod config;
pub mod profile;
pub mod runtime;
pub mod state_machine;
pub mod transcript;
