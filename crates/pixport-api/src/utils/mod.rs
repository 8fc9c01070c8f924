//! Request-level utilities.

pub mod client_ip;
