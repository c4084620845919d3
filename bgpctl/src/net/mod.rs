//! Address checks that run before any session is opened.

mod probe;
mod validate;

pub use probe::{Prober, TcpProber, check_reachability};
pub use validate::{is_restricted, parse_ipv4, validate_ip};
