//! Built-in device families.

pub mod arista_eos;
pub mod cisco_iosxe;
