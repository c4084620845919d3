//! Arista EOS platform definition.
//!
//! EOS accepts the IOS-style BGP commands used here. Routing table lines
//! carry a leading space before the source code (` B E    10.0.0.0/32 ...`)
//! and errors are reported as `% Invalid input` or `% Incomplete command`.

use crate::platform::PlatformDefinition;

pub const PLATFORM_NAME: &str = "arista_eos";

pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new(PLATFORM_NAME)
        .with_config_error_pattern(r"% Invalid|% Incomplete|% Ambiguous")
        .unwrap()
        .with_bgp_route_filter("include ^ B")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 32767")
        .with_terminal_size(32767, 24)
}
