//! CLI command text for the BGP workflow.

use super::policy::BgpPolicy;
use crate::platform::PlatformDefinition;

/// Mask used to advertise each network as a host route.
pub const HOST_MASK: &str = "255.255.255.255";

/// Configuration lines for a policy: the router context, the neighbor and
/// one host-routed network statement per advertised prefix.
pub fn config_lines(policy: &BgpPolicy) -> Vec<String> {
    let mut lines = Vec::with_capacity(2 + policy.network_list_to_advertise.len());
    lines.push(format!("router bgp {}", policy.local_asn));
    lines.push(format!(
        "neighbor {} remote-as {}",
        policy.neighbor_ip, policy.neighbor_remote_as
    ));
    for network in &policy.network_list_to_advertise {
        lines.push(format!("network {} mask {}", network, HOST_MASK));
    }
    lines
}

/// Status query filtered to the state line of one neighbor.
pub fn neighbor_state(neighbor_ip: &str) -> String {
    format!("show ip bgp neighbors {} | include BGP state", neighbor_ip)
}

/// Neighbor header lines for every configured neighbor.
pub fn neighbor_table() -> &'static str {
    "show ip bgp neighbors | include BGP neighbor is"
}

/// Routing table restricted to BGP-sourced entries.
pub fn bgp_routes(platform: &PlatformDefinition) -> String {
    format!("show ip route bgp | {}", platform.bgp_route_filter)
}

pub fn running_config() -> &'static str {
    "show running-config"
}

pub fn ping(target: &str) -> String {
    format!("ping {}", target)
}
