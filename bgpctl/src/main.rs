//! Configure and verify BGP on every router in an inventory.
//!
//! # Usage
//!
//! ```bash
//! bgpctl [INVENTORY] [POLICY]
//! ```
//!
//! `INVENTORY` defaults to `sshInfo.json` and `POLICY` to `bgp.conf`, both
//! in the working directory. Exits non-zero if either file cannot be loaded
//! or if any device fails.

use std::env;
use std::process::ExitCode;

use log::{error, warn};
use tokio::sync::watch;

use bgpctl::net::TcpProber;
use bgpctl::session::SshOpener;
use bgpctl::{FleetReport, FleetRunner, Inventory, PolicyDocument};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let inventory_path = args.next().unwrap_or_else(|| "sshInfo.json".to_string());
    let policy_path = args.next().unwrap_or_else(|| "bgp.conf".to_string());

    let inventory = match Inventory::load(&inventory_path) {
        Ok(inventory) => inventory,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let policy = match PolicyDocument::load(&policy_path) {
        Ok(policy) => policy,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let opener = SshOpener::new(policy.settings.command_timeout());
    let prober = TcpProber::new(22, policy.settings.probe_timeout());
    let runner = FleetRunner::new(opener, prober, policy.store, policy.settings);

    let (cancel, signal) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling devices still in flight");
            let _ = cancel.send(true);
        }
    });

    let report = FleetReport::new(runner.run_until(inventory, signal).await);
    print!("{}", report);

    if report.has_fatal_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
