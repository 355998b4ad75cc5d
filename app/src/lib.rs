//! USDEC application library
//!
//! Wires the protocol crate to a wallet session: the [`Orchestrator`]
//! sequences approve, mint and redeem against a [`ChainClient`] and reports
//! through a [`Notifier`].
//!
//! [`ChainClient`]: chain_client::ChainClient

pub mod history;
pub mod notifier;
pub mod orchestrator;
pub mod session;
pub mod tx_watcher;

pub use history::{TransactionRecord, TxHistory};
pub use notifier::{ChannelNotifier, Notification, Notifier, NotifyKind, TracingNotifier};
pub use orchestrator::{FlowError, FlowView, Orchestrator, TxPhase};
pub use session::{Allowlist, WalletSession, WalletState};
pub use tx_watcher::{TxWatcher, WatchedItemInfo};

use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: [&str; 2] = ["usdec=debug", "info"];

/// `RUST_LOG` plus `directives`, and the directives that did not parse
fn build_filter(directives: &[&str]) -> (EnvFilter, Vec<String>) {
    let mut filter = EnvFilter::from_default_env();
    let mut rejected = Vec::new();
    for directive in directives {
        match directive.parse::<Directive>() {
            Ok(d) => filter = filter.add_directive(d),
            Err(_) => rejected.push(directive.to_string()),
        }
    }
    (filter, rejected)
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` is honoured; `usdec=debug,info` is added on top. Returns false
/// if a subscriber was already installed.
pub fn init_tracing() -> bool {
    let (filter, rejected) = build_filter(&DEFAULT_DIRECTIVES);

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok();
    if installed {
        tracing::info!("Starting USDEC orchestrator");
        for directive in rejected {
            tracing::warn!(directive = %directive, "Ignoring log directive");
        }
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        assert!(!init_tracing());
    }

    #[test]
    fn test_default_directives_parse() {
        let (_, rejected) = build_filter(&DEFAULT_DIRECTIVES);
        assert!(rejected.is_empty());

        let (_, rejected) = build_filter(&["usdec=debug", "usdec=loud"]);
        assert_eq!(rejected, vec!["usdec=loud".to_string()]);
    }
}
