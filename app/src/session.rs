//! Wallet session and allowlist
//!
//! The connected wallet can change at any moment outside the orchestrator.
//! [`WalletSession`] is the writer; the orchestrator holds a
//! `watch::Receiver` and samples it at each decision point.

use std::collections::HashSet;
use std::time::Instant;

use tokio::sync::watch;
use usdec_core::{Address, ChainId, ConfigError, TypeError};

/// Connected wallet as last reported by the wallet provider
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletState {
    pub address: Option<Address>,
    pub chain_id: Option<ChainId>,
    /// When the current address connected
    pub connected_at: Option<Instant>,
}

impl WalletState {
    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }
}

/// Writer side of the wallet state
#[derive(Debug)]
pub struct WalletSession {
    state: watch::Sender<WalletState>,
}

impl WalletSession {
    pub fn new() -> Self {
        let (state, _) = watch::channel(WalletState::default());
        Self { state }
    }

    /// Receiver to hand to an orchestrator
    pub fn subscribe(&self) -> watch::Receiver<WalletState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> WalletState {
        self.state.borrow().clone()
    }

    pub fn connect(&self, address: Address, chain_id: ChainId) {
        tracing::info!(address = %address, chain_id = %chain_id, "Wallet connected");
        self.state.send_replace(WalletState {
            address: Some(address),
            chain_id: Some(chain_id),
            connected_at: Some(Instant::now()),
        });
    }

    pub fn switch_chain(&self, chain_id: ChainId) {
        tracing::info!(chain_id = %chain_id, "Wallet switched chain");
        self.state.send_modify(|state| state.chain_id = Some(chain_id));
    }

    pub fn disconnect(&self) {
        tracing::info!("Wallet disconnected");
        self.state.send_replace(WalletState::default());
    }
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Addresses permitted to mint, compared case-insensitively
#[derive(Clone, Debug, Default)]
pub struct Allowlist {
    addresses: HashSet<Address>,
}

impl Allowlist {
    pub fn from_addresses<I, S>(addresses: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addresses = addresses
            .into_iter()
            .map(|a| Address::parse(a.as_ref()))
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self { addresses })
    }

    /// Load from a JSON array of address strings
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: Vec<String> = serde_json::from_str(json)?;
        Self::from_addresses(raw).map_err(|e| ConfigError::InvalidValue {
            field: "allowlist".to_string(),
            message: e.to_string(),
        })
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &str = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01";

    #[test]
    fn test_allowlist_is_case_insensitive() {
        let allowlist = Allowlist::from_addresses([MIXED]).unwrap();
        let lower = Address::parse(&MIXED.to_lowercase()).unwrap();
        let upper = Address::parse(&format!("0x{}", MIXED[2..].to_uppercase())).unwrap();
        assert!(allowlist.contains(&lower));
        assert!(allowlist.contains(&upper));
        assert_eq!(allowlist.len(), 1);
    }

    #[test]
    fn test_allowlist_from_json() {
        let json = format!(r#"["{}", "{}"]"#, MIXED, MIXED.to_lowercase());
        let allowlist = Allowlist::from_json_str(&json).unwrap();
        assert_eq!(allowlist.len(), 1);

        assert!(Allowlist::from_json_str(r#"["0x1234"]"#).is_err());
        assert!(Allowlist::from_json_str("{}").is_err());
    }

    #[test]
    fn test_session_updates_are_visible() {
        let session = WalletSession::new();
        let rx = session.subscribe();
        assert!(!rx.borrow().is_connected());

        let address = Address::parse(MIXED).unwrap();
        session.connect(address.clone(), ChainId::BASE);
        assert_eq!(rx.borrow().address, Some(address));

        session.switch_chain(ChainId(1));
        assert_eq!(rx.borrow().chain_id, Some(ChainId(1)));
        assert!(rx.borrow().connected_at.is_some());

        session.disconnect();
        assert_eq!(*rx.borrow(), WalletState::default());
    }
}
