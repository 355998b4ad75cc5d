#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chain_client::mock::MockChain;
use usdec_app::{Allowlist, Notifier, NotifyKind, Orchestrator, WalletSession};
use usdec_core::{Address, AppConfig, ChainId, TokenAmount};

/// Keeps every notification for assertions
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(NotifyKind, String)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(NotifyKind, String)> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|(_, m)| m).collect()
    }

    pub fn of_kind(&self, kind: NotifyKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotifyKind, message: &str) {
        self.events.lock().unwrap().push((kind, message.to_string()));
    }
}

pub fn addr(byte: u8) -> Address {
    Address::parse(&format!("0x{}", format!("{:02x}", byte).repeat(20))).unwrap()
}

pub fn usdc(amount: &str) -> TokenAmount {
    TokenAmount::parse_decimal(amount, 6).unwrap()
}

pub struct Harness {
    pub chain: Arc<MockChain>,
    pub session: WalletSession,
    pub notifier: Arc<RecordingNotifier>,
    pub orchestrator: Orchestrator,
    pub user: Address,
    pub usdc: Address,
    pub usdec: Address,
    pub vault: Address,
}

impl Harness {
    /// Give the user an allowance that already covers `amount`
    pub fn preapprove(&self, amount: &str) {
        self.chain
            .set_allowance(&self.usdc, &self.user, &self.usdec, usdc(amount));
    }

    pub fn usdc_balance(&self) -> TokenAmount {
        self.chain.balance(&self.usdc, &self.user)
    }

    pub fn usdec_balance(&self) -> TokenAmount {
        self.chain.balance(&self.usdec, &self.user)
    }

    pub fn written_methods(&self) -> Vec<String> {
        self.chain.writes().into_iter().map(|c| c.method).collect()
    }
}

pub fn harness() -> Harness {
    harness_with(|_| {}, true)
}

/// Connected, allowlisted user on Base holding 1000 USDC
pub fn harness_with(configure: impl FnOnce(&mut AppConfig), allowlisted: bool) -> Harness {
    let (usdc_addr, usdec_addr, vault_addr, user) = (addr(1), addr(2), addr(3), addr(0xab));

    let mut config = AppConfig::default();
    config.chain.usdc_address = usdc_addr.clone();
    config.chain.usdec_address = usdec_addr.clone();
    config.chain.vault_address = vault_addr.clone();
    configure(&mut config);

    let chain = Arc::new(MockChain::new(
        usdc_addr.clone(),
        usdec_addr.clone(),
        vault_addr.clone(),
    ));
    chain.set_balance(&usdc_addr, &user, usdc("1000"));

    let session = WalletSession::new();
    session.connect(user.clone(), ChainId::BASE);

    // Upper-cased entry: membership must ignore case
    let allowlist = if allowlisted {
        Allowlist::from_addresses([user.as_str().to_uppercase().replace("0X", "0x")]).unwrap()
    } else {
        Allowlist::default()
    };

    let notifier = Arc::new(RecordingNotifier::default());
    let orchestrator = Orchestrator::new(
        &config,
        chain.clone(),
        notifier.clone(),
        session.subscribe(),
        allowlist,
    )
    .unwrap();

    Harness {
        chain,
        session,
        notifier,
        orchestrator,
        user,
        usdc: usdc_addr,
        usdec: usdec_addr,
        vault: vault_addr,
    }
}
