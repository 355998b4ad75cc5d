//! Allowance resolution
//!
//! Decides whether the USDC approval step is needed before minting.

use chain_client::{methods, read_amount, CallArg, ChainClient, ContractCall};
use usdec_core::{Address, TokenAmount};

/// Current allowance versus the amount the next mint needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowanceState {
    /// `None` until a read has succeeded
    pub current: Option<TokenAmount>,
    pub required: TokenAmount,
}

impl AllowanceState {
    pub fn unknown(required: TokenAmount) -> Self {
        Self {
            current: None,
            required,
        }
    }

    /// `Some(current < required)`, or `None` while the allowance is unknown
    pub fn needs_approval(&self) -> Option<bool> {
        self.current
            .as_ref()
            .map(|current| *current < self.required)
    }

    pub fn is_known(&self) -> bool {
        self.current.is_some()
    }
}

/// Reads the (token, owner, spender) allowance and tracks what it was read for.
///
/// A cached value is only reported for the exact owner and required amount it
/// was read against; any change makes the state unknown until refreshed.
#[derive(Debug, Clone)]
pub struct AllowanceResolver {
    token: Address,
    spender: Address,
    key: Option<(Address, TokenAmount)>,
    current: Option<TokenAmount>,
}

impl AllowanceResolver {
    pub fn new(token: Address, spender: Address) -> Self {
        Self {
            token,
            spender,
            key: None,
            current: None,
        }
    }

    pub fn token(&self) -> &Address {
        &self.token
    }

    pub fn spender(&self) -> &Address {
        &self.spender
    }

    /// Allowance view call for `owner`
    pub fn call(&self, owner: &Address) -> ContractCall {
        ContractCall::new(
            self.token.clone(),
            methods::ALLOWANCE,
            vec![
                CallArg::Address(owner.clone()),
                CallArg::Address(self.spender.clone()),
            ],
        )
    }

    /// State for `owner` needing `required`; unknown unless the last read matches
    pub fn state(&self, owner: &Address, required: &TokenAmount) -> AllowanceState {
        match &self.key {
            Some((o, r)) if o == owner && r == required => AllowanceState {
                current: self.current.clone(),
                required: required.clone(),
            },
            _ => AllowanceState::unknown(required.clone()),
        }
    }

    /// Read the allowance from chain. Always a fresh read.
    ///
    /// On a failed read the state is left unknown.
    pub async fn refresh(
        &mut self,
        client: &dyn ChainClient,
        owner: &Address,
        required: &TokenAmount,
    ) -> AllowanceState {
        self.key = Some((owner.clone(), required.clone()));
        self.current = match read_amount(client, &self.call(owner)).await {
            Ok(current) => {
                tracing::debug!(
                    owner = %owner,
                    current = %current,
                    required = %required,
                    "Allowance read"
                );
                Some(current)
            }
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "Allowance read failed");
                None
            }
        };
        self.state(owner, required)
    }

    /// Forget the cached value
    pub fn invalidate(&mut self) {
        self.key = None;
        self.current = None;
    }
}
