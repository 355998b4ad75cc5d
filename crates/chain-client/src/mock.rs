//! In-memory chain for tests.
//!
//! Models the USDC token, the USDEC token, and the vault closely enough to
//! exercise the orchestrator: allowances only change when an approval is
//! mined, mints need a mined allowance, and outcomes of the next
//! simulate/write/receipt can be scripted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use usdec_core::{Address, ChainError, TokenAmount, TxHash};

use crate::calls::methods;
use crate::{CallValue, ChainClient, ContractCall, ReceiptStatus, Result, TxReceipt};

enum WriteScript {
    Reject(String),
    FailBroadcast(String),
}

enum ReceiptScript {
    Revert,
    Drop,
}

struct PendingTx {
    from: Address,
    call: ContractCall,
}

struct MockState {
    usdc: Address,
    usdec: Address,
    vault: Address,
    balances: HashMap<(Address, Address), TokenAmount>,
    allowances: HashMap<(Address, Address, Address), TokenAmount>,
    preview_bps: u32,
    read_failures: HashMap<String, String>,
    next_simulation: VecDeque<String>,
    next_write: VecDeque<WriteScript>,
    next_receipt: VecDeque<ReceiptScript>,
    next_receipt_wait: VecDeque<String>,
    pending: HashMap<TxHash, PendingTx>,
    mined: HashMap<TxHash, TxReceipt>,
    reads: Vec<ContractCall>,
    simulations: Vec<ContractCall>,
    writes: Vec<ContractCall>,
    nonce: u64,
    block: u64,
}

/// In-memory ERC-20 pair plus vault
pub struct MockChain {
    state: Mutex<MockState>,
}

impl MockChain {
    pub fn new(usdc: Address, usdec: Address, vault: Address) -> Self {
        Self {
            state: Mutex::new(MockState {
                usdc,
                usdec,
                vault,
                balances: HashMap::new(),
                allowances: HashMap::new(),
                preview_bps: 10_000,
                read_failures: HashMap::new(),
                next_simulation: VecDeque::new(),
                next_write: VecDeque::new(),
                next_receipt: VecDeque::new(),
                next_receipt_wait: VecDeque::new(),
                pending: HashMap::new(),
                mined: HashMap::new(),
                reads: Vec::new(),
                simulations: Vec::new(),
                writes: Vec::new(),
                nonce: 0,
                block: 1_000,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock chain state poisoned")
    }

    pub fn set_balance(&self, token: &Address, owner: &Address, amount: TokenAmount) {
        self.lock()
            .balances
            .insert((token.clone(), owner.clone()), amount);
    }

    pub fn balance(&self, token: &Address, owner: &Address) -> TokenAmount {
        self.lock().balance(token, owner)
    }

    pub fn set_allowance(
        &self,
        token: &Address,
        owner: &Address,
        spender: &Address,
        amount: TokenAmount,
    ) {
        self.lock()
            .allowances
            .insert((token.clone(), owner.clone(), spender.clone()), amount);
    }

    pub fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> TokenAmount {
        self.lock().allowance(token, owner, spender)
    }

    /// Shares returned by `previewDeposit`, in basis points of the assets
    pub fn set_preview_bps(&self, bps: u32) {
        self.lock().preview_bps = bps;
    }

    /// Every read of `method` fails until cleared
    pub fn fail_reads(&self, method: &str, reason: &str) {
        self.lock()
            .read_failures
            .insert(method.to_string(), reason.to_string());
    }

    pub fn clear_read_failures(&self) {
        self.lock().read_failures.clear();
    }

    pub fn fail_next_simulation(&self, reason: &str) {
        self.lock().next_simulation.push_back(reason.to_string());
    }

    pub fn reject_next_signature(&self, reason: &str) {
        self.lock()
            .next_write
            .push_back(WriteScript::Reject(reason.to_string()));
    }

    pub fn fail_next_broadcast(&self, reason: &str) {
        self.lock()
            .next_write
            .push_back(WriteScript::FailBroadcast(reason.to_string()));
    }

    pub fn revert_next_receipt(&self) {
        self.lock().next_receipt.push_back(ReceiptScript::Revert);
    }

    pub fn drop_next_receipt(&self) {
        self.lock().next_receipt.push_back(ReceiptScript::Drop);
    }

    /// The next receipt wait fails with a transport error; the transaction
    /// stays pending
    pub fn fail_next_receipt_wait(&self, reason: &str) {
        self.lock().next_receipt_wait.push_back(reason.to_string());
    }

    /// Calls that were signed and broadcast, in order
    pub fn writes(&self) -> Vec<ContractCall> {
        self.lock().writes.clone()
    }

    pub fn simulations(&self) -> Vec<ContractCall> {
        self.lock().simulations.clone()
    }

    pub fn reads(&self) -> Vec<ContractCall> {
        self.lock().reads.clone()
    }

    /// Broadcast transactions whose receipt nobody has waited for yet
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }
}

impl MockState {
    fn balance(&self, token: &Address, owner: &Address) -> TokenAmount {
        self.balances
            .get(&(token.clone(), owner.clone()))
            .cloned()
            .unwrap_or_default()
    }

    fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> TokenAmount {
        self.allowances
            .get(&(token.clone(), owner.clone(), spender.clone()))
            .cloned()
            .unwrap_or_default()
    }

    fn next_hash(&mut self) -> TxHash {
        self.nonce += 1;
        let mut bytes = [0u8; 32];
        bytes[0] = 0xaa;
        bytes[24..].copy_from_slice(&self.nonce.to_be_bytes());
        TxHash::from_bytes(bytes)
    }

    /// Revert reason if `call` from `from` would fail against current state
    fn check(&self, from: &Address, call: &ContractCall) -> std::result::Result<(), String> {
        match call.method.as_str() {
            methods::APPROVE => match (call.address_arg(0), call.uint_arg(1)) {
                (Some(_), Some(_)) => Ok(()),
                _ => Err("approve: bad arguments".to_string()),
            },
            methods::MINT if call.contract == self.usdec => {
                let amount = call.uint_arg(0).ok_or("mint: bad arguments")?;
                if self.allowance(&self.usdc, from, &self.usdec) < *amount {
                    return Err("ERC20: insufficient allowance".to_string());
                }
                if self.balance(&self.usdc, from) < *amount {
                    return Err("ERC20: transfer amount exceeds balance".to_string());
                }
                Ok(())
            }
            methods::REDEEM if call.contract == self.usdec => {
                let amount = call.uint_arg(0).ok_or("redeem: bad arguments")?;
                if self.balance(&self.usdec, from) < *amount {
                    return Err("ERC20: burn amount exceeds balance".to_string());
                }
                Ok(())
            }
            other => Err(format!("unsupported method {}", other)),
        }
    }

    fn apply(&mut self, from: &Address, call: &ContractCall) {
        match call.method.as_str() {
            methods::APPROVE => {
                if let (Some(spender), Some(amount)) = (call.address_arg(0), call.uint_arg(1)) {
                    self.allowances.insert(
                        (call.contract.clone(), from.clone(), spender.clone()),
                        amount.clone(),
                    );
                }
            }
            methods::MINT => {
                if let Some(amount) = call.uint_arg(0).cloned() {
                    let (usdc, usdec) = (self.usdc.clone(), self.usdec.clone());
                    let allowance = self.allowance(&usdc, from, &usdec).saturating_sub(&amount);
                    self.allowances
                        .insert((usdc.clone(), from.clone(), usdec.clone()), allowance);
                    self.debit(&usdc, from, &amount);
                    self.credit(&usdec, from, &amount);
                }
            }
            methods::REDEEM => {
                if let Some(amount) = call.uint_arg(0).cloned() {
                    let (usdc, usdec) = (self.usdc.clone(), self.usdec.clone());
                    self.debit(&usdec, from, &amount);
                    self.credit(&usdc, from, &amount);
                }
            }
            _ => {}
        }
    }

    fn debit(&mut self, token: &Address, owner: &Address, amount: &TokenAmount) {
        let balance = self.balance(token, owner).saturating_sub(amount);
        self.balances.insert((token.clone(), owner.clone()), balance);
    }

    fn credit(&mut self, token: &Address, owner: &Address, amount: &TokenAmount) {
        let balance = &self.balance(token, owner) + amount;
        self.balances.insert((token.clone(), owner.clone()), balance);
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn read(&self, call: &ContractCall) -> Result<CallValue> {
        let mut state = self.lock();
        state.reads.push(call.clone());

        if let Some(reason) = state.read_failures.get(&call.method) {
            return Err(ChainError::Transport {
                reason: reason.clone(),
            });
        }

        let bad_args = || ChainError::UnexpectedValue {
            method: call.method.clone(),
            message: "bad arguments".to_string(),
        };

        match call.method.as_str() {
            methods::BALANCE_OF => {
                let owner = call.address_arg(0).ok_or_else(bad_args)?;
                Ok(CallValue::Uint(state.balance(&call.contract, owner)))
            }
            methods::ALLOWANCE => {
                let owner = call.address_arg(0).ok_or_else(bad_args)?;
                let spender = call.address_arg(1).ok_or_else(bad_args)?;
                Ok(CallValue::Uint(state.allowance(
                    &call.contract,
                    owner,
                    spender,
                )))
            }
            methods::PREVIEW_DEPOSIT if call.contract == state.vault => {
                let assets = call.uint_arg(0).ok_or_else(bad_args)?;
                Ok(CallValue::Uint(assets.mul_bps(state.preview_bps)))
            }
            other => Err(ChainError::Transport {
                reason: format!("execution reverted: unknown view {}", other),
            }),
        }
    }

    async fn simulate(&self, from: &Address, call: &ContractCall) -> Result<()> {
        let mut state = self.lock();
        state.simulations.push(call.clone());

        if let Some(reason) = state.next_simulation.pop_front() {
            return Err(ChainError::Simulation { reason });
        }
        state
            .check(from, call)
            .map_err(|reason| ChainError::Simulation { reason })
    }

    async fn write(&self, from: &Address, call: &ContractCall) -> Result<TxHash> {
        let mut state = self.lock();

        match state.next_write.pop_front() {
            Some(WriteScript::Reject(reason)) => return Err(ChainError::UserRejected { reason }),
            Some(WriteScript::FailBroadcast(reason)) => {
                return Err(ChainError::Submission { reason })
            }
            None => {}
        }

        state.writes.push(call.clone());
        let hash = state.next_hash();
        state.pending.insert(
            hash.clone(),
            PendingTx {
                from: from.clone(),
                call: call.clone(),
            },
        );
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: &TxHash) -> Result<TxReceipt> {
        let mut state = self.lock();

        if let Some(receipt) = state.mined.get(hash) {
            return Ok(receipt.clone());
        }
        if let Some(reason) = state.next_receipt_wait.pop_front() {
            return Err(ChainError::Transport { reason });
        }

        let tx = state.pending.remove(hash).ok_or_else(|| ChainError::Transport {
            reason: format!("unknown transaction {}", hash),
        })?;

        let status = match state.next_receipt.pop_front() {
            Some(ReceiptScript::Drop) => return Err(ChainError::Dropped { hash: hash.clone() }),
            Some(ReceiptScript::Revert) => ReceiptStatus::Reverted,
            None => match state.check(&tx.from, &tx.call) {
                Ok(()) => {
                    state.apply(&tx.from, &tx.call);
                    ReceiptStatus::Success
                }
                Err(_) => ReceiptStatus::Reverted,
            },
        };

        state.block += 1;
        let receipt = TxReceipt {
            hash: hash.clone(),
            status,
            block_number: state.block,
        };
        state.mined.insert(hash.clone(), receipt.clone());
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CallArg;

    fn addr(byte: u8) -> Address {
        Address::parse(&format!("0x{}", format!("{:02x}", byte).repeat(20))).unwrap()
    }

    fn setup() -> (MockChain, Address, Address, Address, Address) {
        let (usdc, usdec, vault, user) = (addr(1), addr(2), addr(3), addr(9));
        let chain = MockChain::new(usdc.clone(), usdec.clone(), vault.clone());
        chain.set_balance(&usdc, &user, TokenAmount::from_units(100_000_000));
        (chain, usdc, usdec, vault, user)
    }

    fn approve(usdc: &Address, usdec: &Address, amount: u64) -> ContractCall {
        ContractCall::new(
            usdc.clone(),
            methods::APPROVE,
            vec![
                CallArg::Address(usdec.clone()),
                CallArg::Uint(TokenAmount::from_units(amount)),
            ],
        )
    }

    fn mint(usdec: &Address, amount: u64) -> ContractCall {
        ContractCall::new(
            usdec.clone(),
            methods::MINT,
            vec![CallArg::Uint(TokenAmount::from_units(amount))],
        )
    }

    #[tokio::test]
    async fn test_allowance_applies_only_when_mined() {
        let (chain, usdc, usdec, _, user) = setup();
        let hash = chain
            .write(&user, &approve(&usdc, &usdec, 11_000_000))
            .await
            .unwrap();

        assert!(chain.allowance(&usdc, &user, &usdec).is_zero());
        assert!(chain.simulate(&user, &mint(&usdec, 11_000_000)).await.is_err());

        let receipt = chain.wait_for_receipt(&hash).await.unwrap();
        assert!(receipt.is_success());
        assert_eq!(
            chain.allowance(&usdc, &user, &usdec),
            TokenAmount::from_units(11_000_000)
        );
        assert!(chain.simulate(&user, &mint(&usdec, 11_000_000)).await.is_ok());
    }

    #[tokio::test]
    async fn test_mint_moves_balances() {
        let (chain, usdc, usdec, _, user) = setup();
        chain.set_allowance(&usdc, &user, &usdec, TokenAmount::from_units(11_000_000));

        let hash = chain.write(&user, &mint(&usdec, 11_000_000)).await.unwrap();
        chain.wait_for_receipt(&hash).await.unwrap();

        assert_eq!(
            chain.balance(&usdc, &user),
            TokenAmount::from_units(89_000_000)
        );
        assert_eq!(
            chain.balance(&usdec, &user),
            TokenAmount::from_units(11_000_000)
        );
        assert!(chain.allowance(&usdc, &user, &usdec).is_zero());
    }

    #[tokio::test]
    async fn test_scripted_outcomes() {
        let (chain, usdc, usdec, _, user) = setup();

        chain.reject_next_signature("User denied transaction signature");
        let err = chain
            .write(&user, &approve(&usdc, &usdec, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::UserRejected { .. }));
        assert!(chain.writes().is_empty());

        chain.revert_next_receipt();
        let hash = chain.write(&user, &approve(&usdc, &usdec, 1)).await.unwrap();
        let receipt = chain.wait_for_receipt(&hash).await.unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Reverted);
        assert!(chain.allowance(&usdc, &user, &usdec).is_zero());

        chain.drop_next_receipt();
        let hash = chain.write(&user, &approve(&usdc, &usdec, 1)).await.unwrap();
        assert!(matches!(
            chain.wait_for_receipt(&hash).await,
            Err(ChainError::Dropped { .. })
        ));
    }

    #[tokio::test]
    async fn test_receipt_wait_failure_keeps_pending() {
        let (chain, usdc, usdec, _, user) = setup();
        let hash = chain.write(&user, &approve(&usdc, &usdec, 5)).await.unwrap();

        chain.fail_next_receipt_wait("connection reset");
        assert!(matches!(
            chain.wait_for_receipt(&hash).await,
            Err(ChainError::Transport { .. })
        ));
        assert_eq!(chain.pending_count(), 1);

        assert!(chain.wait_for_receipt(&hash).await.unwrap().is_success());
        assert_eq!(chain.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_preview_deposit() {
        let (chain, _, _, vault, _) = setup();
        let call = ContractCall::new(
            vault.clone(),
            methods::PREVIEW_DEPOSIT,
            vec![CallArg::Uint(TokenAmount::from_units(10_890_000))],
        );
        assert_eq!(
            chain.read(&call).await.unwrap(),
            CallValue::Uint(TokenAmount::from_units(10_890_000))
        );

        chain.set_preview_bps(0);
        assert_eq!(
            chain.read(&call).await.unwrap(),
            CallValue::Uint(TokenAmount::zero())
        );

        chain.fail_reads(methods::PREVIEW_DEPOSIT, "rpc down");
        assert!(chain.read(&call).await.is_err());
    }
}
