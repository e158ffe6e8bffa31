//! Fee sponsorship. The bootloader consults a paymaster only after the
//! account's validation and hooks have passed.

use crate::{
    auth::CallContext,
    host::Host,
    interfaces::{Contract, Paymaster},
    Result,
};
use alloy_sol_types::SolInterface;
use smartwallet_core::{abi::IPaymasterFlow, Transaction};
use smartwallet_types::{Address, Bytes, UintExt, H256, U256};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymasterError {
    #[error("Invalid paymaster input: {0}")]
    InvalidInput(String),
    
    #[error("Unsupported paymaster flow")]
    UnsupportedFlow,
    
    #[error("Sponsorship limit of {limit} reached for {account}")]
    LimitReached { account: Address, limit: u64 },
    
    #[error("{0} is not a paymaster")]
    NotAPaymaster(Address),
    
    #[error("Paymaster called by someone other than the bootloader")]
    OnlyBootloader,
    
    #[error("Paymaster {paymaster} paid {paid}, fee is {required}")]
    Underpaid {
        paymaster: Address,
        paid: U256,
        required: U256,
    },
}

/// Decoded `paymasterInput`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymasterFlow {
    /// No token involved; the paymaster pays on its own terms.
    General(Bytes),
    /// The account pays the paymaster in an ERC-20 token.
    ApprovalBased {
        token: Address,
        min_allowance: U256,
        inner: Bytes,
    },
}

impl PaymasterFlow {
    pub fn decode(input: &[u8]) -> std::result::Result<Self, PaymasterError> {
        if input.len() < 4 {
            return Err(PaymasterError::InvalidInput("missing flow selector".into()));
        }
        let call = IPaymasterFlow::IPaymasterFlowCalls::abi_decode(input, true)
            .map_err(|e| PaymasterError::InvalidInput(e.to_string()))?;
        Ok(match call {
            IPaymasterFlow::IPaymasterFlowCalls::general(c) => PaymasterFlow::General(c.input.into()),
            IPaymasterFlow::IPaymasterFlowCalls::approvalBased(c) => PaymasterFlow::ApprovalBased {
                token: c.token.into(),
                min_allowance: U256::from_alloy(c.minAllowance),
                inner: c.innerInput.into(),
            },
        })
    }
}

/// Sponsors the general flow for up to `limit` transactions per account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaslessPaymaster {
    pub limit: u64,
}

impl GaslessPaymaster {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
    
    /// Transactions already sponsored for `account`.
    pub fn sponsored(host: &Host, paymaster: &Address, account: &Address) -> Result<u64> {
        Ok(host.load(paymaster, account.as_bytes())?.unwrap_or(0))
    }
}

impl Paymaster for GaslessPaymaster {
    fn validate_and_pay(
        &self,
        host: &mut Host,
        ctx: &CallContext,
        tx_hash: &H256,
        tx: &Transaction,
        fee: U256,
    ) -> Result<()> {
        if ctx.caller != host.config().bootloader {
            return Err(PaymasterError::OnlyBootloader.into());
        }
        match PaymasterFlow::decode(&tx.paymaster_input)? {
            PaymasterFlow::General(_) => {}
            PaymasterFlow::ApprovalBased { token, .. } => {
                warn!(paymaster = %ctx.address, %token, "approval-based flow refused");
                return Err(PaymasterError::UnsupportedFlow.into());
            }
        }
        
        let used = Self::sponsored(host, &ctx.address, &tx.from)?;
        if used >= self.limit {
            return Err(PaymasterError::LimitReached {
                account: tx.from,
                limit: self.limit,
            }
            .into());
        }
        host.store(&ctx.address, tx.from.as_bytes(), &(used + 1))?;
        
        host.transfer(ctx.address, ctx.caller, fee)?;
        debug!(%tx_hash, "fee transferred to bootloader");
        info!(paymaster = %ctx.address, account = %tx.from, %fee, sponsored = used + 1, "transaction sponsored");
        Ok(())
    }
}

impl Contract for GaslessPaymaster {
    fn as_paymaster(&self) -> Option<&dyn Paymaster> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testing::Fixture, AccountError};
    use alloy_sol_types::SolCall;
    
    fn general_input() -> Bytes {
        let call = IPaymasterFlow::generalCall { input: Default::default() };
        Bytes::from_vec(call.abi_encode())
    }
    
    fn setup(limit: u64) -> (Fixture, Address) {
        let mut fx = Fixture::new();
        let paymaster = fx.deploy(GaslessPaymaster::new(limit));
        fx.host.set_balance(paymaster, U256::exp10(18)).unwrap();
        (fx, paymaster)
    }
    
    #[test]
    fn test_decode_flows() {
        assert_eq!(PaymasterFlow::decode(&general_input()).unwrap(), PaymasterFlow::General(Bytes::new()));
        
        let token = Address::from_low_u64_be(0x70);
        let call = IPaymasterFlow::approvalBasedCall {
            token: token.into(),
            minAllowance: U256::from(5u64).to_alloy(),
            innerInput: vec![1u8].into(),
        };
        let flow = PaymasterFlow::decode(&call.abi_encode()).unwrap();
        assert_eq!(
            flow,
            PaymasterFlow::ApprovalBased {
                token,
                min_allowance: U256::from(5u64),
                inner: Bytes::from_vec(vec![1]),
            }
        );
        
        assert!(matches!(PaymasterFlow::decode(&[0x01, 0x02]), Err(PaymasterError::InvalidInput(_))));
    }
    
    #[test]
    fn test_sponsored_transaction_leaves_account_balance() {
        let (mut fx, paymaster) = setup(2);
        let before = fx.host.balance(&fx.account).unwrap();
        
        let tx = fx.transfer_tx(Address::from_low_u64_be(0xbeef), U256::zero())
            .with_paymaster(paymaster, general_input());
        let tx = fx.sign(tx, vec![]);
        let receipt = fx.send(&tx).unwrap();
        
        assert_eq!(receipt.paymaster, Some(paymaster));
        assert_eq!(fx.host.balance(&fx.account).unwrap(), before);
        assert_eq!(GaslessPaymaster::sponsored(&fx.host, &paymaster, &fx.account).unwrap(), 1);
    }
    
    #[test]
    fn test_limit_is_enforced() {
        let (mut fx, paymaster) = setup(1);
        for expected_ok in [true, false] {
            let tx = fx.transfer_tx(Address::from_low_u64_be(0xbeef), U256::zero())
                .with_paymaster(paymaster, general_input());
            let tx = fx.sign(tx, vec![]);
            let result = fx.send(&tx);
            assert_eq!(result.is_ok(), expected_ok);
            if let Err(failure) = result {
                assert!(matches!(
                    failure.error,
                    AccountError::Paymaster(PaymasterError::LimitReached { limit: 1, .. })
                ));
            }
        }
    }
    
    #[test]
    fn test_only_bootloader_may_call() {
        let (mut fx, paymaster) = setup(1);
        let tx = fx.transfer_tx(Address::zero(), U256::zero()).with_paymaster(paymaster, general_input());
        let ctx = CallContext::plain(paymaster, fx.account);
        let err = GaslessPaymaster::new(1)
            .validate_and_pay(&mut fx.host, &ctx, &H256::zero(), &tx, U256::one())
            .unwrap_err();
        assert!(matches!(err, AccountError::Paymaster(PaymasterError::OnlyBootloader)));
    }
}
