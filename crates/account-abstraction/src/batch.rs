use crate::{auth::CallContext, host::Host, interfaces::Contract, AccountError, Result};
use alloy_sol_types::{SolCall, SolValue};
use smartwallet_core::abi::IBatchCaller::{self, CallResult};
use smartwallet_types::{Address, Bytes, UintExt, U256};
use tracing::debug;

/// Stateless multicall helper. It never runs on its own: an account
/// transaction addressed to it is executed as a batch of calls from the account.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchCaller;

impl BatchCaller {
    /// Run `batchCall(Call[])` as `account`. The sub-call values must add up
    /// to `value`. A failing sub-call aborts the batch unless it allows failure.
    pub fn execute(host: &mut Host, account: Address, value: U256, data: &[u8]) -> Result<Bytes> {
        let batch = IBatchCaller::batchCallCall::abi_decode(data, true)?;
        
        let total = batch
            .calls
            .iter()
            .try_fold(U256::zero(), |acc, call| acc.checked_add(U256::from_alloy(call.value)))
            .ok_or_else(|| AccountError::Reverted("batch value overflow".into()))?;
        if total != value {
            return Err(AccountError::Reverted(format!(
                "batch value {} does not match transaction value {}",
                total, value
            )));
        }
        
        let mut results = Vec::with_capacity(batch.calls.len());
        for (index, call) in batch.calls.iter().enumerate() {
            let target = Address::from(call.target);
            match host.call(account, target, U256::from_alloy(call.value), &call.callData) {
                Ok(output) => results.push(CallResult {
                    success: true,
                    returnData: output.into(),
                }),
                Err(err) if call.allowFailure => {
                    debug!(%account, index, error = %err, "batch call failed, continuing");
                    results.push(CallResult {
                        success: false,
                        returnData: err.to_string().into_bytes().into(),
                    });
                }
                Err(err) => {
                    return Err(AccountError::BatchCallFailed {
                        index,
                        reason: err.to_string(),
                    })
                }
            }
        }
        
        Ok(Bytes::from_vec((results,).abi_encode_params()))
    }
}

impl Contract for BatchCaller {
    fn call(&self, _host: &mut Host, _ctx: &CallContext, data: &[u8]) -> Result<Bytes> {
        if data.is_empty() {
            return Ok(Bytes::new());
        }
        Err(AccountError::Reverted(
            "batch caller only runs inside an account transaction".into(),
        ))
    }
}
