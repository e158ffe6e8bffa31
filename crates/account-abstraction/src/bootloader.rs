//! Drives one transaction through the account: validation, fee settlement
//! and execution as a single atomic unit.

use crate::{
    account::SmartAccount,
    auth::CallContext,
    events::Event,
    host::Host,
    interfaces::{probe, InterfaceId},
    paymaster::PaymasterError,
    AccountError, Result,
};
use serde::Serialize;
use smartwallet_core::{gas::intrinsic_gas, Transaction};
use smartwallet_types::{Address, Bytes, H256, U256};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

/// Progress of a transaction through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Unvalidated,
    ValidatorChecked,
    HooksChecked,
    Executing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Unvalidated => "unvalidated",
            Stage::ValidatorChecked => "validator-checked",
            Stage::HooksChecked => "hooks-checked",
            Stage::Executing => "executing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub tx_hash: H256,
    pub account: Address,
    pub nonce: u64,
    pub gas_used: u64,
    pub fee: U256,
    pub paymaster: Option<Address>,
    pub return_data: Bytes,
    pub events: Vec<Event>,
}

/// A rejected transaction. None of its effects were applied.
#[derive(Debug, Error)]
#[error("transaction rejected at stage {stage}: {error}")]
pub struct TransactionFailure {
    /// Last stage the transaction completed.
    pub stage: Stage,
    pub error: AccountError,
}

pub struct Bootloader;

impl Bootloader {
    pub fn process_transaction(host: &mut Host, tx: &Transaction) -> std::result::Result<Receipt, TransactionFailure> {
        let account = tx.from;
        if let Err(error) = host.enter(account) {
            warn!(%account, "nested transaction refused");
            return Err(TransactionFailure {
                stage: Stage::Unvalidated,
                error,
            });
        }
        
        let checkpoint = host.checkpoint();
        let events_before = host.events().len();
        let outer_meter = host.begin_metering(tx.gas_limit);
        
        let mut stage = Stage::Unvalidated;
        let result = Self::run(host, tx, &mut stage);
        let gas_used = host.end_metering(outer_meter).map(|gas| gas.used()).unwrap_or_default();
        
        let outcome = match result {
            Ok((fee, return_data)) => host.commit(checkpoint).map(|()| (fee, return_data)),
            Err(err) => Err(host.revert(checkpoint).err().unwrap_or(err)),
        };
        host.exit(&account);
        
        match outcome {
            Ok((fee, return_data)) => {
                let tx_hash = tx.hash(host.chain_id());
                info!(%account, %tx_hash, nonce = tx.nonce, gas_used, "transaction processed");
                Ok(Receipt {
                    tx_hash,
                    account,
                    nonce: tx.nonce,
                    gas_used,
                    fee,
                    paymaster: tx.has_paymaster().then_some(tx.paymaster),
                    return_data,
                    events: host.events()[events_before..].to_vec(),
                })
            }
            Err(error) => {
                warn!(%account, nonce = tx.nonce, %stage, %error, "transaction rejected");
                Err(TransactionFailure { stage, error })
            }
        }
    }
    
    fn run(host: &mut Host, tx: &Transaction, stage: &mut Stage) -> Result<(U256, Bytes)> {
        let account = tx.from;
        if !host.is_account(&account) {
            return Err(AccountError::NotAnAccount(account));
        }
        host.charge(intrinsic_gas(&tx.data))?;
        
        let chain_id = host.chain_id();
        let signed_hash = tx.signing_hash(chain_id);
        let tx_hash = tx.hash(chain_id);
        let ctx = CallContext::plain(account, host.config().bootloader);
        
        SmartAccount::validate_transaction(host, &ctx, &signed_hash, tx, stage)?;
        
        let fee = tx.required_fee()?;
        if tx.has_paymaster() {
            Self::sponsor(host, tx, &tx_hash, fee)?;
        } else {
            SmartAccount::pay_for_transaction(host, &ctx, fee)?;
        }
        
        *stage = Stage::Executing;
        let return_data = SmartAccount::execute_transaction(host, &ctx, tx)?;
        host.emit(Event::TransactionExecuted {
            account,
            tx_hash,
            nonce: tx.nonce,
        })?;
        *stage = Stage::Done;
        Ok((fee, return_data))
    }
    
    /// Ask the paymaster to cover `fee`; it must leave the bootloader paid.
    fn sponsor(host: &mut Host, tx: &Transaction, tx_hash: &H256, fee: U256) -> Result<()> {
        let bootloader = host.config().bootloader;
        let contract = host
            .contract(&tx.paymaster)
            .ok_or(PaymasterError::NotAPaymaster(tx.paymaster))?;
        let paymaster = probe(contract.as_ref(), InterfaceId::paymaster(), |c| c.as_paymaster())
            .ok_or(PaymasterError::NotAPaymaster(tx.paymaster))?;
        
        let before = host.balance(&bootloader)?;
        let ctx = CallContext::plain(tx.paymaster, bootloader);
        host.frame(|host| paymaster.validate_and_pay(host, &ctx, tx_hash, tx, fee))?;
        
        let received = host.balance(&bootloader)?.saturating_sub(before);
        if received < fee {
            return Err(PaymasterError::Underpaid {
                paymaster: tx.paymaster,
                paid: received,
                required: fee,
            }
            .into());
        }
        
        host.emit(Event::FeeSponsored {
            paymaster: tx.paymaster,
            account: tx.from,
            fee,
        })
    }
}
