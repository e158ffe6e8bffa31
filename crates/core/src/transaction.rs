use crate::{CoreError, Result};
use alloy_primitives::{FixedBytes, U256 as AlloyU256};
use alloy_sol_types::{Eip712Domain, SolStruct};
use serde::{Deserialize, Serialize};
use smartwallet_crypto::{keccak256, keccak256_concat};
use smartwallet_types::{Address, Bytes, HashExt, UintExt, H256, U256};
use std::borrow::Cow;

/// Transaction type of EIP-712 account transactions.
pub const EIP712_TX_TYPE: u8 = 0x71;

pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;
pub const DEFAULT_GAS_PER_PUBDATA: u64 = 50_000;

mod eip712 {
    alloy_sol_types::sol! {
        struct Transaction {
            uint256 txType;
            uint256 from;
            uint256 to;
            uint256 gasLimit;
            uint256 gasPerPubdataByteLimit;
            uint256 maxFeePerGas;
            uint256 maxPriorityFeePerGas;
            uint256 paymaster;
            uint256 nonce;
            uint256 value;
            bytes data;
            bytes32[] factoryDeps;
            bytes paymasterInput;
        }
    }
}

/// An account transaction as handed to the bootloader.
///
/// `signature` carries the ABI-encoded [`SignatureEnvelope`](crate::SignatureEnvelope)
/// and is not part of the signed digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub tx_type: u8,
    pub from: Address,
    pub to: Address,
    pub gas_limit: u64,
    pub gas_per_pubdata_byte_limit: u64,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    #[serde(default)]
    pub paymaster: Address,
    pub nonce: u64,
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub factory_deps: Vec<H256>,
    #[serde(default)]
    pub paymaster_input: Bytes,
    #[serde(default)]
    pub signature: Bytes,
}

impl Transaction {
    /// A call from `from` to `to` with default gas settings and no paymaster.
    pub fn new(from: Address, to: Address, value: U256, data: Bytes, nonce: u64) -> Self {
        Self {
            tx_type: EIP712_TX_TYPE,
            from,
            to,
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_per_pubdata_byte_limit: DEFAULT_GAS_PER_PUBDATA,
            max_fee_per_gas: U256::one(),
            max_priority_fee_per_gas: U256::zero(),
            paymaster: Address::ZERO,
            nonce,
            value,
            data,
            factory_deps: Vec::new(),
            paymaster_input: Bytes::new(),
            signature: Bytes::new(),
        }
    }
    
    pub fn with_gas(mut self, gas_limit: u64, max_fee_per_gas: U256) -> Self {
        self.gas_limit = gas_limit;
        self.max_fee_per_gas = max_fee_per_gas;
        self
    }
    
    pub fn with_paymaster(mut self, paymaster: Address, input: Bytes) -> Self {
        self.paymaster = paymaster;
        self.paymaster_input = input;
        self
    }
    
    pub fn with_signature(mut self, signature: Bytes) -> Self {
        self.signature = signature;
        self
    }
    
    pub fn has_paymaster(&self) -> bool {
        !self.paymaster.is_zero()
    }
    
    /// `gasLimit * maxFeePerGas`, the amount settled before execution.
    pub fn required_fee(&self) -> Result<U256> {
        U256::from(self.gas_limit)
            .checked_mul(self.max_fee_per_gas)
            .ok_or(CoreError::FeeOverflow {
                gas_limit: self.gas_limit,
                max_fee_per_gas: self.max_fee_per_gas,
            })
    }
    
    pub fn domain(chain_id: u64) -> Eip712Domain {
        Eip712Domain::new(
            Some(Cow::Borrowed("zkSync")),
            Some(Cow::Borrowed("2")),
            Some(AlloyU256::from(chain_id)),
            None,
            None,
        )
    }
    
    /// EIP-712 digest the owners sign.
    pub fn signing_hash(&self, chain_id: u64) -> H256 {
        let digest = self
            .to_typed_data()
            .eip712_signing_hash(&Self::domain(chain_id));
        H256::from_alloy(digest)
    }
    
    /// Identifier of the signed transaction: the digest bound to the signature bytes.
    pub fn hash(&self, chain_id: u64) -> H256 {
        let signing_hash = self.signing_hash(chain_id);
        let signature_hash = keccak256(&self.signature);
        keccak256_concat(&[signing_hash.as_bytes(), signature_hash.as_bytes()])
    }
    
    fn to_typed_data(&self) -> eip712::Transaction {
        eip712::Transaction {
            txType: AlloyU256::from(self.tx_type),
            from: address_word(&self.from),
            to: address_word(&self.to),
            gasLimit: AlloyU256::from(self.gas_limit),
            gasPerPubdataByteLimit: AlloyU256::from(self.gas_per_pubdata_byte_limit),
            maxFeePerGas: self.max_fee_per_gas.to_alloy(),
            maxPriorityFeePerGas: self.max_priority_fee_per_gas.to_alloy(),
            paymaster: address_word(&self.paymaster),
            nonce: AlloyU256::from(self.nonce),
            value: self.value.to_alloy(),
            data: self.data.clone().into(),
            factoryDeps: self
                .factory_deps
                .iter()
                .map(|dep| FixedBytes::from(dep.to_fixed_bytes()))
                .collect(),
            paymasterInput: self.paymaster_input.clone().into(),
        }
    }
}

fn address_word(address: &Address) -> AlloyU256 {
    AlloyU256::from_be_bytes(address.to_word().to_fixed_bytes())
}
