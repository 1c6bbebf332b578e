use std::str::FromStr;

use ethers_core::{
    abi::{Abi, Token},
    types::{Address, U256},
};
use thiserror::Error;

pub const TIP_METHOD: &str = "tip";

/// Minimal ABI of the TipJar contract: a payable `tip(string)`.
pub const TIP_JAR_ABI: &str = r#"[{"inputs":[{"internalType":"string","name":"message","type":"string"}],"name":"tip","outputs":[],"stateMutability":"payable","type":"function"}]"#;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("invalid contract address `{address}`: {reason}")]
    Address { address: String, reason: String },
    #[error("invalid contract ABI: {0}")]
    AbiJson(#[from] serde_json::Error),
    #[error("failed to encode contract call: {0}")]
    Encode(#[from] ethers_core::abi::Error),
}

/// A fully encoded payable call, ready to hand to a signer.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCall {
    pub contract: Address,
    pub method: String,
    pub args: Vec<Token>,
    pub value: U256,
    pub calldata: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct TipJarContract {
    address: Address,
    abi: Abi,
}

impl TipJarContract {
    pub fn new(address: &str) -> Result<Self, ContractError> {
        let parsed = Address::from_str(address.trim()).map_err(|err| ContractError::Address {
            address: address.to_string(),
            reason: err.to_string(),
        })?;
        let abi: Abi = serde_json::from_str(TIP_JAR_ABI)?;
        Ok(Self {
            address: parsed,
            abi,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn tip_call(&self, message: &str, value: U256) -> Result<ContractCall, ContractError> {
        let args = vec![Token::String(message.to_string())];
        let calldata = self.abi.function(TIP_METHOD)?.encode_input(&args)?;
        Ok(ContractCall {
            contract: self.address,
            method: TIP_METHOD.to_string(),
            args,
            value,
            calldata,
        })
    }
}
