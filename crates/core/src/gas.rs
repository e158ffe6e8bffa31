use crate::{CoreError, Result};

#[derive(Debug, Clone, Copy)]
pub struct Gas {
    limit: u64,
    used: u64,
}

impl Gas {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    pub fn consume(&mut self, amount: u64) -> Result<()> {
        let new_used = self.used.saturating_add(amount);
        if new_used > self.limit {
            Err(CoreError::OutOfGas {
                limit: self.limit,
                requested: new_used,
            })
        } else {
            self.used = new_used;
            Ok(())
        }
    }

    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// Flat charges of the operations the account performs.
#[derive(Debug, Clone, Copy)]
pub struct GasCost;

impl GasCost {
    pub const TRANSACTION: u64 = 21000;
    pub const CALL: u64 = 2600;
    pub const CALLVALUE: u64 = 9000;
    pub const SSTORE: u64 = 20000;
    pub const SRESET: u64 = 2900;
    pub const LOG: u64 = 375;
    pub const ECRECOVER: u64 = 3000;
    /// RIP-7212 precompile price.
    pub const P256VERIFY: u64 = 3450;
    pub const TXDATAZERO: u64 = 4;
    pub const TXDATANONZERO: u64 = 16;
}

/// Intrinsic cost of a transaction carrying `data`.
pub fn intrinsic_gas(data: &[u8]) -> u64 {
    data.iter().fold(GasCost::TRANSACTION, |acc, byte| {
        let cost = if *byte == 0 {
            GasCost::TXDATAZERO
        } else {
            GasCost::TXDATANONZERO
        };
        acc.saturating_add(cost)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_consume() {
        let mut gas = Gas::new(100);
        gas.consume(60).unwrap();
        assert_eq!(gas.remaining(), 40);
        assert!(matches!(
            gas.consume(41),
            Err(CoreError::OutOfGas { limit: 100, requested: 101 })
        ));
        assert_eq!(gas.used(), 60);
    }

    #[test]
    fn test_intrinsic_gas() {
        assert_eq!(intrinsic_gas(&[]), 21000);
        assert_eq!(intrinsic_gas(&[0, 1]), 21000 + 4 + 16);
    }
}
