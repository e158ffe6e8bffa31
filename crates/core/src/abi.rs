//! Solidity call surfaces of the account and its system collaborators.

use alloy_sol_types::sol;

sol! {
    /// Self-call and module-call surface of a smart account.
    interface IAccount {
        function r1AddOwner(bytes pubKey) external;
        function k1AddOwner(address addr) external;
        function r1RemoveOwner(bytes pubKey) external;
        function k1RemoveOwner(address addr) external;
        function resetOwners(bytes pubKey) external;

        function r1AddValidator(address validator) external;
        function k1AddValidator(address validator) external;
        function r1RemoveValidator(address validator) external;
        function k1RemoveValidator(address validator) external;

        function addModule(bytes moduleAndData) external;
        function removeModule(address module) external;

        function addHook(bytes hookAndData, bool isValidation) external;
        function removeHook(address hook, bool isValidation, bytes deinitData) external;
        function setHookData(bytes32 key, bytes data) external;

        function upgradeTo(address newImplementation) external;

        function executeFromModule(address to, uint256 value, bytes data) external;

        function isValidSignature(bytes32 hash, bytes signature) external returns (bytes4 magicValue);
    }

    /// Stateless multicall helper.
    interface IBatchCaller {
        struct Call {
            address target;
            bool allowFailure;
            uint256 value;
            bytes callData;
        }

        struct CallResult {
            bool success;
            bytes returnData;
        }

        function batchCall(Call[] calls) external returns (CallResult[] results);
    }

    /// Paymaster input encodings.
    interface IPaymasterFlow {
        function general(bytes input) external;
        function approvalBased(address token, uint256 minAllowance, bytes innerInput) external;
    }
}

/// EIP-1271 success value, `bytes4(keccak256("isValidSignature(bytes32,bytes)"))`.
pub const EIP1271_MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];
