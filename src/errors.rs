use concordium_cis2::Cis2Error;
use concordium_std::*;

/// Wrapping the custom errors in a type with CIS-2 errors.
pub type ContractError = Cis2Error<CustomContractError>;

pub type ContractResult<A> = Result<A, ContractError>;

/// The custom errors the contract can produce.
#[derive(Serialize, Debug, PartialEq, Eq, Reject, SchemaType)]
pub enum CustomContractError {
    /// Failed parsing the parameter (Error code: -1).
    #[from(ParseError)]
    ParseParams,
    /// Failed logging: Log is full (Error code: -2).
    LogFull,
    /// Failed logging: Log is malformed (Error code: -3).
    LogMalformed,
    /// Decay window shorter than one minute (Error code: -4).
    InvalidDuration,
    /// Starting price of zero (Error code: -5).
    InvalidStartingPrice,
    /// Reserve price at or above the starting price (Error code: -6).
    InvalidReservePrice,
    /// Registry has not listed this contract as an operator of the seller
    /// (Error code: -7).
    NotApproved,
    /// Attempt to start an auction that is already running (Error code: -8).
    AlreadyStarted,
    /// Attempt to use an auction that has not been started (Error code: -9).
    NotStarted,
    /// The decay window has passed without a sale (Error code: -10).
    AuctionEnded,
    /// The auction was sold or terminated and accepts no further operations
    /// (Error code: -11).
    AlreadyTerminated,
    /// Payment below the current price (Error code: -12).
    InsufficientPayment,
    /// Registry refused to move the token (Error code: -13).
    TransferFailed,
    /// Funds can only be recovered once the auction has halted
    /// (Error code: -14).
    AuctionStillActive,
    /// Only account addresses can buy the lot (Error code: -15).
    OnlyAccountAddress,
    /// Registry response was missing or malformed (Error code: -16).
    Incompatible,
    /// Failed to invoke a contract (Error code: -17).
    InvokeContractError,
    /// Failed to invoke a transfer (Error code: -18).
    InvokeTransferError,
}

/// Mapping the logging errors to CustomContractError.
impl From<LogError> for CustomContractError {
    fn from(le: LogError) -> Self {
        match le {
            LogError::Full => Self::LogFull,
            LogError::Malformed => Self::LogMalformed,
        }
    }
}

/// Mapping errors related to contract invocations to CustomContractError.
impl<T> From<CallContractError<T>> for CustomContractError {
    fn from(_cce: CallContractError<T>) -> Self {
        Self::InvokeContractError
    }
}

/// Mapping errors related to transfer invocations to CustomContractError.
impl From<TransferError> for CustomContractError {
    fn from(_te: TransferError) -> Self {
        Self::InvokeTransferError
    }
}

/// Mapping CustomContractError to ContractError
impl From<CustomContractError> for ContractError {
    fn from(c: CustomContractError) -> Self {
        Cis2Error::Custom(c)
    }
}
