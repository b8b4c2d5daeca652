use concordium_cis2::TokenIdVec;
use concordium_std::*;

/// Token identifier type used by the registry contract.
pub type ContractTokenId = TokenIdVec;

/// Type of the parameter to the `init` function.
#[derive(Debug, Serialize, SchemaType)]
pub struct InitParams {
    /// CIS-2 contract that tracks ownership of the lot.
    pub registry: ContractAddress,
    /// The token put up for sale.
    pub token_id: ContractTokenId,
    /// Price at the moment the sale opens. Must be nonzero.
    pub starting_price: Amount,
    /// Floor the price never decays below. May be zero.
    pub reserve_price: Amount,
    /// Window over which the price decays from starting to reserve.
    pub duration: Duration,
}
