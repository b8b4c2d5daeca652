use concordium_std::*;

use crate::errors::{ContractError, ContractResult, CustomContractError};
use crate::external::{ContractTokenId, InitParams};

/// The phase the sale is in. Only ever moves forward.
#[derive(Debug, Serialize, SchemaType, Clone, Copy, PartialEq, Eq)]
pub enum AuctionPhase {
    /// Configured, waiting for the seller to open the sale.
    Pending,
    /// Open since the contained slot time, price decaying.
    Live(Timestamp),
    /// Sold to the contained account. Absorbing.
    Sold(AccountAddress),
    /// Shut down by the seller. Absorbing.
    Terminated,
}

/// The contract state.
#[derive(Debug, Serialize, SchemaType, Clone, PartialEq, Eq)]
pub struct State {
    /// Account that instantiated the contract. It receives the sale
    /// proceeds and is the only account allowed to start, terminate and
    /// recover funds.
    pub seller: AccountAddress,
    /// CIS-2 contract that tracks ownership of the lot.
    pub registry: ContractAddress,
    /// The token on sale within the registry contract.
    pub token_id: ContractTokenId,
    /// Price at the moment the sale opens.
    pub starting_price: Amount,
    /// Floor the price never decays below.
    pub reserve_price: Amount,
    /// Window over which the price decays from starting to reserve.
    pub duration: Duration,
    /// Current lifecycle phase.
    pub phase: AuctionPhase,
}

impl State {
    pub fn new(params: InitParams, seller: AccountAddress) -> Self {
        Self {
            seller,
            registry: params.registry,
            token_id: params.token_id,
            starting_price: params.starting_price,
            reserve_price: params.reserve_price,
            duration: params.duration,
            phase: AuctionPhase::Pending,
        }
    }

    /// Guard for seller-gated entry points.
    pub fn require_seller(&self, sender: Address) -> ContractResult<()> {
        ensure!(
            sender.matches_account(&self.seller),
            ContractError::Unauthorized
        );
        Ok(())
    }

    /// Whether an absorbing phase has been reached.
    pub fn is_halted(&self) -> bool {
        matches!(self.phase, AuctionPhase::Sold(_) | AuctionPhase::Terminated)
    }

    /// Time passed since the sale opened. Rejects unless the auction is
    /// currently live: the decay window is half-open, a slot time of
    /// exactly `opened_at + duration` already counts as ended.
    pub fn elapsed(&self, now: Timestamp) -> ContractResult<Duration> {
        let opened_at = match self.phase {
            AuctionPhase::Pending => bail!(CustomContractError::NotStarted.into()),
            AuctionPhase::Live(opened_at) => opened_at,
            AuctionPhase::Sold(_) | AuctionPhase::Terminated => {
                bail!(CustomContractError::AlreadyTerminated.into())
            }
        };
        // Slot time is monotone; queries in the opening block see
        // `now == opened_at`.
        let elapsed = now
            .duration_since(opened_at)
            .unwrap_or_else(|| Duration::from_millis(0));
        ensure!(
            elapsed < self.duration,
            CustomContractError::AuctionEnded.into()
        );
        Ok(elapsed)
    }

    /// Current price of the lot.
    ///
    /// Decays linearly from `starting_price` at the opening slot time down
    /// towards `reserve_price` at the end of the window. The price drop is
    /// truncated by the integer division, so the quoted price rounds
    /// towards the seller and stays inside
    /// `[reserve_price, starting_price]` for the whole window.
    pub fn price_at(&self, now: Timestamp) -> ContractResult<Amount> {
        let elapsed = self.elapsed(now)?;
        // Widened to u128: the drop numerator overflows u64 for large
        // prices combined with long windows.
        let span = (self.starting_price.micro_ccd - self.reserve_price.micro_ccd) as u128;
        let drop = span * elapsed.millis() as u128 / self.duration.millis() as u128;
        Ok(Amount::from_micro_ccd(
            self.starting_price.micro_ccd - drop as u64,
        ))
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use concordium_cis2::TokenIdVec;

    const SELLER: AccountAddress = AccountAddress([7u8; 32]);
    const REGISTRY: ContractAddress = ContractAddress {
        index: 13,
        subindex: 0,
    };

    fn live_state(starting: u64, reserve: u64, duration_seconds: u64) -> State {
        State {
            seller: SELLER,
            registry: REGISTRY,
            token_id: TokenIdVec(vec![1, 23]),
            starting_price: Amount::from_micro_ccd(starting),
            reserve_price: Amount::from_micro_ccd(reserve),
            duration: Duration::from_seconds(duration_seconds),
            phase: AuctionPhase::Live(Timestamp::from_timestamp_millis(0)),
        }
    }

    fn at_seconds(seconds: u64) -> Timestamp {
        Timestamp::from_timestamp_millis(seconds * 1000)
    }

    #[concordium_test]
    fn test_price_at_opening_is_starting_price() {
        let state = live_state(5000, 3000, 500);
        claim_eq!(
            state.price_at(at_seconds(0)),
            Ok(Amount::from_micro_ccd(5000))
        );
    }

    #[concordium_test]
    fn test_price_halfway_through_window() {
        let state = live_state(1000, 0, 100);
        claim_eq!(
            state.price_at(at_seconds(50)),
            Ok(Amount::from_micro_ccd(500))
        );

        let state = live_state(5000, 3000, 500);
        claim_eq!(
            state.price_at(at_seconds(250)),
            Ok(Amount::from_micro_ccd(4000))
        );
    }

    #[concordium_test]
    fn test_price_is_monotone_and_bounded() {
        let state = live_state(5000, 3000, 500);
        let mut previous = state.starting_price;
        for seconds in (0..500).step_by(7) {
            let price = state
                .price_at(at_seconds(seconds))
                .expect("Price should be quotable inside the window");
            claim!(price <= previous, "Price must never rise");
            claim!(price >= state.reserve_price, "Price must respect the floor");
            claim!(
                price <= state.starting_price,
                "Price must respect the ceiling"
            );
            previous = price;
        }
    }

    #[concordium_test]
    fn test_price_truncation_rounds_towards_seller() {
        // 3 micro CCD spread over 100 seconds: the drop stays 0 until a
        // full third of the window has passed.
        let state = live_state(1000, 997, 100);
        claim_eq!(
            state.price_at(at_seconds(33)),
            Ok(Amount::from_micro_ccd(1000))
        );
        claim_eq!(
            state.price_at(at_seconds(99)),
            Ok(Amount::from_micro_ccd(998))
        );
    }

    #[concordium_test]
    fn test_price_in_final_millisecond_stays_at_or_above_reserve() {
        let state = live_state(1000, 0, 100);
        let last = Timestamp::from_timestamp_millis(100 * 1000 - 1);
        claim_eq!(state.price_at(last), Ok(Amount::from_micro_ccd(1)));
    }

    #[concordium_test]
    fn test_price_survives_maximal_prices_and_long_windows() {
        let ten_years_seconds = 10 * 365 * 24 * 60 * 60;
        let state = live_state(u64::MAX, 0, ten_years_seconds);
        let halfway = at_seconds(ten_years_seconds / 2);
        let expected = u64::MAX
            - (u64::MAX as u128 * (ten_years_seconds / 2) as u128 * 1000
                / (ten_years_seconds as u128 * 1000)) as u64;
        claim_eq!(
            state.price_at(halfway),
            Ok(Amount::from_micro_ccd(expected))
        );
    }

    #[concordium_test]
    fn test_window_end_is_exclusive() {
        let state = live_state(1000, 0, 100);
        claim_eq!(
            state.price_at(at_seconds(100)),
            Err(CustomContractError::AuctionEnded.into())
        );
        claim_eq!(
            state.price_at(at_seconds(101)),
            Err(CustomContractError::AuctionEnded.into())
        );
    }

    #[concordium_test]
    fn test_elapsed_reports_age_while_live() {
        let state = live_state(5000, 3000, 500);
        claim_eq!(
            state.elapsed(at_seconds(20)),
            Ok(Duration::from_seconds(20))
        );
    }

    #[concordium_test]
    fn test_elapsed_rejects_outside_live_phase() {
        let mut state = live_state(5000, 3000, 500);

        state.phase = AuctionPhase::Pending;
        claim_eq!(
            state.elapsed(at_seconds(20)),
            Err(CustomContractError::NotStarted.into())
        );

        state.phase = AuctionPhase::Sold(SELLER);
        claim_eq!(
            state.elapsed(at_seconds(20)),
            Err(CustomContractError::AlreadyTerminated.into())
        );

        state.phase = AuctionPhase::Terminated;
        claim_eq!(
            state.elapsed(at_seconds(20)),
            Err(CustomContractError::AlreadyTerminated.into())
        );
    }
}
