//! A reverse (Dutch) auction for a single CIS-2 token: the price opens at
//! `starting_price` and falls linearly towards `reserve_price` over a fixed
//! window, until either a buyer pays the current price or the seller shuts
//! the sale down. Ownership of the token stays with an external CIS-2
//! registry contract; this contract only queries its own approval and
//! instructs the transfer on purchase.
#![cfg_attr(not(feature = "std"), no_std)]

use concordium_std::Duration;

/// Shortest decay window an auction can be configured with.
const MIN_DURATION: Duration = Duration::from_millis(60_000);

mod contract;
mod errors;
mod events;
mod external;
mod nft;
mod state;
