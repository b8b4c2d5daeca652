use concordium_std::*;

use crate::errors::{ContractResult, CustomContractError};
use crate::events::{CustomEvent, PurchaseEvent, RecoverEvent, StartEvent};
use crate::external::InitParams;
use crate::nft;
use crate::state::{AuctionPhase, State};
use crate::MIN_DURATION;

/// Init function that creates a new auction for a single lot.
///
/// Rejects if:
/// - The decay window is shorter than a minute.
/// - The starting price is zero.
/// - The reserve price is not strictly below the starting price.
#[init(contract = "DutchNftAuction", parameter = "InitParams")]
fn auction_init<S: HasStateApi>(
    ctx: &impl HasInitContext,
    _state_builder: &mut StateBuilder<S>,
) -> InitResult<State> {
    let params: InitParams = ctx.parameter_cursor().get()?;

    ensure!(
        params.duration >= MIN_DURATION,
        CustomContractError::InvalidDuration.into()
    );
    ensure!(
        params.starting_price > Amount::zero(),
        CustomContractError::InvalidStartingPrice.into()
    );
    ensure!(
        params.reserve_price < params.starting_price,
        CustomContractError::InvalidReservePrice.into()
    );

    Ok(State::new(params, ctx.init_origin()))
}

/// Open the sale. From this point the price decays from `starting_price`
/// towards `reserve_price` until the lot is bought or the window expires.
///
/// Rejects if:
/// - Sender is not the seller.
/// - The auction was already started, sold or terminated.
/// - The registry does not list this contract as an operator of the seller.
#[receive(contract = "DutchNftAuction", name = "start", mutable, enable_logger)]
fn auction_start<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    host.state().require_seller(ctx.sender())?;

    match host.state().phase {
        AuctionPhase::Pending => (),
        AuctionPhase::Live(_) => bail!(CustomContractError::AlreadyStarted.into()),
        AuctionPhase::Sold(_) | AuctionPhase::Terminated => {
            bail!(CustomContractError::AlreadyTerminated.into())
        }
    }

    // The sale only opens once the registry confirms this contract may move
    // the lot on the seller's behalf.
    let registry = host.state().registry;
    let seller = host.state().seller;
    let authorized = nft::operator_of(
        host,
        &registry,
        Address::Account(seller),
        Address::Contract(ctx.self_address()),
    )?;
    ensure!(authorized, CustomContractError::NotApproved.into());

    let opened_at = ctx.metadata().slot_time();
    host.state_mut().phase = AuctionPhase::Live(opened_at);

    logger.log(&CustomEvent::Start(StartEvent {
        token_id: host.state().token_id.clone(),
        opened_at,
    }))?;

    Ok(())
}

/// Current price of the lot at this block's slot time.
#[receive(contract = "DutchNftAuction", name = "getPrice", return_value = "Amount")]
fn auction_get_price<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State, StateApiType = S>,
) -> ContractResult<Amount> {
    host.state().price_at(ctx.metadata().slot_time())
}

/// Time since the sale opened. Only answers while the auction is live.
#[receive(
    contract = "DutchNftAuction",
    name = "auctionAge",
    return_value = "Duration"
)]
fn auction_age<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State, StateApiType = S>,
) -> ContractResult<Duration> {
    host.state().elapsed(ctx.metadata().slot_time())
}

/// Buy the lot at the current price.
///
/// The payment is checked against the price before any state change or
/// outgoing call, so an underpaying buy leaves the auction untouched. A
/// successful purchase settles as one invocation: the auction halts, the
/// registry moves the lot from the seller to the buyer and any overpayment
/// returns to the buyer. A rejection from the registry fails the whole
/// purchase and the chain rolls the halt back together with the payment.
///
/// The sale price stays on the contract balance for `recoverFunds`.
#[receive(
    contract = "DutchNftAuction",
    name = "buy",
    mutable,
    payable,
    enable_logger
)]
fn auction_buy<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State, StateApiType = S>,
    amount: Amount,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let buyer = match ctx.sender() {
        Address::Account(account) => account,
        Address::Contract(_) => bail!(CustomContractError::OnlyAccountAddress.into()),
    };

    let price = host.state().price_at(ctx.metadata().slot_time())?;
    ensure!(
        amount >= price,
        CustomContractError::InsufficientPayment.into()
    );

    // Halt before calling out; a reentrant buy must already see the lot as
    // sold.
    host.state_mut().phase = AuctionPhase::Sold(buyer);

    let state = host.state();
    let (registry, token_id, seller) = (state.registry, state.token_id.clone(), state.seller);

    nft::transfer(host, &registry, token_id.clone(), seller, buyer)?;

    let refund = amount - price;
    if refund > Amount::zero() {
        host.invoke_transfer(&buyer, refund)?;
    }

    logger.log(&CustomEvent::Purchase(PurchaseEvent {
        token_id,
        buyer,
        price,
        refund,
    }))?;

    Ok(())
}

/// Shut the sale down for good. Allowed from any phase in which the lot has
/// not been sold, including a live auction past its decay window.
///
/// Rejects if:
/// - Sender is not the seller.
/// - The auction was already sold or terminated.
#[receive(
    contract = "DutchNftAuction",
    name = "terminate",
    mutable,
    enable_logger
)]
fn auction_terminate<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    host.state().require_seller(ctx.sender())?;
    ensure!(
        !host.state().is_halted(),
        CustomContractError::AlreadyTerminated.into()
    );

    host.state_mut().phase = AuctionPhase::Terminated;

    logger.log(&CustomEvent::Terminate(host.state().token_id.clone()))?;

    Ok(())
}

/// Send the contract's held balance to the given account. Available to the
/// seller once the auction has halted; the proceeds of a sale stay on the
/// contract until collected here.
///
/// Rejects if:
/// - It fails to parse the parameter.
/// - Sender is not the seller.
/// - The auction has not been sold or terminated yet.
#[receive(
    contract = "DutchNftAuction",
    name = "recoverFunds",
    parameter = "AccountAddress",
    mutable,
    enable_logger
)]
fn auction_recover_funds<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let beneficiary: AccountAddress = ctx.parameter_cursor().get()?;

    host.state().require_seller(ctx.sender())?;
    ensure!(
        host.state().is_halted(),
        CustomContractError::AuctionStillActive.into()
    );

    let balance = host.self_balance();
    if balance > Amount::zero() {
        host.invoke_transfer(&beneficiary, balance)?;
    }

    logger.log(&CustomEvent::Recover(RecoverEvent {
        beneficiary,
        amount: balance,
    }))?;

    Ok(())
}

/// View the full auction state.
#[receive(contract = "DutchNftAuction", name = "view", return_value = "State")]
fn auction_view<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    host: &impl HasHost<State, StateApiType = S>,
) -> ContractResult<State> {
    Ok(host.state().clone())
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use concordium_std::fmt::Debug;
    use crate::errors::ContractError;
    use crate::external::ContractTokenId;
    use concordium_cis2::{
        OperatorOfQueryParams, OperatorOfQueryResponse, TokenAmountU8, TokenIdVec, TransferParams,
    };
    use test_infrastructure::*;

    const SELLER: AccountAddress = AccountAddress([1u8; 32]);
    const BUYER: AccountAddress = AccountAddress([2u8; 32]);
    const INTRUDER: AccountAddress = AccountAddress([3u8; 32]);
    const REGISTRY: ContractAddress = ContractAddress {
        index: 13,
        subindex: 0,
    };
    const SELF_ADDRESS: ContractAddress = ContractAddress {
        index: 29,
        subindex: 0,
    };

    /// Slot time at which the sale opens in these tests, in milliseconds.
    const OPEN: u64 = 10_000;

    fn token_1() -> ContractTokenId {
        TokenIdVec(vec![1, 23])
    }

    fn params(starting: u64, reserve: u64, duration_seconds: u64) -> InitParams {
        InitParams {
            registry: REGISTRY,
            token_id: token_1(),
            starting_price: Amount::from_micro_ccd(starting),
            reserve_price: Amount::from_micro_ccd(reserve),
            duration: Duration::from_seconds(duration_seconds),
        }
    }

    fn default_params() -> InitParams {
        params(5000, 3000, 500)
    }

    fn init_with(parameter: &InitParams) -> Result<State, Reject> {
        let parameter_bytes = to_bytes(parameter);
        let mut ctx = TestInitContext::empty();
        ctx.set_parameter(&parameter_bytes).set_init_origin(SELLER);
        let mut state_builder = TestStateBuilder::new();
        auction_init(&ctx, &mut state_builder)
    }

    fn pending_state(parameter: &InitParams) -> State {
        init_with(parameter).expect("Initialization should succeed")
    }

    fn host_with(state: State) -> TestHost<State> {
        TestHost::new(state, TestStateBuilder::new())
    }

    fn live_host(parameter: &InitParams) -> TestHost<State> {
        let mut state = pending_state(parameter);
        state.phase = AuctionPhase::Live(Timestamp::from_timestamp_millis(OPEN));
        host_with(state)
    }

    fn receive_ctx<'a>(sender: AccountAddress, slot_time_millis: u64) -> TestReceiveContext<'a> {
        let mut ctx = TestReceiveContext::empty();
        ctx.set_sender(Address::Account(sender))
            .set_self_address(SELF_ADDRESS)
            .set_metadata_slot_time(Timestamp::from_timestamp_millis(slot_time_millis));
        ctx
    }

    /// Slot time inside the decay window, `seconds` after the opening.
    fn open_plus(seconds: u64) -> u64 {
        OPEN + seconds * 1000
    }

    fn mock_operator_response(host: &mut TestHost<State>, approved: bool) {
        host.setup_mock_entrypoint(
            REGISTRY,
            OwnedEntrypointName::new_unchecked("operatorOf".into()),
            MockFn::new_v1(move |parameter, _, _, _| {
                OperatorOfQueryParams::deserial(&mut Cursor::new(parameter.as_ref()))
                    .map_err(|_| CallContractError::Trap)?;
                Ok((false, OperatorOfQueryResponse(vec![approved])))
            }),
        );
    }

    fn mock_transfer_ok(host: &mut TestHost<State>) {
        host.setup_mock_entrypoint(
            REGISTRY,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::new_v1(|parameter, _, _, _| {
                TransferParams::<TokenIdVec, TokenAmountU8>::deserial(&mut Cursor::new(
                    parameter.as_ref(),
                ))
                .map_err(|_| CallContractError::Trap)?;
                Ok((true, ()))
            }),
        );
    }

    fn mock_transfer_rejecting(host: &mut TestHost<State>) {
        host.setup_mock_entrypoint(
            REGISTRY,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::new_v1(|_, _, _, _| Err::<(bool, ()), _>(CallContractError::Trap)),
        );
    }

    fn expect_error<E, T>(expr: Result<T, E>, err: E, msg: &str)
    where
        E: Eq + Debug,
        T: Debug,
    {
        let actual = expr.expect_err(msg);
        claim_eq!(actual, err);
    }

    #[concordium_test]
    /// Initialization stores the configuration and leaves the auction
    /// waiting for `start`.
    fn test_init_builds_pending_auction() {
        let state = pending_state(&default_params());

        claim_eq!(state.seller, SELLER);
        claim_eq!(state.registry, REGISTRY);
        claim_eq!(state.token_id, token_1());
        claim_eq!(state.starting_price, Amount::from_micro_ccd(5000));
        claim_eq!(state.reserve_price, Amount::from_micro_ccd(3000));
        claim_eq!(state.duration, Duration::from_seconds(500));
        claim_eq!(state.phase, AuctionPhase::Pending);
    }

    #[concordium_test]
    fn test_init_rejects_short_duration() {
        for seconds in [0u64, 1, 59] {
            let mut parameter = default_params();
            parameter.duration = Duration::from_seconds(seconds);
            expect_error(
                init_with(&parameter),
                CustomContractError::InvalidDuration.into(),
                "Durations under a minute should be rejected",
            );
        }

        let mut parameter = default_params();
        parameter.duration = Duration::from_seconds(60);
        claim!(
            init_with(&parameter).is_ok(),
            "One minute is the smallest valid duration"
        );
    }

    #[concordium_test]
    fn test_init_rejects_zero_starting_price() {
        expect_error(
            init_with(&params(0, 0, 500)),
            CustomContractError::InvalidStartingPrice.into(),
            "A starting price of zero should be rejected",
        );
    }

    #[concordium_test]
    fn test_init_rejects_reserve_at_or_above_starting_price() {
        expect_error(
            init_with(&params(5000, 5000, 500)),
            CustomContractError::InvalidReservePrice.into(),
            "A reserve equal to the starting price should be rejected",
        );
        expect_error(
            init_with(&params(10, 20, 500)),
            CustomContractError::InvalidReservePrice.into(),
            "A reserve above the starting price should be rejected",
        );
    }

    #[concordium_test]
    /// Starting an approved auction opens the decay window at the current
    /// slot time and logs the opening.
    fn test_start_opens_the_sale() {
        let mut host = host_with(pending_state(&default_params()));
        mock_operator_response(&mut host, true);
        let ctx = receive_ctx(SELLER, OPEN);
        let mut logger = TestLogger::init();

        let result = auction_start(&ctx, &mut host, &mut logger);

        claim_eq!(result, Ok(()));
        claim_eq!(
            host.state().phase,
            AuctionPhase::Live(Timestamp::from_timestamp_millis(OPEN))
        );
        claim_eq!(
            logger.logs[0],
            to_bytes(&CustomEvent::Start(StartEvent {
                token_id: token_1(),
                opened_at: Timestamp::from_timestamp_millis(OPEN),
            }))
        );
    }

    #[concordium_test]
    fn test_start_requires_seller() {
        let mut host = host_with(pending_state(&default_params()));
        let ctx = receive_ctx(INTRUDER, OPEN);
        let mut logger = TestLogger::init();

        // No registry mock: the sender check must fire before any query.
        expect_error(
            auction_start(&ctx, &mut host, &mut logger),
            ContractError::Unauthorized,
            "Only the seller can start the auction",
        );
        claim_eq!(host.state().phase, AuctionPhase::Pending);
    }

    #[concordium_test]
    fn test_start_requires_registry_approval() {
        let mut host = host_with(pending_state(&default_params()));
        mock_operator_response(&mut host, false);
        let ctx = receive_ctx(SELLER, OPEN);
        let mut logger = TestLogger::init();

        expect_error(
            auction_start(&ctx, &mut host, &mut logger),
            CustomContractError::NotApproved.into(),
            "An unapproved auction must not start",
        );
        claim_eq!(host.state().phase, AuctionPhase::Pending);
    }

    #[concordium_test]
    fn test_start_twice_is_rejected() {
        let mut host = host_with(pending_state(&default_params()));
        mock_operator_response(&mut host, true);
        let mut logger = TestLogger::init();

        let ctx = receive_ctx(SELLER, OPEN);
        auction_start(&ctx, &mut host, &mut logger).expect("First start should succeed");

        expect_error(
            auction_start(&ctx, &mut host, &mut logger),
            CustomContractError::AlreadyStarted.into(),
            "Starting a running auction should fail",
        );
    }

    #[concordium_test]
    fn test_start_after_terminate_is_rejected() {
        let mut host = host_with(pending_state(&default_params()));
        mock_operator_response(&mut host, true);
        let ctx = receive_ctx(SELLER, OPEN);
        let mut logger = TestLogger::init();

        auction_terminate(&ctx, &mut host, &mut logger).expect("Terminate should succeed");

        expect_error(
            auction_start(&ctx, &mut host, &mut logger),
            CustomContractError::AlreadyTerminated.into(),
            "A terminated auction can never start",
        );
    }

    #[concordium_test]
    fn test_price_requires_started_auction() {
        let host = host_with(pending_state(&default_params()));
        let ctx = receive_ctx(BUYER, OPEN);

        expect_error(
            auction_get_price(&ctx, &host),
            CustomContractError::NotStarted.into(),
            "Price is undefined before the sale opens",
        );
    }

    #[concordium_test]
    fn test_price_decays_over_the_window() {
        let host = live_host(&default_params());

        let quote = |slot_time| {
            auction_get_price(&receive_ctx(BUYER, slot_time), &host)
                .expect("Price should be quotable inside the window")
        };

        claim_eq!(quote(OPEN), Amount::from_micro_ccd(5000));
        claim_eq!(quote(open_plus(250)), Amount::from_micro_ccd(4000));
        claim_eq!(quote(open_plus(499)), Amount::from_micro_ccd(3004));
    }

    #[concordium_test]
    fn test_price_rejected_once_window_passes() {
        let host = live_host(&default_params());

        expect_error(
            auction_get_price(&receive_ctx(BUYER, open_plus(500)), &host),
            CustomContractError::AuctionEnded.into(),
            "Price is undefined from the end of the window",
        );
        expect_error(
            auction_get_price(&receive_ctx(BUYER, open_plus(600)), &host),
            CustomContractError::AuctionEnded.into(),
            "Price is undefined after the end of the window",
        );
    }

    #[concordium_test]
    fn test_age_is_gated_like_the_price() {
        let pending = host_with(pending_state(&default_params()));
        expect_error(
            auction_age(&receive_ctx(BUYER, OPEN), &pending),
            CustomContractError::NotStarted.into(),
            "Age is undefined before the sale opens",
        );

        let live = live_host(&default_params());
        claim_eq!(
            auction_age(&receive_ctx(BUYER, open_plus(20)), &live),
            Ok(Duration::from_seconds(20))
        );
        expect_error(
            auction_age(&receive_ctx(BUYER, open_plus(600)), &live),
            CustomContractError::AuctionEnded.into(),
            "Age is undefined after the end of the window",
        );
    }

    #[concordium_test]
    /// Paying the exact quoted price transfers the lot and halts the
    /// auction with no refund.
    fn test_buy_at_exact_price() {
        let mut host = live_host(&params(1000, 0, 100));
        mock_transfer_ok(&mut host);
        let payment = Amount::from_micro_ccd(500);
        host.set_self_balance(payment);
        let ctx = receive_ctx(BUYER, open_plus(50));
        let mut logger = TestLogger::init();

        let result = auction_buy(&ctx, &mut host, payment, &mut logger);

        claim_eq!(result, Ok(()));
        claim_eq!(host.state().phase, AuctionPhase::Sold(BUYER));
        // No refund went out: the full payment stays as proceeds.
        claim_eq!(host.self_balance(), payment);
        claim_eq!(
            logger.logs[0],
            to_bytes(&CustomEvent::Purchase(PurchaseEvent {
                token_id: token_1(),
                buyer: BUYER,
                price: Amount::from_micro_ccd(500),
                refund: Amount::zero(),
            }))
        );
    }

    #[concordium_test]
    /// Overpaying settles at the quoted price and immediately returns the
    /// difference to the buyer.
    fn test_buy_refunds_overpayment() {
        let mut host = live_host(&params(1000, 0, 100));
        mock_transfer_ok(&mut host);
        host.set_self_balance(Amount::from_micro_ccd(700));
        let ctx = receive_ctx(BUYER, open_plus(50));
        let mut logger = TestLogger::init();

        let result = auction_buy(&ctx, &mut host, Amount::from_micro_ccd(700), &mut logger);

        claim_eq!(result, Ok(()));
        claim_eq!(host.state().phase, AuctionPhase::Sold(BUYER));
        claim!(
            host.transfer_occurred(&BUYER, Amount::from_micro_ccd(200)),
            "The overpayment should return to the buyer"
        );
        claim_eq!(host.self_balance(), Amount::from_micro_ccd(500));
        claim_eq!(
            logger.logs[0],
            to_bytes(&CustomEvent::Purchase(PurchaseEvent {
                token_id: token_1(),
                buyer: BUYER,
                price: Amount::from_micro_ccd(500),
                refund: Amount::from_micro_ccd(200),
            }))
        );
    }

    #[concordium_test]
    /// An underpaying buy is rejected before the registry is ever invoked:
    /// the mock transfer would trap the call otherwise.
    fn test_buy_underpayment_is_rejected_before_any_transfer() {
        let mut host = live_host(&params(1000, 0, 100));
        mock_transfer_rejecting(&mut host);
        host.set_self_balance(Amount::from_micro_ccd(499));
        let ctx = receive_ctx(BUYER, open_plus(50));
        let mut logger = TestLogger::init();

        expect_error(
            auction_buy(&ctx, &mut host, Amount::from_micro_ccd(499), &mut logger),
            CustomContractError::InsufficientPayment.into(),
            "Underpayment should be rejected",
        );
        claim_eq!(
            host.state().phase,
            AuctionPhase::Live(Timestamp::from_timestamp_millis(OPEN))
        );
        claim_eq!(host.self_balance(), Amount::from_micro_ccd(499));
    }

    #[concordium_test]
    /// A registry that refuses the transfer fails the whole purchase, so
    /// the chain rolls the invocation back and no payment is kept.
    fn test_buy_fails_when_registry_rejects() {
        let mut host = live_host(&params(1000, 0, 100));
        mock_transfer_rejecting(&mut host);
        host.set_self_balance(Amount::from_micro_ccd(500));
        let ctx = receive_ctx(BUYER, open_plus(50));
        let mut logger = TestLogger::init();

        expect_error(
            auction_buy(&ctx, &mut host, Amount::from_micro_ccd(500), &mut logger),
            CustomContractError::TransferFailed.into(),
            "A rejected asset transfer should fail the purchase",
        );
        claim_eq!(host.self_balance(), Amount::from_micro_ccd(500));
    }

    #[concordium_test]
    fn test_buy_gated_outside_the_window() {
        let mut pending = host_with(pending_state(&default_params()));
        let mut logger = TestLogger::init();
        expect_error(
            auction_buy(
                &receive_ctx(BUYER, OPEN),
                &mut pending,
                Amount::from_micro_ccd(9999),
                &mut logger,
            ),
            CustomContractError::NotStarted.into(),
            "Buying an unstarted auction should fail",
        );

        let mut live = live_host(&default_params());
        expect_error(
            auction_buy(
                &receive_ctx(BUYER, open_plus(500)),
                &mut live,
                Amount::from_micro_ccd(9999),
                &mut logger,
            ),
            CustomContractError::AuctionEnded.into(),
            "Buying an expired auction should fail",
        );
    }

    #[concordium_test]
    fn test_second_buy_is_rejected() {
        let mut host = live_host(&params(1000, 0, 100));
        mock_transfer_ok(&mut host);
        host.set_self_balance(Amount::from_micro_ccd(500));
        let ctx = receive_ctx(BUYER, open_plus(50));
        let mut logger = TestLogger::init();

        auction_buy(&ctx, &mut host, Amount::from_micro_ccd(500), &mut logger)
            .expect("First purchase should succeed");

        expect_error(
            auction_buy(
                &receive_ctx(INTRUDER, open_plus(51)),
                &mut host,
                Amount::from_micro_ccd(500),
                &mut logger,
            ),
            CustomContractError::AlreadyTerminated.into(),
            "The lot can only be sold once",
        );
    }

    #[concordium_test]
    fn test_terminate_requires_seller() {
        let mut host = live_host(&default_params());
        let mut logger = TestLogger::init();

        expect_error(
            auction_terminate(&receive_ctx(INTRUDER, open_plus(10)), &mut host, &mut logger),
            ContractError::Unauthorized,
            "Only the seller can terminate",
        );
        claim_eq!(
            host.state().phase,
            AuctionPhase::Live(Timestamp::from_timestamp_millis(OPEN))
        );
    }

    #[concordium_test]
    /// The seller can shut the sale down before the start, while live and
    /// after expiry, but never twice.
    fn test_terminate_from_every_non_terminal_phase() {
        let mut logger = TestLogger::init();

        let mut pending = host_with(pending_state(&default_params()));
        let result = auction_terminate(&receive_ctx(SELLER, OPEN), &mut pending, &mut logger);
        claim_eq!(result, Ok(()));
        claim_eq!(pending.state().phase, AuctionPhase::Terminated);

        let mut live = live_host(&default_params());
        let result = auction_terminate(&receive_ctx(SELLER, open_plus(10)), &mut live, &mut logger);
        claim_eq!(result, Ok(()));

        let mut expired = live_host(&default_params());
        let result =
            auction_terminate(&receive_ctx(SELLER, open_plus(600)), &mut expired, &mut logger);
        claim_eq!(result, Ok(()));

        expect_error(
            auction_terminate(&receive_ctx(SELLER, open_plus(601)), &mut expired, &mut logger),
            CustomContractError::AlreadyTerminated.into(),
            "Terminating twice should fail",
        );
    }

    #[concordium_test]
    fn test_terminate_after_sale_is_rejected() {
        let mut host = live_host(&params(1000, 0, 100));
        mock_transfer_ok(&mut host);
        host.set_self_balance(Amount::from_micro_ccd(500));
        let mut logger = TestLogger::init();

        auction_buy(
            &receive_ctx(BUYER, open_plus(50)),
            &mut host,
            Amount::from_micro_ccd(500),
            &mut logger,
        )
        .expect("Purchase should succeed");

        expect_error(
            auction_terminate(&receive_ctx(SELLER, open_plus(51)), &mut host, &mut logger),
            CustomContractError::AlreadyTerminated.into(),
            "A sold auction cannot be terminated",
        );
    }

    #[concordium_test]
    fn test_terminated_auction_rejects_queries() {
        let mut host = host_with(pending_state(&default_params()));
        let mut logger = TestLogger::init();
        auction_terminate(&receive_ctx(SELLER, OPEN), &mut host, &mut logger)
            .expect("Terminate should succeed");

        expect_error(
            auction_get_price(&receive_ctx(BUYER, open_plus(10)), &host),
            CustomContractError::AlreadyTerminated.into(),
            "Price is undefined after termination",
        );
    }

    #[concordium_test]
    /// After a sale the seller collects the proceeds held on the contract.
    fn test_recover_funds_pays_out_held_balance() {
        let mut host = live_host(&params(1000, 0, 100));
        mock_transfer_ok(&mut host);
        host.set_self_balance(Amount::from_micro_ccd(500));
        let mut logger = TestLogger::init();

        auction_buy(
            &receive_ctx(BUYER, open_plus(50)),
            &mut host,
            Amount::from_micro_ccd(500),
            &mut logger,
        )
        .expect("Purchase should succeed");

        let parameter_bytes = to_bytes(&SELLER);
        let mut ctx = receive_ctx(SELLER, open_plus(60));
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();

        let result = auction_recover_funds(&ctx, &mut host, &mut logger);

        claim_eq!(result, Ok(()));
        claim!(
            host.transfer_occurred(&SELLER, Amount::from_micro_ccd(500)),
            "The proceeds should reach the seller"
        );
        claim_eq!(host.self_balance(), Amount::zero());
        claim_eq!(
            logger.logs[0],
            to_bytes(&CustomEvent::Recover(RecoverEvent {
                beneficiary: SELLER,
                amount: Amount::from_micro_ccd(500),
            }))
        );
    }

    #[concordium_test]
    fn test_recover_funds_only_after_halt() {
        let parameter_bytes = to_bytes(&SELLER);
        let mut logger = TestLogger::init();

        let mut pending = host_with(pending_state(&default_params()));
        let mut ctx = receive_ctx(SELLER, OPEN);
        ctx.set_parameter(&parameter_bytes);
        expect_error(
            auction_recover_funds(&ctx, &mut pending, &mut logger),
            CustomContractError::AuctionStillActive.into(),
            "Recovery before the auction halts should fail",
        );

        let mut live = live_host(&default_params());
        let mut ctx = receive_ctx(SELLER, open_plus(10));
        ctx.set_parameter(&parameter_bytes);
        expect_error(
            auction_recover_funds(&ctx, &mut live, &mut logger),
            CustomContractError::AuctionStillActive.into(),
            "Recovery from a live auction should fail",
        );
    }

    #[concordium_test]
    fn test_recover_funds_requires_seller() {
        let mut host = host_with(pending_state(&default_params()));
        let mut logger = TestLogger::init();
        auction_terminate(&receive_ctx(SELLER, OPEN), &mut host, &mut logger)
            .expect("Terminate should succeed");

        let parameter_bytes = to_bytes(&INTRUDER);
        let mut ctx = receive_ctx(INTRUDER, open_plus(10));
        ctx.set_parameter(&parameter_bytes);
        expect_error(
            auction_recover_funds(&ctx, &mut host, &mut logger),
            ContractError::Unauthorized,
            "Only the seller can recover funds",
        );
    }

    #[concordium_test]
    fn test_view_returns_the_state() {
        let host = live_host(&default_params());
        let ctx = receive_ctx(BUYER, OPEN);

        let viewed = auction_view(&ctx, &host).expect("View should succeed");

        claim_eq!(&viewed, host.state());
    }

    #[concordium_test]
    /// A whole sale, end to end:
    /// 0. The auction is configured but price queries and purchases are
    ///    rejected until it starts.
    /// 1. Starting fails for an intruder, and for the seller while the
    ///    registry has not approved the contract.
    /// 2. Once approved, the seller opens the sale.
    /// 3. An underpaying buyer bounces off, then the lot sells at the
    ///    quoted price with the surplus refunded.
    /// 4. Every later operation finds the auction terminated and the
    ///    seller collects the proceeds.
    fn test_whole_sale_walkthrough() {
        let mut host = host_with(pending_state(&params(1000, 0, 100)));
        let mut logger = TestLogger::init();

        expect_error(
            auction_get_price(&receive_ctx(BUYER, OPEN - 5000), &host),
            CustomContractError::NotStarted.into(),
            "Price query before the sale opens should fail",
        );
        expect_error(
            auction_buy(
                &receive_ctx(BUYER, OPEN - 5000),
                &mut host,
                Amount::from_micro_ccd(9999),
                &mut logger,
            ),
            CustomContractError::NotStarted.into(),
            "Buying before the sale opens should fail",
        );

        expect_error(
            auction_start(&receive_ctx(INTRUDER, OPEN), &mut host, &mut logger),
            ContractError::Unauthorized,
            "An intruder must not start the sale",
        );
        mock_operator_response(&mut host, false);
        expect_error(
            auction_start(&receive_ctx(SELLER, OPEN), &mut host, &mut logger),
            CustomContractError::NotApproved.into(),
            "The sale must not start without approval",
        );

        mock_operator_response(&mut host, true);
        auction_start(&receive_ctx(SELLER, OPEN), &mut host, &mut logger)
            .expect("Start should succeed once approved");

        expect_error(
            auction_buy(
                &receive_ctx(BUYER, open_plus(50)),
                &mut host,
                Amount::from_micro_ccd(1),
                &mut logger,
            ),
            CustomContractError::InsufficientPayment.into(),
            "A token payment should bounce off",
        );

        let price = auction_get_price(&receive_ctx(BUYER, open_plus(50)), &host)
            .expect("Price should be quotable");
        claim_eq!(price, Amount::from_micro_ccd(500));

        mock_transfer_ok(&mut host);
        host.set_self_balance(Amount::from_micro_ccd(700));
        auction_buy(
            &receive_ctx(BUYER, open_plus(50)),
            &mut host,
            Amount::from_micro_ccd(700),
            &mut logger,
        )
        .expect("Purchase should succeed");
        claim!(
            host.transfer_occurred(&BUYER, Amount::from_micro_ccd(200)),
            "The surplus should return to the buyer"
        );
        claim_eq!(host.state().phase, AuctionPhase::Sold(BUYER));

        expect_error(
            auction_buy(
                &receive_ctx(INTRUDER, open_plus(51)),
                &mut host,
                Amount::from_micro_ccd(500),
                &mut logger,
            ),
            CustomContractError::AlreadyTerminated.into(),
            "The lot can only be sold once",
        );
        expect_error(
            auction_terminate(&receive_ctx(SELLER, open_plus(51)), &mut host, &mut logger),
            CustomContractError::AlreadyTerminated.into(),
            "A sold auction cannot be terminated",
        );

        let parameter_bytes = to_bytes(&SELLER);
        let mut ctx = receive_ctx(SELLER, open_plus(60));
        ctx.set_parameter(&parameter_bytes);
        auction_recover_funds(&ctx, &mut host, &mut logger)
            .expect("The seller should collect the proceeds");
        claim!(
            host.transfer_occurred(&SELLER, Amount::from_micro_ccd(500)),
            "The proceeds should reach the seller"
        );
    }
}
