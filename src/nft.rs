//! Client helpers for the CIS-2 registry contract that owns the lot.

use concordium_cis2::{
    AdditionalData, OperatorOfQuery, OperatorOfQueryParams, OperatorOfQueryResponse, Receiver,
    TokenAmountU8, Transfer, TransferParams,
};
use concordium_std::*;

use crate::errors::{ContractError, ContractResult, CustomContractError};
use crate::external::ContractTokenId;

/// Ask the registry whether `address` may move tokens on behalf of `owner`.
pub fn operator_of<T>(
    host: &impl HasHost<T>,
    registry: &ContractAddress,
    owner: Address,
    address: Address,
) -> ContractResult<bool> {
    let mut response = host
        .invoke_contract_read_only(
            registry,
            &OperatorOfQueryParams {
                queries: vec![OperatorOfQuery { owner, address }],
            },
            EntrypointName::new_unchecked("operatorOf"),
            Amount::zero(),
        )
        .map_err(handle_call_error)?
        .ok_or(CustomContractError::Incompatible)?;

    let OperatorOfQueryResponse(results) = OperatorOfQueryResponse::deserial(&mut response)
        .map_err(|_| CustomContractError::Incompatible)?;

    results
        .first()
        .copied()
        .ok_or_else(|| CustomContractError::Incompatible.into())
}

/// Instruct the registry to move the token from `from` to `to`. Any
/// rejection from the registry fails the whole purchase.
pub fn transfer<T>(
    host: &mut impl HasHost<T>,
    registry: &ContractAddress,
    token_id: ContractTokenId,
    from: AccountAddress,
    to: AccountAddress,
) -> ContractResult<()> {
    host.invoke_contract(
        registry,
        &TransferParams(vec![Transfer {
            token_id,
            amount: TokenAmountU8(1),
            from: Address::Account(from),
            to: Receiver::Account(to),
            data: AdditionalData::empty(),
        }]),
        EntrypointName::new_unchecked("transfer"),
        Amount::zero(),
    )
    .map_err(|_| CustomContractError::TransferFailed)?;

    Ok(())
}

fn handle_call_error<R>(error: CallContractError<R>) -> ContractError {
    match error {
        CallContractError::MissingEntrypoint | CallContractError::MessageFailed => {
            CustomContractError::Incompatible.into()
        }
        CallContractError::LogicReject { .. } => CustomContractError::InvokeContractError.into(),
        e => e.into(),
    }
}

#[concordium_cfg_test]
mod tests {
    use concordium_cis2::TokenIdVec;
    use concordium_std::test_infrastructure::*;

    use super::*;

    const REGISTRY: ContractAddress = ContractAddress {
        index: 13,
        subindex: 0,
    };
    const SELF_ADDRESS: ContractAddress = ContractAddress {
        index: 29,
        subindex: 0,
    };

    const SELLER: AccountAddress = AccountAddress([1; 32]);
    const BUYER: AccountAddress = AccountAddress([2; 32]);

    fn empty_host() -> TestHost<()> {
        TestHost::new((), TestStateBuilder::new())
    }

    #[concordium_test]
    fn test_operator_of_decodes_registry_answer() {
        for &approved in &[true, false] {
            let mut host = empty_host();
            host.setup_mock_entrypoint(
                REGISTRY,
                OwnedEntrypointName::new_unchecked("operatorOf".into()),
                MockFn::new_v1(move |parameter, _, _, _| {
                    let query =
                        OperatorOfQueryParams::deserial(&mut Cursor::new(parameter.as_ref()))
                            .map_err(|_| CallContractError::Trap)?;
                    let ok = query.queries.len() == 1
                        && query.queries[0].owner == Address::Account(SELLER)
                        && query.queries[0].address == Address::Contract(SELF_ADDRESS);
                    if !ok {
                        return Err(CallContractError::Trap);
                    }
                    Ok((false, OperatorOfQueryResponse(vec![approved])))
                }),
            );

            let response = operator_of(
                &host,
                &REGISTRY,
                Address::Account(SELLER),
                Address::Contract(SELF_ADDRESS),
            );

            claim_eq!(response, Ok(approved));
        }
    }

    #[concordium_test]
    fn test_operator_of_rejects_empty_answer() {
        let mut host = empty_host();
        host.setup_mock_entrypoint(
            REGISTRY,
            OwnedEntrypointName::new_unchecked("operatorOf".into()),
            MockFn::new_v1(|_, _, _, _| Ok((false, OperatorOfQueryResponse(vec![])))),
        );

        let response = operator_of(
            &host,
            &REGISTRY,
            Address::Account(SELLER),
            Address::Contract(SELF_ADDRESS),
        );

        claim_eq!(response, Err(CustomContractError::Incompatible.into()));
    }

    #[concordium_test]
    fn test_transfer_sends_cis2_transfer() {
        let mut host = empty_host();
        host.setup_mock_entrypoint(
            REGISTRY,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::new_v1(|parameter, _, _, _| {
                let TransferParams(transfers) =
                    TransferParams::<TokenIdVec, TokenAmountU8>::deserial(&mut Cursor::new(
                        parameter.as_ref(),
                    ))
                    .map_err(|_| CallContractError::Trap)?;
                let ok = transfers.len() == 1
                    && transfers[0].token_id == TokenIdVec(vec![1, 23])
                    && transfers[0].amount == TokenAmountU8(1)
                    && transfers[0].from == Address::Account(SELLER)
                    && matches!(
                        &transfers[0].to,
                        Receiver::Account(account) if *account == BUYER
                    );
                if !ok {
                    return Err(CallContractError::Trap);
                }
                Ok((true, ()))
            }),
        );

        let response = transfer(&mut host, &REGISTRY, TokenIdVec(vec![1, 23]), SELLER, BUYER);

        claim_eq!(response, Ok(()));
    }

    #[concordium_test]
    fn test_transfer_maps_registry_rejection() {
        let mut host = empty_host();
        host.setup_mock_entrypoint(
            REGISTRY,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::new_v1(|_, _, _, _| Err::<(bool, ()), _>(CallContractError::Trap)),
        );

        let response = transfer(&mut host, &REGISTRY, TokenIdVec(vec![1, 23]), SELLER, BUYER);

        claim_eq!(response, Err(CustomContractError::TransferFailed.into()));
    }
}
