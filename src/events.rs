use concordium_std::*;

use crate::external::ContractTokenId;

pub const START_TAG: u8 = 0;
pub const PURCHASE_TAG: u8 = 1;
pub const TERMINATE_TAG: u8 = 2;
pub const RECOVER_TAG: u8 = 3;

/// An untagged event of the sale opening.
#[derive(Debug, Serialize, SchemaType)]
pub struct StartEvent {
    /// The token on sale.
    pub token_id: ContractTokenId,
    /// Slot time at which the price decay begins.
    pub opened_at: Timestamp,
}

/// An untagged event of a settled purchase.
#[derive(Debug, Serialize, SchemaType)]
pub struct PurchaseEvent {
    /// The token that changed hands.
    pub token_id: ContractTokenId,
    /// Account that bought the token.
    pub buyer: AccountAddress,
    /// Price at the moment of purchase.
    pub price: Amount,
    /// Overpayment returned to the buyer.
    pub refund: Amount,
}

/// An untagged event of the held balance being paid out.
#[derive(Debug, Serialize, SchemaType)]
pub struct RecoverEvent {
    /// Account the balance was sent to.
    pub beneficiary: AccountAddress,
    /// The amount paid out.
    pub amount: Amount,
}

/// Tagged Custom event to be serialized for the event log.
#[derive(Debug)]
pub enum CustomEvent {
    /// Sale opened
    Start(StartEvent),
    /// Lot bought and settled
    Purchase(PurchaseEvent),
    /// Sale shut down by the seller
    Terminate(ContractTokenId),
    /// Held balance paid out
    Recover(RecoverEvent),
}

impl Serial for CustomEvent {
    fn serial<W: Write>(&self, out: &mut W) -> Result<(), W::Err> {
        match self {
            CustomEvent::Start(event) => {
                out.write_u8(START_TAG)?;
                event.serial(out)
            }
            CustomEvent::Purchase(event) => {
                out.write_u8(PURCHASE_TAG)?;
                event.serial(out)
            }
            CustomEvent::Terminate(event) => {
                out.write_u8(TERMINATE_TAG)?;
                event.serial(out)
            }
            CustomEvent::Recover(event) => {
                out.write_u8(RECOVER_TAG)?;
                event.serial(out)
            }
        }
    }
}

impl Deserial for CustomEvent {
    fn deserial<R: Read>(source: &mut R) -> ParseResult<Self> {
        let tag = source.read_u8()?;
        match tag {
            START_TAG => StartEvent::deserial(source).map(CustomEvent::Start),
            PURCHASE_TAG => PurchaseEvent::deserial(source).map(CustomEvent::Purchase),
            TERMINATE_TAG => ContractTokenId::deserial(source).map(CustomEvent::Terminate),
            RECOVER_TAG => RecoverEvent::deserial(source).map(CustomEvent::Recover),
            _ => Err(ParseError::default()),
        }
    }
}
