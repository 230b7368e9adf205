//! NFT fill pipelines.
//!
//! Two directions, one pipeline:
//!
//! - **sell**: the taker delivers an NFT into a maker `BuyNft` order and is
//!   paid the ERC-20 leg by the maker
//! - **buy**: the taker pays the ERC-20 leg and receives the NFT of a maker
//!   `SellNft` order
//!
//! Fees are paid by whichever side buys the NFT. ERC-1155 partial fills
//! prorate the ERC-20 leg and every fee by `quantity / nft_amount`; amounts the
//! taker pays round up, amounts the maker pays round down.
//!
//! For NFT fills the returned [`FillResult`] counts NFT units in
//! `taker_filled` and the ERC-20 amount in `maker_filled`.

use alloy_primitives::{Address, B256, U256};
use tracing::debug;

use super::amounts::{FillAmountCalculator, Rounding};
use super::fees::FeeAccountant;
use super::frame::Frame;
use super::native::{check_taker, require_fillable, FillResult};
use crate::error::{CapacityError, ReplayError, RestrictionError, Result};
use crate::host::{Asset, Host, PropertyValidators};
use crate::ledger::{nonce_slot, NonceRegistry, OrderRegistry, StateStore};
use crate::types::amount::u256_to_u128;
use crate::types::{
    address_bytes, FillEvent, NftKind, NftOrder, OrderStatus, Signature, TradeDirection,
};

fn kind_name(kind: NftKind) -> &'static str {
    match kind {
        NftKind::Erc721 => "ERC-721",
        NftKind::Erc1155 => "ERC-1155",
    }
}

/// Check a delivered token id against a `BuyNft` order.
///
/// With no properties the id must be the order's id. With properties, every
/// non-zero validator must accept the id.
pub fn check_token_id<V: PropertyValidators + ?Sized>(
    validators: &V,
    order: &NftOrder,
    token_id: U256,
) -> Result<()> {
    if order.nft_token_properties.is_empty() {
        if token_id != order.nft_token_id {
            return Err(RestrictionError::TokenIdMismatch {
                expected: order.nft_token_id,
                actual: token_id,
            }
            .into());
        }
        return Ok(());
    }
    for property in &order.nft_token_properties {
        if property.property_validator.is_zero() {
            continue;
        }
        if !validators.validate_property(
            property.property_validator,
            order.nft_token,
            token_id,
            &property.property_data,
        ) {
            return Err(RestrictionError::PropertyRejected {
                validator: property.property_validator,
                token_id,
            }
            .into());
        }
    }
    Ok(())
}

/// Taker sells an NFT into a maker's `BuyNft` order.
///
/// # Arguments
///
/// * `token_id` - id the taker delivers
/// * `quantity` - ERC-1155 units to sell; ignored for ERC-721
pub fn sell_nft<S, H>(
    frame: &mut Frame<'_, S, H>,
    kind: NftKind,
    order: &NftOrder,
    signature: &Signature,
    token_id: U256,
    quantity: u128,
) -> Result<FillResult>
where
    S: StateStore + ?Sized,
    H: Host + ?Sized,
{
    let order_hash = admit(frame, kind, TradeDirection::BuyNft, order, signature)?;
    check_token_id(&*frame.host, order, token_id)?;

    let taker = frame.ctx.sender;
    settle(
        frame,
        order,
        order_hash,
        Legs {
            token_id,
            quantity,
            nft_seller: taker,
            nft_buyer: order.maker,
            rounding: Rounding::Down,
        },
    )
}

/// Taker buys the NFT offered by a maker's `SellNft` order.
///
/// A native-token ERC-20 leg is paid out of the call's attached value.
pub fn buy_nft<S, H>(
    frame: &mut Frame<'_, S, H>,
    kind: NftKind,
    order: &NftOrder,
    signature: &Signature,
    quantity: u128,
) -> Result<FillResult>
where
    S: StateStore + ?Sized,
    H: Host + ?Sized,
{
    let order_hash = admit(frame, kind, TradeDirection::SellNft, order, signature)?;

    let taker = frame.ctx.sender;
    settle(
        frame,
        order,
        order_hash,
        Legs {
            token_id: order.nft_token_id,
            quantity,
            nft_seller: order.maker,
            nft_buyer: taker,
            rounding: Rounding::Up,
        },
    )
}

/// Kind, direction, status, taker restriction and maker signature.
fn admit<S, H>(
    frame: &Frame<'_, S, H>,
    kind: NftKind,
    direction: TradeDirection,
    order: &NftOrder,
    signature: &Signature,
) -> Result<B256>
where
    S: StateStore + ?Sized,
    H: Host + ?Sized,
{
    if order.kind != kind {
        return Err(RestrictionError::WrongNftKind {
            expected: kind_name(kind),
        }
        .into());
    }
    if order.direction != direction {
        return Err(RestrictionError::WrongDirection.into());
    }

    let info = frame.validator().nft_info(order);
    if info.status == OrderStatus::Cancelled {
        return Err(ReplayError::NonceCancelled {
            maker: order.maker,
            nonce: order.nonce,
        }
        .into());
    }
    require_fillable(&info)?;

    check_taker(info.order_hash, order.taker, frame.ctx.sender)?;
    frame.verifier().verify(info.order_hash, order.maker, signature)?;
    Ok(info.order_hash)
}

struct Legs {
    token_id: U256,
    quantity: u128,
    nft_seller: Address,
    nft_buyer: Address,
    rounding: Rounding,
}

fn settle<S, H>(
    frame: &mut Frame<'_, S, H>,
    order: &NftOrder,
    order_hash: B256,
    legs: Legs,
) -> Result<FillResult>
where
    S: StateStore + ?Sized,
    H: Host + ?Sized,
{
    let capacity = order.capacity();
    let already_filled = frame.state.filled_amount(order_hash);
    let quantity = match order.kind {
        NftKind::Erc721 => 1,
        NftKind::Erc1155 => legs.quantity.min(capacity.saturating_sub(already_filled)),
    };
    if quantity == 0 {
        return Err(CapacityError::ZeroFillAmount { order_hash }.into());
    }

    let nominal = u256_to_u128(order.erc20_token_amount).ok_or(CapacityError::Overflow)?;
    let erc20_amount = FillAmountCalculator::prorate(nominal, quantity, capacity, legs.rounding)?;

    match order.kind {
        NftKind::Erc721 => {
            frame.state.set_filled_amount(order_hash, 1);
            frame.state.cancel(order.maker, nonce_slot(order.nonce));
        }
        NftKind::Erc1155 => {
            frame
                .state
                .set_filled_amount(order_hash, already_filled + quantity);
        }
    }
    debug!(%order_hash, quantity, erc20_amount, "nft order sized");

    let nft = match order.kind {
        NftKind::Erc721 => Asset::Erc721 {
            token: order.nft_token,
            id: legs.token_id,
        },
        NftKind::Erc1155 => Asset::Erc1155 {
            token: order.nft_token,
            id: legs.token_id,
        },
    };
    frame.transfer(&nft, legs.nft_seller, legs.nft_buyer, quantity)?;
    frame.pay(order.erc20_token, legs.nft_buyer, legs.nft_seller, erc20_amount)?;
    let fees_paid = FeeAccountant::pay_nft_fees(
        frame,
        order,
        legs.nft_buyer,
        quantity,
        capacity,
        legs.rounding,
    )?;

    let (maker_token, taker_token, maker_filled, taker_filled) = if order.is_sell() {
        (order.nft_token, order.erc20_token, quantity, erc20_amount)
    } else {
        (order.erc20_token, order.nft_token, erc20_amount, quantity)
    };
    frame.emit(FillEvent {
        order_hash: order_hash.0,
        kind: order.order_kind().to_u8(),
        maker: address_bytes(order.maker),
        taker: address_bytes(frame.ctx.sender),
        maker_token: address_bytes(maker_token),
        taker_token: address_bytes(taker_token),
        maker_token_filled_amount: maker_filled,
        taker_token_filled_amount: taker_filled,
        fee_recipient: address_bytes(order.fees.first().map_or(Address::ZERO, |fee| fee.recipient)),
        fee_filled_amount: fees_paid,
        nft_token: address_bytes(order.nft_token),
        nft_token_id: legs.token_id.to_be_bytes::<32>(),
        timestamp: frame.ctx.timestamp,
        ..Default::default()
    });

    Ok(FillResult {
        order_hash,
        taker_filled: quantity,
        maker_filled: erc20_amount,
        fee_filled: fees_paid,
        protocol_fee_paid: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::host::MemoryHost;
    use crate::types::Property;
    use alloy_primitives::address;

    const VALIDATOR: Address = address!("5000000000000000000000000000000000000005");

    fn bid() -> NftOrder {
        NftOrder {
            direction: TradeDirection::BuyNft,
            nft_token: address!("3000000000000000000000000000000000000003"),
            nft_token_id: U256::from(9u8),
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_token_id_required_without_properties() {
        let host = MemoryHost::default();
        assert!(check_token_id(&host, &bid(), U256::from(9u8)).is_ok());
        assert_eq!(
            check_token_id(&host, &bid(), U256::from(10u8)),
            Err(EngineError::Restriction(RestrictionError::TokenIdMismatch {
                expected: U256::from(9u8),
                actual: U256::from(10u8),
            }))
        );
    }

    #[test]
    fn test_properties_consult_validators() {
        let mut host = MemoryHost::default();
        let order = NftOrder {
            nft_token_id: U256::ZERO,
            nft_token_properties: vec![
                Property::default(),
                Property { property_validator: VALIDATOR, property_data: vec![1] },
            ],
            ..bid()
        };
        assert!(matches!(
            check_token_id(&host, &order, U256::from(42u8)),
            Err(EngineError::Restriction(RestrictionError::PropertyRejected { .. }))
        ));

        host.approve_property(VALIDATOR, U256::from(42u8));
        assert!(check_token_id(&host, &order, U256::from(42u8)).is_ok());
    }

    #[test]
    fn test_zero_validator_accepts_any_id() {
        let host = MemoryHost::default();
        let order = NftOrder {
            nft_token_id: U256::ZERO,
            nft_token_properties: vec![Property::default()],
            ..bid()
        };
        assert!(check_token_id(&host, &order, U256::from(1234u32)).is_ok());
    }
}
