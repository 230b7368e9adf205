//! Fungible order families: limit, RFQ and OTC orders.
//!
//! ## Hashing
//!
//! Each order is identified by its EIP-712 hash under the exchange domain.
//! The hash covers every field, so an order is immutable once signed.
//!
//! ## Capacity
//!
//! Capacity is always measured in taker-token units: `taker_amount` for limit
//! and RFQ orders. OTC orders fill once, so their capacity is consumed by the
//! nonce rather than by a stored filled amount.

use alloy_primitives::{address, Address, B256, U256};
use serde::{Deserialize, Serialize};

use super::eip712::{Eip712Domain, StructHasher};

/// Sentinel address standing for the chain's native asset
pub const NATIVE_TOKEN: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

pub const LIMIT_ORDER_TYPE: &[u8] = b"LimitOrder(address makerToken,address takerToken,uint128 makerAmount,uint128 takerAmount,uint128 takerTokenFeeAmount,address maker,address taker,address sender,address feeRecipient,bytes32 pool,uint64 expiry,uint256 salt)";

pub const RFQ_ORDER_TYPE: &[u8] = b"RfqOrder(address makerToken,address takerToken,uint128 makerAmount,uint128 takerAmount,address maker,address taker,address txOrigin,bytes32 pool,uint64 expiry,uint256 salt)";

pub const OTC_ORDER_TYPE: &[u8] = b"OtcOrder(address makerToken,address takerToken,uint128 makerAmount,uint128 takerAmount,address maker,address taker,address txOrigin,uint256 expiryAndNonce)";

// ============================================================================
// OrderStatus
// ============================================================================

/// Status of an order at the time of a query.
///
/// Represented as u8:
/// - Invalid = 0
/// - Fillable = 1
/// - Filled = 2
/// - Cancelled = 3
/// - Expired = 4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Invalid,
    Fillable,
    Filled,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn to_u8(self) -> u8 {
        match self {
            OrderStatus::Invalid => 0,
            OrderStatus::Fillable => 1,
            OrderStatus::Filled => 2,
            OrderStatus::Cancelled => 3,
            OrderStatus::Expired => 4,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(OrderStatus::Invalid),
            1 => Some(OrderStatus::Fillable),
            2 => Some(OrderStatus::Filled),
            3 => Some(OrderStatus::Cancelled),
            4 => Some(OrderStatus::Expired),
            _ => None,
        }
    }

    /// Filled and Cancelled never transition back to Fillable
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

/// Derived view of an order, computed on demand and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderInfo {
    pub order_hash: B256,
    pub status: OrderStatus,
    /// Cumulative filled amount in taker-token units (quantity units for ERC-1155)
    pub filled_amount: u128,
}

// ============================================================================
// OrderKind
// ============================================================================

/// Discriminator carried by fill events and pair-cancellation slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrderKind {
    Limit,
    Rfq,
    Otc,
    Erc721,
    Erc1155,
    Bridge,
}

impl OrderKind {
    pub fn to_u8(self) -> u8 {
        match self {
            OrderKind::Limit => 0,
            OrderKind::Rfq => 1,
            OrderKind::Otc => 2,
            OrderKind::Erc721 => 3,
            OrderKind::Erc1155 => 4,
            OrderKind::Bridge => 5,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(OrderKind::Limit),
            1 => Some(OrderKind::Rfq),
            2 => Some(OrderKind::Otc),
            3 => Some(OrderKind::Erc721),
            4 => Some(OrderKind::Erc1155),
            5 => Some(OrderKind::Bridge),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderKind::Limit => "limit",
            OrderKind::Rfq => "rfq",
            OrderKind::Otc => "otc",
            OrderKind::Erc721 => "erc721",
            OrderKind::Erc1155 => "erc1155",
            OrderKind::Bridge => "bridge",
        }
    }
}

// ============================================================================
// LimitOrder
// ============================================================================

/// A bilateral limit order with an optional taker-paid fee.
///
/// A zero `taker` or `sender` means "anyone".
///
/// ## Example
///
/// ```
/// use alloy_primitives::{address, U256};
/// use fill_engine::types::LimitOrder;
///
/// let order = LimitOrder {
///     maker: address!("1000000000000000000000000000000000000001"),
///     maker_token: address!("2000000000000000000000000000000000000002"),
///     taker_token: address!("3000000000000000000000000000000000000003"),
///     maker_amount: 200,
///     taker_amount: 100,
///     taker_token_fee_amount: 10,
///     expiry: 1_700_000_000,
///     salt: U256::from(1u8),
///     ..Default::default()
/// };
/// assert_eq!(order.capacity(), 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LimitOrder {
    pub maker_token: Address,
    pub taker_token: Address,
    pub maker_amount: u128,
    pub taker_amount: u128,
    pub taker_token_fee_amount: u128,
    pub maker: Address,
    pub taker: Address,
    pub sender: Address,
    pub fee_recipient: Address,
    pub pool: B256,
    pub expiry: u64,
    pub salt: U256,
}

impl LimitOrder {
    pub fn struct_hash(&self) -> B256 {
        StructHasher::new(LIMIT_ORDER_TYPE)
            .address(self.maker_token)
            .address(self.taker_token)
            .u128(self.maker_amount)
            .u128(self.taker_amount)
            .u128(self.taker_token_fee_amount)
            .address(self.maker)
            .address(self.taker)
            .address(self.sender)
            .address(self.fee_recipient)
            .bytes32(self.pool)
            .u64(self.expiry)
            .uint(self.salt)
            .finish()
    }

    pub fn hash(&self, domain: &Eip712Domain) -> B256 {
        domain.hash_struct(self.struct_hash())
    }

    /// Fillable capacity in taker-token units
    pub fn capacity(&self) -> u128 {
        self.taker_amount
    }
}

// ============================================================================
// RfqOrder
// ============================================================================

/// A maker-delegated RFQ order, bound to a transaction origin.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RfqOrder {
    pub maker_token: Address,
    pub taker_token: Address,
    pub maker_amount: u128,
    pub taker_amount: u128,
    pub maker: Address,
    pub taker: Address,
    pub tx_origin: Address,
    pub pool: B256,
    pub expiry: u64,
    pub salt: U256,
}

impl RfqOrder {
    pub fn struct_hash(&self) -> B256 {
        StructHasher::new(RFQ_ORDER_TYPE)
            .address(self.maker_token)
            .address(self.taker_token)
            .u128(self.maker_amount)
            .u128(self.taker_amount)
            .address(self.maker)
            .address(self.taker)
            .address(self.tx_origin)
            .bytes32(self.pool)
            .u64(self.expiry)
            .uint(self.salt)
            .finish()
    }

    pub fn hash(&self, domain: &Eip712Domain) -> B256 {
        domain.hash_struct(self.struct_hash())
    }

    pub fn capacity(&self) -> u128 {
        self.taker_amount
    }
}

// ============================================================================
// OtcOrder
// ============================================================================

/// A single-use OTC order.
///
/// `expiry_and_nonce` packs `expiry (64) ‖ nonce bucket (64) ‖ nonce (128)`
/// from the most significant bit down.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OtcOrder {
    pub maker_token: Address,
    pub taker_token: Address,
    pub maker_amount: u128,
    pub taker_amount: u128,
    pub maker: Address,
    pub taker: Address,
    pub tx_origin: Address,
    pub expiry_and_nonce: U256,
}

impl OtcOrder {
    /// Pack an expiry, nonce bucket and nonce into one word.
    ///
    /// # Example
    ///
    /// ```
    /// use fill_engine::types::OtcOrder;
    ///
    /// let packed = OtcOrder::pack_expiry_and_nonce(1_700_000_000, 1, 5);
    /// assert_eq!(OtcOrder::unpack_expiry_and_nonce(packed), (1_700_000_000, 1, 5));
    /// ```
    pub fn pack_expiry_and_nonce(expiry: u64, bucket: u64, nonce: u128) -> U256 {
        U256::from_limbs([nonce as u64, (nonce >> 64) as u64, bucket, expiry])
    }

    /// Inverse of [`OtcOrder::pack_expiry_and_nonce`]
    pub fn unpack_expiry_and_nonce(packed: U256) -> (u64, u64, u128) {
        let limbs = packed.as_limbs();
        let nonce = limbs[0] as u128 | ((limbs[1] as u128) << 64);
        (limbs[3], limbs[2], nonce)
    }

    pub fn expiry(&self) -> u64 {
        Self::unpack_expiry_and_nonce(self.expiry_and_nonce).0
    }

    pub fn nonce_bucket(&self) -> u64 {
        Self::unpack_expiry_and_nonce(self.expiry_and_nonce).1
    }

    pub fn nonce(&self) -> u128 {
        Self::unpack_expiry_and_nonce(self.expiry_and_nonce).2
    }

    pub fn struct_hash(&self) -> B256 {
        StructHasher::new(OTC_ORDER_TYPE)
            .address(self.maker_token)
            .address(self.taker_token)
            .u128(self.maker_amount)
            .u128(self.taker_amount)
            .address(self.maker)
            .address(self.taker)
            .address(self.tx_origin)
            .uint(self.expiry_and_nonce)
            .finish()
    }

    pub fn hash(&self, domain: &Eip712Domain) -> B256 {
        domain.hash_struct(self.struct_hash())
    }

    pub fn capacity(&self) -> u128 {
        self.taker_amount
    }
}

// ============================================================================
// Order
// ============================================================================

/// Tagged union over the fungible order families
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Limit(LimitOrder),
    Rfq(RfqOrder),
    Otc(OtcOrder),
}

impl Order {
    pub fn kind(&self) -> OrderKind {
        match self {
            Order::Limit(_) => OrderKind::Limit,
            Order::Rfq(_) => OrderKind::Rfq,
            Order::Otc(_) => OrderKind::Otc,
        }
    }

    pub fn hash(&self, domain: &Eip712Domain) -> B256 {
        match self {
            Order::Limit(o) => o.hash(domain),
            Order::Rfq(o) => o.hash(domain),
            Order::Otc(o) => o.hash(domain),
        }
    }

    pub fn maker(&self) -> Address {
        match self {
            Order::Limit(o) => o.maker,
            Order::Rfq(o) => o.maker,
            Order::Otc(o) => o.maker,
        }
    }

    /// `(maker_token, taker_token)`
    pub fn tokens(&self) -> (Address, Address) {
        match self {
            Order::Limit(o) => (o.maker_token, o.taker_token),
            Order::Rfq(o) => (o.maker_token, o.taker_token),
            Order::Otc(o) => (o.maker_token, o.taker_token),
        }
    }

    /// `(maker_amount, taker_amount)`
    pub fn amounts(&self) -> (u128, u128) {
        match self {
            Order::Limit(o) => (o.maker_amount, o.taker_amount),
            Order::Rfq(o) => (o.maker_amount, o.taker_amount),
            Order::Otc(o) => (o.maker_amount, o.taker_amount),
        }
    }
}

impl From<LimitOrder> for Order {
    fn from(order: LimitOrder) -> Self {
        Order::Limit(order)
    }
}

impl From<RfqOrder> for Order {
    fn from(order: RfqOrder) -> Self {
        Order::Rfq(order)
    }
}

impl From<OtcOrder> for Order {
    fn from(order: OtcOrder) -> Self {
        Order::Otc(order)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> Eip712Domain {
        Eip712Domain::exchange(1, address!("def1c0ded9bec7f1a1670819833240f027b25eff"))
    }

    fn limit() -> LimitOrder {
        LimitOrder {
            maker: address!("1000000000000000000000000000000000000001"),
            maker_token: address!("2000000000000000000000000000000000000002"),
            taker_token: address!("3000000000000000000000000000000000000003"),
            maker_amount: 200,
            taker_amount: 100,
            taker_token_fee_amount: 10,
            expiry: 1_000,
            salt: U256::from(42u8),
            ..Default::default()
        }
    }

    #[test]
    fn test_status_u8_conversion() {
        for v in 0..5u8 {
            assert_eq!(OrderStatus::from_u8(v).map(|s| s.to_u8()), Some(v));
        }
        assert_eq!(OrderStatus::from_u8(5), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Fillable.is_terminal());
        assert!(!OrderStatus::Expired.is_terminal());
    }

    #[test]
    fn test_limit_hash_covers_every_field() {
        let d = domain();
        let base = limit().hash(&d);

        let mut changed = limit();
        changed.salt = U256::from(43u8);
        assert_ne!(changed.hash(&d), base);

        let mut changed = limit();
        changed.taker_token_fee_amount = 11;
        assert_ne!(changed.hash(&d), base);

        let mut changed = limit();
        changed.pool = B256::repeat_byte(1);
        assert_ne!(changed.hash(&d), base);
    }

    #[test]
    fn test_hash_binds_domain() {
        let other = Eip712Domain::exchange(5, address!("def1c0ded9bec7f1a1670819833240f027b25eff"));
        assert_ne!(limit().hash(&domain()), limit().hash(&other));
    }

    #[test]
    fn test_families_hash_differently() {
        let d = domain();
        let rfq = RfqOrder {
            maker: address!("1000000000000000000000000000000000000001"),
            maker_amount: 200,
            taker_amount: 100,
            ..Default::default()
        };
        let otc = OtcOrder {
            maker: address!("1000000000000000000000000000000000000001"),
            maker_amount: 200,
            taker_amount: 100,
            ..Default::default()
        };
        assert_ne!(rfq.hash(&d), otc.hash(&d));
        assert_eq!(Order::from(rfq.clone()).hash(&d), rfq.hash(&d));
    }

    #[test]
    fn test_otc_packing_layout() {
        let packed = OtcOrder::pack_expiry_and_nonce(7, 3, (1u128 << 100) + 9);
        assert_eq!(packed >> 192, U256::from(7u8));
        assert_eq!((packed >> 128) & U256::from(u64::MAX), U256::from(3u8));

        let order = OtcOrder {
            expiry_and_nonce: packed,
            ..Default::default()
        };
        assert_eq!(order.expiry(), 7);
        assert_eq!(order.nonce_bucket(), 3);
        assert_eq!(order.nonce(), (1u128 << 100) + 9);
    }

    #[test]
    fn test_order_accessors() {
        let order = Order::from(limit());
        assert_eq!(order.kind(), OrderKind::Limit);
        assert_eq!(order.amounts(), (200, 100));
        assert_eq!(order.maker(), limit().maker);
    }

    #[test]
    fn test_kind_u8_conversion() {
        for v in 0..6u8 {
            assert_eq!(OrderKind::from_u8(v).map(|k| k.to_u8()), Some(v));
        }
    }
}
