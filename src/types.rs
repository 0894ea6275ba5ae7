//! Identifier and money newtypes shared by the stock and order layers
use super::error::StockError;
use rust_decimal::Decimal;
use std::fmt;

/// Catalog key of a stocked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub u64);

/// Order number handed out by an [`crate::sequencer::OrderSequencer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderId(pub u64);

// Big-endian keys keep sled's lexical ordering equal to numeric ordering.
impl ItemId {
    pub fn to_key(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
    pub fn from_key(key: &[u8]) -> Option<Self> {
        let bytes: [u8; 8] = key.try_into().ok()?;
        Some(Self(u64::from_be_bytes(bytes)))
    }
}

impl OrderId {
    pub fn to_key(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
    pub fn from_key(key: &[u8]) -> Option<Self> {
        let bytes: [u8; 8] = key.try_into().ok()?;
        Some(Self(u64::from_be_bytes(bytes)))
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        ItemId(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A non-negative money amount. Used both for unit prices and line totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Result<Self, StockError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(StockError::InvalidPrice(amount));
        }
        Ok(Self(amount))
    }
    /// Build from an integer count of minor units, `from_minor(1050, 2)` is 10.50
    pub fn from_minor(units: u64, scale: u32) -> Self {
        Self(Decimal::from_i128_with_scale(units as i128, scale))
    }
    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn checked_add(self, rhs: Price) -> Result<Price, StockError> {
        self.0
            .checked_add(rhs.0)
            .map(Price)
            .ok_or(StockError::PriceOverflow)
    }

    /// `self * quantity`, failing instead of wrapping past `Decimal::MAX`
    pub fn checked_mul(self, quantity: u32) -> Result<Price, StockError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Price)
            .ok_or(StockError::PriceOverflow)
    }

    pub fn checked_sum(prices: impl IntoIterator<Item = Price>) -> Result<Price, StockError> {
        prices
            .into_iter()
            .try_fold(Price::ZERO, |acc, p| acc.checked_add(p))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// Decimal has no minicbor impls, encode its 16 byte canonical form instead.
impl<C> minicbor::Encode<C> for Price {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.0.serialize())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Price {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let raw: [u8; 16] = d
            .bytes()?
            .try_into()
            .map_err(|_| minicbor::decode::Error::message("price must be 16 bytes"))?;

        Ok(Price(Decimal::deserialize(raw)))
    }
}
