use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side of the order
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

/// The directional exposure of a position: long (+1), flat (0), or short (-1).
///
/// This is also the type of a strategy signal, which expresses the *desired*
/// exposure for the next bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    #[default]
    Flat,
    Short,
}

impl Side {
    /// The signed multiplier used in P&L math: +1, 0, or -1.
    pub fn multiplier(&self) -> Decimal {
        match self {
            Side::Long => Decimal::ONE,
            Side::Flat => Decimal::ZERO,
            Side::Short => -Decimal::ONE,
        }
    }

    /// Maps an integer signal in {-1, 0, +1} to a `Side`.
    ///
    /// Any other value is an invariant violation and fails fast.
    pub fn from_signal(signal: i8) -> Result<Self, CoreError> {
        match signal {
            1 => Ok(Side::Long),
            0 => Ok(Side::Flat),
            -1 => Ok(Side::Short),
            other => Err(CoreError::InvalidInput(
                "signal".to_string(),
                format!("{} is not in {{-1, 0, +1}}", other),
            )),
        }
    }

    /// The order side that opens exposure in this direction, if any.
    pub fn opening_order(&self) -> Option<OrderSide> {
        match self {
            Side::Long => Some(OrderSide::Buy),
            Side::Short => Some(OrderSide::Sell),
            Side::Flat => None,
        }
    }

    /// The order side that closes exposure in this direction, if any.
    pub fn closing_order(&self) -> Option<OrderSide> {
        self.opening_order().map(|s| s.opposite())
    }
}
