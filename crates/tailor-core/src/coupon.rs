//! # Coupons
//!
//! The store runs a small fixed set of promotional codes. They are not
//! persisted and not tied to a customer.
//!
//! | Code        | Discount          |
//! |-------------|-------------------|
//! | `WELCOME10` | 10 % of subtotal  |
//! | `FLAT50`    | ₹50 off           |
//! | `SAVE20`    | 20 % of subtotal  |

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

/// How a coupon reduces the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Discount {
    /// Basis points of the subtotal (1000 = 10 %).
    Percentage { bps: u32 },
    /// Flat amount in paise.
    Fixed { paise: i64 },
}

/// A redeemable coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coupon {
    pub code: &'static str,
    pub discount: Discount,
}

const COUPONS: [Coupon; 3] = [
    Coupon {
        code: "WELCOME10",
        discount: Discount::Percentage { bps: 1_000 },
    },
    Coupon {
        code: "FLAT50",
        discount: Discount::Fixed { paise: 5_000 },
    },
    Coupon {
        code: "SAVE20",
        discount: Discount::Percentage { bps: 2_000 },
    },
];

impl Coupon {
    /// Discount this coupon gives on `subtotal`, never more than the subtotal.
    ///
    /// ```rust
    /// use tailor_core::coupon::lookup;
    /// use tailor_core::Money;
    ///
    /// let flat = lookup("FLAT50").unwrap();
    /// assert_eq!(flat.discount_for(Money::from_paise(3_000)).unwrap().paise(), 3_000);
    /// ```
    pub fn discount_for(&self, subtotal: Money) -> CoreResult<Money> {
        if !subtotal.is_positive() {
            return Ok(Money::zero());
        }

        let raw = match self.discount {
            Discount::Percentage { bps } => subtotal.percentage(bps)?,
            Discount::Fixed { paise } => Money::from_paise(paise),
        };
        Ok(raw.min(subtotal))
    }
}

/// Looks up a coupon code (surrounding whitespace and case are ignored).
pub fn lookup(code: &str) -> CoreResult<Coupon> {
    let normalized = code.trim().to_ascii_uppercase();

    COUPONS
        .iter()
        .find(|coupon| coupon.code == normalized)
        .copied()
        .ok_or(CoreError::InvalidCoupon(normalized))
}

// =============================================================================
// Discount Resolution
// =============================================================================

/// Where an order's discount comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscountPolicy {
    /// Recompute the discount from `coupon_code`; a bare discount is refused.
    #[default]
    Enforce,
    /// Accept the caller's `discount_amount` and keep the code as a label.
    TrustCaller,
}

impl DiscountPolicy {
    pub fn from_enforce_flag(enforce: bool) -> Self {
        if enforce {
            DiscountPolicy::Enforce
        } else {
            DiscountPolicy::TrustCaller
        }
    }
}

/// Decides the discount of an order once its subtotal is known.
///
/// Under [`DiscountPolicy::TrustCaller`] the requested amount is returned
/// unchanged; `quote_order` still rejects it when it exceeds the subtotal.
pub fn resolve_discount(
    policy: DiscountPolicy,
    coupon_code: Option<&str>,
    requested: Money,
    subtotal: Money,
) -> CoreResult<Money> {
    let code = coupon_code.map(str::trim).filter(|c| !c.is_empty());

    match policy {
        DiscountPolicy::TrustCaller => Ok(requested),
        DiscountPolicy::Enforce => match code {
            Some(code) => lookup(code)?.discount_for(subtotal),
            None if requested.is_zero() => Ok(Money::zero()),
            None => Err(ValidationError::InvalidFormat {
                field: "discount_amount".to_string(),
                reason: "a discount requires a coupon_code".to_string(),
            }
            .into()),
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
