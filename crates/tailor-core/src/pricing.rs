//! # Order Pricing
//!
//! Turns a cart into an [`OrderQuote`]: per-line prices, subtotal, discount,
//! total, advance and due.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line items ──► price_line() ──► PricedLine (exact, scaled ×10^4)       │
//! │                     │                                                   │
//! │   customized AND    │  unit = base × multiplier                         │
//! │   customizable? ────┤                                                   │
//! │                     │  unit = base                                      │
//! │                     ▼                                                   │
//! │  quote_order() ──► subtotal = round_half_up(Σ exact line totals)        │
//! │                    total    = subtotal − discount   (discount ≤ sub)    │
//! │                    due      = total − advance       (may go negative)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rounding happens once, at the subtotal. A 3 × ₹999.99 custom line at ×1.2
//! is 3599.964 exactly and becomes ₹3599.96, not 3 × ₹1199.99 = ₹3599.97.

use serde::Serialize;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Customization, PriceMultiplier};

// =============================================================================
// Inputs
// =============================================================================

/// The catalog facts pricing needs about one product.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPrice {
    pub product_id: String,
    pub price: Money,
    pub is_customizable: bool,
    pub multiplier: PriceMultiplier,
}

// =============================================================================
// Priced Line
// =============================================================================

/// One priced line item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedLine {
    pub product_id: String,
    pub quantity: i64,
    /// Multiplier actually applied; identity unless the surcharge kicked in.
    pub multiplier: PriceMultiplier,
    /// Unit price rounded to whole paise (snapshot for display).
    pub unit_price: Money,
    /// `None` when the buyer supplied nothing (or only blanks).
    pub customization: Option<Customization>,
    /// `base paise × multiplier bps × quantity`, unrounded.
    exact_total: i128,
}

impl PricedLine {
    /// Customized lines are made to order.
    #[inline]
    pub fn is_customized(&self) -> bool {
        self.customization.is_some()
    }

    /// Whether this line consumes catalog stock.
    #[inline]
    pub fn draws_stock(&self) -> bool {
        !self.is_customized()
    }

    /// Exact line total scaled by 10^4.
    #[inline]
    pub fn exact_total(&self) -> i128 {
        self.exact_total
    }
}

/// Prices one line item against its catalog entry.
///
/// The multiplier applies only when the line carries a non-empty
/// customization *and* the product is customizable.
///
/// Fails with `AmountOutOfRange` when the unit price does not fit in i64
/// paise or the line total does not fit in the scaled range.
pub fn price_line(
    catalog: &CatalogPrice,
    quantity: i64,
    customization: Option<Customization>,
) -> CoreResult<PricedLine> {
    let customization = customization.filter(|c| !c.is_empty());

    let multiplier = if customization.is_some() && catalog.is_customizable {
        catalog.multiplier
    } else {
        PriceMultiplier::IDENTITY
    };

    let exact_unit = catalog.price.paise() as i128 * multiplier.bps() as i128;
    let exact_total = exact_unit
        .checked_mul(quantity as i128)
        .ok_or(CoreError::AmountOutOfRange)?;

    Ok(PricedLine {
        product_id: catalog.product_id.clone(),
        quantity,
        multiplier,
        unit_price: Money::from_scaled_half_up(exact_unit)?,
        customization,
        exact_total,
    })
}

// =============================================================================
// Order Quote
// =============================================================================

/// The money side of a new order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderQuote {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub advance: Money,
    pub due: Money,
}

impl OrderQuote {
    /// Lines that decrement stock, with their quantities.
    pub fn stock_draws(&self) -> impl Iterator<Item = (&str, i64)> {
        self.lines
            .iter()
            .filter(|line| line.draws_stock())
            .map(|line| (line.product_id.as_str(), line.quantity))
    }
}

/// Subtotal of priced lines, rounded once.
///
/// Fails with `AmountOutOfRange` when the subtotal does not fit in i64 paise.
pub fn subtotal_of(lines: &[PricedLine]) -> CoreResult<Money> {
    let exact = lines
        .iter()
        .try_fold(0i128, |sum, line| sum.checked_add(line.exact_total()))
        .ok_or(CoreError::AmountOutOfRange)?;
    Money::from_scaled_half_up(exact)
}

/// Sums priced lines and applies discount and advance.
///
/// ## Errors
/// - negative discount or advance → `Validation`
/// - discount greater than subtotal → `DiscountExceedsSubtotal`
/// - subtotal beyond i64 paise → `AmountOutOfRange`
///
/// A due below zero (advance larger than total) is allowed.
pub fn quote_order(lines: Vec<PricedLine>, discount: Money, advance: Money) -> CoreResult<OrderQuote> {
    if discount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "discount_amount".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }

    if advance.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "advance".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }

    let subtotal = subtotal_of(&lines)?;

    if discount > subtotal {
        return Err(CoreError::DiscountExceedsSubtotal { discount, subtotal });
    }

    let total = subtotal - discount;
    let due = total - advance;

    Ok(OrderQuote {
        lines,
        subtotal,
        discount,
        total,
        advance,
        due,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sherwani() -> CatalogPrice {
        CatalogPrice {
            product_id: "sherwani".to_string(),
            price: Money::from_paise(200_000),
            is_customizable: true,
            multiplier: PriceMultiplier::from_bps(12_000),
        }
    }

    fn sized(size: &str) -> Option<Customization> {
        Some(Customization {
            size: Some(size.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_plain_line_uses_base_price() {
        let line = price_line(&sherwani(), 2, None).unwrap();
        assert_eq!(line.unit_price.paise(), 200_000);
        assert!(line.multiplier.is_identity());
        assert!(line.draws_stock());

        let quote = quote_order(vec![line], Money::zero(), Money::zero()).unwrap();
        assert_eq!(quote.subtotal.paise(), 400_000);
        assert_eq!(quote.stock_draws().collect::<Vec<_>>(), vec![("sherwani", 2)]);
    }

    #[test]
    fn test_customized_line_uses_multiplier() {
        let line = price_line(&sherwani(), 1, sized("M")).unwrap();
        assert_eq!(line.unit_price.paise(), 240_000);
        assert_eq!(line.multiplier.bps(), 12_000);
        assert!(!line.draws_stock());

        let quote = quote_order(vec![line], Money::zero(), Money::zero()).unwrap();
        assert_eq!(quote.subtotal.paise(), 240_000);
        assert_eq!(quote.stock_draws().count(), 0);
    }

    #[test]
    fn test_empty_customization_is_ignored() {
        let line = price_line(&sherwani(), 1, Some(Customization::default())).unwrap();
        assert!(line.customization.is_none());
        assert_eq!(line.unit_price.paise(), 200_000);
    }

    #[test]
    fn test_non_customizable_product_keeps_base_price() {
        let mut catalog = sherwani();
        catalog.is_customizable = false;

        let line = price_line(&catalog, 1, sized("L")).unwrap();
        assert_eq!(line.unit_price.paise(), 200_000);
        // the buyer still asked for tailoring, so the line is made to order
        assert!(!line.draws_stock());
    }

    #[test]
    fn test_rounding_happens_once_at_subtotal() {
        let catalog = CatalogPrice {
            product_id: "kurta".to_string(),
            price: Money::from_paise(99_999),
            is_customizable: true,
            multiplier: PriceMultiplier::from_bps(12_000),
        };

        let line = price_line(&catalog, 3, sized("S")).unwrap();
        // 99999 × 1.2 = 119998.8 → displayed unit 119999
        assert_eq!(line.unit_price.paise(), 119_999);

        let quote = quote_order(vec![line], Money::zero(), Money::zero()).unwrap();
        // 359996.4 → 359996, not 3 × 119999 = 359997
        assert_eq!(quote.subtotal.paise(), 359_996);
    }

    #[test]
    fn test_total_and_due() {
        let lines = vec![price_line(&sherwani(), 1, None).unwrap()];
        let quote = quote_order(lines, Money::from_paise(20_000), Money::from_paise(50_000)).unwrap();

        assert_eq!(quote.total, quote.subtotal - quote.discount);
        assert_eq!(quote.due, quote.total - quote.advance);
        assert_eq!(quote.total.paise(), 180_000);
        assert_eq!(quote.due.paise(), 130_000);
    }

    #[test]
    fn test_overpayment_allows_negative_due() {
        let lines = vec![price_line(&sherwani(), 1, None).unwrap()];
        let quote = quote_order(lines, Money::zero(), Money::from_paise(250_000)).unwrap();
        assert_eq!(quote.due.paise(), -50_000);
    }

    #[test]
    fn test_discount_exceeding_subtotal_rejected() {
        let lines = vec![price_line(&sherwani(), 1, None).unwrap()];
        let err = quote_order(lines, Money::from_paise(200_001), Money::zero()).unwrap_err();
        assert!(matches!(err, CoreError::DiscountExceedsSubtotal { .. }));
    }

    #[test]
    fn test_discount_equal_to_subtotal_gives_zero_total() {
        let lines = vec![price_line(&sherwani(), 1, None).unwrap()];
        let quote = quote_order(lines, Money::from_paise(200_000), Money::zero()).unwrap();
        assert!(quote.total.is_zero());
    }

    #[test]
    fn test_oversized_order_is_out_of_range() {
        let catalog = CatalogPrice {
            product_id: "gold-sherwani".to_string(),
            price: Money::from_paise(4_000_000_000_000_000_000),
            is_customizable: false,
            multiplier: PriceMultiplier::IDENTITY,
        };

        // the line itself fits in i128, the subtotal does not fit in i64
        let line = price_line(&catalog, 3, None).unwrap();
        let err = quote_order(vec![line], Money::zero(), Money::zero()).unwrap_err();
        assert!(matches!(err, CoreError::AmountOutOfRange));

        let huge = CatalogPrice {
            price: Money::from_paise(i64::MAX),
            ..catalog
        };
        let err = price_line(&huge, i64::MAX, None).unwrap_err();
        assert!(matches!(err, CoreError::AmountOutOfRange));
    }

    #[test]
    fn test_negative_advance_rejected() {
        let lines = vec![price_line(&sherwani(), 1, None).unwrap()];
        let err = quote_order(lines, Money::zero(), Money::from_paise(-1)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
