//! # Validation Module
//!
//! Input validation for TailorCraft requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── Shape and types, enum membership (payment_method, status)         │
//! │  └── deny_unknown_fields on update commands                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lengths, ranges, formats                                          │
//! │  └── Every failure collected → 400 errors: [{field, message}]          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), UNIQUE (email, order_number)                  │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single-field validators return the first problem. Request validators
//! (`validate_new_order`, ...) run every check and return all problems.
//!
//! ## Usage
//! ```rust
//! use tailor_core::validation::{validate_quantity, validate_phone};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_phone("98765x3210").is_err());
//! ```

use crate::commands::{MeasurementUpdate, NewMeasurement, NewOrder, NewProduct, ProductUpdate, UserUpdate};
use crate::error::ValidationError;
use crate::types::ShippingAddress;
use crate::{DEFAULT_PAGE_LIMIT, MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS, MAX_PAGE_LIMIT, MAX_PRICE_PAISE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Every problem found in one request.
pub type ValidationErrors = Vec<ValidationError>;

/// Runs a batch of checks, keeping every failure.
pub fn collect(checks: impl IntoIterator<Item = ValidationResult<()>>) -> Result<(), ValidationErrors> {
    let errors: ValidationErrors = checks.into_iter().filter_map(Result::err).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Checks that `value` is present (after trimming).
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Checks a required text field's trimmed length, in characters.
pub fn validate_length(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<()> {
    validate_required(field, value)?;

    let len = value.trim().chars().count();
    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }
    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Person name: 2 to 50 characters.
pub fn validate_person_name(name: &str) -> ValidationResult<()> {
    validate_length("name", name, 2, 50)
}

/// Email address: `local@domain.tld`, no whitespace.
///
/// ```rust
/// use tailor_core::validation::validate_email;
///
/// assert!(validate_email("asha@example.in").is_ok());
/// assert!(validate_email("asha@localhost").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    validate_required("email", email)?;

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "please provide a valid email".to_string(),
    };

    if email.len() > 100 || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && tld.len() >= 2 => Ok(()),
        _ => Err(invalid()),
    }
}

/// Lowercases and trims an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Phone number: exactly 10 digits.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    validate_required("phone", phone)?;

    if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "phone number must be 10 digits".to_string(),
        });
    }
    Ok(())
}

/// Password: at least 6 characters.
pub fn validate_password(field: &str, password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if password.chars().count() < 6 {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min: 6,
        });
    }
    Ok(())
}

/// Validates a search query: non-empty, at most 100 characters.
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();
    validate_length("q", query, 1, 100)?;
    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Quantity: 1 to 999.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    validate_quantity_field("quantity", qty)
}

fn validate_quantity_field(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Non-negative amount in paise (prices, discounts, advances).
pub fn validate_non_negative(field: &str, paise: i64) -> ValidationResult<()> {
    if paise < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Catalog price in paise: 0 to [`MAX_PRICE_PAISE`].
///
/// ```rust
/// use tailor_core::validation::validate_price;
///
/// assert!(validate_price("price_paise", 129_900).is_ok());
/// assert!(validate_price("price_paise", 4_000_000_000_000_000_000).is_err());
/// ```
pub fn validate_price(field: &str, paise: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_PAISE).contains(&paise) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_PAISE,
        });
    }
    Ok(())
}

/// Payment amount: strictly positive.
pub fn validate_payment_amount(paise: i64) -> ValidationResult<()> {
    if paise <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Custom-price multiplier: ×1.00 to ×9.99.
pub fn validate_multiplier_bps(bps: u32) -> ValidationResult<()> {
    if !(10_000..=99_900).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "custom_price_multiplier_bps".to_string(),
            min: 10_000,
            max: 99_900,
        });
    }
    Ok(())
}

/// Resolves `page`/`limit` query values into `(limit, offset)`.
///
/// ```rust
/// use tailor_core::validation::resolve_page;
///
/// assert_eq!(resolve_page(None, None).unwrap(), (20, 0));
/// assert_eq!(resolve_page(Some(3), Some(10)).unwrap(), (10, 20));
/// assert!(resolve_page(Some(0), None).is_err());
/// ```
pub fn resolve_page(page: Option<i64>, limit: Option<i64>) -> ValidationResult<(i64, i64)> {
    let page = page.unwrap_or(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    if page < 1 {
        return Err(ValidationError::OutOfRange {
            field: "page".to_string(),
            min: 1,
            max: i64::MAX,
        });
    }
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_PAGE_LIMIT,
        });
    }

    Ok((limit, (page - 1) * limit))
}

// =============================================================================
// Request Validators
// =============================================================================

/// Checks the five required address fields.
pub fn validate_shipping_address(address: &ShippingAddress) -> Vec<ValidationResult<()>> {
    vec![
        validate_required("shipping_address.fullName", &address.full_name),
        validate_required("shipping_address.address", &address.address),
        validate_required("shipping_address.city", &address.city),
        validate_required("shipping_address.state", &address.state),
        validate_required("shipping_address.zipCode", &address.zip_code),
    ]
}

/// Everything the order engine relies on before it runs.
///
/// ## Checks
/// - at least one and at most 100 line items
/// - each line has a product id and a quantity of 1 to 999
/// - all five shipping address fields are present
/// - discount and advance are not negative
pub fn validate_new_order(order: &NewOrder) -> Result<(), ValidationErrors> {
    let mut checks = Vec::new();

    if order.items.is_empty() {
        checks.push(Err(ValidationError::Required {
            field: "items".to_string(),
        }));
    } else if order.items.len() > MAX_ORDER_ITEMS {
        checks.push(Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_ITEMS as i64,
        }));
    }

    for (index, item) in order.items.iter().enumerate() {
        checks.push(validate_required(&format!("items[{index}].product_id"), &item.product_id));
        checks.push(validate_quantity_field(&format!("items[{index}].quantity"), item.quantity));
    }

    checks.extend(validate_shipping_address(&order.shipping_address));
    checks.push(validate_non_negative("discount_paise", order.discount_paise));
    checks.push(validate_non_negative("advance_paise", order.advance_paise));

    collect(checks)
}

/// Product name 3–100, description up to 1000, price within range, stock not negative.
pub fn validate_new_product(product: &NewProduct) -> Result<(), ValidationErrors> {
    let mut checks = vec![
        validate_length("name", &product.name, 3, 100),
        validate_required("category", &product.category),
        validate_price("price_paise", product.price_paise),
        validate_non_negative("stock", product.stock),
    ];

    if let Some(description) = &product.description {
        checks.push(validate_length("description", description, 10, 1000));
    }
    if let Some(original) = product.original_price_paise {
        checks.push(validate_price("original_price_paise", original));
    }
    if let Some(bps) = product.custom_price_multiplier_bps {
        checks.push(validate_multiplier_bps(bps));
    }
    for (index, variant) in product.variants.iter().enumerate() {
        checks.push(validate_non_negative(&format!("variants[{index}].stock"), variant.stock));
    }

    collect(checks)
}

/// Same rules as creation, applied to the fields present.
pub fn validate_product_update(update: &ProductUpdate) -> Result<(), ValidationErrors> {
    if update.is_empty() {
        return Err(vec![ValidationError::Required {
            field: "update".to_string(),
        }]);
    }

    let mut checks = Vec::new();
    if let Some(name) = &update.name {
        checks.push(validate_length("name", name, 3, 100));
    }
    if let Some(description) = &update.description {
        checks.push(validate_length("description", description, 10, 1000));
    }
    if let Some(category) = &update.category {
        checks.push(validate_required("category", category));
    }
    if let Some(price) = update.price_paise {
        checks.push(validate_price("price_paise", price));
    }
    if let Some(original) = update.original_price_paise {
        checks.push(validate_price("original_price_paise", original));
    }
    if let Some(stock) = update.stock {
        checks.push(validate_non_negative("stock", stock));
    }
    if let Some(bps) = update.custom_price_multiplier_bps {
        checks.push(validate_multiplier_bps(bps));
    }

    collect(checks)
}

pub fn validate_user_update(update: &UserUpdate) -> Result<(), ValidationErrors> {
    if update.is_empty() {
        return Err(vec![ValidationError::Required {
            field: "update".to_string(),
        }]);
    }

    let mut checks = Vec::new();
    if let Some(name) = &update.name {
        checks.push(validate_person_name(name));
    }
    if let Some(phone) = &update.phone {
        checks.push(validate_phone(phone));
    }
    collect(checks)
}

/// Measurement name 2–50 characters; data must hold at least one value.
pub fn validate_new_measurement(measurement: &NewMeasurement) -> Result<(), ValidationErrors> {
    let mut checks = vec![validate_length("name", &measurement.name, 2, 50)];
    if measurement.data.is_empty() {
        checks.push(Err(ValidationError::Required {
            field: "data".to_string(),
        }));
    }
    collect(checks)
}

pub fn validate_measurement_update(update: &MeasurementUpdate) -> Result<(), ValidationErrors> {
    if update.is_empty() {
        return Err(vec![ValidationError::Required {
            field: "update".to_string(),
        }]);
    }

    let mut checks = Vec::new();
    if let Some(name) = &update.name {
        checks.push(validate_length("name", name, 2, 50));
    }
    if matches!(&update.data, Some(data) if data.is_empty()) {
        checks.push(Err(ValidationError::Required {
            field: "data".to_string(),
        }));
    }
    collect(checks)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::NewLineItem;
    use crate::types::PaymentMethod;
    use std::collections::BTreeMap;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Asha Rao".to_string(),
            address: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            state: "MH".to_string(),
            zip_code: "411001".to_string(),
            email: None,
            phone: None,
        }
    }

    fn order(items: Vec<NewLineItem>) -> NewOrder {
        NewOrder {
            items,
            shipping_address: address(),
            payment_method: PaymentMethod::Cod,
            notes: None,
            coupon_code: None,
            discount_paise: 0,
            advance_paise: 0,
        }
    }

    fn line(quantity: i64) -> NewLineItem {
        NewLineItem {
            product_id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            quantity,
            customization: None,
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("asha@example.in").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("asha.example.in").is_err());
        assert!(validate_email("asha @example.in").is_err());
        assert!(validate_email("@example.in").is_err());
        assert_eq!(normalize_email("  Asha@Example.IN "), "asha@example.in");
    }

    #[test]
    fn test_validate_phone_and_password() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("987654321").is_err());
        assert!(validate_password("password", "secret").is_ok());
        assert!(matches!(
            validate_password("password", "12345"),
            Err(ValidationError::TooShort { min: 6, .. })
        ));
    }

    #[test]
    fn test_validate_person_name() {
        assert!(validate_person_name("Al").is_ok());
        assert!(validate_person_name("A").is_err());
        assert!(validate_person_name(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_valid_order_passes() {
        assert!(validate_new_order(&order(vec![line(2)])).is_ok());
    }

    #[test]
    fn test_empty_order_rejected() {
        let errors = validate_new_order(&order(vec![])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), "items");
    }

    #[test]
    fn test_order_collects_every_problem() {
        let mut bad = order(vec![line(0), line(3)]);
        bad.shipping_address.city = " ".to_string();
        bad.shipping_address.zip_code.clear();
        bad.advance_paise = -1;

        let errors = validate_new_order(&bad).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(ValidationError::field).collect();
        assert_eq!(
            fields,
            vec![
                "items[0].quantity",
                "shipping_address.city",
                "shipping_address.zipCode",
                "advance_paise"
            ]
        );
    }

    #[test]
    fn test_resolve_page() {
        assert_eq!(resolve_page(Some(2), Some(20)).unwrap(), (20, 20));
        assert!(resolve_page(Some(1), Some(0)).is_err());
        assert!(resolve_page(Some(1), Some(101)).is_err());
    }

    #[test]
    fn test_validate_measurement() {
        let mut data = BTreeMap::new();
        data.insert("chest".to_string(), serde_json::json!(40));

        let ok = NewMeasurement {
            measurement_type: crate::types::MeasurementType::Shirt,
            name: "Office shirts".to_string(),
            data: data.clone(),
        };
        assert!(validate_new_measurement(&ok).is_ok());

        let bad = NewMeasurement {
            name: "X".to_string(),
            data: BTreeMap::new(),
            ..ok
        };
        assert_eq!(validate_new_measurement(&bad).unwrap_err().len(), 2);

        assert!(validate_measurement_update(&MeasurementUpdate::default()).is_err());
    }

    #[test]
    fn test_product_price_is_bounded() {
        let product = NewProduct {
            name: "Gold Sherwani".to_string(),
            description: None,
            price_paise: 4_000_000_000_000_000_000,
            original_price_paise: Some(MAX_PRICE_PAISE + 1),
            category: "Sherwanis".to_string(),
            material: None,
            stock: 1,
            is_customizable: true,
            custom_price_multiplier_bps: None,
            featured: false,
            images: vec![],
            variants: vec![],
        };
        let errors = validate_new_product(&product).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(ValidationError::field).collect();
        assert_eq!(fields, vec!["price_paise", "original_price_paise"]);

        let at_limit = NewProduct {
            price_paise: MAX_PRICE_PAISE,
            original_price_paise: None,
            ..product
        };
        assert!(validate_new_product(&at_limit).is_ok());

        let update = ProductUpdate {
            price_paise: Some(i64::MAX),
            ..Default::default()
        };
        assert!(validate_product_update(&update).is_err());
    }

    #[test]
    fn test_validate_multiplier() {
        assert!(validate_multiplier_bps(12_000).is_ok());
        assert!(validate_multiplier_bps(9_999).is_err());
        assert!(validate_multiplier_bps(100_000).is_err());
    }
}
