//! # Validation Module
//!
//! Shape checks run on every request before the engine opens a
//! transaction.
//!
//! ## Usage
//! ```rust
//! use pdv_core::validation::{parse_uuid, validate_payment_value};
//!
//! let id = parse_uuid("sale_id", "6F1C0D4E-8A4B-4C7E-9A51-3F0A2B1C9D10").unwrap();
//! assert_eq!(id, "6f1c0d4e-8a4b-4c7e-9a51-3f0a2b1c9d10");
//!
//! assert!(validate_payment_value(0.0).is_err());
//! ```

use uuid::Uuid;

use crate::error::ValidationError;
use crate::requests::{NewDebt, NewPayment, NewSale};
use crate::MAX_PAYMENT_METHOD_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifiers
// =============================================================================

/// Parses an identifier and returns its canonical hyphenated lowercase form.
pub fn parse_uuid(field: &str, value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Uuid::parse_str(trimmed)
        .map(|id| id.hyphenated().to_string())
        .map_err(|e| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: e.to_string(),
        })
}

/// Parses an optional identifier. Blank strings count as absent.
pub fn parse_optional_uuid(field: &str, value: Option<&str>) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_uuid(field, v).map(Some),
    }
}

// =============================================================================
// Amounts
// =============================================================================

fn validate_finite(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    Ok(())
}

/// Validates an amount that may be zero but not negative.
pub fn validate_non_negative(field: &str, value: f64) -> ValidationResult<()> {
    validate_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a payment value. Must be strictly positive.
pub fn validate_payment_value(value: f64) -> ValidationResult<()> {
    validate_finite("value", value)?;
    if value <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "value".to_string(),
        });
    }
    Ok(())
}

/// Validates a payment method label.
///
/// ## Rules
/// - Must not be blank
/// - At most [`MAX_PAYMENT_METHOD_LEN`] characters
pub fn validate_payment_method(method: &str) -> ValidationResult<()> {
    let method = method.trim();

    if method.is_empty() {
        return Err(ValidationError::Required {
            field: "payment_method".to_string(),
        });
    }

    if method.chars().count() > MAX_PAYMENT_METHOD_LEN {
        return Err(ValidationError::TooLong {
            field: "payment_method".to_string(),
            max: MAX_PAYMENT_METHOD_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Requests
// =============================================================================

/// Identifiers of a sale request in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleIds {
    /// Caller-supplied key, if any.
    pub sale_id: Option<String>,
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    /// One entry per line, in order.
    pub product_ids: Vec<String>,
}

/// Validates a sale request and canonicalizes its identifiers.
pub fn validate_new_sale(sale: &NewSale) -> ValidationResult<SaleIds> {
    validate_payment_method(&sale.payment_method)?;
    validate_non_negative("total", sale.total)?;
    validate_non_negative("discount", sale.discount)?;

    let mut product_ids = Vec::with_capacity(sale.items.len());
    for (index, item) in sale.items.iter().enumerate() {
        product_ids.push(parse_uuid(&format!("items[{index}].product_id"), &item.product_id)?);
        if item.quantity < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: format!("items[{index}].quantity"),
            });
        }
        if let Some(weight) = item.weight_kg {
            validate_non_negative(&format!("items[{index}].weight_kg"), weight)?;
        }
        validate_non_negative(&format!("items[{index}].unit_price"), item.unit_price)?;
        validate_non_negative(&format!("items[{index}].subtotal"), item.subtotal)?;
    }

    Ok(SaleIds {
        sale_id: parse_optional_uuid("id", sale.id.as_deref())?,
        user_id: parse_optional_uuid("user_id", sale.user_id.as_deref())?,
        customer_id: parse_optional_uuid("customer_id", sale.customer_id.as_deref())?,
        product_ids,
    })
}

/// Identifiers of a debt request in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct DebtIds {
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    pub product_ids: Vec<String>,
}

/// Validates a debt request and canonicalizes its identifiers.
///
/// An empty item list is reported as `Required { field: "items" }`.
pub fn validate_new_debt(debt: &NewDebt) -> ValidationResult<DebtIds> {
    if debt.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    validate_non_negative("discount_applied", debt.discount_applied)?;
    validate_non_negative("discount_percent", debt.discount_percent)?;

    let mut product_ids = Vec::with_capacity(debt.items.len());
    for (index, item) in debt.items.iter().enumerate() {
        product_ids.push(parse_uuid(&format!("items[{index}].product_id"), &item.product_id)?);
        validate_non_negative(&format!("items[{index}].quantity"), item.quantity)?;
        validate_non_negative(&format!("items[{index}].unit_price"), item.unit_price)?;
        validate_non_negative(&format!("items[{index}].subtotal"), item.subtotal)?;
    }

    Ok(DebtIds {
        user_id: parse_optional_uuid("user_id", debt.user_id.as_deref())?,
        customer_id: parse_optional_uuid("customer_id", debt.customer_id.as_deref())?,
        product_ids,
    })
}

/// Validates a payment request and returns the canonical user id.
pub fn validate_new_payment(payment: &NewPayment) -> ValidationResult<Option<String>> {
    validate_payment_value(payment.value)?;
    validate_payment_method(&payment.payment_method)?;
    parse_optional_uuid("user_id", payment.user_id.as_deref())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::{NewDebtItem, NewSaleItem};

    const PRODUCT: &str = "0d8f5a52-3f3e-4c8e-9f0e-2b0d9c1a7e11";

    #[test]
    fn test_parse_uuid() {
        assert!(parse_uuid("id", "not-a-uuid").is_err());
        assert!(matches!(
            parse_uuid("id", "  "),
            Err(ValidationError::Required { .. })
        ));
        assert_eq!(parse_uuid("id", &format!(" {PRODUCT} ")).unwrap(), PRODUCT);
    }

    #[test]
    fn test_parse_optional_uuid() {
        assert_eq!(parse_optional_uuid("user_id", None).unwrap(), None);
        assert_eq!(parse_optional_uuid("user_id", Some("")).unwrap(), None);
        assert!(parse_optional_uuid("user_id", Some("42")).is_err());
    }

    #[test]
    fn test_payment_value() {
        assert!(validate_payment_value(0.01).is_ok());
        assert!(validate_payment_value(0.0).is_err());
        assert!(validate_payment_value(-5.0).is_err());
        assert!(validate_payment_value(f64::NAN).is_err());
    }

    #[test]
    fn test_payment_method() {
        assert!(validate_payment_method("Dinheiro").is_ok());
        assert!(validate_payment_method("   ").is_err());
        assert!(validate_payment_method(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_sale_with_bad_product_id_rejected() {
        let sale = NewSale::new("Pix", 10.0).item(NewSaleItem::units("abc", 1, 10.0));
        let err = validate_new_sale(&sale).unwrap_err();
        assert!(err.to_string().starts_with("items[0].product_id"));
    }

    #[test]
    fn test_sale_ids_canonicalized() {
        let sale = NewSale::new("Pix", 10.0)
            .with_id(PRODUCT.to_uppercase())
            .item(NewSaleItem::units(PRODUCT, 1, 10.0));
        let ids = validate_new_sale(&sale).unwrap();
        assert_eq!(ids.sale_id.as_deref(), Some(PRODUCT));
        assert_eq!(ids.product_ids, vec![PRODUCT.to_string()]);
    }

    #[test]
    fn test_debt_without_items_rejected() {
        let err = validate_new_debt(&NewDebt::new()).unwrap_err();
        assert!(matches!(err, ValidationError::Required { ref field } if field == "items"));
    }

    #[test]
    fn test_debt_ok() {
        let debt = NewDebt::new().item(NewDebtItem::new(PRODUCT, 1.0, 10.0));
        let ids = validate_new_debt(&debt).unwrap();
        assert_eq!(ids.product_ids.len(), 1);
        assert!(ids.customer_id.is_none());
    }
}
