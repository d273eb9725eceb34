use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reviews::Review;
use crate::CoreError;

/// Largest value a `NUMERIC(12,2)` money column holds: 9,999,999,999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Money columns keep cents.
const MONEY_SCALE: u32 = 2;

/// A catalog product together with its derived rating aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub stock: i32,
    pub photos: Vec<String>,
    /// Mean of all review ratings, `0` when there are none.
    pub rating: Decimal,
    pub num_reviews: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product with its embedded review collection, as shown on a detail page.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub reviews: Vec<Review>,
}

/// Fields required to create a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl NewProduct {
    /// Trims text fields in place and rejects invalid values.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for blank text fields, a negative
    /// stock, or a price that is negative, above [`MAX_AMOUNT`], or finer
    /// than a cent.
    pub fn normalize(&mut self) -> Result<(), CoreError> {
        self.name = self.name.trim().to_string();
        self.description = self.description.trim().to_string();
        self.category = self.category.trim().to_string();

        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        require_text("category", &self.category)?;
        validate_price(self.price)?;
        validate_stock(self.stock)
    }
}

/// Sparse product update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    /// Photos to attach. Appended unless `replace_photos` is set.
    pub photos: Option<Vec<String>>,
    #[serde(default)]
    pub replace_photos: bool,
}

impl ProductPatch {
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if a provided field is invalid.
    pub fn normalize(&mut self) -> Result<(), CoreError> {
        for (field, value) in [
            ("name", &mut self.name),
            ("description", &mut self.description),
            ("category", &mut self.category),
        ] {
            if let Some(v) = value {
                *v = v.trim().to_string();
                require_text(field, v)?;
            }
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.photos.is_none()
    }
}

fn require_text(field: &str, value: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> Result<(), CoreError> {
    if price.is_sign_negative() {
        return Err(CoreError::Validation(format!(
            "price must not be negative, got {price}"
        )));
    }
    if price > MAX_AMOUNT {
        return Err(CoreError::Validation(format!(
            "price must not exceed {MAX_AMOUNT}, got {price}"
        )));
    }
    if price.normalize().scale() > MONEY_SCALE {
        return Err(CoreError::Validation(format!(
            "price must have at most {MONEY_SCALE} decimal places, got {price}"
        )));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> Result<(), CoreError> {
    if stock < 0 {
        return Err(CoreError::Validation(format!(
            "stock must not be negative, got {stock}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product() -> NewProduct {
        NewProduct {
            name: "  Trail Runner 3 ".to_string(),
            description: "Lightweight trail shoe".to_string(),
            category: "Shoes".to_string(),
            price: Decimal::new(12999, 2),
            stock: 5,
            photos: vec![],
        }
    }

    #[test]
    fn normalize_trims_name() {
        let mut p = new_product();
        p.normalize().unwrap();
        assert_eq!(p.name, "Trail Runner 3");
    }

    #[test]
    fn normalize_rejects_blank_category() {
        let mut p = new_product();
        p.category = " ".to_string();
        let err = p.normalize().unwrap_err();
        assert_eq!(err.to_string(), "validation failed: category is required");
    }

    #[test]
    fn normalize_rejects_negative_price() {
        let mut p = new_product();
        p.price = Decimal::new(-1, 2);
        assert!(matches!(p.normalize(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn normalize_rejects_negative_stock() {
        let mut p = new_product();
        p.stock = -3;
        assert!(p.normalize().unwrap_err().to_string().contains("stock"));
    }

    #[test]
    fn zero_price_is_allowed() {
        let mut p = new_product();
        p.price = Decimal::ZERO;
        assert!(p.normalize().is_ok());
    }

    #[test]
    fn normalize_rejects_price_above_column_range() {
        let mut p = new_product();
        p.price = MAX_AMOUNT;
        assert!(p.normalize().is_ok());

        p.price = MAX_AMOUNT + Decimal::new(1, 2);
        let err = p.normalize().unwrap_err();
        assert!(err.to_string().contains("must not exceed 9999999999.99"));
    }

    #[test]
    fn normalize_rejects_sub_cent_price() {
        let mut p = new_product();
        p.price = Decimal::new(19_999, 3);
        let err = p.normalize().unwrap_err();
        assert!(err.to_string().contains("at most 2 decimal places"));
    }

    #[test]
    fn trailing_zeros_do_not_count_as_precision() {
        let mut p = new_product();
        p.price = Decimal::new(19_900, 3);
        assert!(p.normalize().is_ok());
    }

    #[test]
    fn patch_rejects_out_of_range_price() {
        let mut patch = ProductPatch {
            price: Some(Decimal::new(100_000_000_000_000, 2)),
            ..ProductPatch::default()
        };
        assert!(matches!(patch.normalize(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn patch_is_empty_by_default() {
        assert!(ProductPatch::default().is_empty());
    }

    #[test]
    fn patch_validates_only_provided_fields() {
        let mut patch = ProductPatch {
            stock: Some(10),
            ..ProductPatch::default()
        };
        assert!(patch.normalize().is_ok());

        patch.name = Some("   ".to_string());
        assert!(patch.normalize().is_err());
    }
}
