//! Shopping carts and their lines

use crate::error::{ValidationError, ValidationResult};
use crate::{CartId, CartProductId, CustomerId, Money, Product, ProductId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer's cart. Totals are derived from the lines by [`Cart::recalculate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub owner: CustomerId,
    pub final_price: Money,
    pub final_amount: u32,
    pub ordered: bool,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn open(owner: CustomerId) -> Self {
        Self {
            id: CartId::generate(),
            owner,
            final_price: Money::ZERO,
            final_amount: 0,
            ordered: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.final_amount == 0
    }

    /// Recompute totals from the given lines; lines of other carts are ignored.
    ///
    /// Totals are left untouched when the sum would exceed [`Money::MAX_TOTAL`]
    /// or the item count would overflow.
    pub fn recalculate<'a>(
        &mut self,
        lines: impl IntoIterator<Item = &'a CartProduct>,
    ) -> ValidationResult<()> {
        let too_large = || ValidationError::invalid("cart", "total is too large");
        let mut price = Money::ZERO;
        let mut amount = 0u32;
        for line in lines.into_iter().filter(|line| line.cart_id == self.id) {
            price = price
                .checked_add(line.total_price)
                .filter(Money::is_valid_total)
                .ok_or_else(too_large)?;
            amount = amount.checked_add(line.amount).ok_or_else(too_large)?;
        }
        self.final_price = price;
        self.final_amount = amount;
        Ok(())
    }
}

/// One product in a cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: CartProductId,
    pub customer_id: CustomerId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub amount: u32,
    pub total_price: Money,
}

impl CartProduct {
    /// A fresh line holds a single unit at the product's price.
    pub fn new(cart: &Cart, product: &Product) -> Self {
        Self {
            id: CartProductId::generate(),
            customer_id: cart.owner,
            cart_id: cart.id,
            product_id: product.id,
            amount: 1,
            total_price: product.price,
        }
    }

    pub fn set_amount(&mut self, amount: u32, unit_price: Money) -> ValidationResult<()> {
        if amount == 0 {
            return Err(ValidationError::invalid("amount", "must be at least 1"));
        }
        let total = unit_price
            .checked_mul(amount)
            .filter(Money::is_valid_total)
            .ok_or_else(|| ValidationError::invalid("amount", "total price is too large"))?;
        self.amount = amount;
        self.total_price = total;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CategoryId, NewProduct};

    fn product(price_minor: i64) -> Product {
        Product::new(NewProduct {
            category_id: CategoryId::generate(),
            name: format!("Item {}", price_minor),
            description: "desc".to_string(),
            price: Money::from_minor(price_minor),
            image: "img.png".to_string(),
            stars: None,
        })
        .unwrap()
    }

    #[test]
    fn test_new_line_defaults() {
        let cart = Cart::open(CustomerId::generate());
        let line = CartProduct::new(&cart, &product(450));
        assert_eq!(line.amount, 1);
        assert_eq!(line.total_price, Money::from_minor(450));
        assert_eq!(line.customer_id, cart.owner);
    }

    #[test]
    fn test_recalculate_sums_lines() {
        let mut cart = Cart::open(CustomerId::generate());
        let mut a = CartProduct::new(&cart, &product(250));
        a.set_amount(3, Money::from_minor(250)).unwrap();
        let b = CartProduct::new(&cart, &product(1000));

        let other_cart = Cart::open(cart.owner);
        let foreign = CartProduct::new(&other_cart, &product(9999));

        cart.recalculate([&a, &b, &foreign]).unwrap();
        assert_eq!(cart.final_price, Money::from_minor(1750));
        assert_eq!(cart.final_amount, 4);
        assert!(!cart.is_empty());

        cart.recalculate(std::iter::empty()).unwrap();
        assert_eq!(cart.final_price, Money::ZERO);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_amount_rejects_zero() {
        let cart = Cart::open(CustomerId::generate());
        let mut line = CartProduct::new(&cart, &product(100));
        assert!(line.set_amount(0, Money::from_minor(100)).is_err());
        assert_eq!(line.amount, 1);
    }

    #[test]
    fn test_set_amount_bounds_line_total() {
        let cart = Cart::open(CustomerId::generate());
        let mut line = CartProduct::new(&cart, &product(Money::MAX_PRICE.minor()));
        // fits in i64 but exceeds the largest total
        assert!(line.set_amount(900_000_000, Money::MAX_PRICE).is_err());
        assert_eq!(line.total_price, Money::MAX_PRICE);
    }

    #[test]
    fn test_recalculate_rejects_overflowing_total() {
        let mut cart = Cart::open(CustomerId::generate());
        let mut lines = Vec::new();
        for _ in 0..2 {
            let mut line = CartProduct::new(&cart, &product(Money::MAX_PRICE.minor()));
            line.set_amount(6_000_000, Money::MAX_PRICE).unwrap();
            lines.push(line);
        }

        cart.recalculate(&lines[..1]).unwrap();
        let before = cart.clone();
        let err = cart.recalculate(&lines).unwrap_err();
        assert_eq!(
            err,
            ValidationError::invalid("cart", "total is too large")
        );
        assert_eq!(cart, before);
    }
}
