//! Orders placed from a cart

use crate::account::validate_phone;
use crate::error::{required_text, ValidationError, ValidationResult};
use crate::{CartId, CustomerId, OrderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const FIRST_NAME_MAX: usize = 50;
pub const ORDER_ADDRESS_MAX: usize = 100;

/// Fulfilment status of an order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    New,
    Confirmed,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "new" => Ok(OrderStatus::New),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(ValidationError::invalid(
                "status",
                format!("'{}'; expected one of: new, confirmed, delivered", other),
            )),
        }
    }
}

/// Checkout form
#[derive(Debug, Clone, Deserialize)]
pub struct OrderForm {
    pub first_name: String,
    pub address: String,
    pub phone: i64,
}

/// An order for the contents of one cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub cart_id: CartId,
    pub first_name: String,
    pub address: String,
    pub phone: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn place(customer_id: CustomerId, cart_id: CartId, form: OrderForm) -> ValidationResult<Self> {
        let first_name = required_text("first_name", &form.first_name, FIRST_NAME_MAX)?;
        let address = required_text("address", &form.address, ORDER_ADDRESS_MAX)?;
        let phone = validate_phone(form.phone)?;
        let now = Utc::now();

        Ok(Self {
            id: OrderId::generate(),
            customer_id,
            cart_id,
            first_name,
            address,
            phone,
            status: OrderStatus::New,
            created_at: now,
            updated_at: now,
        })
    }

    /// Move the order forward. Re-applying the current status is a no-op.
    pub fn advance_to(&mut self, next: OrderStatus) -> ValidationResult<bool> {
        if next == self.status {
            return Ok(false);
        }
        if next < self.status {
            return Err(ValidationError::StatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(true)
    }
}
