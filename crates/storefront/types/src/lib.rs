//! Storefront Types - Core domain model for the storefront daemon
//!
//! ## Key Concepts
//!
//! - **GlobalCategory / Category**: two-level browsing tree; every category
//!   belongs to exactly one global category
//! - **Product**: priced item in a category, addressed by its slug
//! - **User / Customer**: login identity and its one-to-one shopping profile
//! - **Cart / CartProduct**: a customer's open cart and its lines; totals are
//!   always the sum of the lines
//! - **Order**: a checked-out cart with delivery details and a status that
//!   only moves forward (new → confirmed → delivered)

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod account;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod ids;
pub mod money;
pub mod order;
pub mod password;
pub mod rating;
pub mod slug;

// Re-export main types
pub use account::{Customer, LoginForm, RegistrationForm, Session, User, ValidRegistration};
pub use cart::{Cart, CartProduct};
pub use catalog::{Category, GlobalCategory, NewProduct, Product};
pub use error::{ValidationError, ValidationResult};
pub use ids::{
    CartId, CartProductId, CategoryId, CustomerId, GlobalCategoryId, OrderId, ProductId,
    SessionToken, UserId,
};
pub use money::{Money, MoneyParseError};
pub use order::{Order, OrderForm, OrderStatus};
pub use rating::Rating;
pub use slug::slugify;
