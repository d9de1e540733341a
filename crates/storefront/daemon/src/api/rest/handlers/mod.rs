//! API request handlers

mod accounts;
mod admin;
mod cart;
mod catalog;
mod health;

pub use accounts::*;
pub use admin::*;
pub use cart::*;
pub use catalog::*;
pub use health::*;
