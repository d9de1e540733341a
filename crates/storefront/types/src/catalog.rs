//! Catalog types: global categories, categories and products
//!
//! Every catalog entity carries a slug derived from its name. The slug is
//! recomputed whenever the name is set, so it never drifts from the name.

use crate::error::{required_text, ValidationError, ValidationResult};
use crate::{slugify, CategoryId, GlobalCategoryId, Money, ProductId, Rating};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CATEGORY_NAME_MAX: usize = 100;
pub const PRODUCT_NAME_MAX: usize = 255;
pub const IMAGE_PATH_MAX: usize = 255;

fn slug_for(field: &'static str, name: &str) -> ValidationResult<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(ValidationError::invalid(
            field,
            format!("'{}' does not produce a usable slug", name),
        ));
    }
    Ok(slug)
}

/// Top-level grouping of categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalCategory {
    pub id: GlobalCategoryId,
    pub name: String,
    pub slug: String,
}

impl GlobalCategory {
    pub fn new(name: &str) -> ValidationResult<Self> {
        let name = required_text("name", name, CATEGORY_NAME_MAX)?;
        let slug = slug_for("name", &name)?;
        Ok(Self {
            id: GlobalCategoryId::generate(),
            name,
            slug,
        })
    }

    pub fn absolute_path(&self) -> String {
        format!("/api/v1/global-categories/{}", self.slug)
    }
}

/// A category under one global category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub global_category_id: GlobalCategoryId,
    pub name: String,
    pub slug: String,
}

impl Category {
    pub fn new(global_category_id: GlobalCategoryId, name: &str) -> ValidationResult<Self> {
        let name = required_text("name", name, CATEGORY_NAME_MAX)?;
        let slug = slug_for("name", &name)?;
        Ok(Self {
            id: CategoryId::generate(),
            global_category_id,
            name,
            slug,
        })
    }

    /// Label shown in listings, `"<global> : <category>"`
    pub fn label(&self, global: &GlobalCategory) -> String {
        format!("{} : {}", global.name, self.name)
    }

    pub fn absolute_path(&self) -> String {
        format!("/api/v1/categories/{}", self.slug)
    }
}

/// A product offered in a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Money,
    pub image: String,
    pub stars: Option<Rating>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a product
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub category_id: CategoryId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub image: String,
    #[serde(default)]
    pub stars: Option<Rating>,
}

impl Product {
    pub fn new(input: NewProduct) -> ValidationResult<Self> {
        let name = required_text("name", &input.name, PRODUCT_NAME_MAX)?;
        let slug = slug_for("name", &name)?;
        let description = input.description.trim();
        if description.is_empty() {
            return Err(ValidationError::Required {
                field: "description",
            });
        }
        if input.price > Money::MAX_PRICE {
            return Err(ValidationError::invalid(
                "price",
                format!("must not exceed {}", Money::MAX_PRICE),
            ));
        }
        let image = required_text("image", &input.image, IMAGE_PATH_MAX)?;

        Ok(Self {
            id: ProductId::generate(),
            category_id: input.category_id,
            name,
            slug,
            description: description.to_string(),
            price: input.price,
            image,
            stars: input.stars,
            created_at: Utc::now(),
        })
    }

    pub fn absolute_path(&self) -> String {
        format!("/api/v1/products/{}", self.slug)
    }
}
