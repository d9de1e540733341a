//! Catalog service: browsing and staff maintenance of the catalog

use super::cart::recalculate_cart;
use super::{ServiceError, ServiceResult};
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use storefront_types::{
    Cart, CartId, Category, Customer, GlobalCategory, GlobalCategoryId, NewProduct, Product,
};

/// Landing page contents
#[derive(Debug, Clone, Serialize)]
pub struct StorefrontIndex {
    pub products: Vec<Product>,
    pub global_categories: Vec<GlobalCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart: Option<Cart>,
}

/// A product with the category it is filed under
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub category: Category,
}

/// A global category with its categories and all of their products
#[derive(Debug, Clone, Serialize)]
pub struct GlobalCategoryDetail {
    pub global_category: GlobalCategory,
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
}

/// A category with its products
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDetail {
    pub category: Category,
    pub label: String,
    pub products: Vec<Product>,
}

/// Input for a new global category
#[derive(Debug, Clone, Deserialize)]
pub struct NewGlobalCategory {
    pub name: String,
}

/// Input for a new category
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub global_category_id: GlobalCategoryId,
    pub name: String,
}

/// Catalog reads and staff writes
pub struct CatalogService {
    storage: Arc<dyn Storage>,
}

impl CatalogService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Everything on the landing page; the cart only for a logged-in viewer
    pub async fn index(&self, viewer: Option<&Customer>) -> ServiceResult<StorefrontIndex> {
        let products = self.storage.list_products().await?;
        let global_categories = self.storage.list_global_categories().await?;
        let cart = match viewer {
            Some(customer) => self.storage.get_open_cart(&customer.id).await?,
            None => None,
        };

        Ok(StorefrontIndex {
            products,
            global_categories,
            cart,
        })
    }

    pub async fn list_products(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.storage.list_products().await?)
    }

    pub async fn list_global_categories(&self) -> ServiceResult<Vec<GlobalCategory>> {
        Ok(self.storage.list_global_categories().await?)
    }

    pub async fn product_detail(&self, slug: &str) -> ServiceResult<ProductDetail> {
        let product = self.product_by_slug(slug).await?;
        let category = self
            .storage
            .get_category(&product.category_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{}", product.category_id)))?;
        Ok(ProductDetail { product, category })
    }

    /// Look up the categories of a global category and collect their products
    pub async fn global_category_detail(&self, slug: &str) -> ServiceResult<GlobalCategoryDetail> {
        let global_category = self.global_by_slug(slug).await?;
        let categories = self
            .storage
            .list_categories_for_global(&global_category.id)
            .await?;
        let ids: Vec<_> = categories.iter().map(|c| c.id).collect();
        let products = self.storage.list_products_for_categories(&ids).await?;

        Ok(GlobalCategoryDetail {
            global_category,
            categories,
            products,
        })
    }

    pub async fn category_detail(&self, slug: &str) -> ServiceResult<CategoryDetail> {
        let category = self.category_by_slug(slug).await?;
        let global = self
            .storage
            .get_global_category(&category.global_category_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{}", category.global_category_id)))?;
        let products = self
            .storage
            .list_products_for_categories(&[category.id])
            .await?;

        Ok(CategoryDetail {
            label: category.label(&global),
            category,
            products,
        })
    }

    pub async fn create_global_category(
        &self,
        input: NewGlobalCategory,
    ) -> ServiceResult<GlobalCategory> {
        let global = GlobalCategory::new(&input.name)?;
        self.storage.insert_global_category(global.clone()).await?;
        tracing::info!(id = %global.id, slug = %global.slug, "Created global category");
        Ok(global)
    }

    pub async fn create_category(&self, input: NewCategory) -> ServiceResult<Category> {
        let category = Category::new(input.global_category_id, &input.name)?;
        if self
            .storage
            .get_global_category(&category.global_category_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!(
                "{}",
                category.global_category_id
            )));
        }
        self.storage.insert_category(category.clone()).await?;
        tracing::info!(id = %category.id, slug = %category.slug, "Created category");
        Ok(category)
    }

    pub async fn create_product(&self, input: NewProduct) -> ServiceResult<Product> {
        let product = Product::new(input)?;
        if self
            .storage
            .get_category(&product.category_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!("{}", product.category_id)));
        }
        self.storage.insert_product(product.clone()).await?;
        tracing::info!(
            id = %product.id,
            slug = %product.slug,
            price = %product.price,
            "Created product"
        );
        Ok(product)
    }

    /// Delete a global category with everything under it
    pub async fn delete_global_category(&self, slug: &str) -> ServiceResult<()> {
        let global = self.global_by_slug(slug).await?;
        let categories = self.storage.list_categories_for_global(&global.id).await?;
        let ids: Vec<_> = categories.iter().map(|c| c.id).collect();
        let products = self.storage.list_products_for_categories(&ids).await?;
        let carts = self.affected_carts(&products).await?;

        self.storage.delete_global_category(&global.id).await?;
        let recalculated = self.recalculate(carts).await?;

        tracing::info!(
            slug = %global.slug,
            categories = categories.len(),
            products = products.len(),
            carts = recalculated,
            "Deleted global category"
        );
        Ok(())
    }

    /// Delete a category with its products
    pub async fn delete_category(&self, slug: &str) -> ServiceResult<()> {
        let category = self.category_by_slug(slug).await?;
        let products = self
            .storage
            .list_products_for_categories(&[category.id])
            .await?;
        let carts = self.affected_carts(&products).await?;

        self.storage.delete_category(&category.id).await?;
        let recalculated = self.recalculate(carts).await?;

        tracing::info!(
            slug = %category.slug,
            products = products.len(),
            carts = recalculated,
            "Deleted category"
        );
        Ok(())
    }

    /// Delete a product and drop it from every cart
    pub async fn delete_product(&self, slug: &str) -> ServiceResult<()> {
        let product = self.product_by_slug(slug).await?;
        let carts = self.affected_carts(std::slice::from_ref(&product)).await?;

        self.storage.delete_product(&product.id).await?;
        let recalculated = self.recalculate(carts).await?;

        tracing::info!(slug = %product.slug, carts = recalculated, "Deleted product");
        Ok(())
    }

    async fn product_by_slug(&self, slug: &str) -> ServiceResult<Product> {
        self.storage
            .get_product_by_slug(slug)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product '{}'", slug)))
    }

    async fn category_by_slug(&self, slug: &str) -> ServiceResult<Category> {
        self.storage
            .get_category_by_slug(slug)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("category '{}'", slug)))
    }

    async fn global_by_slug(&self, slug: &str) -> ServiceResult<GlobalCategory> {
        self.storage
            .get_global_category_by_slug(slug)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("global category '{}'", slug)))
    }

    /// Open carts holding any of the products, once each
    async fn affected_carts(&self, products: &[Product]) -> ServiceResult<BTreeMap<CartId, Cart>> {
        let mut carts = BTreeMap::new();
        for product in products {
            for cart in self.storage.list_open_carts_with_product(&product.id).await? {
                carts.entry(cart.id).or_insert(cart);
            }
        }
        Ok(carts)
    }

    async fn recalculate(&self, carts: BTreeMap<CartId, Cart>) -> ServiceResult<usize> {
        let count = carts.len();
        for (_, mut cart) in carts {
            recalculate_cart(self.storage.as_ref(), &mut cart).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::services::cart::tests::{seed_customer, seed_product};
    use crate::services::CartService;
    use crate::storage::InMemoryStorage;
    use storefront_types::{CategoryId, Money, ValidationError};

    fn service() -> (Arc<dyn Storage>, CatalogService) {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::default());
        (storage.clone(), CatalogService::new(storage))
    }

    fn new_product(category_id: CategoryId, name: &str, price: i64) -> NewProduct {
        NewProduct {
            category_id,
            name: name.to_string(),
            description: "Something nice".to_string(),
            price: Money::from_minor(price),
            image: "products/item.png".to_string(),
            stars: None,
        }
    }

    #[tokio::test]
    async fn test_global_category_detail_collects_products() {
        let (_, catalog) = service();
        let electronics = catalog
            .create_global_category(NewGlobalCategory {
                name: "Electronics".into(),
            })
            .await
            .unwrap();
        let laptops = catalog
            .create_category(NewCategory {
                global_category_id: electronics.id,
                name: "Laptops".into(),
            })
            .await
            .unwrap();
        let phones = catalog
            .create_category(NewCategory {
                global_category_id: electronics.id,
                name: "Phones".into(),
            })
            .await
            .unwrap();
        catalog
            .create_product(new_product(laptops.id, "Ultrabook 13", 99_900))
            .await
            .unwrap();
        catalog
            .create_product(new_product(phones.id, "Pocket Phone", 49_900))
            .await
            .unwrap();

        let detail = catalog.global_category_detail("electronics").await.unwrap();
        assert_eq!(detail.categories.len(), 2);
        assert_eq!(detail.products.len(), 2);
        assert_eq!(detail.products[0].slug, "ultrabook-13");

        let phones_detail = catalog.category_detail("phones").await.unwrap();
        assert_eq!(phones_detail.label, "Electronics : Phones");
        assert_eq!(phones_detail.products.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_slugs_are_not_found() {
        let (_, catalog) = service();
        assert!(matches!(
            catalog.product_detail("missing").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            catalog.global_category_detail("missing").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            catalog.category_detail("missing").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_validates_and_detects_conflicts() {
        let (_, catalog) = service();
        catalog
            .create_global_category(NewGlobalCategory {
                name: "Books".into(),
            })
            .await
            .unwrap();

        assert!(matches!(
            catalog
                .create_global_category(NewGlobalCategory { name: "books".into() })
                .await,
            Err(ServiceError::Storage(StorageError::Conflict(_)))
        ));
        assert!(matches!(
            catalog
                .create_global_category(NewGlobalCategory { name: "  ".into() })
                .await,
            Err(ServiceError::Validation(ValidationError::Required { .. }))
        ));
        assert!(matches!(
            catalog
                .create_category(NewCategory {
                    global_category_id: GlobalCategoryId::generate(),
                    name: "Poetry".into(),
                })
                .await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            catalog
                .create_product(new_product(CategoryId::generate(), "Orphan", 100))
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_index_shows_cart_only_for_customers() {
        let (storage, catalog) = service();
        seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;
        let customer = seed_customer(storage.as_ref(), "alice").await;
        CartService::new(storage.clone())
            .add_product(&customer, "kettle")
            .await
            .unwrap();

        let anonymous = catalog.index(None).await.unwrap();
        assert!(anonymous.cart.is_none());
        assert_eq!(anonymous.products.len(), 1);
        assert_eq!(anonymous.global_categories.len(), 1);

        let index = catalog.index(Some(&customer)).await.unwrap();
        assert_eq!(index.cart.map(|c| c.final_amount), Some(1));
    }

    #[tokio::test]
    async fn test_delete_product_recalculates_open_carts() {
        let (storage, catalog) = service();
        seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;
        seed_product(storage.as_ref(), "Mug", Money::from_minor(350)).await;
        let customer = seed_customer(storage.as_ref(), "alice").await;
        let carts = CartService::new(storage.clone());
        carts.add_product(&customer, "kettle").await.unwrap();
        carts.add_product(&customer, "mug").await.unwrap();

        catalog.delete_product("kettle").await.unwrap();

        let stored = storage.get_open_cart(&customer.id).await.unwrap().unwrap();
        assert_eq!(stored.final_price, Money::from_minor(350));
        assert_eq!(stored.final_amount, 1);
        assert!(catalog.product_detail("kettle").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_global_category_empties_carts() {
        let (storage, catalog) = service();
        seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;
        let customer = seed_customer(storage.as_ref(), "alice").await;
        CartService::new(storage.clone())
            .add_product(&customer, "kettle")
            .await
            .unwrap();

        catalog.delete_global_category("home").await.unwrap();

        let stored = storage.get_open_cart(&customer.id).await.unwrap().unwrap();
        assert!(stored.is_empty());
        assert!(catalog.list_products().await.unwrap().is_empty());
        assert!(catalog.list_global_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_category_cascades_and_recalculates() {
        let (storage, catalog) = service();
        let kettle = seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;
        let home = storage.get_global_category_by_slug("home").await.unwrap().unwrap();
        let bathroom = catalog
            .create_category(NewCategory {
                global_category_id: home.id,
                name: "Bathroom".into(),
            })
            .await
            .unwrap();
        catalog
            .create_product(new_product(bathroom.id, "Towel", 900))
            .await
            .unwrap();

        let customer = seed_customer(storage.as_ref(), "alice").await;
        let carts = CartService::new(storage.clone());
        carts.add_product(&customer, "kettle").await.unwrap();
        let before = carts.add_product(&customer, "towel").await.unwrap();
        assert_eq!(before.cart.final_price, Money::from_minor(3400));

        catalog.delete_category("kitchen").await.unwrap();

        assert!(storage.get_category_by_slug("kitchen").await.unwrap().is_none());
        assert!(storage.get_product(&kettle.id).await.unwrap().is_none());
        assert!(catalog.product_detail("towel").await.is_ok());
        assert!(catalog.category_detail("bathroom").await.is_ok());

        let view = carts.view(&customer).await.unwrap();
        assert_eq!(view.cart.id, before.cart.id);
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].product.slug, "towel");
        assert_eq!(view.cart.final_price, Money::from_minor(900));
        assert_eq!(view.cart.final_amount, 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_category_is_not_found() {
        let (storage, catalog) = service();
        seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;

        assert!(matches!(
            catalog.delete_category("garden").await,
            Err(ServiceError::NotFound(_))
        ));
        catalog.delete_category("kitchen").await.unwrap();
        assert!(matches!(
            catalog.delete_category("kitchen").await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(catalog.list_global_categories().await.unwrap().len(), 1);
    }
}
