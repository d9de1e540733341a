//! Cart service: the customer's open cart and its lines

use super::{ServiceError, ServiceResult};
use crate::storage::Storage;
use serde::Serialize;
use std::sync::Arc;
use storefront_types::{Cart, CartProduct, CartProductId, Customer, Money, Product};

/// Product fields shown next to a cart line
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub slug: String,
    pub name: String,
    pub price: Money,
    pub image: String,
    pub path: String,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            slug: product.slug.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            path: product.absolute_path(),
        }
    }
}

/// A cart line joined with its product
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartProduct,
    pub product: ProductSummary,
}

/// A cart with its lines in insertion order
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart: Cart,
    pub lines: Vec<CartLineView>,
}

/// Recompute a cart's totals from its stored lines and persist them.
///
/// Only totals are written, and only while the cart is open. A cart that was
/// ordered in the meantime keeps its stored totals and `cart` is reloaded.
pub(crate) async fn recalculate_cart(storage: &dyn Storage, cart: &mut Cart) -> ServiceResult<()> {
    let lines = storage.list_cart_lines(&cart.id).await?;
    cart.recalculate(&lines)?;
    let updated = storage
        .update_cart_totals(&cart.id, cart.final_price, cart.final_amount)
        .await?;
    if !updated {
        if let Some(stored) = storage.get_cart(&cart.id).await? {
            *cart = stored;
        }
    }
    Ok(())
}

/// Reject an edit whose resulting lines would not fit in a cart total
fn check_totals(cart: &Cart, lines: &[CartProduct]) -> ServiceResult<()> {
    let mut trial = cart.clone();
    trial.recalculate(lines)?;
    Ok(())
}

/// Cart operations for a logged-in customer
pub struct CartService {
    storage: Arc<dyn Storage>,
}

impl CartService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The customer's open cart, created when there is none
    pub async fn current_cart(&self, customer: &Customer) -> ServiceResult<Cart> {
        if let Some(cart) = self.storage.get_open_cart(&customer.id).await? {
            return Ok(cart);
        }

        let cart = Cart::open(customer.id);
        self.storage.create_cart(cart.clone()).await?;
        tracing::debug!(cart_id = %cart.id, customer_id = %customer.id, "Opened cart");
        Ok(cart)
    }

    /// Put a product in the cart. A product already in the cart is left as it is.
    pub async fn add_product(&self, customer: &Customer, slug: &str) -> ServiceResult<CartView> {
        let product = self
            .storage
            .get_product_by_slug(slug)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product '{}'", slug)))?;

        let mut cart = self.current_cart(customer).await?;
        let candidate = CartProduct::new(&cart, &product);
        let mut lines = self.storage.list_cart_lines(&cart.id).await?;
        if !lines.iter().any(|line| line.product_id == product.id) {
            lines.push(candidate.clone());
            check_totals(&cart, &lines)?;
        }

        let (line, created) = self.storage.add_cart_line_if_absent(candidate).await?;
        recalculate_cart(self.storage.as_ref(), &mut cart).await?;

        tracing::info!(
            cart_id = %cart.id,
            line_id = %line.id,
            product = %product.slug,
            created,
            "Added product to cart"
        );
        self.render(cart).await
    }

    /// Set the amount of one of the customer's lines
    pub async fn change_amount(
        &self,
        customer: &Customer,
        line_id: &CartProductId,
        amount: u32,
    ) -> ServiceResult<CartView> {
        let mut cart = self.current_cart(customer).await?;
        let mut line = self.owned_line(customer, &cart, line_id).await?;
        let product = self
            .storage
            .get_product(&line.product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{}", line.product_id)))?;

        line.set_amount(amount, product.price)?;
        let lines: Vec<CartProduct> = self
            .storage
            .list_cart_lines(&cart.id)
            .await?
            .into_iter()
            .map(|stored| if stored.id == line.id { line.clone() } else { stored })
            .collect();
        check_totals(&cart, &lines)?;

        self.storage.update_cart_line(line.clone()).await?;
        recalculate_cart(self.storage.as_ref(), &mut cart).await?;

        tracing::info!(
            cart_id = %cart.id,
            line_id = %line.id,
            amount,
            total = %line.total_price,
            "Changed cart line amount"
        );
        self.render(cart).await
    }

    /// Remove one of the customer's lines
    pub async fn remove_line(
        &self,
        customer: &Customer,
        line_id: &CartProductId,
    ) -> ServiceResult<CartView> {
        let mut cart = self.current_cart(customer).await?;
        let line = self.owned_line(customer, &cart, line_id).await?;

        self.storage.delete_cart_line(&line.id).await?;
        recalculate_cart(self.storage.as_ref(), &mut cart).await?;

        tracing::info!(cart_id = %cart.id, line_id = %line.id, "Removed cart line");
        self.render(cart).await
    }

    /// The customer's open cart with its lines
    pub async fn view(&self, customer: &Customer) -> ServiceResult<CartView> {
        let cart = self.current_cart(customer).await?;
        self.render(cart).await
    }

    /// Join a cart's lines with their products
    pub async fn render(&self, cart: Cart) -> ServiceResult<CartView> {
        let mut lines = Vec::new();
        for line in self.storage.list_cart_lines(&cart.id).await? {
            // a product deleted mid-request takes its lines with it
            if let Some(product) = self.storage.get_product(&line.product_id).await? {
                lines.push(CartLineView {
                    product: ProductSummary::from(&product),
                    line,
                });
            }
        }
        Ok(CartView { cart, lines })
    }

    /// A line of the customer's open cart; anything else is reported as missing
    async fn owned_line(
        &self,
        customer: &Customer,
        cart: &Cart,
        line_id: &CartProductId,
    ) -> ServiceResult<CartProduct> {
        match self.storage.get_cart_line(line_id).await? {
            Some(line) if line.cart_id == cart.id && line.customer_id == customer.id => Ok(line),
            _ => Err(ServiceError::NotFound(format!("cart line {}", line_id))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use storefront_types::{Category, GlobalCategory, NewProduct, User, ValidationError};

    pub(crate) async fn seed_product(storage: &dyn Storage, name: &str, price: Money) -> Product {
        let global = match storage.get_global_category_by_slug("home").await.unwrap() {
            Some(global) => global,
            None => {
                let global = GlobalCategory::new("Home").unwrap();
                storage.insert_global_category(global.clone()).await.unwrap();
                global
            }
        };
        let category = match storage.get_category_by_slug("kitchen").await.unwrap() {
            Some(category) => category,
            None => {
                let category = Category::new(global.id, "Kitchen").unwrap();
                storage.insert_category(category.clone()).await.unwrap();
                category
            }
        };
        let product = Product::new(NewProduct {
            category_id: category.id,
            name: name.to_string(),
            description: format!("A {}", name),
            price,
            image: format!("{}.png", name),
            stars: None,
        })
        .unwrap();
        storage.insert_product(product.clone()).await.unwrap();
        product
    }

    pub(crate) async fn seed_customer(storage: &dyn Storage, username: &str) -> Customer {
        let user = User::new(username.to_string(), "sha256$1$00$00".to_string(), false);
        let customer = Customer::for_user(user.id, Some(1), Some("1 Main St".to_string()));
        storage
            .create_account(user, customer.clone())
            .await
            .unwrap();
        customer
    }

    fn service() -> (Arc<dyn Storage>, CartService) {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::default());
        (storage.clone(), CartService::new(storage))
    }

    #[tokio::test]
    async fn test_current_cart_is_reused() {
        let (storage, carts) = service();
        let customer = seed_customer(storage.as_ref(), "alice").await;

        let first = carts.current_cart(&customer).await.unwrap();
        let second = carts.current_cart(&customer).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.is_empty());
    }

    #[tokio::test]
    async fn test_add_product_twice_keeps_one_line() {
        let (storage, carts) = service();
        let customer = seed_customer(storage.as_ref(), "alice").await;
        seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;

        carts.add_product(&customer, "kettle").await.unwrap();
        let view = carts.add_product(&customer, "kettle").await.unwrap();

        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].line.amount, 1);
        assert_eq!(view.cart.final_amount, 1);
        assert_eq!(view.cart.final_price, Money::from_minor(2500));
    }

    #[tokio::test]
    async fn test_change_amount_recalculates_totals() {
        let (storage, carts) = service();
        let customer = seed_customer(storage.as_ref(), "alice").await;
        seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;
        seed_product(storage.as_ref(), "Mug", Money::from_minor(350)).await;

        carts.add_product(&customer, "kettle").await.unwrap();
        let view = carts.add_product(&customer, "mug").await.unwrap();
        let mug_line = view.lines[1].line.id;

        let view = carts.change_amount(&customer, &mug_line, 4).await.unwrap();
        assert_eq!(view.lines[1].line.total_price, Money::from_minor(1400));
        assert_eq!(view.cart.final_amount, 5);
        assert_eq!(view.cart.final_price, Money::from_minor(3900));

        let err = carts.change_amount(&customer, &mug_line, 0).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_remove_line_recalculates_totals() {
        let (storage, carts) = service();
        let customer = seed_customer(storage.as_ref(), "alice").await;
        seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;

        let view = carts.add_product(&customer, "kettle").await.unwrap();
        let view = carts
            .remove_line(&customer, &view.lines[0].line.id)
            .await
            .unwrap();
        assert!(view.lines.is_empty());
        assert_eq!(view.cart.final_price, Money::ZERO);
        assert!(view.cart.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_line_is_not_found() {
        let (storage, carts) = service();
        let alice = seed_customer(storage.as_ref(), "alice").await;
        let bob = seed_customer(storage.as_ref(), "bob").await;
        seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;

        let view = carts.add_product(&alice, "kettle").await.unwrap();
        let line_id = view.lines[0].line.id;

        assert!(matches!(
            carts.change_amount(&bob, &line_id, 3).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            carts.remove_line(&bob, &line_id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(carts.view(&alice).await.unwrap().lines.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_product_slug() {
        let (storage, carts) = service();
        let customer = seed_customer(storage.as_ref(), "alice").await;
        assert!(matches!(
            carts.add_product(&customer, "nope").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_change_amount_rejects_overflowing_cart_total() {
        let (storage, carts) = service();
        let customer = seed_customer(storage.as_ref(), "alice").await;
        seed_product(storage.as_ref(), "Piano", Money::MAX_PRICE).await;
        seed_product(storage.as_ref(), "Organ", Money::MAX_PRICE).await;

        carts.add_product(&customer, "piano").await.unwrap();
        let view = carts.add_product(&customer, "organ").await.unwrap();
        let piano = view.lines[0].line.id;
        let organ = view.lines[1].line.id;

        // a single line may not exceed the largest total either
        assert!(matches!(
            carts.change_amount(&customer, &piano, 900_000_000).await,
            Err(ServiceError::Validation(_))
        ));

        let view = carts.change_amount(&customer, &piano, 6_000_000).await.unwrap();
        let before = view.cart.clone();
        let err = carts
            .change_amount(&customer, &organ, 6_000_000)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::Invalid { field: "cart", .. })
        ));

        let view = carts.view(&customer).await.unwrap();
        assert_eq!(view.cart, before);
        assert_eq!(view.lines[1].line.amount, 1);
    }
}
