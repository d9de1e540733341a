//! Checkout service: turning the open cart into an order

use super::cart::{recalculate_cart, CartService, CartView};
use super::{ServiceError, ServiceResult};
use crate::storage::Storage;
use serde::Serialize;
use std::sync::Arc;
use storefront_types::{Customer, Order, OrderForm, OrderId, OrderStatus, User, ValidationError};

/// An order with the cart it was placed from
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub cart: CartView,
}

/// Checkout and order management
pub struct CheckoutService {
    storage: Arc<dyn Storage>,
    carts: Arc<CartService>,
}

impl CheckoutService {
    pub fn new(storage: Arc<dyn Storage>, carts: Arc<CartService>) -> Self {
        Self { storage, carts }
    }

    /// Place an order for the customer's open cart
    pub async fn checkout(&self, customer: &Customer, form: OrderForm) -> ServiceResult<Order> {
        let mut cart = self.carts.current_cart(customer).await?;
        recalculate_cart(self.storage.as_ref(), &mut cart).await?;
        if cart.is_empty() {
            return Err(ValidationError::invalid("cart", "is empty").into());
        }

        let order = Order::place(customer.id, cart.id, form)?;
        cart.ordered = true;
        self.storage.place_order(order.clone(), cart.clone()).await?;

        tracing::info!(
            order_id = %order.id,
            cart_id = %cart.id,
            customer_id = %customer.id,
            total = %cart.final_price,
            items = cart.final_amount,
            "Order placed"
        );
        Ok(order)
    }

    /// An order as seen by its owner or by staff; anyone else gets NotFound
    pub async fn order_detail(
        &self,
        user: &User,
        customer: &Customer,
        order_id: &OrderId,
    ) -> ServiceResult<OrderDetail> {
        let order = self
            .storage
            .get_order(order_id)
            .await?
            .filter(|order| user.is_staff || order.customer_id == customer.id)
            .ok_or_else(|| ServiceError::NotFound(format!("{}", order_id)))?;

        let cart = self
            .storage
            .get_cart(&order.cart_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{}", order.cart_id)))?;
        let cart = self.carts.render(cart).await?;

        Ok(OrderDetail { order, cart })
    }

    /// All orders, newest first
    pub async fn list_orders(&self) -> ServiceResult<Vec<Order>> {
        Ok(self.storage.list_orders().await?)
    }

    /// Move an order forward to `status`
    pub async fn set_status(&self, order_id: &OrderId, status: OrderStatus) -> ServiceResult<Order> {
        let mut order = self
            .storage
            .get_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{}", order_id)))?;

        let from = order.status;
        if order.advance_to(status)? {
            self.storage.update_order(order.clone()).await?;
            tracing::info!(order_id = %order.id, %from, to = %status, "Order status changed");
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::services::cart::tests::{seed_customer, seed_product};
    use crate::services::CatalogService;
    use crate::storage::InMemoryStorage;
    use storefront_types::Money;

    fn service() -> (Arc<dyn Storage>, Arc<CartService>, CheckoutService) {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::default());
        let carts = Arc::new(CartService::new(storage.clone()));
        (
            storage.clone(),
            carts.clone(),
            CheckoutService::new(storage, carts),
        )
    }

    fn form() -> OrderForm {
        OrderForm {
            first_name: "Alice".to_string(),
            address: "12 Market St".to_string(),
            phone: 5550100,
        }
    }

    fn staff() -> User {
        User::new("admin".to_string(), String::new(), true)
    }

    #[tokio::test]
    async fn test_empty_cart_cannot_check_out() {
        let (storage, _, checkout) = service();
        let customer = seed_customer(storage.as_ref(), "alice").await;
        assert!(matches!(
            checkout.checkout(&customer, form()).await,
            Err(ServiceError::Validation(ValidationError::Invalid { field: "cart", .. }))
        ));
    }

    #[tokio::test]
    async fn test_checkout_closes_cart() {
        let (storage, carts, checkout) = service();
        let customer = seed_customer(storage.as_ref(), "alice").await;
        seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;
        let before = carts.add_product(&customer, "kettle").await.unwrap();

        let order = checkout.checkout(&customer, form()).await.unwrap();
        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.cart_id, before.cart.id);

        let ordered = storage.get_cart(&before.cart.id).await.unwrap().unwrap();
        assert!(ordered.ordered);
        assert_eq!(ordered.final_price, Money::from_minor(2500));

        let fresh = carts.current_cart(&customer).await.unwrap();
        assert_ne!(fresh.id, before.cart.id);
        assert!(fresh.is_empty());
    }

    #[tokio::test]
    async fn test_order_detail_visibility() {
        let (storage, carts, checkout) = service();
        let alice = seed_customer(storage.as_ref(), "alice").await;
        let bob = seed_customer(storage.as_ref(), "bob").await;
        seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;
        carts.add_product(&alice, "kettle").await.unwrap();
        let order = checkout.checkout(&alice, form()).await.unwrap();

        let alice_user = storage.get_user(&alice.user_id).await.unwrap().unwrap();
        let bob_user = storage.get_user(&bob.user_id).await.unwrap().unwrap();

        let detail = checkout
            .order_detail(&alice_user, &alice, &order.id)
            .await
            .unwrap();
        assert_eq!(detail.cart.lines.len(), 1);
        assert_eq!(detail.cart.cart.final_amount, 1);

        assert!(matches!(
            checkout.order_detail(&bob_user, &bob, &order.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(checkout.order_detail(&staff(), &bob, &order.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_status_moves_forward_only() {
        let (storage, carts, checkout) = service();
        let customer = seed_customer(storage.as_ref(), "alice").await;
        seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;
        carts.add_product(&customer, "kettle").await.unwrap();
        let order = checkout.checkout(&customer, form()).await.unwrap();

        let confirmed = checkout
            .set_status(&order.id, OrderStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);

        assert!(matches!(
            checkout.set_status(&order.id, OrderStatus::New).await,
            Err(ServiceError::Validation(ValidationError::StatusTransition { .. }))
        ));

        let delivered = checkout
            .set_status(&order.id, OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert_eq!(checkout.list_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ordered_cart_keeps_totals_after_product_delete() {
        let (storage, carts, checkout) = service();
        let catalog = CatalogService::new(storage.clone());
        let alice = seed_customer(storage.as_ref(), "alice").await;
        let bob = seed_customer(storage.as_ref(), "bob").await;
        seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;
        seed_product(storage.as_ref(), "Mug", Money::from_minor(350)).await;

        carts.add_product(&alice, "kettle").await.unwrap();
        carts.add_product(&alice, "mug").await.unwrap();
        let order = checkout.checkout(&alice, form()).await.unwrap();
        carts.add_product(&bob, "kettle").await.unwrap();

        catalog.delete_product("kettle").await.unwrap();

        let ordered = storage.get_cart(&order.cart_id).await.unwrap().unwrap();
        assert!(ordered.ordered);
        assert_eq!(ordered.final_price, Money::from_minor(2850));
        assert_eq!(ordered.final_amount, 2);

        let open = carts.view(&bob).await.unwrap();
        assert!(open.lines.is_empty());
        assert!(open.cart.is_empty());
    }

    #[tokio::test]
    async fn test_stale_recalculation_cannot_reopen_ordered_cart() {
        let (storage, carts, checkout) = service();
        let catalog = CatalogService::new(storage.clone());
        let customer = seed_customer(storage.as_ref(), "alice").await;
        seed_product(storage.as_ref(), "Kettle", Money::from_minor(2500)).await;
        carts.add_product(&customer, "kettle").await.unwrap();

        // snapshot taken before the checkout lands
        let mut stale = carts.current_cart(&customer).await.unwrap();
        let order = checkout.checkout(&customer, form()).await.unwrap();
        assert_eq!(order.cart_id, stale.id);

        catalog.delete_product("kettle").await.unwrap();
        recalculate_cart(storage.as_ref(), &mut stale).await.unwrap();

        assert!(stale.ordered);
        assert_eq!(stale.final_price, Money::from_minor(2500));
        let stored = storage.get_cart(&order.cart_id).await.unwrap().unwrap();
        assert!(stored.ordered);
        assert_eq!(stored.final_price, Money::from_minor(2500));
        assert_eq!(stored.final_amount, 1);

        let open = carts.current_cart(&customer).await.unwrap();
        assert_ne!(open.id, order.cart_id);

        let again = Order::place(customer.id, stale.id, form()).unwrap();
        assert!(matches!(
            storage.place_order(again, stale.clone()).await,
            Err(StorageError::Conflict(_))
        ));
        assert_eq!(checkout.list_orders().await.unwrap().len(), 1);
    }
}
