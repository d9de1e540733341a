//! In-memory storage implementation
//!
//! Multi-collection writes take their locks in declaration order (catalog,
//! accounts, carts, orders) so they never deadlock against each other.

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use storefront_types::{
    Cart, CartId, CartProduct, CartProductId, Category, CategoryId, Customer, CustomerId,
    GlobalCategory, GlobalCategoryId, Money, Order, OrderId, Product, ProductId, Session,
    SessionToken, User, UserId,
};
use tokio::sync::RwLock;

/// In-memory storage for development and testing
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    global_categories: Arc<RwLock<HashMap<GlobalCategoryId, GlobalCategory>>>,
    categories: Arc<RwLock<HashMap<CategoryId, Category>>>,
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
    users: Arc<RwLock<HashMap<UserId, User>>>,
    customers: Arc<RwLock<HashMap<CustomerId, Customer>>>,
    sessions: Arc<RwLock<HashMap<SessionToken, Session>>>,
    carts: Arc<RwLock<HashMap<CartId, Cart>>>,
    cart_lines: Arc<RwLock<Vec<CartProduct>>>,
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_name<T: Clone>(items: impl Iterator<Item = T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by(|a, b| name(a).cmp(name(b)));
    items
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

impl Storage for InMemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl CatalogStorage for InMemoryStorage {
    async fn insert_global_category(&self, global: GlobalCategory) -> StorageResult<()> {
        let mut globals = self.global_categories.write().await;
        if globals.values().any(|g| g.slug == global.slug) {
            return Err(StorageError::Conflict(format!(
                "global category slug '{}' already exists",
                global.slug
            )));
        }
        globals.insert(global.id, global);
        Ok(())
    }

    async fn get_global_category_by_slug(&self, slug: &str) -> StorageResult<Option<GlobalCategory>> {
        let globals = self.global_categories.read().await;
        Ok(globals.values().find(|g| g.slug == slug).cloned())
    }

    async fn get_global_category(&self, id: &GlobalCategoryId) -> StorageResult<Option<GlobalCategory>> {
        let globals = self.global_categories.read().await;
        Ok(globals.get(id).cloned())
    }

    async fn list_global_categories(&self) -> StorageResult<Vec<GlobalCategory>> {
        let globals = self.global_categories.read().await;
        Ok(sorted_by_name(globals.values().cloned(), |g| g.name.as_str()))
    }

    async fn delete_global_category(&self, id: &GlobalCategoryId) -> StorageResult<bool> {
        let mut globals = self.global_categories.write().await;
        let mut categories = self.categories.write().await;
        let mut products = self.products.write().await;
        let mut lines = self.cart_lines.write().await;

        if globals.remove(id).is_none() {
            return Ok(false);
        }
        let category_ids: HashSet<CategoryId> = categories
            .values()
            .filter(|c| &c.global_category_id == id)
            .map(|c| c.id)
            .collect();
        categories.retain(|cid, _| !category_ids.contains(cid));

        let product_ids: HashSet<ProductId> = products
            .values()
            .filter(|p| category_ids.contains(&p.category_id))
            .map(|p| p.id)
            .collect();
        products.retain(|pid, _| !product_ids.contains(pid));
        lines.retain(|line| !product_ids.contains(&line.product_id));
        Ok(true)
    }

    async fn insert_category(&self, category: Category) -> StorageResult<()> {
        let globals = self.global_categories.read().await;
        let mut categories = self.categories.write().await;
        if !globals.contains_key(&category.global_category_id) {
            return Err(StorageError::NotFound(format!(
                "global category {}",
                category.global_category_id
            )));
        }
        if categories.values().any(|c| c.slug == category.slug) {
            return Err(StorageError::Conflict(format!(
                "category slug '{}' already exists",
                category.slug
            )));
        }
        categories.insert(category.id, category);
        Ok(())
    }

    async fn get_category_by_slug(&self, slug: &str) -> StorageResult<Option<Category>> {
        let categories = self.categories.read().await;
        Ok(categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn get_category(&self, id: &CategoryId) -> StorageResult<Option<Category>> {
        let categories = self.categories.read().await;
        Ok(categories.get(id).cloned())
    }

    async fn list_categories_for_global(&self, id: &GlobalCategoryId) -> StorageResult<Vec<Category>> {
        let categories = self.categories.read().await;
        Ok(sorted_by_name(
            categories
                .values()
                .filter(|c| &c.global_category_id == id)
                .cloned(),
            |c| c.name.as_str(),
        ))
    }

    async fn count_categories(&self) -> StorageResult<usize> {
        Ok(self.categories.read().await.len())
    }

    async fn delete_category(&self, id: &CategoryId) -> StorageResult<bool> {
        let mut categories = self.categories.write().await;
        let mut products = self.products.write().await;
        let mut lines = self.cart_lines.write().await;

        if categories.remove(id).is_none() {
            return Ok(false);
        }
        let product_ids: HashSet<ProductId> = products
            .values()
            .filter(|p| &p.category_id == id)
            .map(|p| p.id)
            .collect();
        products.retain(|pid, _| !product_ids.contains(pid));
        lines.retain(|line| !product_ids.contains(&line.product_id));
        Ok(true)
    }

    async fn insert_product(&self, product: Product) -> StorageResult<()> {
        let categories = self.categories.read().await;
        let mut products = self.products.write().await;
        if !categories.contains_key(&product.category_id) {
            return Err(StorageError::NotFound(format!(
                "category {}",
                product.category_id
            )));
        }
        if products.values().any(|p| p.slug == product.slug) {
            return Err(StorageError::Conflict(format!(
                "product slug '{}' already exists",
                product.slug
            )));
        }
        products.insert(product.id, product);
        Ok(())
    }

    async fn get_product_by_slug(&self, slug: &str) -> StorageResult<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.values().find(|p| p.slug == slug).cloned())
    }

    async fn get_product(&self, id: &ProductId) -> StorageResult<Option<Product>> {
        let products = self.products.read().await;
        Ok(products.get(id).cloned())
    }

    async fn list_products(&self) -> StorageResult<Vec<Product>> {
        let products = self.products.read().await;
        Ok(sorted_by_name(products.values().cloned(), |p| p.name.as_str()))
    }

    async fn list_products_for_categories(&self, ids: &[CategoryId]) -> StorageResult<Vec<Product>> {
        let products = self.products.read().await;
        let mut result = Vec::new();
        for id in ids {
            result.extend(sorted_by_name(
                products.values().filter(|p| &p.category_id == id).cloned(),
                |p| p.name.as_str(),
            ));
        }
        Ok(result)
    }

    async fn delete_product(&self, id: &ProductId) -> StorageResult<bool> {
        let mut products = self.products.write().await;
        let mut lines = self.cart_lines.write().await;
        if products.remove(id).is_none() {
            return Ok(false);
        }
        lines.retain(|line| &line.product_id != id);
        Ok(true)
    }
}

#[async_trait]
impl AccountStorage for InMemoryStorage {
    async fn create_account(&self, user: User, customer: Customer) -> StorageResult<()> {
        let mut users = self.users.write().await;
        let mut customers = self.customers.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(StorageError::Conflict(format!(
                "username '{}' already exists",
                user.username
            )));
        }
        if customer.user_id != user.id {
            return Err(StorageError::InvalidData(
                "customer does not belong to the user".to_string(),
            ));
        }
        users.insert(user.id, user);
        customers.insert(customer.id, customer);
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn get_customer_for_user(&self, user_id: &UserId) -> StorageResult<Option<Customer>> {
        let customers = self.customers.read().await;
        Ok(customers.values().find(|c| &c.user_id == user_id).cloned())
    }

    async fn count_users(&self) -> StorageResult<usize> {
        Ok(self.users.read().await.len())
    }

    async fn create_session(&self, session: Session) -> StorageResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn get_session(&self, token: &SessionToken) -> StorageResult<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &SessionToken) -> StorageResult<bool> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(token).is_some())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        Ok(before - sessions.len())
    }
}

#[async_trait]
impl CartStorage for InMemoryStorage {
    async fn get_open_cart(&self, customer_id: &CustomerId) -> StorageResult<Option<Cart>> {
        let carts = self.carts.read().await;
        Ok(carts
            .values()
            .filter(|c| &c.owner == customer_id && !c.ordered)
            .min_by_key(|c| c.created_at)
            .cloned())
    }

    async fn get_cart(&self, id: &CartId) -> StorageResult<Option<Cart>> {
        let carts = self.carts.read().await;
        Ok(carts.get(id).cloned())
    }

    async fn create_cart(&self, cart: Cart) -> StorageResult<()> {
        let mut carts = self.carts.write().await;
        if carts.contains_key(&cart.id) {
            return Err(StorageError::Conflict(format!("{} already exists", cart.id)));
        }
        carts.insert(cart.id, cart);
        Ok(())
    }

    async fn update_cart_totals(&self, id: &CartId, price: Money, amount: u32) -> StorageResult<bool> {
        let mut carts = self.carts.write().await;
        match carts.get_mut(id) {
            Some(cart) if !cart.ordered => {
                cart.final_price = price;
                cart.final_amount = amount;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn add_cart_line_if_absent(&self, line: CartProduct) -> StorageResult<(CartProduct, bool)> {
        let mut lines = self.cart_lines.write().await;
        if let Some(existing) = lines
            .iter()
            .find(|l| l.cart_id == line.cart_id && l.product_id == line.product_id)
        {
            return Ok((existing.clone(), false));
        }
        lines.push(line.clone());
        Ok((line, true))
    }

    async fn get_cart_line(&self, id: &CartProductId) -> StorageResult<Option<CartProduct>> {
        let lines = self.cart_lines.read().await;
        Ok(lines.iter().find(|l| &l.id == id).cloned())
    }

    async fn update_cart_line(&self, line: CartProduct) -> StorageResult<()> {
        let mut lines = self.cart_lines.write().await;
        let slot = lines
            .iter_mut()
            .find(|l| l.id == line.id)
            .ok_or_else(|| StorageError::NotFound(format!("cart line {}", line.id)))?;
        *slot = line;
        Ok(())
    }

    async fn delete_cart_line(&self, id: &CartProductId) -> StorageResult<bool> {
        let mut lines = self.cart_lines.write().await;
        let before = lines.len();
        lines.retain(|l| &l.id != id);
        Ok(lines.len() != before)
    }

    async fn list_cart_lines(&self, cart_id: &CartId) -> StorageResult<Vec<CartProduct>> {
        let lines = self.cart_lines.read().await;
        Ok(lines.iter().filter(|l| &l.cart_id == cart_id).cloned().collect())
    }

    async fn list_open_carts_with_product(&self, product_id: &ProductId) -> StorageResult<Vec<Cart>> {
        let carts = self.carts.read().await;
        let lines = self.cart_lines.read().await;
        let cart_ids: HashSet<CartId> = lines
            .iter()
            .filter(|l| &l.product_id == product_id)
            .map(|l| l.cart_id)
            .collect();
        Ok(cart_ids
            .iter()
            .filter_map(|id| carts.get(id))
            .filter(|c| !c.ordered)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderStorage for InMemoryStorage {
    async fn place_order(&self, order: Order, cart: Cart) -> StorageResult<()> {
        let mut carts = self.carts.write().await;
        let mut orders = self.orders.write().await;
        if order.cart_id != cart.id {
            return Err(StorageError::InvalidData(
                "order does not reference the given cart".to_string(),
            ));
        }
        match carts.get_mut(&cart.id) {
            Some(stored) if !stored.ordered => {
                stored.final_price = cart.final_price;
                stored.final_amount = cart.final_amount;
                stored.ordered = true;
            }
            _ => return Err(StorageError::Conflict(format!("{} is not open", cart.id))),
        }
        orders.insert(order.id, order);
        Ok(())
    }

    async fn get_order(&self, id: &OrderId) -> StorageResult<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(id).cloned())
    }

    async fn list_orders_for_customer(&self, customer_id: &CustomerId) -> StorageResult<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(newest_first(
            orders
                .values()
                .filter(|o| &o.customer_id == customer_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(newest_first(orders.values().cloned().collect()))
    }

    async fn update_order(&self, order: Order) -> StorageResult<()> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&order.id) {
            Some(slot) => {
                *slot = order;
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("{}", order.id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_types::{NewProduct, OrderForm};

    async fn seeded() -> (InMemoryStorage, GlobalCategory, Category, Product) {
        let storage = InMemoryStorage::new();
        let global = GlobalCategory::new("Clothing").unwrap();
        let category = Category::new(global.id, "Shoes").unwrap();
        let product = Product::new(NewProduct {
            category_id: category.id,
            name: "Runner".to_string(),
            description: "Fast".to_string(),
            price: Money::from_minor(4999),
            image: "runner.png".to_string(),
            stars: None,
        })
        .unwrap();
        storage.insert_global_category(global.clone()).await.unwrap();
        storage.insert_category(category.clone()).await.unwrap();
        storage.insert_product(product.clone()).await.unwrap();
        (storage, global, category, product)
    }

    #[tokio::test]
    async fn test_duplicate_slug_conflicts() {
        let (storage, global, _, _) = seeded().await;
        let again = GlobalCategory::new("clothing").unwrap();
        assert_eq!(again.slug, global.slug);
        assert!(matches!(
            storage.insert_global_category(again).await,
            Err(StorageError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_category_requires_global() {
        let storage = InMemoryStorage::new();
        let orphan = Category::new(GlobalCategoryId::generate(), "Orphan").unwrap();
        assert!(matches!(
            storage.insert_category(orphan).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cart_line_get_or_create() {
        let (storage, _, _, product) = seeded().await;
        let cart = Cart::open(CustomerId::generate());
        storage.create_cart(cart.clone()).await.unwrap();

        let (first, created) = storage
            .add_cart_line_if_absent(CartProduct::new(&cart, &product))
            .await
            .unwrap();
        assert!(created);
        let (second, created) = storage
            .add_cart_line_if_absent(CartProduct::new(&cart, &product))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(storage.list_cart_lines(&cart.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_global_delete_cascades() {
        let (storage, global, category, product) = seeded().await;
        let cart = Cart::open(CustomerId::generate());
        storage.create_cart(cart.clone()).await.unwrap();
        storage
            .add_cart_line_if_absent(CartProduct::new(&cart, &product))
            .await
            .unwrap();

        assert!(storage.delete_global_category(&global.id).await.unwrap());
        assert!(storage.get_category(&category.id).await.unwrap().is_none());
        assert!(storage.get_product(&product.id).await.unwrap().is_none());
        assert!(storage.list_cart_lines(&cart.id).await.unwrap().is_empty());
        assert!(!storage.delete_global_category(&global.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let storage = InMemoryStorage::new();
        let user = User::new("alice".into(), "h".into(), false);
        let customer = Customer::for_user(user.id, None, None);
        storage.create_account(user, customer).await.unwrap();

        let dup = User::new("alice".into(), "h".into(), false);
        let dup_customer = Customer::for_user(dup.id, None, None);
        assert!(matches!(
            storage.create_account(dup, dup_customer).await,
            Err(StorageError::Conflict(_))
        ));
        assert_eq!(storage.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_expired_sessions() {
        let storage = InMemoryStorage::new();
        let live = Session::start(UserId::generate(), chrono::Duration::hours(1));
        let stale = Session::start(UserId::generate(), chrono::Duration::seconds(-1));
        storage.create_session(live.clone()).await.unwrap();
        storage.create_session(stale.clone()).await.unwrap();

        assert_eq!(storage.purge_expired_sessions(Utc::now()).await.unwrap(), 1);
        assert!(storage.get_session(&live.token).await.unwrap().is_some());
        assert!(storage.get_session(&stale.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_place_order_marks_cart_once() {
        let storage = InMemoryStorage::new();
        let mut cart = Cart::open(CustomerId::generate());
        storage.create_cart(cart.clone()).await.unwrap();
        cart.ordered = true;

        let form = || OrderForm {
            first_name: "Ann".to_string(),
            address: "1 Road".to_string(),
            phone: 1,
        };
        let order = Order::place(cart.owner, cart.id, form()).unwrap();
        storage.place_order(order.clone(), cart.clone()).await.unwrap();
        assert!(storage.get_open_cart(&cart.owner).await.unwrap().is_none());

        let again = Order::place(cart.owner, cart.id, form()).unwrap();
        assert!(matches!(
            storage.place_order(again, cart.clone()).await,
            Err(StorageError::Conflict(_))
        ));
        assert_eq!(storage.list_orders().await.unwrap(), vec![order]);
    }

    #[tokio::test]
    async fn test_cart_totals_frozen_once_ordered() {
        let storage = InMemoryStorage::new();
        let cart = Cart::open(CustomerId::generate());
        storage.create_cart(cart.clone()).await.unwrap();
        assert!(matches!(
            storage.create_cart(cart.clone()).await,
            Err(StorageError::Conflict(_))
        ));

        assert!(storage
            .update_cart_totals(&cart.id, Money::from_units(5), 2)
            .await
            .unwrap());

        let mut ordered = storage.get_cart(&cart.id).await.unwrap().unwrap();
        let order = Order::place(
            cart.owner,
            cart.id,
            OrderForm {
                first_name: "Ann".to_string(),
                address: "1 Road".to_string(),
                phone: 1,
            },
        )
        .unwrap();
        ordered.ordered = true;
        storage.place_order(order, ordered).await.unwrap();

        assert!(!storage
            .update_cart_totals(&cart.id, Money::ZERO, 0)
            .await
            .unwrap());
        let stored = storage.get_cart(&cart.id).await.unwrap().unwrap();
        assert!(stored.ordered);
        assert_eq!(stored.final_price, Money::from_units(5));
        assert_eq!(stored.final_amount, 2);
    }
}
