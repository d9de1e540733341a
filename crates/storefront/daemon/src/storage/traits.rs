//! Storage trait definitions

use crate::error::StorageError;
use async_trait::async_trait;
use storefront_types::{
    Cart, CartId, CartProduct, CartProductId, Category, CategoryId, Customer, CustomerId,
    GlobalCategory, GlobalCategoryId, Money, Order, OrderId, Product, ProductId, Session,
    SessionToken, User, UserId,
};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Combined storage trait
#[async_trait]
pub trait Storage: CatalogStorage + AccountStorage + CartStorage + OrderStorage + Send + Sync {
    /// Short backend name for status output
    fn backend_name(&self) -> &'static str;
}

/// Storage for global categories, categories and products
#[async_trait]
pub trait CatalogStorage: Send + Sync {
    /// Insert a global category; a taken slug is a conflict
    async fn insert_global_category(&self, global: GlobalCategory) -> StorageResult<()>;

    /// Get a global category by slug
    async fn get_global_category_by_slug(&self, slug: &str) -> StorageResult<Option<GlobalCategory>>;

    /// Get a global category by ID
    async fn get_global_category(&self, id: &GlobalCategoryId) -> StorageResult<Option<GlobalCategory>>;

    /// List all global categories, by name
    async fn list_global_categories(&self) -> StorageResult<Vec<GlobalCategory>>;

    /// Delete a global category together with its categories and their products
    async fn delete_global_category(&self, id: &GlobalCategoryId) -> StorageResult<bool>;

    /// Insert a category; a taken slug is a conflict
    async fn insert_category(&self, category: Category) -> StorageResult<()>;

    /// Get a category by slug
    async fn get_category_by_slug(&self, slug: &str) -> StorageResult<Option<Category>>;

    /// Get a category by ID
    async fn get_category(&self, id: &CategoryId) -> StorageResult<Option<Category>>;

    /// Categories that belong to a global category, by name
    async fn list_categories_for_global(&self, id: &GlobalCategoryId) -> StorageResult<Vec<Category>>;

    /// Count all categories
    async fn count_categories(&self) -> StorageResult<usize>;

    /// Delete a category together with its products
    async fn delete_category(&self, id: &CategoryId) -> StorageResult<bool>;

    /// Insert a product; a taken slug is a conflict
    async fn insert_product(&self, product: Product) -> StorageResult<()>;

    /// Get a product by slug
    async fn get_product_by_slug(&self, slug: &str) -> StorageResult<Option<Product>>;

    /// Get a product by ID
    async fn get_product(&self, id: &ProductId) -> StorageResult<Option<Product>>;

    /// List all products, by name
    async fn list_products(&self) -> StorageResult<Vec<Product>>;

    /// Products in any of the given categories, grouped in the order the categories are given
    async fn list_products_for_categories(&self, ids: &[CategoryId]) -> StorageResult<Vec<Product>>;

    /// Delete a product and every cart line that references it
    async fn delete_product(&self, id: &ProductId) -> StorageResult<bool>;
}

/// Storage for users, customers and sessions
#[async_trait]
pub trait AccountStorage: Send + Sync {
    /// Create a user and its customer profile together; a taken username is a conflict
    async fn create_account(&self, user: User, customer: Customer) -> StorageResult<()>;

    /// Get a user by ID
    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>>;

    /// Get a user by exact username
    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>>;

    /// Get the customer profile of a user
    async fn get_customer_for_user(&self, user_id: &UserId) -> StorageResult<Option<Customer>>;

    /// Count registered users
    async fn count_users(&self) -> StorageResult<usize>;

    /// Store a new session
    async fn create_session(&self, session: Session) -> StorageResult<()>;

    /// Look up a session by token
    async fn get_session(&self, token: &SessionToken) -> StorageResult<Option<Session>>;

    /// Remove a session
    async fn delete_session(&self, token: &SessionToken) -> StorageResult<bool>;

    /// Remove every session that expired before `now`; returns how many were removed
    async fn purge_expired_sessions(&self, now: chrono::DateTime<chrono::Utc>) -> StorageResult<usize>;
}

/// Storage for carts and cart lines
#[async_trait]
pub trait CartStorage: Send + Sync {
    /// The customer's cart that has not been ordered yet
    async fn get_open_cart(&self, customer_id: &CustomerId) -> StorageResult<Option<Cart>>;

    /// Get a cart by ID
    async fn get_cart(&self, id: &CartId) -> StorageResult<Option<Cart>>;

    /// Insert a new cart
    async fn create_cart(&self, cart: Cart) -> StorageResult<()>;

    /// Store recalculated totals while the cart is still open.
    /// Returns false when the cart is missing or already ordered.
    async fn update_cart_totals(&self, id: &CartId, price: Money, amount: u32) -> StorageResult<bool>;

    /// Insert the line unless the cart already holds that product.
    /// Returns the stored line and whether it was created.
    async fn add_cart_line_if_absent(&self, line: CartProduct) -> StorageResult<(CartProduct, bool)>;

    /// Get a cart line by ID
    async fn get_cart_line(&self, id: &CartProductId) -> StorageResult<Option<CartProduct>>;

    /// Update the amount and total of an existing line
    async fn update_cart_line(&self, line: CartProduct) -> StorageResult<()>;

    /// Delete a cart line
    async fn delete_cart_line(&self, id: &CartProductId) -> StorageResult<bool>;

    /// Lines of a cart in insertion order
    async fn list_cart_lines(&self, cart_id: &CartId) -> StorageResult<Vec<CartProduct>>;

    /// Open carts that hold a line for the product
    async fn list_open_carts_with_product(&self, product_id: &ProductId) -> StorageResult<Vec<Cart>>;
}

/// Storage for orders
#[async_trait]
pub trait OrderStorage: Send + Sync {
    /// Insert the order and persist its cart as ordered, atomically
    async fn place_order(&self, order: Order, cart: Cart) -> StorageResult<()>;

    /// Get an order by ID
    async fn get_order(&self, id: &OrderId) -> StorageResult<Option<Order>>;

    /// Orders of one customer, newest first
    async fn list_orders_for_customer(&self, customer_id: &CustomerId) -> StorageResult<Vec<Order>>;

    /// All orders, newest first
    async fn list_orders(&self) -> StorageResult<Vec<Order>>;

    /// Update an existing order
    async fn update_order(&self, order: Order) -> StorageResult<()>;
}
