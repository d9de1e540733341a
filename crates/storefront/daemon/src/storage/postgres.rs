//! PostgreSQL storage implementation

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row};
use std::time::Duration;
use storefront_types::{
    Cart, CartId, CartProduct, CartProductId, Category, CategoryId, Customer, CustomerId,
    GlobalCategory, GlobalCategoryId, Money, Order, OrderId, OrderStatus, Product, ProductId,
    Rating, Session, SessionToken, User, UserId,
};
use uuid::Uuid;

const GLOBAL_COLUMNS: &str = "id, name, slug";
const CATEGORY_COLUMNS: &str = "id, global_category_id, name, slug";
const PRODUCT_COLUMNS: &str =
    "id, category_id, name, slug, description, price_minor, image, stars_tenths, created_at";
const USER_COLUMNS: &str = "id, username, password_hash, is_staff, date_joined";
const CART_COLUMNS: &str = "id, owner_id, final_price_minor, final_amount, ordered, created_at";
const LINE_COLUMNS: &str = "id, customer_id, cart_id, product_id, amount, total_price_minor";
const ORDER_COLUMNS: &str =
    "id, customer_id, cart_id, first_name, address, phone, status, created_at, updated_at";

/// PostgreSQL-backed storage
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect to PostgreSQL and initialize schema
    pub async fn new(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let storage = Self { pool };
        storage.initialize_schema().await?;
        Ok(storage)
    }

    async fn initialize_schema(&self) -> Result<(), StorageError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS global_categories (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id UUID PRIMARY KEY,
                global_category_id UUID NOT NULL REFERENCES global_categories(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS categories_global_category_id ON categories(global_category_id);"#,
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id UUID PRIMARY KEY,
                category_id UUID NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                price_minor BIGINT NOT NULL CHECK (price_minor >= 0),
                image TEXT NOT NULL,
                stars_tenths SMALLINT CHECK (stars_tenths BETWEEN 0 AND 99),
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS products_category_id ON products(category_id);"#,
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_staff BOOLEAN NOT NULL DEFAULT FALSE,
                date_joined TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS customers (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                phone BIGINT,
                address TEXT
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS sessions_expires_at ON sessions(expires_at);"#,
            r#"
            CREATE TABLE IF NOT EXISTS carts (
                id UUID PRIMARY KEY,
                owner_id UUID NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
                final_price_minor BIGINT NOT NULL DEFAULT 0,
                final_amount BIGINT NOT NULL DEFAULT 0,
                ordered BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS carts_owner_open ON carts(owner_id) WHERE NOT ordered;"#,
            r#"
            CREATE TABLE IF NOT EXISTS cart_products (
                id UUID PRIMARY KEY,
                seq BIGSERIAL,
                customer_id UUID NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
                cart_id UUID NOT NULL REFERENCES carts(id) ON DELETE CASCADE,
                product_id UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
                amount BIGINT NOT NULL CHECK (amount > 0),
                total_price_minor BIGINT NOT NULL,
                UNIQUE (cart_id, product_id)
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS cart_products_product_id ON cart_products(product_id);"#,
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id UUID PRIMARY KEY,
                customer_id UUID NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
                cart_id UUID NOT NULL REFERENCES carts(id) ON DELETE CASCADE,
                first_name TEXT NOT NULL,
                address TEXT NOT NULL,
                phone BIGINT NOT NULL,
                status TEXT NOT NULL DEFAULT 'new',
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS orders_customer_id ON orders(customer_id, created_at DESC);"#,
        ];

        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
        }

        Ok(())
    }
}

/// Map driver errors, turning constraint violations into domain errors
fn query_error(what: &str) -> impl Fn(sqlx::Error) -> StorageError + '_ {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StorageError::Conflict(format!("{} already exists", what))
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            StorageError::NotFound(format!("{} references a missing row", what))
        }
        _ => StorageError::Query(e.to_string()),
    }
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> StorageResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StorageError::Query(e.to_string()))
}

fn get_u32(row: &PgRow, column: &str) -> StorageResult<u32> {
    let value: i64 = get(row, column)?;
    u32::try_from(value)
        .map_err(|_| StorageError::InvalidData(format!("{} out of range: {}", column, value)))
}

fn amount_to_db(amount: u32) -> i64 {
    i64::from(amount)
}

fn global_from_row(row: &PgRow) -> StorageResult<GlobalCategory> {
    Ok(GlobalCategory {
        id: GlobalCategoryId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        slug: get(row, "slug")?,
    })
}

fn category_from_row(row: &PgRow) -> StorageResult<Category> {
    Ok(Category {
        id: CategoryId::from_uuid(get(row, "id")?),
        global_category_id: GlobalCategoryId::from_uuid(get(row, "global_category_id")?),
        name: get(row, "name")?,
        slug: get(row, "slug")?,
    })
}

fn product_from_row(row: &PgRow) -> StorageResult<Product> {
    let stars = match get::<Option<i16>>(row, "stars_tenths")? {
        Some(tenths) => Some(
            u8::try_from(tenths)
                .ok()
                .and_then(Rating::from_tenths)
                .ok_or_else(|| StorageError::InvalidData(format!("rating out of range: {}", tenths)))?,
        ),
        None => None,
    };
    Ok(Product {
        id: ProductId::from_uuid(get(row, "id")?),
        category_id: CategoryId::from_uuid(get(row, "category_id")?),
        name: get(row, "name")?,
        slug: get(row, "slug")?,
        description: get(row, "description")?,
        price: Money::from_minor(get(row, "price_minor")?),
        image: get(row, "image")?,
        stars,
        created_at: get(row, "created_at")?,
    })
}

fn user_from_row(row: &PgRow) -> StorageResult<User> {
    Ok(User {
        id: UserId::from_uuid(get(row, "id")?),
        username: get(row, "username")?,
        password_hash: get(row, "password_hash")?,
        is_staff: get(row, "is_staff")?,
        date_joined: get(row, "date_joined")?,
    })
}

fn cart_from_row(row: &PgRow) -> StorageResult<Cart> {
    Ok(Cart {
        id: CartId::from_uuid(get(row, "id")?),
        owner: CustomerId::from_uuid(get(row, "owner_id")?),
        final_price: Money::from_minor(get(row, "final_price_minor")?),
        final_amount: get_u32(row, "final_amount")?,
        ordered: get(row, "ordered")?,
        created_at: get(row, "created_at")?,
    })
}

fn line_from_row(row: &PgRow) -> StorageResult<CartProduct> {
    Ok(CartProduct {
        id: CartProductId::from_uuid(get(row, "id")?),
        customer_id: CustomerId::from_uuid(get(row, "customer_id")?),
        cart_id: CartId::from_uuid(get(row, "cart_id")?),
        product_id: ProductId::from_uuid(get(row, "product_id")?),
        amount: get_u32(row, "amount")?,
        total_price: Money::from_minor(get(row, "total_price_minor")?),
    })
}

fn order_from_row(row: &PgRow) -> StorageResult<Order> {
    let status: String = get(row, "status")?;
    Ok(Order {
        id: OrderId::from_uuid(get(row, "id")?),
        customer_id: CustomerId::from_uuid(get(row, "customer_id")?),
        cart_id: CartId::from_uuid(get(row, "cart_id")?),
        first_name: get(row, "first_name")?,
        address: get(row, "address")?,
        phone: get(row, "phone")?,
        status: status
            .parse::<OrderStatus>()
            .map_err(|e| StorageError::InvalidData(e.to_string()))?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn collect<T>(rows: Vec<PgRow>, map: fn(&PgRow) -> StorageResult<T>) -> StorageResult<Vec<T>> {
    rows.iter().map(map).collect()
}

#[async_trait]
impl Storage for PostgresStorage {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl CatalogStorage for PostgresStorage {
    async fn insert_global_category(&self, global: GlobalCategory) -> StorageResult<()> {
        sqlx::query("INSERT INTO global_categories (id, name, slug) VALUES ($1, $2, $3)")
            .bind(*global.id.as_uuid())
            .bind(&global.name)
            .bind(&global.slug)
            .execute(&self.pool)
            .await
            .map_err(query_error("global category slug"))?;
        Ok(())
    }

    async fn get_global_category_by_slug(&self, slug: &str) -> StorageResult<Option<GlobalCategory>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM global_categories WHERE slug = $1",
            GLOBAL_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("global category"))?;
        row.as_ref().map(global_from_row).transpose()
    }

    async fn get_global_category(&self, id: &GlobalCategoryId) -> StorageResult<Option<GlobalCategory>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM global_categories WHERE id = $1",
            GLOBAL_COLUMNS
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("global category"))?;
        row.as_ref().map(global_from_row).transpose()
    }

    async fn list_global_categories(&self) -> StorageResult<Vec<GlobalCategory>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM global_categories ORDER BY name",
            GLOBAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("global category"))?;
        collect(rows, global_from_row)
    }

    async fn delete_global_category(&self, id: &GlobalCategoryId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM global_categories WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(query_error("global category"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_category(&self, category: Category) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO categories (id, global_category_id, name, slug) VALUES ($1, $2, $3, $4)",
        )
        .bind(*category.id.as_uuid())
        .bind(*category.global_category_id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .execute(&self.pool)
        .await
        .map_err(query_error("category slug"))?;
        Ok(())
    }

    async fn get_category_by_slug(&self, slug: &str) -> StorageResult<Option<Category>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM categories WHERE slug = $1",
            CATEGORY_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("category"))?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn get_category(&self, id: &CategoryId) -> StorageResult<Option<Category>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM categories WHERE id = $1",
            CATEGORY_COLUMNS
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("category"))?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn list_categories_for_global(&self, id: &GlobalCategoryId) -> StorageResult<Vec<Category>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM categories WHERE global_category_id = $1 ORDER BY name",
            CATEGORY_COLUMNS
        ))
        .bind(*id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("category"))?;
        collect(rows, category_from_row)
    }

    async fn count_categories(&self) -> StorageResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await
            .map_err(query_error("category"))?;
        Ok(count as usize)
    }

    async fn delete_category(&self, id: &CategoryId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(query_error("category"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_product(&self, product: Product) -> StorageResult<()> {
        sqlx::query(&format!(
            "INSERT INTO products ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            PRODUCT_COLUMNS
        ))
        .bind(*product.id.as_uuid())
        .bind(*product.category_id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price.minor())
        .bind(&product.image)
        .bind(product.stars.map(|s| i16::from(s.tenths())))
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .map_err(query_error("product slug"))?;
        Ok(())
    }

    async fn get_product_by_slug(&self, slug: &str) -> StorageResult<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM products WHERE slug = $1",
            PRODUCT_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("product"))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn get_product(&self, id: &ProductId) -> StorageResult<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("product"))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn list_products(&self) -> StorageResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM products ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("product"))?;
        collect(rows, product_from_row)
    }

    async fn list_products_for_categories(&self, ids: &[CategoryId]) -> StorageResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {} FROM products WHERE category_id = ANY($1) \
             ORDER BY array_position($1, category_id), name",
            PRODUCT_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("product"))?;
        collect(rows, product_from_row)
    }

    async fn delete_product(&self, id: &ProductId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(query_error("product"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AccountStorage for PostgresStorage {
    async fn create_account(&self, user: User, customer: Customer) -> StorageResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(&format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5)",
            USER_COLUMNS
        ))
        .bind(*user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .bind(user.date_joined)
        .execute(&mut *tx)
        .await
        .map_err(query_error("username"))?;

        sqlx::query("INSERT INTO customers (id, user_id, phone, address) VALUES ($1, $2, $3, $4)")
            .bind(*customer.id.as_uuid())
            .bind(*customer.user_id.as_uuid())
            .bind(customer.phone)
            .bind(&customer.address)
            .execute(&mut *tx)
            .await
            .map_err(query_error("customer"))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Query(e.to_string()))
    }

    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("user"))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("user"))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_customer_for_user(&self, user_id: &UserId) -> StorageResult<Option<Customer>> {
        let row = sqlx::query("SELECT id, user_id, phone, address FROM customers WHERE user_id = $1")
            .bind(*user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("customer"))?;

        match row {
            Some(row) => Ok(Some(Customer {
                id: CustomerId::from_uuid(get(&row, "id")?),
                user_id: UserId::from_uuid(get(&row, "user_id")?),
                phone: get(&row, "phone")?,
                address: get(&row, "address")?,
            })),
            None => Ok(None),
        }
    }

    async fn count_users(&self) -> StorageResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(query_error("user"))?;
        Ok(count as usize)
    }

    async fn create_session(&self, session: Session) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(session.token.as_str())
        .bind(*session.user_id.as_uuid())
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(query_error("session"))?;
        Ok(())
    }

    async fn get_session(&self, token: &SessionToken) -> StorageResult<Option<Session>> {
        let row = sqlx::query(
            "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = $1",
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("session"))?;

        match row {
            Some(row) => Ok(Some(Session {
                token: SessionToken::new(get::<String>(&row, "token")?),
                user_id: UserId::from_uuid(get(&row, "user_id")?),
                created_at: get(&row, "created_at")?,
                expires_at: get(&row, "expires_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_session(&self, token: &SessionToken) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token.as_str())
            .execute(&self.pool)
            .await
            .map_err(query_error("session"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(query_error("session"))?;
        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl CartStorage for PostgresStorage {
    async fn get_open_cart(&self, customer_id: &CustomerId) -> StorageResult<Option<Cart>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM carts WHERE owner_id = $1 AND NOT ordered ORDER BY created_at LIMIT 1",
            CART_COLUMNS
        ))
        .bind(*customer_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("cart"))?;
        row.as_ref().map(cart_from_row).transpose()
    }

    async fn get_cart(&self, id: &CartId) -> StorageResult<Option<Cart>> {
        let row = sqlx::query(&format!("SELECT {} FROM carts WHERE id = $1", CART_COLUMNS))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("cart"))?;
        row.as_ref().map(cart_from_row).transpose()
    }

    async fn create_cart(&self, cart: Cart) -> StorageResult<()> {
        sqlx::query(&format!(
            "INSERT INTO carts ({}) VALUES ($1, $2, $3, $4, $5, $6)",
            CART_COLUMNS
        ))
        .bind(*cart.id.as_uuid())
        .bind(*cart.owner.as_uuid())
        .bind(cart.final_price.minor())
        .bind(amount_to_db(cart.final_amount))
        .bind(cart.ordered)
        .bind(cart.created_at)
        .execute(&self.pool)
        .await
        .map_err(query_error("cart"))?;
        Ok(())
    }

    async fn update_cart_totals(&self, id: &CartId, price: Money, amount: u32) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE carts
            SET final_price_minor = $2, final_amount = $3
            WHERE id = $1 AND NOT ordered
            "#,
        )
        .bind(*id.as_uuid())
        .bind(price.minor())
        .bind(amount_to_db(amount))
        .execute(&self.pool)
        .await
        .map_err(query_error("cart"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_cart_line_if_absent(&self, line: CartProduct) -> StorageResult<(CartProduct, bool)> {
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO cart_products ({})
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (cart_id, product_id) DO NOTHING
            RETURNING id
            "#,
            LINE_COLUMNS
        ))
        .bind(*line.id.as_uuid())
        .bind(*line.customer_id.as_uuid())
        .bind(*line.cart_id.as_uuid())
        .bind(*line.product_id.as_uuid())
        .bind(amount_to_db(line.amount))
        .bind(line.total_price.minor())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("cart line"))?;

        if inserted.is_some() {
            return Ok((line, true));
        }

        let row = sqlx::query(&format!(
            "SELECT {} FROM cart_products WHERE cart_id = $1 AND product_id = $2",
            LINE_COLUMNS
        ))
        .bind(*line.cart_id.as_uuid())
        .bind(*line.product_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(query_error("cart line"))?;
        Ok((line_from_row(&row)?, false))
    }

    async fn get_cart_line(&self, id: &CartProductId) -> StorageResult<Option<CartProduct>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM cart_products WHERE id = $1",
            LINE_COLUMNS
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("cart line"))?;
        row.as_ref().map(line_from_row).transpose()
    }

    async fn update_cart_line(&self, line: CartProduct) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE cart_products SET amount = $2, total_price_minor = $3 WHERE id = $1",
        )
        .bind(*line.id.as_uuid())
        .bind(amount_to_db(line.amount))
        .bind(line.total_price.minor())
        .execute(&self.pool)
        .await
        .map_err(query_error("cart line"))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("cart line {}", line.id)));
        }
        Ok(())
    }

    async fn delete_cart_line(&self, id: &CartProductId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM cart_products WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(query_error("cart line"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_cart_lines(&self, cart_id: &CartId) -> StorageResult<Vec<CartProduct>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM cart_products WHERE cart_id = $1 ORDER BY seq",
            LINE_COLUMNS
        ))
        .bind(*cart_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("cart line"))?;
        collect(rows, line_from_row)
    }

    async fn list_open_carts_with_product(&self, product_id: &ProductId) -> StorageResult<Vec<Cart>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM carts
            WHERE NOT ordered
              AND id IN (SELECT cart_id FROM cart_products WHERE product_id = $1)
            "#,
            CART_COLUMNS
        ))
        .bind(*product_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("cart"))?;
        collect(rows, cart_from_row)
    }
}

#[async_trait]
impl OrderStorage for PostgresStorage {
    async fn place_order(&self, order: Order, cart: Cart) -> StorageResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let marked = sqlx::query(
            r#"
            UPDATE carts
            SET ordered = TRUE, final_price_minor = $2, final_amount = $3
            WHERE id = $1 AND NOT ordered
            "#,
        )
        .bind(*cart.id.as_uuid())
        .bind(cart.final_price.minor())
        .bind(amount_to_db(cart.final_amount))
        .execute(&mut *tx)
        .await
        .map_err(query_error("cart"))?;

        if marked.rows_affected() == 0 {
            return Err(StorageError::Conflict(format!("{} is not open", cart.id)));
        }

        sqlx::query(&format!(
            "INSERT INTO orders ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            ORDER_COLUMNS
        ))
        .bind(*order.id.as_uuid())
        .bind(*order.customer_id.as_uuid())
        .bind(*order.cart_id.as_uuid())
        .bind(&order.first_name)
        .bind(&order.address)
        .bind(order.phone)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(query_error("order"))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Query(e.to_string()))
    }

    async fn get_order(&self, id: &OrderId) -> StorageResult<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("order"))?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn list_orders_for_customer(&self, customer_id: &CustomerId) -> StorageResult<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM orders WHERE customer_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(*customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("order"))?;
        collect(rows, order_from_row)
    }

    async fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM orders ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("order"))?;
        collect(rows, order_from_row)
    }

    async fn update_order(&self, order: Order) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET first_name = $2, address = $3, phone = $4, status = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(*order.id.as_uuid())
        .bind(&order.first_name)
        .bind(&order.address)
        .bind(order.phone)
        .bind(order.status.as_str())
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(query_error("order"))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("{}", order.id)));
        }
        Ok(())
    }
}
