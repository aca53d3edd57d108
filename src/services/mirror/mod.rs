use crate::config::DatabaseConfig;
use crate::error::AppResult;
use crate::models::{BasketLine, Interaction, Product, SyncBatch};
use crate::services::Reachable;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// The analytics mirror: a passive, truncate-and-reload replica of the
/// transactional tables, isolated so training never locks the live system.
pub struct MirrorStore {
    pool: PgPool,
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGINT PRIMARY KEY,
        name VARCHAR(255),
        email VARCHAR(255),
        synced_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id BIGINT PRIMARY KEY,
        name VARCHAR(255),
        price DOUBLE PRECISION,
        brand VARCHAR(255),
        category VARCHAR(255),
        rating DOUBLE PRECISION,
        picture TEXT,
        stock INTEGER,
        synced_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id BIGINT PRIMARY KEY,
        customer_id BIGINT,
        total_amount DOUBLE PRECISION,
        created_at TIMESTAMPTZ,
        synced_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orderitem (
        id BIGINT PRIMARY KEY,
        order_id BIGINT,
        product_id BIGINT,
        quantity INTEGER,
        total_amount DOUBLE PRECISION,
        synced_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

impl MirrorStore {
    pub fn new(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy(&config.url)?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Replace every mirrored table with the batch in one transaction.
    /// Either the whole snapshot lands or the mirror stays exactly as it was.
    pub async fn replace_all(&self, batch: &SyncBatch) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for table in ["orderitem", "orders", "products", "users"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }

        for user in &batch.users {
            sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, $2, $3)")
                .bind(user.id)
                .bind(&user.name)
                .bind(&user.email)
                .execute(&mut *tx)
                .await?;
        }

        for product in &batch.products {
            sqlx::query(
                r#"
                INSERT INTO products (id, name, price, brand, category, rating, picture, stock)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(product.id)
            .bind(&product.name)
            .bind(product.price)
            .bind(&product.brand)
            .bind(&product.category)
            .bind(product.rating)
            .bind(&product.picture)
            .bind(product.stock)
            .execute(&mut *tx)
            .await?;
        }

        for order in &batch.orders {
            sqlx::query(
                "INSERT INTO orders (id, customer_id, total_amount, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(order.id)
            .bind(order.customer_id)
            .bind(order.total_amount)
            .bind(order.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for item in &batch.order_items {
            sqlx::query(
                "INSERT INTO orderitem (id, order_id, product_id, quantity, total_amount) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.line_total)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn load_products(&self) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, brand, category, rating, picture, stock
            FROM products
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Purchase strength per customer/product pair: summed line quantities.
    pub async fn load_interactions(&self) -> AppResult<Vec<Interaction>> {
        let interactions = sqlx::query_as::<_, Interaction>(
            r#"
            SELECT o.customer_id, oi.product_id, SUM(oi.quantity)::float8 AS strength
            FROM orders o
            JOIN orderitem oi ON o.id = oi.order_id
            GROUP BY o.customer_id, oi.product_id
            ORDER BY o.customer_id, oi.product_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(interactions)
    }

    pub async fn load_baskets(&self) -> AppResult<Vec<BasketLine>> {
        let baskets = sqlx::query_as::<_, BasketLine>(
            "SELECT order_id, product_id FROM orderitem ORDER BY order_id, product_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(baskets)
    }
}

#[async_trait::async_trait]
impl Reachable for MirrorStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
