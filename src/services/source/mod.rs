use crate::config::DatabaseConfig;
use crate::error::AppResult;
use crate::models::{Order, OrderItem, Product, UserRecord};
use crate::services::Reachable;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;

/// Read-only access to the live transactional system. The pool connects
/// lazily: an unreachable source degrades serving to the trained model only,
/// it never prevents startup.
pub struct SourceStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct PurchasedWithRow {
    id: i64,
    name: String,
    price: f64,
    brand: Option<String>,
    category: Option<String>,
    rating: Option<f64>,
    picture: Option<String>,
    stock: i32,
    purchase_count: i64,
}

impl SourceStore {
    pub fn new(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy(&config.url)?;
        Ok(Self { pool })
    }

    pub async fn fetch_users(&self) -> AppResult<Vec<UserRecord>> {
        let users = sqlx::query_as::<_, UserRecord>(
            "SELECT id::bigint AS id, name, email FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn fetch_products(&self) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id::bigint AS id, name, price::float8 AS price, brand, category,
                   rating::float8 AS rating, picture, stock::int AS stock
            FROM products
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn fetch_orders(&self) -> AppResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id::bigint AS id, customer_id::bigint AS customer_id,
                   total_amount::float8 AS total_amount,
                   created_at::timestamptz AS created_at
            FROM orders
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    pub async fn fetch_order_items(&self) -> AppResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id::bigint AS id, order_id::bigint AS order_id,
                   product_id::bigint AS product_id, quantity::int AS quantity,
                   total_amount::float8 AS line_total
            FROM orderitem
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn get_product(&self, product_id: i64) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id::bigint AS id, name, price::float8 AS price, brand, category,
                   rating::float8 AS rating, picture, stock::int AS stock
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    /// Cold-start neighbors: in-stock products from the same category, best
    /// rated first, cheapest first within a rating.
    pub async fn similar_by_category(
        &self,
        category: Option<&str>,
        exclude_id: i64,
        limit: i64,
    ) -> AppResult<Vec<Product>> {
        let Some(category) = category else {
            return Ok(Vec::new());
        };

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id::bigint AS id, name, price::float8 AS price, brand, category,
                   rating::float8 AS rating, picture, stock::int AS stock
            FROM products
            WHERE category = $1 AND id <> $2 AND stock > 0
            ORDER BY rating DESC NULLS LAST, price ASC
            LIMIT $3
            "#,
        )
        .bind(category)
        .bind(exclude_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Cold-start co-purchase: live join counting how often each in-stock
    /// product shares an order with the given one.
    pub async fn copurchased_with(
        &self,
        product_id: i64,
        limit: i64,
    ) -> AppResult<Vec<(Product, i64)>> {
        let rows = sqlx::query_as::<_, PurchasedWithRow>(
            r#"
            SELECT p.id::bigint AS id, p.name, p.price::float8 AS price, p.brand,
                   p.category, p.rating::float8 AS rating, p.picture,
                   p.stock::int AS stock, COUNT(*)::bigint AS purchase_count
            FROM products p
            JOIN orderitem oi1 ON p.id = oi1.product_id
            JOIN orderitem oi2 ON oi1.order_id = oi2.order_id
            WHERE oi2.product_id = $1 AND p.id <> $1 AND p.stock > 0
            GROUP BY p.id
            ORDER BY purchase_count DESC, p.id ASC
            LIMIT $2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let count = row.purchase_count;
                (
                    Product {
                        id: row.id,
                        name: row.name,
                        price: row.price,
                        brand: row.brand,
                        category: row.category,
                        rating: row.rating,
                        picture: row.picture,
                        stock: row.stock,
                    },
                    count,
                )
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl Reachable for SourceStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
