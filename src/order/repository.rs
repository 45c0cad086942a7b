//! Service-order repository.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::types::{NewServiceOrder, OrderQuery, ServiceOrder, ServiceOrderUpdate};
use crate::{Result, ServdeskError};

const SELECT_ORDER: &str = "SELECT o.id, o.protocol, o.so_number, o.order_type, o.status, \
     o.provider, o.priority, o.recipient_name, o.cpf, o.description, o.created_by, \
     u.username AS created_by_username, o.created_at, o.updated_at \
     FROM service_orders o JOIN users u ON u.id = o.created_by";

/// Repository for service-order CRUD operations.
pub struct ServiceOrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ServiceOrderRepository<'a> {
    /// Create a new repository with the given pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an order. A duplicate protocol yields [`ServdeskError::Conflict`].
    pub async fn create(&self, order: &NewServiceOrder) -> Result<ServiceOrder> {
        let id = insert(self.pool, order).await?;
        self.get_by_id(id)
            .await?
            .ok_or_else(|| ServdeskError::NotFound("service order".to_string()))
    }

    /// Insert every order in one transaction; all or none are stored.
    pub async fn create_many(&self, orders: &[NewServiceOrder]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for order in orders {
            insert(&mut *tx, order).await?;
        }
        tx.commit().await?;
        Ok(orders.len())
    }

    /// Get an order by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<ServiceOrder>> {
        let sql = format!("{SELECT_ORDER} WHERE o.id = ?");
        let order = sqlx::query_as::<_, ServiceOrder>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(order)
    }

    /// List one page of orders matching `query`.
    pub async fn list(&self, query: &OrderQuery) -> Result<Vec<ServiceOrder>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_ORDER);
        push_filters(&mut builder, query);

        let direction = if query.ordering.descending { "DESC" } else { "ASC" };
        builder.push(format!(
            " ORDER BY {} {direction}, o.id {direction}",
            query.ordering.field.sql()
        ));
        builder.push(" LIMIT ");
        builder.push_bind(query.limit);
        builder.push(" OFFSET ");
        builder.push_bind(query.offset);

        let orders = builder
            .build_query_as::<ServiceOrder>()
            .fetch_all(self.pool)
            .await?;
        Ok(orders)
    }

    /// Count orders matching `query`, ignoring paging.
    pub async fn count(&self, query: &OrderQuery) -> Result<i64> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*) FROM service_orders o JOIN users u ON u.id = o.created_by",
        );
        push_filters(&mut builder, query);

        let count: i64 = builder.build_query_scalar().fetch_one(self.pool).await?;
        Ok(count)
    }

    /// Apply a partial update. Returns `None` if the order does not exist.
    pub async fn update(&self, id: i64, update: &ServiceOrderUpdate) -> Result<Option<ServiceOrder>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE service_orders SET updated_at = ");
        query.push_bind(Utc::now());

        if let Some(ref protocol) = update.protocol {
            query.push(", protocol = ");
            query.push_bind(protocol);
        }
        if let Some(ref so_number) = update.so_number {
            query.push(", so_number = ");
            query.push_bind(so_number);
        }
        if let Some(order_type) = update.order_type {
            query.push(", order_type = ");
            query.push_bind(order_type);
        }
        if let Some(status) = update.status {
            query.push(", status = ");
            query.push_bind(status);
        }
        if let Some(provider) = update.provider {
            query.push(", provider = ");
            query.push_bind(provider);
        }
        if let Some(priority) = update.priority {
            query.push(", priority = ");
            query.push_bind(priority);
        }
        if let Some(ref recipient_name) = update.recipient_name {
            query.push(", recipient_name = ");
            query.push_bind(recipient_name);
        }
        if let Some(ref cpf) = update.cpf {
            query.push(", cpf = ");
            query.push_bind(cpf);
        }
        if let Some(ref description) = update.description {
            query.push(", description = ");
            query.push_bind(description);
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Delete an order. Returns true if a row was removed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM service_orders WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn insert<'e, E>(executor: E, order: &NewServiceOrder) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO service_orders (protocol, so_number, order_type, status, provider, priority,
                                     recipient_name, cpf, description, created_by, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&order.protocol)
    .bind(&order.so_number)
    .bind(order.order_type)
    .bind(order.status)
    .bind(order.provider)
    .bind(order.priority)
    .bind(&order.recipient_name)
    .bind(&order.cpf)
    .bind(&order.description)
    .bind(order.created_by)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await?;
    Ok(id)
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &OrderQuery) {
    builder.push(" WHERE 1 = 1");

    if let Some(created_by) = query.created_by {
        builder.push(" AND o.created_by = ");
        builder.push_bind(created_by);
    }
    if let Some(status) = query.status {
        builder.push(" AND o.status = ");
        builder.push_bind(status);
    }
    if let Some(order_type) = query.order_type {
        builder.push(" AND o.order_type = ");
        builder.push_bind(order_type);
    }
    if let Some(provider) = query.provider {
        builder.push(" AND o.provider = ");
        builder.push_bind(provider);
    }
    if let Some(priority) = query.priority {
        builder.push(" AND o.priority = ");
        builder.push_bind(priority);
    }
    // SQLite LIKE folds ASCII letters only; accented letters must match case exactly
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        builder.push(" AND (");
        for (i, column) in ["o.protocol", "o.so_number", "o.recipient_name", "o.description"]
            .iter()
            .enumerate()
        {
            if i > 0 {
                builder.push(" OR ");
            }
            builder.push(format!("{column} LIKE "));
            builder.push_bind(pattern.clone());
            builder.push(" ESCAPE '\\'");
        }
        builder.push(")");
    }
}

/// Escape LIKE wildcards so user search text matches literally.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
