use crate::framework::{DatabaseProcessor, Tx};
use crate::order::OrderStatus;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use storefront_sdk::objects::{OrderSort, SortDirection};

macro_rules! order_columns {
    () => {
        "id, user_id, order_sn, order_status, consignee, mobile, address, message, \
         goods_price, freight_price, coupon_price, integral_price, groupon_price, \
         order_price, actual_price, pay_id, pay_time, ship_sn, ship_channel, ship_time, \
         refund_amount, refund_time, confirm_time, comments, end_time, add_time, update_time"
    };
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub order_sn: String,
    pub order_status: OrderStatus,
    pub consignee: String,
    pub mobile: String,
    pub address: String,
    pub message: String,
    pub goods_price: Decimal,
    pub freight_price: Decimal,
    pub coupon_price: Decimal,
    pub integral_price: Decimal,
    pub groupon_price: Decimal,
    pub order_price: Decimal,
    pub actual_price: Decimal,
    pub pay_id: Option<String>,
    pub pay_time: Option<time::PrimitiveDateTime>,
    pub ship_sn: Option<String>,
    pub ship_channel: Option<String>,
    pub ship_time: Option<time::PrimitiveDateTime>,
    pub refund_amount: Option<Decimal>,
    pub refund_time: Option<time::PrimitiveDateTime>,
    pub confirm_time: Option<time::PrimitiveDateTime>,
    /// Number of goods still awaiting a comment.
    pub comments: i16,
    pub end_time: Option<time::PrimitiveDateTime>,
    pub add_time: time::PrimitiveDateTime,
    pub update_time: time::PrimitiveDateTime,
}

/// Data for inserting a new order.
#[derive(Debug, Clone)]
pub struct OrderInsert {
    pub user_id: i64,
    pub order_sn: String,
    pub consignee: String,
    pub mobile: String,
    pub address: String,
    pub message: String,
    pub goods_price: Decimal,
    pub freight_price: Decimal,
    pub coupon_price: Decimal,
    pub integral_price: Decimal,
    pub groupon_price: Decimal,
    pub order_price: Decimal,
    pub actual_price: Decimal,
}

#[derive(Debug, Clone)]
/// Get a non-deleted order owned by a user.
pub struct GetUserOrder {
    pub user_id: i64,
    pub order_id: i64,
}

impl Processor<GetUserOrder> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserOrder")]
    async fn process(&self, query: GetUserOrder) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE id = $1 AND user_id = $2 AND NOT deleted"
        ))
        .bind(query.order_id)
        .bind(query.user_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct GetOrderById {
    pub order_id: i64,
}

impl Processor<GetOrderById> for DatabaseProcessor {
    type Output = Option<Order>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderById")]
    async fn process(&self, query: GetOrderById) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE id = $1"
        ))
        .bind(query.order_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// One page of a user's orders, optionally filtered by status.
///
/// An empty `statuses` list matches every status.
pub struct ListUserOrders {
    pub user_id: i64,
    pub statuses: Vec<OrderStatus>,
    pub offset: i64,
    pub limit: i64,
    pub sort: OrderSort,
    pub direction: SortDirection,
}

/// A page of orders and the total number of matching rows.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: i64,
}

impl Processor<ListUserOrders> for DatabaseProcessor {
    type Output = OrderPage;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListUserOrders")]
    async fn process(&self, query: ListUserOrders) -> Result<OrderPage, sqlx::Error> {
        let codes: Vec<i16> = query.statuses.iter().map(|s| s.code()).collect();
        let order_by = match (query.sort, query.direction) {
            (OrderSort::AddTime, SortDirection::Desc) => "add_time DESC, id DESC",
            (OrderSort::AddTime, SortDirection::Asc) => "add_time ASC, id ASC",
            (OrderSort::Id, SortDirection::Desc) => "id DESC",
            (OrderSort::Id, SortDirection::Asc) => "id ASC",
        };
        let filter = "user_id = $1 AND NOT deleted \
                      AND (cardinality($2::SMALLINT[]) = 0 OR order_status = ANY($2))";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders WHERE {filter}"))
            .bind(query.user_id)
            .bind(&codes)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM orders WHERE {filter} ORDER BY {order_by} LIMIT $3 OFFSET $4",
            order_columns!()
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(query.user_id)
            .bind(&codes)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(OrderPage { orders, total })
    }
}

#[derive(Debug, Clone)]
/// Ids of orders that have been in `status` since before `before`.
pub struct GetStaleOrderIds {
    pub status: OrderStatus,
    pub before: time::PrimitiveDateTime,
}

impl Processor<GetStaleOrderIds> for DatabaseProcessor {
    type Output = Vec<i64>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetStaleOrderIds")]
    async fn process(&self, query: GetStaleOrderIds) -> Result<Vec<i64>, sqlx::Error> {
        // Shipped orders age from the ship time, everything else from creation.
        sqlx::query_scalar(
            r#"
            SELECT id FROM orders
            WHERE order_status = $1 AND NOT deleted
              AND COALESCE(CASE WHEN $1 = 301 THEN ship_time END, add_time) < $2
            ORDER BY id
            LIMIT 500
            "#,
        )
        .bind(query.status)
        .bind(query.before)
        .fetch_all(&self.pool)
        .await
    }
}

impl Order {
    /// Whether any order, deleted ones included, already uses this serial
    /// number.
    pub async fn sn_exists_tx(tx: &mut Tx<'_>, order_sn: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE order_sn = $1)")
            .bind(order_sn)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn insert_tx(tx: &mut Tx<'_>, insert: &OrderInsert) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO orders (
                user_id, order_sn, order_status, consignee, mobile, address, message,
                goods_price, freight_price, coupon_price, integral_price, groupon_price,
                order_price, actual_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(insert.user_id)
        .bind(&insert.order_sn)
        .bind(OrderStatus::Create)
        .bind(&insert.consignee)
        .bind(&insert.mobile)
        .bind(&insert.address)
        .bind(&insert.message)
        .bind(insert.goods_price)
        .bind(insert.freight_price)
        .bind(insert.coupon_price)
        .bind(insert.integral_price)
        .bind(insert.groupon_price)
        .bind(insert.order_price)
        .bind(insert.actual_price)
        .fetch_one(&mut **tx)
        .await
    }

    /// Lock a user's order row for the rest of the transaction.
    pub async fn lock_user_order_tx(
        tx: &mut Tx<'_>,
        user_id: i64,
        order_id: i64,
    ) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE id = $1 AND user_id = $2 AND NOT deleted FOR UPDATE"
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn lock_by_id_tx(tx: &mut Tx<'_>, order_id: i64) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE id = $1 AND NOT deleted FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Lock an order by serial number, as reported by a payment gateway.
    pub async fn lock_by_sn_tx(tx: &mut Tx<'_>, order_sn: &str) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(concat!(
            "SELECT ",
            order_columns!(),
            " FROM orders WHERE order_sn = $1 AND NOT deleted FOR UPDATE"
        ))
        .bind(order_sn)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Move an order between statuses. Returns the number of rows changed,
    /// which is zero when the order is no longer in `from`.
    pub async fn transition_tx(
        tx: &mut Tx<'_>,
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $3,
                update_time = (now() AT TIME ZONE 'UTC'),
                end_time = CASE WHEN $3 IN (102, 103, 104) THEN (now() AT TIME ZONE 'UTC') ELSE end_time END,
                refund_time = CASE WHEN $3 = 202 THEN (now() AT TIME ZONE 'UTC') ELSE refund_time END
            WHERE id = $1 AND order_status = $2
            "#,
        )
        .bind(order_id)
        .bind(from)
        .bind(to)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Confirm receipt of a shipped order.
    pub async fn confirm_tx(
        tx: &mut Tx<'_>,
        order_id: i64,
        to: OrderStatus,
        comments: i16,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $2,
                confirm_time = (now() AT TIME ZONE 'UTC'),
                comments = $3,
                update_time = (now() AT TIME ZONE 'UTC')
            WHERE id = $1 AND order_status = 301
            "#,
        )
        .bind(order_id)
        .bind(to)
        .bind(comments)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Record a successful payment on an unpaid order.
    pub async fn mark_paid_tx(
        tx: &mut Tx<'_>,
        order_id: i64,
        pay_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET order_status = 201,
                pay_id = $2,
                pay_time = (now() AT TIME ZONE 'UTC'),
                update_time = (now() AT TIME ZONE 'UTC')
            WHERE id = $1 AND order_status = 101
            "#,
        )
        .bind(order_id)
        .bind(pay_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete_tx(tx: &mut Tx<'_>, order_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET deleted = TRUE, update_time = (now() AT TIME ZONE 'UTC')
            WHERE id = $1 AND NOT deleted
            "#,
        )
        .bind(order_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::now_utc;
    use sqlx::PgPool;

    fn insert(user_id: i64, order_sn: &str) -> OrderInsert {
        OrderInsert {
            user_id,
            order_sn: order_sn.to_string(),
            consignee: "Li Lei".to_string(),
            mobile: "13800000000".to_string(),
            address: "Hangzhou 1 Lake Rd".to_string(),
            message: String::new(),
            goods_price: Decimal::new(20, 0),
            freight_price: Decimal::ZERO,
            coupon_price: Decimal::ZERO,
            integral_price: Decimal::ZERO,
            groupon_price: Decimal::ZERO,
            order_price: Decimal::new(20, 0),
            actual_price: Decimal::new(20, 0),
        }
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_order_sn_is_unique_across_users(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        let id = Order::insert_tx(&mut tx, &insert(1, "20261019123456")).await.unwrap();

        assert!(Order::sn_exists_tx(&mut tx, "20261019123456").await.unwrap());
        assert!(!Order::sn_exists_tx(&mut tx, "20261019654321").await.unwrap());

        // Deleted orders keep their number.
        assert_eq!(Order::soft_delete_tx(&mut tx, id).await.unwrap(), 1);
        assert!(Order::sn_exists_tx(&mut tx, "20261019123456").await.unwrap());
        tx.commit().await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let duplicate = Order::insert_tx(&mut tx, &insert(2, "20261019123456")).await;
        assert!(matches!(
            duplicate,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation()
        ));
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_status_updates_compare_and_set(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        let id = Order::insert_tx(&mut tx, &insert(1, "20261019000001")).await.unwrap();

        // A transition from a status the order is not in changes nothing.
        assert_eq!(
            Order::transition_tx(&mut tx, id, OrderStatus::Pay, OrderStatus::Refund)
                .await
                .unwrap(),
            0
        );
        assert_eq!(Order::mark_paid_tx(&mut tx, id, "wx-1").await.unwrap(), 1);
        assert_eq!(Order::mark_paid_tx(&mut tx, id, "wx-2").await.unwrap(), 0);
        assert_eq!(
            Order::transition_tx(&mut tx, id, OrderStatus::Create, OrderStatus::Cancel)
                .await
                .unwrap(),
            0
        );
        assert_eq!(Order::confirm_tx(&mut tx, id, OrderStatus::Confirm, 1).await.unwrap(), 0);

        let order = Order::lock_by_id_tx(&mut tx, id).await.unwrap().unwrap();
        assert_eq!(order.order_status, OrderStatus::Pay);
        assert_eq!(order.pay_id.as_deref(), Some("wx-1"));
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_update_times_are_utc_in_any_session_zone(pool: PgPool) {
        let mut tx = pool.begin().await.unwrap();
        sqlx::query("SET LOCAL TIME ZONE 'Asia/Shanghai'")
            .execute(&mut *tx)
            .await
            .unwrap();
        let id = Order::insert_tx(&mut tx, &insert(1, "20261019000002")).await.unwrap();
        assert_eq!(Order::mark_paid_tx(&mut tx, id, "wx-1").await.unwrap(), 1);
        assert_eq!(
            Order::transition_tx(&mut tx, id, OrderStatus::Pay, OrderStatus::Refund)
                .await
                .unwrap(),
            1
        );

        let order = Order::lock_by_id_tx(&mut tx, id).await.unwrap().unwrap();
        let now = now_utc();
        for at in [
            order.add_time,
            order.update_time,
            order.pay_time.unwrap(),
            order.refund_time.unwrap(),
        ] {
            assert!((now - at).abs() < time::Duration::minutes(1), "{at} is not UTC");
        }
    }
}
