//! Rows and handles shared by the database tests.

use kanau::processor::Processor;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::MallConfig;
use crate::entities::order::{GetOrderById, Order};
use crate::events::{EventSenders, OrderEventReceiver, order_event_channel};
use crate::framework::DatabaseProcessor;
use crate::services::OrderServices;

pub fn services(pool: &PgPool) -> (OrderServices, OrderEventReceiver) {
    let (tx, rx) = order_event_channel();
    let db = DatabaseProcessor { pool: pool.clone() };
    (OrderServices::new(db, EventSenders::new(tx)), rx)
}

/// No freight on any order.
pub fn mall() -> MallConfig {
    MallConfig {
        freight_min: Decimal::ZERO,
        freight_value: Decimal::ZERO,
        submit_lock_ttl: Duration::from_secs(10),
        notify_url: None,
    }
}

pub async fn address(pool: &PgPool, user_id: i64) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO addresses (user_id, name, tel, province, city, county, address_detail)
        VALUES ($1, 'Li Lei', '13800000000', 'Zhejiang', 'Hangzhou', 'Xihu', '1 Lake Rd')
        RETURNING id
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn product(pool: &PgPool, goods_id: i64, price: Decimal, stock: i32) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO goods_products (goods_id, price, number) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(goods_id)
    .bind(price)
    .bind(stock)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// A checked cart line for `product_id` at its product price.
pub async fn cart(pool: &PgPool, user_id: i64, product_id: i64, number: i16) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO carts (user_id, goods_id, goods_sn, goods_name, product_id, price, number)
        SELECT $1, goods_id, 'G-' || goods_id, 'Goods ' || goods_id, id, price, $3
        FROM goods_products WHERE id = $2
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(number)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Grant the user a usable coupon. Returns `(coupon_id, user_coupon_id)`.
pub async fn coupon(pool: &PgPool, user_id: i64, discount: Decimal) -> (i64, i64) {
    let coupon_id: i64 =
        sqlx::query_scalar("INSERT INTO coupons (name, discount) VALUES ('Welcome', $1) RETURNING id")
            .bind(discount)
            .fetch_one(pool)
            .await
            .unwrap();
    let user_coupon_id = sqlx::query_scalar(
        "INSERT INTO coupon_users (user_id, coupon_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(user_id)
    .bind(coupon_id)
    .fetch_one(pool)
    .await
    .unwrap();
    (coupon_id, user_coupon_id)
}

/// An online group-buy rule expiring tomorrow.
pub async fn groupon_rule(pool: &PgPool, goods_id: i64, discount: Decimal, members: i32) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO groupon_rules (goods_id, discount, discount_member, expire_time)
        VALUES ($1, $2, $3, (now() AT TIME ZONE 'UTC') + INTERVAL '1 day')
        RETURNING id
        "#,
    )
    .bind(goods_id)
    .bind(discount)
    .bind(members)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn stock(pool: &PgPool, product_id: i64) -> i32 {
    sqlx::query_scalar("SELECT number FROM goods_products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn coupon_status(pool: &PgPool, user_coupon_id: i64) -> (i16, Option<i64>) {
    sqlx::query_as("SELECT status, order_id FROM coupon_users WHERE id = $1")
        .bind(user_coupon_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn order_row(pool: &PgPool, order_id: i64) -> Order {
    DatabaseProcessor { pool: pool.clone() }
        .process(GetOrderById { order_id })
        .await
        .unwrap()
        .unwrap()
}
