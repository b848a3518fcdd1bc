use crate::framework::{DatabaseProcessor, Tx};
use kanau::processor::Processor;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OrderGoods {
    pub id: i64,
    pub order_id: i64,
    pub goods_id: i64,
    pub goods_name: String,
    pub goods_sn: String,
    pub product_id: i64,
    pub number: i16,
    pub price: Decimal,
    pub specifications: Vec<String>,
    pub pic_url: String,
}

#[derive(Debug, Clone)]
pub struct OrderGoodsInsert {
    pub goods_id: i64,
    pub goods_name: String,
    pub goods_sn: String,
    pub product_id: i64,
    pub number: i16,
    pub price: Decimal,
    pub specifications: Vec<String>,
    pub pic_url: String,
}

const SELECT_ORDER_GOODS: &str = "SELECT id, order_id, goods_id, goods_name, goods_sn, product_id, \
     number, price, specifications, pic_url FROM order_goods";

#[derive(Debug, Clone)]
pub struct GetOrderGoods {
    pub order_id: i64,
}

impl Processor<GetOrderGoods> for DatabaseProcessor {
    type Output = Vec<OrderGoods>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderGoods")]
    async fn process(&self, query: GetOrderGoods) -> Result<Vec<OrderGoods>, sqlx::Error> {
        sqlx::query_as::<_, OrderGoods>(&format!(
            "{SELECT_ORDER_GOODS} WHERE order_id = $1 AND NOT deleted ORDER BY id"
        ))
        .bind(query.order_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Line items of several orders in one query.
pub struct GetOrderGoodsByOrderIds {
    pub order_ids: Vec<i64>,
}

impl Processor<GetOrderGoodsByOrderIds> for DatabaseProcessor {
    type Output = Vec<OrderGoods>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderGoodsByOrderIds")]
    async fn process(&self, query: GetOrderGoodsByOrderIds) -> Result<Vec<OrderGoods>, sqlx::Error> {
        if query.order_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, OrderGoods>(&format!(
            "{SELECT_ORDER_GOODS} WHERE order_id = ANY($1) AND NOT deleted ORDER BY order_id, id"
        ))
        .bind(&query.order_ids)
        .fetch_all(&self.pool)
        .await
    }
}

impl OrderGoods {
    pub async fn list_for_order_tx(
        tx: &mut Tx<'_>,
        order_id: i64,
    ) -> Result<Vec<OrderGoods>, sqlx::Error> {
        sqlx::query_as::<_, OrderGoods>(&format!(
            "{SELECT_ORDER_GOODS} WHERE order_id = $1 AND NOT deleted ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(&mut **tx)
        .await
    }

    /// Insert all line items of an order in a single statement.
    pub async fn insert_many_tx(
        tx: &mut Tx<'_>,
        order_id: i64,
        goods: &[OrderGoodsInsert],
    ) -> Result<u64, sqlx::Error> {
        if goods.is_empty() {
            return Ok(0);
        }

        let mut query_builder = sqlx::QueryBuilder::new(
            "INSERT INTO order_goods \
             (order_id, goods_id, goods_name, goods_sn, product_id, number, price, specifications, pic_url) ",
        );
        query_builder.push_values(goods, |mut b, g| {
            b.push_bind(order_id)
                .push_bind(g.goods_id)
                .push_bind(&g.goods_name)
                .push_bind(&g.goods_sn)
                .push_bind(g.product_id)
                .push_bind(g.number)
                .push_bind(g.price)
                .push_bind(&g.specifications)
                .push_bind(&g.pic_url);
        });

        let result = query_builder.build().execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete_for_order_tx(
        tx: &mut Tx<'_>,
        order_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE order_goods SET deleted = TRUE, update_time = (now() AT TIME ZONE 'UTC')
            WHERE order_id = $1 AND NOT deleted
            "#,
        )
        .bind(order_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
