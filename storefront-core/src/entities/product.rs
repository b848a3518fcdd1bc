//! Product SKU stock.

use crate::framework::Tx;

pub struct GoodsProduct;

impl GoodsProduct {
    /// Take `number` units out of stock. Returns zero rows when the stock is
    /// insufficient.
    pub async fn reduce_stock_tx(
        tx: &mut Tx<'_>,
        product_id: i64,
        number: i16,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE goods_products
            SET number = number - $2, update_time = (now() AT TIME ZONE 'UTC')
            WHERE id = $1 AND number >= $2 AND NOT deleted
            "#,
        )
        .bind(product_id)
        .bind(i32::from(number))
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn add_stock_tx(
        tx: &mut Tx<'_>,
        product_id: i64,
        number: i16,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE goods_products
            SET number = number + $2, update_time = (now() AT TIME ZONE 'UTC')
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .bind(i32::from(number))
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
