use crate::framework::Tx;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Cart {
    pub id: i64,
    pub user_id: i64,
    pub goods_id: i64,
    pub goods_sn: String,
    pub goods_name: String,
    pub product_id: i64,
    pub price: Decimal,
    pub number: i16,
    pub specifications: Vec<String>,
    pub checked: bool,
    pub pic_url: String,
}

const SELECT_CART: &str = "SELECT id, user_id, goods_id, goods_sn, goods_name, product_id, price, \
     number, specifications, checked, pic_url FROM carts";

impl Cart {
    /// Every checked cart line of the user.
    pub async fn checked_for_user_tx(tx: &mut Tx<'_>, user_id: i64) -> Result<Vec<Cart>, sqlx::Error> {
        sqlx::query_as::<_, Cart>(&format!(
            "{SELECT_CART} WHERE user_id = $1 AND checked AND NOT deleted ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await
    }

    pub async fn get_for_user_tx(
        tx: &mut Tx<'_>,
        user_id: i64,
        cart_id: i64,
    ) -> Result<Option<Cart>, sqlx::Error> {
        sqlx::query_as::<_, Cart>(&format!(
            "{SELECT_CART} WHERE id = $1 AND user_id = $2 AND NOT deleted"
        ))
        .bind(cart_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn delete_many_tx(
        tx: &mut Tx<'_>,
        user_id: i64,
        cart_ids: &[i64],
    ) -> Result<u64, sqlx::Error> {
        if cart_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            UPDATE carts SET deleted = TRUE, update_time = (now() AT TIME ZONE 'UTC')
            WHERE user_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(cart_ids)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
