use crate::framework::Tx;
use rust_decimal::Decimal;

/// Status of a coupon granted to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[repr(i16)]
pub enum CouponUserStatus {
    Usable = 0,
    Used = 1,
    Expired = 2,
    Out = 3,
}

/// A granted coupon that can currently be applied.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UsableCoupon {
    pub user_coupon_id: i64,
    pub coupon_id: i64,
    pub discount: Decimal,
    /// Minimum goods total the coupon applies to.
    pub min: Decimal,
}

impl UsableCoupon {
    pub fn applies_to(&self, goods_total: Decimal) -> bool {
        goods_total >= self.min
    }

    /// Find and lock the user's grant of `coupon_id` if it is usable now.
    pub async fn find_tx(
        tx: &mut Tx<'_>,
        user_id: i64,
        coupon_id: i64,
        user_coupon_id: i64,
    ) -> Result<Option<UsableCoupon>, sqlx::Error> {
        sqlx::query_as::<_, UsableCoupon>(
            r#"
            SELECT cu.id AS user_coupon_id, c.id AS coupon_id, c.discount, c.min
            FROM coupon_users cu
            JOIN coupons c ON c.id = cu.coupon_id
            WHERE cu.id = $1 AND cu.user_id = $2 AND cu.coupon_id = $3
              AND cu.status = $4 AND NOT cu.deleted AND NOT c.deleted
              AND (cu.start_time IS NULL OR cu.start_time <= (now() AT TIME ZONE 'UTC'))
              AND (cu.end_time IS NULL OR cu.end_time > (now() AT TIME ZONE 'UTC'))
            FOR UPDATE OF cu
            "#,
        )
        .bind(user_coupon_id)
        .bind(user_id)
        .bind(coupon_id)
        .bind(CouponUserStatus::Usable)
        .fetch_optional(&mut **tx)
        .await
    }

    pub async fn mark_used_tx(
        tx: &mut Tx<'_>,
        user_coupon_id: i64,
        order_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE coupon_users
            SET status = $3,
                used_time = (now() AT TIME ZONE 'UTC'),
                order_id = $2,
                update_time = (now() AT TIME ZONE 'UTC')
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(user_coupon_id)
        .bind(order_id)
        .bind(CouponUserStatus::Used)
        .bind(CouponUserStatus::Usable)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Give back the coupon used by a cancelled order.
    pub async fn release_for_order_tx(tx: &mut Tx<'_>, order_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE coupon_users
            SET status = $2,
                used_time = NULL,
                order_id = NULL,
                update_time = (now() AT TIME ZONE 'UTC')
            WHERE order_id = $1 AND status = $3
            "#,
        )
        .bind(order_id)
        .bind(CouponUserStatus::Usable)
        .bind(CouponUserStatus::Used)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_minimum() {
        let coupon = UsableCoupon {
            user_coupon_id: 1,
            coupon_id: 2,
            discount: Decimal::new(10, 0),
            min: Decimal::new(99, 0),
        };
        assert!(!coupon.applies_to(Decimal::new(9899, 2)));
        assert!(coupon.applies_to(Decimal::new(99, 0)));
    }
}
