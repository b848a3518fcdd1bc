use crate::framework::{DatabaseProcessor, Tx};
use kanau::processor::Processor;
use rust_decimal::Decimal;

/// Status of a group-buy rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[repr(i16)]
pub enum GrouponRuleStatus {
    Online = 0,
    /// Taken offline because it expired.
    Expired = 1,
    /// Taken offline by an administrator.
    Offline = 2,
}

/// Status of one participation in a group-buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[repr(i16)]
pub enum GrouponStatus {
    /// Order not paid yet.
    None = 0,
    /// Paid, waiting for the group to fill.
    On = 1,
    Succeed = 2,
    Fail = 3,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct GrouponRule {
    pub id: i64,
    pub goods_id: i64,
    pub discount: Decimal,
    /// Paid members needed for the group to succeed.
    pub discount_member: i32,
    pub expire_time: time::PrimitiveDateTime,
    pub status: GrouponRuleStatus,
}

/// One order's participation in a group-buy.
///
/// The creator's record has `groupon_id == 0`; records of members who joined
/// point at it. The creator's record id is the "link".
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Groupon {
    pub id: i64,
    pub order_id: i64,
    pub groupon_id: i64,
    pub rules_id: i64,
    pub user_id: i64,
    pub creator_user_id: i64,
    pub status: GrouponStatus,
}

impl Groupon {
    pub fn link_id(&self) -> i64 {
        if self.groupon_id == 0 { self.id } else { self.groupon_id }
    }
}

#[derive(Debug, Clone)]
pub struct GrouponInsert {
    pub order_id: i64,
    pub groupon_id: i64,
    pub rules_id: i64,
    pub user_id: i64,
    pub creator_user_id: i64,
}

#[derive(Debug, Clone)]
/// Which of the given orders take part in a group-buy.
pub struct GetGrouponOrderIds {
    pub order_ids: Vec<i64>,
}

impl Processor<GetGrouponOrderIds> for DatabaseProcessor {
    type Output = Vec<i64>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetGrouponOrderIds")]
    async fn process(&self, query: GetGrouponOrderIds) -> Result<Vec<i64>, sqlx::Error> {
        if query.order_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar(
            "SELECT DISTINCT order_id FROM groupons WHERE order_id = ANY($1) AND NOT deleted",
        )
        .bind(&query.order_ids)
        .fetch_all(&self.pool)
        .await
    }
}

const SELECT_GROUPON: &str =
    "SELECT id, order_id, groupon_id, rules_id, user_id, creator_user_id, status FROM groupons";

impl GrouponRule {
    pub async fn get_tx(tx: &mut Tx<'_>, rules_id: i64) -> Result<Option<GrouponRule>, sqlx::Error> {
        sqlx::query_as::<_, GrouponRule>(
            r#"
            SELECT id, goods_id, discount, discount_member, expire_time, status
            FROM groupon_rules
            WHERE id = $1 AND NOT deleted
            "#,
        )
        .bind(rules_id)
        .fetch_optional(&mut **tx)
        .await
    }
}

impl Groupon {
    pub async fn get_tx(tx: &mut Tx<'_>, id: i64) -> Result<Option<Groupon>, sqlx::Error> {
        sqlx::query_as::<_, Groupon>(&format!("{SELECT_GROUPON} WHERE id = $1 AND NOT deleted"))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn lock_by_order_tx(
        tx: &mut Tx<'_>,
        order_id: i64,
    ) -> Result<Option<Groupon>, sqlx::Error> {
        sqlx::query_as::<_, Groupon>(&format!(
            "{SELECT_GROUPON} WHERE order_id = $1 AND NOT deleted FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Members of a link whose status is one of `statuses`.
    pub async fn count_in_link_tx(
        tx: &mut Tx<'_>,
        link_id: i64,
        statuses: &[GrouponStatus],
    ) -> Result<i64, sqlx::Error> {
        let codes: Vec<i16> = statuses.iter().map(|s| *s as i16).collect();
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM groupons
            WHERE (id = $1 OR groupon_id = $1) AND status = ANY($2) AND NOT deleted
            "#,
        )
        .bind(link_id)
        .bind(&codes)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn user_in_link_tx(
        tx: &mut Tx<'_>,
        user_id: i64,
        link_id: i64,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM groupons
                WHERE (id = $1 OR groupon_id = $1) AND user_id = $2 AND status <> 0 AND NOT deleted
            )
            "#,
        )
        .bind(link_id)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn insert_tx(tx: &mut Tx<'_>, insert: &GrouponInsert) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            INSERT INTO groupons (order_id, groupon_id, rules_id, user_id, creator_user_id, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(insert.order_id)
        .bind(insert.groupon_id)
        .bind(insert.rules_id)
        .bind(insert.user_id)
        .bind(insert.creator_user_id)
        .bind(GrouponStatus::None)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn set_status_tx(
        tx: &mut Tx<'_>,
        id: i64,
        status: GrouponStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE groupons SET status = $2, update_time = (now() AT TIME ZONE 'UTC')
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Move every member of a link from `from` to `to`.
    pub async fn update_link_status_tx(
        tx: &mut Tx<'_>,
        link_id: i64,
        from: GrouponStatus,
        to: GrouponStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE groupons SET status = $3, update_time = (now() AT TIME ZONE 'UTC')
            WHERE (id = $1 OR groupon_id = $1) AND status = $2 AND NOT deleted
            "#,
        )
        .bind(link_id)
        .bind(from)
        .bind(to)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }
}
