use crate::framework::Tx;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub tel: String,
    pub province: String,
    pub city: String,
    pub county: String,
    pub address_detail: String,
}

impl Address {
    /// The address line stored on the order.
    pub fn full_address(&self) -> String {
        format!(
            "{}{}{} {}",
            self.province, self.city, self.county, self.address_detail
        )
    }

    pub async fn get_for_user_tx(
        tx: &mut Tx<'_>,
        user_id: i64,
        address_id: i64,
    ) -> Result<Option<Address>, sqlx::Error> {
        sqlx::query_as::<_, Address>(
            r#"
            SELECT id, user_id, name, tel, province, city, county, address_detail
            FROM addresses
            WHERE id = $1 AND user_id = $2 AND NOT deleted
            "#,
        )
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_address() {
        let address = Address {
            id: 1,
            user_id: 2,
            name: "Li Lei".into(),
            tel: "13800000000".into(),
            province: "Zhejiang".into(),
            city: "Hangzhou".into(),
            county: "Xihu".into(),
            address_detail: "12 Wensan Rd".into(),
        };
        assert_eq!(address.full_address(), "ZhejiangHangzhouXihu 12 Wensan Rd");
    }
}
