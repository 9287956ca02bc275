//! Order records emitted alongside portfolio metrics

use crate::point::{FieldValue, Fields};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Order {
    pub id: String,
    pub client_id: String,
    pub symbol: String,
    pub price: f64,
    pub qty: f64,
    pub side: String,
    pub status: String,
    pub cancel_type: String,
    pub reject_reason: String,
    pub avg_price: f64,
    pub cum_exec_qty: f64,
    pub cum_exec_value: f64,
    pub cum_exec_fee: f64,
    pub time_in_force: String,
    pub order_type: String,
    pub reduce_only: bool,
    /// Milliseconds since epoch
    pub created_time: i64,
    pub updated_time: i64,
    pub slippage: f64,
}

impl Order {
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        let mut put = |key: &str, value: FieldValue| {
            fields.insert(key.to_string(), value);
        };

        put("orderId", self.id.as_str().into());
        put("orderClientId", self.client_id.as_str().into());
        put("orderPrice", self.price.into());
        put("orderQty", self.qty.into());
        put("orderSide", self.side.as_str().into());
        put("orderStatus", self.status.as_str().into());
        put("orderCancelType", self.cancel_type.as_str().into());
        put("orderRejectReason", self.reject_reason.as_str().into());
        put("orderAvgPrice", self.avg_price.into());
        put("orderCumExecQty", self.cum_exec_qty.into());
        put("orderCumExecValue", self.cum_exec_value.into());
        put("orderCumExecFee", self.cum_exec_fee.into());
        put("orderTimeInForce", self.time_in_force.as_str().into());
        put("orderType", self.order_type.as_str().into());
        // Stored as 0/1 so it can be summed in queries
        put("orderReduceOnly", FieldValue::Integer(i64::from(self.reduce_only)));
        put("orderCreatedTime", self.created_time.into());
        put("orderUpdatedTime", self.updated_time.into());
        put("orderSlippage", self.slippage.into());

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_fields() {
        let order = Order {
            id: "123".to_string(),
            symbol: "BTCUSDT".to_string(),
            price: 50000.0,
            qty: 0.01,
            side: "Buy".to_string(),
            reduce_only: true,
            created_time: 1_700_000_000_000,
            ..Default::default()
        };

        let fields = order.to_fields();
        assert_eq!(fields.len(), 18);
        assert_eq!(fields["orderId"], FieldValue::String("123".to_string()));
        assert_eq!(fields["orderReduceOnly"], FieldValue::Integer(1));
        assert_eq!(fields["orderCreatedTime"], FieldValue::Integer(1_700_000_000_000));
        assert_eq!(fields["orderPrice"], FieldValue::Float(50000.0));
        assert_eq!(fields["orderCancelType"], FieldValue::String(String::new()));
    }
}
