use serde::{Deserialize, Serialize};

/// One daily sales observation for a marketplace product, as read from the
/// dataset and published to the record queue.
///
/// Records carry no identity beyond their field values; the same row read
/// twice produces two equal records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "product_name")]
    pub name: String,
    pub brand: String,
    /// Observation date exactly as written in the dataset, e.g. `"2024-03-01"`.
    pub date: String,
    pub sales_quantity: i64,
    pub price: f64,
    /// Price before discount; `0.0` when the dataset leaves it blank.
    pub original_price: f64,
    /// `0.0` when the dataset leaves it blank.
    pub discount_percentage: f64,
    pub stock_level: i64,
    pub region: String,
    pub category: String,
    pub customer_rating: f64,
    pub review_count: i64,
    pub delivery_days: i64,
    pub seller: String,
    pub is_weekend: bool,
    pub is_holiday: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record() -> ProductRecord {
        ProductRecord {
            name: "Wireless Earbuds X1".to_string(),
            brand: "Soundly".to_string(),
            date: "2024-03-01".to_string(),
            sales_quantity: 42,
            price: 1990.0,
            original_price: 2490.0,
            discount_percentage: 20.0,
            stock_level: 130,
            region: "Moscow".to_string(),
            category: "Electronics".to_string(),
            customer_rating: 4.6,
            review_count: 318,
            delivery_days: 2,
            seller: "Soundly Official".to_string(),
            is_weekend: false,
            is_holiday: true,
        }
    }

    #[test]
    fn serializes_name_as_product_name() {
        let json = serde_json::to_value(make_record()).expect("serialization failed");
        assert_eq!(json["product_name"], "Wireless Earbuds X1");
        assert!(json.get("name").is_none(), "field must use the wire name");
        assert_eq!(json["sales_quantity"], 42);
        assert_eq!(json["is_holiday"], true);
    }

    #[test]
    fn serialized_record_has_all_sixteen_fields() {
        let json = serde_json::to_value(make_record()).expect("serialization failed");
        let object = json.as_object().expect("record serializes to an object");
        assert_eq!(object.len(), 16);
        for key in [
            "product_name",
            "brand",
            "date",
            "sales_quantity",
            "price",
            "original_price",
            "discount_percentage",
            "stock_level",
            "region",
            "category",
            "customer_rating",
            "review_count",
            "delivery_days",
            "seller",
            "is_weekend",
            "is_holiday",
        ] {
            assert!(object.contains_key(key), "missing key {key}");
        }
    }

    #[test]
    fn deserializes_from_wire_format() {
        let json = serde_json::to_string(&make_record()).expect("serialization failed");
        let decoded: ProductRecord = serde_json::from_str(&json).expect("deserialization failed");
        assert_eq!(decoded, make_record());
    }
}
