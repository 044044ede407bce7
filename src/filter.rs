use serde_json::Value;

/// First non-blank string among `fields`.
pub fn display_name<'a>(record: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|field| record.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .find(|name| !name.is_empty())
}

pub fn matches_query(name: &str, query: &str) -> bool {
    name.to_lowercase().contains(&query.trim().to_lowercase())
}

/// Case-insensitive substring filter on the display name, keeping order.
/// A blank query keeps everything; records without a name never match a
/// non-blank query.
pub fn filter_by_display_name(records: &[Value], fields: &[&str], query: &str) -> Vec<Value> {
    if query.trim().is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|record| {
            display_name(record, fields).is_some_and(|name| matches_query(name, query))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substring_match_keeps_order_and_ignores_case() {
        let records = vec![
            json!({ "_id": "1", "name": "ABCorp" }),
            json!({ "_id": "2", "name": "Zeta" }),
            json!({ "_id": "3", "fullName": "the abc shop" }),
            json!({ "_id": "4" }),
            json!({ "_id": "5", "name": "xaBcx" }),
        ];
        let found = filter_by_display_name(&records, &["name", "fullName"], "abc");
        let ids: Vec<_> = found.iter().map(|r| r["_id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["1", "3", "5"]);
    }

    #[test]
    fn blank_query_returns_everything() {
        let records = vec![json!({ "_id": "1" }), json!({ "_id": "2", "name": "b" })];
        assert_eq!(filter_by_display_name(&records, &["name"], "  ").len(), 2);
    }

    #[test]
    fn display_name_skips_blank_fields() {
        let record = json!({ "name": "  ", "email": "a@b.c" });
        assert_eq!(display_name(&record, &["name", "email"]), Some("a@b.c"));
    }
}
