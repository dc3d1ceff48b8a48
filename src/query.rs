//! Row filters rendered as PostgREST query parameters.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Single clause, applied in the order it was added
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    Order { column: String, ascending: bool },
    Limit(usize),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn in_list<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.predicates.push(Predicate::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.predicates.push(Predicate::Order {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Order by a `column`, `column.asc` or `column.desc` string.
    pub fn order_by(self, raw: &str) -> Self {
        let (column, ascending) = split_order(raw);
        self.order(column, ascending)
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.predicates.push(Predicate::Limit(count));
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// True when at least one clause narrows the row set.
    pub fn has_row_filter(&self) -> bool {
        self.predicates
            .iter()
            .any(|p| matches!(p, Predicate::Eq { .. } | Predicate::In { .. }))
    }

    /// Build a filter from a loose key/value mapping, keeping its key order.
    ///
    /// `order` and `limit` are reserved keys. Arrays become set membership,
    /// everything else equality.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let mut filter = Filter::new();

        for (key, value) in map {
            filter = match key.as_str() {
                "order" => {
                    let (column, ascending) = parse_order(value)?;
                    filter.order(column, ascending)
                }
                "limit" => {
                    let count = value.as_u64().ok_or_else(|| {
                        Error::InvalidInput(format!(
                            "limit must be an unsigned integer, got {}",
                            value
                        ))
                    })?;
                    filter.limit(count as usize)
                }
                _ => match value {
                    Value::Array(values) => filter.in_list(key.as_str(), values.iter().cloned()),
                    other => filter.eq(key.as_str(), other.clone()),
                },
            };
        }

        Ok(filter)
    }

    /// Query pairs in PostgREST syntax. Multiple order clauses collapse into
    /// one `order` pair placed where the first one appeared.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = Vec::new();
        let mut order_slot: Option<usize> = None;

        for predicate in &self.predicates {
            match predicate {
                Predicate::Eq { column, value } => {
                    let rendered = match value {
                        Value::Null => "is.null".to_string(),
                        other => format!("eq.{}", plain_value(other)),
                    };
                    params.push((column.clone(), rendered));
                }
                Predicate::In { column, values } => {
                    let items: Vec<String> = values.iter().map(list_item).collect();
                    params.push((column.clone(), format!("in.({})", items.join(","))));
                }
                Predicate::Order { column, ascending } => {
                    let clause = format!("{}.{}", column, if *ascending { "asc" } else { "desc" });
                    match order_slot {
                        Some(idx) => {
                            params[idx].1.push(',');
                            params[idx].1.push_str(&clause);
                        }
                        None => {
                            order_slot = Some(params.len());
                            params.push(("order".to_string(), clause));
                        }
                    }
                }
                Predicate::Limit(count) => params.push(("limit".to_string(), count.to_string())),
            }
        }

        params
    }
}

// A suffix other than asc/desc is part of the column name
fn split_order(raw: &str) -> (&str, bool) {
    match raw.rsplit_once('.') {
        Some((column, "asc")) => (column, true),
        Some((column, "desc")) => (column, false),
        _ => (raw, true),
    }
}

fn parse_order(value: &Value) -> Result<(String, bool)> {
    match value {
        Value::String(raw) => {
            let (column, ascending) = split_order(raw);
            Ok((column.to_string(), ascending))
        }
        Value::Object(obj) => {
            let column = obj.get("column").and_then(Value::as_str).ok_or_else(|| {
                Error::InvalidInput("order object needs a \"column\" string".to_string())
            })?;
            let ascending = obj.get("ascending").and_then(Value::as_bool).unwrap_or(true);
            Ok((column.to_string(), ascending))
        }
        other => Err(Error::InvalidInput(format!("unsupported order value: {}", other))),
    }
}

fn plain_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// Items inside in.(...) need quoting when they contain reserved characters
fn list_item(value: &Value) -> String {
    let raw = plain_value(value);
    let reserved = raw
        .chars()
        .any(|c| matches!(c, ',' | '.' | ':' | '(' | ')' | '"') || c.is_whitespace());
    if !reserved || !value.is_string() {
        return raw;
    }
    let escaped = raw.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_builder_keeps_order() {
        let filter = Filter::new()
            .eq("status", "active")
            .in_list("id", [1, 2, 3])
            .order("created_at", false)
            .limit(10);

        assert_eq!(
            filter.to_params(),
            vec![
                pair("status", "eq.active"),
                pair("id", "in.(1,2,3)"),
                pair("order", "created_at.desc"),
                pair("limit", "10"),
            ]
        );
    }

    #[test]
    fn test_multiple_orders_joined() {
        let filter = Filter::new()
            .order("priority", false)
            .eq("done", false)
            .order("name", true);

        assert_eq!(
            filter.to_params(),
            vec![pair("order", "priority.desc,name.asc"), pair("done", "eq.false")]
        );
    }

    #[test]
    fn test_null_and_quoted_values() {
        let filter = Filter::new()
            .eq("deleted_at", Value::Null)
            .in_list("city", ["Paris", "St. Louis", "a,b"]);

        assert_eq!(
            filter.to_params(),
            vec![
                pair("deleted_at", "is.null"),
                pair("city", "in.(Paris,\"St. Louis\",\"a,b\")"),
            ]
        );
    }

    #[test]
    fn test_from_map_reserved_keys() {
        let map = json!({
            "owner": "u1",
            "tags": ["a", "b"],
            "order": "updated_at.desc",
            "limit": 5
        });
        let filter = Filter::from_map(map.as_object().unwrap()).unwrap();

        assert_eq!(
            filter.predicates(),
            &[
                Predicate::Eq { column: "owner".into(), value: json!("u1") },
                Predicate::In { column: "tags".into(), values: vec![json!("a"), json!("b")] },
                Predicate::Order { column: "updated_at".into(), ascending: false },
                Predicate::Limit(5),
            ]
        );
    }

    #[test]
    fn test_order_by_suffix() {
        let filter = Filter::new()
            .order_by("created_at.desc")
            .order_by("name.asc")
            .order_by("author.email");

        assert_eq!(
            filter.to_params(),
            vec![pair("order", "created_at.desc,name.asc,author.email.asc")]
        );
    }

    #[test]
    fn test_from_map_order_object() {
        let map = json!({ "order": { "column": "score", "ascending": false } });
        let filter = Filter::from_map(map.as_object().unwrap()).unwrap();
        assert_eq!(filter.to_params(), vec![pair("order", "score.desc")]);
    }

    #[test]
    fn test_from_map_rejects_bad_limit() {
        let map = json!({ "limit": "ten" });
        let err = Filter::from_map(map.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_row_filter_detection() {
        assert!(!Filter::new().limit(1).has_row_filter());
        assert!(Filter::new().eq("id", 1).has_row_filter());
    }
}
