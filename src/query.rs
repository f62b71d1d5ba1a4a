use serde::Serialize;
use serde_json::Value;

/// Field selection for reads and listings. Defaults to every field (`"*"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Fields {
    #[default]
    All,
    Only(Vec<String>),
}

impl Fields {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Fields::Only(names.into_iter().map(Into::into).collect())
    }

    /// JSON text sent as the `fields` query parameter.
    pub(crate) fn to_param(&self) -> String {
        match self {
            Fields::All => Value::from("*").to_string(),
            Fields::Only(names) => Value::from(names.clone()).to_string(),
        }
    }
}

/// A `[field, operator, value]` constraint, e.g. `["status", "=", "Open"]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter(pub String, pub String, pub Value);

impl Filter {
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter(field.into(), operator.into(), value.into())
    }
}

/// Options for [`Client::list_documents`](crate::Client::list_documents).
///
/// Parameters are sent as follows:
/// - `fields`: always, JSON-encoded.
/// - `filters`: only when non-empty, as a JSON array of triples.
/// - `limit_start`, `limit_page_length`: only when set to a nonzero value; a
///   zero is omitted just like `None`, leaving the server default in place.
/// - `order_by`: only when set, verbatim (e.g. `"modified desc"`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub fields: Fields,
    pub filters: Vec<Filter>,
    pub limit_start: Option<u64>,
    pub limit_page_length: Option<u64>,
    pub order_by: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn limit_start(mut self, start: u64) -> Self {
        self.limit_start = Some(start);
        self
    }

    pub fn limit_page_length(mut self, length: u64) -> Self {
        self.limit_page_length = Some(length);
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub(crate) fn to_params(&self) -> crate::Result<Vec<(&'static str, String)>> {
        let mut params = vec![("fields", self.fields.to_param())];

        if !self.filters.is_empty() {
            params.push(("filters", serde_json::to_string(&self.filters)?));
        }
        if let Some(start) = self.limit_start.filter(|n| *n != 0) {
            params.push(("limit_start", start.to_string()));
        }
        if let Some(len) = self.limit_page_length.filter(|n| *n != 0) {
            params.push(("limit_page_length", len.to_string()));
        }
        if let Some(order_by) = &self.order_by {
            params.push(("order_by", order_by.clone()));
        }

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(params: &[(&'static str, String)]) -> Vec<&'static str> {
        params.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn default_sends_only_fields() {
        let params = ListQuery::new().to_params().unwrap();
        assert_eq!(params, vec![("fields", "\"*\"".to_string())]);
    }

    #[test]
    fn named_fields_are_a_json_array() {
        assert_eq!(
            Fields::only(["name", "subject"]).to_param(),
            r#"["name","subject"]"#
        );
    }

    #[test]
    fn filters_encode_as_triples() {
        let params = ListQuery::new()
            .filter(Filter::new("status", "=", "Open"))
            .filter(Filter::new("priority", "in", json!(["High", "Urgent"])))
            .to_params()
            .unwrap();

        assert_eq!(keys(&params), vec!["fields", "filters"]);
        let decoded: Value = serde_json::from_str(&params[1].1).unwrap();
        assert_eq!(
            decoded,
            json!([["status", "=", "Open"], ["priority", "in", ["High", "Urgent"]]])
        );
    }

    #[test]
    fn zero_limits_are_omitted() {
        let params = ListQuery::new()
            .limit_start(0)
            .limit_page_length(0)
            .to_params()
            .unwrap();
        assert_eq!(keys(&params), vec!["fields"]);
    }

    #[test]
    fn limits_and_order_are_sent_verbatim() {
        let params = ListQuery::new()
            .limit_start(20)
            .limit_page_length(10)
            .order_by("modified desc")
            .to_params()
            .unwrap();
        assert_eq!(
            params[1..],
            [
                ("limit_start", "20".to_string()),
                ("limit_page_length", "10".to_string()),
                ("order_by", "modified desc".to_string()),
            ]
        );
    }
}
