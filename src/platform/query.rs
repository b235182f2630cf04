use std::fmt::Display;

/// Builder for the query string of a platform row request (PostgREST
/// operator syntax: `column=op.value`, plus `select`, `order`, `limit`).
///
/// Only the predicates this portal actually issues are modeled; anything
/// fancier belongs to the platform, not here.
#[derive(Debug, Clone)]
pub struct TableQuery {
    table: String,
    params: Vec<(String, String)>,
}

impl TableQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            params: vec![("select".to_string(), "*".to_string())],
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn select(mut self, columns: &str) -> Self {
        if let Some(slot) = self.params.iter_mut().find(|(k, _)| k == "select") {
            slot.1 = columns.to_string();
        }
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.op(column, "eq", value)
    }

    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.op(column, "neq", value)
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.op(column, "gte", value)
    }

    pub fn lt(self, column: &str, value: impl Display) -> Self {
        self.op(column, "lt", value)
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params
            .push(("order".to_string(), format!("{}.{}", column, direction)));
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.params.push(("limit".to_string(), n.to_string()));
        self
    }

    fn op(mut self, column: &str, op: &str, value: impl Display) -> Self {
        self.params
            .push((column.to_string(), format!("{}.{}", op, value)));
        self
    }

    /// Key/value pairs ready for `reqwest::RequestBuilder::query`, which
    /// handles percent-encoding.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(query: &TableQuery) -> Vec<(String, String)> {
        query.params().to_vec()
    }

    #[test]
    fn defaults_to_select_star() {
        let q = TableQuery::new("profiles");
        assert_eq!(q.table(), "profiles");
        assert_eq!(rendered(&q), vec![("select".into(), "*".into())]);
    }

    #[test]
    fn renders_operators_in_order() {
        let q = TableQuery::new("notes")
            .eq("document_id", "abc")
            .order("created_at", true)
            .limit(10);
        assert_eq!(
            rendered(&q),
            vec![
                ("select".into(), "*".into()),
                ("document_id".into(), "eq.abc".into()),
                ("order".into(), "created_at.asc".into()),
                ("limit".into(), "10".into()),
            ]
        );
    }

    #[test]
    fn select_replaces_columns() {
        let q = TableQuery::new("profiles").select("id,role").neq("role", "admin");
        assert_eq!(
            rendered(&q),
            vec![
                ("select".into(), "id,role".into()),
                ("role".into(), "neq.admin".into()),
            ]
        );
    }

    #[test]
    fn range_predicates_for_day_window() {
        let q = TableQuery::new("ping")
            .gte("created_at", "2025-03-01T00:00:00Z")
            .lt("created_at", "2025-03-02T00:00:00Z")
            .limit(1);
        assert_eq!(
            rendered(&q)[1],
            ("created_at".into(), "gte.2025-03-01T00:00:00Z".into())
        );
        assert_eq!(
            rendered(&q)[2],
            ("created_at".into(), "lt.2025-03-02T00:00:00Z".into())
        );
    }
}
