//! SQL statement builders the executors embed compiled predicates into.

use std::fmt::Write;

use crate::value::{FilterValue, Params};

/// Parameter prefix reserved for `SET` assignments of batch updates.
pub const SET_PARAM_PREFIX: &str = "__set_";

/// Escape a string for use in SQL (for identifiers, not values).
pub fn escape_identifier(name: &str) -> String {
    let escaped = name.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Check if an identifier needs quoting.
pub fn needs_quoting(name: &str) -> bool {
    // SQLite keywords that show up as column names in practice
    const RESERVED: &[&str] = &[
        "user", "order", "group", "select", "from", "where", "table", "index", "key", "primary",
        "foreign", "check", "default", "null", "not", "and", "or", "in", "is", "like", "between",
        "case", "when", "then", "else", "end", "as", "on", "join", "left", "right", "inner",
        "outer", "cross", "natural", "using", "limit", "offset", "union", "intersect", "except",
        "all", "distinct", "having", "create", "alter", "drop", "insert", "update", "delete",
        "into", "values", "set", "returning", "type", "to",
    ];

    if RESERVED.contains(&name.to_lowercase().as_str()) {
        return true;
    }
    name.is_empty()
        || name.starts_with(|c: char| c.is_ascii_digit())
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote an identifier if needed.
pub fn quote_identifier(name: &str) -> String {
    if needs_quoting(name) {
        escape_identifier(name)
    } else {
        name.to_string()
    }
}

/// A `SELECT` over one aliased table.
///
/// The executor adds the compiled predicate with [`SelectStatement::and_where`];
/// shaping callbacks add joins, ordering and extra conditions the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    table: String,
    alias: String,
    columns: Vec<String>,
    joins: Vec<String>,
    conditions: Vec<String>,
    params: Params,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectStatement {
    /// Select from `table` aliased as `alias`.
    pub fn new(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            columns: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            params: Params::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Table alias.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Add a result column expression. Defaults to `<alias>.*`.
    pub fn column(&mut self, expr: impl Into<String>) -> &mut Self {
        self.columns.push(expr.into());
        self
    }

    /// Add a join clause, e.g. `LEFT JOIN contact c2 ON c2.id = r.contactId`.
    pub fn join(&mut self, clause: impl Into<String>) -> &mut Self {
        self.joins.push(clause.into());
        self
    }

    /// Add a condition together with the parameters it references.
    pub fn and_where(&mut self, condition: impl Into<String>, params: Params) -> &mut Self {
        self.conditions.push(condition.into());
        self.params.extend(params);
        self
    }

    /// Add an ordering term, e.g. `c.joined DESC`.
    pub fn order_by(&mut self, term: impl Into<String>) -> &mut Self {
        self.order_by.push(term.into());
        self
    }

    /// Limit the number of rows.
    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Skip rows.
    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Parameters referenced by the statement.
    pub fn params(&self) -> &Params {
        &self.params
    }

    fn push_from_where(&self, sql: &mut String) {
        let _ = write!(sql, " FROM {} {}", quote_identifier(&self.table), self.alias);
        for join in &self.joins {
            let _ = write!(sql, " {}", join);
        }
        if !self.conditions.is_empty() {
            let _ = write!(sql, " WHERE {}", self.conditions.join(" AND "));
        }
    }

    /// Render the rows statement.
    pub fn to_sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.columns.is_empty() {
            let _ = write!(sql, "{}.*", self.alias);
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        self.push_from_where(&mut sql);

        if !self.order_by.is_empty() {
            let _ = write!(sql, " ORDER BY {}", self.order_by.join(", "));
        }
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                let _ = write!(sql, " LIMIT {} OFFSET {}", limit, offset);
            }
            (Some(limit), None) => {
                let _ = write!(sql, " LIMIT {}", limit);
            }
            // SQLite only accepts OFFSET after a LIMIT
            (None, Some(offset)) => {
                let _ = write!(sql, " LIMIT -1 OFFSET {}", offset);
            }
            (None, None) => {}
        }
        sql
    }

    /// Render the total-count statement; ordering and paging are ignored.
    pub fn to_count_sql(&self) -> String {
        let mut sql = String::from("SELECT COUNT(*) AS count");
        self.push_from_where(&mut sql);
        sql
    }
}

/// An `UPDATE` of every row whose primary key matches a filtered sub-select.
///
/// ```rust
/// use sift_query::sql::UpdateStatement;
/// use sift_query::value::Params;
///
/// let mut update = UpdateStatement::new("contact", "c", "id");
/// update.set("deliveryOptIn", false).filter("(c.email = :a_0)", Params::new());
///
/// assert_eq!(
///     update.to_sql(),
///     "UPDATE contact SET deliveryOptIn = :__set_0 \
///      WHERE id IN (SELECT c.id FROM contact c WHERE (c.email = :a_0)) RETURNING id"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    table: String,
    alias: String,
    primary_key: String,
    assignments: Vec<(String, FilterValue)>,
    joins: Vec<String>,
    conditions: Vec<String>,
    params: Params,
}

impl UpdateStatement {
    /// Update `table`, filtering through `alias`, returning `primary_key`.
    pub fn new(
        table: impl Into<String>,
        alias: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            primary_key: primary_key.into(),
            assignments: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            params: Params::new(),
        }
    }

    /// Assign `value` to `column`.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> &mut Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    /// Check if nothing would be assigned.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Add a join to the filtering sub-select.
    pub fn join(&mut self, clause: impl Into<String>) -> &mut Self {
        self.joins.push(clause.into());
        self
    }

    /// Add a condition of the filtering sub-select.
    pub fn filter(&mut self, condition: impl Into<String>, params: Params) -> &mut Self {
        self.conditions.push(condition.into());
        self.params.extend(params);
        self
    }

    /// Render the statement.
    pub fn to_sql(&self) -> String {
        let table = quote_identifier(&self.table);
        let pk = quote_identifier(&self.primary_key);

        let assignments = self
            .assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| {
                format!("{} = :{}{}", quote_identifier(column), SET_PARAM_PREFIX, i)
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "UPDATE {table} SET {assignments} WHERE {pk} IN (SELECT {}.{pk} FROM {table} {}",
            self.alias, self.alias
        );
        for join in &self.joins {
            let _ = write!(sql, " {}", join);
        }
        if !self.conditions.is_empty() {
            let _ = write!(sql, " WHERE {}", self.conditions.join(" AND "));
        }
        let _ = write!(sql, ") RETURNING {pk}");
        sql
    }

    /// All parameters: assignments first, then filter parameters.
    pub fn params(&self) -> Params {
        let mut params: Params = self
            .assignments
            .iter()
            .enumerate()
            .map(|(i, (_, value))| (format!("{}{}", SET_PARAM_PREFIX, i), value.clone()))
            .collect();
        params.extend(self.params.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("user"), "\"user\"");
        assert_eq!(escape_identifier("has\"quote"), "\"has\"\"quote\"");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("order"), "\"order\"");
        assert_eq!(quote_identifier("contactId"), "contactId");
        assert_eq!(quote_identifier("answers.q1"), "\"answers.q1\"");
        assert_eq!(quote_identifier("1st"), "\"1st\"");
    }

    #[test]
    fn test_select_rows_and_count() {
        let mut params = Params::new();
        params.insert("a_0".into(), "x@example.com".into());

        let mut select = SelectStatement::new("contact", "c");
        select
            .join("LEFT JOIN contact_profile cp ON cp.contactId = c.id")
            .and_where("(c.email = :a_0)", params)
            .order_by("c.joined DESC")
            .limit(10)
            .offset(20);

        assert_eq!(
            select.to_sql(),
            "SELECT c.* FROM contact c LEFT JOIN contact_profile cp ON cp.contactId = c.id \
             WHERE (c.email = :a_0) ORDER BY c.joined DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            select.to_count_sql(),
            "SELECT COUNT(*) AS count FROM contact c LEFT JOIN contact_profile cp ON cp.contactId = c.id \
             WHERE (c.email = :a_0)"
        );
        assert_eq!(select.params().len(), 1);
    }

    #[test]
    fn test_select_offset_without_limit() {
        let mut select = SelectStatement::new("payment", "p");
        select.column("p.id").offset(5);
        assert_eq!(select.to_sql(), "SELECT p.id FROM payment p LIMIT -1 OFFSET 5");
    }

    #[test]
    fn test_update_params_put_assignments_first() {
        let mut filter = Params::new();
        filter.insert("a_0".into(), "vip".into());

        let mut update = UpdateStatement::new("callout_response", "r", "id");
        update
            .set("bucket", "archived")
            .set("assigneeId", FilterValue::Null)
            .filter("(r.bucket = :a_0)", filter);

        assert_eq!(
            update.to_sql(),
            "UPDATE callout_response SET bucket = :__set_0, assigneeId = :__set_1 \
             WHERE id IN (SELECT r.id FROM callout_response r WHERE (r.bucket = :a_0)) RETURNING id"
        );
        let keys: Vec<_> = update.params().keys().cloned().collect();
        assert_eq!(keys, vec!["__set_0", "__set_1", "a_0"]);
    }
}
