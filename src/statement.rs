use crate::{
    parameters::ParameterValue,
    record::Record,
    result::{RecordError, Result},
    str_utils::{quote_column, quote_table},
};

/// Placeholder generator for a backend: `?1, ?2, ...` for SQLite, `$1, $2, ...` for PostgreSQL
pub type PlaceholderGen = dyn Fn(usize) -> String;

pub fn sqlite_placeholder(idx: usize) -> String {
    format!("?{idx}")
}

pub fn postgres_placeholder(idx: usize) -> String {
    format!("${idx}")
}

/// SQL text with its positional bind values, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<ParameterValue>,
}

impl SqlStatement {
    fn push_param(&mut self, value: ParameterValue, placeholder_gen: &PlaceholderGen) -> String {
        self.params.push(value);
        placeholder_gen(self.params.len())
    }

    /// Append ` WHERE a = ?1 AND b IS NULL ...`; nothing for an empty filter
    fn push_where_clause(&mut self, filter: &Record, placeholder_gen: &PlaceholderGen) -> Result<()> {
        let mut conditions = Vec::with_capacity(filter.len());
        for (column, value) in filter {
            let column = quote_column(column)?;
            let value = ParameterValue::from(value);
            if value.is_null() {
                conditions.push(format!("{column} IS NULL"));
            } else {
                let placeholder = self.push_param(value, placeholder_gen);
                conditions.push(format!("{column} = {placeholder}"));
            }
        }
        if !conditions.is_empty() {
            self.sql.push_str(" WHERE ");
            self.sql.push_str(&conditions.join(" AND "));
        }
        Ok(())
    }
}

/// `SELECT <columns> FROM <table> [WHERE ...] [LIMIT n]`; empty `columns` selects `*`
pub fn build_select(
    table: &str,
    columns: &[&str],
    filter: &Record,
    limit: Option<usize>,
    placeholder_gen: &PlaceholderGen,
) -> Result<SqlStatement> {
    let table = quote_table(table)?;
    let projection = if columns.is_empty() {
        "*".to_string()
    } else {
        columns
            .iter()
            .map(|column| quote_column(column))
            .collect::<Result<Vec<_>>>()?
            .join(", ")
    };

    let mut statement = SqlStatement {
        sql: format!("SELECT {projection} FROM {table}"),
        params: Vec::new(),
    };
    statement.push_where_clause(filter, placeholder_gen)?;
    if let Some(limit) = limit {
        statement.sql.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(statement)
}

/// `INSERT INTO <table> (...) VALUES (...)`, or `DEFAULT VALUES` for an empty record.
/// `returning` appends a `RETURNING` clause for backends that report keys that way.
pub fn build_insert(
    table: &str,
    data: &Record,
    returning: Option<&str>,
    placeholder_gen: &PlaceholderGen,
) -> Result<SqlStatement> {
    let table = quote_table(table)?;
    let mut statement = SqlStatement {
        sql: String::new(),
        params: Vec::new(),
    };

    if data.is_empty() {
        statement.sql = format!("INSERT INTO {table} DEFAULT VALUES");
    } else {
        let mut columns = Vec::with_capacity(data.len());
        let mut placeholders = Vec::with_capacity(data.len());
        for (column, value) in data {
            columns.push(quote_column(column)?);
            placeholders.push(statement.push_param(ParameterValue::from(value), placeholder_gen));
        }
        statement.sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
    }

    if let Some(column) = returning {
        statement.sql.push_str(&format!(" RETURNING {}", quote_column(column)?));
    }
    Ok(statement)
}

/// `UPDATE <table> SET ... [WHERE ...]`. The data is applied verbatim; filter fields are
/// not merged into it.
pub fn build_update(
    table: &str,
    data: &Record,
    filter: &Record,
    placeholder_gen: &PlaceholderGen,
) -> Result<SqlStatement> {
    if data.is_empty() {
        return Err(RecordError::EmptyUpdate(table.to_string()));
    }
    let quoted_table = quote_table(table)?;
    let mut statement = SqlStatement {
        sql: String::new(),
        params: Vec::new(),
    };

    let mut assignments = Vec::with_capacity(data.len());
    for (column, value) in data {
        let column = quote_column(column)?;
        let placeholder = statement.push_param(ParameterValue::from(value), placeholder_gen);
        assignments.push(format!("{column} = {placeholder}"));
    }
    statement.sql = format!("UPDATE {quoted_table} SET {}", assignments.join(", "));
    statement.push_where_clause(filter, placeholder_gen)?;
    Ok(statement)
}
