//! SQL statement validation for read-only enforcement.
//!
//! Unless the database URL carries `?writable=true`, `run_query` only accepts
//! statements that read: SELECT (and other queries), SHOW, and EXPLAIN of a
//! read. Everything else is refused before a connection is opened.
//!
//! Uses [sqlparser](https://docs.rs/sqlparser/) with the dialect of the
//! configured backend, so formatting tricks or comments cannot smuggle a
//! write past the check. Every statement of a multi-statement batch must pass.

use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

const READ_ONLY_REASON: &str = "The database is configured read-only; only SELECT, SHOW and EXPLAIN statements are accepted.";

/// Get the appropriate SQL dialect for the given database type.
fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Validate SQL for execution against a read-only database.
///
/// Returns `Err(DbError::Query)` if the statement cannot be parsed (it is then
/// never executed), or `Err(DbError::Permission)` if any statement would
/// modify data, schema, session or transaction state.
///
/// # Examples
///
/// ```
/// use sql_mcp_server::tools::sql_validator::validate_readonly;
/// use sql_mcp_server::models::DatabaseType;
///
/// assert!(validate_readonly("SELECT * FROM users", DatabaseType::PostgreSQL).is_ok());
/// assert!(validate_readonly("INSERT INTO users VALUES (1)", DatabaseType::PostgreSQL).is_err());
/// ```
pub fn validate_readonly(sql: &str, db_type: DatabaseType) -> DbResult<()> {
    let dialect = get_dialect(db_type);

    let statements = Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| {
        DbError::query(
            format!("Failed to parse SQL statement: {}", e),
            None,
            format!("Check the statement is valid {} SQL", db_type),
        )
    })?;

    if statements.is_empty() {
        return Err(DbError::query(
            "Empty SQL statement",
            None,
            "Provide a SELECT statement",
        ));
    }

    for stmt in &statements {
        if !is_read_only(stmt) {
            return Err(DbError::permission(operation_name(stmt), READ_ONLY_REASON));
        }
    }

    Ok(())
}

fn is_read_only(stmt: &Statement) -> bool {
    match stmt {
        Statement::Query(query) => is_read_only_query(query),
        Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowDatabases { .. }
        | Statement::ShowSchemas { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowVariable { .. }
        | Statement::ShowVariables { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowCollation { .. }
        | Statement::ExplainTable { .. } => true,
        // EXPLAIN ANALYZE runs the inner statement, so judge that
        Statement::Explain { statement, .. } => is_read_only(statement),
        _ => false,
    }
}

/// A query reads only if every CTE and every branch of its body does.
///
/// `WITH ... DELETE` and data-modifying CTEs parse as queries too.
fn is_read_only_query(query: &Query) -> bool {
    let ctes_read_only = query.with.as_ref().is_none_or(|with| {
        with.cte_tables
            .iter()
            .all(|cte| is_read_only_query(&cte.query))
    });
    ctes_read_only && is_read_only_body(&query.body)
}

fn is_read_only_body(body: &SetExpr) -> bool {
    match body {
        // SELECT ... INTO creates a table
        SetExpr::Select(select) => select.into.is_none(),
        SetExpr::Query(query) => is_read_only_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            is_read_only_body(left) && is_read_only_body(right)
        }
        SetExpr::Values(_) | SetExpr::Table(_) => true,
        _ => false,
    }
}

/// Leading keywords of a statement, for error messages ("INSERT", "CREATE TABLE").
fn operation_name(stmt: &Statement) -> String {
    if let Statement::Explain { statement, .. } = stmt {
        return format!("EXPLAIN {}", operation_name(statement));
    }
    if let Statement::Query(query) = stmt {
        return query_operation_name(query);
    }

    let text = stmt.to_string();
    let mut words = text.split_whitespace();
    let first = words.next().unwrap_or("UNKNOWN").to_uppercase();
    match first.as_str() {
        "CREATE" | "DROP" | "ALTER" => match words.next() {
            Some(second) => format!("{} {}", first, second.to_uppercase()),
            None => first,
        },
        _ => first,
    }
}

fn query_operation_name(query: &Query) -> String {
    let writing_cte = query.with.as_ref().and_then(|with| {
        with.cte_tables
            .iter()
            .find(|cte| !is_read_only_query(&cte.query))
    });
    if let Some(cte) = writing_cte {
        return query_operation_name(&cte.query);
    }
    match query.body.as_ref() {
        SetExpr::Select(_) => "SELECT INTO".to_string(),
        SetExpr::Query(inner) => query_operation_name(inner),
        // Insert, Update, Delete and Merge bodies render as the statement itself
        body => body
            .to_string()
            .split_whitespace()
            .next()
            .map(str::to_uppercase)
            .unwrap_or_else(|| "UNKNOWN".to_string()),
    }
}
