use std::marker::PhantomData;

use serde_json::Value;
use sqlx::Row as _;
use tracing::warn;

use crate::db::record::{validate_identifier, Field, Patch, Record};
use crate::db::{Executor, MapperError};

/// Generic data access for one record type, bound to `R::TABLE`.
///
/// Construction validates the table name and the full declared column set,
/// so a record type with a hostile or duplicated column name is a hard
/// error before any query executes.
pub struct Repository<R: Record> {
    db: Executor,
    _marker: PhantomData<R>,
}

/// Check a record type's declared table and column names before any SQL
/// is built from them.
pub fn validate_record<R: Record>() -> Result<(), MapperError> {
    validate_identifier(R::TABLE).map_err(|_| MapperError::InvalidTable(R::TABLE.to_string()))?;

    for (ii, column) in R::COLUMNS.iter().enumerate() {
        validate_identifier(column)?;
        if R::COLUMNS[..ii].contains(column) {
            return Err(MapperError::DuplicateColumn(column.to_string()));
        }
    }
    Ok(())
}

impl<R: Record> Repository<R> {
    pub fn new(db: Executor) -> Result<Self, MapperError> {
        validate_record::<R>()?;
        Ok(Self {
            db,
            _marker: PhantomData,
        })
    }

    /// `SELECT <declared columns> FROM <table> [WHERE <where_sql>]`.
    ///
    /// `where_sql` is a code-authored clause with `$1`-style placeholders
    /// matching `args`; it is never built from client strings. Result rows
    /// carrying more columns than the record declares are scanned anyway:
    /// the extras are logged and discarded rather than failing the query.
    pub async fn select(&self, where_sql: &str, args: &[Value]) -> Result<Vec<R>, MapperError> {
        let sql = build_select(R::TABLE, R::COLUMNS, where_sql);
        let rows = self.db.fetch(&sql, args).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            if row.len() > R::COLUMNS.len() {
                warn!(
                    table = R::TABLE,
                    got = row.len(),
                    declared = R::COLUMNS.len(),
                    "result row carries undeclared columns; extras discarded"
                );
            }
            records.push(R::from_row(row)?);
        }
        Ok(records)
    }

    /// Like [`Repository::select`], but requires exactly one matching row.
    pub async fn select_one(&self, where_sql: &str, args: &[Value]) -> Result<R, MapperError> {
        let mut rows = self.select(where_sql, args).await?;
        if rows.len() != 1 {
            return Err(MapperError::NotFound(format!(
                "expected exactly one row in {}, got {}",
                R::TABLE,
                rows.len()
            )));
        }
        Ok(rows.remove(0))
    }

    /// Number of rows matching the zero-elided filter, without
    /// materializing them.
    pub async fn count(&self, filter: &R) -> Result<i64, MapperError> {
        let (sql, params) = build_count(R::TABLE, &filter.fields());
        let rows = self.db.fetch(&sql, &params).await?;
        Ok(rows.len() as i64)
    }

    /// Positional INSERT of every non-zero field.
    pub async fn insert(&self, record: &R) -> Result<(), MapperError> {
        let fields = record.fields();
        if fields.is_empty() {
            return Err(MapperError::EmptyClause("insert"));
        }
        let (sql, params) = build_insert(R::TABLE, &fields);
        self.db.execute(&sql, &params).await?;
        Ok(())
    }

    /// UPDATE with explicit-presence patch semantics: every patch field is
    /// written, even when zero-valued. The filter alone is zero-elided,
    /// and an all-zero filter is refused rather than updating the table.
    pub async fn update<P: Patch>(&self, patch: &P, filter: &R) -> Result<(), MapperError> {
        let set = patch.fields();
        if set.is_empty() {
            return Err(MapperError::EmptyClause("set"));
        }
        let where_fields = filter.fields();
        if where_fields.is_empty() {
            return Err(MapperError::EmptyClause("where"));
        }
        let (sql, params) = build_update(R::TABLE, &set, &where_fields);
        self.db.execute(&sql, &params).await?;
        Ok(())
    }

    /// DELETE by zero-elided filter; an all-zero filter is refused.
    pub async fn delete(&self, filter: &R) -> Result<(), MapperError> {
        let where_fields = filter.fields();
        if where_fields.is_empty() {
            return Err(MapperError::EmptyClause("where"));
        }
        let (sql, params) = build_delete(R::TABLE, &where_fields);
        self.db.execute(&sql, &params).await?;
        Ok(())
    }
}

fn quoted_columns(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// AND-joined `"col" = $n` conditions, numbered from `start`.
fn conditions(fields: &[Field], start: usize) -> String {
    fields
        .iter()
        .enumerate()
        .map(|(ii, f)| format!("\"{}\" = ${}", f.column, start + ii))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn params_of(fields: &[Field]) -> Vec<Value> {
    fields.iter().map(|f| f.value.clone()).collect()
}

pub(crate) fn build_select(table: &str, columns: &[&str], where_sql: &str) -> String {
    let mut sql = format!("SELECT {} FROM \"{}\"", quoted_columns(columns), table);
    if !where_sql.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(where_sql);
    }
    sql
}

pub(crate) fn build_count(table: &str, fields: &[Field]) -> (String, Vec<Value>) {
    let mut sql = format!("SELECT 1 FROM \"{}\"", table);
    if !fields.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions(fields, 1));
    }
    (sql, params_of(fields))
}

pub(crate) fn build_insert(table: &str, fields: &[Field]) -> (String, Vec<Value>) {
    let placeholders = (1..=fields.len())
        .map(|n| format!("${}", n))
        .collect::<Vec<_>>()
        .join(", ");
    let columns = fields.iter().map(|f| f.column).collect::<Vec<_>>();
    let sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        table,
        quoted_columns(&columns),
        placeholders
    );
    (sql, params_of(fields))
}

pub(crate) fn build_update(table: &str, set: &[Field], where_fields: &[Field]) -> (String, Vec<Value>) {
    let sets = set
        .iter()
        .enumerate()
        .map(|(ii, f)| format!("\"{}\" = ${}", f.column, ii + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE \"{}\" SET {} WHERE {}",
        table,
        sets,
        conditions(where_fields, set.len() + 1)
    );
    let mut params = params_of(set);
    params.extend(params_of(where_fields));
    (sql, params)
}

pub(crate) fn build_delete(table: &str, fields: &[Field]) -> (String, Vec<Value>) {
    let sql = format!(
        "DELETE FROM \"{}\" WHERE {}",
        table,
        conditions(fields, 1)
    );
    (sql, params_of(fields))
}
