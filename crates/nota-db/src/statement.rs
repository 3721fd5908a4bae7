//! Parameterized statement construction from field maps.
//!
//! Repositories describe a write or a filter as an ordered mapping of
//! column name to typed bind value; the builders here turn that map into
//! SQL text with `$1..$n` placeholders and a parameter vector in matching
//! order. Column and table names only ever come from `&'static str`
//! repository code — user-controlled data exists exclusively as bound
//! parameters.

use chrono::{DateTime, Utc};
use pgvector::Vector;

use nota_core::{Error, FieldState, Result};

/// A typed SQL parameter. Each variant carries an `Option` so an explicit
/// NULL stays typed and bindable, distinct from a column that is simply
/// not part of the statement.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    BigInt(Option<i64>),
    Text(Option<String>),
    Bool(Option<bool>),
    Timestamp(Option<DateTime<Utc>>),
    Vector(Option<Vector>),
}

impl BindValue {
    /// True if this parameter is an explicit SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            BindValue::BigInt(None)
                | BindValue::Text(None)
                | BindValue::Bool(None)
                | BindValue::Timestamp(None)
                | BindValue::Vector(None)
        )
    }
}

/// Conversion from a field's value type into its typed parameter,
/// including the typed-NULL form used for `FieldState::Null`.
pub trait BindField {
    fn to_bind(&self) -> BindValue;
    fn null_bind() -> BindValue;
}

impl BindField for i64 {
    fn to_bind(&self) -> BindValue {
        BindValue::BigInt(Some(*self))
    }
    fn null_bind() -> BindValue {
        BindValue::BigInt(None)
    }
}

impl BindField for String {
    fn to_bind(&self) -> BindValue {
        BindValue::Text(Some(self.clone()))
    }
    fn null_bind() -> BindValue {
        BindValue::Text(None)
    }
}

impl BindField for bool {
    fn to_bind(&self) -> BindValue {
        BindValue::Bool(Some(*self))
    }
    fn null_bind() -> BindValue {
        BindValue::Bool(None)
    }
}

impl BindField for DateTime<Utc> {
    fn to_bind(&self) -> BindValue {
        BindValue::Timestamp(Some(*self))
    }
    fn null_bind() -> BindValue {
        BindValue::Timestamp(None)
    }
}

impl BindField for Vector {
    fn to_bind(&self) -> BindValue {
        BindValue::Vector(Some(self.clone()))
    }
    fn null_bind() -> BindValue {
        BindValue::Vector(None)
    }
}

/// Ordered column → parameter mapping. Built from entity fields;
/// `FieldState::Unset` fields are skipped at the type level and can never
/// reach a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(&'static str, BindValue)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a three-state field. `Unset` adds nothing, `Null` adds a typed
    /// NULL, `Value` adds the bound value.
    pub fn field<T: BindField>(mut self, column: &'static str, field: &FieldState<T>) -> Self {
        match field {
            FieldState::Unset => {}
            FieldState::Null => self.entries.push((column, T::null_bind())),
            FieldState::Value(v) => self.entries.push((column, v.to_bind())),
        }
        self
    }

    /// Add an always-present value.
    pub fn value<T: BindField>(mut self, column: &'static str, value: &T) -> Self {
        self.entries.push((column, value.to_bind()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(c, _)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(&'static str, BindValue)> {
        self.entries.iter()
    }
}

/// A ready-to-bind statement: SQL text plus parameters in placeholder
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<BindValue>,
}

/// `INSERT INTO <table> (cols…) VALUES ($1…) RETURNING *`.
///
/// An empty field map is rejected: an all-defaults insert is a caller
/// bug in this schema, not a supported statement.
pub fn build_insert(table: &str, fields: &FieldMap) -> Result<Statement> {
    if fields.is_empty() {
        return Err(Error::Precondition(format!(
            "insert into {} with no fields",
            table
        )));
    }

    let columns: Vec<&str> = fields.columns().collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    let params = fields.iter().map(|(_, v)| v.clone()).collect();

    Ok(Statement { sql, params })
}

/// `UPDATE <table> SET … WHERE … RETURNING *`.
///
/// Both maps must be non-empty: an unconditional UPDATE is never built.
pub fn build_update(table: &str, set: &FieldMap, filter: &FieldMap) -> Result<Statement> {
    if set.is_empty() {
        return Err(Error::Precondition(format!(
            "update on {} with no fields to set",
            table
        )));
    }
    if filter.is_empty() {
        return Err(Error::Precondition(format!(
            "unconditional update on {} rejected: at least one filter field is required",
            table
        )));
    }

    let mut params: Vec<BindValue> = Vec::with_capacity(set.len() + filter.len());
    let mut assignments: Vec<String> = Vec::with_capacity(set.len());
    for (column, value) in set.iter() {
        params.push(value.clone());
        assignments.push(format!("{} = ${}", column, params.len()));
    }
    let where_clause = render_filter(filter, &mut params);

    let sql = format!(
        "UPDATE {} SET {} WHERE {} RETURNING *",
        table,
        assignments.join(", "),
        where_clause
    );

    Ok(Statement { sql, params })
}

/// `DELETE FROM <table> WHERE … RETURNING *`.
///
/// An empty filter is rejected to prevent accidental full-table deletes.
pub fn build_delete(table: &str, filter: &FieldMap) -> Result<Statement> {
    if filter.is_empty() {
        return Err(Error::Precondition(format!(
            "unconditional delete on {} rejected: at least one filter field is required",
            table
        )));
    }

    let mut params: Vec<BindValue> = Vec::with_capacity(filter.len());
    let where_clause = render_filter(filter, &mut params);
    let sql = format!("DELETE FROM {} WHERE {} RETURNING *", table, where_clause);

    Ok(Statement { sql, params })
}

/// `SELECT * FROM <table> [WHERE …]`. An empty filter selects all rows.
pub fn build_select(table: &str, filter: &FieldMap) -> Statement {
    let mut params: Vec<BindValue> = Vec::with_capacity(filter.len());
    let sql = if filter.is_empty() {
        format!("SELECT * FROM {}", table)
    } else {
        let where_clause = render_filter(filter, &mut params);
        format!("SELECT * FROM {} WHERE {}", table, where_clause)
    };

    Statement { sql, params }
}

/// Render filter entries as AND-conjoined equality predicates. An explicit
/// NULL becomes `IS NULL` — `=` can never match a bound NULL.
fn render_filter(filter: &FieldMap, params: &mut Vec<BindValue>) -> String {
    let mut predicates: Vec<String> = Vec::with_capacity(filter.len());
    for (column, value) in filter.iter() {
        if value.is_null() {
            predicates.push(format!("{} IS NULL", column));
        } else {
            params.push(value.clone());
            predicates.push(format!("{} = ${}", column, params.len()));
        }
    }
    predicates.join(" AND ")
}
