//! Translate Diesel failures into the data-layer error taxonomy.
//!
//! Constraint violations keep the stable codes clients key on (`P2002`,
//! `P2003`, `P2011`) and carry the offending field in the same metadata
//! shape the in-memory store produces, so the error classifier sees one
//! vocabulary regardless of adapter.

use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use serde_json::json;
use tracing::debug;

use crate::domain::{DataErrorCode, DataLayerError};

/// Convert a snake_case column into the camelCase record field.
pub(crate) fn column_to_field(column: &str) -> String {
    let mut field = String::with_capacity(column.len());
    let mut upper = false;
    for ch in column.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            field.extend(ch.to_uppercase());
            upper = false;
        } else {
            field.push(ch);
        }
    }
    field
}

/// Field guarded by a PostgreSQL constraint named after the default
/// `<table>_<column>_key` / `<table>_pkey` conventions.
fn constraint_field(info: &dyn DatabaseErrorInformation) -> Option<String> {
    let constraint = info.constraint_name()?;
    if constraint.ends_with("_pkey") {
        return Some("id".to_owned());
    }
    let column = constraint.strip_suffix("_key").unwrap_or(constraint);
    let column = info
        .table_name()
        .and_then(|table| column.strip_prefix(table)?.strip_prefix('_'))
        .unwrap_or(column);
    Some(column_to_field(column))
}

fn unique_violation(info: &dyn DatabaseErrorInformation) -> DataLayerError {
    match constraint_field(info) {
        Some(field) => DataLayerError::unique_violation(
            format!("Unique constraint failed on the fields: (`{field}`)"),
            [field],
        ),
        None => DataLayerError::known(
            DataErrorCode::UniqueConstraint,
            "Unique constraint failed",
            None,
        ),
    }
}

fn null_violation(info: &dyn DatabaseErrorInformation) -> DataLayerError {
    match info.column_name().map(column_to_field) {
        Some(field) => DataLayerError::null_violation(
            format!("Null constraint violation on the fields: (`{field}`)"),
            Some(&field),
        ),
        None => DataLayerError::null_violation("Null constraint violation", None),
    }
}

fn foreign_key_violation(info: &dyn DatabaseErrorInformation) -> DataLayerError {
    let meta = info
        .constraint_name()
        .map(|name| json!({ "field_name": name }));
    DataLayerError::known(
        DataErrorCode::ForeignKeyConstraint,
        "Foreign key constraint failed",
        meta,
    )
}

/// Map a Diesel error onto a [`DataLayerError`].
pub(crate) fn map_diesel_error(error: DieselError) -> DataLayerError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => DataLayerError::record_not_found("Record not found."),
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::UniqueViolation => unique_violation(info.as_ref()),
            DatabaseErrorKind::NotNullViolation => null_violation(info.as_ref()),
            DatabaseErrorKind::ForeignKeyViolation => foreign_key_violation(info.as_ref()),
            DatabaseErrorKind::CheckViolation => DataLayerError::known(
                DataErrorCode::Other("P2004".to_owned()),
                format!("A constraint failed on the database: {}", info.message()),
                None,
            ),
            DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand => {
                DataLayerError::known(
                    DataErrorCode::DatabaseUnreachable,
                    "Can't reach database server",
                    None,
                )
            }
            DatabaseErrorKind::SerializationFailure => DataLayerError::known(
                DataErrorCode::Other("P2034".to_owned()),
                "Transaction failed due to a write conflict or a deadlock. Please retry your transaction",
                None,
            ),
            _ => DataLayerError::unknown(info.message().to_owned()),
        },
        DieselError::QueryBuilderError(err) => {
            DataLayerError::validation(format!("invalid query: {err}"))
        }
        DieselError::DeserializationError(err) => {
            DataLayerError::validation(format!("invalid column value: {err}"))
        }
        DieselError::SerializationError(err) => {
            DataLayerError::validation(format!("invalid argument: {err}"))
        }
        other => DataLayerError::unknown(other.to_string()),
    }
}

impl From<DieselError> for DataLayerError {
    fn from(error: DieselError) -> Self {
        map_diesel_error(error)
    }
}
