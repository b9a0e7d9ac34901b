//! Result-row abstraction and name-based typed field access.
//!
//! # Responsibility
//! - Define the `Record` capability set every driver row provides:
//!   column lookup by position, raw value read and null check.
//! - Layer name-based, typed and nullable-safe accessors on top of it
//!   (`RecordExt`) so row mappers never depend on column order.
//!
//! # Invariants
//! - Column names are matched exactly (case-sensitive).
//! - Nullable accessors return `None` only for the null marker; a stored
//!   zero, empty string or `false` is always `Some`.
//! - `has_column` never returns an error.

use crate::db::value::SqlValue;
use crate::db::{DbError, DbResult};
use uuid::Uuid;

/// One row of a result stream, valid only while the mapper runs.
pub trait Record {
    fn column_count(&self) -> usize;

    /// Name of the column at `index`, `None` when out of range.
    fn column_name(&self, index: usize) -> Option<&str>;

    fn value_at(&self, index: usize) -> DbResult<SqlValue>;

    fn is_null_at(&self, index: usize) -> DbResult<bool> {
        Ok(self.value_at(index)?.is_null())
    }
}

/// Conversion from a stored value into a Rust type.
pub trait FromField: Sized {
    fn from_field(column: &str, value: SqlValue) -> DbResult<Self>;
}

impl FromField for SqlValue {
    fn from_field(_column: &str, value: SqlValue) -> DbResult<Self> {
        Ok(value)
    }
}

impl<T: FromField> FromField for Option<T> {
    fn from_field(column: &str, value: SqlValue) -> DbResult<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_field(column, value).map(Some)
    }
}

macro_rules! integer_field {
    ($($ty:ty => $expected:literal),+ $(,)?) => {
        $(
            impl FromField for $ty {
                fn from_field(column: &str, value: SqlValue) -> DbResult<Self> {
                    match value {
                        SqlValue::Integer(raw) => <$ty>::try_from(raw).map_err(|_| {
                            DbError::type_mismatch(
                                column,
                                $expected,
                                format!("out-of-range integer {raw}"),
                            )
                        }),
                        other => Err(DbError::type_mismatch(column, $expected, other.kind())),
                    }
                }
            }
        )+
    };
}

integer_field!(
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
);

impl FromField for f64 {
    fn from_field(column: &str, value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Real(raw) => Ok(raw),
            // SQLite stores integral REAL values as INTEGER.
            SqlValue::Integer(raw) => Ok(raw as f64),
            other => Err(DbError::type_mismatch(column, "f64", other.kind())),
        }
    }
}

impl FromField for f32 {
    fn from_field(column: &str, value: SqlValue) -> DbResult<Self> {
        f64::from_field(column, value).map(|raw| raw as f32)
    }
}

impl FromField for bool {
    fn from_field(column: &str, value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Integer(raw) => Ok(raw != 0),
            other => Err(DbError::type_mismatch(column, "bool", other.kind())),
        }
    }
}

impl FromField for String {
    fn from_field(column: &str, value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Text(text) => Ok(text),
            other => Err(DbError::type_mismatch(column, "string", other.kind())),
        }
    }
}

impl FromField for char {
    fn from_field(column: &str, value: SqlValue) -> DbResult<Self> {
        let text = String::from_field(column, value)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(ch),
            _ => Err(DbError::type_mismatch(
                column,
                "char",
                format!("text of {} chars", text.chars().count()),
            )),
        }
    }
}

impl FromField for Vec<u8> {
    fn from_field(column: &str, value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Blob(bytes) => Ok(bytes),
            other => Err(DbError::type_mismatch(column, "bytes", other.kind())),
        }
    }
}

impl FromField for Uuid {
    fn from_field(column: &str, value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Text(text) => Uuid::parse_str(&text)
                .map_err(|_| DbError::type_mismatch(column, "uuid", format!("text `{text}`"))),
            SqlValue::Blob(bytes) => Uuid::from_slice(&bytes).map_err(|_| {
                DbError::type_mismatch(column, "uuid", format!("blob of {} bytes", bytes.len()))
            }),
            other => Err(DbError::type_mismatch(column, "uuid", other.kind())),
        }
    }
}

macro_rules! typed_accessors {
    ($($ty:ty => $get:ident, $get_nullable:ident;)+) => {
        $(
            fn $get(&self, column: &str) -> DbResult<$ty> {
                self.get::<$ty>(column)
            }

            fn $get_nullable(&self, column: &str) -> DbResult<Option<$ty>> {
                self.get_nullable::<$ty>(column)
            }
        )+
    };
}

/// Name-based accessors available on every `Record`, including `dyn Record`.
pub trait RecordExt: Record {
    /// Resolves a column name to its position.
    ///
    /// # Errors
    /// - `DbError::FieldNotFound` when no column has exactly this name.
    fn ordinal(&self, column: &str) -> DbResult<usize> {
        (0..self.column_count())
            .find(|&index| self.column_name(index) == Some(column))
            .ok_or_else(|| DbError::FieldNotFound(column.to_string()))
    }

    /// Existence probe. Reports `false` for a missing column instead of failing.
    fn has_column(&self, column: &str) -> bool {
        self.ordinal(column).is_ok()
    }

    fn is_null(&self, column: &str) -> DbResult<bool> {
        let ordinal = self.ordinal(column)?;
        self.is_null_at(ordinal)
    }

    /// Required accessor.
    ///
    /// # Errors
    /// - `DbError::FieldNotFound` for an unknown column.
    /// - `DbError::TypeMismatch` when the stored value (including NULL)
    ///   cannot be read as `T`.
    fn get<T: FromField>(&self, column: &str) -> DbResult<T> {
        let ordinal = self.ordinal(column)?;
        T::from_field(column, self.value_at(ordinal)?)
    }

    /// Nullable accessor: `None` for the null marker, otherwise `get::<T>`.
    fn get_nullable<T: FromField>(&self, column: &str) -> DbResult<Option<T>> {
        self.get::<Option<T>>(column)
    }

    /// Generic decode for enumerations and other closed sets.
    ///
    /// A value that `T` refuses is reported as `DbError::TypeMismatch`.
    fn get_field<T: TryFrom<SqlValue>>(&self, column: &str) -> DbResult<T> {
        let value = self.get_value(column)?;
        let found = value.to_string();
        T::try_from(value)
            .map_err(|_| DbError::type_mismatch(column, std::any::type_name::<T>(), found))
    }

    fn get_field_nullable<T: TryFrom<SqlValue>>(&self, column: &str) -> DbResult<Option<T>> {
        if self.is_null(column)? {
            return Ok(None);
        }
        self.get_field::<T>(column).map(Some)
    }

    typed_accessors! {
        SqlValue => get_value, get_value_nullable;
        String => get_string, get_string_nullable;
        i8 => get_i8, get_i8_nullable;
        i16 => get_i16, get_i16_nullable;
        i32 => get_i32, get_i32_nullable;
        i64 => get_i64, get_i64_nullable;
        u8 => get_u8, get_u8_nullable;
        u16 => get_u16, get_u16_nullable;
        u32 => get_u32, get_u32_nullable;
        u64 => get_u64, get_u64_nullable;
        f32 => get_f32, get_f32_nullable;
        f64 => get_f64, get_f64_nullable;
        bool => get_bool, get_bool_nullable;
        char => get_char, get_char_nullable;
        Vec<u8> => get_bytes, get_bytes_nullable;
        Uuid => get_uuid, get_uuid_nullable;
    }
}

impl<R: Record + ?Sized> RecordExt for R {}

/// In-memory row with owned column names and values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnedRecord {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl OwnedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one column. Later duplicates are shadowed by earlier ones
    /// during name lookup.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.columns.push(column.into());
        self.values.push(value.into());
        self
    }
}

impl Record for OwnedRecord {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    fn value_at(&self, index: usize) -> DbResult<SqlValue> {
        self.values
            .get(index)
            .cloned()
            .ok_or_else(|| DbError::FieldNotFound(format!("#{index}")))
    }
}

#[cfg(test)]
mod tests {
    use super::{OwnedRecord, Record, RecordExt};
    use crate::db::{DbError, SqlValue};

    fn sample() -> OwnedRecord {
        OwnedRecord::new()
            .with("Id", 7_i64)
            .with("Name", "alice")
            .with("Note", SqlValue::Null)
    }

    #[test]
    fn ordinal_is_case_sensitive() {
        let row = sample();
        assert_eq!(row.ordinal("Name").unwrap(), 1);
        assert!(matches!(row.ordinal("name"), Err(DbError::FieldNotFound(name)) if name == "name"));
    }

    #[test]
    fn accessors_work_through_trait_objects() {
        let row = sample();
        let dyn_row: &dyn Record = &row;
        assert_eq!(dyn_row.get_i64("Id").unwrap(), 7);
        assert_eq!(dyn_row.get_string_nullable("Note").unwrap(), None);
    }

    #[test]
    fn value_at_out_of_range_is_field_not_found() {
        let row = sample();
        assert!(matches!(row.value_at(9), Err(DbError::FieldNotFound(_))));
    }
}
