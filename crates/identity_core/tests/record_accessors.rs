use identity_core::db::{Database, DatabaseSettings, DbError, OwnedRecord, Parameters, SqlValue};
use identity_core::RecordExt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Free,
    Pro,
}

impl TryFrom<SqlValue> for Tier {
    type Error = SqlValue;

    fn try_from(value: SqlValue) -> Result<Self, Self::Error> {
        match value {
            SqlValue::Text(text) if text == "free" => Ok(Self::Free),
            SqlValue::Text(text) if text == "pro" => Ok(Self::Pro),
            other => Err(other),
        }
    }
}

fn account_row() -> OwnedRecord {
    OwnedRecord::new()
        .with("Id", 12_i64)
        .with("Count", 0_i64)
        .with("Missing", SqlValue::Null)
        .with("Empty", "")
        .with("Tier", "pro")
        .with("Big", 300_i64)
        .with("Label", "abc")
}

#[test]
fn nullable_accessors_keep_null_apart_from_defaults() {
    let row = account_row();

    assert_eq!(row.get_i32_nullable("Missing").unwrap(), None);
    assert_eq!(row.get_i32_nullable("Count").unwrap(), Some(0));
    assert_eq!(row.get_string_nullable("Missing").unwrap(), None);
    assert_eq!(row.get_string_nullable("Empty").unwrap(), Some(String::new()));
    assert!(row.is_null("Missing").unwrap());
    assert!(!row.is_null("Count").unwrap());
}

#[test]
fn required_accessor_rejects_null() {
    let row = account_row();
    let err = row.get_i64("Missing").unwrap_err();
    assert!(matches!(
        err,
        DbError::TypeMismatch { column, expected: "i64", .. } if column == "Missing"
    ));
}

#[test]
fn has_column_never_fails() {
    let row = account_row();
    assert!(row.has_column("Id"));
    assert!(!row.has_column("id"));
    assert!(!row.has_column("Nope"));
    assert!(matches!(row.ordinal("Nope"), Err(DbError::FieldNotFound(name)) if name == "Nope"));
    assert!(matches!(row.get_string("Nope"), Err(DbError::FieldNotFound(_))));
}

#[test]
fn incompatible_values_are_type_mismatches() {
    let row = account_row();
    assert!(matches!(
        row.get_i16("Label"),
        Err(DbError::TypeMismatch { expected: "i16", .. })
    ));
    assert!(matches!(
        row.get_u8("Big"),
        Err(DbError::TypeMismatch { expected: "u8", .. })
    ));
    assert_eq!(row.get_u16("Big").unwrap(), 300);
    assert!(matches!(
        row.get_string("Id"),
        Err(DbError::TypeMismatch { .. })
    ));
}

#[test]
fn closed_sets_decode_through_try_from() {
    let row = account_row();
    assert_eq!(row.get_field::<Tier>("Tier").unwrap(), Tier::Pro);
    assert_eq!(row.get_field_nullable::<Tier>("Missing").unwrap(), None);
    assert!(matches!(
        row.get_field::<Tier>("Label"),
        Err(DbError::TypeMismatch { found, .. }) if found == "abc"
    ));
}

#[test]
fn sqlite_rows_expose_the_same_accessors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");
    let db = Database::per_call(&DatabaseSettings::new(path.to_str().unwrap()));
    db.execute(
        "CREATE TABLE accounts (Id INTEGER PRIMARY KEY, Stamp TEXT, Score REAL, Avatar BLOB)",
        &Parameters::new(),
    )
    .unwrap();

    let stamp = Uuid::new_v4();
    db.insert(
        "INSERT INTO accounts (Stamp, Score, Avatar) VALUES (@stamp, @score, @avatar)",
        &Parameters::new()
            .with("@stamp", stamp)
            .with("@score", 2.5_f64)
            .with("@avatar", vec![1_u8, 2, 3]),
    )
    .unwrap();
    db.insert(
        "INSERT INTO accounts (Stamp, Score, Avatar) VALUES (@stamp, @score, @avatar)",
        &Parameters::new()
            .with("@stamp", Option::<Uuid>::None)
            .with("@score", Option::<f64>::None)
            .with("@avatar", Option::<Vec<u8>>::None),
    )
    .unwrap();

    let rows = db
        .query(
            "SELECT Stamp, Score, Avatar FROM accounts ORDER BY Id",
            &Parameters::new(),
            |row| {
                Ok((
                    row.get_uuid_nullable("Stamp")?,
                    row.get_f64_nullable("Score")?,
                    row.get_bytes_nullable("Avatar")?,
                ))
            },
        )
        .unwrap();

    assert_eq!(rows[0], (Some(stamp), Some(2.5), Some(vec![1, 2, 3])));
    assert_eq!(rows[1], (None, None, None));
}

#[test]
fn epoch_millis_timestamps_read_as_i64() {
    let row = OwnedRecord::new()
        .with("LockoutEndDateUtc", 1_700_000_000_123_i64)
        .with("DeletedAt", SqlValue::Null);

    assert_eq!(row.get_i64("LockoutEndDateUtc").unwrap(), 1_700_000_000_123);
    assert_eq!(row.get_i64_nullable("DeletedAt").unwrap(), None);
    assert!(matches!(
        row.get_i32("LockoutEndDateUtc"),
        Err(DbError::TypeMismatch { expected: "i32", .. })
    ));
}
