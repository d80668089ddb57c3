use serde_json::Value;
use sqlx::postgres::PgRow;

use crate::db::MapperError;

/// A single column/value pair destined for a WHERE, SET or INSERT clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub column: &'static str,
    pub value: Value,
}

/// A typed entity mapped to a database table.
///
/// Implementations are generated by the [`record!`] macro, which fixes the
/// table name and the column list at compile time. There is no runtime
/// name-matching: the declared column list is the single source of truth
/// for both the generated SELECT list and the row scan.
pub trait Record: Sized + Send + Unpin {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Scan one result row into a record, columns in declared order.
    fn from_row(row: &PgRow) -> Result<Self, MapperError>;

    /// Zero-elided fields: a field is emitted only when it holds a
    /// non-default value. Used for filters and inserts, never for patches.
    fn fields(&self) -> Vec<Field>;
}

/// A partial update with explicit field presence.
///
/// Unlike filters, a patch field set to `Some(v)` is always written, even
/// when `v` is the type's default. `None` means "leave the column alone".
pub trait Patch {
    fn fields(&self) -> Vec<Field>;
}

/// Conversion between record field types and bind parameters.
pub trait SqlParam {
    /// Whether the value is the type's default ("zero") value.
    fn is_zero(&self) -> bool;

    fn to_value(&self) -> Value;
}

impl SqlParam for i64 {
    fn is_zero(&self) -> bool {
        *self == 0
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl SqlParam for bool {
    fn is_zero(&self) -> bool {
        !*self
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl SqlParam for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn to_value(&self) -> Value {
        Value::from(self.as_str())
    }
}

impl<T: SqlParam> SqlParam for Option<T> {
    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

/// Validate a SQL identifier: lowercase alphanumerics and underscores,
/// starting with a letter or underscore. Identifiers are required to be
/// lowercase so that uniqueness under case-folding is plain uniqueness.
pub fn validate_identifier(name: &str) -> Result<(), MapperError> {
    let mut chars = name.chars();
    let first = chars
        .next()
        .ok_or_else(|| MapperError::InvalidColumn("empty identifier".to_string()))?;
    if !(first.is_ascii_lowercase() || first == '_') {
        return Err(MapperError::InvalidColumn(name.to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(MapperError::InvalidColumn(name.to_string()));
    }
    Ok(())
}

/// Declare a record type bound to a table.
///
/// ```ignore
/// record! {
///     pub struct Post("posts") {
///         pub pid: i64 => "pid",
///         pub date: String => "date",
///         pub content: String => "content",
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident ($table:literal) {
            $( $(#[$fmeta:meta])* pub $field:ident: $ty:ty => $col:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: $ty, )+
        }

        impl $crate::db::record::Record for $name {
            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] = &[ $( $col ),+ ];

            fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, $crate::db::MapperError> {
                use sqlx::Row as _;
                Ok(Self {
                    $( $field: row.try_get::<$ty, _>($col)?, )+
                })
            }

            fn fields(&self) -> Vec<$crate::db::record::Field> {
                use $crate::db::record::SqlParam as _;
                let mut out = Vec::new();
                $(
                    if !self.$field.is_zero() {
                        out.push($crate::db::record::Field {
                            column: $col,
                            value: self.$field.to_value(),
                        });
                    }
                )+
                out
            }
        }
    };
}

/// Declare a patch companion with explicit `Option` presence per field.
#[macro_export]
macro_rules! patch {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( pub $field:ident: $ty:ty => $col:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            $( pub $field: Option<$ty>, )+
        }

        impl $crate::db::record::Patch for $name {
            fn fields(&self) -> Vec<$crate::db::record::Field> {
                use $crate::db::record::SqlParam as _;
                let mut out = Vec::new();
                $(
                    if let Some(v) = &self.$field {
                        out.push($crate::db::record::Field {
                            column: $col,
                            value: v.to_value(),
                        });
                    }
                )+
                out
            }
        }
    };
}
