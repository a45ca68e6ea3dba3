//! MySQL type mappings.
//!
//! Each column is classified by its type name, then decoded with the Rust
//! type that fits that class. DECIMAL and temporal values are returned as
//! strings so no precision is lost on the way to JSON.

use crate::models::{ColumnMetadata, Row as JsonRow};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo};

/// Logical category for column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Timestamp,
    DateTime,
    Date,
    Time,
    Unknown,
}

/// Classify a MySQL type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("int") || lower == "year" {
        return TypeCategory::Integer;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower == "json" {
        return TypeCategory::Json;
    }

    match lower.as_str() {
        "timestamp" => return TypeCategory::Timestamp,
        "datetime" => return TypeCategory::DateTime,
        "date" => return TypeCategory::Date,
        "time" => return TypeCategory::Time,
        _ => {}
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "geometry" {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower.contains("text") || lower == "enum" || lower == "set" {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

/// DECIMAL value in the server's exact textual form.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

/// Binary preview: the text itself when the bytes are valid UTF-8, base64
/// otherwise.
pub fn binary_to_json(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(text) => JsonValue::String(text.to_owned()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

/// Conversion of result rows into JSON objects keyed by column name.
pub trait RowToJson {
    fn to_json_map(&self) -> JsonRow;
    fn column_metadata(&self) -> Vec<ColumnMetadata>;
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self) -> JsonRow {
        self.columns()
            .iter()
            .map(|col| {
                let type_name = col.type_info().name();
                let value = decode::column_value(self, col.ordinal(), type_name);
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn column_metadata(&self) -> Vec<ColumnMetadata> {
        self.columns()
            .iter()
            .map(|col| {
                let info = col.type_info();
                ColumnMetadata::new(col.name(), info.name(), !info.is_null())
            })
            .collect()
    }
}

mod decode {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use sqlx::MySql;

    /// `Ok(None)` is SQL NULL; `Err` means the Rust type did not fit.
    fn get<'r, T>(row: &'r MySqlRow, idx: usize) -> Result<Option<T>, sqlx::Error>
    where
        T: Decode<'r, MySql> + Type<MySql>,
    {
        row.try_get::<Option<T>, _>(idx)
    }

    /// First integer width the driver accepts for this column.
    macro_rules! first_integer {
        ($row:expr, $idx:expr, $($ty:ty),+) => {{
            let mut found = None;
            $(
                if found.is_none() {
                    if let Ok(v) = get::<$ty>($row, $idx) {
                        found = Some(v.map(JsonValue::from).unwrap_or(JsonValue::Null));
                    }
                }
            )+
            found
        }};
    }

    pub fn column_value(row: &MySqlRow, idx: usize, type_name: &str) -> JsonValue {
        match categorize_type(type_name) {
            TypeCategory::Decimal => match get::<RawDecimal>(row, idx) {
                Ok(v) => v.map(|d| JsonValue::String(d.0)).unwrap_or(JsonValue::Null),
                Err(e) => {
                    tracing::warn!(column = idx, error = %e, "DECIMAL column not decodable");
                    text(row, idx, type_name)
                }
            },
            TypeCategory::Integer => {
                first_integer!(row, idx, i64, u64, i32, u32, i16, u16, i8, u8)
                    .unwrap_or_else(|| text(row, idx, type_name))
            }
            TypeCategory::Boolean => get::<bool>(row, idx)
                .ok()
                .flatten()
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Float => float(row, idx),
            TypeCategory::Binary => get::<Vec<u8>>(row, idx)
                .ok()
                .flatten()
                .map(|bytes| binary_to_json(&bytes))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Json => get::<JsonValue>(row, idx)
                .ok()
                .flatten()
                .unwrap_or(JsonValue::Null),
            TypeCategory::Timestamp => temporal(row, idx, type_name, |v: DateTime<Utc>| {
                v.format("%Y-%m-%d %H:%M:%S%.f").to_string()
            }),
            TypeCategory::DateTime => temporal(row, idx, type_name, |v: NaiveDateTime| {
                v.format("%Y-%m-%d %H:%M:%S%.f").to_string()
            }),
            TypeCategory::Date => {
                temporal(row, idx, type_name, |v: NaiveDate| v.format("%Y-%m-%d").to_string())
            }
            // TIME values outside 00:00..24:00 fall through to text
            TypeCategory::Time => temporal(row, idx, type_name, |v: NaiveTime| {
                v.format("%H:%M:%S%.f").to_string()
            }),
            TypeCategory::Text | TypeCategory::Unknown => text(row, idx, type_name),
        }
    }

    fn float(row: &MySqlRow, idx: usize) -> JsonValue {
        let value = match get::<f64>(row, idx) {
            Ok(v) => v,
            Err(_) => get::<f32>(row, idx).ok().flatten().map(f64::from),
        };
        match value {
            Some(v) => serde_json::Number::from_f64(v)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(v.to_string())),
            None => JsonValue::Null,
        }
    }

    fn temporal<'r, T>(
        row: &'r MySqlRow,
        idx: usize,
        type_name: &str,
        render: impl FnOnce(T) -> String,
    ) -> JsonValue
    where
        T: Decode<'r, MySql> + Type<MySql>,
    {
        match get::<T>(row, idx) {
            Ok(Some(v)) => JsonValue::String(render(v)),
            Ok(None) => JsonValue::Null,
            Err(_) => text(row, idx, type_name),
        }
    }

    fn text(row: &MySqlRow, idx: usize, type_name: &str) -> JsonValue {
        if let Ok(Some(v)) = get::<String>(row, idx) {
            if type_name.eq_ignore_ascii_case("json") {
                if let Ok(json) = serde_json::from_str::<JsonValue>(&v) {
                    return json;
                }
            }
            return JsonValue::String(v);
        }
        // Catalog columns come back as VARBINARY on some servers
        match get::<Vec<u8>>(row, idx) {
            Ok(Some(bytes)) => binary_to_json(&bytes),
            _ => JsonValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(categorize_type("INT"), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT UNSIGNED"), TypeCategory::Integer);
        assert_eq!(categorize_type("TINYINT"), TypeCategory::Integer);
        assert_eq!(categorize_type("YEAR"), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_type_decimal() {
        assert_eq!(categorize_type("DECIMAL"), TypeCategory::Decimal);
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Decimal);
    }

    #[test]
    fn test_categorize_type_boolean_before_integer() {
        assert_eq!(categorize_type("BOOLEAN"), TypeCategory::Boolean);
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::Timestamp);
        assert_eq!(categorize_type("DATETIME"), TypeCategory::DateTime);
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
        assert_eq!(categorize_type("TIME"), TypeCategory::Time);
    }

    #[test]
    fn test_categorize_type_text_and_binary() {
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("ENUM"), TypeCategory::Text);
        assert_eq!(categorize_type("VARBINARY"), TypeCategory::Binary);
        assert_eq!(categorize_type("MEDIUMBLOB"), TypeCategory::Binary);
        assert_eq!(categorize_type("JSON"), TypeCategory::Json);
        assert_eq!(categorize_type("BIT"), TypeCategory::Unknown);
    }

    #[test]
    fn test_binary_preview_prefers_text() {
        assert_eq!(binary_to_json(b"hello world"), JsonValue::String("hello world".into()));
        assert_eq!(binary_to_json("héllo".as_bytes()), JsonValue::String("héllo".into()));
    }

    #[test]
    fn test_binary_preview_falls_back_to_base64() {
        let bytes: &[u8] = &[0xFF, 0xFE, 0x00, 0x01];
        assert_eq!(binary_to_json(bytes), JsonValue::String("//4AAQ==".into()));
    }
}
