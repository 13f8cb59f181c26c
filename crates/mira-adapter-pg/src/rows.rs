//! Decoding of arbitrary result rows into JSON.
//!
//! Generated statements can return any column types, so values are decoded
//! by the Postgres type name reported for each column. Statements run over
//! the simple query protocol, which delivers every value in text form; types
//! without a dedicated decoding come back as that text.

use serde_json::{Map, Value, json};
use sqlx::postgres::PgRow;
use sqlx::types::BigDecimal;
use sqlx::{Column, Decode, Postgres, Row, Type, TypeInfo};
use tracing::debug;

/// Convert a row into a JSON object keyed by column name, in column order.
pub fn row_to_json(row: &PgRow) -> Value {
    let mut obj = Map::new();
    for (idx, col) in row.columns().iter().enumerate() {
        obj.insert(col.name().to_string(), decode_column(row, idx));
    }
    Value::Object(obj)
}

fn get<'r, T>(row: &'r PgRow, idx: usize) -> Result<Option<T>, sqlx::Error>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<Option<T>, _>(idx)
}

fn to_json<T: Into<Value>>(v: Option<T>) -> Value {
    v.map(Into::into).unwrap_or(Value::Null)
}

fn decode_column(row: &PgRow, idx: usize) -> Value {
    let type_name = row.columns()[idx].type_info().name();

    let decoded: Result<Value, sqlx::Error> = match type_name {
        "BOOL" => get::<bool>(row, idx).map(to_json),
        "INT2" => get::<i16>(row, idx).map(to_json),
        "INT4" => get::<i32>(row, idx).map(to_json),
        "INT8" => get::<i64>(row, idx).map(to_json),
        "OID" => get::<sqlx::postgres::types::Oid>(row, idx).map(|v| to_json(v.map(|o| o.0))),
        "FLOAT4" => get::<f32>(row, idx).map(|v| to_json(v.map(f64::from))),
        "FLOAT8" => get::<f64>(row, idx).map(to_json),
        // Kept as text to preserve precision.
        "NUMERIC" => get::<BigDecimal>(row, idx).map(|v| to_json(v.map(|d| d.to_string()))),
        "JSON" | "JSONB" => get::<Value>(row, idx).map(to_json),
        "UUID" => get::<uuid::Uuid>(row, idx).map(|v| to_json(v.map(|u| u.to_string()))),
        "TIMESTAMPTZ" => get::<chrono::DateTime<chrono::Utc>>(row, idx)
            .map(|v| to_json(v.map(|t| t.to_rfc3339()))),
        "TIMESTAMP" => get::<chrono::NaiveDateTime>(row, idx)
            .map(|v| to_json(v.map(|t| t.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))),
        "DATE" => get::<chrono::NaiveDate>(row, idx).map(|v| to_json(v.map(|d| d.to_string()))),
        "TIME" => get::<chrono::NaiveTime>(row, idx).map(|v| to_json(v.map(|t| t.to_string()))),
        "BYTEA" => get::<Vec<u8>>(row, idx).map(|v| {
            to_json(v.map(|bytes| {
                let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                format!("\\x{}", hex)
            }))
        }),
        "TEXT[]" | "VARCHAR[]" => get::<Vec<String>>(row, idx).map(|v| json!(v)),
        "INT2[]" => get::<Vec<i16>>(row, idx).map(|v| json!(v)),
        "INT4[]" => get::<Vec<i32>>(row, idx).map(|v| json!(v)),
        "INT8[]" => get::<Vec<i64>>(row, idx).map(|v| json!(v)),
        "FLOAT8[]" => get::<Vec<f64>>(row, idx).map(|v| json!(v)),
        "BOOL[]" => get::<Vec<bool>>(row, idx).map(|v| json!(v)),
        "NUMERIC[]" => get::<Vec<BigDecimal>>(row, idx).map(|v| {
            json!(v.map(|ds| ds.iter().map(ToString::to_string).collect::<Vec<_>>()))
        }),
        _ => return as_text(row, idx),
    };

    decoded.unwrap_or_else(|e| {
        debug!(column = idx, pg_type = type_name, error = %e, "typed decode failed, using text");
        as_text(row, idx)
    })
}

/// The value as the server rendered it. Text-like types, intervals, network
/// addresses, money, enums and domains all take this path.
fn as_text(row: &PgRow, idx: usize) -> Value {
    row.try_get_unchecked::<Option<String>, _>(idx)
        .map(to_json)
        .unwrap_or_else(|e| {
            debug!(column = idx, error = %e, "column is not valid text, returning null");
            Value::Null
        })
}
