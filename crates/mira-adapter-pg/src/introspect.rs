use mira_core::{CatalogRow, SchemaInventory};
use sqlx::{PgConnection, Row};

/// Base tables of the `public` schema left-joined to their columns and key
/// constraints, one row per (column, constraint) pair.
///
/// Identifier columns are cast to `text` so they decode as plain strings
/// regardless of the information_schema domain types.
const CATALOG_QUERY: &str = r#"
    select
      t.table_name::text       as table_name,
      c.column_name::text      as column_name,
      c.data_type::text        as data_type,
      c.is_nullable::text      as is_nullable,
      c.column_default::text   as column_default,
      tc.constraint_type::text as constraint_type
    from information_schema.tables t
    left join information_schema.columns c
      on t.table_name = c.table_name
     and t.table_schema = c.table_schema
    left join information_schema.key_column_usage kcu
      on c.table_name = kcu.table_name
     and c.column_name = kcu.column_name
     and c.table_schema = kcu.table_schema
    left join information_schema.table_constraints tc
      on kcu.constraint_name = tc.constraint_name
     and kcu.table_schema = tc.table_schema
    where t.table_schema = 'public'
      and t.table_type = 'BASE TABLE'
    order by t.table_name, c.ordinal_position
"#;

/// Read the `public` schema of the connected database into an inventory.
/// Catalog errors are returned unchanged.
pub async fn extract_schema(conn: &mut PgConnection) -> Result<SchemaInventory, sqlx::Error> {
    let rows = sqlx::query(CATALOG_QUERY).fetch_all(&mut *conn).await?;

    let mut catalog_rows = Vec::with_capacity(rows.len());
    for row in rows {
        catalog_rows.push(CatalogRow {
            table_name: row.try_get("table_name")?,
            column_name: row.try_get("column_name")?,
            data_type: row.try_get("data_type")?,
            is_nullable: row.try_get("is_nullable")?,
            column_default: row.try_get("column_default")?,
            constraint_type: row.try_get("constraint_type")?,
        });
    }

    Ok(SchemaInventory::from_catalog_rows(catalog_rows))
}
