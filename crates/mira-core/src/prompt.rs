//! Prompt construction for SQL generation.

use crate::DbType;
use crate::schema::{SchemaInventory, TableDescriptor};

/// Row cap the model is asked to add when the question does not name one.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

/// Render one table as `Table <name>: <col> (<type>), ...`.
fn render_table(table: &TableDescriptor) -> String {
    let columns = table
        .columns
        .iter()
        .map(|c| format!("{} ({})", c.name, c.data_type))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Table {}: {}", table.name, columns)
}

/// Render every table of the inventory, one per line.
pub fn render_schema(schema: &SchemaInventory) -> String {
    schema
        .tables()
        .map(render_table)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the instruction prompt for a natural-language question.
pub fn build_prompt(schema: &SchemaInventory, question: &str, db_type: DbType) -> String {
    let dialect = db_type.dialect();
    format!(
        r#"Given the following {dialect} database schema:

{schema}

Generate a SQL query for the following request (respond with ONLY the SQL query, no explanations):
"{question}"

Rules:
- Return ONLY valid {dialect} SQL
- Use proper table and column names from the schema
- Add LIMIT {limit} if not specified
- No markdown, no explanations, just the SQL query"#,
        schema = render_schema(schema),
        limit = DEFAULT_ROW_LIMIT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CatalogRow;
    use pretty_assertions::assert_eq;

    fn col(table: &str, name: &str, ty: &str) -> CatalogRow {
        CatalogRow {
            table_name: table.to_string(),
            column_name: Some(name.to_string()),
            data_type: Some(ty.to_string()),
            is_nullable: Some("NO".to_string()),
            ..Default::default()
        }
    }

    fn sample() -> SchemaInventory {
        SchemaInventory::from_catalog_rows(vec![
            col("orders", "id", "integer"),
            col("orders", "user_id", "integer"),
            col("orders", "created_at", "timestamp with time zone"),
            col("users", "id", "integer"),
            col("users", "name", "character varying"),
        ])
    }

    #[test]
    fn test_render_schema_one_line_per_table() {
        assert_eq!(
            render_schema(&sample()),
            "Table orders: id (integer), user_id (integer), created_at (timestamp with time zone)\n\
             Table users: id (integer), name (character varying)"
        );
    }

    #[test]
    fn test_render_table_without_columns() {
        let inv = SchemaInventory::from_catalog_rows(vec![CatalogRow {
            table_name: "empty".to_string(),
            ..Default::default()
        }]);
        assert_eq!(render_schema(&inv), "Table empty: ");
    }

    #[test]
    fn test_prompt_contents() {
        let prompt = build_prompt(&sample(), "list all users", DbType::Postgres);

        assert!(prompt.starts_with("Given the following PostgreSQL database schema:\n\n"));
        assert!(prompt.contains("Table users: id (integer), name (character varying)\n"));
        assert!(prompt.contains("\"list all users\""));
        assert!(prompt.contains("- Return ONLY valid PostgreSQL SQL"));
        assert!(prompt.contains("- Add LIMIT 100 if not specified"));
        assert!(prompt.ends_with("- No markdown, no explanations, just the SQL query"));
    }

    #[test]
    fn test_prompt_quotes_question_verbatim() {
        let question = "orders with \"pending\" status, newest first";
        let prompt = build_prompt(&sample(), question, DbType::Postgres);
        assert!(prompt.contains(&format!("\"{}\"", question)));
    }
}
