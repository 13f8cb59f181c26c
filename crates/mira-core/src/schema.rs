//! Schema inventory types.
//!
//! The inventory is the folded form of one catalog query: one
//! [`TableDescriptor`] per base table in first-seen order, each holding its
//! columns in ordinal order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the catalog query that lists tables left-joined to their
/// columns and key constraints.
///
/// Every column-side field is optional because a table without columns still
/// yields a single row with NULLs on the joined side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogRow {
    pub table_name: String,
    pub column_name: Option<String>,
    pub data_type: Option<String>,
    pub is_nullable: Option<String>,
    pub column_default: Option<String>,
    pub constraint_type: Option<String>,
}

/// A column as described by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared type in catalog text form, e.g. `integer` or `character varying`.
    pub data_type: String,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Key constraint the column takes part in, e.g. `PRIMARY KEY`. Best-effort:
    /// only the first one reported by the catalog is kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
}

/// A base table and its columns in ordinal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }
}

/// Tables of the `public` schema keyed by name, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaInventory {
    tables: Vec<TableDescriptor>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SchemaInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold catalog rows into an inventory.
    ///
    /// A table is created the first time its name is seen. Rows with a NULL
    /// column name only register the table. A column repeated because it takes
    /// part in several constraints is recorded once.
    pub fn from_catalog_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = CatalogRow>,
    {
        let mut inventory = Self::new();

        for row in rows {
            let table = inventory.table_entry(&row.table_name);

            let Some(column_name) = row.column_name else {
                continue;
            };

            if let Some(existing) = table.columns.iter_mut().find(|c| c.name == column_name) {
                if existing.constraint.is_none() {
                    existing.constraint = row.constraint_type;
                }
                continue;
            }

            table.columns.push(ColumnDescriptor {
                name: column_name,
                data_type: row.data_type.unwrap_or_default(),
                nullable: row.is_nullable.as_deref() == Some("YES"),
                default: row.column_default,
                constraint: row.constraint_type,
            });
        }

        inventory
    }

    fn table_entry(&mut self, name: &str) -> &mut TableDescriptor {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.tables.push(TableDescriptor::new(name));
                let idx = self.tables.len() - 1;
                self.index.insert(name.to_string(), idx);
                idx
            }
        };
        &mut self.tables[idx]
    }

    /// Get a table by name.
    pub fn get_table(&self, name: &str) -> Option<&TableDescriptor> {
        self.index.get(name).map(|&idx| &self.tables[idx])
    }

    /// Tables in first-seen order.
    pub fn tables(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(table: &str, column: Option<&str>, ty: &str, nullable: &str) -> CatalogRow {
        CatalogRow {
            table_name: table.to_string(),
            column_name: column.map(|c| c.to_string()),
            data_type: column.map(|_| ty.to_string()),
            is_nullable: column.map(|_| nullable.to_string()),
            column_default: None,
            constraint_type: None,
        }
    }

    #[test]
    fn test_fold_groups_by_table_in_order() {
        let inv = SchemaInventory::from_catalog_rows(vec![
            row("orders", Some("id"), "integer", "NO"),
            row("orders", Some("total"), "numeric", "YES"),
            row("users", Some("id"), "integer", "NO"),
            row("users", Some("name"), "character varying", "YES"),
        ]);

        let names: Vec<_> = inv.tables().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["orders", "users"]);

        let users = inv.get_table("users").unwrap();
        assert_eq!(users.columns.len(), 2);
        assert_eq!(users.columns[1].name, "name");
        assert_eq!(users.columns[1].data_type, "character varying");
        assert!(users.columns[1].nullable);
        assert!(!users.columns[0].nullable);
    }

    #[test]
    fn test_fold_table_without_columns() {
        let inv = SchemaInventory::from_catalog_rows(vec![
            row("empty", None, "", ""),
            row("users", Some("id"), "integer", "NO"),
        ]);

        assert_eq!(inv.len(), 2);
        assert!(inv.get_table("empty").unwrap().columns.is_empty());
    }

    #[test]
    fn test_nullable_only_for_literal_yes() {
        let inv = SchemaInventory::from_catalog_rows(vec![
            row("t", Some("a"), "text", "yes"),
            row("t", Some("b"), "text", "NO"),
            row("t", Some("c"), "text", "YES"),
        ]);
        let t = inv.get_table("t").unwrap();
        assert!(!t.columns[0].nullable);
        assert!(!t.columns[1].nullable);
        assert!(t.columns[2].nullable);
    }

    #[test]
    fn test_column_in_several_constraints_recorded_once() {
        let mut pk = row("users", Some("id"), "integer", "NO");
        pk.constraint_type = Some("PRIMARY KEY".to_string());
        let mut unique = row("users", Some("id"), "integer", "NO");
        unique.constraint_type = Some("UNIQUE".to_string());

        let inv = SchemaInventory::from_catalog_rows(vec![
            pk,
            unique,
            row("users", Some("email"), "text", "NO"),
        ]);

        let users = inv.get_table("users").unwrap();
        assert_eq!(users.columns.len(), 2);
        assert_eq!(users.columns[0].constraint.as_deref(), Some("PRIMARY KEY"));
        assert_eq!(users.columns[1].constraint, None);
    }
}
