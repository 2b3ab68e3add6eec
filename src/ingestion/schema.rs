//! Table Schemas - Declared column sets for the dump tables

use serde::{Deserialize, Serialize};

/// Storage class of a column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Integer,
    Text,
    /// Kept verbatim as text; SQLite gives it DATETIME affinity
    DateTime,
}

impl ColumnKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Text => "TEXT",
            ColumnKind::DateTime => "DATETIME",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Header name in the CSV file, also the column name in the table
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Destination table name plus its ordered columns
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(table_name: &str, columns: Vec<ColumnDef>) -> Self {
        Self {
            table_name: table_name.to_string(),
            columns,
        }
    }

    /// The `customers` table of the data dump
    pub fn customers() -> Self {
        use ColumnKind::*;
        Self::new(
            "customers",
            vec![
                ColumnDef::new("Index", Integer).nullable(),
                ColumnDef::new("Customer Id", Text),
                ColumnDef::new("First Name", Text),
                ColumnDef::new("Last Name", Text),
                ColumnDef::new("Company", Text),
                ColumnDef::new("City", Text),
                ColumnDef::new("Country", Text),
                ColumnDef::new("Phone 1", Text),
                ColumnDef::new("Phone 2", Text),
                ColumnDef::new("Email", Text),
                ColumnDef::new("Subscription Date", DateTime),
                ColumnDef::new("Website", Text),
            ],
        )
    }

    /// The `organizations` table of the data dump
    pub fn organizations() -> Self {
        use ColumnKind::*;
        Self::new(
            "organizations",
            vec![
                ColumnDef::new("Index", Integer).nullable(),
                ColumnDef::new("Organization Id", Text),
                ColumnDef::new("Name", Text),
                ColumnDef::new("Website", Text),
                ColumnDef::new("Country", Text),
                ColumnDef::new("Description", Text),
                ColumnDef::new("Founded", Integer),
                ColumnDef::new("Industry", Text),
                ColumnDef::new("Number of employees", Integer),
            ],
        )
    }

    /// Look up a known dump table by name
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "customers" => Some(Self::customers()),
            "organizations" => Some(Self::organizations()),
            _ => None,
        }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_columns_in_file_order() {
        let schema = TableSchema::customers();
        let names: Vec<&str> = schema.column_names().collect();
        assert_eq!(names.first(), Some(&"Index"));
        assert_eq!(names.last(), Some(&"Website"));
        assert_eq!(schema.len(), 12);
        assert_eq!(schema.columns[10].kind, ColumnKind::DateTime);
    }

    #[test]
    fn test_only_index_is_nullable() {
        for schema in [TableSchema::customers(), TableSchema::organizations()] {
            let nullable: Vec<&str> = schema
                .columns
                .iter()
                .filter(|c| c.nullable)
                .map(|c| c.name.as_str())
                .collect();
            assert_eq!(nullable, vec!["Index"]);
        }
    }

    #[test]
    fn test_by_name() {
        assert_eq!(TableSchema::by_name("organizations").unwrap().len(), 9);
        assert!(!TableSchema::customers().is_empty());
        assert!(TableSchema::new("scratch", vec![]).is_empty());
        assert!(TableSchema::by_name("Organizations").is_none());
    }
}
