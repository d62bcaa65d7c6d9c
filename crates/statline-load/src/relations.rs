//! Key inference policy
//!
//! Which column is a table's primary key, and which columns reference
//! another table, is decided here and nowhere else. The loader only asks
//! the policy.

use crate::schema::Catalog;

/// A foreign key target: referenced table and its primary key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub table: String,
    pub column: String,
}

pub trait RelationshipPolicy {
    /// Natural primary key among `columns`, if any.
    fn primary_key<'a>(&self, table: &str, columns: &'a [String]) -> Option<&'a str>;

    /// Table referenced by `column` of `table`, given the known catalog.
    fn reference(&self, table: &str, column: &str, catalog: &Catalog) -> Option<Reference>;
}

/// Naming convention: `id` or `{table}_id` is the primary key; any other
/// column named `{other}_id` references table `other`.
///
/// Catalog tables are tried in lexicographic order so a column matching
/// several tables always resolves to the same one. Matching ignores case.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamingConventionPolicy;

impl RelationshipPolicy for NamingConventionPolicy {
    fn primary_key<'a>(&self, table: &str, columns: &'a [String]) -> Option<&'a str> {
        let own = format!("{table}_id");
        columns
            .iter()
            .map(String::as_str)
            .find(|c| *c == "id" || *c == own)
    }

    fn reference(&self, table: &str, column: &str, catalog: &Catalog) -> Option<Reference> {
        let column = column.to_ascii_lowercase();
        catalog
            .iter()
            .filter(|(name, _)| name.as_str() != table)
            .find(|(name, _)| column == format!("{}_id", name.to_ascii_lowercase()))
            .map(|(name, pk)| Reference {
                table: name.clone(),
                column: pk.clone(),
            })
    }
}
