//! SQL Text Generation
//!
//! Every statement the merge database runs is built here. Identifiers are
//! normalized tokens and always pass through [`quote_identifier`].

/// Double-quote an identifier, doubling any embedded quote
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quoted_list<'a>(idents: impl IntoIterator<Item = &'a str>) -> String {
    idents
        .into_iter()
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE TABLE` with one TEXT column per token and a UNIQUE constraint
/// over the index tokens
pub fn create_table(table: &str, columns: &[&str], index: &[&str]) -> String {
    let column_defs = columns
        .iter()
        .map(|c| format!("{} TEXT", quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE {} ({}, UNIQUE ({}))",
        quote_identifier(table),
        column_defs,
        quoted_list(index.iter().copied())
    )
}

/// Insert-or-update-if-different statement with positional parameters
/// `?1..?N` bound in `columns` order
///
/// On a key conflict the `values` columns (the non-key columns) are
/// overwritten only when at least one of them differs, so SQLite reports a
/// change for inserts and real updates and none for identical rows. With no
/// value columns there is nothing to update and conflicts are ignored.
pub fn upsert(table: &str, columns: &[&str], index: &[&str], values: &[&str]) -> String {
    let bindings = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({})",
        quote_identifier(table),
        quoted_list(columns.iter().copied()),
        bindings,
        quoted_list(index.iter().copied())
    );

    if values.is_empty() {
        sql.push_str(" DO NOTHING");
    } else {
        let targets = quoted_list(values.iter().copied());
        let incoming = values
            .iter()
            .map(|c| format!("excluded.{}", quote_identifier(c)))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(
            " DO UPDATE SET ({targets}) = ({incoming}) WHERE ({targets}) != ({incoming})"
        ));
    }

    sql
}

/// One page of a full scan in first-insertion order
///
/// Parameters: `?1` = last rowid already returned, `?2` = page size.
/// The rowid is returned as the first column.
pub fn select_page(table: &str, columns: &[&str]) -> String {
    format!(
        "SELECT rowid, {} FROM {} WHERE rowid > ?1 ORDER BY rowid LIMIT ?2",
        quoted_list(columns.iter().copied()),
        quote_identifier(table)
    )
}

/// Total number of rows
pub fn count(table: &str) -> String {
    format!("SELECT count(*) FROM {}", quote_identifier(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("abc"), "\"abc\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_create_table() {
        let sql = create_table("merge_table", &["a", "b", "c"], &["a", "b"]);
        assert_eq!(
            sql,
            "CREATE TABLE \"merge_table\" (\"a\" TEXT, \"b\" TEXT, \"c\" TEXT, UNIQUE (\"a\", \"b\"))"
        );
    }

    #[test]
    fn test_upsert_with_value_columns() {
        let sql = upsert("t", &["a", "b", "c"], &["a"], &["b", "c"]);
        assert_eq!(
            sql,
            "INSERT INTO \"t\" (\"a\", \"b\", \"c\") VALUES (?1, ?2, ?3) ON CONFLICT (\"a\") \
             DO UPDATE SET (\"b\", \"c\") = (excluded.\"b\", excluded.\"c\") \
             WHERE (\"b\", \"c\") != (excluded.\"b\", excluded.\"c\")"
        );
    }

    #[test]
    fn test_upsert_all_columns_indexed() {
        let sql = upsert("t", &["a", "b"], &["b", "a"], &[]);
        assert!(sql.ends_with("ON CONFLICT (\"b\", \"a\") DO NOTHING"));
    }

    #[test]
    fn test_select_page_and_count() {
        assert_eq!(
            select_page("t", &["x", "y"]),
            "SELECT rowid, \"x\", \"y\" FROM \"t\" WHERE rowid > ?1 ORDER BY rowid LIMIT ?2"
        );
        assert_eq!(count("t"), "SELECT count(*) FROM \"t\"");
    }
}
