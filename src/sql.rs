//! SQL `INSERT` rendering for transformed records.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    transform::TransformedRecord,
    value::{Record, Value, format_number},
};

pub const USERS_TABLE: &str = "public.users";
pub const FLEXIBLE_TABLE: &str = "public.flexible_data";

/// Target table layout for the generated statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum SqlLayout {
    /// `(name, age, address, additional_info)`
    #[default]
    Users,
    /// `(record_age, data_json)`, the layout the upload endpoint writes.
    Flexible,
}

/// Doubles single quotes so the text can sit inside a SQL string literal.
pub fn escape_sql(text: &str) -> String {
    text.replace('\'', "''")
}

fn quoted(text: &str) -> String {
    format!("'{}'", escape_sql(text))
}

fn json_literal(value: &Value) -> String {
    match serde_json::to_string(value) {
        Ok(json) => quoted(&json),
        Err(_) => "NULL".to_string(),
    }
}

fn json_or_null(value: &Value) -> String {
    if value.is_empty_like() {
        "NULL".to_string()
    } else {
        json_literal(value)
    }
}

fn record_or_null(record: &Record) -> String {
    if record.is_empty() {
        "NULL".to_string()
    } else {
        json_literal(&Value::Mapping(record.clone()))
    }
}

fn users_statement(record: &TransformedRecord) -> String {
    format!(
        "INSERT INTO {USERS_TABLE} (name, age, address, additional_info) VALUES ({}, {}, {}, {});",
        quoted(&record.display_name),
        format_number(record.primary_metric),
        json_or_null(&record.address),
        record_or_null(&record.extra),
    )
}

fn flexible_statement(record: &TransformedRecord) -> String {
    let age = if record.primary_metric == 0.0 {
        "NULL".to_string()
    } else {
        format_number(record.primary_metric)
    };
    format!(
        "INSERT INTO {FLEXIBLE_TABLE} (record_age, data_json) VALUES ({age}, {});",
        json_literal(&Value::Mapping(record.shape(false))),
    )
}

/// One statement per record, newline separated, in input order.
pub fn render(records: &[TransformedRecord], layout: SqlLayout) -> String {
    records
        .iter()
        .map(|record| match layout {
            SqlLayout::Users => users_statement(record),
            SqlLayout::Flexible => flexible_statement(record),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        parser::parse,
        transform::{TransformMode, transform},
    };

    fn records(text: &str) -> Vec<TransformedRecord> {
        let parsed = parse(text).expect("parse");
        transform(&parsed.records, TransformMode::Lenient).expect("transform")
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(render(&[], SqlLayout::Users), "");
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(escape_sql("O'Brien's"), "O''Brien''s");
    }

    #[test]
    fn users_layout_uses_null_for_empty_buckets() {
        let sql = render(&records("name,age\nO'Hara,52\n"), SqlLayout::Users);
        assert_eq!(
            sql,
            "INSERT INTO public.users (name, age, address, additional_info) VALUES ('O''Hara', 52, NULL, NULL);"
        );
    }

    #[test]
    fn users_layout_embeds_json() {
        let sql = render(
            &records("name,age,address.city,team\nAlice,30,St John's,blue\nBob,45,Oslo,red\n"),
            SqlLayout::Users,
        );
        let lines: Vec<&str> = sql.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"INSERT INTO public.users (name, age, address, additional_info) VALUES ('Alice', 30, '{"city":"St John''s"}', '{"team":"blue"}');"#
        );
    }

    #[test]
    fn flexible_layout_drops_age_from_payload() {
        let sql = render(&records("name,age\nAlice,30\nBob,x\n"), SqlLayout::Flexible);
        let lines: Vec<&str> = sql.lines().collect();
        assert_eq!(
            lines[0],
            r#"INSERT INTO public.flexible_data (record_age, data_json) VALUES (30, '{"id":1,"name":"Alice","address":{},"additional_info":{}}');"#
        );
        assert!(lines[1].starts_with("INSERT INTO public.flexible_data (record_age, data_json) VALUES (NULL, "));
    }
}
