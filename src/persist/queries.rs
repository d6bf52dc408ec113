use crate::ingest::records::ReviewRecord;
use crate::persist::csv_export::AppRow;
use serde::Serialize;
use serde_json::{Value, json};

pub const APP_TABLE: &str = "ios_app_data";
pub const REVIEW_TABLE: &str = "ios_review_data";

/// Bound parameter ceiling of the remote query endpoint.
pub const MAX_BOUND_PARAMS: usize = 100;

pub const APP_COLUMNS: [&str; 13] = [
    "platform",
    "type",
    "cid",
    "cname",
    "rank",
    "appid",
    "appname",
    "icon",
    "link",
    "title",
    "updateAt",
    "country",
    "alsoBought",
];

pub const REVIEW_COLUMNS: [&str; 9] = [
    "id", "appid", "appname", "country", "keyword", "score", "userName", "date", "review",
];

pub const CREATE_APP_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ios_app_data (
  "platform"   TEXT NOT NULL,
  "type"       TEXT,
  "cid"        TEXT,
  "cname"      TEXT,
  "rank"       INTEGER,
  "appid"      TEXT NOT NULL,
  "appname"    TEXT,
  "icon"       TEXT,
  "link"       TEXT,
  "title"      TEXT,
  "updateAt"   TEXT,
  "country"    TEXT,
  "alsoBought" TEXT
);
"#;

pub const CREATE_REVIEW_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ios_review_data (
  "id"       TEXT PRIMARY KEY,
  "appid"    TEXT,
  "appname"  TEXT,
  "country"  TEXT,
  "keyword"  TEXT,
  "score"    REAL,
  "userName" TEXT,
  "date"     TEXT,
  "review"   TEXT
);
"#;

/// SQL text plus positional parameters, in the shape the query endpoint accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn plain(sql: &str) -> Self {
        Self {
            sql: sql.trim().to_string(),
            params: Vec::new(),
        }
    }
}

pub fn schema_statements() -> Vec<Statement> {
    vec![
        Statement::plain(CREATE_APP_TABLE),
        Statement::plain(CREATE_REVIEW_TABLE),
    ]
}

pub fn app_insert_statements(rows: &[AppRow]) -> Vec<Statement> {
    let values = rows
        .iter()
        .map(|row| {
            vec![
                json!(row.platform),
                json!(row.listing_type),
                json!(row.category_id),
                json!(row.category_name),
                json!(row.rank),
                json!(row.app_id),
                json!(row.app_name),
                json!(row.icon),
                json!(row.link),
                json!(row.description),
                json!(row.updated_at),
                json!(row.country),
                json!(row.also_bought),
            ]
        })
        .collect::<Vec<_>>();

    batched_inserts("INSERT INTO", APP_TABLE, &APP_COLUMNS, values)
}

/// Reviews are keyed by [`ReviewRecord::row_id`]; rows already present are ignored.
pub fn review_insert_statements(reviews: &[ReviewRecord]) -> Vec<Statement> {
    let values = reviews
        .iter()
        .map(|review| {
            vec![
                json!(review.row_id()),
                json!(review.app_id),
                json!(review.app_name),
                json!(review.country),
                json!(review.keyword),
                json!(review.score),
                json!(review.user_name),
                json!(review.date),
                json!(review.review),
            ]
        })
        .collect::<Vec<_>>();

    batched_inserts("INSERT OR IGNORE INTO", REVIEW_TABLE, &REVIEW_COLUMNS, values)
}

fn batched_inserts(
    verb: &str,
    table: &str,
    columns: &[&str],
    rows: Vec<Vec<Value>>,
) -> Vec<Statement> {
    let rows_per_statement = (MAX_BOUND_PARAMS / columns.len()).max(1);
    let column_list = columns
        .iter()
        .map(|column| format!("\"{column}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let row_placeholder = format!("({})", vec!["?"; columns.len()].join(", "));

    rows.chunks(rows_per_statement)
        .map(|chunk| Statement {
            sql: format!(
                "{verb} {table} ({column_list}) VALUES {};",
                vec![row_placeholder.as_str(); chunk.len()].join(", ")
            ),
            params: chunk.iter().flatten().cloned().collect(),
        })
        .collect()
}
