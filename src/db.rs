use rusqlite::{ffi, params, Connection, ErrorCode};
use thiserror::Error;

use crate::crawler::detail::{BookDetail, PRICE_EXCL_TAX_KEY, TAX_KEY};
use crate::normalize::{clean_availability, clean_price};

/// Which step of an insert went wrong.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not open database: {0}")]
    Connect(#[source] rusqlite::Error),
    #[error("could not start transaction: {0}")]
    Begin(#[source] rusqlite::Error),
    #[error("insert failed: {0}")]
    Insert(#[source] rusqlite::Error),
    #[error("commit failed: {0}")]
    Commit(#[source] rusqlite::Error),
}

impl StoreError {
    /// True when the row was rejected because its `upc` is already stored.
    pub fn is_duplicate(&self) -> bool {
        match self {
            StoreError::Insert(rusqlite::Error::SqliteFailure(e, _)) => {
                e.code == ErrorCode::ConstraintViolation
                    && matches!(
                        e.extended_code,
                        ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE
                    )
            }
            _ => false,
        }
    }
}

/// Accepts `sqlite://path`, `sqlite:path` or a bare path.
fn db_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

pub fn connect(database_url: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path(database_url))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS book (
            upc            TEXT PRIMARY KEY NOT NULL,
            title          TEXT NOT NULL,
            price_excl_tax REAL NOT NULL,
            tax            REAL NOT NULL,
            availability   INTEGER NOT NULL,
            description    TEXT,
            image          TEXT,
            category_id    INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_book_category ON book(category_id);
        ",
    )
}

/// One `book` row, with the numeric columns already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct BookRow {
    pub upc: Option<String>,
    pub title: String,
    pub price_excl_tax: f64,
    pub tax: f64,
    pub availability: i64,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category_id: Option<i64>,
}

impl BookRow {
    pub fn from_detail(book: &BookDetail) -> Self {
        BookRow {
            upc: book.upc().map(str::to_string),
            title: book.title.clone(),
            price_excl_tax: clean_price(Some(book.info(PRICE_EXCL_TAX_KEY).unwrap_or("0"))),
            tax: clean_price(Some(book.info(TAX_KEY).unwrap_or("0"))),
            availability: clean_availability(Some(book.availability.as_deref().unwrap_or("0"))),
            description: book.description.clone(),
            image: book.image.clone(),
            category_id: book.category_id,
        }
    }
}

/// Insert one book on its own connection, in its own transaction.
///
/// The connection is opened for this call only and dropped on every return
/// path; an uncommitted transaction rolls back when dropped.
pub fn insert_book(database_url: &str, book: &BookDetail) -> Result<(), StoreError> {
    let row = BookRow::from_detail(book);

    let mut conn = connect(database_url).map_err(StoreError::Connect)?;
    let tx = conn.transaction().map_err(StoreError::Begin)?;
    tx.execute(
        "INSERT INTO book (upc, title, price_excl_tax, tax, availability, description, image, category_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            row.upc,
            row.title,
            row.price_excl_tax,
            row.tax,
            row.availability,
            row.description,
            row.image,
            row.category_id,
        ],
    )
    .map_err(StoreError::Insert)?;
    tx.commit().map_err(StoreError::Commit)
}

pub struct Stats {
    pub total: i64,
    pub with_description: i64,
    pub without_category: i64,
    pub in_stock: i64,
    pub categories: i64,
}

pub fn get_stats(conn: &Connection) -> rusqlite::Result<Stats> {
    conn.query_row(
        "SELECT
            COUNT(*),
            COUNT(description),
            COUNT(*) - COUNT(category_id),
            COALESCE(SUM(availability > 0), 0),
            COUNT(DISTINCT category_id)
         FROM book",
        [],
        |row| {
            Ok(Stats {
                total: row.get(0)?,
                with_description: row.get(1)?,
                without_category: row.get(2)?,
                in_stock: row.get(3)?,
                categories: row.get(4)?,
            })
        },
    )
}
