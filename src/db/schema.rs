//! SQL DDL for the `schools` table.
//!
//! Every column is NOT NULL: a row only exists once its image is on disk.
//! Text columns are VARCHAR so both backends decode them as plain strings.

pub const MYSQL_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS schools (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    address VARCHAR(512) NOT NULL,
    city VARCHAR(255) NOT NULL,
    state VARCHAR(255) NOT NULL,
    contact VARCHAR(32) NOT NULL,
    image VARCHAR(512) NOT NULL,
    email_id VARCHAR(255) NOT NULL
)
"#;

pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS schools (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    city TEXT NOT NULL,
    state TEXT NOT NULL,
    contact TEXT NOT NULL,
    image TEXT NOT NULL,
    email_id TEXT NOT NULL
)
"#;

/// Pick the DDL matching a sqlx backend name (`AnyConnection::backend_name`).
pub fn init_for_backend(backend: &str) -> &'static str {
    if backend.eq_ignore_ascii_case("sqlite") {
        SQLITE_INIT
    } else {
        MYSQL_INIT
    }
}
