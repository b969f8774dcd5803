//! SQLite schema definition

/// SQL schema for the inventory database
pub const SCHEMA_SQL: &str = r#"
-- Stores: one row per physical store, keyed by trimmed name
CREATE TABLE IF NOT EXISTS stores (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    address TEXT NOT NULL,
    logo TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Authors: keyed by trimmed name
CREATE TABLE IF NOT EXISTS authors (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Books: keyed by (name, author)
CREATE TABLE IF NOT EXISTS books (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    pages INTEGER NOT NULL CHECK (pages >= 1),
    author_id TEXT NOT NULL REFERENCES authors(id) ON DELETE CASCADE ON UPDATE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(name, author_id)
);

-- Store books: per-store stock for one book
CREATE TABLE IF NOT EXISTS store_books (
    id TEXT PRIMARY KEY,
    store_id TEXT NOT NULL REFERENCES stores(id) ON DELETE CASCADE ON UPDATE CASCADE,
    book_id TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE ON UPDATE CASCADE,
    price REAL NOT NULL CHECK (price >= 0),
    copies INTEGER NOT NULL DEFAULT 0 CHECK (copies >= 0),
    sold_out INTEGER NOT NULL DEFAULT 1 CHECK (sold_out = (copies <= 0)),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(store_id, book_id)
);

-- Ingestion runs: audit trail of uploads
CREATE TABLE IF NOT EXISTS ingestion_runs (
    id TEXT PRIMARY KEY,
    file_name TEXT,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    status TEXT NOT NULL,
    total_rows INTEGER DEFAULT 0,
    processed_rows INTEGER DEFAULT 0,
    stores_created INTEGER DEFAULT 0,
    authors_created INTEGER DEFAULT 0,
    books_created INTEGER DEFAULT 0,
    store_books_created INTEGER DEFAULT 0,
    store_books_updated INTEGER DEFAULT 0,
    errors_json TEXT
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_books_author ON books(author_id);
CREATE INDEX IF NOT EXISTS idx_store_books_store ON store_books(store_id);
CREATE INDEX IF NOT EXISTS idx_store_books_book ON store_books(book_id);
CREATE INDEX IF NOT EXISTS idx_runs_started ON ingestion_runs(started_at);
"#;
