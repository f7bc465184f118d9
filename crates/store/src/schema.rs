//! Relational schema.

/// Applied on every open; every statement is idempotent.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question TEXT NOT NULL,
    content TEXT NOT NULL,
    source TEXT NOT NULL DEFAULT '',
    label TEXT NOT NULL DEFAULT '',
    to_delete INTEGER NOT NULL DEFAULT 0,
    response_count INTEGER NOT NULL DEFAULT 0 CHECK (response_count >= 0)
);

CREATE TABLE IF NOT EXISTS threads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_sender TEXT NOT NULL,
    resolved INTEGER NOT NULL DEFAULT 0,
    read INTEGER NOT NULL DEFAULT 0,
    last_email INTEGER
);

CREATE TABLE IF NOT EXISTS emails (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    thread_id INTEGER NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
    sender TEXT NOT NULL,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    message_id TEXT NOT NULL UNIQUE,
    is_reply INTEGER NOT NULL DEFAULT 0,
    date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_emails_thread ON emails(thread_id);

CREATE TABLE IF NOT EXISTS responses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email_id INTEGER NOT NULL UNIQUE REFERENCES emails(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    questions TEXT NOT NULL,
    docs_per_question TEXT NOT NULL,
    confidence REAL NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS response_documents (
    response_id INTEGER NOT NULL REFERENCES responses(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    document_id INTEGER NOT NULL REFERENCES documents(id),
    confidence REAL NOT NULL,
    PRIMARY KEY (response_id, position)
);

CREATE INDEX IF NOT EXISTS idx_response_documents_document
    ON response_documents(document_id);
"#;
