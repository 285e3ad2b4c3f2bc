//! SQL schema for the Warden SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS children (
    child_id       TEXT PRIMARY KEY,
    guardian_id    TEXT NOT NULL,
    oversight_mode TEXT NOT NULL,   -- 'monitor' | 'approve_first' | 'approve_all'
    created_at     TEXT NOT NULL
);

-- Ordered pair: child_id initiated the request, friend_child_id is the
-- target. The reciprocal (friend, child) row is created by the ledger on
-- approval and only then.
CREATE TABLE IF NOT EXISTS friendships (
    friendship_id                   TEXT PRIMARY KEY,
    child_id                        TEXT NOT NULL REFERENCES children(child_id),
    friend_child_id                 TEXT NOT NULL REFERENCES children(child_id),
    status                          TEXT NOT NULL,
    approved_by_parent_id           TEXT,
    approved_by_recipient_parent_id TEXT,
    approved_at                     TEXT,
    created_at                      TEXT NOT NULL,
    UNIQUE (child_id, friend_child_id),
    CHECK  (child_id != friend_child_id)
);

-- Canonical pair: child_a_id sorts strictly below child_b_id, so at most
-- one conversation exists per unordered pair.
CREATE TABLE IF NOT EXISTS conversations (
    conversation_id TEXT PRIMARY KEY,
    child_a_id      TEXT NOT NULL REFERENCES children(child_id),
    child_b_id      TEXT NOT NULL REFERENCES children(child_id),
    created_at      TEXT NOT NULL,
    UNIQUE (child_a_id, child_b_id),
    CHECK  (child_a_id < child_b_id)
);

CREATE TABLE IF NOT EXISTS messages (
    message_id                      TEXT PRIMARY KEY,
    conversation_id                 TEXT NOT NULL REFERENCES conversations(conversation_id),
    sender_child_id                 TEXT NOT NULL REFERENCES children(child_id),
    body                            TEXT NOT NULL,
    status                          TEXT NOT NULL,
    approved_by_sender_parent_id    TEXT,
    approved_by_recipient_parent_id TEXT,
    delivered_at                    TEXT,
    created_at                      TEXT NOT NULL
);

-- Approvals and audit entries are strictly append-only.
-- No UPDATE or DELETE is ever issued against these tables.
CREATE TABLE IF NOT EXISTS approvals (
    approval_id TEXT PRIMARY KEY,
    subject_id  TEXT NOT NULL,
    guardian_id TEXT NOT NULL,
    decision    TEXT NOT NULL,     -- 'approved' | 'denied'
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_log (
    entry_id    TEXT PRIMARY KEY,
    guardian_id TEXT NOT NULL,
    child_id    TEXT NOT NULL,
    action      TEXT NOT NULL,
    details     TEXT NOT NULL DEFAULT '{}',
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS friendships_child_idx  ON friendships(child_id);
CREATE INDEX IF NOT EXISTS friendships_friend_idx ON friendships(friend_child_id);
CREATE INDEX IF NOT EXISTS messages_sender_idx    ON messages(conversation_id, sender_child_id);
CREATE INDEX IF NOT EXISTS approvals_subject_idx  ON approvals(subject_id);
CREATE INDEX IF NOT EXISTS audit_child_idx        ON audit_log(child_id);

PRAGMA user_version = 1;
";
