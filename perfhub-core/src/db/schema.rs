pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS okrs (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    user_id TEXT NOT NULL,
    company_id TEXT NOT NULL,
    department_id TEXT,
    parent_okr_id TEXT REFERENCES okrs(id) ON DELETE SET NULL,
    start_date TEXT NOT NULL,
    due_date TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    updated_by TEXT NOT NULL,
    CHECK (due_date >= start_date)
);

CREATE TABLE IF NOT EXISTS okr_assignees (
    okr_id TEXT NOT NULL REFERENCES okrs(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (okr_id, user_id)
);

CREATE TABLE IF NOT EXISTS key_results (
    id TEXT PRIMARY KEY,
    okr_id TEXT NOT NULL REFERENCES okrs(id) ON DELETE CASCADE,
    parent_key_result_id TEXT REFERENCES key_results(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    progress REAL NOT NULL DEFAULT 0 CHECK (progress >= 0 AND progress <= 100),
    weight REAL NOT NULL DEFAULT 0 CHECK (weight >= 0 AND weight <= 100),
    created_at TEXT NOT NULL,
    created_by TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    updated_by TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_okrs_company ON okrs(company_id);
CREATE INDEX IF NOT EXISTS idx_okrs_department ON okrs(department_id);
CREATE INDEX IF NOT EXISTS idx_okr_assignees_user ON okr_assignees(user_id);
CREATE INDEX IF NOT EXISTS idx_key_results_okr ON key_results(okr_id);
CREATE INDEX IF NOT EXISTS idx_key_results_parent ON key_results(parent_key_result_id);
"#;
