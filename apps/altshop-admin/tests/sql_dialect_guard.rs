//! Every query in this workspace targets PostgreSQL. Fails if SQLite or MySQL syntax creeps in.

use std::fs;
use std::path::{Path, PathBuf};

const FORBIDDEN: &[(&str, &str)] = &[
    ("AUTOINCREMENT", "SQLite autoincrement"),
    ("INSERT OR REPLACE", "SQLite upsert"),
    ("INSERT OR IGNORE", "SQLite upsert"),
    ("datetime('now')", "SQLite clock"),
    ("strftime(", "SQLite date formatting"),
    ("PRAGMA ", "SQLite pragma"),
    ("AUTO_INCREMENT", "MySQL autoincrement"),
    ("ON DUPLICATE KEY", "MySQL upsert"),
    ("LAST_INSERT_ID", "MySQL insert id"),
];

fn rust_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            rust_files(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
}

/// String literals passed to `sqlx::query*` calls, raw or plain.
fn query_literals(source: &str) -> Vec<String> {
    let mut literals = Vec::new();
    let mut rest = source;
    while let Some(pos) = rest.find("sqlx::query") {
        rest = &rest[pos..];
        let Some(open) = rest.find('(') else { break };
        let after = rest[open + 1..].trim_start();
        let after = after
            .strip_prefix("r#\"")
            .map(|s| (s, "\"#"))
            .or_else(|| after.strip_prefix('"').map(|s| (s, "\"")));
        if let Some((body, terminator)) = after {
            if let Some(end) = body.find(terminator) {
                literals.push(body[..end].to_string());
            }
        }
        rest = &rest[open + 1..];
    }
    literals
}

fn has_question_placeholder(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    bytes.iter().enumerate().any(|(i, b)| {
        *b == b'?' && {
            let prev = if i > 0 { bytes[i - 1] } else { b' ' };
            let next = bytes.get(i + 1).copied().unwrap_or(b' ');
            // `?|` and `?&` are Postgres jsonb operators.
            !matches!(next, b'|' | b'&') && (prev == b' ' || prev == b'(' || prev == b',' || prev == b'=')
        }
    })
}

#[test]
fn queries_use_postgres_dialect() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut files = Vec::new();
    rust_files(&root.join("src"), &mut files);
    rust_files(&root.join("../../libs/altshop-db/src"), &mut files);
    assert!(!files.is_empty(), "no sources found");

    let mut problems = Vec::new();
    let mut scanned = 0;
    for file in &files {
        let source = fs::read_to_string(file).unwrap();
        for sql in query_literals(&source) {
            scanned += 1;
            if has_question_placeholder(&sql) {
                problems.push(format!("{}: `?` placeholder in {:?}", file.display(), sql.trim()));
            }
            let upper = sql.to_uppercase();
            for (needle, what) in FORBIDDEN {
                if upper.contains(&needle.to_uppercase()) {
                    problems.push(format!("{}: {} in {:?}", file.display(), what, sql.trim()));
                }
            }
        }
    }

    assert!(scanned > 0, "no sqlx queries found");
    assert!(problems.is_empty(), "non-Postgres SQL found:\n{}", problems.join("\n"));
}

#[test]
fn placeholder_detection() {
    assert!(has_question_placeholder("SELECT * FROM users WHERE id = ?"));
    assert!(has_question_placeholder("INSERT INTO t (a, b) VALUES (?, ?)"));
    assert!(!has_question_placeholder("SELECT * FROM users WHERE id = $1"));
    assert!(!has_question_placeholder("SELECT data ?| array['a'] FROM t"));
}
