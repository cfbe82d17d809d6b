//! Discovery and loading of annotated `.sql` files.

use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use sqlgen_core::{UntypedQuery, parse_query_file};

/// One source file and the queries parsed out of it. Emission is
/// file-for-file: `users.sql` becomes `users.rs`.
#[derive(Debug)]
pub struct QueryFile {
    pub path: PathBuf,
    pub queries: Vec<UntypedQuery>,
}

/// Non-recursive listing of `*.sql` under `dir`, sorted by file name so
/// output is deterministic.
pub fn discover_sql_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read queries directory '{}'", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "sql"))
        .collect();
    files.sort();

    if files.is_empty() {
        bail!("no .sql files found in '{}'", dir.display());
    }
    Ok(files)
}

/// Parse every file and reject duplicate query names across the whole run:
/// generated consts and structs share one namespace per output tree.
pub fn load_query_files(paths: &[PathBuf]) -> Result<Vec<QueryFile>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(paths.len());

    for path in paths {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let queries = parse_query_file(path, &content)?;
        if queries.is_empty() {
            bail!("'{}' contains no annotated queries", path.display());
        }
        for query in &queries {
            if !seen.insert(query.name.clone()) {
                bail!(
                    "duplicate query name '{}' (second definition in '{}')",
                    query.name,
                    path.display()
                );
            }
        }
        out.push(QueryFile {
            path: path.clone(),
            queries,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_discovery_is_sorted_and_filtered() {
        let dir = std::env::temp_dir().join("sqlgen-files-test-discovery");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        write(&dir, "b.sql", "-- name: B :one\nSELECT 1;\n");
        write(&dir, "a.sql", "-- name: A :one\nSELECT 1;\n");
        write(&dir, "notes.txt", "not sql");

        let files = discover_sql_files(&dir).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.sql", "b.sql"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let dir = std::env::temp_dir().join("sqlgen-files-test-dupes");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let a = write(&dir, "a.sql", "-- name: GetUser :one\nSELECT 1;\n");
        let b = write(&dir, "b.sql", "-- name: GetUser :one\nSELECT 2;\n");

        let err = load_query_files(&[a, b]).unwrap_err();
        assert!(err.to_string().contains("duplicate query name 'GetUser'"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
