//! The `generate` command: introspect every query, then write bindings.

use anyhow::{Context, Result, bail};
use colored::*;
use std::fs;
use std::path::Path;

use sqlgen_core::TypedQuery;
use sqlgen_pg::{ConnectParams, Connection, Introspector};

use crate::emit::{output_file_name, render_module};
use crate::files::{QueryFile, discover_sql_files, load_query_files};

pub struct GenerateOptions<'a> {
    pub queries_dir: &'a Path,
    pub out_dir: &'a Path,
    pub params: &'a ConnectParams,
    pub manifest: Option<&'a Path>,
}

/// A fully rendered output file, not yet written to disk.
pub struct Rendered {
    pub file_name: String,
    pub content: String,
}

pub fn run_generate(options: &GenerateOptions) -> Result<()> {
    let (rendered, typed, warnings) = introspect_and_render(options.queries_dir, options.params)?;

    print_warnings(&warnings);

    // Everything succeeded; only now touch the output directory.
    fs::create_dir_all(options.out_dir).with_context(|| {
        format!(
            "failed to create output directory '{}'",
            options.out_dir.display()
        )
    })?;
    for file in &rendered {
        let path = options.out_dir.join(&file.file_name);
        fs::write(&path, &file.content)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        println!("  {} {}", "wrote".cyan(), path.display());
    }

    if let Some(manifest_path) = options.manifest {
        let json = TypedQuery::to_json(&typed)?;
        fs::write(manifest_path, json)
            .with_context(|| format!("failed to write '{}'", manifest_path.display()))?;
        println!("  {} {}", "wrote".cyan(), manifest_path.display());
    }

    println!(
        "{} {} queries across {} file(s)",
        "✓ Generated".green().bold(),
        typed.len(),
        rendered.len()
    );
    Ok(())
}

/// The shared front half of `generate` and `verify`: discover, parse,
/// introspect, render. Nothing is written.
pub fn introspect_and_render(
    queries_dir: &Path,
    params: &ConnectParams,
) -> Result<(Vec<Rendered>, Vec<TypedQuery>, Vec<String>)> {
    let files = discover_sql_files(queries_dir)?;
    let query_files = load_query_files(&files)?;

    println!(
        "{} {} ({} file(s))",
        "Loading queries from".cyan().bold(),
        queries_dir.display(),
        query_files.len()
    );

    println!(
        "{} {}:{}/{}",
        "Connecting to".cyan().bold(),
        params.host,
        params.port,
        params.database
    );
    let mut conn = Connection::connect(params)?;
    let mut introspector = Introspector::new(&mut conn);

    let mut rendered = Vec::with_capacity(query_files.len());
    let mut all_typed = Vec::new();
    for QueryFile { path, queries } in &query_files {
        let mut typed_for_file = Vec::with_capacity(queries.len());
        for query in queries {
            match introspector.introspect(query) {
                Ok(typed) => {
                    println!("  {} {}", "✓".green(), query.name);
                    typed_for_file.push(typed);
                }
                Err(err) => {
                    eprintln!("  {} {}", "✗".red().bold(), query.name);
                    bail!("{}", err);
                }
            }
        }
        rendered.push(Rendered {
            file_name: output_file_name(path),
            content: render_module(path, &typed_for_file),
        });
        all_typed.extend(typed_for_file);
    }

    let warnings = introspector.take_warnings();
    conn.close()?;
    Ok((rendered, all_typed, warnings))
}

pub fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
}
