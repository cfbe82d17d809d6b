//! The `verify` command: re-run the pipeline, diff against disk, write
//! nothing.

use anyhow::{Result, bail};
use colored::*;
use std::fs;
use std::path::Path;

use sqlgen_pg::ConnectParams;

use crate::generate::{introspect_and_render, print_warnings};

pub fn run_verify(queries_dir: &Path, out_dir: &Path, params: &ConnectParams) -> Result<()> {
    let (rendered, _, warnings) = introspect_and_render(queries_dir, params)?;
    print_warnings(&warnings);

    let mut drifted = 0usize;
    for file in &rendered {
        let path = out_dir.join(&file.file_name);
        match fs::read_to_string(&path) {
            Ok(on_disk) if on_disk == file.content => {
                println!("  {} {}", "✓".green(), path.display());
            }
            Ok(_) => {
                println!("  {} {} (stale)", "✗".red().bold(), path.display());
                drifted += 1;
            }
            Err(_) => {
                println!("  {} {} (missing)", "✗".red().bold(), path.display());
                drifted += 1;
            }
        }
    }

    if drifted > 0 {
        bail!(
            "{} generated file(s) out of date; run `sqlgen generate`",
            drifted
        );
    }
    println!(
        "{}",
        "✓ Generated bindings match the database schema".green().bold()
    );
    Ok(())
}
