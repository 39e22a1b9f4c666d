//! Inspection and setup commands.

use std::fs;

use anyhow::{bail, Result};
use genlock_core::config::STARTER_CONFIG;
use genlock_core::{compute_merkle_root, hash_files, resolve_files};
use owo_colors::OwoColorize;
use serde_json::json;

use crate::formatting::{
    print_key_value, print_section_header, print_success, print_task_table, print_warning,
    SectionStyle,
};

use super::Context;

pub fn cmd_list(ctx: &Context, json: bool) -> Result<i32> {
    let config = ctx.load_config()?;
    let tasks = config.to_tasks()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(0);
    }

    print_section_header("Configured Tasks", SectionStyle::Primary);
    if tasks.is_empty() {
        print_warning("No tasks configured");
    } else {
        print_task_table(&tasks);
    }
    println!();

    Ok(0)
}

/// Prints the resolved file set and Merkle root of one task.
///
/// Does not read or write the lockfile.
pub fn cmd_hash(ctx: &Context, task: String, json: bool) -> Result<i32> {
    let config = ctx.load_config()?;
    let spec = config
        .select_tasks(std::slice::from_ref(&task))?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("task '{}' resolved to nothing", task))?;

    let root_dir = config.root_dir();
    let paths = resolve_files(&root_dir, &spec.sources, &spec.exclude)?;
    let (files, skipped) = hash_files(&root_dir, &paths);
    let root = compute_merkle_root(&files);

    if json {
        let value = json!({
            "task": spec.name,
            "sources_hash": root,
            "files": files,
            "skipped": skipped,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(0);
    }

    print_section_header("Source Hashes", SectionStyle::Primary);
    print_key_value("Task", &spec.name);
    print_key_value("Sources hash", root.as_str());
    print_key_value("Files", &files.len().to_string());
    println!();
    for (path, digest) in &files {
        let short = digest.hex().get(..12).unwrap_or(digest.hex());
        println!("  {} {}", short.bright_black(), path);
    }
    if !skipped.is_empty() {
        println!();
        print_section_header("Skipped", SectionStyle::Muted);
        for file in &skipped {
            println!("  {} {}", file.path.yellow(), file.reason.bright_black());
        }
    }
    println!();

    Ok(0)
}

pub fn cmd_init(ctx: &Context) -> Result<i32> {
    let path = &ctx.config_path;
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, STARTER_CONFIG)?;

    print_success(&format!("Created {}", path.display()));
    println!();
    Ok(0)
}
