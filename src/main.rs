use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use job_catalog::{
    export, open_store, AuditLog, Catalog, CatalogWorkflow, CodeDecision, Siglum,
    TitleDecision, WorkflowState, MIN_CODE_LEN,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("add") => run_add(),
        Some("remove") => run_remove(&args[2..]),
        Some("search") => run_search(args.get(2).map(String::as_str).unwrap_or("")),
        Some("list") => run_list(),
        Some("export") => run_export(&args[2..]),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("📇 Job Code Catalog v{}", job_catalog::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Usage: job-catalog <command>");
    println!();
    println!("Commands:");
    println!("  add               Register a new job code and title (interactive)");
    println!("  remove CODE...    Remove one or more job codes");
    println!("  search PREFIX     List job codes starting with PREFIX");
    println!("  list              Print the whole catalog");
    println!("  export [--json] [PATH]   Write a copy of the catalog");
    println!();
    println!("The catalog file is taken from JOB_CATALOG_FILE (default: job_codes.csv).");
    println!("A .db/.sqlite extension selects the SQLite backend.");
}

fn catalog_path() -> PathBuf {
    env::var("JOB_CATALOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("job_codes.csv"))
}

/// Load the catalog or die: without it there is nothing to validate against.
fn open_workflow() -> Result<CatalogWorkflow> {
    let path = catalog_path();
    let store = open_store(&path)
        .with_context(|| format!("Failed to open catalog at {}", path.display()))?;

    let workflow = CatalogWorkflow::open(store).context("Failed to load catalog")?;

    let audit_path = path.with_extension("audit.jsonl");
    Ok(workflow.with_audit(AuditLog::new(audit_path)))
}

// ============================================================================
// add - interactive registration
// ============================================================================

fn run_add() -> Result<()> {
    let mut workflow = open_workflow()?;

    println!("📇 Job Code Catalog - Register New Entry");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "Catalog: {} ({} entries)\n",
        catalog_path().display(),
        workflow.catalog().len()
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        match workflow.state().clone() {
            WorkflowState::AwaitingCode => {
                let Some(input) = prompt(&mut lines, "Enter job code (blank to quit): ")?
                else {
                    return Ok(());
                };

                if input.trim().is_empty() {
                    println!("👋 Nothing registered.");
                    return Ok(());
                }

                let matches: Vec<String> = workflow
                    .search_by_code_prefix(input.trim())
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                if !matches.is_empty() {
                    println!("   Matching job codes: {}", matches.join(", "));
                }

                match workflow.submit_code(&input) {
                    CodeDecision::Accepted { code } => {
                        println!("✅ Job code '{}' is unique. Please enter the job title.", code);
                    }
                    CodeDecision::Duplicate {
                        code,
                        existing_title,
                    } => {
                        println!(
                            "⚠️  Job code '{}' already exists! Existing job title is '{}'.",
                            code, existing_title
                        );
                    }
                    CodeDecision::TooShort { .. } => {
                        println!("❌ Minimum job code length is {} characters.", MIN_CODE_LEN);
                    }
                }
            }

            WorkflowState::AwaitingTitle { code } => {
                let Some(input) = prompt(&mut lines, "Enter job title: ")? else {
                    return Ok(());
                };

                match workflow.submit_title(&input) {
                    TitleDecision::Accepted { title } => {
                        println!(
                            "🎉 Job code '{}' and job title '{}' are unique!",
                            code, title
                        );
                    }
                    TitleDecision::Duplicate {
                        title,
                        existing_codes,
                    } => {
                        println!(
                            "⚠️  Job title '{}' already exists with code(s): {}.",
                            title,
                            existing_codes.join(", ")
                        );
                    }
                    TitleDecision::Empty => {
                        println!("❌ Job title cannot be empty.");
                    }
                }
            }

            WorkflowState::AwaitingConfirmation { code, title } => {
                println!("\nJob code:  {}", code);
                println!("Job title: {}", title);

                let options: Vec<&str> = Siglum::ALL.iter().map(|s| s.as_str()).collect();
                let Some(input) = prompt(
                    &mut lines,
                    &format!("Select siglum [{}] (or 'cancel'): ", options.join("/")),
                )?
                else {
                    return Ok(());
                };

                if input.trim().eq_ignore_ascii_case("cancel") {
                    workflow.cancel();
                    println!("↩️  Entry discarded.\n");
                    continue;
                }

                let siglum: Siglum = match input.parse() {
                    Ok(siglum) => siglum,
                    Err(err) => {
                        println!("❌ {}", err);
                        continue;
                    }
                };

                match workflow.commit(siglum) {
                    Ok(entry) => {
                        println!(
                            "🚀 Added job code '{}' with title '{}' to the catalog!",
                            entry.code, entry.title
                        );
                        print_tail(workflow.catalog());
                        return Ok(());
                    }
                    Err(err) => {
                        // Pending entry survives a failed save; let the
                        // operator retry or cancel
                        println!("❌ {}. The entry was not saved; retry or type 'cancel'.", err);
                    }
                }
            }
        }
    }
}

fn prompt(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    message: &str,
) -> Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush().context("Failed to flush stdout")?;

    match lines.next() {
        Some(line) => Ok(Some(line.context("Failed to read input")?)),
        None => Ok(None),
    }
}

fn print_tail(catalog: &Catalog) {
    println!("\nLast entries:");
    for entry in catalog.tail(5) {
        println!("  {:<8} {:<30} {}", entry.code, entry.title, entry.siglum);
    }
}

// ============================================================================
// remove / search / list / export
// ============================================================================

fn run_remove(codes: &[String]) -> Result<()> {
    if codes.is_empty() {
        bail!("Usage: job-catalog remove CODE...");
    }

    let mut workflow = open_workflow()?;
    let report = workflow.remove_codes(codes)?;

    for code in &report.removed {
        println!("🗑️  Removed job code '{}'", code);
    }
    for code in &report.not_found {
        println!("❌ Job code '{}' not found", code);
    }
    println!("✓ Catalog now has {} entries", workflow.catalog().len());

    Ok(())
}

fn run_search(prefix: &str) -> Result<()> {
    let workflow = open_workflow()?;
    let matches = workflow.search_by_code_prefix(prefix);

    if matches.is_empty() {
        println!("No job codes matching '{}'", prefix);
    } else {
        println!("Matching job codes:");
        for code in matches {
            println!("  {}", code);
        }
    }

    Ok(())
}

fn run_list() -> Result<()> {
    let workflow = open_workflow()?;
    let catalog = workflow.catalog();

    println!("📇 {} entries in {}", catalog.len(), catalog_path().display());
    for entry in catalog.iter() {
        println!("  {:<8} {:<30} {}", entry.code, entry.title, entry.siglum);
    }

    Ok(())
}

fn run_export(args: &[String]) -> Result<()> {
    let as_json = args.iter().any(|a| a == "--json");
    let path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let stamp = chrono::Utc::now().format("%Y-%m-%d");
            let ext = if as_json { "json" } else { "csv" };
            PathBuf::from(format!("job_codes_export_{}.{}", stamp, ext))
        });

    let workflow = open_workflow()?;
    let contents = if as_json {
        export::to_json_string(workflow.catalog())?
    } else {
        export::to_csv_string(workflow.catalog())?
    };

    fs::write(&path, contents)
        .with_context(|| format!("Failed to write export to {}", path.display()))?;

    println!(
        "📤 Exported {} entries to {}",
        workflow.catalog().len(),
        path.display()
    );

    Ok(())
}
