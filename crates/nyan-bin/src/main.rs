mod cli;
mod diff;

use anyhow::Result;
use cli::{Cli, Commands};
use nyan_core::toolchain::{self, Platform, WINGET_PACKAGES};
use nyan_core::{EntryKind, ProjectName};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    let cli = Cli::parse_args();

    setup_logging(&cli);

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    info!("Starting nyan");

    let code = match cli.command {
        Commands::New {
            name,
            template_dir,
            projects_dir,
            dry_run,
        } => {
            handle_new_command(&name, &template_dir, &projects_dir, dry_run)?;
            0
        }
        Commands::FixPath { yes } => {
            handle_fix_path_command(yes)?;
            0
        }
        Commands::Setup { yes } => {
            handle_setup_command(yes)?;
            0
        }
        Commands::Validate { target } => handle_validate_command(&target),
    };

    info!("nyan completed");
    Ok(code)
}

fn handle_new_command(
    name: &str,
    template_dir: &Path,
    projects_dir: &Path,
    dry_run: bool,
) -> Result<()> {
    let project_name = ProjectName::parse(name)?;
    let project_dir = projects_dir.join(project_name.as_str());

    info!("Template directory: {:?}", template_dir);
    info!("Project directory: {:?}", project_dir);

    nyan_core::check_preconditions(template_dir, &project_dir)?;

    if dry_run {
        warn!("Dry run mode - no changes will be made");
        return show_preview(template_dir, &project_dir, &project_name);
    }

    println!("Creating project: {}", project_name);
    println!("From template: {}", template_dir.display());
    println!();
    println!("Copying template files...");

    let tree = nyan_core::instantiate(template_dir, &project_dir, &project_name)?;

    println!();
    println!("Created project structure:");
    for line in nyan_core::list_tree(&tree.root)? {
        println!(
            "{}{}{}",
            "  ".repeat(line.depth + 1),
            line.name,
            if line.is_dir { "/" } else { "" }
        );
    }

    println!();
    println!("Done! Project created at:");
    println!("  {}", tree.root.display());
    println!();
    print_next_steps(&tree.root, &project_name);

    Ok(())
}

fn show_preview(template_dir: &Path, project_dir: &Path, project_name: &ProjectName) -> Result<()> {
    let plan = nyan_core::preview(template_dir, project_dir, project_name)?;

    println!("Would create project: {}", project_name);
    println!("  at {}", project_dir.display());

    let mut rewrites = 0;
    for entry in &plan {
        let kind = match entry.kind {
            EntryKind::Directory => "Directory",
            EntryKind::File => "File",
        };
        diff::show_path_mapping(&entry.source, &entry.destination, kind);
        if let Some(rewrite) = &entry.rewrite {
            diff::show_content_change(&entry.destination, &rewrite.original, &rewrite.rewritten)?;
            rewrites += 1;
        }
    }

    println!();
    println!("Dry run complete!");
    println!("  Entries: {}", plan.len());
    println!("  Content changes: {}", rewrites);

    Ok(())
}

fn print_next_steps(project_dir: &Path, project_name: &ProjectName) {
    let toe_file: PathBuf = project_dir.join(format!("{}.toe", project_name));

    println!("Next steps:");
    if toe_file.exists() {
        println!("  1. Open {} in TouchDesigner", toe_file.display());
        println!("  2. Check Textport (Alt+T) for \"server active\"");
        println!("  3. Run \"claude\" in this repo");
    } else {
        println!("  1. Open TouchDesigner");
        println!("  2. Save new project as: {}", toe_file.display());
        println!("  3. Drag mcp_webserver_base.tox into project");
        println!("  4. Check Textport (Alt+T) for \"server active\"");
        println!("  5. Run \"claude\" in this repo");
    }
}

fn handle_fix_path_command(yes: bool) -> Result<()> {
    println!("Fixing Claude PATH...\n");

    let npm_prefix = toolchain::npm_global_prefix()?;
    println!("npm global directory: {}", npm_prefix);

    match Platform::current() {
        Platform::Windows => {
            add_to_windows_path(&npm_prefix, yes)?;
            println!("\nTest claude:");
            println!("  \"{}\\claude.cmd\" --version", npm_prefix);
        }
        Platform::Posix => {
            let shell = std::env::var("SHELL").ok();
            let rc_file = toolchain::shell_rc_file(shell.as_deref());

            println!("\nAdd to {}:", rc_file);
            println!("  {}", toolchain::posix_export_line(&npm_prefix));
            println!("\nThen run: source {}", rc_file);
        }
    }

    Ok(())
}

fn add_to_windows_path(npm_prefix: &str, yes: bool) -> Result<()> {
    let current_path = std::env::var("PATH").unwrap_or_default();
    if toolchain::path_contains(&current_path, npm_prefix) {
        println!("Already in PATH");
        return Ok(());
    }

    if !yes && !diff::confirm(&format!("Add {} to your PATH?", npm_prefix))? {
        println!("\nManual fix: Add this to your PATH:");
        println!("  {}", npm_prefix);
        return Ok(());
    }

    println!("Adding to PATH...");
    match toolchain::run_shell(&toolchain::setx_command(npm_prefix)) {
        Ok(()) => println!("\nPATH updated! Restart your terminal."),
        Err(e) => {
            warn!("PATH update failed: {}", e);
            println!("\nManual fix: Add this to your PATH:");
            println!("  {}", npm_prefix);
        }
    }

    Ok(())
}

fn handle_setup_command(yes: bool) -> Result<()> {
    println!("=== Nyan Setup ===\n");

    if Platform::current() != Platform::Windows {
        println!("This setup script is for Windows.");
        println!("On Mac/Linux, just run: {}", toolchain::assistant_install_command());
        return Ok(());
    }

    toolchain::ensure_winget()?;

    if !yes && !diff::confirm("Install Windows Terminal, PowerShell 7, Git and Claude Code?")? {
        anyhow::bail!("Setup cancelled");
    }

    let total = WINGET_PACKAGES.len() + 1;
    for (i, package) in WINGET_PACKAGES.iter().enumerate() {
        println!("\n[{}/{}] Installing {}...", i + 1, total, package.description);
        run_install_step(&toolchain::winget_install_command(package), package.description);
    }

    println!("\n[{}/{}] Installing Claude Code...", total, total);
    run_install_step(&toolchain::assistant_install_command(), "Claude Code");

    println!("\n=== Fixing PATH ===");
    let npm_prefix = toolchain::npm_global_prefix()?;
    println!("npm global directory: {}", npm_prefix);
    add_to_windows_path(&npm_prefix, true)?;

    println!("\n=== Setup Complete ===");
    println!("\nRestart your terminal, then run:");
    println!("  claude");

    Ok(())
}

fn run_install_step(command_line: &str, description: &str) {
    println!("{}...", description);
    if let Err(e) = toolchain::run_shell(command_line) {
        warn!("{}: {}", description, e);
        println!("  Warning: {} may have failed", description);
    }
}

fn handle_validate_command(target: &Path) -> i32 {
    println!("Validating: {}\n", target.display());

    let report = nyan_core::toe::validate_project(target);

    for line in &report.info {
        println!("  {}", line);
    }
    println!();

    if report.has_errors() {
        println!("ERRORS ({}):", report.errors.len());
        for error in &report.errors {
            println!("  ✗ {}", error);
        }
        println!();
    }

    if report.has_warnings() {
        println!("WARNINGS ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  ⚠ {}", warning);
        }
        println!();
    }

    if !report.has_errors() && !report.has_warnings() {
        println!("✓ All checks passed!");
    } else if report.has_errors() {
        println!("✗ {} error(s), {} warning(s)", report.errors.len(), report.warnings.len());
    } else {
        println!("⚠ {} warning(s), no errors", report.warnings.len());
    }

    report.exit_code()
}

fn setup_logging(cli: &Cli) {
    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .with(filter)
        .init();
}
