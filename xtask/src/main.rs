use std::process;

use anyhow::Result;
use clap::{ArgMatches, Command};

const BIN_NAME: &str = "nyan";

fn main() -> Result<()> {
    let args = clap::command!()
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("install").about("Install nyan binary locally"))
        .subcommand(
            Command::new("run")
                .about("Build and run nyan with arguments")
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .arg(clap::Arg::new("args")
                    .help("Arguments to pass to nyan")
                    .action(clap::ArgAction::Append)
                    .num_args(0..))
        )
        .subcommand(
            Command::new("test")
                .about("Test Operations")
                .subcommand(Command::new("all").about("Run all tests for the entire project"))
                .subcommand(Command::new("core").about("Run tests for nyan-core"))
                .subcommand(Command::new("bin").about("Run tests for nyan-bin"))
                .subcommand(Command::new("smoke").about("Scaffold a throwaway project through the CLI"))
        )
        .get_matches();

    match args.subcommand() {
        Some(("install", args)) => handle_install_command(args),
        Some(("run", args)) => handle_run_command(args),
        Some(("test", args)) => handle_test_commands(args),
        Some((command, _)) => anyhow::bail!("Unexpected command: {command}"),
        None => anyhow::bail!("Expected subcommand"),
    }
}

fn handle_install_command(_args: &ArgMatches) -> Result<()> {
    println!("Installing {BIN_NAME}...");
    let status = process::Command::new("cargo")
        .args(["install", "--path", "crates/nyan-bin"])
        .status()?;

    if status.success() {
        println!("✓ {BIN_NAME} installed successfully");
    } else {
        anyhow::bail!("Failed to install {BIN_NAME}");
    }

    Ok(())
}

fn handle_run_command(args: &ArgMatches) -> Result<()> {
    println!("Building and running {BIN_NAME}...");

    let run_args: Vec<String> = args.get_many::<String>("args")
        .map_or(Vec::new(), |vals| vals.cloned().collect());

    let mut command = process::Command::new("cargo");
    command.args(["run", "--bin", BIN_NAME, "--"]);

    if !run_args.is_empty() {
        command.args(&run_args);
    }

    let status = command.status()?;

    if !status.success() {
        anyhow::bail!("Failed to run {BIN_NAME}");
    }

    Ok(())
}

fn handle_test_commands(args: &ArgMatches) -> Result<()> {
    match args.subcommand() {
        Some(("all", _args)) => test_all(),
        Some(("core", _args)) => cargo_test(&["--package", "nyan-core"], "Core tests"),
        Some(("bin", _args)) => cargo_test(&["--package", "nyan-bin"], "Binary tests"),
        Some(("smoke", _args)) => test_smoke(),
        _ => {
            println!("Available test commands:");
            println!("  all    - Run all tests for the entire project");
            println!("  core   - Run tests for nyan-core");
            println!("  bin    - Run tests for nyan-bin");
            println!("  smoke  - Scaffold a throwaway project through the CLI");
            Ok(())
        }
    }
}

fn test_all() -> Result<()> {
    println!("🧪 Running all tests for the nyan project...\n");

    let suites: [(&str, fn() -> Result<()>); 4] = [
        ("nyan-core", || cargo_test(&["--package", "nyan-core"], "Core tests")),
        ("nyan-bin", || cargo_test(&["--package", "nyan-bin"], "Binary tests")),
        ("documentation", || cargo_test(&["--doc", "--package", "nyan-core"], "Documentation tests")),
        ("CLI smoke", test_smoke),
    ];

    let mut all_passed = true;
    for (name, suite) in suites {
        println!("▶ Running {name} tests...");
        match suite() {
            Ok(()) => println!("✅ {name} tests passed"),
            Err(e) => {
                all_passed = false;
                println!("❌ {name} tests failed: {e:?}");
            }
        }
        println!();
    }

    if all_passed {
        println!("🎉 All tests passed successfully!");
    } else {
        println!("💥 Some tests failed. Please check the output above.");
        anyhow::bail!("Test suite failed");
    }

    Ok(())
}

fn cargo_test(args: &[&str], label: &str) -> Result<()> {
    let status = process::Command::new("cargo")
        .arg("test")
        .args(args)
        .status()?;

    if !status.success() {
        anyhow::bail!("{label} failed");
    }
    Ok(())
}

fn test_smoke() -> Result<()> {
    let scratch = std::env::temp_dir().join(format!("nyan-smoke-{}", process::id()));
    let template = scratch.join("template");
    std::fs::create_dir_all(template.join("template"))?;
    std::fs::write(template.join("template-config.json"), r#"{"name": "template"}"#)?;
    std::fs::write(template.join("template").join("readme.md"), "TEMPLATE README")?;

    let status = process::Command::new("cargo")
        .args(["run", "--bin", BIN_NAME, "--", "new", "smoke"])
        .arg("--template-dir")
        .arg(&template)
        .arg("--projects-dir")
        .arg(scratch.join("td"))
        .status()?;

    let created = std::fs::read_to_string(scratch.join("td").join("smoke").join("smoke-config.json"));
    std::fs::remove_dir_all(&scratch)?;

    if !status.success() {
        anyhow::bail!("CLI new command failed");
    }
    if created? != r#"{"name": "smoke"}"# {
        anyhow::bail!("Scaffolded config was not rewritten");
    }

    Ok(())
}
