use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nyan")]
#[command(version)]
#[command(about = "Developer setup helpers for TouchDesigner projects")]
#[command(long_about = "Scaffolds new TouchDesigner projects from a template folder, gets the coding assistant CLI onto PATH, installs the Windows toolchain and validates expanded .toe.dir projects.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create a new project from the template folder")]
    New {
        #[arg(help = "Project name (letter first, then letters, digits, '-' or '_')")]
        name: String,

        #[arg(long, env = "NYAN_TEMPLATE_DIR", default_value = "template", help = "Template folder to copy")]
        template_dir: PathBuf,

        #[arg(long, env = "NYAN_PROJECTS_DIR", default_value = "td", help = "Folder that receives new projects")]
        projects_dir: PathBuf,

        #[arg(long, help = "Show what would be created without writing anything")]
        dry_run: bool,
    },

    #[command(about = "Put the npm global directory on PATH")]
    FixPath {
        #[arg(short, long, help = "Apply changes without asking")]
        yes: bool,
    },

    #[command(about = "Install Windows Terminal, PowerShell 7, Git and the assistant CLI")]
    Setup {
        #[arg(short, long, help = "Install without asking")]
        yes: bool,
    },

    #[command(about = "Validate an expanded TouchDesigner project before collapsing it")]
    Validate {
        #[arg(help = "Expanded project directory (e.g. ./project.toe.dir)")]
        target: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
