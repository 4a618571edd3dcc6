use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::Command;

/// Library crates, by their short names.
const CRATES: &[&str] = &[
    "common",
    "spatial",
    "animation",
    "render",
    "input",
    "physics",
    "kernel",
    "assets",
    "tools",
];

const REPORT_PATH: &str = "target/vista-report.json";

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for vista")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// fmt, clippy, tests and docs, stopping at the first failure
    Check,
    /// Check formatting, or rewrite it with --fix
    Fmt {
        #[arg(long)]
        fix: bool,
    },
    /// Clippy with warnings denied
    Clippy,
    /// Run tests for the workspace or one crate (`kernel` or `vista-kernel`)
    Test { krate: Option<String> },
    /// Run the octree benchmark
    Bench,
    /// Render the demo scene headless and write the inspector report
    Demo {
        #[arg(short, long, default_value = "120")]
        frames: u32,
        #[arg(long)]
        physics: bool,
    },
    /// Build rustdoc for the library crates
    Doc {
        #[arg(long)]
        open: bool,
    },
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Check => {
            cargo("fmt check", &["fmt", "--all", "--", "--check"])?;
            clippy()?;
            cargo("tests", &["test", "--workspace"])?;
            doc(false)?;
        }
        Commands::Fmt { fix } => {
            if fix {
                cargo("fmt", &["fmt", "--all"])?;
            } else {
                cargo("fmt check", &["fmt", "--all", "--", "--check"])?;
            }
        }
        Commands::Clippy => clippy()?,
        Commands::Test { krate: None } => cargo("tests", &["test", "--workspace"])?,
        Commands::Test { krate: Some(name) } => {
            let package = package_name(&name)?;
            cargo(&format!("tests ({package})"), &["test", "-p", package.as_str()])?;
        }
        Commands::Bench => cargo(
            "octree bench",
            &["bench", "-p", "vista-spatial", "--bench", "bench_octree"],
        )?,
        Commands::Demo { frames, physics } => {
            let frames = frames.to_string();
            let mut args = vec![
                "run", "--release", "-p", "vista-cli", "--", "run", "--frames", frames.as_str(),
                "--report", REPORT_PATH,
            ];
            if physics {
                args.push("--physics");
            }
            cargo("headless demo", &args)?;
            println!("report: {REPORT_PATH}");
        }
        Commands::Doc { open } => doc(open)?,
    }
    Ok(())
}

fn clippy() -> Result<()> {
    cargo(
        "clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

fn doc(open: bool) -> Result<()> {
    let packages: Vec<String> = CRATES.iter().map(|c| format!("vista-{c}")).collect();
    let mut args = vec!["doc", "--no-deps"];
    for package in &packages {
        args.extend(["-p", package.as_str()]);
    }
    if open {
        args.push("--open");
    }
    cargo("rustdoc", &args)
}

/// Run cargo (honouring `$CARGO`) and fail on a non-zero exit.
fn cargo(label: &str, args: &[&str]) -> Result<()> {
    println!("==> {label}: cargo {}", args.join(" "));
    let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());
    let status = Command::new(&cargo)
        .args(args)
        .status()
        .with_context(|| format!("spawning {cargo}"))?;
    if !status.success() {
        anyhow::bail!("{label} failed ({status})");
    }
    Ok(())
}

/// Accept `kernel`, `vista-kernel`, `vista-cli` or `xtask`.
fn package_name(name: &str) -> Result<String> {
    let short = name.strip_prefix("vista-").unwrap_or(name);
    match short {
        "cli" => Ok("vista-cli".to_string()),
        "xtask" => Ok("xtask".to_string()),
        _ if CRATES.contains(&short) => Ok(format!("vista-{short}")),
        _ => anyhow::bail!("unknown crate `{name}`; expected one of {}", CRATES.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_names_resolve() {
        assert_eq!(package_name("kernel").unwrap(), "vista-kernel");
        assert_eq!(package_name("vista-spatial").unwrap(), "vista-spatial");
        assert_eq!(package_name("cli").unwrap(), "vista-cli");
        assert_eq!(package_name("xtask").unwrap(), "xtask");
        assert!(package_name("ecs").is_err());
    }
}
