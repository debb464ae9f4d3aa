use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use covenant_ast::Specification;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "covenant")]
#[command(about = "Covenant - protocol state machine to Solidity contract compiler")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate contract source from a validated specification
    Compile {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long)]
        verbose: bool,
    },

    /// Summarize the states, fields, and transitions of a specification
    Inspect {
        input: PathBuf,

        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            input,
            output,
            verbose,
        } => cmd_compile(input, output, verbose),
        Commands::Inspect { input, verbose } => cmd_inspect(input, verbose),
    }
}

fn init_tracing(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter("covenant_codegen=trace,covenant=debug")
            .init();
    }
}

fn load_specification(path: &Path) -> Result<Specification> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading specification from {}", path.display()))?;
    let spec: Specification = serde_json::from_str(&text)
        .with_context(|| format!("parsing specification {}", path.display()))?;
    Ok(spec)
}

fn cmd_compile(input: PathBuf, output: Option<PathBuf>, verbose: bool) -> Result<()> {
    init_tracing(verbose);

    let spec = load_specification(&input)?;
    let source = covenant_codegen::generate(&spec)
        .with_context(|| format!("generating contract for '{}'", spec.name))?;

    match output {
        Some(path) => {
            fs::write(&path, &source)
                .with_context(|| format!("writing contract to {}", path.display()))?;
            println!(
                "{} {} -> {}",
                "Generated".green().bold(),
                spec.name,
                path.display()
            );
        }
        None => print!("{}", source),
    }
    Ok(())
}

fn cmd_inspect(input: PathBuf, verbose: bool) -> Result<()> {
    init_tracing(verbose);

    let spec = load_specification(&input)?;
    let machine = &spec.machine;

    println!("{} {}", "Specification:".cyan().bold(), spec.name);
    if let Some(description) = &spec.metadata.description {
        println!("  {}", description);
    }

    println!("{}", "States:".cyan().bold());
    for state in &machine.states {
        println!("  {}", state);
    }

    println!("{}", "Fields:".cyan().bold());
    for field in &machine.fields {
        println!("  {}: {}", field.name, field.ty);
    }

    println!("{}", "Transitions:".cyan().bold());
    for transition in &machine.transitions {
        let origin = transition.origin.as_deref().unwrap_or("*");
        let marker = if transition.auto { " [auto]" } else { "" };
        println!(
            "  {}: {} -> {}{}",
            transition.name, origin, transition.destination, marker
        );
    }
    Ok(())
}
