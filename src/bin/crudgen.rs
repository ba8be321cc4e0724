//! crudgen: CRUD method synthesis CLI
//!
//! # Usage
//!
//! ```bash
//! # Synthesize every relation
//! crudgen schema.json
//!
//! # One relation, as JSON
//! crudgen schema.toml --relation dbo.Order --format json
//!
//! # Operations only
//! crudgen plan schema.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use crudgen::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crudgen")]
#[command(version)]
#[command(about = "Synthesize CRUD methods from a relational schema", long_about = None)]
#[command(after_help = "EXAMPLES:
    crudgen schema.json
    crudgen schema.toml --relation dbo.Order --format json
    crudgen plan schema.json
    crudgen sql schema.json --relation Customer")]
struct Cli {
    /// Schema file (.json or .toml)
    schema: Option<PathBuf>,

    /// Settings file; defaults to ./crudgen.toml, then the user config
    #[arg(short, long, env = "CRUDGEN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Only this relation (plain or qualified name)
    #[arg(short, long, global = true)]
    relation: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List the operations each relation supports
    Plan {
        /// Schema file (.json or .toml)
        schema: PathBuf,
    },
    /// Print canonical statement text only
    Sql {
        /// Schema file (.json or .toml)
        schema: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "crudgen=debug" } else { "crudgen=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;

    match &cli.command {
        Some(Commands::Plan { schema }) => {
            let schema = load_schema(schema)?;
            show_plan(&schema, &settings, cli)
        }
        Some(Commands::Sql { schema }) => {
            let schema = load_schema(schema)?;
            let synth = Synthesizer::new(settings);
            for relation in select(&schema, cli.relation.as_deref())? {
                for method in synth.synthesize_relation(relation)?.methods {
                    println!("{};", method.body.sql);
                }
            }
            Ok(())
        }
        None => {
            let Some(path) = &cli.schema else {
                println!("{}", "crudgen: CRUD method synthesis".cyan().bold());
                println!();
                println!("Usage: crudgen <SCHEMA> [OPTIONS]");
                println!();
                println!("Try: crudgen --help");
                return Ok(());
            };
            let schema = load_schema(path)?;
            let synth = Synthesizer::new(settings);
            let output = select(&schema, cli.relation.as_deref())?
                .into_iter()
                .map(|relation| synth.synthesize_relation(relation))
                .collect::<CrudResult<Vec<_>>>()?;

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Table => output.iter().for_each(print_relation),
            }
            Ok(())
        }
    }
}

fn load_schema(path: &Path) -> Result<Schema> {
    Schema::from_file(path).with_context(|| format!("reading schema {}", path.display()))
}

fn select<'a>(schema: &'a Schema, only: Option<&str>) -> Result<Vec<Relation<'a>>> {
    match only {
        Some(name) => schema
            .relation(name)
            .map(|r| vec![r])
            .ok_or_else(|| anyhow!("no relation named {}", name)),
        None => Ok(schema.relations().collect()),
    }
}

fn show_plan(schema: &Schema, settings: &Settings, cli: &Cli) -> Result<()> {
    let synth = Synthesizer::new(settings.clone());
    let relations = select(schema, cli.relation.as_deref())?;

    if let OutputFormat::Json = cli.format {
        let plan: Vec<serde_json::Value> = relations
            .iter()
            .map(|r| {
                let kinds: Vec<OperationKind> = crudgen::planner::plan_relation(*r, settings.for_relation(r))
                    .iter()
                    .map(|op| op.kind)
                    .collect();
                serde_json::json!({ "relation": r.full_name(), "operations": kinds })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    for relation in relations {
        let effective = settings.for_relation(&relation);
        println!(
            "{} {} {}",
            format!("{:?}", relation.kind()).dimmed(),
            relation.full_name().white().bold(),
            format!("[{:?}, paging={}]", effective.render_strategy, effective.paging).dimmed()
        );
        for op in crudgen::planner::plan_relation(relation, effective) {
            let name = synth.naming().method_name(&op.relation, op.kind, op.unique);
            println!("  {:16} {}", op.kind.to_string().cyan(), name.yellow());
        }
    }
    Ok(())
}

fn print_relation(relation: &RelationMethods) {
    println!(
        "{} {} {}",
        "▸".cyan(),
        relation.relation.white().bold(),
        format!("({} methods)", relation.methods.len()).dimmed()
    );

    for method in &relation.methods {
        println!();
        if let Some(doc) = &method.doc {
            println!("  {}", format!("/// {}", doc).dimmed());
        }
        println!("  {}", signature(method).green());
        for line in &method.body.query.code {
            println!("      {}", line.white());
        }
        for binding in &method.body.bindings {
            let source = match &binding.source {
                ValueSource::Argument { name } => name.clone(),
                ValueSource::Entity { property } => format!("entity.{}", property),
            };
            let arrow = match binding.direction {
                Direction::Input => "←",
                Direction::Output => "→",
            };
            println!(
                "      {} {} {} {}",
                binding.name.cyan(),
                arrow,
                source.yellow(),
                format!("{:?}", binding.ty.db_type).dimmed()
            );
        }
        let steps: Vec<String> = method.body.contract.steps.iter().map(step_label).collect();
        println!("      {}", steps.join(" → ").dimmed());
    }
    println!();
}

fn step_label(step: &Step) -> String {
    match step {
        Step::AcquireConnection => "open".to_string(),
        Step::GenerateKey { property } => format!("new guid → {}", property),
        Step::Execute { call } => match call {
            ExecuteCall::QueryRows { .. } => "query rows".to_string(),
            ExecuteCall::QueryOptionalRow { .. } => "query first".to_string(),
            ExecuteCall::Execute => "execute".to_string(),
        },
        Step::WriteBackIdentity { property, binding, .. } => {
            format!("{} ← @{}", property, binding)
        }
        Step::ReleaseConnection => "close".to_string(),
    }
}

fn signature(method: &MethodDescriptor) -> String {
    let params: Vec<String> = method
        .parameters
        .iter()
        .map(|p| {
            let ty = match &p.ty {
                CallerType::Scalar { target, optional: true } => format!("Option<{}>", target),
                CallerType::Scalar { target, .. } => target.clone(),
                CallerType::Entity { name, mutable: true } => format!("&mut {}", name),
                CallerType::Entity { name, .. } => format!("&{}", name),
            };
            match &p.default {
                Some(DefaultValue::Int(n)) => format!("{}: {} = {}", p.name, ty, n),
                Some(DefaultValue::Null) => format!("{}: {} = None", p.name, ty),
                None => format!("{}: {}", p.name, ty),
            }
        })
        .collect();

    let returns = match &method.returns {
        ReturnShape::Rows { entity } => format!("Vec<{}>", entity),
        ReturnShape::OptionalRow { entity } => format!("Option<{}>", entity),
        ReturnShape::AffectedRows => "u64".to_string(),
    };

    format!("fn {}({}) -> {}", method.name, params.join(", "), returns)
}
