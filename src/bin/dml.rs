//! dml: preview placeholder expansion, interpolation and named rewriting
//!
//! # Usage
//!
//! ```bash
//! # Expand a list bound to a single placeholder
//! dml expand 'SELECT * FROM t WHERE id IN ?' --arg ints:1,2,3
//!
//! # Embed values as literals
//! dml interpolate 'SELECT * FROM t WHERE name = ?' --arg "str:O'Brien"
//!
//! # Rewrite :name placeholders
//! dml named 'SELECT * FROM t WHERE a = :a AND b = ?' --arg a=int:1 --arg int:2
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use dml::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dml")]
#[command(version)]
#[command(about = "Preview how dml binds, expands and interpolates SQL", long_about = None)]
#[command(after_help = "ARGUMENTS:
    --arg [name=]type:value
    types: int uint float bool str bytes(hex) time null ints uints floats strs

EXAMPLES:
    dml expand 'SELECT * FROM t WHERE id IN ?' --arg ints:1,2,3
    dml interpolate 'SELECT * FROM t WHERE name = ?' --arg \"str:O'Brien\"
    dml named 'SELECT * FROM t WHERE a = :a' --arg a=int:1")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "DML_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite placeholders bound to lists into one placeholder per element
    Expand {
        sql: String,
        #[arg(short, long = "arg")]
        args: Vec<String>,
    },
    /// Embed the arguments into the SQL as literals
    Interpolate {
        sql: String,
        #[arg(short, long = "arg")]
        args: Vec<String>,
    },
    /// Rewrite :name placeholders to ? and show the bound values
    Named {
        sql: String,
        #[arg(short, long = "arg")]
        args: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => DmlConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DmlConfig::load().context("loading configuration")?,
    };

    if let Err(e) = run(&cli, &config) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli, config: &DmlConfig) -> Result<()> {
    let (sql, raw_args, options) = match &cli.command {
        Commands::Expand { sql, args } => (sql, args, BindOptions {
            expand_placeholders: true,
            ..config.bind
        }),
        Commands::Interpolate { sql, args } => (sql, args, BindOptions {
            interpolate: true,
            ..config.bind
        }),
        Commands::Named { sql, args } => (sql, args, BindOptions {
            interpolate: false,
            ..config.bind
        }),
    };

    let args = raw_args
        .iter()
        .map(|a| parse_arg(a))
        .collect::<Result<Arguments>>()?;

    let mut stmt = Raw::new(sql.as_str())
        .with_id("cli")
        .with_options(config.builder);
    let mut bound = stmt.bind()?.with_options(options).arguments(&args);
    let (out, values) = bound.prepare()?;

    match cli.format {
        OutputFormat::Text => print_text(&out, &values),
        OutputFormat::Json => print_json(&out, &values)?,
    }
    Ok(())
}

fn print_text(sql: &str, values: &[Value]) {
    println!("{}", "SQL:".green().bold());
    println!("{}", sql.white());
    if !values.is_empty() {
        println!();
        println!("{}", "Arguments:".cyan());
        for (i, v) in values.iter().enumerate() {
            println!("  {} = {} {}", i + 1, v.to_string().yellow(), v.type_name().dimmed());
        }
    }
}

fn to_json(v: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    if v.is_list() {
        return Json::Array((0..v.arity()).filter_map(|i| v.element(i)).map(|e| to_json(&e)).collect());
    }
    match v {
        Value::Null => Json::Null,
        Value::Int(n) => Json::from(*n),
        Value::Uint(n) => Json::from(*n),
        Value::Float(f) => Json::from(*f),
        Value::Bool(b) => Json::Bool(*b),
        Value::String(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::String(hex::encode(b)),
        Value::Time(t) => Json::String(t.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        other => Json::String(other.to_string()),
    }
}

fn print_json(sql: &str, values: &[Value]) -> Result<()> {
    let out = serde_json::json!({
        "sql": sql,
        "args": values.iter().map(to_json).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|p| !p.is_empty())
}

fn parse_time(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .with_context(|| format!("invalid time {s:?}, expected YYYY-MM-DD HH:MM:SS"))
}

/// Parse `[name=]type:value`.
fn parse_arg(spec: &str) -> Result<Argument> {
    let (typ, raw) = spec
        .split_once(':')
        .with_context(|| format!("argument {spec:?} is not [name=]type:value"))?;
    let (name, typ) = match typ.split_once('=') {
        Some((name, typ)) => (Some(name), typ),
        None => (None, typ),
    };
    let value = match typ {
        "int" => Value::Int(raw.trim().parse()?),
        "uint" => Value::Uint(raw.trim().parse()?),
        "float" => Value::Float(raw.trim().parse()?),
        "bool" => Value::Bool(matches!(raw.trim(), "1" | "true")),
        "str" => Value::String(raw.to_string()),
        "bytes" => Value::Bytes(hex::decode(raw.trim())?),
        "time" => Value::Time(parse_time(raw.trim())?),
        "null" => Value::Null,
        "ints" => Value::Ints(split_list(raw).map(str::parse).collect::<Result<_, _>>()?),
        "uints" => Value::Uints(split_list(raw).map(str::parse).collect::<Result<_, _>>()?),
        "floats" => Value::Floats(split_list(raw).map(str::parse).collect::<Result<_, _>>()?),
        "strs" => Value::Strings(raw.split(',').map(str::to_string).collect()),
        other => bail!("unknown argument type {other:?}"),
    };
    Ok(match name {
        Some(name) => Argument::named(name, value),
        None => Argument::new(value),
    })
}
