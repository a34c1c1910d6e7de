//! Viewbind CLI - resolve bindings and parse views from the terminal

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use parking_lot::Mutex;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use viewbind::view::is_truthy;
use viewbind::{
    ApplicabilityPlugin, Binding, BindingParser, BindingParserOptions, DataModel, FixSuggestion,
    JsonModel, SwitchPlugin, TemplatePlugin, ViewParser, ViewbindConfig, ViewbindError,
};

#[derive(Parser)]
#[command(name = "viewbind")]
#[command(about = "Viewbind - binding paths and view ASTs for data-bound content")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.config/viewbind/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a binding to its canonical path
    Resolve {
        /// Raw binding, e.g. 'items[name="x"].value'
        binding: String,

        /// JSON or YAML data file to resolve against
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Don't record query misses in the data
        #[arg(long)]
        read_only: bool,
    },

    /// Print the grammar AST of a binding
    Ast {
        binding: String,
    },

    /// Parse a JSON or YAML view and print its node tree
    View {
        file: PathBuf,

        /// Data used by templates and static switches
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = if cli.verbose {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Resolve {
            binding,
            data,
            read_only,
        } => resolve_binding(&config, &binding, data.as_deref(), read_only),
        Commands::Ast { binding } => print_ast(&config, &binding),
        Commands::View { file, data } => parse_view(&config, &file, data.as_deref()),
    });

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(suggestion) = e
            .downcast_ref::<ViewbindError>()
            .and_then(|err| err.fix_suggestion())
        {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ViewbindConfig> {
    let config = match path {
        Some(path) => ViewbindConfig::load(path)?,
        None => ViewbindConfig::load_default()?,
    };
    Ok(config)
}

fn load_model(data: Option<&Path>) -> anyhow::Result<Arc<JsonModel>> {
    let model = match data {
        Some(path) => JsonModel::load(path)
            .with_context(|| format!("loading data from {}", path.display()))?,
        None => JsonModel::new(Value::Object(Default::default())),
    };
    Ok(Arc::new(model))
}

/// Options reading the model, with expressions evaluated as dotted lookups
fn model_options(model: &Arc<JsonModel>) -> BindingParserOptions {
    let lookup = Arc::clone(model);
    BindingParserOptions::with_model(Arc::clone(model) as Arc<dyn DataModel>)
        .evaluate(move |expression| lookup.get(&Binding::from_dotted(expression.trim())))
}

fn resolve_binding(
    config: &ViewbindConfig,
    raw: &str,
    data: Option<&Path>,
    read_only: bool,
) -> anyhow::Result<()> {
    let model = load_model(data)?;
    let written: Arc<Mutex<Vec<(Binding, Value)>>> = Arc::default();

    let sink = Arc::clone(&written);
    let writer = Arc::clone(&model);
    let mut options = model_options(&model).set(move |transaction| {
        writer.set(transaction);
        sink.lock().extend_from_slice(transaction);
    });
    if read_only {
        options = options.read_only(true);
    }

    let parser = config.binding_parser(options);
    let binding = parser.parse(raw)?;

    println!("{} {}", "✓".green(), binding.as_str().bold());
    let value = model.get(&binding).unwrap_or(Value::Null);
    println!("  {} value: {}", "→".cyan(), value);

    for (target, value) in written.lock().iter() {
        println!("  {} set {} = {}", "→".cyan(), target, value);
    }

    Ok(())
}

fn print_ast(config: &ViewbindConfig, raw: &str) -> anyhow::Result<()> {
    let parser = config.binding_parser(BindingParserOptions::new());
    let ast = parser.parse_ast(raw)?;
    println!("{}", serde_json::to_string_pretty(&*ast)?);
    Ok(())
}

fn parse_view(config: &ViewbindConfig, file: &Path, data: Option<&Path>) -> anyhow::Result<()> {
    let content = read_document(file).with_context(|| format!("reading view {}", file.display()))?;
    let model = load_model(data)?;
    let bindings = Arc::new(config.binding_parser(model_options(&model).read_only(true)));

    let switch = {
        let model = Arc::clone(&model);
        let bindings = Arc::clone(&bindings);
        SwitchPlugin::new(move |case| evaluate_case(&bindings, model.as_ref(), case))
    };
    let template = TemplatePlugin::new(bindings, model as Arc<dyn DataModel>);

    let parser = ViewParser::new()
        .with_plugin(&ApplicabilityPlugin)
        .with_plugin(&switch)
        .with_plugin(&template);

    let ast = parser.parse_view_with(&content, &config.parse_object_options())?;
    println!("{}", serde_json::to_string_pretty(&ast.to_json())?);
    Ok(())
}

/// `true`/`false` as is, `"{{path}}"` by the truthiness of the data at path
fn evaluate_case(bindings: &BindingParser, model: &JsonModel, case: &Value) -> bool {
    let reference = case
        .as_str()
        .and_then(|s| s.trim().strip_prefix("{{"))
        .and_then(|s| s.strip_suffix("}}"));

    match reference {
        Some(path) => bindings
            .parse(path.trim())
            .ok()
            .and_then(|binding| model.get(&binding))
            .is_some_and(|value| is_truthy(&value)),
        None => is_truthy(case),
    }
}

fn read_document(path: &Path) -> Result<Value, ViewbindError> {
    let source = std::fs::read_to_string(path)?;
    let value = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&source)?,
        _ => serde_json::from_str(&source)?,
    };
    Ok(value)
}
