// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Command-line interface for remapper definitions
//!
//! Definitions, data and context may be given as file paths (JSON, or YAML
//! for `.yaml`/`.yml`), as inline JSON, or as `-` to read from stdin.

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use remapper::{EngineConfig, OperatorCategory, OperatorResolution, RemapperEngine, RemapperError};
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "remapper")]
#[command(about = "Compile and evaluate JSON remapper definitions")]
#[command(version)]
#[command(author = "OctoFHIR Team <funyloony@gmail.com>")]
struct Cli {
    /// Engine configuration file (JSON or YAML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<String>,
    /// Treat unknown single-key objects as literals instead of failing
    #[arg(long, global = true)]
    lenient: bool,
    /// Maximum nesting depth accepted in definitions
    #[arg(long, value_name = "DEPTH", global = true)]
    max_depth: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a definition against input data
    Eval {
        /// Definition file, inline JSON, or - for stdin
        definition: String,
        /// Input data as inline JSON (including scalars such as 5 or null), a file, or - for
        /// stdin (defaults to null)
        #[arg(short, long)]
        data: Option<String>,
        /// Context variables as a JSON or YAML object
        #[arg(short, long)]
        context: Option<String>,
        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },
    /// Compile a definition and report errors without evaluating it
    Check {
        /// Definition file, inline JSON, or - for stdin
        definition: String,
    },
    /// List the available operators
    Operators {
        /// Only list operators of this category (path, string, logic, array, ...)
        #[arg(long)]
        category: Option<String>,
        /// Show full help for a single operator
        #[arg(long, value_name = "NAME", conflicts_with = "category")]
        describe: Option<String>,
    },
}

fn main() {
    human_panic::setup_panic!();
    env_logger::init();

    let cli = Cli::parse();
    let engine = match build_engine(&cli) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    };

    let outcome = match cli.command {
        Commands::Eval {
            ref definition,
            ref data,
            ref context,
            pretty,
        } => handle_eval(&engine, definition, data.as_deref(), context.as_deref(), pretty),
        Commands::Check { ref definition } => handle_check(&engine, definition),
        Commands::Operators {
            ref category,
            ref describe,
        } => handle_operators(&engine, category.as_deref(), describe.as_deref()),
    };

    if let Err(e) = outcome {
        eprintln!("❌ {e:#}");
        if let Some(remapper_error) = e.downcast_ref::<RemapperError>() {
            eprintln!("   help: {}", remapper_error.error_info().help);
        }
        process::exit(1);
    }
}

fn build_engine(cli: &Cli) -> Result<RemapperEngine> {
    let mut config = match &cli.config {
        Some(source) => serde_json::from_value::<EngineConfig>(load_document(source, "config")?)
            .with_context(|| format!("invalid engine configuration in '{source}'"))?,
        None => EngineConfig::new(),
    };
    if cli.lenient {
        config = config.with_operator_resolution(OperatorResolution::Lenient);
    }
    if let Some(depth) = cli.max_depth {
        config = config.with_max_definition_depth(depth);
    }
    log::debug!("engine configuration: {config:?}");
    Ok(RemapperEngine::new().with_config(config))
}

/// Read a document from an inline JSON value, stdin or a file
///
/// Anything that parses as JSON (`5`, `null`, `{"a": 1}`) is taken inline;
/// other sources are file paths.
fn load_document(source: &str, what: &str) -> Result<Value> {
    if source != "-" {
        if let Ok(value) = serde_json::from_str(source) {
            return Ok(value);
        }
        let trimmed = source.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') || trimmed.starts_with('"') {
            return serde_json::from_str(source)
                .with_context(|| format!("invalid inline {what} JSON"));
        }
    }

    let (content, yaml) = if source == "-" {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .with_context(|| format!("failed to read {what} from stdin"))?;
        (content, false)
    } else {
        let path = Path::new(source);
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {what} file '{source}'"))?;
        let yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        );
        (content, yaml)
    };

    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    if yaml {
        serde_yaml::from_str(&content).with_context(|| format!("invalid {what} YAML in '{source}'"))
    } else {
        serde_json::from_str(&content).with_context(|| format!("invalid {what} JSON in '{source}'"))
    }
}

fn handle_eval(
    engine: &RemapperEngine,
    definition: &str,
    data: Option<&str>,
    context: Option<&str>,
    pretty: bool,
) -> Result<()> {
    if definition == "-" && (data == Some("-") || context == Some("-")) {
        bail!("only one of definition, data and context can be read from stdin");
    }

    let definition = load_document(definition, "definition")?;
    let data = match data {
        Some(source) => load_document(source, "data")?,
        None => Value::Null,
    };
    let variables = match context {
        Some(source) => match load_document(source, "context")? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => bail!("context must be an object, got {other}"),
        },
        None => Map::new(),
    };

    let mapper = engine.compile(&definition)?;
    let result = mapper.evaluate(&data, &variables)?;

    let output = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{output}");
    Ok(())
}

fn handle_check(engine: &RemapperEngine, definition: &str) -> Result<()> {
    let definition = load_document(definition, "definition")?;
    let node = engine.parse(&definition)?;
    engine.compile(&definition)?;
    println!("ok ({} operators)", node.operator_count());
    Ok(())
}

fn handle_operators(
    engine: &RemapperEngine,
    category: Option<&str>,
    describe: Option<&str>,
) -> Result<()> {
    let registry = engine.registry();

    if let Some(name) = describe {
        match registry.operator_help(name) {
            Some(help) => println!("{help}"),
            None => bail!("unknown operator '{name}'"),
        }
        return Ok(());
    }

    let operators = match category {
        Some(category) => {
            let category: OperatorCategory = category.parse().map_err(anyhow::Error::msg)?;
            registry.list_operators_by_category(category)
        }
        None => registry.list_operators(),
    };

    let width = operators.iter().map(|op| op.name.len()).max().unwrap_or(0);
    for op in operators {
        println!("{:width$}  [{}] {}", op.name, op.category, op.description);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inline_documents() {
        assert_eq!(load_document("5", "data").unwrap(), json!(5));
        assert_eq!(load_document("true", "data").unwrap(), json!(true));
        assert_eq!(load_document("null", "data").unwrap(), json!(null));
        assert_eq!(load_document(" {\"a\": [1]}", "data").unwrap(), json!({"a": [1]}));
        assert_eq!(load_document("\"text\"", "data").unwrap(), json!("text"));
    }

    #[test]
    fn test_non_json_sources_are_paths() {
        let err = load_document("no-such-file.json", "data").unwrap_err();
        assert!(err.to_string().contains("failed to read data file"), "{err}");

        let err = load_document("{\"a\":", "data").unwrap_err();
        assert!(err.to_string().contains("invalid inline data JSON"), "{err}");
    }

    #[test]
    fn test_documents_from_files() {
        let dir = std::env::temp_dir().join(format!("remapper-cli-{}", process::id()));
        fs::create_dir_all(&dir).unwrap();

        let yaml = dir.join("definition.yaml");
        fs::write(&yaml, "prop: name\n").unwrap();
        let empty = dir.join("empty.json");
        fs::write(&empty, "  \n").unwrap();

        let loaded = load_document(yaml.to_str().unwrap(), "definition").unwrap();
        assert_eq!(loaded, json!({"prop": "name"}));
        assert_eq!(load_document(empty.to_str().unwrap(), "data").unwrap(), json!(null));

        fs::remove_dir_all(&dir).unwrap();
    }
}
