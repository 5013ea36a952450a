use clap::{Parser, Subcommand, ValueEnum};
use outline_edit::{
    EditorState, ListCommand, ListTypes, ModelError, Node, Schema, SchemaError, SchemaSpec,
    Selection, StateError, Step, Transaction, insert_tab, start_bullet_list,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log why commands do not apply
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs an editing command on a JSON document
    Apply {
        command: EditCommand,
        #[arg(long)]
        doc: PathBuf,
        #[arg(long)]
        anchor: usize,
        /// Defaults to the anchor (a cursor)
        #[arg(long)]
        head: Option<usize>,
        /// JSON schema definition; the outline schema when omitted
        #[arg(long)]
        schema: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Validates a JSON document against the schema
    Check {
        #[arg(long)]
        doc: PathBuf,
        #[arg(long)]
        schema: Option<PathBuf>,
    },
    /// Prints the ancestors of a position
    Resolve {
        #[arg(long)]
        doc: PathBuf,
        #[arg(long)]
        pos: usize,
        #[arg(long)]
        schema: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EditCommand {
    Wrap,
    Lift,
    Sink,
    Split,
    StartList,
    Tab,
}

impl EditCommand {
    fn run(self, state: &EditorState, types: &ListTypes) -> Option<Transaction> {
        match self {
            EditCommand::Wrap => ListCommand::WrapInList.run_with(state, types),
            EditCommand::Lift => ListCommand::LiftListItem.run_with(state, types),
            EditCommand::Sink => ListCommand::SinkListItem.run_with(state, types),
            EditCommand::Split => ListCommand::SplitListItem.run_with(state, types),
            EditCommand::StartList => start_bullet_list(state, types),
            EditCommand::Tab => insert_tab(state, types),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("cannot render output: {0}")]
    Render(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct ApplyOutput {
    doc: serde_json::Value,
    selection: Selection,
    steps: Vec<serde_json::Value>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Apply {
            command,
            doc,
            anchor,
            head,
            schema,
            json,
        } => {
            let selection = Selection::new(anchor, head.unwrap_or(anchor));
            apply_command(command, &doc, selection, schema.as_deref(), json)
        }
        Commands::Check { doc, schema } => check_command(&doc, schema.as_deref()),
        Commands::Resolve { doc, pos, schema } => resolve_command(&doc, pos, schema.as_deref()),
    };
    result.unwrap_or_else(|err| {
        error!(%err, "command failed");
        eprintln!("Error: {err}");
        ExitCode::from(2)
    })
}

fn setup_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("outline_edit=debug,warn")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json(path: &Path) -> Result<serde_json::Value, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn load_schema(path: Option<&Path>) -> Result<Schema, CliError> {
    let Some(path) = path else {
        return Ok(Schema::outline());
    };
    let value = read_json(path)?;
    let spec: SchemaSpec = serde_json::from_value(value).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Schema::new(spec)?)
}

fn apply_command(
    command: EditCommand,
    doc: &Path,
    selection: Selection,
    schema: Option<&Path>,
    json: bool,
) -> Result<ExitCode, CliError> {
    let schema = load_schema(schema)?;
    let doc = Node::from_json(&schema, &read_json(doc)?)?;
    let state = EditorState::new(doc, selection)?;
    let Some(tr) = command.run(&state, &ListTypes::default()) else {
        eprintln!("Not applicable: {command:?} at {}..{}", selection.anchor, selection.head);
        return Ok(ExitCode::from(1));
    };
    debug!(?command, steps = tr.steps().len(), "command applied");
    let next = state.apply(&tr)?;

    if json {
        let output = ApplyOutput {
            doc: next.doc().to_json(),
            selection: next.selection(),
            steps: tr.steps().iter().map(Step::to_json).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", next.doc());
        let selection = next.selection();
        println!("selection: {} {}", selection.anchor, selection.head);
    }
    Ok(ExitCode::SUCCESS)
}

fn check_command(doc: &Path, schema: Option<&Path>) -> Result<ExitCode, CliError> {
    let schema = load_schema(schema)?;
    let value = read_json(doc)?;
    match Node::from_json(&schema, &value).and_then(|node| node.check().map(|()| node)) {
        Ok(node) => {
            println!("Valid: {} positions", node.content_size());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            println!("Invalid: {err}");
            Ok(ExitCode::from(1))
        }
    }
}

fn resolve_command(doc: &Path, pos: usize, schema: Option<&Path>) -> Result<ExitCode, CliError> {
    let schema = load_schema(schema)?;
    let doc = Node::from_json(&schema, &read_json(doc)?)?;
    let rpos = doc.resolve(pos)?;
    println!(
        "pos {} depth {} offset {}",
        rpos.pos(),
        rpos.depth(),
        rpos.parent_offset()
    );
    for depth in 0..=rpos.depth() {
        println!(
            "{depth} {} index {} start {} end {}",
            rpos.node(depth).ty().name(),
            rpos.index(depth),
            rpos.start(depth),
            rpos.end(depth)
        );
    }
    Ok(ExitCode::SUCCESS)
}
