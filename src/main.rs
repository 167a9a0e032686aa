#![forbid(unsafe_code)]

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use ime_settings::capability::{probe_or_cpu_only, Capabilities};
use ime_settings::config::schema::{default_romaji_rows, symbol_default};
use ime_settings::config::validate::remove_row;
use ime_settings::config::{
    normalize, DictionaryEntry, General, NumpadInputMode, PunctuationStyle, RomajiRule, RomajiTable,
    Shortcuts, SliceName, SpaceInputMode, SymbolStyle, SymbolWidth, UserDictionary, ValidationFailure,
    WidthGroup, WidthGroups, WidthMode, Zenzai, ZenzaiBackend,
};
use ime_settings::ipc::{self, IpcStore, SettingsServer};
use ime_settings::{DocumentStore, EditError, FileStore, SyncEngine};

#[derive(Parser)]
#[command(name = "ime-settings")]
#[command(version)]
#[command(about = "Inspect and edit input method settings", long_about = None)]
struct Cli {
    /// Path to the settings document
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Path to the settings host socket
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Edit through a running `serve` process instead of the file
    #[arg(long, global = true)]
    remote: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every slice in canonical form
    Show,

    /// Print one slice in canonical form
    Get {
        slice: SliceName,
    },

    /// Apply JSON to a slice (objects patch, arrays replace)
    Set {
        slice: SliceName,
        json: String,
    },

    /// Toggle an input mode shortcut
    Shortcut {
        /// ctrl-space or alt-backquote
        name: String,
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    /// Set a character width group to half or full
    Width {
        group: String,
        mode: String,
    },

    /// Set whether a single symbol is typed full width
    Symbol {
        key: String,
        #[arg(action = ArgAction::Set)]
        fullwidth: bool,
    },

    /// Change general style options
    General(GeneralArgs),

    /// Manage the user dictionary
    Dict {
        #[command(subcommand)]
        command: DictCommand,
    },

    /// Manage the romaji table
    Romaji {
        #[command(subcommand)]
        command: RomajiCommand,
    },

    /// Configure the zenzai conversion model
    Zenzai {
        #[command(subcommand)]
        command: ZenzaiCommand,
    },

    /// Serve the settings document to other processes
    Serve {
        /// Report CUDA as available
        #[arg(long)]
        cuda: bool,

        /// Report Vulkan as available
        #[arg(long)]
        vulkan: bool,
    },
}

#[derive(Args)]
struct GeneralArgs {
    #[arg(long)]
    punctuation: Option<String>,

    #[arg(long)]
    symbol: Option<String>,

    #[arg(long)]
    space: Option<String>,

    #[arg(long)]
    numpad: Option<String>,
}

#[derive(Subcommand)]
enum DictCommand {
    /// List dictionary entries
    List,
    /// Add a word
    Add { reading: String, word: String },
    /// Remove a word
    Remove { reading: String, word: String },
}

#[derive(Subcommand)]
enum RomajiCommand {
    /// List romaji rules
    List,
    /// Append a rule
    Add {
        input: String,
        output: String,
        #[arg(default_value = "")]
        next_input: String,
    },
    /// Remove the rule at a position (as shown by `list`)
    Remove { index: usize },
    /// Restore the bundled table
    Reset,
}

#[derive(Subcommand)]
enum ZenzaiCommand {
    /// Turn the model on or off
    Enable {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    /// Set the conversion profile text
    Profile { text: String },
    /// Choose the acceleration backend
    Backend { backend: String },
    /// List backends this machine can run
    Backends,
}

fn parse_choice<T: Copy>(
    what: &str,
    text: &str,
    all: &[T],
    parse: fn(&str) -> Option<T>,
    name: fn(T) -> &'static str,
) -> Result<T> {
    match parse(text) {
        Some(value) => Ok(value),
        None => {
            let known: Vec<&str> = all.iter().map(|value| name(*value)).collect();
            bail!("unknown {what} '{text}' (expected one of: {})", known.join(", "))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to format output")?);
    Ok(())
}

/// Print validation failures one per line before surfacing the error
fn report<T>(result: Result<T, EditError>) -> Result<T> {
    if let Err(EditError::Rejected(failures)) = &result {
        for failure in failures {
            eprintln!("  {failure}");
        }
    }
    Ok(result?)
}

async fn execute<S: DocumentStore>(engine: &SyncEngine<S>, command: Command, probe: &IpcStore) -> Result<()> {
    match command {
        Command::Show => {
            let document = engine.refresh().await?;
            let mut slices = Map::new();
            for slice in SliceName::ALL {
                slices.insert(
                    slice.to_string(),
                    normalize(slice, document.slice(slice)),
                );
            }
            print_json(&slices)?;
        }

        Command::Get { slice } => print_json(&engine.read_raw(slice).await?)?,

        Command::Set { slice, json } => {
            let raw: Value = serde_json::from_str(&json).context("Failed to parse JSON argument")?;
            print_json(&report(engine.edit_raw(slice, raw).await)?)?;
        }

        Command::Shortcut { name, enabled } => {
            let shortcuts = match name.as_str() {
                "ctrl-space" => engine.edit::<Shortcuts, _>(move |s| s.ctrl_space_toggle = enabled).await?,
                "alt-backquote" => engine.edit::<Shortcuts, _>(move |s| s.alt_backquote_toggle = enabled).await?,
                other => bail!("unknown shortcut '{other}' (expected ctrl-space or alt-backquote)"),
            };
            print_json(&shortcuts)?;
        }

        Command::Width { group, mode } => {
            let group = parse_choice("width group", &group, &WidthGroup::ALL, WidthGroup::parse, WidthGroup::as_str)?;
            let mode = parse_choice("width mode", &mode, &WidthMode::ALL, WidthMode::parse, WidthMode::as_str)?;
            let groups = engine.edit::<WidthGroups, _>(move |groups| groups.set(group, mode)).await?;
            print_json(&groups)?;
        }

        Command::Symbol { key, fullwidth } => {
            if symbol_default(&key).is_none() {
                bail!("unknown symbol key '{key}'");
            }
            let symbols = engine
                .edit::<SymbolWidth, _>(move |symbols| {
                    symbols.set(&key, fullwidth);
                })
                .await?;
            print_json(&symbols)?;
        }

        Command::General(args) => {
            let punctuation = args
                .punctuation
                .map(|text| {
                    parse_choice(
                        "punctuation style",
                        &text,
                        PunctuationStyle::ALL,
                        PunctuationStyle::parse,
                        PunctuationStyle::as_str,
                    )
                })
                .transpose()?;
            let symbol = args
                .symbol
                .map(|text| parse_choice("symbol style", &text, SymbolStyle::ALL, SymbolStyle::parse, SymbolStyle::as_str))
                .transpose()?;
            let space = args
                .space
                .map(|text| {
                    parse_choice("space input", &text, SpaceInputMode::ALL, SpaceInputMode::parse, SpaceInputMode::as_str)
                })
                .transpose()?;
            let numpad = args
                .numpad
                .map(|text| {
                    parse_choice("numpad input", &text, NumpadInputMode::ALL, NumpadInputMode::parse, NumpadInputMode::as_str)
                })
                .transpose()?;

            let general = engine
                .edit::<General, _>(move |general| {
                    if let Some(value) = punctuation {
                        general.punctuation_style = value;
                    }
                    if let Some(value) = symbol {
                        general.symbol_style = value;
                    }
                    if let Some(value) = space {
                        general.space_input = value;
                    }
                    if let Some(value) = numpad {
                        general.numpad_input = value;
                    }
                })
                .await?;
            print_json(&general)?;
        }

        Command::Dict { command } => match command {
            DictCommand::List => print_json(&engine.read::<UserDictionary>().await?)?,
            DictCommand::Add { reading, word } => {
                let result = engine
                    .edit::<UserDictionary, _>(move |entries| entries.push(DictionaryEntry::new(&reading, &word)))
                    .await;
                print_json(&report(result)?)?;
            }
            DictCommand::Remove { reading, word } => {
                let target = DictionaryEntry::new(reading.trim(), word.trim());
                let result = engine
                    .try_edit::<UserDictionary, _>(move |entries| match entries.iter().position(|entry| *entry == target) {
                        Some(index) => remove_row(entries, index).map(drop),
                        None => Err(vec![ValidationFailure::malformed(
                            None,
                            format!("no dictionary entry {} -> {}", target.reading, target.word),
                        )]),
                    })
                    .await;
                print_json(&report(result)?)?;
            }
        },

        Command::Romaji { command } => match command {
            RomajiCommand::List => {
                for (index, rule) in engine.read::<RomajiTable>().await?.iter().enumerate() {
                    println!("{index:>4}  {}\t{}\t{}", rule.input, rule.output, rule.next_input);
                }
            }
            RomajiCommand::Add { input, output, next_input } => {
                let result = engine
                    .edit::<RomajiTable, _>(move |rows| rows.push(RomajiRule::new(&input, &output, &next_input)))
                    .await;
                let rows = report(result)?;
                info!(rows = rows.len(), "romaji rule added");
            }
            RomajiCommand::Remove { index } => {
                let result = engine
                    .try_edit::<RomajiTable, _>(move |rows| remove_row(rows, index).map(drop))
                    .await;
                let rows = report(result)?;
                info!(rows = rows.len(), "romaji rule removed");
            }
            RomajiCommand::Reset => {
                let rows = report(engine.replace::<RomajiTable>(default_romaji_rows()).await)?;
                info!(rows = rows.len(), "romaji table reset");
            }
        },

        Command::Zenzai { command } => match command {
            ZenzaiCommand::Enable { enabled } => {
                print_json(&engine.edit::<Zenzai, _>(move |zenzai| zenzai.enable = enabled).await?)?;
            }
            ZenzaiCommand::Profile { text } => {
                print_json(&engine.edit::<Zenzai, _>(move |zenzai| zenzai.profile = text).await?)?;
            }
            ZenzaiCommand::Backend { backend } => {
                let backend = parse_choice("backend", &backend, ZenzaiBackend::ALL, ZenzaiBackend::parse, ZenzaiBackend::as_str)?;
                let capabilities = probe_or_cpu_only(probe).await;
                if !capabilities.supports(backend) {
                    bail!("backend '{backend}' is not available on this machine");
                }
                print_json(&engine.edit::<Zenzai, _>(move |zenzai| zenzai.backend = backend).await?)?;
            }
            ZenzaiCommand::Backends => {
                let capabilities = probe_or_cpu_only(probe).await;
                for backend in capabilities.selectable_backends() {
                    println!("{backend}");
                }
            }
        },

        Command::Serve { .. } => bail!("serve does not take an editing engine"),
    }

    Ok(())
}

async fn serve(store: FileStore, socket: PathBuf, capabilities: Capabilities) -> Result<()> {
    let server = SettingsServer::bind_to(socket)?;
    info!(socket = ?server.path(), capabilities = ?capabilities, "serving settings");
    tokio::task::spawn_blocking(move || ipc::run_host(&server, &store, capabilities))
        .await
        .context("Settings host thread panicked")?
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let store = FileStore::new(cli.config.unwrap_or_else(FileStore::default_path));
    let socket = match cli.socket {
        Some(path) => path,
        None => ipc::default_socket_path()?,
    };

    if let Command::Serve { cuda, vulkan } = cli.command {
        let capabilities = Capabilities {
            cpu: true,
            cuda,
            vulkan,
        };
        return serve(store, socket, capabilities).await;
    }

    let probe = IpcStore::new(socket.clone());
    if cli.remote {
        info!(socket = ?socket, "editing through settings host");
        execute(&SyncEngine::new(IpcStore::new(socket)), cli.command, &probe).await
    } else {
        info!(path = ?store.path(), "editing settings file");
        execute(&SyncEngine::new(store), cli.command, &probe).await
    }
}
