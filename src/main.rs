//! Purpose: `bloglist` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Errors are emitted as a JSON envelope on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All collection mutations go through `api::BlogStore` (lock + atomic rewrite).

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::aot::Shell;
use serde_json::{Value, json};

mod serve;

use bloglist::api::{BlogEntry, BlogStore, EntryId, Error, ErrorKind, normalize, to_exit_code};

const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

fn main() {
    let exit_code = match run() {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<i32, Error> {
    let cli = Cli::parse();
    let store_path = cli.store.unwrap_or_else(default_store_path);

    match cli.command {
        Command::Serve(args) => {
            let config = serve_config_from_args(args, store_path)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start async runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(0)
        }
        Command::List { json } => {
            let store = BlogStore::open(&store_path)?;
            if json {
                println!("{}", encode_pretty(&store.list())?);
            } else {
                emit_list_human(store.list());
            }
            Ok(0)
        }
        Command::Add {
            title,
            author,
            url,
            likes,
            json,
        } => {
            let candidate = match likes {
                Some(likes) => json!({ "title": title, "author": author, "url": url, "likes": likes }),
                None => json!({ "title": title, "author": author, "url": url }),
            };
            let fields = normalize(&candidate)?;
            let mut store = BlogStore::open(&store_path)?;
            let entry = store.insert(fields)?;
            if json {
                println!("{}", encode_pretty(&entry)?);
            } else {
                println!("added {} \"{}\" by {}", entry.id, entry.title, entry.author);
            }
            Ok(0)
        }
        Command::Remove { ids } => {
            let ids = ids
                .iter()
                .map(|raw| raw.parse::<EntryId>())
                .collect::<Result<Vec<_>, _>>()?;
            let mut store = BlogStore::open(&store_path)?;
            for id in ids {
                if store.remove(id)? {
                    println!("removed {id}");
                } else {
                    println!("{id} was not present");
                }
            }
            Ok(0)
        }
        Command::Version => {
            println!(
                "{}",
                json!({ "name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION") })
            );
            Ok(0)
        }
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "bloglist", &mut io::stdout());
            Ok(0)
        }
    }
}

#[derive(Parser)]
#[command(
    name = "bloglist",
    version,
    about = "File-backed blog entry collection served over HTTP",
    after_help = r#"EXAMPLES
  $ bloglist add "Canonical string reduction" "Edsger W. Dijkstra" http://example.com/csr --likes 12
  $ bloglist list
  $ bloglist serve --bind 127.0.0.1:3003
  $ curl -s http://127.0.0.1:3003/blogs | jq

NOTES
  - Default store: ~/.bloglist/entries.json (override with --store)"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        help = "Store file for the blog collection (default: ~/.bloglist/entries.json)",
        value_hint = ValueHint::FilePath
    )]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Serve the collection over HTTP (loopback default)",
        after_help = r#"EXAMPLES
  $ bloglist serve
  $ bloglist serve --bind 127.0.0.1:3003 --cors-origin https://app.example.com

NOTES
  - Non-loopback binds require --allow-non-loopback
  - Use repeatable --cors-origin to allow browser clients from specific origins"#
    )]
    Serve(ServeRunArgs),
    #[command(about = "List stored entries")]
    List {
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Validate and add one entry",
        after_help = r#"EXAMPLES
  $ bloglist add "Canonical string reduction" "Edsger W. Dijkstra" http://example.com/csr
  $ bloglist add "Go To Statement Considered Harmful" "Edsger W. Dijkstra" http://example.com/goto --likes 5"#
    )]
    Add {
        #[arg(help = "Entry title (must not be empty)")]
        title: String,
        #[arg(help = "Entry author (must not be empty)")]
        author: String,
        #[arg(help = "Entry url")]
        url: String,
        #[arg(long, help = "Initial like count (default: 0)")]
        likes: Option<u64>,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Remove entries by id",
        after_help = r#"NOTES
  - Removal is idempotent: ids that are not present are reported, not errors.
  - Malformed ids are rejected before the store is touched."#
    )]
    Remove {
        #[arg(required = true, help = "Entry id(s) from list output")]
        ids: Vec<String>,
    },
    #[command(about = "Print version info as JSON")]
    Version,
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

#[derive(Args)]
struct ServeRunArgs {
    #[arg(long, default_value = "127.0.0.1:3003", help = "Bind address")]
    bind: String,
    #[arg(
        long,
        help = "Allow non-loopback binds",
        help_heading = "Safety"
    )]
    allow_non_loopback: bool,
    #[arg(
        long = "cors-origin",
        value_name = "ORIGIN",
        help = "Allow browser requests from this origin (repeatable, explicit list)",
        help_heading = "Connection"
    )]
    cors_origin: Vec<String>,
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_BODY_BYTES,
        help = "Max request body size in bytes",
        help_heading = "Safety"
    )]
    max_body_bytes: u64,
}

fn serve_config_from_args(
    args: ServeRunArgs,
    store_path: PathBuf,
) -> Result<serve::ServeConfig, Error> {
    let bind: SocketAddr = args.bind.parse().map_err(|_| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid bind address")
            .with_hint("Use a host:port value like 127.0.0.1:3003.")
    })?;
    Ok(serve::ServeConfig {
        bind,
        store_path,
        allow_non_loopback: args.allow_non_loopback,
        cors_origins: args.cors_origin,
        max_body_bytes: args.max_body_bytes,
    })
}

fn default_store_path() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".bloglist").join("entries.json")
}

fn emit_list_human(entries: &[BlogEntry]) {
    if entries.is_empty() {
        println!("No entries.");
        return;
    }
    for entry in entries {
        println!(
            "{}  likes={}  \"{}\" by {} ({})",
            entry.id, entry.likes, entry.title, entry.author, entry.url
        );
    }
}

fn encode_pretty<T: serde::Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_string_pretty(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode output")
            .with_source(err)
    })
}

fn emit_error(err: &Error) {
    let mut body = serde_json::Map::new();
    body.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    body.insert(
        "message".to_string(),
        json!(err.message().unwrap_or("error")),
    );
    if let Some(field) = err.field() {
        body.insert("field".to_string(), json!(field));
    }
    if let Some(path) = err.path() {
        body.insert("path".to_string(), json!(path.to_string_lossy()));
    }
    if let Some(hint) = err.hint() {
        body.insert("hint".to_string(), json!(hint));
    }
    eprintln!("{}", json!({ "error": Value::Object(body) }));
}

#[cfg(test)]
mod tests {
    use super::{ServeRunArgs, default_store_path, serve_config_from_args};
    use bloglist::api::ErrorKind;
    use std::path::PathBuf;

    fn run_args(bind: &str) -> ServeRunArgs {
        ServeRunArgs {
            bind: bind.to_string(),
            allow_non_loopback: false,
            cors_origin: Vec::new(),
            max_body_bytes: 1024,
        }
    }

    #[test]
    fn default_store_lives_under_home() {
        let path = default_store_path();
        assert!(path.ends_with(PathBuf::from(".bloglist").join("entries.json")));
    }

    #[test]
    fn bind_address_must_parse() {
        let err = serve_config_from_args(run_args("nonsense"), PathBuf::from("entries.json"))
            .expect_err("usage error");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let config = serve_config_from_args(run_args("127.0.0.1:0"), PathBuf::from("entries.json"))
            .expect("config");
        assert!(config.bind.ip().is_loopback());
    }
}
