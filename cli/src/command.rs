//! Command-line front end over remote lists
//!
//! ```text
//! remcoll-cli [--config <file.json>] [--db <path>] [--key <list>] <command> [args]
//! ```
//!
//! Values are JSON documents. `sorted-*` commands treat the list as a
//! [`SortedList`] ordered by [`compare_json`].

use remcoll::{
    CollectionError, ConnectionGate, JsonCodec, ListOptions, RemoteList, SortedList,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::sqlitelist::SqliteListStore;

const DEFAULT_DB: &str = "remcoll.db";

pub const USAGE: &str = "usage: remcoll-cli [--config <file.json>] [--db <path>] [--key <list>] \
<len | get <pos> | push <json> | insert <pos> <json> | remove-at <pos> | index-of <json> | \
range <start> <len> | clear | sorted-add <json> | sorted-remove <json>>";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Len,
    Get(usize),
    Push(Value),
    Insert(usize, Value),
    RemoveAt(usize),
    IndexOf(Value),
    Range(usize, usize),
    Clear,
    SortedAdd(Value),
    SortedRemove(Value),
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub db: PathBuf,
    pub key: Option<String>,
    pub config: Option<PathBuf>,
    pub command: Command,
}

#[derive(Debug)]
pub enum CliError {
    Usage(String),
    Io(std::io::Error),
    Collection(CollectionError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(msg) => write!(f, "{msg}\n{USAGE}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Collection(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Usage(_) => None,
            Self::Io(e) => Some(e),
            Self::Collection(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<CollectionError> for CliError {
    fn from(err: CollectionError) -> Self {
        Self::Collection(err)
    }
}

fn usage(msg: impl Into<String>) -> CliError {
    CliError::Usage(msg.into())
}

fn next_arg(args: &mut impl Iterator<Item = String>, what: &str) -> Result<String, CliError> {
    args.next().ok_or_else(|| usage(format!("missing {what}")))
}

fn position_arg(args: &mut impl Iterator<Item = String>, what: &str) -> Result<usize, CliError> {
    let raw = next_arg(args, what)?;
    raw.parse()
        .map_err(|_| usage(format!("{what} must be a non-negative integer, got '{raw}'")))
}

fn json_arg(args: &mut impl Iterator<Item = String>) -> Result<Value, CliError> {
    let raw = next_arg(args, "JSON value")?;
    serde_json::from_str(&raw).map_err(|e| usage(format!("invalid JSON value '{raw}': {e}")))
}

/// Parse the arguments after the program name
///
/// # Errors
/// `CliError::Usage` for unknown flags, unknown commands and malformed values
pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Invocation, CliError> {
    let mut args = args.into_iter();
    let mut db = PathBuf::from(DEFAULT_DB);
    let mut key = None;
    let mut config = None;

    let name = loop {
        let arg = next_arg(&mut args, "command")?;
        match arg.as_str() {
            "--db" => db = PathBuf::from(next_arg(&mut args, "--db path")?),
            "--key" => key = Some(next_arg(&mut args, "--key name")?),
            "--config" => config = Some(PathBuf::from(next_arg(&mut args, "--config path")?)),
            flag if flag.starts_with("--") => return Err(usage(format!("unknown flag '{flag}'"))),
            _ => break arg,
        }
    };

    let command = match name.as_str() {
        "len" => Command::Len,
        "get" => Command::Get(position_arg(&mut args, "position")?),
        "push" => Command::Push(json_arg(&mut args)?),
        "insert" => {
            let position = position_arg(&mut args, "position")?;
            Command::Insert(position, json_arg(&mut args)?)
        }
        "remove-at" => Command::RemoveAt(position_arg(&mut args, "position")?),
        "index-of" => Command::IndexOf(json_arg(&mut args)?),
        "range" => {
            let start = position_arg(&mut args, "start")?;
            Command::Range(start, position_arg(&mut args, "length")?)
        }
        "clear" => Command::Clear,
        "sorted-add" => Command::SortedAdd(json_arg(&mut args)?),
        "sorted-remove" => Command::SortedRemove(json_arg(&mut args)?),
        other => return Err(usage(format!("unknown command '{other}'"))),
    };
    if let Some(extra) = args.next() {
        return Err(usage(format!("unexpected argument '{extra}'")));
    }

    Ok(Invocation {
        db,
        key,
        config,
        command,
    })
}

/// Total order over JSON values
///
/// Numbers compare numerically and strings lexically; values of different
/// kinds order as null < bool < number < string < array < object. Arrays and
/// objects fall back to their serialized text.
#[must_use]
pub fn compare_json(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Resolve options from `--config` and `--key`; the flag wins
fn options(invocation: &Invocation) -> Result<ListOptions, CliError> {
    let mut options = match &invocation.config {
        Some(path) => ListOptions::from_slice(&std::fs::read(path)?)?,
        None => ListOptions::new(invocation.key.clone().unwrap_or_default()),
    };
    if let Some(key) = &invocation.key {
        options.list_key.clone_from(key);
    }
    options.validate()?;
    Ok(options)
}

/// Run one command against the database, writing results to `out`
///
/// # Errors
/// Usage, I/O and collection errors
pub async fn execute(invocation: &Invocation, out: &mut impl Write) -> Result<(), CliError> {
    let options = options(invocation)?;
    let gate = Arc::new(SqliteListStore::gate(invocation.db.clone()));
    execute_on(gate, &options, &invocation.command, out).await
}

/// Run one command through an existing gate
///
/// # Errors
/// I/O and collection errors
pub async fn execute_on(
    gate: Arc<ConnectionGate<SqliteListStore>>,
    options: &ListOptions,
    command: &Command,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let list: RemoteList<Value, SqliteListStore, JsonCodec> =
        RemoteList::from_options(gate, options, JsonCodec)?;
    info!(key = list.key(), ?command, "cli.execute");

    match command {
        Command::Len => writeln!(out, "{}", list.count().await?)?,
        Command::Get(position) => writeln!(out, "{}", list.get(*position).await?)?,
        Command::Push(value) => writeln!(out, "{}", list.add(value).await?)?,
        Command::Insert(position, value) => list.insert(*position, value).await?,
        Command::RemoveAt(position) => writeln!(out, "{}", list.remove_at(*position).await?)?,
        Command::IndexOf(value) => match list.index_of(value).await? {
            Some(position) => writeln!(out, "{position}")?,
            None => writeln!(out, "-1")?,
        },
        Command::Range(start, length) => {
            for value in list.range(*start, *length).await? {
                writeln!(out, "{value}")?;
            }
        }
        Command::Clear => writeln!(out, "{}", list.clear().await?)?,
        Command::SortedAdd(value) => {
            let sorted = SortedList::with_comparator(list, compare_json);
            writeln!(out, "{}", sorted.add(value).await?)?;
        }
        Command::SortedRemove(value) => {
            let sorted = SortedList::with_comparator(list, compare_json);
            writeln!(out, "{}", sorted.remove(value).await?)?;
        }
    }
    Ok(())
}
