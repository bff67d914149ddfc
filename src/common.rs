use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SOCKET_NAME: &str = "linkding-launcher.sock";

pub fn socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(SOCKET_NAME)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Query {
        query: String,
    },
    Activate {
        plugin: String,
        item: String,
        action: String,
    },
    Refresh,
    Set {
        key: String,
        value: ConfigValue,
    },
    Quit,
}

/// Value of a `set` command, parsed from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigValue {
    Integer(i64),
    Boolean(bool),
    String(String),
}

impl From<&str> for ConfigValue {
    fn from(raw: &str) -> Self {
        if let Ok(int) = raw.parse::<i64>() {
            ConfigValue::Integer(int)
        } else if let Ok(boolean) = raw.parse::<bool>() {
            ConfigValue::Boolean(boolean)
        } else {
            ConfigValue::String(raw.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAction {
    pub id: String,
    pub label: String,
}

impl ItemAction {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A launcher entry as plugins produce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub text: String,
    pub subtext: String,
    pub actions: Vec<ItemAction>,
}

/// An item tagged with the plugin that produced it, so it can be activated later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub plugin: String,
    pub item: Item,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    Hits(Vec<Hit>),
    Done,
    Failed(String),
}

fn parse_command(
    command: &str,
    tokens: &mut dyn Iterator<Item = &str>,
) -> Result<Command, CommandParseError> {
    let mut next = |name: &'static str| {
        tokens
            .next()
            .map(ToString::to_string)
            .ok_or(CommandParseError::EmptyArgument { name })
    };
    match command {
        "query" => Ok(Command::Query {
            query: next("query")?,
        }),
        "activate" => Ok(Command::Activate {
            plugin: next("plugin")?,
            item: next("item")?,
            action: next("action")?,
        }),
        "refresh" => Ok(Command::Refresh),
        "set" => {
            let key = next("key")?;
            let value = next("value")?;
            Ok(Command::Set {
                key,
                value: value.as_str().into(),
            })
        }
        "quit" => Ok(Command::Quit),
        command => Err(CommandParseError::UnknownCommand {
            command: command.into(),
        }),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Commands(pub Vec<Command>);

#[derive(Debug, Error, PartialEq)]
pub enum CommandParseError {
    #[error("unknown command: {command}")]
    UnknownCommand { command: String },
    #[error("missing argument: {name}")]
    EmptyArgument { name: &'static str },
}

pub struct CommandParseResult(pub Result<Commands, CommandParseError>);

impl<'a> FromIterator<&'a str> for CommandParseResult {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        let mut tokens = iter.into_iter();
        let mut commands = Vec::new();
        while let Some(command) = tokens.next() {
            commands.push(parse_command(command, &mut tokens));
        }

        let commands: Result<Vec<Command>, CommandParseError> = commands.into_iter().collect();
        CommandParseResult(commands.map(Commands))
    }
}
