use std::{
    fs,
    io::{self, Read, Write},
    os::unix::net::{UnixListener, UnixStream},
    path::Path,
    process::ExitCode,
    sync::mpsc,
    thread,
};

use thiserror::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    common::{Command, Commands, Reply},
    config::{
        get_config_file_path,
        watcher::{ConfigEvent, Watcher},
        ConfigError,
    },
};

mod app;
#[path = "../common.rs"]
mod common;
mod config;
mod plugins;
#[cfg(feature = "linkding_plugin")]
mod utils;

#[derive(Debug, Error)]
enum DaemonError {
    #[error("socket {path}: {source}")]
    Socket { path: String, source: io::Error },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

enum UserEvent {
    CliCommands(Commands, mpsc::Sender<Vec<Reply>>),
    Config(ConfigEvent),
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper_util=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

fn run() -> Result<(), DaemonError> {
    let (tx, rx) = mpsc::channel();

    let config_path = get_config_file_path()?;
    let mut app = app::App::new();
    let configured =
        config::ConfigBuilder::load(&config_path).and_then(|builder| app.configure(builder));
    if let Err(err) = configured {
        // plugins stay idle until the file is fixed
        error!("{err}");
    }

    let listener = bind_socket(&common::socket_path())?;
    let socket_tx = tx.clone();
    let socket_thread = thread::spawn(move || start_socket(listener, &socket_tx));

    match Watcher::new(&config_path) {
        Ok(watcher) => {
            let watcher_tx = tx.clone();
            thread::spawn(move || watch_config(watcher, &watcher_tx));
        }
        Err(err) => warn!("Config changes will not be picked up: {err}"),
    }
    drop(tx);

    while let Ok(event) = rx.recv() {
        match event {
            UserEvent::CliCommands(Commands(commands), reply_tx) => {
                let replies = commands
                    .into_iter()
                    .map(|command| {
                        debug!("Got command: {command:?}");
                        app.handle(command)
                    })
                    .collect();
                if reply_tx.send(replies).is_err() {
                    warn!("Client went away before the reply");
                }
            }
            UserEvent::Config(event) => {
                info!("Config file {event:?}, reloading");
                if let Err(err) = app.reload_config() {
                    error!("{err}");
                }
            }
        }
        if app.should_quit() {
            break;
        }
    }

    app.finalize();
    if socket_thread.join().is_err() {
        warn!("Socket thread panicked");
    }
    let _ = fs::remove_file(common::socket_path());
    Ok(())
}

fn bind_socket(socket: &Path) -> Result<UnixListener, DaemonError> {
    let socket_error = |source| DaemonError::Socket {
        path: socket.display().to_string(),
        source,
    };

    // Delete old socket if necessary
    if socket.exists() {
        fs::remove_file(socket).map_err(socket_error)?;
    }

    let listener = UnixListener::bind(socket).map_err(socket_error)?;
    info!("Listening on {}", socket.display());
    Ok(listener)
}

fn start_socket(listener: UnixListener, tx: &mpsc::Sender<UserEvent>) {
    // Iterate over clients, blocks if no client available
    for client in listener.incoming() {
        let result = client.and_then(|stream| handle_client(stream, tx));
        match result {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => warn!("Client error: {err}"),
        }
    }
}

/// Returns false once the event loop is gone or the client asked it to quit.
fn handle_client(mut stream: UnixStream, tx: &mpsc::Sender<UserEvent>) -> io::Result<bool> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    let commands: Commands = bincode::deserialize(&buf)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

    let quit = commands.0.contains(&Command::Quit);
    let (reply_tx, reply_rx) = mpsc::channel();
    if tx.send(UserEvent::CliCommands(commands, reply_tx)).is_err() {
        return Ok(false);
    }
    let Ok(replies) = reply_rx.recv() else {
        return Ok(false);
    };

    if let Err(err) = write_replies(&mut stream, &replies) {
        warn!("Could not reply: {err}");
    }
    Ok(!quit)
}

fn write_replies(stream: &mut UnixStream, replies: &[Reply]) -> io::Result<()> {
    let bytes = bincode::serialize(replies)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    stream.write_all(&bytes)
}

fn watch_config(mut watcher: Watcher, tx: &mpsc::Sender<UserEvent>) {
    for event in watcher.get_stream() {
        if event == ConfigEvent::Deleted {
            continue;
        }
        if tx.send(UserEvent::Config(event)).is_err() {
            break;
        }
    }
}
