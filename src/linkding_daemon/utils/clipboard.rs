use std::{
    env,
    io::{self, Write},
    path::Path,
    process::{Command, Stdio},
};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("no wl-copy, no xclip and no xsel found")]
    NoProgram,
    #[error("{program} failed: {source}")]
    Io {
        program: &'static str,
        source: io::Error,
    },
    #[error("{program} exited with {status}")]
    Status {
        program: &'static str,
        status: std::process::ExitStatus,
    },
}

const PROGRAMS: [(&str, &[&str]); 3] = [
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["-b", "-i"]),
];

pub fn copy_to_clipboard(input: &str) -> Result<(), ClipboardError> {
    let wayland = env::var_os("WAYLAND_DISPLAY").is_some();
    let (program, args) = PROGRAMS
        .into_iter()
        .filter(|(program, _)| wayland || *program != "wl-copy")
        .find(|(program, _)| is_program_in_path(program))
        .ok_or(ClipboardError::NoProgram)?;
    debug!("Copying with {program}");
    run(program, args, input)
}

fn run(program: &'static str, args: &[&str], input: &str) -> Result<(), ClipboardError> {
    let io_error = |source| ClipboardError::Io { program, source };
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .map_err(io_error)?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes()).map_err(io_error)?;
    }
    let status = child.wait().map_err(io_error)?;
    if !status.success() {
        return Err(ClipboardError::Status { program, status });
    }
    Ok(())
}

fn is_program_in_path(program: &str) -> bool {
    env::var_os("PATH")
        .map(|path| env::split_paths(&path).any(|dir| dir.join(program).is_file()))
        .unwrap_or_else(|| Path::new("/usr/bin").join(program).is_file())
}
