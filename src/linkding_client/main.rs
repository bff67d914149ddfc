use std::{
    env,
    io::{Read, Write},
    net::Shutdown,
    os::unix::net::UnixStream,
    process::ExitCode,
};

use crate::common::{socket_path, CommandParseResult, Commands, Hit, Reply};

#[path = "../common.rs"]
mod common;

fn main() -> ExitCode {
    let commands: Commands = match parse_args(env::args()).0 {
        Ok(commands) if !commands.0.is_empty() => commands,
        Ok(_) => {
            eprintln!("usage: linkdingc <query TEXT | activate PLUGIN ITEM ACTION | refresh | set KEY VALUE | quit>...");
            return ExitCode::FAILURE;
        }
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match send(&commands) {
        Ok(replies) => {
            let failed = replies.iter().any(|r| matches!(r, Reply::Failed(_)));
            replies.iter().for_each(print_reply);
            if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("linkding-launcher is not running ({err}). You have to start it first.");
            ExitCode::FAILURE
        }
    }
}

/// Skips the program name, which may be missing.
fn parse_args(args: impl Iterator<Item = String>) -> CommandParseResult {
    let args: Vec<String> = args.skip(1).collect();
    args.iter().map(String::as_str).collect()
}

fn send(commands: &Commands) -> Result<Vec<Reply>, Box<dyn std::error::Error>> {
    let mut stream = UnixStream::connect(socket_path())?;
    stream.write_all(&bincode::serialize(commands)?)?;
    stream.shutdown(Shutdown::Write)?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    Ok(bincode::deserialize(&buf)?)
}

fn print_reply(reply: &Reply) {
    match reply {
        Reply::Hits(hits) => hits.iter().for_each(print_hit),
        Reply::Done => {}
        Reply::Failed(message) => eprintln!("error: {message}"),
    }
}

fn print_hit(hit: &Hit) {
    println!("{}", hit.item.text);
    if !hit.item.subtext.is_empty() {
        println!("    {}", hit.item.subtext);
    }
    let actions: Vec<&str> = hit.item.actions.iter().map(|a| a.id.as_str()).collect();
    println!("    [{} {}] {}", hit.plugin, hit.item.id, actions.join(" | "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Command;

    fn args(tokens: &[&str]) -> impl Iterator<Item = String> {
        tokens
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn empty_argv_parses_to_no_commands() {
        let commands = parse_args(args(&[])).0.unwrap();
        assert!(commands.0.is_empty());
    }

    #[test]
    fn program_name_is_skipped() {
        let commands = parse_args(args(&["linkdingc", "refresh"])).0.unwrap();
        assert_eq!(commands.0, vec![Command::Refresh]);
    }
}
