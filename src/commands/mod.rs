pub mod console;
pub mod help;
pub mod send;
pub mod transaction;

use tracing::debug;

use crate::session::WalletSession;

/// What the input loop should do after a line was handled
#[derive(Debug, PartialEq)]
pub enum CommandOutcome {
    Reply(String),
    Quit,
}

/// Dispatch one input line
pub async fn handle_line(session: &WalletSession, line: &str) -> CommandOutcome {
    let mut parts = line.split_whitespace();
    let command = match parts.next() {
        Some(c) => c.to_lowercase(),
        None => return CommandOutcome::Reply(String::new()),
    };
    let args: Vec<&str> = parts.collect();
    debug!("Command '{}' with {} arg(s)", command, args.len());

    let result = match command.as_str() {
        "quit" | "exit" => return CommandOutcome::Quit,
        "help" => Ok(help::help_text()),
        "list" | "refresh" | "approve" | "deny" | "cancel" => {
            transaction::execute(session, &command, &args).await
        }
        "send" | "fee" => send::execute(session, &command, &args).await,
        "device" => match args.first() {
            Some(device_id) => {
                session.switch_device(device_id);
                Ok(format!("Switched to device {}", device_id))
            }
            None => Err("Usage: device <device_id>".to_string()),
        },
        other => Err(format!("Unknown command '{}'. Type 'help'.", other)),
    };

    match result {
        Ok(reply) => CommandOutcome::Reply(reply),
        Err(e) => CommandOutcome::Reply(format!("❌ {}", e)),
    }
}
