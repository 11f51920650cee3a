use super::{send, transaction};

pub fn help_text() -> String {
    format!(
        "Commands:\n  {}\n  {}\n  device <device_id>\n  help\n  quit",
        transaction::USAGE,
        send::USAGE
    )
}
