use owo_colors::OwoColorize;

use crate::errors::TmpError;

/// Consistent, colored user-facing messages. Primary results (paths) go to
/// stdout unadorned so they can be scripted; everything else goes to stderr.
/// Colors are enabled only when the destination stream is a TTY.
fn is_tty(stream: atty::Stream) -> bool {
    atty::is(stream)
}

pub fn print_info(msg: &str) {
    if is_tty(atty::Stream::Stderr) {
        eprintln!("{} {}", "info:".cyan().bold(), msg);
    } else {
        eprintln!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if is_tty(atty::Stream::Stderr) {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if is_tty(atty::Stream::Stderr) {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if is_tty(atty::Stream::Stderr) {
        eprintln!("{} {}", "ok:".green().bold(), msg);
    } else {
        eprintln!("ok: {}", msg);
    }
}

/// Print the remediation hint for a typed error, if it has one.
pub fn print_hint(err: &TmpError) {
    if let Some(hint) = err.hint() {
        if is_tty(atty::Stream::Stderr) {
            eprintln!("{} {}", "hint:".magenta().bold(), hint);
        } else {
            eprintln!("hint: {}", hint);
        }
    }
}

/// Print a plain result line (no prefix) on stdout.
pub fn print_user(msg: &str) {
    println!("{}", msg);
}
