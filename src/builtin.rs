//! Built-in commands, handled in-process before the engine sees a line.
//!
//! Every builtin receives the raw rest-of-line after its name (`None`
//! when nothing follows) and writes through the injected stream, so the
//! whole surface is testable against a byte buffer. Message strings are
//! part of the shell's user-visible contract.

use std::env as stdenv;
use std::io::{self, Write};

use crate::env::ShellEnv;
use crate::jobs::{SharedJobs, SignalOutcome};
use crate::parser;

/// Route `head` to a builtin. Returns `false` when `head` names no
/// builtin and the line belongs to the process engine.
pub fn dispatch(
    head: &str,
    rest: Option<&str>,
    env: &mut ShellEnv,
    jobs: &SharedJobs,
    out: &mut dyn Write,
) -> io::Result<bool> {
    match head {
        "exit" | "quit" => {
            // Arguments are ignored: `exit now` still exits.
            writeln!(out, "Bye!")?;
            env.should_exit = true;
        }
        "echo" => echo(rest, env, out)?,
        "cd" => cd(rest, env, out)?,
        "pwd" => writeln!(out, "{}", stdenv::current_dir()?.display())?,
        "set" => set(rest, env, out)?,
        "jobs" => list_jobs(jobs, out)?,
        "kill" => kill(rest, jobs, out)?,
        _ => return Ok(false),
    }
    Ok(true)
}

/// Print the argument verbatim, expanding only the two literal tokens
/// `$HOME` and `$PATH`. No argument prints a blank line.
fn echo(rest: Option<&str>, env: &ShellEnv, out: &mut dyn Write) -> io::Result<()> {
    match rest {
        None => writeln!(out),
        Some("$HOME") => writeln!(out, "{}", env.home),
        Some("$PATH") => writeln!(out, "{}", env.path),
        Some(text) => writeln!(out, "{text}"),
    }
}

/// Change the working directory. No argument or a `~`-prefixed one goes
/// home (the rest of a `~...` argument is ignored).
fn cd(rest: Option<&str>, env: &ShellEnv, out: &mut dyn Write) -> io::Result<()> {
    let target = match rest {
        Some(dir) if !dir.starts_with('~') => dir,
        _ => env.home.as_str(),
    };
    if stdenv::set_current_dir(target).is_err() {
        writeln!(out, "Error, no such directory.")?;
    }
    Ok(())
}

/// Assign one of the two tracked variables. The value is everything
/// after the first `=` and may itself contain `=` or be empty.
fn set(rest: Option<&str>, env: &mut ShellEnv, out: &mut dyn Write) -> io::Result<()> {
    let Some(arg) = rest.filter(|a| !a.starts_with(' ')) else {
        return writeln!(out, "Error. Empty variable.");
    };
    match arg.split_once('=') {
        Some(("PATH", value)) => env.path = value.to_string(),
        Some(("HOME", value)) => env.home = value.to_string(),
        Some(_) => writeln!(out, "Error. No such variable.")?,
        None if arg == "PATH" || arg == "HOME" => writeln!(out, "Error. Empty variable.")?,
        None => writeln!(out, "Error. No such variable.")?,
    }
    Ok(())
}

fn list_jobs(jobs: &SharedJobs, out: &mut dyn Write) -> io::Result<()> {
    for (number, pid, text) in jobs.lock().entries() {
        writeln!(out, "[{number}] {pid} {text}")?;
    }
    Ok(())
}

/// `kill signum jobid`. Both tokens parse as integers with parse
/// failure becoming 0, which the table then rejects as invalid.
fn kill(rest: Option<&str>, jobs: &SharedJobs, out: &mut dyn Write) -> io::Result<()> {
    let mut tokens = parser::fields(rest.unwrap_or(""));
    let (Some(signum), Some(number)) = (tokens.next(), tokens.next()) else {
        return writeln!(out, "Error. Invalid number of arguments.");
    };
    let signum = signum.parse::<i32>().unwrap_or(0);
    let number = number.parse::<i32>().unwrap_or(0);
    match jobs.lock().signal(number, signum) {
        SignalOutcome::Sent => Ok(()),
        SignalOutcome::InvalidArguments => writeln!(out, "Invalid command."),
        SignalOutcome::NoSuchJob => writeln!(out, "No Job ID: [{number}] to kill."),
    }
}
