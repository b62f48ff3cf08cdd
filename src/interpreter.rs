//! The read-eval loop and top-level dispatch.
//!
//! Each line is first offered to the builtins on its raw text (so
//! `echo hi &` prints `hi &`); only then is it parsed for background,
//! redirection, and pipe markers and handed to the process engine. The
//! dispatcher decides foreground wait versus job-table registration.

use std::fs::File;
use std::io::{self, Write};
use std::os::fd::OwnedFd;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::builtin;
use crate::env::ShellEnv;
use crate::jobs::{self, SharedJobs};
use crate::parser::{self, Request};
use crate::pipeline::{self, Executed, Launched};

/// The interactive command runner.
pub struct Interpreter {
    env: ShellEnv,
    jobs: SharedJobs,
}

impl Interpreter {
    /// Capture the environment and attach the shared job table. The
    /// caller keeps a clone of `jobs` for the termination watcher.
    pub fn new(jobs: SharedJobs) -> Self {
        Self {
            env: ShellEnv::from_process(),
            jobs,
        }
    }

    /// Run the shell until `exit`/`quit`, end-of-input, or Ctrl-C.
    pub fn repl(&mut self) -> Result<()> {
        println!("Welcome to Quash!");
        println!("$PATH is: {}", self.env.path);
        println!("$HOME is: {}", self.env.home);
        println!("Type \"exit\" to quit");

        let mut editor = DefaultEditor::new()?;
        while !self.env.should_exit {
            match editor.readline("quash> ") {
                Ok(line) => {
                    editor.add_history_entry(line.as_str())?;
                    if let Err(err) = self.handle_line(&line, &mut io::stdout()) {
                        eprintln!("quash: {err:#}");
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Dispatch one input line: builtins first, then the process engine.
    pub fn handle_line(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        let body = line.trim_start_matches(' ');
        let head = body.split(' ').next().unwrap_or("");
        if head.is_empty() {
            return Ok(());
        }
        // The rest of the line after the space terminating the head,
        // verbatim; absent when nothing (or nothing non-empty) follows.
        let rest = body[head.len()..]
            .strip_prefix(' ')
            .filter(|r| !r.is_empty());
        if builtin::dispatch(head, rest, &mut self.env, &self.jobs, out)? {
            return Ok(());
        }
        self.run_external(&parser::parse(line), out)
    }

    fn run_external(&mut self, request: &Request, out: &mut dyn Write) -> Result<()> {
        // Input opens before the output file would be created.
        let input = match &request.stdin_file {
            Some(path) => match File::open(path) {
                Ok(file) => Some(OwnedFd::from(file)),
                Err(err) => {
                    eprintln!("The following error occurred: {err}");
                    return Ok(());
                }
            },
            None => None,
        };
        let output = match &request.stdout_file {
            Some(path) => match File::create(path) {
                Ok(file) => Some(OwnedFd::from(file)),
                Err(err) => {
                    eprintln!("The following error occurred: {err}");
                    return Ok(());
                }
            },
            None => None,
        };

        match pipeline::execute(&self.env, &request.text, input, output, out)? {
            Executed::Running(launched) if request.background => {
                self.register_background(launched, &request.text, out)?;
            }
            Executed::Running(launched) => wait_foreground(launched, &request.text),
            Executed::Failed {
                leftover: Some(child),
            } if request.background => self.jobs.lock().adopt(child),
            Executed::Failed {
                leftover: Some(mut child),
            } => {
                if let Err(err) = child.wait() {
                    tracing::debug!(%err, "leftover stage wait failed");
                }
            }
            Executed::Failed { leftover: None } => {}
        }
        Ok(())
    }

    fn register_background(
        &self,
        launched: Launched,
        text: &str,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        let pid = launched.child.id();
        match self
            .jobs
            .lock()
            .insert(launched.child, launched.upstream, text.to_string())
        {
            Some(number) => writeln!(out, "[{number}] {pid}"),
            None => {
                eprintln!("too many background processes (max {})", jobs::CAPACITY);
                Ok(())
            }
        }
    }
}

/// Block on the representative child, then silently on a pipeline
/// upstream. Exit statuses are never printed; only a wait error is.
fn wait_foreground(mut launched: Launched, text: &str) {
    if let Err(err) = launched.child.wait() {
        eprintln!(
            "Process {text} encountered an error. ERROR {}",
            err.raw_os_error().unwrap_or(0)
        );
    }
    if let Some(mut upstream) = launched.upstream {
        if let Err(err) = upstream.wait() {
            tracing::debug!(%err, "upstream wait failed");
        }
    }
}
