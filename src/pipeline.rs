//! One- or two-stage composition of process launches.
//!
//! The grammar honors a single `|`: the text is split at the first one,
//! so a second pipe is literal text of the right-hand command. Both
//! stages spawn concurrently; the shell never buffers pipe traffic.

use std::io::Write;
use std::os::fd::OwnedFd;
use std::process::Child;

use anyhow::{Context, Result};

use crate::env::ShellEnv;
use crate::external::{self, Launch};

/// A running request. `child` is the representative process: the one the
/// job line shows and the foreground path waits on.
pub struct Launched {
    pub child: Child,
    /// Left-hand stage of a pipeline, if there was one and it spawned.
    pub upstream: Option<Child>,
}

/// What became of an execution request.
pub enum Executed {
    Running(Launched),
    /// The representative stage never spawned. `leftover` is a left-hand
    /// stage that did spawn and still needs waiting or adoption.
    Failed { leftover: Option<Child> },
}

/// Launch `text`, split at the first `|` if one is present.
///
/// `input` feeds the first stage's stdin, `output` receives the last
/// stage's stdout; absent descriptors inherit the shell's. Launch
/// failures are reported here (not-found on `out`, home-anchored spawn
/// errors on stderr); a failed left stage still lets the right stage run
/// against end-of-file.
pub fn execute(
    env: &ShellEnv,
    text: &str,
    input: Option<OwnedFd>,
    output: Option<OwnedFd>,
    out: &mut dyn Write,
) -> Result<Executed> {
    let Some((left, right)) = split_pipe(text) else {
        return Ok(
            match report(external::launch(env, text, input.as_ref(), output.as_ref()), out)? {
                Some(child) => Executed::Running(Launched {
                    child,
                    upstream: None,
                }),
                None => Executed::Failed { leftover: None },
            },
        );
    };

    let (read_end, write_end) = nix::unistd::pipe().context("failed to create pipe")?;
    let upstream = report(
        external::launch(env, left, input.as_ref(), Some(&write_end)),
        out,
    )?;
    // Drop the shell's write end so the right stage sees end-of-file
    // once the left stage exits.
    drop(write_end);
    let downstream = report(
        external::launch(env, right, Some(&read_end), output.as_ref()),
        out,
    )?;
    drop(read_end);

    Ok(match downstream {
        Some(child) => Executed::Running(Launched { child, upstream }),
        None => Executed::Failed { leftover: upstream },
    })
}

/// Split at the first `|`, trimming exactly one space on each side of it.
fn split_pipe(text: &str) -> Option<(&str, &str)> {
    let (left, right) = text.split_once('|')?;
    Some((
        left.strip_suffix(' ').unwrap_or(left),
        right.strip_prefix(' ').unwrap_or(right),
    ))
}

fn report(launch: Launch, out: &mut dyn Write) -> Result<Option<Child>> {
    match launch {
        Launch::Spawned(child) => Ok(Some(child)),
        Launch::NotFound => {
            writeln!(out, "Failed to find command.")?;
            Ok(None)
        }
        Launch::HomeError(err) => {
            eprintln!("\nError. ERROR # {}", err.raw_os_error().unwrap_or(0));
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::fs::File;
    use std::path::PathBuf;

    fn env_with_path(path: &str) -> ShellEnv {
        ShellEnv {
            path: path.to_string(),
            home: String::new(),
            should_exit: false,
        }
    }

    fn temp_file(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock")
            .subsec_nanos();
        std::env::temp_dir().join(format!(
            "quash_pipeline_{}_{}_{}",
            tag,
            std::process::id(),
            nanos
        ))
    }

    fn wait_all(executed: Executed) -> Launched {
        match executed {
            Executed::Running(mut launched) => {
                launched.child.wait().expect("wait representative");
                if let Some(upstream) = launched.upstream.as_mut() {
                    upstream.wait().expect("wait upstream");
                }
                launched
            }
            Executed::Failed { .. } => panic!("expected a running request"),
        }
    }

    #[test]
    fn split_trims_one_space_each_side() {
        assert_eq!(split_pipe("a | b"), Some(("a", "b")));
        assert_eq!(split_pipe("a|b"), Some(("a", "b")));
        assert_eq!(split_pipe("a  |  b"), Some(("a ", " b")));
        assert_eq!(split_pipe("plain"), None);
    }

    #[test]
    fn second_pipe_is_literal_right_hand_text() {
        assert_eq!(split_pipe("a | b | c"), Some(("a", "b | c")));
    }

    #[test]
    #[cfg(unix)]
    fn single_command_writes_to_output() {
        let env = env_with_path("/usr/bin:/bin");
        let path = temp_file("single");
        let file = File::create(&path).expect("create output");
        let mut sink = Vec::new();

        let executed =
            execute(&env, "echo hello", None, Some(OwnedFd::from(file)), &mut sink).expect("execute");
        let launched = wait_all(executed);
        assert!(launched.upstream.is_none());
        assert!(sink.is_empty());

        let got = fs::read_to_string(&path).expect("read output");
        assert_eq!(got, "hello\n");
        let _ = fs::remove_file(path);
    }

    #[test]
    #[cfg(unix)]
    fn pipe_connects_two_stages() {
        let env = env_with_path("/usr/bin:/bin");
        let path = temp_file("wc");
        let file = File::create(&path).expect("create output");
        let mut sink = Vec::new();

        let executed = execute(
            &env,
            "echo one two | wc -w",
            None,
            Some(OwnedFd::from(file)),
            &mut sink,
        )
        .expect("execute");
        let launched = wait_all(executed);
        assert!(launched.upstream.is_some());

        let got = fs::read_to_string(&path).expect("read output");
        assert_eq!(got.trim(), "2");
        let _ = fs::remove_file(path);
    }

    #[test]
    #[cfg(unix)]
    fn failed_left_stage_feeds_eof_to_right() {
        let env = env_with_path("/usr/bin:/bin");
        let path = temp_file("eof");
        let file = File::create(&path).expect("create output");
        let mut sink = Vec::new();

        let executed = execute(
            &env,
            "no_such_cmd_quash | wc -l",
            None,
            Some(OwnedFd::from(file)),
            &mut sink,
        )
        .expect("execute");
        let launched = wait_all(executed);
        assert!(launched.upstream.is_none());
        assert_eq!(
            String::from_utf8(sink).expect("utf8"),
            "Failed to find command.\n"
        );

        let got = fs::read_to_string(&path).expect("read output");
        assert_eq!(got.trim(), "0");
        let _ = fs::remove_file(path);
    }

    #[test]
    #[cfg(unix)]
    fn failed_right_stage_returns_leftover() {
        let env = env_with_path("/usr/bin:/bin");
        let mut sink = Vec::new();

        let executed =
            execute(&env, "echo hi | no_such_cmd_quash", None, None, &mut sink).expect("execute");
        match executed {
            Executed::Failed {
                leftover: Some(mut child),
            } => {
                child.wait().expect("wait leftover");
            }
            _ => panic!("expected the spawned left stage back"),
        }
        assert_eq!(
            String::from_utf8(sink).expect("utf8"),
            "Failed to find command.\n"
        );
    }

    #[test]
    fn not_found_single_command() {
        let env = env_with_path("");
        let mut sink = Vec::new();
        let executed = execute(&env, "anything", None, None, &mut sink).expect("execute");
        assert!(matches!(executed, Executed::Failed { leftover: None }));
        assert_eq!(
            String::from_utf8(sink).expect("utf8"),
            "Failed to find command.\n"
        );
    }
}
