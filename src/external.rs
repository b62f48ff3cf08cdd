//! Fused search-path resolution and process launch.
//!
//! Resolution never probes the filesystem separately: a candidate path is
//! rejected only because spawning it fails. The first prefix whose spawn
//! attempt succeeds wins, so a non-executable file earlier in the search
//! path never shadows a runnable one later.

use std::io;
use std::os::fd::OwnedFd;
use std::process::{Child, Command, Stdio};

use crate::env::ShellEnv;
use crate::parser;

/// Outcome of one launch request.
pub enum Launch {
    /// The child is running; the caller owns the handle.
    Spawned(Child),
    /// No search-path candidate could be spawned (or the text was empty).
    NotFound,
    /// The single home-anchored attempt for a leading-`/` name failed.
    HomeError(io::Error),
}

/// Resolve the first field of `text` and spawn it with the remaining
/// fields as arguments.
///
/// `input` and `output` are attached to the child's stdin/stdout when
/// given; `None` inherits the shell's. Descriptors are duplicated per
/// attempt, so a rejected candidate consumes nothing.
pub fn launch(
    env: &ShellEnv,
    text: &str,
    input: Option<&OwnedFd>,
    output: Option<&OwnedFd>,
) -> Launch {
    let mut fields = parser::fields(text);
    let Some(name) = fields.next() else {
        return Launch::NotFound;
    };
    let args: Vec<&str> = fields.collect();

    if name.starts_with('/') {
        // A leading slash anchors at the home directory, not the
        // filesystem root. Compatibility behavior, kept deliberately.
        let candidate = format!("{}{}", env.home, name);
        return match attempt(&candidate, &args, input, output) {
            Ok(child) => Launch::Spawned(child),
            Err(err) => Launch::HomeError(err),
        };
    }

    for prefix in env.prefixes() {
        let candidate = format!("{prefix}/{name}");
        match attempt(&candidate, &args, input, output) {
            Ok(child) => {
                tracing::debug!(%candidate, pid = child.id(), "spawned");
                return Launch::Spawned(child);
            }
            Err(err) => tracing::debug!(%candidate, %err, "candidate rejected"),
        }
    }
    Launch::NotFound
}

fn attempt(
    path: &str,
    args: &[&str],
    input: Option<&OwnedFd>,
    output: Option<&OwnedFd>,
) -> io::Result<Child> {
    let mut command = Command::new(path);
    command.args(args);
    if let Some(fd) = input {
        command.stdin(Stdio::from(fd.try_clone()?));
    }
    if let Some(fd) = output {
        command.stdout(Stdio::from(fd.try_clone()?));
    }
    command.spawn()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::fs::File;
    use std::io::Write as _;
    use std::path::PathBuf;

    fn env_with(path: &str, home: &str) -> ShellEnv {
        ShellEnv {
            path: path.to_string(),
            home: home.to_string(),
            should_exit: false,
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock")
            .subsec_nanos();
        let dir = std::env::temp_dir().join(format!(
            "quash_external_{}_{}_{}",
            tag,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[cfg(unix)]
    fn make_script(dir: &std::path::Path, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        let mut file = File::create(&path).expect("create script");
        writeln!(file, "#!/bin/sh\n{body}").expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    }

    #[test]
    #[cfg(unix)]
    fn spawns_from_search_path() {
        let env = env_with("/usr/bin:/bin", "");
        match launch(&env, "true", None, None) {
            Launch::Spawned(mut child) => {
                let status = child.wait().expect("wait");
                assert!(status.success());
            }
            _ => panic!("expected to spawn 'true'"),
        }
    }

    #[test]
    #[cfg(unix)]
    fn first_launchable_candidate_wins() {
        // An empty, non-executable file in the first directory must be
        // rejected in favor of the runnable script in the second.
        let decoy_dir = temp_dir("decoy");
        File::create(decoy_dir.join("probe")).expect("touch decoy");
        let real_dir = temp_dir("real");
        make_script(&real_dir, "probe", "exit 7");

        let path = format!("{}:{}", decoy_dir.display(), real_dir.display());
        let env = env_with(&path, "");
        match launch(&env, "probe", None, None) {
            Launch::Spawned(mut child) => {
                let status = child.wait().expect("wait");
                assert_eq!(status.code(), Some(7));
            }
            _ => panic!("expected the second directory's probe to run"),
        }

        let _ = fs::remove_dir_all(decoy_dir);
        let _ = fs::remove_dir_all(real_dir);
    }

    #[test]
    fn exhausted_search_path_is_not_found() {
        let env = env_with("/definitely/not/a/dir", "");
        assert!(matches!(
            launch(&env, "no_such_binary_here", None, None),
            Launch::NotFound
        ));
    }

    #[test]
    fn empty_search_path_is_not_found() {
        let env = env_with("", "");
        assert!(matches!(launch(&env, "true", None, None), Launch::NotFound));
    }

    #[test]
    fn empty_text_is_not_found() {
        let env = env_with("/bin", "");
        assert!(matches!(launch(&env, "", None, None), Launch::NotFound));
    }

    #[test]
    #[cfg(unix)]
    fn leading_slash_is_home_anchored() {
        let home = temp_dir("home");
        make_script(&home, "tool", "exit 0");

        // `/tool` resolves to `<home>/tool`, never to the filesystem root.
        let env = env_with("", &home.display().to_string());
        match launch(&env, "/tool", None, None) {
            Launch::Spawned(mut child) => {
                assert!(child.wait().expect("wait").success());
            }
            _ => panic!("expected the home-anchored spawn to succeed"),
        }
        match launch(&env, "/missing", None, None) {
            Launch::HomeError(_) => {}
            _ => panic!("expected a home-anchored failure"),
        }

        let _ = fs::remove_dir_all(home);
    }

    #[test]
    #[cfg(unix)]
    fn arguments_are_forwarded_unbounded() {
        let dir = temp_dir("argv");
        make_script(&dir, "count", "exit $#");

        let env = env_with(&dir.display().to_string(), "");
        match launch(&env, "count a b c d e f", None, None) {
            Launch::Spawned(mut child) => {
                let status = child.wait().expect("wait");
                assert_eq!(status.code(), Some(6));
            }
            _ => panic!("expected the script to spawn"),
        }

        let _ = fs::remove_dir_all(dir);
    }
}
