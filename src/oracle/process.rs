//! Running external oracle binaries under a wall-clock timeout
//!
//! Each child is started as the leader of a fresh process group. On timeout
//! the whole group gets SIGTERM, then SIGKILL after a short grace period.
//! Once the leader is gone the group is killed as well, so helpers spawned
//! by the child neither outlive the call nor hold its output pipe open.

use crossbeam_channel::bounded;
use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const KILL_GRACE: Duration = Duration::from_secs(1);

/// A command line with `{name}` placeholders, e.g.
/// `cmsgen --samples={count} --seed={seed} --samplefile={output} {input}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Substitute placeholders and build a `Command`
    pub fn instantiate(&self, values: &BTreeMap<&str, String>) -> Command {
        let fill = |s: &str| {
            let mut out = s.to_string();
            for (key, value) in values {
                out = out.replace(&format!("{{{}}}", key), value);
            }
            out
        };
        let mut cmd = Command::new(fill(&self.program));
        cmd.args(self.args.iter().map(|a| fill(a)));
        cmd
    }
}

/// What a finished (or killed) child produced
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub timed_out: bool,
}

fn kill_group(child: &Child, signal: Signal) {
    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(errno) = killpg(pgid, signal) {
        // ESRCH: the group already exited
        if errno != Errno::ESRCH {
            log::warn!("could not send {signal} to process group {pgid}: {errno}");
        }
    }
}

/// Run `cmd` to completion or until `timeout` expires
pub fn run_with_timeout(cmd: &mut Command, timeout: Option<Duration>) -> io::Result<ProcessOutcome> {
    log::debug!("running {:?}", cmd);
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()?;

    // drain stdout on a thread so a chatty child cannot block on a full pipe
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout unavailable"))?;
    let (output_tx, output_rx) = bounded::<Vec<u8>>(1);
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(err) = stdout.read_to_end(&mut buf) {
            log::warn!("reading oracle output failed after {} bytes: {}", buf.len(), err);
        }
        let _ = output_tx.send(buf);
    });

    let start = Instant::now();
    let mut timed_out = false;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if let Some(limit) = timeout
            && start.elapsed() >= limit
        {
            timed_out = true;
            kill_group(&child, Signal::SIGTERM);
            let grace = Instant::now();
            while grace.elapsed() < KILL_GRACE {
                if child.try_wait()?.is_some() {
                    break;
                }
                thread::sleep(POLL_INTERVAL);
            }
            kill_group(&child, Signal::SIGKILL);
            break child.wait()?;
        }
        thread::sleep(POLL_INTERVAL);
    };

    // background helpers of a finished child are still in its group
    kill_group(&child, Signal::SIGKILL);

    let wait = match timeout {
        Some(limit) => limit.saturating_sub(start.elapsed()).max(KILL_GRACE),
        None => KILL_GRACE,
    };
    let stdout = match output_rx.recv_timeout(wait) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => {
                log::warn!("oracle output is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        },
        Err(_) => {
            log::warn!("oracle output still open {:?} after the process exited", wait);
            String::new()
        }
    };
    Ok(ProcessOutcome {
        exit_code: status.code(),
        stdout,
        timed_out,
    })
}
