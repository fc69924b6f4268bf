// src/layers/script.rs
//! External command standing in for a layer's textual strategy.
//!
//! Protocol: source on stdin, transformed source on stdout. A non-zero exit
//! status, non-UTF-8 output or exceeding the timeout fails the layer.

use super::{LayerId, LayerPlugin, PluginOutput, PluginResult, TransformContext};
use crate::config::ScriptConfig;
use crate::error::PluginErrorKind;
use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const KILL_GRACE: Duration = Duration::from_millis(200);

pub struct ScriptLayer {
    layer: LayerId,
    config: ScriptConfig,
}

impl ScriptLayer {
    #[must_use]
    pub fn new(layer: LayerId, config: ScriptConfig) -> Self {
        Self { layer, config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs.max(1))
    }

    fn run(&self, code: &str, ctx: &TransformContext<'_>) -> Result<String, PluginErrorKind> {
        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .env("LAYERFIX_LAYER", self.layer.to_string())
            .env("LAYERFIX_FILE", ctx.path_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PluginErrorKind::Spawn(format!("{}: {e}", self.config.command)))?;

        // Feed and drain on threads so a large payload cannot deadlock the pipes.
        let stdin = child.stdin.take();
        let input = code.to_string();
        let writer = thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                let _ = stdin.write_all(input.as_bytes());
            }
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let timeout = self.timeout();
        let deadline = Instant::now() + timeout;
        let status = match wait_until(&mut child, deadline, timeout) {
            Ok(status) => status,
            Err(kind) => {
                let stuck = [
                    join_within(writer, KILL_GRACE).is_none(),
                    join_within(stdout, KILL_GRACE).is_none(),
                    join_within(stderr, KILL_GRACE).is_none(),
                ]
                .into_iter()
                .filter(|s| *s)
                .count();
                if stuck > 0 {
                    tracing::warn!(
                        command = %self.config.command,
                        stuck,
                        "pipes held open by a descendant after kill"
                    );
                }
                return Err(kind);
            }
        };

        // The child is gone, but a descendant can keep the pipes open.
        let grace = deadline.saturating_duration_since(Instant::now()).max(KILL_GRACE);
        let _ = join_within(writer, grace);
        let out = join_within(stdout, grace).ok_or(PluginErrorKind::Timeout(timeout))?;
        let err = join_within(stderr, KILL_GRACE).unwrap_or_default();

        if !status.success() {
            let detail = String::from_utf8_lossy(&err).trim().to_string();
            return Err(PluginErrorKind::Threw(format!(
                "`{}` exited with {status}: {detail}",
                self.config.command
            )));
        }
        String::from_utf8(out).map_err(|_| PluginErrorKind::Threw("script output is not UTF-8".into()))
    }
}

impl LayerPlugin for ScriptLayer {
    fn regex_transform(&self, code: &str, ctx: &TransformContext<'_>) -> Option<PluginResult> {
        Some(self.run(code, ctx).map(PluginOutput::new))
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Joins `handle` if it finishes within `grace`; otherwise leaves it
/// detached. A panicked thread yields the default value.
fn join_within<T: Default>(handle: thread::JoinHandle<T>, grace: Duration) -> Option<T> {
    let deadline = Instant::now() + grace;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(POLL_INTERVAL);
    }
    Some(handle.join().unwrap_or_default())
}

fn wait_until(
    child: &mut Child,
    deadline: Instant,
    timeout: Duration,
) -> Result<ExitStatus, PluginErrorKind> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PluginErrorKind::Timeout(timeout));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(PluginErrorKind::Threw(format!("wait failed: {e}"))),
        }
    }
}
