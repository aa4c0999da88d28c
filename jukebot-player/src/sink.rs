//! Playback sink interface and the ffplay-backed implementation
//!
//! The sink renders audio for one session and reports completion exactly
//! once per play through a single-slot channel handoff. Completion may be
//! signalled from any execution context (audio callback, child-process
//! reaper); the owning session loop is the only receiver and re-enters its
//! cycle when the signal arrives.

use crate::error::{Error, Result};
use jukebot_common::Track;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::debug;

/// Exactly-once completion handoff for one play cycle
///
/// Wraps a oneshot sender so a sink can signal from its own execution
/// context without touching session state. Dropping an unsignalled
/// Completion counts as an errored finish, so the session loop can never
/// hang on a sink that forgets to call back.
pub struct Completion {
    tx: Option<oneshot::Sender<Option<String>>>,
}

impl Completion {
    /// Create a completion and the receiver its owner awaits
    pub fn channel() -> (Self, oneshot::Receiver<Option<String>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Signal successful completion
    pub fn finish(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(None);
        }
    }

    /// Signal completion with a playback error
    pub fn fail(mut self, reason: impl Into<String>) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Some(reason.into()));
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Some("sink dropped the completion handle".to_string()));
        }
    }
}

/// Audio rendering for one session
///
/// `play` must arrange for `done` to be signalled exactly once, from
/// whatever context the sink completes in. `stop` forces that signal
/// immediately and is a no-op when nothing is playing.
pub trait PlaybackSink: Send + Sync {
    /// Start rendering a track at the given volume (0.0-1.0)
    fn play(&self, track: &Track, volume: f32, done: Completion) -> Result<()>;

    /// Force the in-flight completion immediately; no-op when idle
    fn stop(&self);

    /// Adjust the volume of the currently playing item without restart
    fn set_volume(&self, volume: f32);

    /// Pause rendering, keeping the completion pending
    fn pause(&self);

    /// Resume rendering after pause
    fn resume(&self);

    /// Tear down the underlying connection. Idempotent; absence of a
    /// connection is not an error.
    fn disconnect(&self);
}

/// Sink that renders through an ffplay child process
///
/// One child per play; the reaper task waits for the process to exit and
/// signals the completion. `stop` kills the child, which the reaper
/// observes as a deliberate (successful) finish. Pause and resume are
/// delivered as SIGSTOP/SIGCONT to the child on unix.
pub struct FfplaySink {
    program: String,
    kill: Mutex<Option<oneshot::Sender<()>>>,
    /// Pid of the currently playing child, cleared by the reaper
    pid: Arc<Mutex<Option<u32>>>,
}

impl FfplaySink {
    pub fn new() -> Self {
        Self::with_program("ffplay")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            kill: Mutex::new(None),
            pid: Arc::new(Mutex::new(None)),
        }
    }

    #[cfg(unix)]
    fn signal_child(&self, sig: libc::c_int, what: &str) {
        if let Some(pid) = *self.pid.lock().unwrap() {
            // The child may have exited in the meantime; a failed signal
            // is harmless.
            unsafe { libc::kill(pid as libc::pid_t, sig) };
            debug!("sent {} to ffplay pid {}", what, pid);
        } else {
            debug!("no ffplay child to {}", what);
        }
    }
}

impl Default for FfplaySink {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSink for FfplaySink {
    fn play(&self, track: &Track, volume: f32, done: Completion) -> Result<()> {
        let volume_pct = (volume.clamp(0.0, 1.0) * 100.0).round() as i32;

        let mut child = tokio::process::Command::new(&self.program)
            .args(["-nodisp", "-autoexit", "-loglevel", "error"])
            .args(["-volume", &volume_pct.to_string()])
            .arg(&track.stream_url)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Playback(format!("failed to start {}: {}", self.program, e)))?;

        debug!("ffplay started for '{}' at volume {}%", track.title, volume_pct);

        let child_pid = child.id();
        *self.pid.lock().unwrap() = child_pid;

        let (kill_tx, mut kill_rx) = oneshot::channel();
        *self.kill.lock().unwrap() = Some(kill_tx);

        let pid_slot = Arc::clone(&self.pid);
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => done.finish(),
                    Ok(status) => done.fail(format!("ffplay exited with {}", status)),
                    Err(e) => done.fail(format!("failed to reap ffplay: {}", e)),
                },
                _ = &mut kill_rx => {
                    // Deliberate stop: kill the child and report a clean finish
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    done.finish();
                }
            }
            // Only clear our own pid: a new play may have started already
            let mut pid = pid_slot.lock().unwrap();
            if *pid == child_pid {
                *pid = None;
            }
        });

        Ok(())
    }

    fn stop(&self) {
        if let Some(kill) = self.kill.lock().unwrap().take() {
            let _ = kill.send(());
        }
    }

    fn set_volume(&self, _volume: f32) {
        // ffplay has no runtime volume control; the new level applies from
        // the next track. Sinks with a live mixer honor this immediately.
        debug!("ffplay sink cannot adjust volume mid-play");
    }

    fn pause(&self) {
        #[cfg(unix)]
        self.signal_child(libc::SIGSTOP, "pause");
        #[cfg(not(unix))]
        tracing::warn!("pause is only supported on unix");
    }

    fn resume(&self) {
        #[cfg(unix)]
        self.signal_child(libc::SIGCONT, "resume");
        #[cfg(not(unix))]
        tracing::warn!("resume is only supported on unix");
    }

    fn disconnect(&self) {
        self.stop();
    }
}
