//! Renderer process launching and supervision.

use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use montage_common::config::RendererCommand;
use montage_common::error::{MontageError, MontageResult};

use crate::adapter::LaunchMode;

/// Handle on a launched renderer.
#[derive(Debug)]
pub enum RenderProcess {
    /// The launcher thread has not reported back yet.
    Pending(JoinHandle<io::Result<Child>>),
    Running(Child),
    Exited(ExitStatus),
    /// The renderer runs outside our supervision; only the session store
    /// tells us about it.
    Detached,
}

/// What a poll of the renderer process found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Exited(ExitStatus),
    LaunchFailed(String),
    /// No handle to inspect.
    Unknown,
}

impl RenderProcess {
    /// Non-blocking check of the process.
    pub fn poll_exit(&mut self) -> ProcessState {
        match self {
            RenderProcess::Pending(handle) if !handle.is_finished() => ProcessState::Running,
            RenderProcess::Pending(_) => {
                let RenderProcess::Pending(handle) =
                    std::mem::replace(self, RenderProcess::Detached)
                else {
                    return ProcessState::Unknown;
                };
                match handle.join() {
                    Ok(Ok(child)) => {
                        *self = RenderProcess::Running(child);
                        self.poll_exit()
                    }
                    Ok(Err(e)) => ProcessState::LaunchFailed(e.to_string()),
                    Err(_) => ProcessState::LaunchFailed("launcher thread panicked".to_string()),
                }
            }
            RenderProcess::Running(child) => match child.try_wait() {
                Ok(Some(status)) => {
                    *self = RenderProcess::Exited(status);
                    ProcessState::Exited(status)
                }
                Ok(None) => ProcessState::Running,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to poll renderer process");
                    ProcessState::Running
                }
            },
            RenderProcess::Exited(status) => ProcessState::Exited(*status),
            RenderProcess::Detached => ProcessState::Unknown,
        }
    }

    /// Force the renderer down.
    pub fn kill(&mut self) -> io::Result<()> {
        if let RenderProcess::Running(child) = self {
            child.kill()?;
            let status = child.wait()?;
            *self = RenderProcess::Exited(status);
        }
        Ok(())
    }

    pub fn id(&self) -> Option<u32> {
        match self {
            RenderProcess::Running(child) => Some(child.id()),
            _ => None,
        }
    }
}

/// Starts renderer processes.
pub trait RenderLauncher: Send {
    fn launch(
        &self,
        command: &RendererCommand,
        args: &[String],
        mode: LaunchMode,
    ) -> MontageResult<RenderProcess>;
}

/// Launches renderers as child processes of the editor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubprocessLauncher;

impl SubprocessLauncher {
    fn command(command: &RendererCommand, args: &[String]) -> Command {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl RenderLauncher for SubprocessLauncher {
    fn launch(
        &self,
        command: &RendererCommand,
        args: &[String],
        mode: LaunchMode,
    ) -> MontageResult<RenderProcess> {
        tracing::debug!(program = %command.program.display(), ?args, ?mode, "Launching renderer");
        match mode {
            LaunchMode::Direct => {
                let child = Self::command(command, args).spawn().map_err(|e| {
                    MontageError::render(format!(
                        "Failed to start renderer {}: {e}",
                        command.program.display()
                    ))
                })?;
                tracing::info!(pid = child.id(), "Renderer process started");
                Ok(RenderProcess::Running(child))
            }
            LaunchMode::Thread => {
                let mut cmd = Self::command(command, args);
                let handle = std::thread::Builder::new()
                    .name("renderer-launch".to_string())
                    .spawn(move || cmd.spawn())?;
                Ok(RenderProcess::Pending(handle))
            }
        }
    }
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for_exit(process: &mut RenderProcess) -> ProcessState {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let state = process.poll_exit();
            if state != ProcessState::Running || Instant::now() > deadline {
                return state;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn test_direct_launch_reports_exit_status() {
        let command = RendererCommand::new("sh").with_args(["-c", "exit 3"]);
        let mut process = SubprocessLauncher
            .launch(&command, &[], LaunchMode::Direct)
            .unwrap();
        match wait_for_exit(&mut process) {
            ProcessState::Exited(status) => assert_eq!(status.code(), Some(3)),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_thread_launch_resolves_to_child() {
        let command = RendererCommand::new("sh").with_args(["-c", "exit 0"]);
        let mut process = SubprocessLauncher
            .launch(&command, &[], LaunchMode::Thread)
            .unwrap();
        match wait_for_exit(&mut process) {
            ProcessState::Exited(status) => assert!(status.success()),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_thread_launch_of_missing_binary_fails_on_poll() {
        let command = RendererCommand::new("/definitely/not/a/renderer");
        let mut process = SubprocessLauncher
            .launch(&command, &[], LaunchMode::Thread)
            .unwrap();
        assert!(matches!(
            wait_for_exit(&mut process),
            ProcessState::LaunchFailed(_)
        ));
    }

    #[test]
    fn test_kill_stops_running_child() {
        let command = RendererCommand::new("sleep");
        let mut process = SubprocessLauncher
            .launch(&command, &["30".to_string()], LaunchMode::Direct)
            .unwrap();
        assert_eq!(process.poll_exit(), ProcessState::Running);
        process.kill().unwrap();
        assert!(matches!(process.poll_exit(), ProcessState::Exited(_)));
    }
}
