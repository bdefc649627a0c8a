use std::{env, path::Path, process::Stdio};

use anyhow::{Context, Result, anyhow};
use sysinfo::{ProcessesToUpdate, Signal, System, get_current_pid};
use tracing::info;

/// Terminates every other process started from the executable at `name`.
pub fn kill_previous_servers(name: &Path) -> Result<()> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get the current pid: {e}"))?;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping process {pid}");
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
        }
    }
    Ok(())
}

/// Shuts down the previous recorder and starts a new one writing into `app_dir`. The new one
/// runs as a detached `serve` of the current executable.
pub fn restart_server(app_dir: &Path, interval_secs: u64) -> Result<()> {
    let process_name = env::current_exe().context("Can't operate without an executable")?;
    kill_previous_servers(&process_name)?;
    let mut command = std::process::Command::new(process_name);
    command
        .arg("--dir")
        .arg(app_dir)
        .args(["serve", "--interval", &interval_secs.to_string()]);

    #[cfg(feature = "win")]
    {
        use std::os::windows::process::CommandExt;
        use windows::Win32::System::Threading::DETACHED_PROCESS;
        command.creation_flags(DETACHED_PROCESS.0);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    #[allow(clippy::zombie_processes)]
    let child = command.spawn().context("Failed to spawn the recorder")?;
    println!("Recording into {} (pid {})", app_dir.display(), child.id());
    Ok(())
}
