//! Monitored sessions
//!
//! Pipe mode reads stdin. Wrap mode runs a command inside a pseudo-terminal
//! so it keeps its interactive behaviour. In both, every output chunk is
//! echoed unchanged to stdout and handed to the activity monitor.

use crate::audio::{OutputConfig, SoundEngine};
use crate::error::Result;
use crate::monitor::{ActivityMonitor, MonitorConfig, SoundSink};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Read size for captured output
pub const CHUNK_SIZE: usize = 1024;
/// Time given to the ring to play out after the input ends
const DRAIN: Duration = Duration::from_millis(500);

/// Copy `reader` to `writer` chunk by chunk, feeding each chunk to the
/// monitor. Returns the number of bytes copied.
pub fn pump<R, W, S>(reader: &mut R, writer: &mut W, monitor: &ActivityMonitor<S>) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    S: SoundSink + ?Sized,
{
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        monitor.process_chunk(&buf[..n], Instant::now());
        writer.write_all(&buf[..n])?;
        writer.flush()?;
        total += n as u64;
    }
}

/// Monitor stdin, echoing it to stdout
pub fn run_pipe(engine: Arc<SoundEngine>, config: MonitorConfig) -> Result<()> {
    engine.start(&OutputConfig::default())?;
    let monitor = Arc::new(ActivityMonitor::new(Arc::clone(&engine), config, Instant::now()));
    let ticker = monitor.spawn_ticker()?;
    info!("Pipe mode started");

    let result = pump(&mut io::stdin().lock(), &mut io::stdout().lock(), &*monitor);
    if let Ok(bytes) = result {
        debug!("Input closed after {} bytes", bytes);
        thread::sleep(DRAIN);
    }

    ticker.stop();
    engine.stop();
    result?;
    Ok(())
}

/// Split a command line on whitespace. Quoting is not interpreted.
pub fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

/// Run `command` in a pseudo-terminal and monitor its output.
/// Returns the command's exit code.
#[cfg(unix)]
pub fn run_wrap(command: &str, engine: Arc<SoundEngine>, config: MonitorConfig) -> Result<i32> {
    use crate::error::MurmurError;

    let argv = split_command(command);
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| MurmurError::Spawn("empty command".to_string()))?;

    engine.start(&OutputConfig::default())?;
    let monitor = Arc::new(ActivityMonitor::new(Arc::clone(&engine), config, Instant::now()));
    let ticker = monitor.spawn_ticker()?;

    let result = pty::wrap(program, args, &*monitor);

    ticker.stop();
    engine.stop();
    result
}

#[cfg(not(unix))]
pub fn run_wrap(_command: &str, _engine: Arc<SoundEngine>, _config: MonitorConfig) -> Result<i32> {
    Err(crate::error::MurmurError::Spawn(
        "wrapping a command needs a Unix pseudo-terminal; use --pipe instead".to_string(),
    ))
}

#[cfg(unix)]
mod pty {
    use crate::error::{MurmurError, Result};
    use crate::monitor::{ActivityMonitor, SoundSink};
    use std::fs::File;
    use std::io::{self, Read, Write};
    use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};
    use std::os::unix::process::CommandExt;
    use std::process::{Command, Stdio};
    use std::thread;
    use tracing::{debug, info, warn};

    /// Puts a terminal in raw mode, restores it on drop
    struct RawMode {
        fd: RawFd,
        saved: libc::termios,
    }

    impl RawMode {
        fn enable(fd: RawFd) -> io::Result<Option<Self>> {
            if unsafe { libc::isatty(fd) } != 1 {
                return Ok(None);
            }
            let mut saved: libc::termios = unsafe { std::mem::zeroed() };
            if unsafe { libc::tcgetattr(fd, &mut saved) } != 0 {
                return Err(io::Error::last_os_error());
            }
            let mut raw = saved;
            unsafe { libc::cfmakeraw(&mut raw) };
            if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw) } != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(Some(Self { fd, saved }))
        }
    }

    impl Drop for RawMode {
        fn drop(&mut self) {
            unsafe {
                libc::tcsetattr(self.fd, libc::TCSADRAIN, &self.saved);
            }
        }
    }

    /// Open a master/slave pair sized like the user's terminal
    fn open_pty() -> io::Result<(File, File)> {
        let mut size: libc::winsize = unsafe { std::mem::zeroed() };
        let has_size =
            unsafe { libc::ioctl(libc::STDIN_FILENO, libc::TIOCGWINSZ, &mut size) } == 0;
        if !has_size {
            size.ws_row = 24;
            size.ws_col = 80;
        }

        let mut master: RawFd = -1;
        let mut slave: RawFd = -1;
        let rc = unsafe {
            libc::openpty(
                &mut master,
                &mut slave,
                std::ptr::null_mut(),
                std::ptr::null_mut::<libc::termios>(),
                &mut size,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(unsafe { (File::from_raw_fd(master), File::from_raw_fd(slave)) })
    }

    pub(super) fn wrap<S>(program: &str, args: &[String], monitor: &ActivityMonitor<S>) -> Result<i32>
    where
        S: SoundSink + ?Sized,
    {
        let (mut master, slave) = open_pty()?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::from(slave.try_clone()?))
            .stdout(Stdio::from(slave.try_clone()?))
            .stderr(Stdio::from(slave.try_clone()?));
        // New session with the pty as controlling terminal
        unsafe {
            command.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                if libc::ioctl(libc::STDIN_FILENO, libc::TIOCSCTTY as _, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
        let mut child = command
            .spawn()
            .map_err(|e| MurmurError::Spawn(format!("{}: {}", program, e)))?;
        // Only the child may hold the slave, or the master never sees EOF
        drop(command);
        drop(slave);
        info!("Wrapping {} (pid {})", program, child.id());

        let raw_mode = RawMode::enable(libc::STDIN_FILENO)?;

        let mut to_child = master.try_clone()?;
        thread::Builder::new()
            .name("murmur-stdin".to_string())
            .spawn(move || {
                let mut stdin = io::stdin().lock();
                let mut buf = [0u8; super::CHUNK_SIZE];
                loop {
                    match stdin.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if to_child.write_all(&buf[..n]).is_err() {
                                break;
                            }
                        }
                    }
                }
            })?;

        let pumped = super::pump(&mut master, &mut io::stdout().lock(), monitor);
        drop(raw_mode);

        match pumped {
            Ok(bytes) => debug!("Child output closed after {} bytes", bytes),
            // Linux reports a hung-up pty as EIO
            Err(e) if e.raw_os_error() == Some(libc::EIO) => debug!("Child hung up the pty"),
            Err(e) => warn!("Reading child output failed: {}", e),
        }
        debug!("Master fd {} closing", master.as_raw_fd());

        let status = child.wait()?;
        info!("{} exited with {}", program, status);
        Ok(status.code().unwrap_or(1))
    }
}
