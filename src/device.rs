//! # Device Channel
//!
//! The oven controller is a line-oriented duplex stream: it reports one
//! message per line and accepts one command per line (`stop`,
//! `select profile <id>`, `reflow`, ...).
//!
//! [`DeviceChannel`] abstracts that stream. [`LineChannel`] implements it over
//! any buffered reader/writer pair, which covers the serial port as well as
//! recorded transcripts and in-memory test fixtures.

use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;

use log::{debug, info, warn};
use serialport::SerialPort;

/// Default serial baud rate of the controller.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default read timeout; timeouts are retried so reads stay blocking.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors raised by a device channel
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The device went away or the stream ended
    #[error("Device channel closed")]
    Closed,

    /// A candidate port could not be opened at the requested settings
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        /// Port name
        port: String,
        /// Underlying error
        source: serialport::Error,
    },

    /// No candidate port could be opened
    #[error("No usable serial port found")]
    NoDevice,

    /// Serial ports could not be enumerated
    #[error("Failed to enumerate serial ports: {0}")]
    Enumerate(#[source] serialport::Error),

    /// I/O error on an open channel
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// Bidirectional line stream to the controller
pub trait DeviceChannel {
    /// Block until the next line arrives; the line terminator is stripped.
    ///
    /// Returns [`ChannelError::Closed`] once the stream is exhausted.
    fn read_line(&mut self) -> Result<String, ChannelError>;

    /// Send one command line.
    fn write_line(&mut self, command: &str) -> Result<(), ChannelError>;
}

/// [`DeviceChannel`] over a buffered reader and a writer
pub struct LineChannel<R, W> {
    reader: R,
    writer: W,
    buf: Vec<u8>,
}

impl<R: BufRead, W: Write> LineChannel<R, W> {
    /// Channel reading lines from `reader` and writing commands to `writer`.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            buf: Vec::with_capacity(128),
        }
    }

    /// Consume the channel, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<R: BufRead, W: Write> DeviceChannel for LineChannel<R, W> {
    fn read_line(&mut self) -> Result<String, ChannelError> {
        self.buf.clear();

        loop {
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) if self.buf.is_empty() => return Err(ChannelError::Closed),
                Ok(_) => break,
                // bytes read before the timeout stay in `buf`
                Err(e) if is_retryable(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let line = String::from_utf8_lossy(&self.buf);
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn write_line(&mut self, command: &str) -> Result<(), ChannelError> {
        debug!("> {}", command);
        self.writer.write_all(command.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

fn is_retryable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

/// Channel over an open serial port
pub type SerialChannel = LineChannel<BufReader<Box<dyn SerialPort>>, Box<dyn SerialPort>>;

/// Open `port` at `baud_rate`.
pub fn open_serial(port: &str, baud_rate: u32, timeout: Duration) -> Result<SerialChannel, ChannelError> {
    let open_error = |source| ChannelError::Open {
        port: port.to_string(),
        source,
    };

    let reader = serialport::new(port, baud_rate)
        .timeout(timeout)
        .open()
        .map_err(open_error)?;
    let writer = reader.try_clone().map_err(open_error)?;

    Ok(LineChannel::new(BufReader::new(reader), writer))
}

/// Open the first candidate that accepts the requested settings.
///
/// Failing candidates are reported and skipped.
pub fn open_first<S: AsRef<str>>(
    candidates: &[S],
    baud_rate: u32,
    timeout: Duration,
) -> Result<SerialChannel, ChannelError> {
    for candidate in candidates {
        let port = candidate.as_ref();
        match open_serial(port, baud_rate, timeout) {
            Ok(channel) => {
                info!("Using serial port {}", port);
                return Ok(channel);
            }
            Err(e) => {
                warn!("Tried serial port {}, but failed.", port);
                debug!("{}", e);
            }
        }
    }

    Err(ChannelError::NoDevice)
}

/// Serial ports present on this system that can be opened.
///
/// Each enumerated port is checked by opening and immediately closing it.
pub fn list_candidate_ports() -> Result<Vec<String>, ChannelError> {
    let ports = serialport::available_ports().map_err(ChannelError::Enumerate)?;

    Ok(ports
        .into_iter()
        .map(|info| info.port_name)
        .filter(|name| can_open(name))
        .collect())
}

fn can_open(port: &str) -> bool {
    match serialport::new(port, DEFAULT_BAUD_RATE).open() {
        Ok(handle) => {
            drop(handle);
            true
        }
        Err(e) => {
            debug!("Skipping {}: {}", port, e);
            false
        }
    }
}
