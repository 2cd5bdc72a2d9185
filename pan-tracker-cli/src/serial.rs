//! Serial link to the motor controller
//!
//! A single task owns the port and is the only writer. It keeps trying to
//! open the port, reports the first successful open, then writes every motor
//! command it receives and logs whatever the controller sends back.

use crate::config::SerialConfig;
use pan_tracker_core::{CommandSink, MotorCommand, TrackerError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Why a writer loop ended
#[derive(Debug)]
pub enum WriterExit {
    /// All command senders are gone
    Closed,
    /// The port failed; the command that could not be written is returned
    Failed(MotorCommand, std::io::Error),
}

/// Command sink handing commands to the serial task
#[derive(Debug, Clone)]
pub struct SerialSink {
    tx: mpsc::UnboundedSender<MotorCommand>,
}

impl SerialSink {
    pub fn new(tx: mpsc::UnboundedSender<MotorCommand>) -> Self {
        Self { tx }
    }
}

impl CommandSink for SerialSink {
    fn transmit(&mut self, command: MotorCommand) -> pan_tracker_core::Result<()> {
        self.tx
            .send(command)
            .map_err(|_| TrackerError::Transport("serial writer has stopped".to_string()))
    }
}

/// Open the configured port, retrying until it succeeds
async fn open_port(config: &SerialConfig) -> SerialStream {
    let retry = Duration::from_millis(config.reopen_interval.max(1));
    loop {
        match tokio_serial::new(&config.port, config.baudrate).open_native_async() {
            Ok(stream) => {
                log::info!("Serial port {} open at {} baud", config.port, config.baudrate);
                return stream;
            }
            Err(e) => {
                log::warn!(
                    "Could not open serial port {}: {} (retrying in {}ms)",
                    config.port,
                    e,
                    retry.as_millis()
                );
                tokio::time::sleep(retry).await;
            }
        }
    }
}

/// Log every line received from the controller until the stream ends
pub async fn log_incoming<R: AsyncRead + Unpin>(reader: R) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => log::info!("incoming serial: {}", line),
            Ok(None) => break,
            Err(e) => {
                log::debug!("Serial read stopped: {}", e);
                break;
            }
        }
    }
}

/// Write commands as newline-terminated text until the channel closes or a write fails
pub async fn write_commands<W: AsyncWrite + Unpin>(
    writer: &mut W,
    commands: &mut mpsc::UnboundedReceiver<MotorCommand>,
) -> WriterExit {
    while let Some(command) = commands.recv().await {
        let line = command.to_line();
        log::trace!("serial write {:?}", line);
        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = result {
            return WriterExit::Failed(command, e);
        }
    }
    WriterExit::Closed
}

/// Drop every command queued while the port was down
///
/// Returns how many were dropped. Replaying them would sweep the motor
/// through stale positions.
pub fn discard_backlog(commands: &mut mpsc::UnboundedReceiver<MotorCommand>) -> usize {
    let mut dropped = 0;
    while commands.try_recv().is_ok() {
        dropped += 1;
    }
    dropped
}

/// Serial task body
///
/// `opened` fires once, on the first successful open. Later reopens after a
/// write failure are silent.
pub async fn run(
    config: SerialConfig,
    opened: oneshot::Sender<()>,
    mut commands: mpsc::UnboundedReceiver<MotorCommand>,
) {
    let mut opened = Some(opened);

    loop {
        let stream = open_port(&config).await;
        let (reader, mut writer) = tokio::io::split(stream);
        let reader_task = tokio::spawn(log_incoming(reader));

        match opened.take() {
            Some(tx) => {
                if tx.send(()).is_err() {
                    log::debug!("Nobody is waiting for the serial open signal");
                }
            }
            None => {
                let dropped = discard_backlog(&mut commands);
                if dropped > 0 {
                    log::warn!("Discarded {} stale motor commands queued while the port was down", dropped);
                }
            }
        }

        let exit = write_commands(&mut writer, &mut commands).await;
        reader_task.abort();

        match exit {
            WriterExit::Closed => {
                log::debug!("Command channel closed, serial task exiting");
                return;
            }
            WriterExit::Failed(command, e) => {
                log::error!("Serial write of {:?} failed: {}; reopening port", command.to_string(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_commands_written_as_lines() {
        let (mut port, mut device) = tokio::io::duplex(256);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = SerialSink::new(tx);

        sink.transmit(MotorCommand::zero()).unwrap();
        sink.transmit(MotorCommand::angle(30.0)).unwrap();
        sink.transmit(MotorCommand::fixed(-12.34, 1)).unwrap();
        drop(sink);

        let exit = write_commands(&mut port, &mut rx).await;
        assert!(matches!(exit, WriterExit::Closed));
        drop(port);

        let mut written = String::new();
        device.read_to_string(&mut written).await.unwrap();
        assert_eq!(written, "0\n30\n-12.3\n");
    }

    #[tokio::test]
    async fn test_reopen_skips_stale_commands() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = SerialSink::new(tx);
        for i in 0..500 {
            sink.transmit(MotorCommand::angle(i as f64)).unwrap();
        }

        assert_eq!(discard_backlog(&mut rx), 500);

        sink.transmit(MotorCommand::angle(-7.5)).unwrap();
        drop(sink);

        let (mut port, mut device) = tokio::io::duplex(256);
        let exit = write_commands(&mut port, &mut rx).await;
        assert!(matches!(exit, WriterExit::Closed));
        drop(port);

        let mut written = String::new();
        device.read_to_string(&mut written).await.unwrap();
        assert_eq!(written, "-7.5\n");
    }

    #[tokio::test]
    async fn test_sink_reports_stopped_writer() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = SerialSink::new(tx);

        let err = sink.transmit(MotorCommand::zero()).unwrap_err();
        assert!(matches!(err, TrackerError::Transport(_)));
    }

    #[tokio::test]
    async fn test_log_incoming_consumes_crlf_lines() {
        let (mut device, port) = tokio::io::duplex(64);
        device.write_all(b"ready\r\npos 12\r\n").await.unwrap();
        drop(device);

        // Completes once the device side closes
        log_incoming(port).await;
    }
}
