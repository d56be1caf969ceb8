use log::debug;
use std::{future::Future, io, net::SocketAddr, time::Duration};
use thiserror::Error;
use tokio::{net, time};
use tokio_modbus::{
    client::{tcp, Context},
    prelude::{ExceptionCode, Reader},
    Address, Slave,
};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("unable to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("unable to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("connecting to {host}:{port} timed out after {timeout:?}")]
    ConnectTimeout { host: String, port: u16, timeout: Duration },
    #[error("modbus request failed: {0}")]
    Modbus(#[from] tokio_modbus::Error),
    #[error("controller answered with exception {0:?}")]
    Exception(ExceptionCode),
    #[error("request for {count} registers at {start} timed out after {timeout:?}")]
    Timeout {
        start: Address,
        count: u16,
        timeout: Duration,
    },
    #[error("asked for {expected} registers at {start}, got {actual}")]
    ShortRead {
        start: Address,
        expected: usize,
        actual: usize,
    },
}

/// Source of raw holding registers for one controller.
pub trait RegisterReader {
    /// Returns exactly `count` words or fails.
    fn read_registers(
        &mut self,
        start: Address,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, TransportError>> + Send;

    /// Called once every block of a poll cycle has been read.
    fn finish(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

fn exact(start: Address, count: u16, words: Vec<u16>) -> Result<Vec<u16>, TransportError> {
    if words.len() == count as usize {
        Ok(words)
    } else {
        Err(TransportError::ShortRead {
            start,
            expected: count as usize,
            actual: words.len(),
        })
    }
}

async fn connect(host: &str, port: u16, slave: Slave) -> Result<Context, TransportError> {
    let resolve_error = |source| TransportError::Resolve { host: host.to_owned(), source };

    let addr = net::lookup_host((host, port))
        .await
        .map_err(resolve_error)?
        .next()
        .ok_or_else(|| resolve_error(io::Error::new(io::ErrorKind::NotFound, "no addresses found")))?;

    debug!("Opening modbus connection to {addr}");

    tcp::connect_slave(addr, slave)
        .await
        .map_err(|source| TransportError::Connect { addr, source })
}

/// Modbus/TCP reader. The host is resolved on every connect, so an address
/// change is picked up at the next cycle.
pub struct ModbusReader {
    host: String,
    port: u16,
    slave: Slave,
    timeout: Duration,
    keep_connection: bool,
    context: Option<Context>,
}

impl ModbusReader {
    pub fn new(host: String, port: u16, unit_id: u8, timeout: Duration, keep_connection: bool) -> Self {
        Self {
            host,
            port,
            slave: Slave(unit_id),
            timeout,
            keep_connection,
            context: None,
        }
    }

    async fn connection(&mut self) -> Result<&mut Context, TransportError> {
        let context = match self.context.take() {
            Some(context) => context,
            None => time::timeout(self.timeout, connect(&self.host, self.port, self.slave))
                .await
                .map_err(|_| TransportError::ConnectTimeout {
                    host: self.host.clone(),
                    port: self.port,
                    timeout: self.timeout,
                })??,
        };

        Ok(self.context.insert(context))
    }
}

impl RegisterReader for ModbusReader {
    async fn read_registers(&mut self, start: Address, count: u16) -> Result<Vec<u16>, TransportError> {
        let timeout = self.timeout;
        let context = self.connection().await?;

        let result = match time::timeout(timeout, context.read_holding_registers(start, count)).await {
            Err(_) => Err(TransportError::Timeout { start, count, timeout }),
            Ok(Err(e)) => Err(TransportError::Modbus(e)),
            Ok(Ok(Err(code))) => Err(TransportError::Exception(code)),
            Ok(Ok(Ok(words))) => exact(start, count, words),
        };

        if result.is_err() {
            // the stream may be out of step with the controller now
            self.context = None;
        }

        result
    }

    async fn finish(&mut self) {
        if !self.keep_connection && self.context.take().is_some() {
            debug!("Closing modbus connection to {}:{}", self.host, self.port);
        }
    }
}
