pub mod decoder;
mod derive;
pub mod reader;
mod registers;
pub mod schema;
pub mod tables;

pub use decoder::{DecodeError, Payload, RegisterBlock};
pub use reader::{ModbusReader, RegisterReader, TransportError};
pub use registers::DEFAULT_UNIT_ID;

use schema::{Device, CLASSIC};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PollError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Polls one MidNite Classic, one read per register block.
pub struct ClassicClient<R> {
    host: String,
    layout: &'static Device,
    reader: R,
}

impl<R: RegisterReader> ClassicClient<R> {
    pub fn new(host: impl Into<String>, reader: R) -> Self {
        Self { host: host.into(), layout: &CLASSIC, reader }
    }

    async fn read_blocks(&mut self) -> Result<Vec<RegisterBlock>, TransportError> {
        let mut blocks = Vec::with_capacity(self.layout.blocks.len());

        for block in self.layout.blocks {
            let words = self.reader.read_registers(block.start, block.word_count() as u16).await?;
            blocks.push(RegisterBlock { start_address: block.start, words });
        }

        Ok(blocks)
    }

    /// Reads every block and decodes them into one payload, tagged with the
    /// controller's address under `IP`.
    pub async fn poll(&mut self) -> Result<Payload, PollError> {
        let blocks = self.read_blocks().await;
        self.reader.finish().await;

        let mut payload = decoder::decode_device(self.layout, &blocks?)?;
        payload.insert("IP", self.host.as_str());

        Ok(payload)
    }
}
