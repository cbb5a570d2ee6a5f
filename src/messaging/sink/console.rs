use super::OutputSink;
use crate::messaging::error::SinkError;
use crate::messaging::format::Formatter;
use crate::messaging::message::Delivery;
use std::io::{self, Write};

/// Writes rendered messages to stdout (or any writer), flushing per message.
pub struct ConsoleSink<W = io::Stdout> {
    formatter: Formatter,
    out: W,
}

impl ConsoleSink {
    pub fn stdout(formatter: Formatter) -> Self {
        Self::new(formatter, io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(formatter: Formatter, out: W) -> Self {
        Self { formatter, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> OutputSink for ConsoleSink<W> {
    fn emit(&mut self, delivery: &Delivery) -> Result<(), SinkError> {
        let record = self.formatter.render(delivery)?;
        self.out.write_all(&record)?;
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}
