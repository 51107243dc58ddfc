//! Upstream data source: types and channels for feeding samples into the
//! pipeline, plus the input buffer the stage reads from.
//!
//! Producers hold a [`SourceSink`] and send [`SourceCommand`]s; the pipeline
//! driver drains the channel, applies each command to its [`InputBuffer`],
//! and recomputes the stage over the dirty range the command reports.

use std::sync::mpsc::{Receiver, Sender};

use crate::data::samples::Sample;

/// Capability interface the stage consumes: an ordered sequence of samples.
pub trait SampleSource {
    fn read_samples(&self) -> &[Sample];
}

/// Messages sent over the channel to update the upstream trace.
#[derive(Debug, Clone)]
pub enum SourceCommand {
    /// Replace the entire sample vector. Existing samples are discarded.
    SetData { samples: Vec<Sample> },
    /// Overwrite samples starting at index `begin`. The updated region must
    /// lie within the current data (`begin + samples.len() <= len`).
    UpdateRange { begin: usize, samples: Vec<Sample> },
    /// Remove all samples (resulting trace is empty).
    Clear,
}

/// Convenience sender for feeding samples into the pipeline.
#[derive(Clone)]
pub struct SourceSink {
    tx: Sender<SourceCommand>,
}

impl SourceSink {
    /// Replace the entire sample vector.
    pub fn set_data<I>(&self, samples: I) -> Result<(), std::sync::mpsc::SendError<SourceCommand>>
    where
        I: Into<Vec<Sample>>,
    {
        self.tx.send(SourceCommand::SetData {
            samples: samples.into(),
        })
    }

    /// Overwrite a contiguous run of samples starting at `begin`.
    pub fn update_range<I>(
        &self,
        begin: usize,
        samples: I,
    ) -> Result<(), std::sync::mpsc::SendError<SourceCommand>>
    where
        I: Into<Vec<Sample>>,
    {
        self.tx.send(SourceCommand::UpdateRange {
            begin,
            samples: samples.into(),
        })
    }

    /// Remove all samples.
    pub fn clear(&self) -> Result<(), std::sync::mpsc::SendError<SourceCommand>> {
        self.tx.send(SourceCommand::Clear)
    }
}

/// Create a new channel pair: `(SourceSink, Receiver<SourceCommand>)`.
pub fn channel_source() -> (SourceSink, Receiver<SourceCommand>) {
    let (tx, rx) = std::sync::mpsc::channel();
    (SourceSink { tx }, rx)
}

/// The materialized upstream trace, owned by the pipeline driver.
#[derive(Debug, Default)]
pub struct InputBuffer {
    samples: Vec<Sample>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Apply one command and return the half-open index range it dirtied.
    /// Out-of-bounds `UpdateRange` commands are clipped to the current data.
    pub fn apply(&mut self, cmd: SourceCommand) -> (usize, usize) {
        match cmd {
            SourceCommand::SetData { samples } => {
                self.samples = samples;
                (0, self.samples.len())
            }
            SourceCommand::UpdateRange { begin, samples } => {
                let begin = begin.min(self.samples.len());
                let end = (begin + samples.len()).min(self.samples.len());
                for (dst, src) in self.samples[begin..end].iter_mut().zip(samples) {
                    *dst = src;
                }
                (begin, end)
            }
            SourceCommand::Clear => {
                self.samples.clear();
                (0, 0)
            }
        }
    }
}

impl SampleSource for InputBuffer {
    fn read_samples(&self) -> &[Sample] {
        &self.samples
    }
}

impl SampleSource for [Sample] {
    fn read_samples(&self) -> &[Sample] {
        self
    }
}

impl SampleSource for Vec<Sample> {
    fn read_samples(&self) -> &[Sample] {
        self
    }
}
