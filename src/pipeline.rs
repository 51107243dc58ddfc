//! Pipeline driver: owns the input buffer and the stage, drains source
//! commands, and routes change notifications into recomputes.
//!
//! This is the single-owner seam the concurrency model relies on: all
//! mutation of the input buffer, the variable slots and the output buffer
//! happens through one `&mut MathPipeline` at a time.

use std::sync::mpsc::Receiver;

use crate::data::samples::DomainMode;
use crate::engine::ExpressionStage;
use crate::eval::Evaluator;
use crate::source::{InputBuffer, SourceCommand};
use crate::vars::PipelineRoot;

pub struct MathPipeline<E: Evaluator> {
    input: InputBuffer,
    stage: ExpressionStage<E>,
    rx: Receiver<SourceCommand>,
}

impl<E: Evaluator> MathPipeline<E> {
    /// Wire a stage to the receiving end of a
    /// [`channel_source`](crate::source::channel_source) pair.
    pub fn new(stage: ExpressionStage<E>, rx: Receiver<SourceCommand>) -> Self {
        Self {
            input: InputBuffer::new(),
            stage,
            rx,
        }
    }

    pub fn stage(&self) -> &ExpressionStage<E> {
        &self.stage
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    /// Edit the expression text and recompute the whole input.
    pub fn set_expression(&mut self, text: &str, root: &dyn PipelineRoot) {
        self.stage.apply_expression(text, &self.input, root);
    }

    /// Switch the domain mode and recompute the whole input.
    pub fn set_mode(&mut self, mode: DomainMode, root: &dyn PipelineRoot) {
        self.stage.apply_mode(mode, &self.input, root);
    }

    /// Drain all pending source commands, applying each to the input buffer
    /// and recomputing the stage over the range it dirtied. Returns the
    /// number of commands processed.
    pub fn poll(&mut self, root: &dyn PipelineRoot) -> usize {
        let mut processed = 0;
        while let Ok(cmd) = self.rx.try_recv() {
            let (begin, end) = self.input.apply(cmd);
            self.stage.apply_input_change(&self.input, root, begin, end);
            processed += 1;
        }
        processed
    }
}
