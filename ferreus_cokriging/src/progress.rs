/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines progress reporting messages, sinks, and helper functions for long-running processes.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Progress reporting primitives for solving and evaluating potential fields.

use std::fmt::Debug;
use std::sync::{Arc, mpsc};
use std::thread;

/// Progress events emitted while building and using a model.
#[derive(Debug, Clone)]
pub enum ProgressMsg {
    /// The kriging system has been assembled.
    SystemAssembled {
        size: usize,
        num_gradients: usize,
        num_interfaces: usize,
        num_drift: usize,
    },

    /// The kriging system has been solved with the given backward error.
    SystemSolved { backward_error: f64 },

    /// A chunk of query points has been evaluated.
    EvaluationProgress { evaluated: usize, total: usize, progress: f64 },

    /// Progress for isosurface extraction.
    SurfacingProgress { isovalue: f64, progress: f64 },

    /// Arbitrary informational message.
    Message { message: String },
}

/// Sink that consumes progress messages.
pub trait ProgressSink: Send + Sync + Debug {
    fn emit(&self, msg: ProgressMsg);
}

/// Progress sink that forwards messages over a channel.
#[derive(Debug)]
pub struct ClosureSink {
    tx: mpsc::SyncSender<ProgressMsg>,
}

impl ProgressSink for ClosureSink {
    #[inline]
    fn emit(&self, msg: ProgressMsg) {
        let _ = self.tx.try_send(msg);
    }
}

/// Spawns a listener thread that runs a handler closure for each progress message.
///
/// The listener exits once every clone of the returned sink has been dropped.
pub fn closure_sink<F>(
    buffer: usize,
    mut handler: F,
) -> (Arc<dyn ProgressSink>, thread::JoinHandle<()>)
where
    F: FnMut(ProgressMsg) + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel::<ProgressMsg>(buffer.max(1));
    let sink: Arc<dyn ProgressSink> = Arc::new(ClosureSink { tx });

    let handle = thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            handler(msg);
        }
    });

    (sink, handle)
}

/// Fraction of work done, clamped to `[0, 1]`.
#[inline]
pub(crate) fn fraction(done: usize, total: usize) -> f64 {
    match total {
        0 => 1.0,
        _ => (done as f64 / total as f64).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;
    use std::sync::Mutex;

    #[test]
    fn closure_sink_forwards_messages() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&received);
        let (sink, handle) = closure_sink(8, move |msg| {
            if let ProgressMsg::Message { message } = msg {
                store.lock().unwrap().push(message);
            }
        });

        sink.emit(ProgressMsg::Message { message: "assembled".to_string() });
        sink.emit(ProgressMsg::SystemSolved { backward_error: 0.0 });
        drop(sink);
        handle.join().unwrap();

        assert!(*received.lock().unwrap() == vec!["assembled".to_string()]);
    }

    #[test]
    fn fraction_is_clamped() {
        assert!(fraction(0, 0) == 1.0);
        assert!(fraction(5, 10) == 0.5);
        assert!(fraction(11, 10) == 1.0);
    }
}
