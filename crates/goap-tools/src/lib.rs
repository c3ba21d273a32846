//! Tooling primitives for GOAP agents.
//!
//! Planners record their decisions as [`TraceEvent`]s in the agent's blackboard. Tests read them
//! back from a [`TraceLog`]; hosts stream them into a [`TraceSink`], or into `tracing` with
//! [`TracingSink`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{
    emit, TraceEvent, TraceLog, TraceSink, TracingSink, VecTraceSink, TRACE_LOG, TRACE_SINK,
};
