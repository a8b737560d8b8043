//! verimath - verified arithmetic over stored value pairs
//!
//! A request names a stored pair and an operation. The pipeline plans the
//! work (optionally with an LLM), looks the pair up, runs the arithmetic tool,
//! independently re-checks the result, and formats a structured response.
//! Failed execution or verification loops back to execution a bounded number
//! of times.

pub mod domain;
pub mod error;
pub mod id;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod storage;
pub mod tools;

pub use error::{Result, VerimathError};
