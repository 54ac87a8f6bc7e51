//! Command dispatcher
//!
//! Turns command-line arguments (or form answers) into validated requests
//! and executes them: build the compose document, write it, bring it up.

pub mod dispatch;
pub mod request;

pub use dispatch::{expose, record_exposures, write_rows, Dispatcher, ServiceRow, NOT_CREATED};
pub use request::{
    needs_prompt, CreateOptions, DevInput, DevRequest, ExposeInput, ExposeRequest, ServiceInput,
    ServiceRequest,
};
