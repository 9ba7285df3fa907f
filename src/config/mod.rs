//! Configuration sources: everything that fills the store before
//! interpolation runs.
//!
//! Order of application (later writes win):
//!
//! 1. `-D key=value` overrides from the command line;
//! 2. the file named by the `application.properties` key, looked up in the
//!    overrides first and the environment second;
//! 3. each `-f` file, in the order given.
//!
//! # Module layout
//!
//! - **load** — `Sources`, `load`, `load_file`, `parse_override`, `expand_home`.
//! - **properties** — Java-style `.properties` parser.
//! - **toml_file** — TOML files flattened to dotted keys, with `[meta] base`
//!   inheritance chains.

mod load;
pub mod properties;
mod toml_file;

pub use load::{APPLICATION_PROPERTIES, Sources, expand_home, load, load_file, parse_override};
