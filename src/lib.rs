//! Named sets of integers, decimals or words: the `store` keeps them for a
//! session, the `archive` keeps them on disk, and `report` measures how alike
//! they are.
//!
//! Elements are parsed leniently by the `typed` module. A set holds one kind
//! of element, and combining sets of different kinds falls back to comparing
//! their elements as words. The generic operations underneath live in
//! `algebra`, which the `survey` module also uses to check the
//! inclusion–exclusion arithmetic of the three clubs problem.
//!
//! The `args` module parses the command line, `commands` runs one command,
//! and `session` is the interactive menu behind `setkeeper shell`.

#![deny(unused_must_use)]
#![deny(clippy::all)]
#![allow(clippy::needless_return)]
#![deny(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]
#![deny(missing_docs)]

pub mod algebra;
pub mod archive;
pub mod args;
pub mod commands;
pub mod console;
pub mod layout;
pub mod render;
pub mod report;
pub mod session;
pub mod store;
pub mod styles;
pub mod survey;
pub mod typed;
