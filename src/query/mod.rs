//! Filter model and SQL predicate construction; no I/O happens here.

pub mod conditions;
pub mod dates;
pub mod filter;
pub mod sources;
