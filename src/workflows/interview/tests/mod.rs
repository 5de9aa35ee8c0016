mod common;
mod formula;
mod snapshot;
