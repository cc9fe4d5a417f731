//! Integration tests for the io module

mod arena;
mod memlist;
