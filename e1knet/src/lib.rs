#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod driver;

pub use driver::*;
