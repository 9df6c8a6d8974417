extern crate rs_core;

pub mod http;
