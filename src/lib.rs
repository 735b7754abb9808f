// src/lib.rs

pub mod buffer;
pub mod config;
pub mod error;
pub mod grid;
pub mod harness;
pub mod hierarchy;
pub mod kernels;
pub mod matrix;
pub mod reference;
pub mod vector;
