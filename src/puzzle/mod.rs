pub mod common;
pub mod cube;
pub mod orientation;
pub mod ring;
pub mod tree;
