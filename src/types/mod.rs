// src/types/mod.rs

pub mod common;

pub use common::{Batch, LoadResult, Point, RawPlacemarkRecord};
