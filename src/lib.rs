#![warn(clippy::all, clippy::cargo)]

mod dlx;
mod hashlife;

pub use dlx::Problem;
pub use hashlife::{HashLifeEngine, Macrocell, Tile};
