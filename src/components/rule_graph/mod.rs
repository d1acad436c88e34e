mod builder;
mod component;
mod config;
mod error;
mod filter;
mod interaction;
mod render;
mod simulation;
mod snapshot;
mod state;
mod style;
mod traversal;
mod types;


pub use component::RuleGraphCanvas;
pub use config::{GraphConfig, Palette};
pub use error::parse_catalog;
pub use types::{CatalogEntry, RuleDetails};
