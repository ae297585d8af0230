//! Runtime configuration: [`Settings`] loaded from TOML or built in code,
//! and the [`Configuration`] registry of mapped statements.

mod configuration;
mod settings;

pub use configuration::Configuration;
pub use settings::{PlaceholderStyle, Settings};

#[cfg(test)]
mod tests;
