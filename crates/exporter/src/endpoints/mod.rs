//! # Exporterエンドポイント

pub mod export;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use export::{handle_export, handle_export_public};
