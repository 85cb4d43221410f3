pub mod api;

pub use perfhub_core::{db, models, progress};
