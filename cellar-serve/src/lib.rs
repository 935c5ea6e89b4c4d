//! # cellar-serve
//!
//! Web front end for a trained Cellar model: a prediction form, a training
//! trigger and a health endpoint.

pub mod error;
pub mod server;
pub mod state;
pub mod views;

pub use error::ServeError;
pub use server::{router, run};
pub use state::{AppState, ModelHandle};
pub use views::Views;
