//! Model gateway implementations for envhub.
//!
//! All gateways implement the `envhub_core::ModelGateway` trait.

pub mod openai;

pub use openai::OpenAiGateway;
