//! Client facade and verb executors.
//!
//! Developer-friendly goal: keep the public surface small and predictable.
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;
pub mod dispatch;
pub mod execution;

pub use builder::ApiClientBuilder;
pub use core::ApiClient;
pub use dispatch::RequestBuilder;
pub use execution::{Executor, REQUEST_ID_HEADER};
