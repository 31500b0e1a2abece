//! Core components for signing requests and polling asynchronous tasks.
//!
//! This crate provides the foundational types for the reqpoll ecosystem:
//! cloud AI endpoints that accept a signed HTTP request, return a task id,
//! and expect the caller to poll a status endpoint until the job reaches a
//! terminal state.
//!
//! ## Overview
//!
//! The crate is built around a few key concepts:
//!
//! - **Context**: a container holding the environment and HTTP transport
//!   implementations, so nothing reads process globals directly
//! - **Traits**: [`ProvideCredential`] for credential loading, [`SignRequest`]
//!   for scheme-specific signing, [`QueryTask`] for task status lookups
//! - **Signer**: orchestrates credential loading and request signing
//! - **Poller**: drives a submitted task to a terminal state under a bounded
//!   attempt budget, with cancellation and progress reporting
//! - **retry**: bounded retry with exponential backoff for transient network
//!   failures
//!
//! ## Example
//!
//! ```no_run
//! use reqpoll_core::{
//!     Context, ProvideCredential, Signer, SignRequest, SigningCredential,
//! };
//! use async_trait::async_trait;
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     key: String,
//!     secret: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.key.is_empty() && !self.secret.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MyProvider;
//!
//! #[async_trait]
//! impl ProvideCredential for MyProvider {
//!     type Credential = MyCredential;
//!
//!     async fn provide_credential(
//!         &self,
//!         ctx: &Context,
//!     ) -> reqpoll_core::Result<Option<Self::Credential>> {
//!         Ok(ctx.env_var("MY_KEY").zip(ctx.env_var("MY_SECRET")).map(
//!             |(key, secret)| MyCredential { key, secret },
//!         ))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MySigner;
//!
//! #[async_trait]
//! impl SignRequest for MySigner {
//!     type Credential = MyCredential;
//!
//!     async fn sign_request(
//!         &self,
//!         _ctx: &Context,
//!         _req: &mut http::request::Parts,
//!         _body: &[u8],
//!         _cred: Option<&Self::Credential>,
//!     ) -> reqpoll_core::Result<()> {
//!         todo!()
//!     }
//! }
//!
//! # async fn example() -> reqpoll_core::Result<()> {
//! let ctx = Context::default();
//! let signer = Signer::new(ctx, MyProvider, MySigner);
//!
//! let mut parts = http::Request::builder()
//!     .method("POST")
//!     .uri("https://example.com")
//!     .body(())
//!     .unwrap()
//!     .into_parts()
//!     .0;
//!
//! signer.sign(&mut parts, b"{}").await?;
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::Context;
mod env;
pub use env::{Env, NoopEnv, OsEnv, StaticEnv};
mod http;
pub use crate::http::{HttpSend, NoopHttpSend};

mod error;
pub use error::{Error, ErrorKind, Result};

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod request;
pub use request::SigningRequest;
mod signer;
pub use signer::Signer;

mod poll;
pub use poll::{
    CancelFlag, PollOutcome, Poller, QueryTask, StatusVocabulary, TaskResult, TaskState,
    TaskStatus,
};
mod retry;
pub use retry::{retry_with_backoff, RetryPolicy};
