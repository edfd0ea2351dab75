//! abqinv-client: read-only Abiquo API client
//!
//! Provides the [`CloudApi`] trait the inventory builder consumes and an
//! HTTP implementation of it, authenticated with basic auth or OAuth 1.0a.
//!
//! # Example
//!
//! ```no_run
//! use abqinv_client::{AbiquoClient, CloudApi, Credentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let creds = Credentials::Basic {
//!     username: "admin".into(),
//!     password: Some("xabiquo".into()),
//! };
//! let client = AbiquoClient::new("https://abiquo.example.com/api", creds)?;
//!
//! for vm in client.virtual_machines().await? {
//!     let nics = client.nics(&vm).await?;
//!     println!("{}: {} nics", vm.name, nics.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod error;
pub mod http;
pub mod traits;

pub use auth::{Credentials, OAuth1Credentials};
pub use error::{ClientError, Result};
pub use http::AbiquoClient;
pub use traits::CloudApi;
