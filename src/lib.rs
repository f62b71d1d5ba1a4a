//! A small blocking Rust client for the Frappe / ERPNext REST resource API.
//!
//! Every method maps to one request against `<site>/api/resource/...` and
//! returns the decoded JSON body as a [`serde_json::Value`].
//!
//! ## Quick start
//! - Configure credentials via environment variables (`API_KEY`, `API_SECRET`) or a
//!   `settings.ini` / `.env` file (searched from the current directory upwards).
//! - Create a [`Client`] for your site and call the document methods.
//!
//! ```no_run
//! use anyhow::Result;
//! use frappe_client::{Client, Filter, ListQuery};
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env("https://erp.example.com")?;
//!
//!     let created = client.create_document("Task", &json!({ "subject": "Ship it" }))?;
//!     let name = created["data"]["name"].as_str().unwrap_or_default().to_string();
//!
//!     client.update_document("Task", &name, &json!({ "status": "Working" }))?;
//!
//!     let open = client.list_documents(
//!         "Task",
//!         &ListQuery::new()
//!             .filter(Filter::new("status", "=", "Open"))
//!             .limit_page_length(20)
//!             .order_by("modified desc"),
//!     )?;
//!     println!("{}", open["data"]);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
mod config;
mod error;
mod query;

pub use client::Client;
pub use config::{ClientConfig, Credentials};
pub use error::{Error, Result};
pub use query::{Fields, Filter, ListQuery};
