//! Subsonic protocol adapter.
//!
//! # Architecture
//!
//! - **Envelope** (`envelope.rs`) - the root wrapper of every response
//! - **Params** (`params.rs`) - typed, explicitly failing parameter lookup
//! - **Negotiation** (`format.rs`) - picks XML, JSON or JSONP from `f`
//! - **Encoding** (`encode.rs`, `xml.rs`) - serializes the envelope through a
//!   first-error-wins writer
//! - **Handler adapter** (`handler.rs`) - runs pure and stream-writing
//!   handlers and encodes whatever envelope they return
//! - **Controller** (`ctrl.rs`) - shared startup state and the `/rest` router
//!
//! # Usage
//!
//! ```ignore
//! use subsonic::ctrl::{Controller, router};
//!
//! let ctrl = Arc::new(Controller::builder().music_paths(paths).build());
//! let app = router(ctrl);
//! axum::serve(listener, app).await?;
//! ```

pub mod ctrl;
pub mod encode;
pub mod envelope;
pub mod format;
pub mod handler;
pub mod handlers;
pub mod params;
pub mod xml;

pub use ctrl::{Controller, UserDirectory, router};
pub use encode::ResponseEncoder;
