pub mod auth;
pub mod client;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod errors;
pub mod item;
pub mod logging;
pub mod server;
pub mod services;
pub mod templates;

pub use client::RequestClient;
pub use controller::panel::{CrudPanel, PanelProps};
pub use errors::{CrudError, CrudResult};
pub use item::{FieldDescriptor, FieldValue, Item, ItemId};
