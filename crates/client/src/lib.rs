//! Farming bot client: logging setup and OS backends.
//!
//! # Architecture
//!
//! ```text
//! farmbot (binary, composition root)
//!   ├─→ client-bootstrap (config, templates, Bot assembly)
//!   └─→ backend
//!         ├─→ replay  (screenshots from disk, dry-run keys, tick limit)
//!         └─→ desktop (xcap capture, enigo keys, device_query hotkey)
//! ```

pub mod backend;
pub mod logging;
