//! D-Bus implementations of the transport-facing contracts.
//!
//! The core modules only define the [`crate::session::RegistrarClient`] and
//! [`crate::session::MenuExporter`] seams; everything that actually touches
//! the bus lives here, built on zbus with the tokio executor.

pub mod menu_export;
pub mod registrar;

pub use menu_export::{exporter_factory, DbusMenuExporter};
pub use registrar::{BusRegistrarClient, RegistrarWatcher};
