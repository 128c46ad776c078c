//! Mirrors an application's in-process menu bar onto a system-wide appmenu
//! registrar over D-Bus.
//!
//! The application keeps owning its actions; this crate tracks the window's
//! identity, publishes a live mirror of the action tree at a stable object
//! path, performs the `RegisterWindow` handshake with the registrar and
//! recovers when the registrar restarts or is absent, falling back to the
//! in-window menu bar. Rendering (local or remote) is out of scope: the
//! widget toolkit plugs in through [`controller::LocalMenuBar`], the desktop
//! shell talks to the exported menu over the bus.

pub mod action;
pub mod bus;
pub mod config;
pub mod controller;
pub mod error;
pub mod mirror;
pub mod session;
pub mod visibility;
pub mod watcher;

pub use action::{ActionEvent, ActionId, ActionListHandle, MenuAction};
pub use config::AppMenuConfig;
pub use controller::{
    create_backend, LocalMenuBar, MenuBarBackend, MenuBarController, MenuBarState,
};
pub use error::RegisterError;
pub use mirror::{ActionMirror, ExportedItem};
pub use session::{MenuExporter, RegistrarClient, RegistrationSession, WindowId};
pub use watcher::{RegistrarEvent, REGISTRAR_SERVICE};
