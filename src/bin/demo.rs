//! Exports a synthetic menu bar for a given window id and keeps it
//! registered against the session-bus appmenu registrar.
//!
//! Usage: appmenu-demo <window-id>
//!
//! Point it at a real toplevel window id (e.g. from `xwininfo`) while a
//! registrar such as a desktop shell's global menu is running, then watch
//! the menu follow registrar restarts.

use std::rc::Rc;

use anyhow::Context;
use appmenu_bridge::bus::{exporter_factory, BusRegistrarClient, RegistrarWatcher};
use appmenu_bridge::controller::LocalMenuBar;
use appmenu_bridge::{
    ActionEvent, ActionListHandle, AppMenuConfig, MenuAction, MenuBarBackend, MenuBarController,
    WindowId,
};
use tokio::sync::mpsc;

/// Stand-in for the in-window bar: just logs what a toolkit would render.
struct LoggingLocalBar;

impl LocalMenuBar for LoggingLocalBar {
    fn set_visible(&mut self, visible: bool) {
        tracing::info!(visible, "local menu bar visibility");
    }

    fn reserve_space(&mut self, reserve: bool) {
        tracing::info!(reserve, "local menu bar space reservation");
    }
}

fn demo_actions() -> Vec<Rc<MenuAction>> {
    let file = MenuAction::entry("File");
    file.set_submenu(vec![MenuAction::entry("New"), MenuAction::entry("Open")]);

    let edit = MenuAction::entry("Edit");
    edit.set_submenu(vec![MenuAction::entry("Copy"), MenuAction::entry("Paste")]);

    let quit = MenuAction::entry("Quit");
    quit.set_on_trigger(|| tracing::info!("quit activated by the shell"));

    vec![file, MenuAction::separator(), edit, quit]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(env_filter) = tracing_subscriber::EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt()
            .compact()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("info")
            .compact()
            .init();
    }

    let window_id: u32 = std::env::args()
        .nth(1)
        .context("usage: appmenu-demo <window-id>")?
        .parse()
        .context("window id must be an unsigned integer")?;

    let connection = zbus::Connection::session()
        .await
        .context("connecting to the session bus")?;

    let registrar = Rc::new(
        BusRegistrarClient::new(&connection)
            .await
            .context("creating registrar client")?,
    );
    let mut watcher = RegistrarWatcher::spawn(&connection, registrar.availability())
        .await
        .context("watching registrar presence")?;

    let (activation_tx, mut activations) = mpsc::unbounded_channel();
    let mut controller = MenuBarController::new(
        AppMenuConfig::from_env(),
        registrar,
        exporter_factory(connection.clone(), activation_tx),
        Box::new(LoggingLocalBar),
    );

    let actions: ActionListHandle = Rc::new(std::cell::RefCell::new(demo_actions()));
    controller.init(actions.clone());
    controller.handle_reparent(Some(WindowId(window_id)));
    tracing::info!(
        window_id,
        path = controller.object_path(),
        state = ?controller.state(),
        "menu bar exported"
    );

    let snapshot: Vec<Rc<MenuAction>> = actions.borrow().clone();
    for action in snapshot {
        controller.action_event(ActionEvent::Added {
            action,
            before: None,
        });
    }

    let mut poll = tokio::time::interval(appmenu_bridge::visibility::POLL_INTERVAL);
    loop {
        tokio::select! {
            Some(event) = watcher.next() => {
                tracing::info!(?event, "registrar presence changed");
                controller.handle_registrar_event(event);
            }
            Some(id) = activations.recv() => {
                controller.handle_activation_request(id);
            }
            _ = poll.tick() => {
                // No real window here, so never maximized.
                controller.tick_visibility(false);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
        controller.process_pending();
    }

    Ok(())
}
