//! Minimal `com.canonical.dbusmenu` exporter.
//!
//! Publishes the mirrored action tree at the session's object path. The
//! full tree is served: `GetLayout` resolves any published item as the
//! requested parent and recurses into its submenu, and activation
//! ("clicked") events are forwarded back into the core through an
//! activation channel the host drains on its event loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use zbus::object_server::SignalContext;
use zbus::zvariant::{OwnedObjectPath, StructureBuilder, Value};

use crate::action::ActionId;
use crate::mirror::ExportedItem;
use crate::session::{ExporterFactory, MenuExporter};

/// Published tree plus the id mapping served to remote peers.
///
/// dbusmenu addresses items by `i32`; ids are assigned once per action
/// (anywhere in the tree) and stay stable across republishes so in-flight
/// activation requests keep resolving.
#[derive(Default)]
struct MenuState {
    revision: u32,
    roots: Vec<ExportedItem>,
    assigned: HashMap<ActionId, i32>,
    next_id: i32,
}

impl MenuState {
    fn replace(&mut self, items: &[ExportedItem]) -> u32 {
        self.assign_ids(items);
        self.roots = items.to_vec();
        self.revision += 1;
        self.revision
    }

    fn assign_ids(&mut self, items: &[ExportedItem]) {
        for item in items {
            if !self.assigned.contains_key(&item.id) {
                self.next_id += 1;
                self.assigned.insert(item.id, self.next_id);
            }
            self.assign_ids(&item.children);
        }
    }

    fn wire_id(&self, id: ActionId) -> Option<i32> {
        self.assigned.get(&id).copied()
    }

    /// Resolve a wire id against the currently published tree.
    fn find_by_wire(&self, wire_id: i32) -> Option<&ExportedItem> {
        fn search<'a>(
            assigned: &HashMap<ActionId, i32>,
            items: &'a [ExportedItem],
            wire_id: i32,
        ) -> Option<&'a ExportedItem> {
            for item in items {
                if assigned.get(&item.id).copied() == Some(wire_id) {
                    return Some(item);
                }
                if let Some(found) = search(assigned, &item.children, wire_id) {
                    return Some(found);
                }
            }
            None
        }
        search(&self.assigned, &self.roots, wire_id)
    }

    fn action_id(&self, wire_id: i32) -> Option<ActionId> {
        self.find_by_wire(wire_id).map(|item| item.id)
    }

    fn flattened(&self) -> Vec<&ExportedItem> {
        fn collect<'a>(items: &'a [ExportedItem], out: &mut Vec<&'a ExportedItem>) {
            for item in items {
                out.push(item);
                collect(&item.children, out);
            }
        }
        let mut out = Vec::new();
        collect(&self.roots, &mut out);
        out
    }
}

fn item_properties(item: &ExportedItem) -> HashMap<String, Value<'static>> {
    let mut props: HashMap<String, Value<'static>> = HashMap::new();
    props.insert("label".into(), Value::from(item.label.clone()));
    if !item.enabled {
        props.insert("enabled".into(), Value::from(false));
    }
    if !item.visible {
        props.insert("visible".into(), Value::from(false));
    }
    if item.has_submenu() {
        props.insert("children-display".into(), Value::from("submenu"));
    }
    props
}

type LayoutNode = (i32, HashMap<String, Value<'static>>, Vec<Value<'static>>);

/// Serialize one published item with its subtree. `depth` counts remaining
/// levels; negative means unlimited, per the dbusmenu `recursionDepth`
/// convention.
fn layout_node(state: &MenuState, item: &ExportedItem, depth: i32) -> LayoutNode {
    let children = if depth == 0 {
        Vec::new()
    } else {
        let next = if depth > 0 { depth - 1 } else { depth };
        item.children
            .iter()
            .map(|child| layout_value(state, child, next))
            .collect()
    };
    let wire_id = state.wire_id(item.id).unwrap_or_default();
    (wire_id, item_properties(item), children)
}

fn layout_value(state: &MenuState, item: &ExportedItem, depth: i32) -> Value<'static> {
    let (wire_id, props, children) = layout_node(state, item, depth);
    let node = StructureBuilder::new()
        .add_field(wire_id)
        .add_field(props)
        .add_field(children)
        .build();
    Value::from(node)
}

struct DbusMenuInterface {
    state: Arc<Mutex<MenuState>>,
    activations: mpsc::UnboundedSender<ActionId>,
}

#[zbus::interface(name = "com.canonical.dbusmenu")]
impl DbusMenuInterface {
    #[zbus(property)]
    fn version(&self) -> u32 {
        3
    }

    #[zbus(property)]
    fn status(&self) -> String {
        "normal".to_string()
    }

    /// Serve the layout below `parent_id` (0 = root), recursing
    /// `recursion_depth` levels (negative = unlimited).
    fn get_layout(
        &self,
        parent_id: i32,
        recursion_depth: i32,
        _property_names: Vec<String>,
    ) -> zbus::fdo::Result<(u32, LayoutNode)> {
        let state = self.state.lock().expect("menu state lock");
        if parent_id == 0 {
            let children = if recursion_depth == 0 {
                Vec::new()
            } else {
                let next = if recursion_depth > 0 {
                    recursion_depth - 1
                } else {
                    recursion_depth
                };
                state
                    .roots
                    .iter()
                    .map(|item| layout_value(&state, item, next))
                    .collect()
            };
            let mut root_props: HashMap<String, Value<'static>> = HashMap::new();
            root_props.insert("children-display".into(), Value::from("submenu"));
            return Ok((state.revision, (0, root_props, children)));
        }

        let item = state.find_by_wire(parent_id).ok_or_else(|| {
            zbus::fdo::Error::InvalidArgs(format!("unknown menu item {parent_id}"))
        })?;
        Ok((state.revision, layout_node(&state, item, recursion_depth)))
    }

    fn get_group_properties(
        &self,
        ids: Vec<i32>,
        _property_names: Vec<String>,
    ) -> Vec<(i32, HashMap<String, Value<'static>>)> {
        let state = self.state.lock().expect("menu state lock");
        state
            .flattened()
            .into_iter()
            .filter_map(|item| {
                let wire_id = state.wire_id(item.id)?;
                if ids.is_empty() || ids.contains(&wire_id) {
                    Some((wire_id, item_properties(item)))
                } else {
                    None
                }
            })
            .collect()
    }

    fn event(&self, id: i32, event_id: String, _data: Value<'_>, _timestamp: u32) {
        if event_id != "clicked" {
            return;
        }
        let action = {
            let state = self.state.lock().expect("menu state lock");
            state.action_id(id)
        };
        match action {
            Some(action) => {
                let _ = self.activations.send(action);
            }
            None => debug!(wire_id = id, "activation for unknown menu item"),
        }
    }

    fn about_to_show(&self, _id: i32) -> bool {
        false
    }

    #[zbus(signal)]
    async fn layout_updated(
        ctxt: &SignalContext<'_>,
        revision: u32,
        parent: i32,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn item_activation_requested(
        ctxt: &SignalContext<'_>,
        id: i32,
        timestamp: u32,
    ) -> zbus::Result<()>;
}

/// [`MenuExporter`] served over the bus.
///
/// Created lazily by the session; dropping it removes the object from the
/// object server.
pub struct DbusMenuExporter {
    connection: zbus::Connection,
    path: OwnedObjectPath,
    state: Arc<Mutex<MenuState>>,
}

impl DbusMenuExporter {
    pub fn new(
        connection: zbus::Connection,
        object_path: &str,
        activations: mpsc::UnboundedSender<ActionId>,
    ) -> zbus::Result<Self> {
        let path = OwnedObjectPath::try_from(object_path.to_string())?;
        let state = Arc::new(Mutex::new(MenuState::default()));

        let iface = DbusMenuInterface {
            state: state.clone(),
            activations,
        };
        let server_conn = connection.clone();
        let server_path = path.clone();
        tokio::spawn(async move {
            if let Err(err) = server_conn
                .object_server()
                .at(server_path.clone(), iface)
                .await
            {
                warn!(path = %server_path, error = %err, "failed to export menu object");
            }
        });

        Ok(Self {
            connection,
            path,
            state,
        })
    }

    fn emit_layout_updated(&self, revision: u32) {
        let connection = self.connection.clone();
        let path = self.path.clone();
        tokio::spawn(async move {
            let Ok(ctxt) = SignalContext::new(&connection, path) else {
                return;
            };
            if let Err(err) = DbusMenuInterface::layout_updated(&ctxt, revision, 0).await {
                debug!(error = %err, "LayoutUpdated signal not delivered");
            }
        });
    }
}

impl MenuExporter for DbusMenuExporter {
    fn object_path(&self) -> &str {
        self.path.as_str()
    }

    fn publish(&mut self, items: &[ExportedItem]) {
        let revision = {
            let mut state = self.state.lock().expect("menu state lock");
            state.replace(items)
        };
        self.emit_layout_updated(revision);
    }

    fn announce_activation(&mut self, id: ActionId) {
        let wire_id = {
            let state = self.state.lock().expect("menu state lock");
            state.wire_id(id)
        };
        let Some(wire_id) = wire_id else { return };
        let connection = self.connection.clone();
        let path = self.path.clone();
        tokio::spawn(async move {
            let Ok(ctxt) = SignalContext::new(&connection, path) else {
                return;
            };
            if let Err(err) =
                DbusMenuInterface::item_activation_requested(&ctxt, wire_id, 0).await
            {
                debug!(error = %err, "ItemActivationRequested signal not delivered");
            }
        });
    }
}

impl Drop for DbusMenuExporter {
    fn drop(&mut self) {
        let connection = self.connection.clone();
        let path = self.path.clone();
        tokio::spawn(async move {
            let _ = connection
                .object_server()
                .remove::<DbusMenuInterface, _>(path)
                .await;
        });
    }
}

/// Build the exporter factory the session uses for lazy creation.
///
/// Remote activation requests surface on `activations`; the host drains
/// that channel and forwards ids to
/// [`crate::controller::MenuBarController::handle_activation_request`].
pub fn exporter_factory(
    connection: zbus::Connection,
    activations: mpsc::UnboundedSender<ActionId>,
) -> ExporterFactory {
    std::rc::Rc::new(move |object_path: &str| {
        match DbusMenuExporter::new(connection.clone(), object_path, activations.clone()) {
            Ok(exporter) => Box::new(exporter) as Box<dyn MenuExporter>,
            Err(err) => {
                warn!(object_path, error = %err, "menu exporter creation failed, publishing nothing");
                Box::new(NullExporter {
                    path: object_path.to_string(),
                })
            }
        }
    })
}

/// Exporter stand-in when the object path is unusable; publishes nothing.
struct NullExporter {
    path: String,
}

impl MenuExporter for NullExporter {
    fn object_path(&self) -> &str {
        &self.path
    }

    fn publish(&mut self, _items: &[ExportedItem]) {}

    fn announce_activation(&mut self, _id: ActionId) {}
}
