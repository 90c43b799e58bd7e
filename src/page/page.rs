use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::ajax::descriptor::{Descriptor, DescriptorId, ElementSettings};
use crate::ajax::invoke::InvokeFn;
use crate::ajax::lifecycle::LifecycleState;
use crate::behaviors::{Behavior, BehaviorRegistry, DetachTrigger};
use crate::dom::parser::parse_document;
use crate::dom::{Document, NodeId};
use crate::page::locale;
use crate::page::window::Window;
use crate::settings::Settings;
use crate::trace::{logger::TraceLogger, trace::TraceEvent};

/// Handler for a command name the built-in dispatcher does not know, or
/// one that should be overridden.
pub type CommandHandler = Rc<dyn Fn(&mut Page, DescriptorId, &Value, u16)>;

/// What a descriptor listens for on its element.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind {
    /// Start a request when this event fires.
    Trigger(String),
    /// Turn Enter/Space into the trigger event.
    Keypress,
    /// Suppress the default action of this event.
    Prevent(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub element: NodeId,
    pub descriptor: DescriptorId,
    pub kind: BindingKind,
}

/// A loaded page: document, settings, AJAX descriptors and the behaviours
/// that enhance it.
pub struct Page {
    pub document: Document,
    pub settings: Settings,
    pub window: Window,
    /// Absolute URL the page was loaded from.
    pub url: String,

    /// Live descriptors. Ids are never reused, so a handle outliving its
    /// descriptor cannot reach a newer one.
    pub(crate) descriptors: BTreeMap<DescriptorId, Descriptor>,
    next_descriptor: usize,
    registry: HashMap<String, DescriptorId>,
    pub(crate) bindings: Vec<Binding>,
    behaviors: BehaviorRegistry,
    /// Submit control recorded per form for `setClick` descriptors.
    pub(crate) form_clicked: HashMap<NodeId, NodeId>,
    pub(crate) custom_commands: HashMap<String, CommandHandler>,
    pub(crate) invoke_methods: HashMap<String, InvokeFn>,
    pub(crate) tracer: TraceLogger,
}

impl Page {
    pub fn new(html: &str, url: &str, settings: Settings) -> Self {
        Self::from_document(parse_document(html), url, settings)
    }

    pub fn from_document(document: Document, url: &str, settings: Settings) -> Self {
        Self {
            document,
            settings,
            window: Window::default(),
            url: url.to_string(),
            descriptors: BTreeMap::new(),
            next_descriptor: 0,
            registry: HashMap::new(),
            bindings: Vec::new(),
            behaviors: BehaviorRegistry::default(),
            form_clicked: HashMap::new(),
            custom_commands: HashMap::new(),
            invoke_methods: HashMap::new(),
            tracer: TraceLogger::disabled(),
        }
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn register_behavior(&mut self, behavior: Box<dyn Behavior>) {
        self.behaviors.register(behavior);
    }

    /// Handle (or override) a response command by name.
    pub fn register_command<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&mut Page, DescriptorId, &Value, u16) + 'static,
    {
        self.custom_commands.insert(name.to_string(), Rc::new(handler));
    }

    /// Add a method reachable through the `invoke` command.
    pub fn register_invoke_method<F>(&mut self, name: &str, method: F)
    where
        F: Fn(&mut Document, &[NodeId], &[Value]) + 'static,
    {
        self.invoke_methods.insert(name.to_string(), Box::new(method));
    }

    /// Initial behaviour attachment over the whole document.
    pub fn ready(&mut self) {
        let root = self.document.root();
        self.attach_behaviors(root, None);
    }

    /// Attach the AJAX binding behaviour and every registered behaviour to
    /// `context`. `None` uses the global settings.
    pub fn attach_behaviors(&mut self, context: NodeId, settings: Option<&Value>) {
        let settings = settings
            .cloned()
            .unwrap_or_else(|| self.settings.value().clone());
        crate::ajax::binding::attach(self, context, &settings);
        self.behaviors.attach(&mut self.document, context, &settings);
    }

    pub fn detach_behaviors(&mut self, context: NodeId, settings: Option<&Value>, trigger: DetachTrigger) {
        let settings = settings
            .cloned()
            .unwrap_or_else(|| self.settings.value().clone());
        self.behaviors
            .detach(&mut self.document, context, &settings, trigger);
    }

    // ========================================================================
    // Descriptor registry
    // ========================================================================

    /// Create a descriptor for `element` and bind its events. A later
    /// descriptor with the same `base` replaces the earlier one in the
    /// registry; the earlier one keeps its bindings until its element
    /// leaves the document.
    pub fn bind(&mut self, base: &str, element: NodeId, element_settings: &ElementSettings) -> DescriptorId {
        let message = self.t("Please wait...", &[]);
        let descriptor = Descriptor::new(
            base,
            element,
            element_settings,
            &self.document,
            &mut self.settings,
            &message,
        );
        let id = DescriptorId(self.next_descriptor);
        self.next_descriptor += 1;

        self.bindings.push(Binding {
            element,
            descriptor: id,
            kind: BindingKind::Trigger(descriptor.event.clone()),
        });
        if descriptor.keypress {
            self.bindings.push(Binding {
                element,
                descriptor: id,
                kind: BindingKind::Keypress,
            });
        }
        if let Some(prevent) = &descriptor.prevent {
            self.bindings.push(Binding {
                element,
                descriptor: id,
                kind: BindingKind::Prevent(prevent.clone()),
            });
        }

        self.descriptors.insert(id, descriptor);
        self.registry.insert(base.to_string(), id);
        id
    }

    /// Drop the bindings of elements no longer in the document and reclaim
    /// their descriptors. A descriptor with a request still out is kept
    /// until that request has completed.
    pub fn release_detached(&mut self) {
        let doc = &self.document;
        self.bindings.retain(|b| doc.is_connected(b.element));
        self.form_clicked
            .retain(|form, clicked| doc.is_connected(*form) && doc.is_connected(*clicked));

        let released: Vec<DescriptorId> = self
            .descriptors
            .iter()
            .filter(|(_, d)| {
                !doc.is_connected(d.element) && d.in_flight.is_empty() && d.state == LifecycleState::Idle
            })
            .map(|(id, _)| *id)
            .collect();
        if released.is_empty() {
            return;
        }
        for id in &released {
            if let Some(descriptor) = self.descriptors.remove(id) {
                debug!(descriptor = %descriptor.id, "element removed; descriptor released");
            }
        }
        self.bindings.retain(|b| !released.contains(&b.descriptor));
        let descriptors = &self.descriptors;
        self.registry.retain(|_, id| descriptors.contains_key(id));
    }

    pub fn descriptor(&self, base: &str) -> Option<&Descriptor> {
        self.registry.get(base).and_then(|id| self.descriptors.get(id))
    }

    pub fn descriptor_id(&self, base: &str) -> Option<DescriptorId> {
        self.registry.get(base).copied()
    }

    pub fn descriptor_by_id(&self, id: DescriptorId) -> Option<&Descriptor> {
        self.descriptors.get(&id)
    }

    pub fn descriptor_mut(&mut self, id: DescriptorId) -> Option<&mut Descriptor> {
        self.descriptors.get_mut(&id)
    }

    /// Live descriptors in binding order.
    pub fn descriptors(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.values()
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn behavior_names(&self) -> Vec<&str> {
        self.behaviors.names()
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    pub fn t(&self, source: &str, args: &[(&str, &str)]) -> String {
        locale::t(&self.settings, source, args)
    }

    pub(crate) fn trace(&self, event: TraceEvent) {
        self.tracer.log(&event);
    }
}
