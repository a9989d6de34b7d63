#![forbid(unsafe_code)]

//! In-memory document implementing [`Host`].
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. The tree keeps
//! just enough of the DOM to exercise the engine: classes, attributes,
//! inner markup, inline style, parent links, geometry, focus, listener
//! registrations, timers, and intersection observers.
//!
//! Time is a plain [`Duration`] advanced by the test; nothing here sleeps.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use calview_core::config::ViewConfig;
use calview_core::geometry::{Rect, Size, Viewport};
use calview_core::host::{Host, ListenerId, ObserverId, ObserverOptions};
use calview_core::scheduler::TimerId;
use calview_core::store::CalendarId;

/// Handle to a node of a [`MockHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    inner_html: String,
    style_text: String,
    style_px: BTreeMap<String, f64>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    rect: Rect,
}

impl Node {
    fn new(tag: &str, rect: Rect) -> Self {
        Self {
            tag: tag.to_owned(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            inner_html: String::new(),
            style_text: String::new(),
            style_px: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            rect,
        }
    }
}

/// One intersection observer created through the host.
#[derive(Debug, Clone, PartialEq)]
pub struct MockObserver {
    pub options: ObserverOptions,
    pub targets: Vec<NodeId>,
    pub connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PendingTimer {
    deadline: Duration,
    seq: u64,
    id: TimerId,
}

/// In-memory [`Host`].
#[derive(Debug, Clone)]
pub struct MockHost {
    nodes: Vec<Node>,
    body: NodeId,
    classes: calview_core::config::ClassTokens,
    attributes: calview_core::config::AttributeNames,
    viewport: Viewport,
    created_size: Size,
    intersection: bool,
    focused: Option<NodeId>,
    marker_listeners: Vec<(NodeId, CalendarId)>,
    dismiss_listeners: Vec<NodeId>,
    viewport_listeners: BTreeSet<ListenerId>,
    next_listener: u32,
    unlisten_calls: usize,
    document_key_listeners: usize,
    unload_listeners: usize,
    now: Duration,
    timers: Vec<PendingTimer>,
    next_timer_seq: u64,
    observers: BTreeMap<ObserverId, MockObserver>,
    next_observer: u32,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    /// Empty page: a 1000×800 viewport, intersection observation available,
    /// created elements measuring 150×80.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&ViewConfig::default())
    }

    /// Empty page whose builders use the class and attribute names of `config`.
    #[must_use]
    pub fn with_config(config: &ViewConfig) -> Self {
        Self {
            nodes: vec![Node::new("body", Rect::new(0.0, 0.0, 1000.0, 800.0))],
            body: NodeId(0),
            classes: config.classes.clone(),
            attributes: config.attributes.clone(),
            viewport: Viewport::new(1000.0, 800.0),
            created_size: Size::new(150.0, 80.0),
            intersection: true,
            focused: None,
            marker_listeners: Vec::new(),
            dismiss_listeners: Vec::new(),
            viewport_listeners: BTreeSet::new(),
            next_listener: 0,
            unlisten_calls: 0,
            document_key_listeners: 0,
            unload_listeners: 0,
            now: Duration::ZERO,
            timers: Vec::new(),
            next_timer_seq: 0,
            observers: BTreeMap::new(),
            next_observer: 0,
        }
    }

    /// Simulate a runtime without intersection observation.
    #[must_use]
    pub fn without_intersection(mut self) -> Self {
        self.intersection = false;
        self
    }

    #[must_use]
    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = Viewport::new(width, height);
        self
    }

    /// Size reported for elements created by the engine.
    #[must_use]
    pub fn with_created_size(mut self, width: f64, height: f64) -> Self {
        self.created_size = Size::new(width, height);
        self
    }

    #[must_use]
    pub const fn body(&self) -> NodeId {
        self.body
    }

    // --- Page builders ---

    /// Append a calendar container to the body.
    pub fn add_calendar(&mut self) -> NodeId {
        let calendar = self.insert("div", Rect::new(0.0, 0.0, 1000.0, 600.0));
        let class = self.classes.calendar.clone();
        self.add_class(&calendar, &class);
        self.append_to_body(&calendar);
        calendar
    }

    /// Append an event marker to `calendar`, referencing `content` by id.
    pub fn add_marker(&mut self, calendar: NodeId, content: Option<&str>) -> NodeId {
        self.add_marker_at(calendar, content, Rect::new(200.0, 80.0, 40.0, 20.0))
    }

    pub fn add_marker_at(&mut self, calendar: NodeId, content: Option<&str>, rect: Rect) -> NodeId {
        let marker = self.insert("a", rect);
        let class = self.classes.event.clone();
        self.add_class(&marker, &class);
        self.set_attribute(&marker, "href", "/event/");
        if let Some(content) = content {
            let name = self.attributes.content_ref.clone();
            self.set_attribute(&marker, &name, content);
        }
        self.append_child(&calendar, &marker);
        marker
    }

    /// Append a hidden content container with the given id and markup.
    pub fn add_content(&mut self, id: &str, html: &str) -> NodeId {
        let content = self.insert("div", Rect::default());
        self.set_attribute(&content, "id", id);
        self.set_attribute(&content, "hidden", "");
        self.set_inner_html(&content, html);
        self.append_to_body(&content);
        content
    }

    /// Set the custom popover style carried by a marker.
    pub fn set_marker_style(&mut self, marker: NodeId, css: &str) {
        let name = self.attributes.popover_style.clone();
        self.set_attribute(&marker, &name, css);
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        self.nodes[node.0].rect = rect;
    }

    /// Detach a node the way page script would.
    pub fn detach(&mut self, node: NodeId) {
        self.remove(&node);
    }

    // --- Inspection ---

    #[must_use]
    pub fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes[node.0].classes.iter().any(|c| c == class)
    }

    #[must_use]
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0].attributes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn markup(&self, node: NodeId) -> &str {
        &self.nodes[node.0].inner_html
    }

    #[must_use]
    pub fn style_text(&self, node: NodeId) -> &str {
        &self.nodes[node.0].style_text
    }

    #[must_use]
    pub fn style_px(&self, node: NodeId, property: &str) -> Option<f64> {
        self.nodes[node.0].style_px.get(property).copied()
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    /// Attached nodes carrying `class`, in document order.
    #[must_use]
    pub fn connected_with_class(&self, class: &str) -> Vec<NodeId> {
        self.query_class(None, class)
    }

    #[must_use]
    pub const fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// How many times click/keydown routing was requested for `marker`.
    #[must_use]
    pub fn marker_listener_count(&self, marker: NodeId) -> usize {
        self.marker_listeners
            .iter()
            .filter(|(node, _)| *node == marker)
            .count()
    }

    /// Calendars `marker` is routed to, one entry per registration.
    #[must_use]
    pub fn marker_routes(&self, marker: NodeId) -> Vec<CalendarId> {
        self.marker_listeners
            .iter()
            .filter(|(node, _)| *node == marker)
            .map(|(_, calendar)| *calendar)
            .collect()
    }

    #[must_use]
    pub fn has_dismiss_listener(&self, node: NodeId) -> bool {
        self.dismiss_listeners.contains(&node)
    }

    /// Scroll/resize listener pairs currently installed.
    #[must_use]
    pub fn viewport_listener_count(&self) -> usize {
        self.viewport_listeners.len()
    }

    #[must_use]
    pub fn viewport_listener_ids(&self) -> Vec<ListenerId> {
        self.viewport_listeners.iter().copied().collect()
    }

    #[must_use]
    pub const fn unlisten_calls(&self) -> usize {
        self.unlisten_calls
    }

    #[must_use]
    pub const fn document_key_listeners(&self) -> usize {
        self.document_key_listeners
    }

    #[must_use]
    pub const fn unload_listeners(&self) -> usize {
        self.unload_listeners
    }

    #[must_use]
    pub fn observers(&self) -> &BTreeMap<ObserverId, MockObserver> {
        &self.observers
    }

    /// Whether some connected observer watches `target`.
    #[must_use]
    pub fn is_observed(&self, target: NodeId) -> bool {
        self.observers
            .values()
            .any(|observer| observer.connected && observer.targets.contains(&target))
    }

    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Deadline of the latest pending timer, relative to now.
    #[must_use]
    pub fn time_to_last_timer(&self) -> Option<Duration> {
        self.timers
            .iter()
            .map(|timer| timer.deadline.saturating_sub(self.now))
            .max()
    }

    // --- Time ---

    /// Move the clock forward and return the timers that came due, in
    /// deadline order.
    pub fn advance(&mut self, dt: Duration) -> Vec<TimerId> {
        self.now = self.now.saturating_add(dt);
        self.take_due()
    }

    /// Timers whose deadline is not after the current time.
    pub fn take_due(&mut self) -> Vec<TimerId> {
        let now = self.now;
        let mut due: Vec<PendingTimer> = Vec::new();
        self.timers.retain(|timer| {
            if timer.deadline <= now {
                due.push(*timer);
                false
            } else {
                true
            }
        });
        due.sort();
        due.into_iter().map(|timer| timer.id).collect()
    }

    fn insert(&mut self, tag: &str, rect: Rect) -> NodeId {
        self.nodes.push(Node::new(tag, rect));
        NodeId(self.nodes.len() - 1)
    }

    fn detach_from_parent(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
        }
    }

    fn collect_descendants(&self, root: NodeId, class: &str, out: &mut Vec<NodeId>) {
        for child in &self.nodes[root.0].children {
            if self.has_class(*child, class) {
                out.push(*child);
            }
            self.collect_descendants(*child, class, out);
        }
    }
}

impl Host for MockHost {
    type Element = NodeId;

    fn query_class(&self, scope: Option<&NodeId>, class: &str) -> Vec<NodeId> {
        let root = scope.copied().unwrap_or(self.body);
        let mut out = Vec::new();
        self.collect_descendants(root, class, &mut out);
        out
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|node| self.is_connected(node))
            .find(|node| self.attr(*node, "id") == Some(id))
    }

    fn attribute(&self, el: &NodeId, name: &str) -> Option<String> {
        self.attr(*el, name).map(str::to_owned)
    }

    fn inner_html(&self, el: &NodeId) -> String {
        self.nodes[el.0].inner_html.clone()
    }

    fn is_connected(&self, el: &NodeId) -> bool {
        let mut current = *el;
        loop {
            if current == self.body {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn bounding_rect(&self, el: &NodeId) -> Rect {
        let node = &self.nodes[el.0];
        Rect::new(
            node.style_px.get("left").copied().unwrap_or(node.rect.x),
            node.style_px.get("top").copied().unwrap_or(node.rect.y),
            node.rect.width,
            node.rect.height,
        )
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn supports_intersection(&self) -> bool {
        self.intersection
    }

    fn create_element(&mut self, tag: &str) -> Option<NodeId> {
        let size = self.created_size;
        Some(self.insert(tag, Rect::new(0.0, 0.0, size.width, size.height)))
    }

    fn set_attribute(&mut self, el: &NodeId, name: &str, value: &str) {
        self.nodes[el.0]
            .attributes
            .insert(name.to_owned(), value.to_owned());
    }

    fn remove_attribute(&mut self, el: &NodeId, name: &str) {
        self.nodes[el.0].attributes.remove(name);
    }

    fn set_inner_html(&mut self, el: &NodeId, html: &str) {
        html.clone_into(&mut self.nodes[el.0].inner_html);
    }

    fn append_style(&mut self, el: &NodeId, css: &str) {
        let style = &mut self.nodes[el.0].style_text;
        if !style.is_empty() && !style.ends_with(';') {
            style.push(';');
        }
        style.push_str(css);
    }

    fn set_style_px(&mut self, el: &NodeId, property: &str, px: f64) {
        self.nodes[el.0].style_px.insert(property.to_owned(), px);
    }

    fn add_class(&mut self, el: &NodeId, class: &str) {
        let classes = &mut self.nodes[el.0].classes;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_owned());
        }
    }

    fn remove_class(&mut self, el: &NodeId, class: &str) {
        self.nodes[el.0].classes.retain(|c| c != class);
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) {
        self.detach_from_parent(*child);
        self.nodes[child.0].parent = Some(*parent);
        self.nodes[parent.0].children.push(*child);
    }

    fn append_to_body(&mut self, el: &NodeId) {
        let body = self.body;
        self.append_child(&body, el);
    }

    fn remove(&mut self, el: &NodeId) {
        self.detach_from_parent(*el);
    }

    fn focus(&mut self, el: &NodeId) {
        self.focused = Some(*el);
    }

    fn listen_marker(&mut self, marker: &NodeId, calendar: CalendarId) {
        self.marker_listeners.push((*marker, calendar));
    }

    fn unlisten_markers(&mut self, calendar: CalendarId) {
        self.marker_listeners.retain(|(_, routed)| *routed != calendar);
    }

    fn listen_dismiss(&mut self, el: &NodeId) {
        self.dismiss_listeners.push(*el);
    }

    fn listen_viewport(&mut self) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId::new(self.next_listener);
        self.viewport_listeners.insert(id);
        id
    }

    fn unlisten(&mut self, id: ListenerId) {
        self.unlisten_calls += 1;
        self.viewport_listeners.remove(&id);
    }

    fn listen_document_keys(&mut self) {
        self.document_key_listeners += 1;
    }

    fn listen_unload(&mut self) {
        self.unload_listeners += 1;
    }

    fn schedule(&mut self, delay: Duration, timer: TimerId) {
        self.next_timer_seq += 1;
        self.timers.push(PendingTimer {
            deadline: self.now.saturating_add(delay),
            seq: self.next_timer_seq,
            id: timer,
        });
    }

    fn create_observer(&mut self, options: &ObserverOptions) -> Option<ObserverId> {
        if !self.intersection {
            return None;
        }
        self.next_observer += 1;
        let id = ObserverId::new(self.next_observer);
        self.observers.insert(
            id,
            MockObserver {
                options: options.clone(),
                targets: Vec::new(),
                connected: true,
            },
        );
        Some(id)
    }

    fn observe(&mut self, observer: ObserverId, target: &NodeId) {
        if let Some(observer) = self.observers.get_mut(&observer) {
            if !observer.targets.contains(target) {
                observer.targets.push(*target);
            }
        }
    }

    fn unobserve(&mut self, observer: ObserverId, target: &NodeId) {
        if let Some(observer) = self.observers.get_mut(&observer) {
            observer.targets.retain(|node| node != target);
        }
    }

    fn disconnect(&mut self, observer: ObserverId) {
        if let Some(observer) = self.observers.get_mut(&observer) {
            observer.connected = false;
            observer.targets.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_scoped_and_ordered() {
        let mut host = MockHost::new();
        let a = host.add_calendar();
        let b = host.add_calendar();
        let m1 = host.add_marker(a, None);
        let m2 = host.add_marker(b, None);
        let m3 = host.add_marker(a, None);
        let event = calview_core::constants::class::EVENT;
        assert_eq!(host.query_class(Some(&a), event), vec![m1, m3]);
        assert_eq!(host.query_class(None, event), vec![m1, m3, m2]);
    }

    #[test]
    fn removed_nodes_are_disconnected_and_unfindable() {
        let mut host = MockHost::new();
        let content = host.add_content("c1", "<p>x</p>");
        assert_eq!(host.element_by_id("c1"), Some(content));
        host.detach(content);
        assert!(!host.is_connected(&content));
        assert_eq!(host.element_by_id("c1"), None);
        // Removing twice is harmless.
        host.remove(&content);
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let mut host = MockHost::new();
        host.schedule(Duration::from_millis(20), TimerId::new(1));
        host.schedule(Duration::from_millis(10), TimerId::new(2));
        assert!(host.advance(Duration::from_millis(5)).is_empty());
        assert_eq!(
            host.advance(Duration::from_millis(20)),
            vec![TimerId::new(2), TimerId::new(1)]
        );
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn style_positions_override_layout_box() {
        let mut host = MockHost::new();
        let el = host.create_element("div").unwrap();
        host.set_style_px(&el, "top", 42.0);
        host.set_style_px(&el, "left", 7.0);
        assert_eq!(host.bounding_rect(&el), Rect::new(7.0, 42.0, 150.0, 80.0));
    }
}
