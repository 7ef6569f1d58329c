//! Gallery session: routes events between the gallery components
//!
//! The session owns one of each component and never performs I/O. Every entry
//! point returns the [`Effect`]s the host must carry out: fetch a page, move
//! focus, replace the address bar, render. Page results come back through
//! [`GallerySession::on_page_loaded`].

use crate::focus::{FocusController, FocusHost, FocusableNode, ScopeId};
use crate::fullscreen::FullscreenState;
use crate::gesture::{PinchRecognizer, Swipe, SwipeRecognizer, TouchInput};
use crate::indicator::{IndicatorAction, IndicatorMode, PositionIndicator, VisibilityEntry};
use gallery_core::deep_link::{DeepLinkSync, Location, Resolution};
use gallery_core::favorites::{query_param, with_query_param, Favorites};
use gallery_core::{
    Collection, Command, CommandId, ElementId, FetchError, GalleryConfig, GalleryError, ImageId,
    Lightbox, LightboxEvent, LightboxState, LoadOutcome, LoadPriority, OpenTarget, PageResponse,
    PageTicket, PaginationAccumulator, RecomputeThrottle, ScrollLock, Viewport, WindowCalculator,
    WindowSignal, WindowUpdate,
};

/// Work the host must carry out
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Run the request (e.g. with `fetch_with_retry`) and report back
    FetchPage(PageTicket),
    /// Request one animation frame, then call `on_frame`
    RequestFrame,
    RenderWindow(WindowUpdate),
    Lightbox(LightboxEvent),
    Focus(ElementId),
    /// Replace the current history entry
    ReplaceLocation(String),
    /// Route to the page-level not-found view
    NotFound(Option<ImageId>),
    /// Show a retry affordance
    LoadFailed { message: String, retryable: bool },
    Fullscreen(bool),
    Zoom(f64),
}

/// Host elements the session needs to name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionElements {
    pub lightbox: ElementId,
    /// Focus lands here when nothing better is attached after a close
    pub grid: ElementId,
}

/// Mirror of the address bar the session edits before emitting `ReplaceLocation`
#[derive(Debug, Default)]
struct LocationMirror {
    path: String,
}

impl Location for LocationMirror {
    fn current(&self) -> String {
        self.path.clone()
    }

    fn replace(&mut self, path: &str) {
        self.path = path.to_string();
    }
}

/// Focus host wrapper that records moves instead of performing them
struct FocusRecorder<'a> {
    host: &'a dyn FocusHost,
    active: Option<ElementId>,
    moves: Vec<ElementId>,
}

impl<'a> FocusRecorder<'a> {
    fn new(host: &'a dyn FocusHost) -> Self {
        Self {
            host,
            active: host.active_element(),
            moves: Vec::new(),
        }
    }

    fn into_effects(self) -> impl Iterator<Item = Effect> {
        self.moves.into_iter().map(Effect::Focus)
    }
}

impl FocusHost for FocusRecorder<'_> {
    fn active_element(&self) -> Option<ElementId> {
        self.active
    }

    fn focus(&mut self, id: ElementId) {
        self.active = Some(id);
        self.moves.push(id);
    }

    fn is_attached(&self, id: ElementId) -> bool {
        self.host.is_attached(id)
    }

    fn focusable_within(&self, container: ElementId) -> Vec<FocusableNode> {
        self.host.focusable_within(container)
    }
}

pub struct GallerySession {
    pagination: PaginationAccumulator,
    window: WindowCalculator,
    throttle: RecomputeThrottle,
    viewport: Option<Viewport>,
    last_window: Option<WindowUpdate>,
    lightbox: Lightbox,
    deep_link: DeepLinkSync,
    location: LocationMirror,
    focus: FocusController,
    lightbox_scope: Option<ScopeId>,
    swipe: SwipeRecognizer,
    pinch: PinchRecognizer,
    indicator: PositionIndicator,
    fullscreen: FullscreenState,
    favorites: Option<Favorites>,
    favorites_param: String,
    elements: SessionElements,
}

impl GallerySession {
    pub fn new(
        config: &GalleryConfig,
        scroll_lock: ScrollLock,
        fullscreen: FullscreenState,
        elements: SessionElements,
    ) -> Self {
        Self {
            pagination: PaginationAccumulator::new(config.api.page_size),
            window: WindowCalculator::new(config.window.clone()),
            throttle: RecomputeThrottle::new(),
            viewport: None,
            last_window: None,
            lightbox: Lightbox::new(scroll_lock),
            deep_link: DeepLinkSync::new(&config.deep_link.base_path),
            location: LocationMirror::default(),
            focus: FocusController::new(),
            lightbox_scope: None,
            swipe: SwipeRecognizer::new(&config.gestures),
            pinch: PinchRecognizer::new(&config.gestures),
            indicator: PositionIndicator::new(&config.indicator),
            fullscreen,
            favorites: None,
            favorites_param: config.deep_link.favorites_param.clone(),
            elements,
        }
    }

    pub fn with_favorites(mut self, favorites: Favorites) -> Self {
        self.favorites = Some(favorites);
        self
    }

    // ===== Read access =====

    pub fn collection(&self) -> &Collection {
        self.pagination.collection()
    }

    pub fn pagination(&self) -> &PaginationAccumulator {
        &self.pagination
    }

    pub fn lightbox_state(&self) -> &LightboxState {
        self.lightbox.state()
    }

    pub fn location(&self) -> &str {
        &self.location.path
    }

    pub fn last_window(&self) -> Option<&WindowUpdate> {
        self.last_window.as_ref()
    }

    /// Eager for items in view; lazy before the first frame
    pub fn priority(&self, index: usize) -> LoadPriority {
        match (&self.viewport, &self.last_window) {
            (Some(vp), Some(update)) => self.window.priority(index, vp, update.columns),
            _ => LoadPriority::Lazy,
        }
    }

    pub fn indicator_mode(&self) -> IndicatorMode {
        self.indicator.mode()
    }

    pub fn indicator_label(&self) -> String {
        self.indicator.label()
    }

    pub fn fullscreen_available(&self) -> bool {
        self.fullscreen.is_available()
    }

    pub fn is_favorite(&self, id: ImageId) -> bool {
        self.favorites.as_ref().is_some_and(|f| f.is_favorite(id))
    }

    // ===== Lifecycle =====

    /// Initial load at `path`: record the deep link and request the first page
    pub fn start(&mut self, path: &str) -> Vec<Effect> {
        tracing::info!(path, "Gallery session started");
        self.location.path = path.to_string();
        self.merge_favorites_from_location();
        self.deep_link.on_navigate(path);

        let mut effects = Vec::new();
        self.request_next_page(&mut effects);
        effects
    }

    /// Stop loading; outstanding page results will be ignored
    pub fn shutdown(&mut self) {
        self.pagination.teardown();
        if self.lightbox.close().is_some() {
            if let Some(scope) = self.lightbox_scope.take() {
                self.focus.deactivate(scope, None);
            }
        }
        tracing::info!("Gallery session shut down");
    }

    // ===== Pagination =====

    fn request_next_page(&mut self, effects: &mut Vec<Effect>) {
        if let Some(ticket) = self.pagination.begin_next() {
            effects.push(Effect::FetchPage(ticket));
        }
    }

    pub fn on_page_loaded(
        &mut self,
        ticket: PageTicket,
        result: Result<PageResponse, FetchError>,
        host: &dyn FocusHost,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();

        match self.pagination.complete(ticket, result) {
            Ok(LoadOutcome::Applied(stats)) => {
                if stats.first_changed.is_some() && self.lightbox.reconcile(self.pagination.collection()) {
                    self.indicator.set_current(self.lightbox.current_index());
                }
                self.indicator.set_total(self.pagination.collection().len());
                self.render_window(&mut effects);
                self.resolve_deep_link(host, &mut effects);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Page load failed: {}", e);
                effects.push(Effect::LoadFailed {
                    message: e.user_message(),
                    retryable: e.is_retryable(),
                });
            }
        }

        effects
    }

    // ===== Windowing =====

    /// Scroll or resize; coalesced to one recompute per frame
    pub fn on_viewport(&mut self, viewport: Viewport) -> Vec<Effect> {
        self.viewport = Some(viewport);
        if self.throttle.schedule(viewport) {
            vec![Effect::RequestFrame]
        } else {
            Vec::new()
        }
    }

    /// Animation frame callback
    pub fn on_frame(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(viewport) = self.throttle.take_frame() {
            self.viewport = Some(viewport);
            self.render_window(&mut effects);
        }
        effects
    }

    fn render_window(&mut self, effects: &mut Vec<Effect>) {
        let Some(viewport) = self.viewport else {
            return;
        };
        let update = self.window.compute(
            &viewport,
            self.pagination.collection().len(),
            self.pagination.has_more(),
        );
        self.last_window = Some(update);
        effects.push(Effect::RenderWindow(update));

        if update.signal == Some(WindowSignal::ApproachingEnd) {
            self.request_next_page(effects);
        }
    }

    // ===== Deep links =====

    /// Back/forward navigation to `path`
    pub fn on_navigate(&mut self, path: &str, host: &dyn FocusHost) -> Vec<Effect> {
        self.location.path = path.to_string();
        self.merge_favorites_from_location();
        self.deep_link.on_navigate(path);

        let mut effects = Vec::new();
        self.resolve_deep_link(host, &mut effects);
        effects
    }

    fn resolve_deep_link(&mut self, host: &dyn FocusHost, effects: &mut Vec<Effect>) {
        if !self.deep_link.has_pending() {
            return;
        }
        let resolution = self.deep_link.resolve(
            self.pagination.collection(),
            self.pagination.has_more(),
            self.lightbox.is_open(),
        );
        match resolution {
            Resolution::Idle => {}
            Resolution::Open { index, .. } => self.open(OpenTarget::Index(index), None, host, effects),
            Resolution::LoadMore(_) => self.request_next_page(effects),
            Resolution::NotFound(id) => {
                tracing::info!(?id, "Deep link points at no image");
                effects.push(Effect::NotFound(id));
            }
            Resolution::Close => self.close(effects),
        }
    }

    fn sync_location(&mut self, effects: &mut Vec<Effect>) {
        if let Some(path) = self.deep_link.sync_location(
            self.lightbox.state(),
            self.pagination.collection(),
            &mut self.location,
        ) {
            effects.push(Effect::ReplaceLocation(path));
        }
    }

    // ===== Lightbox =====

    /// Open the lightbox on a grid item (click or Enter/Space)
    pub fn open_at(&mut self, index: usize, trigger: Option<ElementId>, host: &dyn FocusHost) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.open(OpenTarget::Index(index), trigger, host, &mut effects);
        effects
    }

    fn open(
        &mut self,
        target: OpenTarget<'_>,
        trigger: Option<ElementId>,
        host: &dyn FocusHost,
        effects: &mut Vec<Effect>,
    ) {
        let was_open = self.lightbox.is_open();
        let event = match self.lightbox.open(target, trigger, self.pagination.collection()) {
            Ok(event) => event,
            Err(GalleryError::NotFound(id)) => {
                effects.push(Effect::NotFound(Some(id)));
                return;
            }
            Err(e) => {
                tracing::warn!("Cannot open lightbox: {}", e);
                return;
            }
        };

        if !was_open {
            self.lightbox_scope =
                Some(self.focus.activate(host, self.elements.lightbox, None, trigger));
        }
        self.after_move(event, effects);
        self.request_focus_frame(effects);
    }

    fn close(&mut self, effects: &mut Vec<Effect>) {
        if self.fullscreen.exit() {
            effects.push(Effect::Fullscreen(false));
        }
        let Some(event) = self.lightbox.close() else {
            return;
        };
        if let Some(scope) = self.lightbox_scope.take() {
            self.focus.deactivate(scope, Some(self.elements.grid));
        }
        self.pinch.reset();
        self.swipe.reset();
        self.sync_location(effects);
        effects.push(Effect::Lightbox(event));
        self.request_focus_frame(effects);
    }

    /// Queued focus moves land in `after_render`, so make sure one happens
    fn request_focus_frame(&self, effects: &mut Vec<Effect>) {
        if self.focus.has_pending() && !effects.contains(&Effect::RequestFrame) {
            effects.push(Effect::RequestFrame);
        }
    }

    fn after_move(&mut self, event: LightboxEvent, effects: &mut Vec<Effect>) {
        self.indicator.set_current(self.lightbox.current_index());
        self.pinch.reset_scale();
        self.sync_location(effects);
        effects.push(Effect::Lightbox(event));
    }

    fn go_to(&mut self, index: usize, effects: &mut Vec<Effect>) {
        if let Some(event) = self.lightbox.go_to(index, self.pagination.collection()) {
            self.after_move(event, effects);
        }
    }

    // ===== Input =====

    pub fn handle_command(&mut self, command: &Command, host: &dyn FocusHost) -> Vec<Effect> {
        let mut effects = Vec::new();
        let open = self.lightbox.is_open();
        tracing::debug!(command = command.id.as_str(), open, "Command");

        match command.id.as_str() {
            CommandId::LIGHTBOX_NEXT if open => {
                if let Some(event) = self.lightbox.go_to_next(self.pagination.collection()) {
                    self.after_move(event, &mut effects);
                }
            }
            CommandId::LIGHTBOX_PREV if open => {
                if let Some(event) = self.lightbox.go_to_previous(self.pagination.collection()) {
                    self.after_move(event, &mut effects);
                }
            }
            CommandId::LIGHTBOX_ESCAPE => {
                if self.fullscreen.exit() {
                    effects.push(Effect::Fullscreen(false));
                } else {
                    self.close(&mut effects);
                }
            }
            CommandId::LIGHTBOX_CLOSE => self.close(&mut effects),
            CommandId::LIGHTBOX_GO_TO => {
                if let Some(index) = command.index_param() {
                    self.go_to(index, &mut effects);
                }
            }
            CommandId::GALLERY_OPEN_FOCUSED if !open => {
                if let Some(index) = command.index_param() {
                    self.open(OpenTarget::Index(index), host.active_element(), host, &mut effects);
                }
            }
            CommandId::GALLERY_LOAD_MORE => self.request_next_page(&mut effects),
            CommandId::FOCUS_NEXT | CommandId::FOCUS_PREV => {
                let mut recorder = FocusRecorder::new(host);
                self.focus
                    .handle_tab(&mut recorder, command.is(CommandId::FOCUS_PREV));
                effects.extend(recorder.into_effects());
            }
            CommandId::VIEW_TOGGLE_FULLSCREEN if open => match self.fullscreen.toggle() {
                Ok(active) => effects.push(Effect::Fullscreen(active)),
                Err(e) => tracing::debug!("{}", e),
            },
            CommandId::FAVORITES_TOGGLE if open => self.toggle_favorite(&mut effects),
            _ => {}
        }

        effects
    }

    pub fn on_touch(&mut self, touch: &TouchInput) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.lightbox.is_open() {
            return effects;
        }

        if let Some(scale) = self.pinch.handle(touch) {
            effects.push(Effect::Zoom(scale));
        }
        match self.swipe.handle(touch) {
            Some(Swipe::Left) => {
                if let Some(event) = self.lightbox.go_to_next(self.pagination.collection()) {
                    self.after_move(event, &mut effects);
                }
            }
            Some(Swipe::Right) => {
                if let Some(event) = self.lightbox.go_to_previous(self.pagination.collection()) {
                    self.after_move(event, &mut effects);
                }
            }
            None => {}
        }
        effects
    }

    // ===== Indicator =====

    /// Visible-item report from the lightbox strip
    pub fn on_visibility(&mut self, entries: &[VisibilityEntry], viewport_height: f64) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(index) = self.indicator.observe(entries, viewport_height) {
            self.go_to(index, &mut effects);
        }
        effects
    }

    pub fn activate_dot(&mut self, index: usize) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(IndicatorAction::Seek(index)) = self.indicator.activate_dot(index) {
            self.go_to(index, &mut effects);
        }
        effects
    }

    // ===== Focus =====

    /// Post-render hook: deferred focus moves become effects
    pub fn after_render(&mut self, host: &dyn FocusHost) -> Vec<Effect> {
        if !self.focus.has_pending() {
            return Vec::new();
        }
        let mut recorder = FocusRecorder::new(host);
        self.focus.flush(&mut recorder);
        recorder.into_effects().collect()
    }

    // ===== Favorites =====

    fn toggle_favorite(&mut self, effects: &mut Vec<Effect>) {
        let Some(favorites) = self.favorites.as_mut() else {
            return;
        };
        let Some(image) = self.pagination.collection().get(self.lightbox.current_index()) else {
            return;
        };
        if let Err(e) = favorites.toggle(image) {
            tracing::warn!("Failed to save favorites: {}", e);
            return;
        }

        let value = favorites.query_value();
        let next = with_query_param(&self.location.path, &self.favorites_param, value.as_deref());
        if next != self.location.path {
            self.location.path = next.clone();
            effects.push(Effect::ReplaceLocation(next));
        }
    }

    fn merge_favorites_from_location(&mut self) {
        let Some(favorites) = self.favorites.as_mut() else {
            return;
        };
        if let Some(value) = query_param(&self.location.path, &self.favorites_param) {
            if let Err(e) = favorites.merge_from_query(value) {
                tracing::warn!("Failed to save favorites from link: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::tests::FakeDocument;
    use gallery_core::{Cursor, Image, MemoryStore, PageInfo};
    use std::time::Instant;
    use winit::event::TouchPhase;

    const LIGHTBOX: u64 = 900;
    const GRID: u64 = 901;

    fn session() -> GallerySession {
        session_with(true)
    }

    fn session_with(fullscreen: bool) -> GallerySession {
        GallerySession::new(
            &GalleryConfig::default(),
            ScrollLock::headless(),
            FullscreenState::new(fullscreen),
            SessionElements {
                lightbox: ElementId(LIGHTBOX),
                grid: ElementId(GRID),
            },
        )
    }

    fn document() -> FakeDocument {
        FakeDocument::default()
            .with_container(
                LIGHTBOX,
                vec![FocusableNode::control(1), FocusableNode::control(2), FocusableNode::control(3)],
            )
            .attach(GRID)
            .attach(42)
    }

    fn page(ids: &[u64], has_more: bool, next: Option<i64>) -> PageResponse {
        PageResponse {
            images: ids
                .iter()
                .map(|&id| Image {
                    id,
                    source_url: format!("/img/{id}.jpg"),
                    caption: None,
                    order: id as i64,
                })
                .collect(),
            pagination: PageInfo {
                has_more,
                next_cursor: next.map(Cursor::from),
                total_count: 0,
            },
        }
    }

    fn fetch(effects: &[Effect]) -> Option<PageTicket> {
        effects.iter().find_map(|e| match e {
            Effect::FetchPage(t) => Some(t.clone()),
            _ => None,
        })
    }

    fn loaded(s: &mut GallerySession, ids: &[u64], has_more: bool, next: Option<i64>) -> Vec<Effect> {
        let doc = document();
        let effects = s.start("/gallery");
        let ticket = fetch(&effects).unwrap();
        s.on_page_loaded(ticket, Ok(page(ids, has_more, next)), &doc)
    }

    fn focus_moves(effects: &[Effect]) -> Vec<ElementId> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Focus(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_deep_link_to_missing_image_is_not_found() {
        let mut s = session();
        let doc = document();
        let effects = s.start("/gallery/999");
        let ticket = fetch(&effects).unwrap();

        let effects = s.on_page_loaded(ticket, Ok(page(&[1, 2, 3], false, None)), &doc);
        assert!(effects.contains(&Effect::NotFound(Some(999))));
        assert!(!s.lightbox_state().is_open);
    }

    #[test]
    fn test_deep_link_loads_pages_until_found() {
        let mut s = session();
        let doc = document();
        let effects = s.start("/gallery/5?favorites=1");
        let ticket = fetch(&effects).unwrap();

        let effects = s.on_page_loaded(ticket, Ok(page(&[1, 2, 3], true, Some(3))), &doc);
        let ticket = fetch(&effects).expect("deep link should request another page");
        assert_eq!(ticket.request.cursor, Some(Cursor::from(3)));

        let effects = s.on_page_loaded(ticket, Ok(page(&[4, 5, 6], false, None)), &doc);
        assert!(effects.contains(&Effect::Lightbox(LightboxEvent::Opened { index: 4 })));
        assert_eq!(s.location(), "/gallery/5?favorites=1");
        assert!(!effects.iter().any(|e| matches!(e, Effect::ReplaceLocation(_))));
    }

    #[test]
    fn test_open_navigate_close_restores_focus() {
        let mut s = session();
        loaded(&mut s, &[10, 20, 30], false, None);

        let mut doc = document();
        doc.active = Some(ElementId(42));
        let effects = s.handle_command(&Command::new(CommandId::GALLERY_OPEN_FOCUSED).with_int(2), &doc);
        assert!(effects.contains(&Effect::ReplaceLocation("/gallery/30".into())));
        assert_eq!(s.lightbox_state().trigger, Some(ElementId(42)));

        assert_eq!(focus_moves(&s.after_render(&doc)), vec![ElementId(1)]);
        doc.active = Some(ElementId(1));

        let effects = s.handle_command(&Command::new(CommandId::LIGHTBOX_NEXT), &doc);
        assert!(effects.contains(&Effect::ReplaceLocation("/gallery/10".into())));
        assert_eq!(s.indicator_mode(), IndicatorMode::Dots(3));
        assert_eq!(s.indicator_label(), "1 of 3");

        let effects = s.handle_command(&Command::new(CommandId::LIGHTBOX_ESCAPE), &doc);
        assert!(effects.contains(&Effect::ReplaceLocation("/gallery".into())));
        assert_eq!(focus_moves(&s.after_render(&doc)), vec![ElementId(42)]);
    }

    #[test]
    fn test_tab_is_trapped_while_open() {
        let mut s = session();
        loaded(&mut s, &[10, 20], false, None);
        let mut doc = document();

        s.open_at(0, None, &doc);
        s.after_render(&doc);
        doc.active = Some(ElementId(3));

        let effects = s.handle_command(&Command::new(CommandId::FOCUS_NEXT), &doc);
        assert_eq!(focus_moves(&effects), vec![ElementId(1)]);
    }

    #[test]
    fn test_escape_leaves_fullscreen_before_closing() {
        let mut s = session();
        loaded(&mut s, &[10, 20], false, None);
        let doc = document();
        s.open_at(1, None, &doc);

        let effects = s.handle_command(&Command::new(CommandId::VIEW_TOGGLE_FULLSCREEN), &doc);
        assert_eq!(effects, vec![Effect::Fullscreen(true)]);

        let effects = s.handle_command(&Command::new(CommandId::LIGHTBOX_ESCAPE), &doc);
        assert_eq!(effects, vec![Effect::Fullscreen(false)]);
        assert!(s.lightbox_state().is_open);

        s.handle_command(&Command::new(CommandId::LIGHTBOX_ESCAPE), &doc);
        assert!(!s.lightbox_state().is_open);
    }

    #[test]
    fn test_unsupported_fullscreen_is_silent() {
        let mut s = session_with(false);
        loaded(&mut s, &[10], false, None);
        let doc = document();
        s.open_at(0, None, &doc);

        assert!(!s.fullscreen_available());
        let effects = s.handle_command(&Command::new(CommandId::VIEW_TOGGLE_FULLSCREEN), &doc);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_failed_page_offers_retry_with_same_cursor() {
        let mut s = session();
        let effects = loaded(&mut s, &[1, 2], true, Some(42));
        assert!(fetch(&effects).is_none());
        let doc = document();

        let effects = s.handle_command(&Command::new(CommandId::GALLERY_LOAD_MORE), &doc);
        let ticket = fetch(&effects).unwrap();
        let error = FetchError::Http { status: 500, message: "Internal error".into() };
        let effects = s.on_page_loaded(ticket, Err(error), &doc);
        assert_eq!(
            effects,
            vec![Effect::LoadFailed { message: "Internal error".into(), retryable: true }]
        );
        assert_eq!(s.collection().len(), 2);

        let effects = s.handle_command(&Command::new(CommandId::GALLERY_LOAD_MORE), &doc);
        assert_eq!(fetch(&effects).unwrap().request.cursor, Some(Cursor::from(42)));
    }

    #[test]
    fn test_scrolling_near_end_requests_page() {
        let mut s = session();
        let ids: Vec<u64> = (1..=120).collect();
        loaded(&mut s, &ids, true, Some(120));

        assert_eq!(s.on_viewport(Viewport::new(0.0, 900.0, 1280.0)), vec![Effect::RequestFrame]);
        assert!(s.on_viewport(Viewport::new(12_000.0, 900.0, 1280.0)).is_empty());

        let effects = s.on_frame();
        assert!(matches!(effects[0], Effect::RenderWindow(u) if u.windowed && u.range.end == 120));
        assert!(fetch(&effects).is_some());
        assert!(s.on_frame().is_empty());
    }

    #[test]
    fn test_swipe_and_pinch_in_lightbox() {
        let mut s = session();
        loaded(&mut s, &[10, 20, 30], false, None);
        let doc = document();
        s.open_at(0, None, &doc);

        let t0 = Instant::now();
        s.on_touch(&TouchInput::new(1, TouchPhase::Started, 300.0, 0.0, t0));
        let effects = s.on_touch(&TouchInput::new(
            1,
            TouchPhase::Ended,
            100.0,
            0.0,
            t0 + std::time::Duration::from_millis(100),
        ));
        assert!(effects.contains(&Effect::Lightbox(LightboxEvent::Moved { from: 0, to: 1 })));

        s.on_touch(&TouchInput::new(2, TouchPhase::Started, 100.0, 0.0, t0));
        s.on_touch(&TouchInput::new(3, TouchPhase::Started, 200.0, 0.0, t0));
        let effects = s.on_touch(&TouchInput::new(3, TouchPhase::Moved, 400.0, 0.0, t0));
        assert_eq!(effects, vec![Effect::Zoom(3.0)]);
    }

    #[test]
    fn test_dot_seek_and_late_page_reanchor() {
        let mut s = session();
        let doc = document();
        let effects = s.start("/gallery");
        let first = fetch(&effects).unwrap();

        // A retry of the first cursor races with the second page
        let ticket = s.pagination.begin_with_cursor(Some(Cursor::from(3))).unwrap();
        s.on_page_loaded(ticket, Ok(page(&[4, 5], false, None)), &doc);
        s.open_at(0, None, &doc);
        s.activate_dot(1);
        assert_eq!(s.location(), "/gallery/5");

        s.on_page_loaded(first, Ok(page(&[1, 2, 3], true, Some(3))), &doc);
        assert_eq!(s.lightbox_state().current_index, 4);
        assert_eq!(s.indicator_label(), "5 of 5");
        assert_eq!(s.location(), "/gallery/5");
    }

    #[test]
    fn test_favorites_toggle_updates_query() {
        let favorites = Favorites::load(MemoryStore::new(), "gallery-favorites").unwrap();
        let mut s = session().with_favorites(favorites);
        loaded(&mut s, &[10, 20], false, None);
        let doc = document();
        s.open_at(1, None, &doc);

        let effects = s.handle_command(&Command::new(CommandId::FAVORITES_TOGGLE), &doc);
        assert_eq!(effects, vec![Effect::ReplaceLocation("/gallery/20?favorites=20".into())]);
        assert!(s.is_favorite(20));

        s.handle_command(&Command::new(CommandId::FAVORITES_TOGGLE), &doc);
        assert_eq!(s.location(), "/gallery/20");
    }

    #[test]
    fn test_back_to_grid_closes_lightbox() {
        let mut s = session();
        loaded(&mut s, &[10, 20], false, None);
        let doc = document();
        s.open_at(1, None, &doc);

        let effects = s.on_navigate("/gallery", &doc);
        assert!(effects.iter().any(|e| matches!(e, Effect::Lightbox(LightboxEvent::Closed { .. }))));
        assert!(!s.lightbox_state().is_open);
    }

    #[test]
    fn test_close_returns_focus_to_trigger_not_previous_focus() {
        let mut s = session();
        loaded(&mut s, &[10, 20], false, None);
        let mut doc = document();
        doc.active = Some(ElementId(GRID));

        let effects = s.open_at(0, Some(ElementId(42)), &doc);
        assert!(effects.contains(&Effect::RequestFrame));
        assert_eq!(focus_moves(&s.after_render(&doc)), vec![ElementId(1)]);
        doc.active = Some(ElementId(1));

        let effects = s.handle_command(&Command::new(CommandId::LIGHTBOX_CLOSE), &doc);
        assert!(effects.contains(&Effect::RequestFrame));
        assert_eq!(focus_moves(&s.after_render(&doc)), vec![ElementId(42)]);
    }

    #[test]
    fn test_detached_trigger_falls_back_to_grid() {
        let mut s = session();
        loaded(&mut s, &[10, 20], false, None);
        let mut doc = document();

        s.open_at(1, Some(ElementId(77)), &doc);
        s.after_render(&doc);
        doc.active = Some(ElementId(2));

        s.handle_command(&Command::new(CommandId::LIGHTBOX_CLOSE), &doc);
        assert_eq!(focus_moves(&s.after_render(&doc)), vec![ElementId(GRID)]);
    }

    #[test]
    fn test_touch_lost_while_closed_does_not_block_gestures() {
        let mut s = session();
        loaded(&mut s, &[10, 20, 30], false, None);
        let doc = document();
        let t0 = Instant::now();
        let later = t0 + std::time::Duration::from_millis(100);

        s.open_at(0, None, &doc);
        s.on_touch(&TouchInput::new(1, TouchPhase::Started, 300.0, 0.0, t0));
        s.handle_command(&Command::new(CommandId::LIGHTBOX_ESCAPE), &doc);
        assert!(s.on_touch(&TouchInput::new(1, TouchPhase::Ended, 300.0, 0.0, t0)).is_empty());

        s.open_at(0, None, &doc);
        s.on_touch(&TouchInput::new(2, TouchPhase::Started, 300.0, 0.0, t0));
        let effects = s.on_touch(&TouchInput::new(2, TouchPhase::Ended, 100.0, 0.0, later));
        assert!(effects.contains(&Effect::Lightbox(LightboxEvent::Moved { from: 0, to: 1 })));

        s.on_touch(&TouchInput::new(3, TouchPhase::Started, 100.0, 0.0, t0));
        s.on_touch(&TouchInput::new(4, TouchPhase::Started, 200.0, 0.0, t0));
        let effects = s.on_touch(&TouchInput::new(4, TouchPhase::Moved, 400.0, 0.0, t0));
        assert_eq!(effects, vec![Effect::Zoom(3.0)]);
    }

    #[test]
    fn test_dot_while_closed_keeps_indicator() {
        let mut s = session();
        loaded(&mut s, &[10, 20, 30], false, None);

        assert!(s.activate_dot(2).is_empty());
        assert_eq!(s.indicator_label(), "1 of 3");
        assert!(!s.lightbox_state().is_open);
    }
}
