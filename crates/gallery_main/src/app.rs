//! Application main loop
//!
//! A winit window hosts one gallery session. There is no image rendering
//! here: the window title shows the session state, and effects are logged.

use anyhow::Result;
use gallery_core::{
    fetch_with_retry, Command, CommandId, ElementId, FavoritesConfig, Favorites, FetchError,
    FileStore, GalleryConfig, HttpPageSource, PageResponse, PageTicket, RetryPolicy, ScrollHost,
    ScrollLock, Viewport, WindowRange,
};
use gallery_ui::{
    Effect, FocusHost, FocusableNode, FullscreenState, GallerySession, InputHandler,
    SessionElements, TouchInput,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    window::{Fullscreen, Window, WindowId},
};

const LIGHTBOX: ElementId = ElementId(1);
const GRID: ElementId = ElementId(2);
const BUTTON_PREV: ElementId = ElementId(10);
const BUTTON_NEXT: ElementId = ElementId(11);
const BUTTON_CLOSE: ElementId = ElementId(12);
const BUTTON_FAVORITE: ElementId = ElementId(13);
const BUTTON_FULLSCREEN: ElementId = ElementId(14);
/// Grid items are `ITEM_BASE + index`
const ITEM_BASE: u64 = 1_000;

const LINE_SCROLL_PX: f64 = 120.0;

/// Events delivered to the loop from fetch tasks
#[derive(Debug)]
enum UserEvent {
    PageLoaded {
        ticket: PageTicket,
        result: Result<PageResponse, FetchError>,
    },
}

/// Wheel scrolling is ignored while a modal holds the scroll lock
struct WheelGate(Arc<AtomicBool>);

impl ScrollHost for WheelGate {
    fn set_page_scroll(&mut self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }
}

/// The window's stand-in for a document: which elements exist and which has focus
#[derive(Debug, Default)]
struct Document {
    active: Option<ElementId>,
    lightbox_open: bool,
    fullscreen_control: bool,
    mounted: WindowRange,
}

impl FocusHost for Document {
    fn active_element(&self) -> Option<ElementId> {
        self.active
    }

    fn focus(&mut self, id: ElementId) {
        self.active = Some(id);
    }

    fn is_attached(&self, id: ElementId) -> bool {
        match id {
            GRID => true,
            LIGHTBOX | BUTTON_PREV | BUTTON_NEXT | BUTTON_CLOSE | BUTTON_FAVORITE => self.lightbox_open,
            BUTTON_FULLSCREEN => self.lightbox_open && self.fullscreen_control,
            ElementId(raw) if raw >= ITEM_BASE => self.mounted.contains((raw - ITEM_BASE) as usize),
            _ => false,
        }
    }

    fn focusable_within(&self, container: ElementId) -> Vec<FocusableNode> {
        if container != LIGHTBOX || !self.lightbox_open {
            return Vec::new();
        }
        let mut fullscreen = FocusableNode::control(BUTTON_FULLSCREEN.0);
        fullscreen.hidden = !self.fullscreen_control;
        vec![
            FocusableNode::control(BUTTON_CLOSE.0),
            FocusableNode::control(BUTTON_PREV.0),
            FocusableNode::control(BUTTON_NEXT.0),
            FocusableNode::control(BUTTON_FAVORITE.0),
            fullscreen,
        ]
    }
}

/// Main application state for the event loop
struct App {
    config: GalleryConfig,
    initial_path: String,
    runtime: tokio::runtime::Runtime,
    source: Arc<HttpPageSource>,
    proxy: EventLoopProxy<UserEvent>,

    window: Option<Arc<Window>>,
    session: Option<GallerySession>,
    input_handler: InputHandler,
    document: Document,
    wheel_enabled: Arc<AtomicBool>,

    // Host-side state
    scroll_top: f64,
    grid_cursor: usize,
    status: String,
}

impl App {
    fn new(config: GalleryConfig, initial_path: String, proxy: EventLoopProxy<UserEvent>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("gallery-fetch")
            .build()?;
        let source = Arc::new(HttpPageSource::new(&config.api)?);
        let input_handler = InputHandler::new(&config.keybindings);

        Ok(Self {
            config,
            initial_path,
            runtime,
            source,
            proxy,
            window: None,
            session: None,
            input_handler,
            document: Document::default(),
            wheel_enabled: Arc::new(AtomicBool::new(true)),
            scroll_top: 0.0,
            grid_cursor: 0,
            status: String::new(),
        })
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title("PhotoGallery")
            .with_inner_size(LogicalSize::new(1280.0, 800.0));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let fullscreen = FullscreenState::new(event_loop.primary_monitor().is_some());
        self.document.fullscreen_control = fullscreen.is_available();

        let scroll_lock = ScrollLock::new(WheelGate(Arc::clone(&self.wheel_enabled)));
        let elements = SessionElements {
            lightbox: LIGHTBOX,
            grid: GRID,
        };
        let mut session = GallerySession::new(&self.config, scroll_lock, fullscreen, elements);
        if let Some(favorites) = load_favorites(&self.config.favorites) {
            session = session.with_favorites(favorites);
        }

        let mut effects = session.start(&self.initial_path);
        self.window = Some(window);
        self.session = Some(session);

        effects.extend(self.push_viewport());
        self.apply_effects(effects);
        Ok(())
    }

    /// Report the current scroll position and window size to the session
    fn push_viewport(&mut self) -> Vec<Effect> {
        let (Some(window), Some(session)) = (&self.window, &mut self.session) else {
            return Vec::new();
        };
        let size = window.inner_size().to_logical::<f64>(window.scale_factor());
        session.on_viewport(Viewport::new(self.scroll_top, size.height, size.width))
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchPage(ticket) => self.spawn_fetch(ticket),
                Effect::RequestFrame => {
                    if let Some(window) = &self.window {
                        window.request_redraw();
                    }
                }
                Effect::RenderWindow(update) => {
                    tracing::debug!(start = update.range.start, end = update.range.end, columns = update.columns, "Render window");
                    self.document.mounted = update.range;
                }
                Effect::Lightbox(event) => {
                    tracing::debug!(?event, "Lightbox");
                    self.document.lightbox_open = self
                        .session
                        .as_ref()
                        .is_some_and(|s| s.lightbox_state().is_open);
                }
                Effect::Focus(id) => self.document.focus(id),
                Effect::ReplaceLocation(path) => tracing::info!(%path, "Location"),
                Effect::NotFound(id) => {
                    tracing::warn!(?id, "Image not found");
                    self.status = "Image not found".to_string();
                }
                Effect::LoadFailed { message, retryable } => {
                    self.status = if retryable {
                        format!("{} (press R to retry)", message)
                    } else {
                        message
                    };
                }
                Effect::Fullscreen(active) => {
                    if let Some(window) = &self.window {
                        window.set_fullscreen(active.then_some(Fullscreen::Borderless(None)));
                    }
                }
                Effect::Zoom(scale) => tracing::debug!(scale, "Zoom"),
            }
        }
        self.update_title();
    }

    fn spawn_fetch(&self, ticket: PageTicket) {
        let source = Arc::clone(&self.source);
        let retry: RetryPolicy = self.config.retry.clone();
        let proxy = self.proxy.clone();

        self.runtime.spawn(async move {
            let result = fetch_with_retry(source.as_ref(), &ticket.request, &retry).await;
            if proxy.send_event(UserEvent::PageLoaded { ticket, result }).is_err() {
                tracing::debug!("Event loop closed before page arrived");
            }
        });
    }

    fn update_title(&self) {
        let (Some(window), Some(session)) = (&self.window, &self.session) else {
            return;
        };
        let state = session.lightbox_state();
        let mut title = format!("PhotoGallery - {}", session.location());

        if state.is_open {
            if let Some(image) = session.collection().get(state.current_index) {
                title.push_str(&format!(" - {}", session.indicator_label()));
                if let Some(caption) = &image.caption {
                    title.push_str(&format!(" - {}", caption));
                }
                if session.is_favorite(image.id) {
                    title.push_str(" *");
                }
            }
        } else {
            title.push_str(&format!(
                " - {} images, item {}",
                session.collection().len(),
                self.grid_cursor + 1
            ));
        }
        if !self.status.is_empty() {
            title.push_str(&format!(" [{}]", self.status));
        }
        window.set_title(&title);
    }

    fn execute_command(&mut self, command: Command) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let open = session.lightbox_state().is_open;
        let len = session.collection().len();

        // Arrows walk the grid while the lightbox is closed
        let command = match command.id.as_str() {
            CommandId::LIGHTBOX_NEXT | CommandId::LIGHTBOX_PREV if !open => {
                if len > 0 {
                    self.grid_cursor = if command.is(CommandId::LIGHTBOX_NEXT) {
                        (self.grid_cursor + 1).min(len - 1)
                    } else {
                        self.grid_cursor.saturating_sub(1)
                    };
                    self.document.active = Some(ElementId(ITEM_BASE + self.grid_cursor as u64));
                }
                self.update_title();
                return;
            }
            CommandId::GALLERY_OPEN_FOCUSED => command.with_int(self.grid_cursor as i64),
            CommandId::GALLERY_LOAD_MORE => {
                self.status.clear();
                command
            }
            _ => command,
        };

        let effects = session.handle_command(&command, &self.document);
        self.apply_effects(effects);
    }
}

fn load_favorites(config: &FavoritesConfig) -> Option<Favorites> {
    let path = config.resolved_store_path();
    let loaded = FileStore::open(&path).and_then(|store| Favorites::load(store, &config.storage_key));
    match loaded {
        Ok(favorites) => {
            tracing::info!(count = favorites.len(), path = %path.display(), "Favorites loaded");
            Some(favorites)
        }
        Err(e) => {
            tracing::warn!("Favorites unavailable: {}", e);
            None
        }
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init_window(event_loop) {
                tracing::error!("Failed to initialize window: {}", e);
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::PageLoaded { ticket, result } => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                let effects = session.on_page_loaded(ticket, result, &self.document);
                self.apply_effects(effects);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested");
                if let Some(session) = self.session.as_mut() {
                    session.shutdown();
                }
                event_loop.exit();
            }

            WindowEvent::Resized(_) => {
                let effects = self.push_viewport();
                self.apply_effects(effects);
            }

            WindowEvent::MouseWheel { delta, .. } => {
                if !self.wheel_enabled.load(Ordering::Relaxed) {
                    return;
                }
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y as f64 * LINE_SCROLL_PX,
                    MouseScrollDelta::PixelDelta(pos) => pos.y,
                };
                self.scroll_top = (self.scroll_top - dy).max(0.0);
                let effects = self.push_viewport();
                self.apply_effects(effects);
            }

            WindowEvent::ModifiersChanged(modifiers) => {
                self.input_handler.update_modifiers(modifiers.state());
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(command) = self.input_handler.handle_key(&event) {
                    self.execute_command(command);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(command) = self.input_handler.handle_mouse_button(button, state) {
                    self.execute_command(command);
                }
            }

            WindowEvent::Touch(touch) => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                let effects = session.on_touch(&TouchInput::from_winit(&touch, Instant::now()));
                self.apply_effects(effects);
            }

            WindowEvent::RedrawRequested => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                let mut effects = session.on_frame();
                effects.extend(session.after_render(&self.document));
                self.apply_effects(effects);
            }

            _ => {}
        }
    }
}

/// Run the application
pub fn run(config: GalleryConfig, initial_path: String) -> Result<()> {
    let event_loop = EventLoop::<UserEvent>::with_user_event().build()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, initial_path, event_loop.create_proxy())?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
