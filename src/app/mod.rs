use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Align, Context, Layout, Sense};
use tracing::{debug, info, warn};

use crate::canvas::{Canvas, CanvasConfig, CanvasEvent};
use crate::source::ClassProject;
use crate::store::JsonStore;

mod host;
mod input;
mod raster;
mod render;

use host::WorkspaceHost;
use render::PanelTextures;

/// Launch settings gathered from the command line.
#[derive(Clone, Debug)]
pub struct AppSettings {
    pub root: PathBuf,
    pub state_file: PathBuf,
    pub max_zoom_level: u32,
    pub read_only: bool,
}

pub struct ClassPlaneApp {
    settings: AppSettings,
    state: AppState,
    reload_rx: Option<Receiver<Result<ClassProject, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<ClassProject, String>>,
    },
    Ready(Box<Workspace>),
    Error(String),
}

/// A scanned project on the canvas.
struct Workspace {
    canvas: Canvas,
    host: WorkspaceHost,
    textures: PanelTextures,
    selected_title: Option<String>,
    status: Option<String>,
}

impl ClassPlaneApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        let state = Self::start_load(&settings);
        Self {
            settings,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(settings: &AppSettings) -> Receiver<Result<ClassProject, String>> {
        let (tx, rx) = mpsc::channel();
        let root = settings.root.clone();
        let read_only = settings.read_only;

        thread::spawn(move || {
            let result = ClassProject::load(&root, read_only).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(settings: &AppSettings) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(settings),
        }
    }
}

impl eframe::App for ClassPlaneApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(project)) => {
                        transition = Some(AppState::Ready(Box::new(Workspace::new(
                            project,
                            &self.settings,
                        ))));
                    }
                    Ok(Err(error)) => transition = Some(AppState::Error(error)),
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(AppState::Error("Background scan worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Scanning project sources...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to scan project");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.settings));
                    }
                });
            }
            AppState::Ready(workspace) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                workspace.show(ctx, &self.settings, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(&self.settings));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(project)) => workspace.apply_reload(project),
                        Ok(Err(error)) => {
                            warn!(error = %error, "reload failed");
                            workspace.status = Some(format!("Reload failed: {error}"));
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            workspace.status = Some("Background scan worker disconnected".to_owned());
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}

impl Workspace {
    fn new(project: ClassProject, settings: &AppSettings) -> Self {
        let store = JsonStore::open(&settings.state_file);
        let host = WorkspaceHost::new(project, store);
        let config = CanvasConfig {
            max_zoom_level: settings.max_zoom_level,
            ..CanvasConfig::default()
        };
        let mut canvas = Canvas::new(config, &host);
        canvas.begin_loading(host.project.entities().cloned().collect::<Vec<_>>());
        Self {
            canvas,
            host,
            textures: PanelTextures::default(),
            selected_title: None,
            status: None,
        }
    }

    fn show(
        &mut self,
        ctx: &Context,
        settings: &AppSettings,
        reload_requested: &mut bool,
        is_reloading: bool,
    ) {
        let idle = !self.canvas.is_loading() && !self.canvas.is_busy();

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("class-plane");
                    ui.separator();
                    ui.label(format!("root: {}", settings.root.display()));
                    ui.label(format!("classes: {}", self.canvas.panel_count()));
                    let viewport = self.canvas.viewport();
                    ui.label(format!(
                        "zoom: {}/{}",
                        viewport.zoom_level(),
                        viewport.max_level()
                    ));
                    if settings.read_only {
                        ui.label("read-only");
                    }
                    let reload_button = ui.add_enabled(
                        idle && !is_reloading,
                        egui::Button::new("Reload sources"),
                    );
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui.add_enabled(idle, egui::Button::new("Re-layout")).clicked() {
                        self.canvas.relayout(&mut self.host);
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(status) = &self.status {
                            ui.label(status.as_str());
                        }
                        if let Some(title) = &self.selected_title {
                            ui.label(format!("selected: {title}"));
                        }
                    });
                });
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_canvas(ui));

        self.after_frame(ctx);
    }

    fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.handle_canvas_input(ui, rect);
        if self.canvas.has_pending_work() {
            self.canvas.run_pending_work(&mut self.host);
        }

        let painter = ui.painter_at(rect);
        let offset = rect.min.to_vec2();
        let viewport = self.canvas.viewport();
        render::draw_background(&painter, rect, viewport.pan(), viewport.current_zoom());
        render::draw_origin_marker(&painter, &self.canvas, offset);
        render::draw_arrows(&painter, &self.canvas, offset);
        render::draw_panels(&painter, &self.canvas, &self.host, &mut self.textures, offset);
        render::draw_edge_handle(&painter, &self.canvas, offset);
        render::draw_load_status(&painter, &self.canvas, rect);
    }

    fn after_frame(&mut self, ctx: &Context) {
        for event in self.canvas.drain_events() {
            match event {
                CanvasEvent::PanelCreated(entity) => debug!(entity = %entity, "panel created"),
                CanvasEvent::PanelRemoved(entity) => self.host.store.forget(&entity),
                CanvasEvent::SelectionChanged(entity) => {
                    self.selected_title = entity.map(|entity| self.host.title(&entity));
                }
            }
        }

        self.textures.retain_live(&self.canvas);
        if self.canvas.gesture().is_none() && self.host.store.is_dirty() {
            self.host.flush_store();
        }
        if self.canvas.take_repaint_request() || self.canvas.has_pending_work() {
            ctx.request_repaint();
        }
    }

    /// Fold a fresh scan into the canvas.
    fn apply_reload(&mut self, project: ClassProject) {
        let diff = self.host.project.diff(&project);
        if diff.is_empty() {
            self.status = Some("Sources unchanged".to_owned());
            return;
        }
        info!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            changed = diff.changed.len(),
            "applying reload"
        );

        let added_count = diff.added.len();
        self.host.project = project;
        for entity in &diff.removed {
            self.canvas.remove_entity(entity, &mut self.host);
        }
        for entity in diff.added {
            self.canvas.add_entity(entity, &mut self.host);
        }
        for entity in &diff.changed {
            self.canvas.content_changed(entity, &mut self.host);
            self.canvas.structural_change(entity, &self.host);
        }
        // Renamed or added types can satisfy supertypes declared elsewhere.
        self.canvas.rebuild_all(&self.host);
        self.status = Some(format!(
            "Reloaded: {} added, {} removed, {} changed",
            added_count,
            diff.removed.len(),
            diff.changed.len()
        ));
    }
}
