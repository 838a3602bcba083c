use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::time::Duration;

use chrono::NaiveDate;
use compute::SummaryStats;
use formats::{RiskCategory, RiskFeature};
use futures_util::future::LocalBoxFuture;
use layers::CategoryLayer;
use runtime::{Generation, LazyResource, NoticeBus, NoticeLevel, Ticket};
use serde::Serialize;
use store::{DatasetOrigin, FeatureStore, LoadedDataset};
use tracing::{debug, error, info, warn};

use crate::config::{CredentialError, MapConfig};
use crate::export::{self, ExportError, ExportFile};
use crate::popup::FeaturePopup;
use crate::state::ViewState;
use crate::surface::{
    Decoration, MapSurface, PERSPECTIVE_CONTROLS, PLANAR_CONTROLS, PerspectiveView, PlanarView,
    SurfaceError, SurfaceFactory, ViewMode,
};

pub const ACTIVITY_LOAD_DATA: &str = "Loading map data...";
pub const ACTIVITY_PERSPECTIVE: &str = "Loading 3D terrain...";
pub const ACTIVITY_EXPORT_IMAGE: &str = "Generating map image...";
pub const ACTIVITY_EXPORT_PDF: &str = "Generating PDF...";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ModeState {
    Planar,
    /// The planar surface is gone and the terrain map is being built.
    PerspectivePending { ticket: Ticket },
    Perspective,
}

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("invalid 3D map token: {0}")]
    InvalidCredential(#[from] CredentialError),
    #[error("already in {0} mode")]
    AlreadyInMode(ViewMode),
    #[error("error creating 3D map: {0}")]
    ConstructionFailed(#[source] SurfaceError),
    #[error("map loading timed out after {} seconds", .0.as_secs())]
    ConstructionTimeout(Duration),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub category: RiskCategory,
    pub label: &'static str,
    pub color: String,
}

/// Everything needed to build the terrain map outside the controller.
pub struct PerspectiveRequest {
    pub ticket: Ticket,
    pub view: PerspectiveView,
    pub timeout: Duration,
    load_engine: bool,
    factory: Rc<dyn SurfaceFactory>,
}

impl PerspectiveRequest {
    pub fn loads_engine(&self) -> bool {
        self.load_engine
    }

    /// Loads the engine if needed, then builds the surface.
    pub fn into_future(self) -> LocalBoxFuture<'static, Result<Box<dyn MapSurface>, SurfaceError>> {
        let PerspectiveRequest {
            view,
            load_engine,
            factory,
            ..
        } = self;
        Box::pin(async move {
            if load_engine {
                factory
                    .load_perspective_engine()
                    .await
                    .map_err(SurfaceError::into_engine_load)?;
            }
            factory.create_perspective(&view).await
        })
    }
}

pub enum PerspectiveOutcome {
    Built(Box<dyn MapSurface>),
    Failed(SurfaceError),
    TimedOut,
}

impl From<Result<Box<dyn MapSurface>, SurfaceError>> for PerspectiveOutcome {
    fn from(res: Result<Box<dyn MapSurface>, SurfaceError>) -> Self {
        match res {
            Ok(surface) => PerspectiveOutcome::Built(surface),
            Err(err) => PerspectiveOutcome::Failed(err),
        }
    }
}

/// Owns the dataset, the overlay settings and the single live surface.
///
/// All mutation goes through `&mut self`; async work is split into a
/// `begin_*` call that hands out a [`Ticket`] and a completion that drops
/// results whose ticket is no longer current.
pub struct ViewController {
    config: MapConfig,
    factory: Rc<dyn SurfaceFactory>,
    store: FeatureStore,
    view: ViewState,
    mode: ModeState,
    surface: Option<Box<dyn MapSurface>>,
    attached: BTreeSet<RiskCategory>,
    engine: LazyResource<()>,
    transitions: Generation,
    loads: Generation,
    notices: NoticeBus,
}

impl ViewController {
    pub fn new(config: MapConfig, factory: Rc<dyn SurfaceFactory>) -> Self {
        let view = ViewState::new(&config.palette, config.default_opacity);
        Self {
            config,
            factory,
            store: FeatureStore::new(),
            view,
            mode: ModeState::Planar,
            surface: None,
            attached: BTreeSet::new(),
            engine: LazyResource::new("terrain engine"),
            transitions: Generation::new(),
            loads: Generation::new(),
            notices: NoticeBus::new(),
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn notices(&self) -> &NoticeBus {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut NoticeBus {
        &mut self.notices
    }

    pub fn mode_state(&self) -> ModeState {
        self.mode
    }

    /// The mode the user asked for; a pending transition counts as
    /// Perspective.
    pub fn view_mode(&self) -> ViewMode {
        match self.mode {
            ModeState::Planar => ViewMode::Planar,
            _ => ViewMode::Perspective,
        }
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn attached_categories(&self) -> impl Iterator<Item = RiskCategory> + '_ {
        self.attached.iter().copied()
    }

    pub fn engine_ready(&self) -> bool {
        self.engine.is_ready()
    }

    /// Builds the tile map. Any existing surface is released first.
    pub fn initialize(&mut self) -> Result<(), ViewError> {
        self.cancel_pending();
        self.release_surface();
        self.transitions.advance();
        self.mode = ModeState::Planar;
        self.build_planar()
    }

    pub fn begin_load(&mut self) -> Ticket {
        let ticket = self.loads.advance();
        self.notices.begin_activity(ACTIVITY_LOAD_DATA);
        debug!(%ticket, "dataset load started");
        ticket
    }

    /// Installs a loaded dataset. Returns `false` when a newer load has
    /// started since `ticket` was handed out.
    pub fn finish_load(&mut self, ticket: Ticket, loaded: LoadedDataset) -> bool {
        self.notices.end_activity(ACTIVITY_LOAD_DATA);
        if !self.loads.is_current(ticket) {
            debug!(%ticket, "stale dataset load dropped");
            return false;
        }
        if let DatasetOrigin::Fallback { reason } = &loaded.origin {
            self.notices.emit(
                ticket,
                NoticeLevel::Diagnostic,
                "dataset-fallback",
                format!("using sample data: {reason}"),
            );
        }
        self.detach_layers();
        self.store.replace(loaded.dataset);
        self.attach_layers();
        info!(features = self.store.len(), revision = self.store.revision(), "dataset installed");
        true
    }

    /// No Risk has no layer; toggling it only updates the stored state.
    pub fn toggle_category(&mut self, category: RiskCategory, visible: bool) {
        if !category.is_layered() {
            debug!(%category, "category has no layer");
            return;
        }
        self.view.set_visible(category, visible);
        if self.attached.contains(&category) {
            if let Some(surface) = self.surface.as_mut() {
                surface.set_layer_visible(category, visible);
            }
        }
    }

    /// Hides everything if anything is visible, otherwise shows everything.
    /// Returns the new visibility.
    pub fn toggle_all_categories(&mut self) -> bool {
        let show = !self.view.any_visible();
        for category in RiskCategory::LAYERED {
            self.toggle_category(category, show);
        }
        show
    }

    pub fn all_visible(&self) -> bool {
        self.view.all_visible()
    }

    /// Returns the clamped opacity actually applied.
    pub fn set_opacity(&mut self, opacity: f64) -> f64 {
        let opacity = self.view.set_opacity(opacity);
        if let Some(surface) = self.surface.as_mut() {
            for category in &self.attached {
                surface.set_layer_opacity(*category, opacity);
            }
        }
        opacity
    }

    pub fn set_opacity_percent(&mut self, percent: f64) -> f64 {
        self.set_opacity(percent / 100.0)
    }

    /// Feature counts per layered category, for the toggle panel.
    pub fn category_counts(&self) -> BTreeMap<RiskCategory, usize> {
        RiskCategory::LAYERED
            .into_iter()
            .map(|c| (c, self.store.category_count(c)))
            .collect()
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        self.config
            .palette
            .legend()
            .into_iter()
            .map(|(category, color)| LegendEntry {
                category,
                label: category.label(),
                color: color.to_string(),
            })
            .collect()
    }

    pub fn feature_popup(&self, feature: &RiskFeature) -> FeaturePopup {
        FeaturePopup::new(feature, &self.config.palette, self.view_mode())
    }

    pub fn summary(&self) -> SummaryStats {
        self.store
            .dataset()
            .map(compute::summarize)
            .unwrap_or_default()
    }

    /// Validates the credential and tears down the tile map. The returned
    /// request builds the terrain map; feed its result to
    /// [`ViewController::complete_perspective`].
    pub fn begin_perspective(&mut self) -> Result<PerspectiveRequest, ViewError> {
        if self.mode != ModeState::Planar {
            return Err(ViewError::AlreadyInMode(ViewMode::Perspective));
        }
        let credential = match self.config.credential() {
            Ok(c) => c,
            Err(err) => {
                self.notices.emit(
                    self.transitions.current(),
                    NoticeLevel::Blocking,
                    "credential",
                    err.to_string(),
                );
                return Err(err.into());
            }
        };

        self.release_surface();
        let ticket = self.transitions.advance();
        self.mode = ModeState::PerspectivePending { ticket };
        self.notices.begin_activity(ACTIVITY_PERSPECTIVE);
        let load_engine = self.engine.begin_init();
        info!(%ticket, load_engine, "switching to 3D");

        Ok(PerspectiveRequest {
            ticket,
            view: PerspectiveView::from_config(&self.config, credential),
            timeout: self.config.perspective_timeout(),
            load_engine,
            factory: Rc::clone(&self.factory),
        })
    }

    /// Installs the terrain map, or reverts to the tile map when it could
    /// not be built. Surfaces arriving for a stale ticket are released.
    pub fn complete_perspective(
        &mut self,
        ticket: Ticket,
        outcome: PerspectiveOutcome,
    ) -> Result<(), ViewError> {
        self.record_engine_outcome(&outcome);

        if self.mode != (ModeState::PerspectivePending { ticket }) {
            if let PerspectiveOutcome::Built(mut surface) = outcome {
                surface.release();
            }
            debug!(%ticket, "stale 3D completion dropped");
            return Ok(());
        }
        self.notices.end_activity(ACTIVITY_PERSPECTIVE);

        let err = match outcome {
            PerspectiveOutcome::Built(surface) => match self.install_perspective(surface) {
                Ok(()) => return Ok(()),
                Err(e) => ViewError::ConstructionFailed(e),
            },
            PerspectiveOutcome::Failed(e) => ViewError::ConstructionFailed(e),
            PerspectiveOutcome::TimedOut => {
                ViewError::ConstructionTimeout(self.config.perspective_timeout())
            }
        };

        self.notices
            .emit(ticket, NoticeLevel::Blocking, "perspective", err.to_string());
        self.transitions.advance();
        self.mode = ModeState::Planar;
        if let Err(revert) = self.build_planar() {
            error!(error = %revert, "could not restore 2D map");
        }
        Err(err)
    }

    /// Releases the terrain map (or abandons a pending one) and rebuilds the
    /// tile map with the stored visibility and opacity.
    pub fn switch_to_planar(&mut self) -> Result<(), ViewError> {
        if self.mode == ModeState::Planar {
            return Err(ViewError::AlreadyInMode(ViewMode::Planar));
        }
        self.cancel_pending();
        self.release_surface();
        self.transitions.advance();
        self.mode = ModeState::Planar;
        info!("switching to 2D");
        self.build_planar()
    }

    /// Releases the surface and unloads the terrain engine.
    pub fn shutdown(&mut self) {
        self.cancel_pending();
        self.release_surface();
        self.transitions.advance();
        self.mode = ModeState::Planar;
        if self.engine.teardown().is_some() {
            debug!("terrain engine unloaded");
        }
    }

    pub fn begin_capture(&mut self, activity: &'static str) {
        self.notices.begin_activity(activity);
        if let Some(surface) = self.surface.as_mut() {
            surface.set_chrome_visible(false);
        }
    }

    pub fn end_capture(&mut self, activity: &'static str) {
        if let Some(surface) = self.surface.as_mut() {
            surface.set_chrome_visible(true);
        }
        self.notices.end_activity(activity);
    }

    pub fn report_export_error(&mut self, err: &ExportError) {
        self.notices.emit(
            self.transitions.current(),
            err.notice_level(),
            "export",
            err.to_string(),
        );
    }

    pub fn export_data(&mut self, date: NaiveDate) -> Result<ExportFile, ExportError> {
        let res = export::export_data(&self.store, &self.config.export.data_prefix, date);
        if let Err(err) = &res {
            self.report_export_error(err);
        }
        res
    }

    pub fn export_report(&mut self, date: NaiveDate) -> Result<ExportFile, ExportError> {
        let res = export::export_report(&self.store, &self.config.export.report_prefix, date);
        if let Err(err) = &res {
            self.report_export_error(err);
        }
        res
    }

    fn build_planar(&mut self) -> Result<(), ViewError> {
        let view = PlanarView::from_config(&self.config);
        let mut surface = match self.factory.create_planar(&view) {
            Ok(s) => s,
            Err(err) => {
                self.notices.emit(
                    self.transitions.current(),
                    NoticeLevel::Blocking,
                    "surface",
                    err.to_string(),
                );
                return Err(err.into());
            }
        };
        for control in PLANAR_CONTROLS {
            surface.add_control(control);
        }
        self.surface = Some(surface);
        self.attach_layers();
        debug!(layers = self.attached.len(), "2D map ready");
        Ok(())
    }

    fn install_perspective(&mut self, mut surface: Box<dyn MapSurface>) -> Result<(), SurfaceError> {
        let decorations = [
            Decoration::Terrain(self.config.perspective.terrain.clone()),
            Decoration::Buildings(self.config.perspective.buildings.clone()),
        ];
        for decoration in &decorations {
            if let Err(err) = surface.add_decoration(decoration) {
                surface.release();
                return Err(err);
            }
        }
        for control in PERSPECTIVE_CONTROLS {
            surface.add_control(control);
        }
        self.surface = Some(surface);
        self.mode = ModeState::Perspective;
        self.attach_layers();
        info!(layers = self.attached.len(), "3D map ready");
        Ok(())
    }

    fn record_engine_outcome(&mut self, outcome: &PerspectiveOutcome) {
        match outcome {
            PerspectiveOutcome::Failed(SurfaceError::EngineLoad(reason)) => {
                if !self.engine.is_ready() {
                    self.engine.finish_init(Err(reason.clone()));
                }
            }
            PerspectiveOutcome::TimedOut => {
                if self.engine.is_loading() {
                    self.engine.finish_init(Err("timed out".to_string()));
                }
            }
            // The surface is only requested once the engine is up.
            PerspectiveOutcome::Built(_) | PerspectiveOutcome::Failed(_) => {
                if !self.engine.is_ready() {
                    self.engine.begin_init();
                    self.engine.finish_init(Ok(()));
                }
            }
        }
    }

    fn cancel_pending(&mut self) {
        if let ModeState::PerspectivePending { ticket } = self.mode {
            debug!(%ticket, "pending 3D transition abandoned");
            self.notices.end_activity(ACTIVITY_PERSPECTIVE);
        }
    }

    fn attach_layers(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let partition = self.store.partition_by_category();
        let view = &self.view;
        let layers = CategoryLayer::build_all(
            &partition,
            &self.config.palette,
            |c| view.is_visible(c),
            view.opacity(),
            surface.mode().stroke_opacity(),
        );
        for layer in layers.iter().filter(|l| !l.is_empty()) {
            match surface.attach_layer(layer) {
                Ok(()) => {
                    self.attached.insert(layer.category);
                }
                Err(err) => {
                    warn!(category = %layer.category, error = %err, "layer not attached");
                    self.notices.emit(
                        self.transitions.current(),
                        NoticeLevel::Diagnostic,
                        "layer",
                        err.to_string(),
                    );
                }
            }
        }
    }

    fn detach_layers(&mut self) {
        let attached = std::mem::take(&mut self.attached);
        if let Some(surface) = self.surface.as_mut() {
            for category in attached {
                surface.detach_layer(category);
            }
        }
    }

    fn release_surface(&mut self) {
        self.detach_layers();
        if let Some(mut surface) = self.surface.take() {
            let mode = surface.mode();
            surface.release();
            debug!(%mode, "surface released");
        }
    }
}
