use std::fmt;
use std::time::Duration;

use foundation::{GeoBounds, LatLng};
use formats::RiskCategory;
use futures_util::future::LocalBoxFuture;
use layers::CategoryLayer;
use layers::raster::BaseLayer;
use layers::symbology::{PERSPECTIVE_STROKE_OPACITY, PLANAR_STROKE_OPACITY};
use layers::terrain::{BuildingsLayer, TerrainSource};
use serde::{Deserialize, Serialize};

use crate::config::{Credential, MapConfig};
use crate::controller::ViewController;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Planar,
    Perspective,
}

impl ViewMode {
    pub fn stroke_opacity(self) -> f64 {
        match self {
            ViewMode::Planar => PLANAR_STROKE_OPACITY,
            ViewMode::Perspective => PERSPECTIVE_STROKE_OPACITY,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewMode::Planar => f.write_str("2D"),
            ViewMode::Perspective => f.write_str("3D"),
        }
    }
}

/// On-map controls a surface can host.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlKind {
    BaseLayerSwitcher,
    ScaleBar,
    Legend,
    Navigation,
    Fullscreen,
    Export,
    CategoryVisibility,
    OpacitySlider,
    TerrainToggle,
    ModeToggle,
}

pub const PLANAR_CONTROLS: [ControlKind; 8] = [
    ControlKind::BaseLayerSwitcher,
    ControlKind::ScaleBar,
    ControlKind::Legend,
    ControlKind::Export,
    ControlKind::Fullscreen,
    ControlKind::CategoryVisibility,
    ControlKind::OpacitySlider,
    ControlKind::ModeToggle,
];

pub const PERSPECTIVE_CONTROLS: [ControlKind; 8] = [
    ControlKind::Navigation,
    ControlKind::TerrainToggle,
    ControlKind::ScaleBar,
    ControlKind::Export,
    ControlKind::Fullscreen,
    ControlKind::CategoryVisibility,
    ControlKind::OpacitySlider,
    ControlKind::ModeToggle,
];

/// Terrain-map additions applied once the surface is up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Decoration {
    Terrain(TerrainSource),
    Buildings(BuildingsLayer),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("map container `{0}` not found")]
    MissingContainer(String),
    #[error("3D engine failed to load: {0}")]
    EngineLoad(String),
    #[error("map construction failed: {0}")]
    Construction(String),
    #[error("layer {layer} rejected: {reason}")]
    Layer { layer: String, reason: String },
}

impl SurfaceError {
    /// Any error raised while loading the engine is reported as
    /// [`SurfaceError::EngineLoad`].
    pub fn into_engine_load(self) -> Self {
        match self {
            e @ SurfaceError::EngineLoad(_) => e,
            other => SurfaceError::EngineLoad(other.to_string()),
        }
    }
}

/// Camera and base maps for the tile map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanarView {
    pub center: LatLng,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub max_bounds: GeoBounds,
    pub bounds_viscosity: f64,
    pub base_layers: Vec<BaseLayer>,
}

impl PlanarView {
    pub fn from_config(config: &MapConfig) -> Self {
        let p = &config.planar;
        Self {
            center: config.center,
            zoom: p.zoom,
            min_zoom: p.min_zoom,
            max_zoom: p.max_zoom,
            max_bounds: p.max_bounds,
            bounds_viscosity: p.bounds_viscosity,
            base_layers: p.base_layers.clone(),
        }
    }
}

/// Camera for the terrain map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerspectiveView {
    /// `[lng, lat]`, the order the terrain engine takes.
    pub center: [f64; 2],
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub style: String,
    pub access_token: Credential,
}

impl PerspectiveView {
    pub fn from_config(config: &MapConfig, access_token: Credential) -> Self {
        let p = &config.perspective;
        Self {
            center: config.center.to_lng_lat(),
            zoom: config.planar.zoom + p.zoom_offset,
            min_zoom: p.min_zoom,
            max_zoom: p.max_zoom,
            pitch: p.pitch,
            bearing: p.bearing,
            style: p.style.clone(),
            access_token,
        }
    }
}

/// A live map widget. Exactly one exists at a time.
pub trait MapSurface {
    fn mode(&self) -> ViewMode;
    fn attach_layer(&mut self, layer: &CategoryLayer) -> Result<(), SurfaceError>;
    /// Unknown categories are ignored.
    fn detach_layer(&mut self, category: RiskCategory);
    fn set_layer_visible(&mut self, category: RiskCategory, visible: bool);
    fn set_layer_opacity(&mut self, category: RiskCategory, opacity: f64);
    fn add_decoration(&mut self, decoration: &Decoration) -> Result<(), SurfaceError>;
    fn add_control(&mut self, control: ControlKind);
    /// Shows or hides every on-map control.
    fn set_chrome_visible(&mut self, visible: bool);
    /// Removes listeners and empties the host container.
    fn release(&mut self);
}

/// Builds surfaces inside the host page.
pub trait SurfaceFactory {
    fn create_planar(&self, view: &PlanarView) -> Result<Box<dyn MapSurface>, SurfaceError>;
    fn load_perspective_engine(&self) -> LocalBoxFuture<'static, Result<(), SurfaceError>>;
    fn create_perspective(
        &self,
        view: &PerspectiveView,
    ) -> LocalBoxFuture<'static, Result<Box<dyn MapSurface>, SurfaceError>>;
}

/// Timers and background tasks of the host event loop.
pub trait TaskHost {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
    /// Runs `task` to completion without blocking the caller.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
    /// Called by the async drivers whenever notices or the loading
    /// indicator may have changed.
    fn publish(&self, _controller: &mut ViewController) {}
}
