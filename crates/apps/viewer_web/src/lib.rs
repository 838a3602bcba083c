use console_error_panic_hook::set_once;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use formats::{RiskCategory, RiskFeature};
use viewer::export::{self, ExportFile};
use viewer::{MapConfig, ViewController};

mod host;
use host::{
    GlooFetcher, MapHost, WebFactory, WebPdfBuilder, WebRasterizer, WebTaskHost, publish_to,
};

#[derive(Clone)]
struct App {
    controller: Rc<RefCell<ViewController>>,
    host: MapHost,
}

impl App {
    fn tasks(&self) -> WebTaskHost {
        WebTaskHost::new(self.host.clone())
    }

    fn publish(&self) {
        publish_to(&self.host, &mut self.controller.borrow_mut());
    }

    fn download(&self, file: &ExportFile) {
        self.host.download(&file.file_name, file.mime, &file.bytes);
    }
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

fn app() -> Result<App, JsValue> {
    APP.with(|app| app.borrow().clone())
        .ok_or_else(|| JsValue::from_str("map is not initialized"))
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn category(label: &str) -> Result<RiskCategory, JsValue> {
    RiskCategory::from_label(label)
        .ok_or_else(|| JsValue::from_str(&format!("unknown risk category {label:?}")))
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Builds the 2D map and starts loading the dataset. Any previous map is
/// destroyed first.
#[wasm_bindgen]
pub fn initialize_map(host: MapHost, config_json: Option<String>) -> Result<(), JsValue> {
    destroy_map();
    let config = match config_json {
        Some(json) => {
            MapConfig::from_json_str(&json).map_err(|e| JsValue::from_str(&e.to_string()))?
        }
        None => MapConfig::default(),
    };
    let factory = Rc::new(WebFactory::new(host.clone()));
    let controller = Rc::new(RefCell::new(ViewController::new(config, factory)));
    let app = App { controller, host };

    let res = app.controller.borrow_mut().initialize();
    app.publish();
    res.map_err(|e| JsValue::from_str(&e.to_string()))?;

    APP.with(|slot| *slot.borrow_mut() = Some(app));
    reload_data()
}

/// Refetches the dataset, falling back to the bundled sample on failure.
#[wasm_bindgen]
pub fn reload_data() -> Result<(), JsValue> {
    let app = app()?;
    spawn_local(async move {
        let tasks = app.tasks();
        if !viewer::load_dataset(&app.controller, &GlooFetcher, &tasks).await {
            warn!("dataset load superseded");
        }
    });
    Ok(())
}

#[wasm_bindgen]
pub fn toggle_risk_zone(label: &str, visible: bool) -> Result<(), JsValue> {
    let category = category(label)?;
    app()?
        .controller
        .borrow_mut()
        .toggle_category(category, visible);
    Ok(())
}

/// Returns whether the layers are now shown.
#[wasm_bindgen]
pub fn toggle_all_risk_zones() -> Result<bool, JsValue> {
    Ok(app()?.controller.borrow_mut().toggle_all_categories())
}

#[wasm_bindgen]
pub fn all_risk_zones_visible() -> Result<bool, JsValue> {
    Ok(app()?.controller.borrow().all_visible())
}

/// Returns the applied opacity as a percentage.
#[wasm_bindgen]
pub fn set_opacity_percent(percent: f64) -> Result<f64, JsValue> {
    let applied = app()?.controller.borrow_mut().set_opacity_percent(percent);
    Ok(applied * 100.0)
}

#[wasm_bindgen]
pub fn category_counts() -> Result<String, JsValue> {
    let counts: Vec<(&str, usize)> = app()?
        .controller
        .borrow()
        .category_counts()
        .into_iter()
        .map(|(c, n)| (c.label(), n))
        .collect();
    to_js(&counts)
}

#[wasm_bindgen]
pub fn legend() -> Result<String, JsValue> {
    to_js(&app()?.controller.borrow().legend())
}

#[wasm_bindgen]
pub fn summary() -> Result<String, JsValue> {
    to_js(&app()?.controller.borrow().summary())
}

/// Popup markup for a clicked GeoJSON feature.
#[wasm_bindgen]
pub fn popup_html(feature_json: &str) -> Result<String, JsValue> {
    let value: serde_json::Value =
        serde_json::from_str(feature_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let feature =
        RiskFeature::from_geojson_value(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(app()?.controller.borrow().feature_popup(&feature).to_html())
}

/// Switches between the 2D and 3D maps. Errors surface through the host's
/// notices.
#[wasm_bindgen]
pub fn toggle_3d_mode() -> Result<(), JsValue> {
    let app = app()?;
    spawn_local(async move {
        let tasks = app.tasks();
        if let Err(err) = viewer::toggle_view_mode(&app.controller, &tasks).await {
            warn!(%err, "view mode switch failed");
        }
    });
    Ok(())
}

#[wasm_bindgen]
pub fn export_image() -> Result<(), JsValue> {
    let app = app()?;
    spawn_local(async move {
        let tasks = app.tasks();
        let rasterizer = app
            .host
            .has_rasterizer()
            .then(|| WebRasterizer::new(app.host.clone()));
        let res = export::export_image(
            &app.controller,
            rasterizer.as_ref().map(|r| r as &dyn export::Rasterizer),
            &tasks,
            export::export_date(),
        )
        .await;
        if let Ok(file) = res {
            app.download(&file);
        }
    });
    Ok(())
}

#[wasm_bindgen]
pub fn export_pdf() -> Result<(), JsValue> {
    let app = app()?;
    spawn_local(async move {
        let tasks = app.tasks();
        let rasterizer = app
            .host
            .has_rasterizer()
            .then(|| WebRasterizer::new(app.host.clone()));
        let builder = app
            .host
            .has_pdf_builder()
            .then(|| WebPdfBuilder::new(app.host.clone()));
        let res = export::export_document(
            &app.controller,
            rasterizer.as_ref().map(|r| r as &dyn export::Rasterizer),
            builder.as_ref().map(|b| b as &dyn export::DocumentBuilder),
            &tasks,
            export::export_date(),
        )
        .await;
        if let Ok(file) = res {
            app.download(&file);
        }
    });
    Ok(())
}

#[wasm_bindgen]
pub fn export_data() -> Result<(), JsValue> {
    let app = app()?;
    let res = app
        .controller
        .borrow_mut()
        .export_data(export::export_date());
    app.publish();
    if let Ok(file) = res {
        app.download(&file);
    }
    Ok(())
}

#[wasm_bindgen]
pub fn export_report() -> Result<(), JsValue> {
    let app = app()?;
    let res = app
        .controller
        .borrow_mut()
        .export_report(export::export_date());
    app.publish();
    if let Ok(file) = res {
        app.download(&file);
    }
    Ok(())
}

/// Releases the map and unloads the terrain engine.
#[wasm_bindgen]
pub fn destroy_map() {
    if let Some(app) = APP.with(|slot| slot.borrow_mut().take()) {
        app.controller.borrow_mut().shutdown();
        app.publish();
    }
}
