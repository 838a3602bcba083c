//! Bindings to the page's map widgets and the trait impls over them.

use std::time::Duration;

use formats::RiskCategory;
use futures_util::future::LocalBoxFuture;
use gloo_net::http::Request;
use js_sys::{Promise, Reflect, Uint8Array};
use layers::{CategoryLayer, Layer};
use runtime::NoticeLevel;
use serde_json::json;
use store::{DatasetFetcher, FetchError};
use viewer::export::{DocumentBuilder, PageLayout, RasterImage, Rasterizer};
use viewer::{
    ControlKind, Decoration, MapSurface, PerspectiveView, PlanarView, SurfaceError,
    SurfaceFactory, TaskHost, ViewController, ViewMode,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};

#[wasm_bindgen]
extern "C" {
    /// Page object owning the map container, the tile and terrain map
    /// libraries, image capture and PDF encoding.
    #[derive(Clone)]
    pub type MapHost;

    #[wasm_bindgen(method, catch, js_name = createPlanar)]
    fn create_planar(this: &MapHost, view: &str) -> Result<JsSurface, JsValue>;

    #[wasm_bindgen(method, js_name = loadPerspectiveEngine)]
    fn load_perspective_engine(this: &MapHost) -> Promise;

    #[wasm_bindgen(method, js_name = createPerspective)]
    fn create_perspective(this: &MapHost, view: &str) -> Promise;

    #[wasm_bindgen(method, js_name = hasRasterizer)]
    pub fn has_rasterizer(this: &MapHost) -> bool;

    #[wasm_bindgen(method, js_name = captureMap)]
    fn capture_map(this: &MapHost) -> Promise;

    #[wasm_bindgen(method, js_name = hasPdfBuilder)]
    pub fn has_pdf_builder(this: &MapHost) -> bool;

    #[wasm_bindgen(method, catch, js_name = buildPdf)]
    fn build_pdf(this: &MapHost, layout: &str, png: &[u8]) -> Result<Uint8Array, JsValue>;

    #[wasm_bindgen(method)]
    pub fn download(this: &MapHost, file_name: &str, mime: &str, bytes: &[u8]);

    #[wasm_bindgen(method)]
    fn notify(this: &MapHost, level: &str, message: &str);

    #[wasm_bindgen(method, js_name = setBusy)]
    fn set_busy(this: &MapHost, label: Option<String>);

    /// A live tile or terrain map created by [`MapHost`].
    pub type JsSurface;

    #[wasm_bindgen(method, catch, js_name = attachLayer)]
    fn attach_layer(this: &JsSurface, layer: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = detachLayer)]
    fn detach_layer(this: &JsSurface, slug: &str);

    #[wasm_bindgen(method, js_name = setLayerVisible)]
    fn set_layer_visible(this: &JsSurface, slug: &str, visible: bool);

    #[wasm_bindgen(method, js_name = setLayerOpacity)]
    fn set_layer_opacity(this: &JsSurface, slug: &str, opacity: f64);

    #[wasm_bindgen(method, catch, js_name = addDecoration)]
    fn add_decoration(this: &JsSurface, decoration: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = addControl)]
    fn add_control(this: &JsSurface, control: &str);

    #[wasm_bindgen(method, js_name = setChromeVisible)]
    fn set_chrome_visible(this: &JsSurface, visible: bool);

    #[wasm_bindgen(method)]
    fn release(this: &JsSurface);
}

fn js_error_message(err: &JsValue) -> String {
    if let Some(e) = err.dyn_ref::<js_sys::Error>() {
        return String::from(e.message());
    }
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, SurfaceError> {
    serde_json::to_string(value).map_err(|e| SurfaceError::Construction(e.to_string()))
}

pub struct WebSurface {
    mode: ViewMode,
    handle: JsSurface,
}

impl MapSurface for WebSurface {
    fn mode(&self) -> ViewMode {
        self.mode
    }

    fn attach_layer(&mut self, layer: &CategoryLayer) -> Result<(), SurfaceError> {
        let payload = json!({
            "category": layer.category.label(),
            "slug": layer.category.slug(),
            "ids": layer.ids,
            "style": layer.style,
            "highlight": layer.style.highlighted(),
            "data": layer.features.to_geojson_value(),
        });
        self.handle
            .attach_layer(&payload.to_string())
            .map_err(|e| SurfaceError::Layer {
                layer: layer.id().to_string(),
                reason: js_error_message(&e),
            })
    }

    fn detach_layer(&mut self, category: RiskCategory) {
        self.handle.detach_layer(category.slug());
    }

    fn set_layer_visible(&mut self, category: RiskCategory, visible: bool) {
        self.handle.set_layer_visible(category.slug(), visible);
    }

    fn set_layer_opacity(&mut self, category: RiskCategory, opacity: f64) {
        self.handle.set_layer_opacity(category.slug(), opacity);
    }

    fn add_decoration(&mut self, decoration: &Decoration) -> Result<(), SurfaceError> {
        let payload = to_json(decoration)?;
        self.handle
            .add_decoration(&payload)
            .map_err(|e| SurfaceError::Construction(js_error_message(&e)))
    }

    fn add_control(&mut self, control: ControlKind) {
        if let Ok(serde_json::Value::String(name)) = serde_json::to_value(control) {
            self.handle.add_control(&name);
        }
    }

    fn set_chrome_visible(&mut self, visible: bool) {
        self.handle.set_chrome_visible(visible);
    }

    fn release(&mut self) {
        self.handle.release();
    }
}

pub struct WebFactory {
    host: MapHost,
}

impl WebFactory {
    pub fn new(host: MapHost) -> Self {
        Self { host }
    }
}

impl SurfaceFactory for WebFactory {
    fn create_planar(&self, view: &PlanarView) -> Result<Box<dyn MapSurface>, SurfaceError> {
        let handle = self
            .host
            .create_planar(&to_json(view)?)
            .map_err(|e| SurfaceError::Construction(js_error_message(&e)))?;
        Ok(Box::new(WebSurface {
            mode: ViewMode::Planar,
            handle,
        }))
    }

    fn load_perspective_engine(&self) -> LocalBoxFuture<'static, Result<(), SurfaceError>> {
        let promise = self.host.load_perspective_engine();
        Box::pin(async move {
            JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|e| SurfaceError::EngineLoad(js_error_message(&e)))
        })
    }

    fn create_perspective(
        &self,
        view: &PerspectiveView,
    ) -> LocalBoxFuture<'static, Result<Box<dyn MapSurface>, SurfaceError>> {
        let promise = to_json(view).map(|json| self.host.create_perspective(&json));
        Box::pin(async move {
            let value = JsFuture::from(promise?)
                .await
                .map_err(|e| SurfaceError::Construction(js_error_message(&e)))?;
            Ok::<Box<dyn MapSurface>, SurfaceError>(Box::new(WebSurface {
                mode: ViewMode::Perspective,
                handle: value.unchecked_into(),
            }))
        })
    }
}

/// Event-loop services backed by `setTimeout` and `spawn_local`.
pub struct WebTaskHost {
    host: MapHost,
}

impl WebTaskHost {
    pub fn new(host: MapHost) -> Self {
        Self { host }
    }
}

impl TaskHost for WebTaskHost {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let ms = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
        let promise = Promise::new(&mut |resolve, _reject| {
            if let Some(window) = web_sys::window() {
                let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
            }
        });
        Box::pin(async move {
            let _ = JsFuture::from(promise).await;
        })
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        spawn_local(task);
    }

    fn publish(&self, controller: &mut ViewController) {
        publish_to(&self.host, controller);
    }
}

/// Mirrors notices and the loading indicator to the page.
pub fn publish_to(host: &MapHost, controller: &mut ViewController) {
    let notices = controller.notices_mut();
    for notice in notices.drain() {
        match notice.level {
            NoticeLevel::Diagnostic => web_sys::console::log_1(&JsValue::from_str(&format!(
                "[{}] {}",
                notice.kind, notice.message
            ))),
            NoticeLevel::Notice => host.notify("notice", &notice.message),
            NoticeLevel::Blocking => host.notify("alert", &notice.message),
        }
    }
    host.set_busy(notices.current_activity().map(str::to_string));
}

pub struct WebRasterizer {
    host: MapHost,
}

impl WebRasterizer {
    pub fn new(host: MapHost) -> Self {
        Self { host }
    }
}

fn u32_field(obj: &JsValue, key: &str) -> Result<u32, String> {
    Reflect::get(obj, &JsValue::from_str(key))
        .map_err(|e| js_error_message(&e))?
        .as_f64()
        .map(|v| v as u32)
        .ok_or_else(|| format!("capture result has no numeric `{key}`"))
}

impl Rasterizer for WebRasterizer {
    fn capture(&self) -> LocalBoxFuture<'_, Result<RasterImage, String>> {
        let promise = self.host.capture_map();
        Box::pin(async move {
            let result = JsFuture::from(promise)
                .await
                .map_err(|e| js_error_message(&e))?;
            let png = Reflect::get(&result, &JsValue::from_str("png"))
                .map_err(|e| js_error_message(&e))?
                .dyn_into::<Uint8Array>()
                .map_err(|_| "capture result has no `png` bytes".to_string())?;
            Ok::<RasterImage, String>(RasterImage {
                width: u32_field(&result, "width")?,
                height: u32_field(&result, "height")?,
                png: png.to_vec(),
            })
        })
    }
}

pub struct WebPdfBuilder {
    host: MapHost,
}

impl WebPdfBuilder {
    pub fn new(host: MapHost) -> Self {
        Self { host }
    }
}

impl DocumentBuilder for WebPdfBuilder {
    fn build(&self, layout: &PageLayout, image: &RasterImage) -> Result<Vec<u8>, String> {
        let layout = serde_json::to_string(layout).map_err(|e| e.to_string())?;
        self.host
            .build_pdf(&layout, &image.png)
            .map(|bytes| bytes.to_vec())
            .map_err(|e| js_error_message(&e))
    }
}

/// Fetches the dataset over HTTP relative to the page.
pub struct GlooFetcher;

impl DatasetFetcher for GlooFetcher {
    fn fetch<'a>(&'a self, location: &'a str) -> LocalBoxFuture<'a, Result<String, FetchError>> {
        Box::pin(async move {
            let resp = Request::get(location)
                .send()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;
            if !resp.ok() {
                return Err(FetchError::Status(resp.status()));
            }
            resp.text()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))
        })
    }
}
