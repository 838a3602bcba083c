use std::cell::RefCell;
use std::time::Duration;

use chrono::NaiveDate;
use futures_util::future::LocalBoxFuture;
use tracing::info;

use super::document::{DocumentBuilder, build_document};
use super::{Collaborator, ExportError, ExportFile, MIME_PNG, stamped_file_name};
use crate::controller::{ACTIVITY_EXPORT_IMAGE, ACTIVITY_EXPORT_PDF, ViewController};
use crate::surface::TaskHost;

/// Time the host gets to repaint after the controls are hidden.
pub const CHROME_SETTLE: Duration = Duration::from_millis(200);

/// A captured picture of the map container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Renders the visible map container to an image.
pub trait Rasterizer {
    fn capture(&self) -> LocalBoxFuture<'_, Result<RasterImage, String>>;
}

/// Captures the map with its controls hidden. The controls come back and the
/// activity ends whether or not the capture succeeds.
async fn capture(
    controller: &RefCell<ViewController>,
    rasterizer: &dyn Rasterizer,
    host: &dyn TaskHost,
    activity: &'static str,
) -> Result<RasterImage, ExportError> {
    {
        let mut c = controller.borrow_mut();
        c.begin_capture(activity);
        host.publish(&mut c);
    }
    host.sleep(CHROME_SETTLE).await;
    let res = rasterizer.capture().await;
    controller.borrow_mut().end_capture(activity);
    res.map_err(ExportError::Capture)
}

fn report<T>(
    controller: &RefCell<ViewController>,
    host: &dyn TaskHost,
    res: Result<T, ExportError>,
) -> Result<T, ExportError> {
    let mut c = controller.borrow_mut();
    if let Err(err) = &res {
        c.report_export_error(err);
    }
    host.publish(&mut c);
    res
}

/// PNG snapshot of the active surface.
pub async fn export_image(
    controller: &RefCell<ViewController>,
    rasterizer: Option<&dyn Rasterizer>,
    host: &dyn TaskHost,
    date: NaiveDate,
) -> Result<ExportFile, ExportError> {
    let res = image_file(controller, rasterizer, host, date).await;
    report(controller, host, res)
}

async fn image_file(
    controller: &RefCell<ViewController>,
    rasterizer: Option<&dyn Rasterizer>,
    host: &dyn TaskHost,
    date: NaiveDate,
) -> Result<ExportFile, ExportError> {
    let rasterizer = rasterizer.ok_or(ExportError::MissingCollaborator(Collaborator::Rasterizer))?;
    let image = capture(controller, rasterizer, host, ACTIVITY_EXPORT_IMAGE).await?;
    let prefix = controller.borrow().config().export.map_prefix.clone();
    let file_name = stamped_file_name(&prefix, date, "png");
    info!(%file_name, width = image.width, height = image.height, "image exported");
    Ok(ExportFile {
        file_name,
        mime: MIME_PNG,
        bytes: image.png,
    })
}

/// A4 landscape PDF with the snapshot, a title and a footer.
pub async fn export_document(
    controller: &RefCell<ViewController>,
    rasterizer: Option<&dyn Rasterizer>,
    builder: Option<&dyn DocumentBuilder>,
    host: &dyn TaskHost,
    date: NaiveDate,
) -> Result<ExportFile, ExportError> {
    let res = document_file(controller, rasterizer, builder, host, date).await;
    report(controller, host, res)
}

async fn document_file(
    controller: &RefCell<ViewController>,
    rasterizer: Option<&dyn Rasterizer>,
    builder: Option<&dyn DocumentBuilder>,
    host: &dyn TaskHost,
    date: NaiveDate,
) -> Result<ExportFile, ExportError> {
    let rasterizer = rasterizer.ok_or(ExportError::MissingCollaborator(Collaborator::Rasterizer))?;
    let builder =
        builder.ok_or(ExportError::MissingCollaborator(Collaborator::DocumentBuilder))?;
    let image = capture(controller, rasterizer, host, ACTIVITY_EXPORT_PDF).await?;
    let prefix = controller.borrow().config().export.map_prefix.clone();
    let file = build_document(builder, &image, &prefix, date)?;
    info!(file_name = %file.file_name, bytes = file.bytes.len(), "document exported");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use chrono::NaiveDate;
    use futures_util::future::{self, LocalBoxFuture};
    use runtime::NoticeLevel;

    use super::{RasterImage, Rasterizer, export_document, export_image};
    use crate::export::{Collaborator, DocumentBuilder, ExportError, PageLayout};
    use crate::testing::{FakeHost, controller_with_sample};

    struct FixedRasterizer {
        image: Option<RasterImage>,
        calls: Cell<usize>,
    }

    impl Rasterizer for FixedRasterizer {
        fn capture(&self) -> LocalBoxFuture<'_, Result<RasterImage, String>> {
            self.calls.set(self.calls.get() + 1);
            let res = self.image.clone().ok_or_else(|| "tainted canvas".to_string());
            Box::pin(future::ready(res))
        }
    }

    struct EchoBuilder;

    impl DocumentBuilder for EchoBuilder {
        fn build(&self, layout: &PageLayout, _image: &RasterImage) -> Result<Vec<u8>, String> {
            Ok(format!("{:.0}x{:.0}", layout.image.width, layout.image.height).into_bytes())
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn image(width: u32, height: u32) -> FixedRasterizer {
        FixedRasterizer {
            image: Some(RasterImage {
                width,
                height,
                png: vec![0x89, b'P', b'N', b'G'],
            }),
            calls: Cell::new(0),
        }
    }

    #[test]
    fn image_export_restores_chrome() {
        let (ctl, log) = controller_with_sample();
        let ctl = RefCell::new(ctl);
        let r = image(800, 600);
        let file = pollster::block_on(export_image(&ctl, Some(&r), &FakeHost::default(), date()))
            .unwrap();
        assert_eq!(file.file_name, "bontoc_landslide_map_2024-06-01.png");
        assert_eq!(file.bytes, vec![0x89, b'P', b'N', b'G']);
        assert_eq!(log.chrome_changes(), vec![false, true]);
        assert!(!ctl.borrow().notices().is_busy());
    }

    #[test]
    fn failed_capture_still_restores_chrome() {
        let (ctl, log) = controller_with_sample();
        let ctl = RefCell::new(ctl);
        let r = FixedRasterizer {
            image: None,
            calls: Cell::new(0),
        };
        let err = pollster::block_on(export_image(&ctl, Some(&r), &FakeHost::default(), date()))
            .unwrap_err();
        assert!(matches!(err, ExportError::Capture(_)));
        assert_eq!(log.chrome_changes(), vec![false, true]);
        let c = ctl.borrow();
        assert!(!c.notices().is_busy());
        assert_eq!(c.notices().last().unwrap().level, NoticeLevel::Blocking);
    }

    #[test]
    fn missing_rasterizer_is_reported() {
        let (ctl, log) = controller_with_sample();
        let ctl = RefCell::new(ctl);
        let err = pollster::block_on(export_image(&ctl, None, &FakeHost::default(), date()))
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::MissingCollaborator(Collaborator::Rasterizer)
        ));
        assert!(log.chrome_changes().is_empty());
    }

    #[test]
    fn document_without_builder_skips_capture() {
        let (ctl, _log) = controller_with_sample();
        let ctl = RefCell::new(ctl);
        let r = image(800, 600);
        let err = pollster::block_on(export_document(
            &ctl,
            Some(&r),
            None,
            &FakeHost::default(),
            date(),
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            ExportError::MissingCollaborator(Collaborator::DocumentBuilder)
        ));
        assert_eq!(r.calls.get(), 0);
    }

    #[test]
    fn document_uses_fitted_layout() {
        let (ctl, _log) = controller_with_sample();
        let ctl = RefCell::new(ctl);
        let r = image(2570, 1000);
        let file = pollster::block_on(export_document(
            &ctl,
            Some(&r),
            Some(&EchoBuilder),
            &FakeHost::default(),
            date(),
        ))
        .unwrap();
        assert_eq!(file.file_name, "bontoc_landslide_map_2024-06-01.pdf");
        assert_eq!(file.bytes, b"257x100".to_vec());
    }

    #[test]
    fn zero_sized_capture_fails_document() {
        let (ctl, _log) = controller_with_sample();
        let ctl = RefCell::new(ctl);
        let r = image(0, 0);
        let err = pollster::block_on(export_document(
            &ctl,
            Some(&r),
            Some(&EchoBuilder),
            &FakeHost::default(),
            date(),
        ))
        .unwrap_err();
        assert!(matches!(err, ExportError::DocumentBuild(_)));
    }
}
