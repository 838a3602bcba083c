use chrono::NaiveDate;
use serde::Serialize;

use super::snapshot::RasterImage;
use super::{ExportError, ExportFile, MIME_PDF, stamped_file_name};

pub const PAGE_WIDTH_MM: f64 = 297.0;
pub const PAGE_HEIGHT_MM: f64 = 210.0;
pub const PAGE_MARGIN_MM: f64 = 20.0;
/// Vertical space kept free for the title.
pub const TITLE_SPACE_MM: f64 = 30.0;
pub const FOOTER_OFFSET_MM: f64 = 15.0;

pub const DOCUMENT_TITLE: &str = "Landslide Susceptibility Map - Bontoc-Sagada Landscape";
pub const DOCUMENT_SOURCE: &str = "Source: Benguet State University - Center for Geoinformatics";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub size_pt: f64,
    pub bold: bool,
    pub align: TextAlign,
}

/// Where the captured map goes on the page, in millimeters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagePlacement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// JPEG quality the builder should encode the image with.
    pub jpeg_quality: f64,
}

/// A single A4 landscape page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLayout {
    pub width: f64,
    pub height: f64,
    pub image: ImagePlacement,
    pub texts: Vec<TextBlock>,
}

impl PageLayout {
    /// Scales the image to fit inside the margins, keeping its aspect ratio,
    /// centered horizontally below the title.
    pub fn fit(image_width: u32, image_height: u32, date: NaiveDate) -> Result<Self, ExportError> {
        if image_width == 0 || image_height == 0 {
            return Err(ExportError::DocumentBuild(format!(
                "captured image is empty ({image_width}x{image_height})"
            )));
        }
        let (w, h) = (f64::from(image_width), f64::from(image_height));
        let max_w = PAGE_WIDTH_MM - 2.0 * PAGE_MARGIN_MM;
        let max_h = PAGE_HEIGHT_MM - 2.0 * PAGE_MARGIN_MM - TITLE_SPACE_MM;
        let ratio = (max_w / w).min(max_h / h);
        let (width, height) = (w * ratio, h * ratio);

        let footer_y = PAGE_HEIGHT_MM - FOOTER_OFFSET_MM;
        let texts = vec![
            TextBlock {
                text: DOCUMENT_TITLE.to_string(),
                x: PAGE_WIDTH_MM / 2.0,
                y: PAGE_MARGIN_MM,
                size_pt: 16.0,
                bold: true,
                align: TextAlign::Center,
            },
            TextBlock {
                text: format!("Generated: {}", date.format("%Y-%m-%d")),
                x: PAGE_MARGIN_MM,
                y: footer_y,
                size_pt: 10.0,
                bold: false,
                align: TextAlign::Left,
            },
            TextBlock {
                text: DOCUMENT_SOURCE.to_string(),
                x: PAGE_WIDTH_MM - PAGE_MARGIN_MM,
                y: footer_y,
                size_pt: 10.0,
                bold: false,
                align: TextAlign::Right,
            },
        ];

        Ok(Self {
            width: PAGE_WIDTH_MM,
            height: PAGE_HEIGHT_MM,
            image: ImagePlacement {
                x: (PAGE_WIDTH_MM - width) / 2.0,
                y: PAGE_MARGIN_MM + 20.0,
                width,
                height,
                jpeg_quality: 0.9,
            },
            texts,
        })
    }
}

/// Encodes a laid-out page into PDF bytes.
pub trait DocumentBuilder {
    fn build(&self, layout: &PageLayout, image: &RasterImage) -> Result<Vec<u8>, String>;
}

/// Lays out `image` and hands it to the builder.
pub fn build_document(
    builder: &dyn DocumentBuilder,
    image: &RasterImage,
    prefix: &str,
    date: NaiveDate,
) -> Result<ExportFile, ExportError> {
    let layout = PageLayout::fit(image.width, image.height, date)?;
    let bytes = builder
        .build(&layout, image)
        .map_err(ExportError::DocumentBuild)?;
    Ok(ExportFile {
        file_name: stamped_file_name(prefix, date, "pdf"),
        mime: MIME_PDF,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::{PAGE_MARGIN_MM, PAGE_WIDTH_MM, PageLayout, TextAlign};
    use crate::export::ExportError;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn wide_image_fills_width() {
        let l = PageLayout::fit(2570, 1000, date()).unwrap();
        assert!(close(l.image.width, 257.0));
        assert!(close(l.image.height, 100.0));
        assert!(close(l.image.x, PAGE_MARGIN_MM));
        assert!(close(l.image.y, 40.0));
    }

    #[test]
    fn tall_image_is_centered() {
        let l = PageLayout::fit(1000, 1200, date()).unwrap();
        assert!(close(l.image.height, 140.0));
        assert!(close(l.image.width, 1000.0 * 140.0 / 1200.0));
        assert!(close(l.image.x + l.image.width / 2.0, PAGE_WIDTH_MM / 2.0));
        assert!(l.image.x >= PAGE_MARGIN_MM);
    }

    #[test]
    fn empty_image_is_rejected() {
        assert!(matches!(
            PageLayout::fit(0, 10, date()),
            Err(ExportError::DocumentBuild(_))
        ));
    }

    #[test]
    fn title_and_footer() {
        let l = PageLayout::fit(100, 100, date()).unwrap();
        assert_eq!(l.texts[0].align, TextAlign::Center);
        assert_eq!(l.texts[0].y, 20.0);
        assert_eq!(l.texts[1].text, "Generated: 2024-06-01");
        assert_eq!(l.texts[1].y, 195.0);
        assert_eq!(l.texts[2].x, 277.0);
        assert_eq!(l.texts[2].align, TextAlign::Right);
    }
}
