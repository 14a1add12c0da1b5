use qrcode::{render::svg, EcLevel, QrCode};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Could not render QR image: {0}")]
pub struct QrRenderError(pub String);

/// Turns a payload string into image bytes that a payer's banking app can scan.
pub trait QrImageRenderer: Send + Sync {
    fn render(&self, payload: &str) -> Result<Vec<u8>, QrRenderError>;

    /// The MIME type of the bytes returned by [`Self::render`]
    fn content_type(&self) -> &'static str;
}

/// Renders QR codes as SVG documents with medium error correction.
#[derive(Debug, Clone, Copy)]
pub struct SvgQrRenderer {
    pub min_size: u32,
}

impl Default for SvgQrRenderer {
    fn default() -> Self {
        Self { min_size: 256 }
    }
}

impl QrImageRenderer for SvgQrRenderer {
    fn render(&self, payload: &str) -> Result<Vec<u8>, QrRenderError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
            .map_err(|e| QrRenderError(e.to_string()))?;
        let image = code.render::<svg::Color<'_>>().min_dimensions(self.min_size, self.min_size).build();
        Ok(image.into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }
}
