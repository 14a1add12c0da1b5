use crate::merchant::MerchantError;

/// Decodes an uploaded QR picture into the payload text it encodes.
///
/// Image decoding is the transport layer's business; the engine only needs the resulting string.
pub trait QrImageDecoder: Send + Sync {
    fn decode(&self, image: &[u8]) -> Result<String, MerchantError>;
}

/// A decoder for transports that have already turned the picture into text. The "image" bytes are expected to be the
/// payload itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPayloadDecoder;

impl QrImageDecoder for TextPayloadDecoder {
    fn decode(&self, image: &[u8]) -> Result<String, MerchantError> {
        let text = std::str::from_utf8(image)
            .map_err(|_| MerchantError::InvalidImage("The upload is not a decoded QR payload".into()))?
            .trim();
        if text.is_empty() {
            return Err(MerchantError::InvalidImage("No QR code was found in the upload".into()));
        }
        if !text.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
            return Err(MerchantError::InvalidImage("The upload contains binary data".into()));
        }
        Ok(text.to_string())
    }
}
