use std::{fmt::Debug, sync::Arc};

use crate::{
    merchant::{MerchantProfile, MerchantProfileStore, QrImageDecoder},
    store_api::errors::StoreError,
};

/// Admin access to the merchant QRIS code.
#[derive(Clone)]
pub struct MerchantApi {
    store: MerchantProfileStore,
    decoder: Arc<dyn QrImageDecoder>,
}

impl Debug for MerchantApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MerchantApi({:?})", self.store)
    }
}

impl MerchantApi {
    pub fn new(store: MerchantProfileStore, decoder: Arc<dyn QrImageDecoder>) -> Self {
        Self { store, decoder }
    }

    /// Replaces the merchant profile with the one in the uploaded QR image. On any error the previous profile stays.
    pub fn upload_merchant_qr(&self, image: &[u8]) -> Result<MerchantProfile, StoreError> {
        let profile = self.store.upload(image, self.decoder.as_ref())?;
        Ok(profile)
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_configured()
    }

    pub fn profile(&self) -> Option<MerchantProfile> {
        self.store.current()
    }

    pub fn store(&self) -> &MerchantProfileStore {
        &self.store
    }
}
