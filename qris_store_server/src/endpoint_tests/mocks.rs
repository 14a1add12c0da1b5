use mockall::mock;
use qris_store_engine::merchant::{MerchantError, QrImageDecoder};

mock! {
    pub Decoder {}
    impl QrImageDecoder for Decoder {
        fn decode(&self, image: &[u8]) -> Result<String, MerchantError>;
    }
}
