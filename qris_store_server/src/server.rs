use std::{sync::Arc, time::Duration};

use actix_web::{
    dev::Server,
    http::KeepAlive,
    middleware::Logger,
    web,
    web::ServiceConfig,
    App,
    HttpServer,
};
use log::*;
use qris_store_engine::{
    events::{EventHandlers, EventProducers},
    merchant::{MerchantProfileStore, QrImageDecoder, TextPayloadDecoder},
    qris::{DynamicQrGenerator, QrImageRenderer, SvgQrRenderer},
    InventoryApi,
    MerchantApi,
    OrderFlowApi,
    PaymentVerifier,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    helpers::AdminIds,
    notifications::default_hooks,
    routes::{
        health,
        merchant_status,
        upload_merchant_qr,
        AddAccountsRoute,
        AddProductRoute,
        CancelOrderRoute,
        CheckoutRoute,
        ConfirmPaymentRoute,
        OrderByIdRoute,
        ProductsRoute,
        RefundOrderRoute,
        SoldAccountsRoute,
        StockRoute,
    },
    scheduler::start_scheduler,
};

const EVENT_BUFFER_SIZE: usize = 64;

/// Everything the store APIs are built from. Each HTTP worker builds its own API objects from a clone of this.
#[derive(Clone)]
pub struct StoreContext {
    pub db: SqliteDatabase,
    pub qr: DynamicQrGenerator,
    pub verifier: PaymentVerifier,
    pub renderer: Arc<dyn QrImageRenderer>,
    pub decoder: Arc<dyn QrImageDecoder>,
    pub producers: EventProducers,
}

impl StoreContext {
    pub fn new(
        db: SqliteDatabase,
        qr: DynamicQrGenerator,
        verifier: PaymentVerifier,
        decoder: Arc<dyn QrImageDecoder>,
        producers: EventProducers,
    ) -> Self {
        Self { db, qr, verifier, renderer: Arc::new(SvgQrRenderer::default()), decoder, producers }
    }

    pub fn order_flow_api(&self) -> OrderFlowApi<SqliteDatabase> {
        OrderFlowApi::new(
            self.db.clone(),
            self.qr.clone(),
            self.verifier.clone(),
            Arc::clone(&self.renderer),
            self.producers.clone(),
        )
    }

    pub fn inventory_api(&self) -> InventoryApi<SqliteDatabase> {
        InventoryApi::new(self.db.clone(), self.producers.clone())
    }

    pub fn merchant_api(&self) -> MerchantApi {
        MerchantApi::new(self.qr.profiles().clone(), Arc::clone(&self.decoder))
    }
}

/// Registers the store APIs and every route on an app. Shared by the server and the endpoint tests.
pub fn configure_app(
    ctx: StoreContext,
    admins: AdminIds,
    max_upload_bytes: usize,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(ctx.order_flow_api()))
            .app_data(web::Data::new(ctx.inventory_api()))
            .app_data(web::Data::new(ctx.merchant_api()))
            .app_data(web::Data::new(admins))
            // One byte over the limit, so oversized uploads reach the profile store and get a proper error message
            .app_data(web::PayloadConfig::new(max_upload_bytes.saturating_add(1)))
            .service(health)
            .service(merchant_status)
            .service(upload_merchant_qr)
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(ConfirmPaymentRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(RefundOrderRoute::<SqliteDatabase>::new())
            .service(SoldAccountsRoute::<SqliteDatabase>::new())
            .service(ProductsRoute::<SqliteDatabase>::new())
            .service(AddProductRoute::<SqliteDatabase>::new())
            .service(AddAccountsRoute::<SqliteDatabase>::new())
            .service(StockRoute::<SqliteDatabase>::new());
    }
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let profiles = MerchantProfileStore::open(&config.merchant_profile_path)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?
        .with_max_upload_size(config.max_upload_bytes);
    match profiles.current() {
        Some(p) => info!("🚀️ Merchant profile loaded for {}", p.display_name()),
        None => warn!("🚀️ No merchant QR has been uploaded yet. Checkouts will fail until an admin uploads one."),
    }
    let verifier = PaymentVerifier::new(&config.payment_secret)?;
    let qr = DynamicQrGenerator::new(profiles, config.qr_validity);

    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, default_hooks());
    let producers = handlers.producers();
    let hook_tasks = handlers.start_handlers();

    let ctx = StoreContext::new(db, qr, verifier, Arc::new(TextPayloadDecoder), producers);
    let scheduler = start_scheduler(
        Arc::new(ctx.order_flow_api()),
        Arc::new(ctx.inventory_api()),
        config.scheduler.clone(),
    );
    let srv = create_server_instance(config, ctx)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    // The scheduler holds event producers, so it has to go before the hook tasks can drain and exit
    scheduler.stop().await;
    for task in hook_tasks {
        if let Err(e) = task.await {
            warn!("🚀️ A notification task did not shut down cleanly. {e}");
        }
    }
    result
}

pub fn create_server_instance(config: ServerConfig, ctx: StoreContext) -> Result<Server, ServerError> {
    let admins = AdminIds::new(config.admin_ids.clone());
    let max_upload_bytes = config.max_upload_bytes;
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("qrs::access_log"))
            .configure(configure_app(ctx.clone(), admins.clone(), max_upload_bytes))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
