//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any I/O, database work included, must be awaited, never blocked on.
//!
//! Admin routes take an [`AdminUser`] argument, which rejects callers whose `X-Admin-Id` header is not in the
//! configured admin list.
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use log::*;
use qris_store_engine::{
    db_types::{NewDigitalAccount, NewProduct, OrderId},
    order_objects::Requester,
    InventoryApi,
    InventoryManagement,
    MerchantApi,
    OrderFlowApi,
    OrderManagement,
};

use crate::{
    data_objects::{
        AccountContent,
        CancelRequest,
        CheckoutRequest,
        CheckoutResponse,
        JsonResponse,
        MerchantStatus,
        NewProductRequest,
        PaymentConfirmation,
    },
    errors::ServerError,
    helpers::{admin_id, AdminUser},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl OrderManagement, InventoryManagement);
/// Route handler for the checkout endpoint
///
/// Reserves stock for the cart in the request body and returns the pending order with its payment QR. The QR image is
/// base64 encoded in `qr_image`; `qr_payload` is the raw QRIS string for transports that render their own.
pub async fn checkout<B>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryManagement,
{
    let CheckoutRequest { buyer_id, items } = body.into_inner();
    debug!("💻️ POST checkout for {buyer_id} ({} cart lines)", items.len());
    let result = api.checkout(&buyer_id, &items).await?;
    Ok(HttpResponse::Created().json(CheckoutResponse::from(result)))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(confirm_payment => Post "/payments/confirm" impl OrderManagement, InventoryManagement);
/// Route handler for payment confirmations. Admin only.
///
/// There is no payment gateway: whoever watches the merchant account reports the amount received for an order here.
/// The claim is verified before the goods are released. Repeating a confirmation for a paid order is harmless.
pub async fn confirm_payment<B>(
    admin: AdminUser,
    body: web::Json<PaymentConfirmation>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryManagement,
{
    let PaymentConfirmation { order_id, amount } = body.into_inner();
    info!("💻️ Payment confirmation for {order_id} from admin {}", admin.0);
    let outcome = api.confirm_payment(&order_id, amount).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_id => Get "/orders/{order_id}" impl OrderManagement, InventoryManagement);
pub async fn order_by_id<B>(
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryManagement,
{
    let order_id = path.into_inner();
    debug!("💻️ GET order {order_id}");
    let order = api.order_by_id(&order_id).await?.ok_or_else(|| ServerError::NoRecordFound(order_id.to_string()))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Post "/orders/{order_id}/cancel" impl OrderManagement, InventoryManagement);
/// Route handler for cancellations. Admins (by `X-Admin-Id`) may cancel any pending order; buyers name themselves in
/// the body and may only cancel their own.
pub async fn cancel_order<B>(
    req: HttpRequest,
    path: web::Path<OrderId>,
    body: Option<web::Json<CancelRequest>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryManagement,
{
    let order_id = path.into_inner();
    let buyer_id = body.and_then(|b| b.into_inner().buyer_id);
    let requester = match (admin_id(&req), buyer_id) {
        (Some(admin), _) => Requester::Admin(admin),
        (None, Some(buyer)) => Requester::Buyer(buyer),
        (None, None) => {
            return Err(ServerError::InsufficientPermissions("A buyer_id is required to cancel an order".into()));
        },
    };
    debug!("💻️ POST cancel {order_id} for {requester:?}");
    let order = api.cancel(&order_id, requester).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(refund_order => Post "/orders/{order_id}/refund" impl OrderManagement, InventoryManagement);
pub async fn refund_order<B>(
    admin: AdminUser,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryManagement,
{
    let order_id = path.into_inner();
    info!("💻️ Refund of {order_id} recorded by admin {}", admin.0);
    let order = api.refund(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(sold_accounts => Get "/orders/{order_id}/accounts" impl InventoryManagement);
pub async fn sold_accounts<B: InventoryManagement>(
    _admin: AdminUser,
    path: web::Path<OrderId>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET sold accounts for {order_id}");
    let records = api.sold_accounts(&order_id).await?;
    Ok(HttpResponse::Ok().json(records))
}

//----------------------------------------------   Inventory  ----------------------------------------------------
route!(products => Get "/products" impl InventoryManagement);
pub async fn products<B: InventoryManagement>(api: web::Data<InventoryApi<B>>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET products");
    let products = api.products().await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(add_product => Post "/products" impl InventoryManagement);
pub async fn add_product<B: InventoryManagement>(
    _admin: AdminUser,
    body: web::Json<NewProductRequest>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let NewProductRequest { name, description, price } = body.into_inner();
    let mut product = NewProduct::new(name, price);
    product.description = description;
    let product = api.add_product(product).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(add_accounts => Post "/products/{product_id}/accounts" impl InventoryManagement);
pub async fn add_accounts<B: InventoryManagement>(
    _admin: AdminUser,
    path: web::Path<i64>,
    body: web::Json<Vec<AccountContent>>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    let accounts = body
        .into_inner()
        .into_iter()
        .map(|a| NewDigitalAccount::new(product_id, a.content, a.content_kind))
        .collect::<Vec<_>>();
    if accounts.is_empty() {
        return Err(ServerError::InvalidRequestBody("No accounts were supplied".into()));
    }
    let added = api.add_accounts(accounts).await?;
    let message = format!("{} units added to product #{product_id}", added.len());
    Ok(HttpResponse::Created().json(JsonResponse::success(message)))
}

route!(stock => Get "/stock" impl InventoryManagement);
pub async fn stock<B: InventoryManagement>(
    _admin: AdminUser,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let levels = api.stock_summary().await?;
    Ok(HttpResponse::Ok().json(levels))
}

//----------------------------------------------   Merchant  ----------------------------------------------------
/// Route handler for merchant QR uploads. Admin only.
///
/// The request body is the uploaded image. It replaces the active merchant profile only if it decodes to a valid
/// QRIS payload.
#[post("/merchant/qris")]
pub async fn upload_merchant_qr(
    admin: AdminUser,
    body: web::Bytes,
    api: web::Data<MerchantApi>,
) -> Result<HttpResponse, ServerError> {
    info!("💻️ Merchant QR upload ({} bytes) from admin {}", body.len(), admin.0);
    let profile = api.upload_merchant_qr(&body)?;
    Ok(HttpResponse::Ok().json(profile))
}

#[get("/merchant")]
pub async fn merchant_status(api: web::Data<MerchantApi>) -> impl Responder {
    let status = MerchantStatus { configured: api.is_configured(), profile: api.profile() };
    HttpResponse::Ok().json(status)
}
