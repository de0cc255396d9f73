//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use shop_engine::{
    db_types::{OrderId, ProductId},
    events::EventBroadcaster,
    order_objects::{OrderDetails, OrderSummary},
    CartApi,
    CheckoutApi,
    InventoryApi,
    OrderFlowApi,
    PaymentProvider,
    ReconcilerApi,
    ShopDatabase,
    ShopError,
    WebhookOutcome,
    WebhookVerifier,
};
use stripe_tools::signature::SIGNATURE_HEADER;

use crate::{
    auth::{JwtClaims, Role},
    config::ServerOptions,
    data_objects::{
        AddCartItemRequest,
        CheckoutSessionRequest,
        CheckoutSessionResponse,
        JsonResponse,
        StockResponse,
        UpdateStatusRequest,
        UpdateStockRequest,
        WebhookAck,
    },
    errors::ServerError,
    helpers::get_remote_ip,
    sse::{event_stream, SSE_CONTENT_TYPE},
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),*]));
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

// ----------------------------------------------   Events  ----------------------------------------------------
/// A server-sent events stream of every event the shop publishes while the client is connected.
#[get("/events")]
pub async fn events(broadcaster: web::Data<EventBroadcaster>) -> impl Responder {
    trace!("💻️ New event stream subscriber");
    HttpResponse::Ok()
        .content_type(SSE_CONTENT_TYPE)
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(event_stream(&broadcaster))
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(my_cart => Get "/cart" impl ShopDatabase);
pub async fn my_cart<B: ShopDatabase>(
    claims: JwtClaims,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET cart for {}", claims.sub);
    let cart = api.cart(claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(add_cart_item => Post "/cart/items" impl ShopDatabase);
/// Adds an item to the caller's cart. Adding a product that is already in the cart increases its quantity. The total
/// quantity may not exceed the product's stock.
pub async fn add_cart_item<B: ShopDatabase>(
    claims: JwtClaims,
    body: web::Json<AddCartItemRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let AddCartItemRequest { product_id, quantity } = body.into_inner();
    debug!("💻️ POST cart item {product_id} x{quantity} for {}", claims.sub);
    let cart = api.add_item(claims.user_id(), &product_id, quantity).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(remove_cart_item => Delete "/cart/items/{product_id}" impl ShopDatabase);
pub async fn remove_cart_item<B: ShopDatabase>(
    claims: JwtClaims,
    path: web::Path<ProductId>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ DELETE cart item {product_id} for {}", claims.sub);
    let cart = api.remove_item(claims.user_id(), &product_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(clear_cart => Delete "/cart" impl ShopDatabase);
pub async fn clear_cart<B: ShopDatabase>(
    claims: JwtClaims,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ DELETE cart for {}", claims.sub);
    api.clear(claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Cart cleared")))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl ShopDatabase);
/// Places an order for the contents of the caller's cart.
///
/// The cart is frozen into line items at current prices, after re-checking stock, and the order is created in the
/// `AwaitingPayment` state. The cart itself is left alone until the payment is confirmed.
pub async fn create_order<B: ShopDatabase>(
    claims: JwtClaims,
    body: web::Json<OrderDetails>,
    carts: web::Data<CartApi<B>>,
    orders: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let details = body.into_inner();
    let user_id = claims.user_id();
    debug!("💻️ POST new order for {user_id}");
    orders.validate_order_details(&details.shipping_address, &details.payment_method)?;
    let items = carts.snapshot(user_id).await?;
    let order = orders.create_order(user_id, items, details.shipping_address, &details.payment_method).await?;
    Ok(HttpResponse::Created().json(OrderSummary::from(&order)))
}

route!(my_orders => Get "/orders" impl ShopDatabase);
/// The caller's orders, newest first.
pub async fn my_orders<B: ShopDatabase>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for {}", claims.sub);
    let orders = api.orders_for_user(claims.user_id()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl ShopDatabase);
/// Fetches a single order. Users can only see their own orders. Admins can see any order.
///
/// `AwaitingPayment` is a normal answer here: the customer is usually redirected back from checkout before the
/// payment webhook arrives.
pub async fn order_by_id<B: ShopDatabase>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order {order_id} for {}", claims.sub);
    let order = api.fetch_order(&order_id).await?;
    if &order.user_id != claims.user_id() && !claims.is_admin() {
        info!("💻️ {} asked for order {order_id}, which belongs to someone else", claims.sub);
        return Err(ShopError::OrderNotFound(order_id).into());
    }
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Put "/orders/{order_id}/status" impl ShopDatabase where requires [Role::Admin]);
/// Admins may move orders to `Shipped`, `Delivered` or `Cancelled`, subject to the legal transitions.
pub async fn update_order_status<B: ShopDatabase>(
    path: web::Path<OrderId>,
    body: web::Json<UpdateStatusRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let status = body.status()?;
    debug!("💻️ PUT order {order_id} status {status}");
    let order = api.admin_update_status(&order_id, status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(all_orders => Get "/admin/orders" impl ShopDatabase where requires [Role::Admin]);
pub async fn all_orders<B: ShopDatabase>(api: web::Data<OrderFlowApi<B>>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET all orders");
    let orders = api.all_orders().await?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Inventory  ----------------------------------------------------
route!(update_stock => Put "/admin/products/{product_id}/stock" impl ShopDatabase where requires [Role::Admin]);
pub async fn update_stock<B: ShopDatabase>(
    path: web::Path<ProductId>,
    body: web::Json<UpdateStockRequest>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ PUT stock for {product_id}: {}", body.stock);
    let stock = api.set_stock(&product_id, body.stock).await?;
    Ok(HttpResponse::Ok().json(StockResponse { product_id, stock }))
}

route!(retire_product => Delete "/admin/products/{product_id}" impl ShopDatabase where requires [Role::Admin]);
/// Takes a product off sale. Existing orders for it are unaffected.
pub async fn retire_product<B: ShopDatabase>(
    path: web::Path<ProductId>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ DELETE product {product_id}");
    api.retire_product(&product_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Product {product_id} retired"))))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(create_checkout_session => Post "/payments/create-checkout-session" impl ShopDatabase, PaymentProvider);
/// Creates a hosted checkout session for one of the caller's orders. The order must still be awaiting payment.
/// Calling this again for the same order replaces the previous session.
pub async fn create_checkout_session<B: ShopDatabase, P: PaymentProvider>(
    claims: JwtClaims,
    body: web::Json<CheckoutSessionRequest>,
    api: web::Data<CheckoutApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = body.into_inner().order_id;
    debug!("💻️ POST checkout session for order {order_id} by {}", claims.sub);
    let session = api.create_session_for_user(claims.user_id(), &order_id).await?;
    Ok(HttpResponse::Ok().json(CheckoutSessionResponse::from(session)))
}

route!(payment_webhook => Post "/api/payments/webhook" impl ShopDatabase, WebhookVerifier);
/// The payment provider's webhook. It is not authenticated with a bearer token: the provider's signature over the raw
/// body is checked instead, so the body must not be parsed before the signature is verified.
///
/// Forged or unreadable events get a 400. Storage failures get a 500, so that the provider redelivers the event.
/// Everything else, including events that turn out to be duplicates or that cannot be matched to an order, is
/// acknowledged with a 200.
pub async fn payment_webhook<B: ShopDatabase, V: WebhookVerifier>(
    req: HttpRequest,
    body: web::Bytes,
    options: web::Data<ServerOptions>,
    api: web::Data<ReconcilerApi<B, V>>,
) -> Result<HttpResponse, ServerError> {
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    let peer = peer.map(|ip| ip.to_string()).unwrap_or_else(|| "an unknown address".to_string());
    debug!("💻️ Payment webhook from {peer}. {} bytes", body.len());
    let signature = req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default();
    let outcome = api.handle_webhook(&body, signature).await?;
    match &outcome {
        WebhookOutcome::Paid(order) => info!("💻️ Webhook confirmed payment for order {}", order.order_id),
        WebhookOutcome::PaymentFailed(order) => info!("💻️ Webhook reported failed payment for {}", order.order_id),
        WebhookOutcome::Duplicate { order_id, status } => {
            info!("💻️ Duplicate webhook for order {order_id}, which is already {status}")
        },
        other => debug!("💻️ Webhook acknowledged without effect: {other:?}"),
    }
    Ok(HttpResponse::Ok().json(WebhookAck::default()))
}
