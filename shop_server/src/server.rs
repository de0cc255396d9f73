use std::{path::Path, time::Duration};

use actix_web::{
    dev::Server,
    error::JsonPayloadError,
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpRequest,
    HttpServer,
};
use log::*;
use shop_engine::{
    events::{EventBroadcaster, EventProducers},
    CartApi,
    CheckoutApi,
    InventoryApi,
    OrderFlowApi,
    PaymentProvider,
    ReconcilerApi,
    ShopDatabase,
    SqliteDatabase,
    WebhookVerifier,
};

use crate::{
    auth::TokenVerifier,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::stripe::StripeProvider,
    middleware::JwtAuthMiddlewareFactory,
    routes::{
        events,
        health,
        AddCartItemRoute,
        AllOrdersRoute,
        ClearCartRoute,
        CreateCheckoutSessionRoute,
        CreateOrderRoute,
        MyCartRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        PaymentWebhookRoute,
        RemoveCartItemRoute,
        RetireProductRoute,
        UpdateOrderStatusRoute,
        UpdateStockRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    prepare_data_dir(&config.database_url)?;
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🗃️ Database ready at {}", config.database_url);
    let provider =
        StripeProvider::new(config.stripe.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let broadcaster = EventBroadcaster::new(config.event_buffer);
    let srv = create_server_instance(config, db, provider, broadcaster)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// SQLite will create the database file, but not the directory it lives in.
fn prepare_data_dir(database_url: &str) -> Result<(), ServerError> {
    let path = database_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
    if path.starts_with(":memory:") {
        return Ok(());
    }
    let path = path.split('?').next().unwrap_or(path);
    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            info!("🗃️ Creating data directory {}", dir.display());
            std::fs::create_dir_all(dir)?;
            Ok(())
        },
        _ => Ok(()),
    }
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    provider: StripeProvider,
    broadcaster: EventBroadcaster,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("shop::access_log"))
            .configure(|cfg| {
                configure_shop(cfg, db.clone(), provider.clone(), provider.clone(), broadcaster.clone(), &config)
            })
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Registers the shop's API objects and routes on an app.
///
/// The payment webhook is registered outside the `/api` scope, since it is authenticated by the provider's signature
/// rather than by a bearer token. Every other `/api` route needs a valid token, and the admin routes also need the
/// `admin` role.
pub fn configure_shop<B, P, V>(
    cfg: &mut web::ServiceConfig,
    db: B,
    provider: P,
    verifier: V,
    broadcaster: EventBroadcaster,
    config: &ServerConfig,
) where
    B: ShopDatabase + 'static,
    P: PaymentProvider + 'static,
    V: WebhookVerifier + 'static,
{
    let producers = EventProducers::default().with_publisher(broadcaster.clone());
    let cart_api = CartApi::new(db.clone());
    let orders_api = OrderFlowApi::new(db.clone(), producers.clone()).with_pricing(config.pricing);
    let inventory_api = InventoryApi::new(db.clone(), producers.clone());
    let checkout_api = CheckoutApi::new(db.clone(), provider, config.checkout_config());
    let reconciler_api = ReconcilerApi::new(db, verifier, producers);
    let verifier = TokenVerifier::new(&config.auth);
    let json_config = web::JsonConfig::default().error_handler(|e: JsonPayloadError, _req: &HttpRequest| {
        debug!("💻️ Rejected request body: {e}");
        ServerError::InvalidRequestBody(e.to_string()).into()
    });
    let auth_scope = web::scope("/api")
        .wrap(JwtAuthMiddlewareFactory::new(verifier))
        .service(MyCartRoute::<B>::new())
        .service(ClearCartRoute::<B>::new())
        .service(AddCartItemRoute::<B>::new())
        .service(RemoveCartItemRoute::<B>::new())
        .service(CreateOrderRoute::<B>::new())
        .service(MyOrdersRoute::<B>::new())
        .service(OrderByIdRoute::<B>::new())
        .service(UpdateOrderStatusRoute::<B>::new())
        .service(AllOrdersRoute::<B>::new())
        .service(UpdateStockRoute::<B>::new())
        .service(RetireProductRoute::<B>::new())
        .service(CreateCheckoutSessionRoute::<B, P>::new());
    cfg.app_data(json_config)
        .app_data(web::Data::new(cart_api))
        .app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(inventory_api))
        .app_data(web::Data::new(checkout_api))
        .app_data(web::Data::new(reconciler_api))
        .app_data(web::Data::new(broadcaster))
        .app_data(web::Data::new(ServerOptions::from_config(config)))
        .service(health)
        .service(events)
        .service(PaymentWebhookRoute::<B, V>::new())
        .service(auth_scope);
}
