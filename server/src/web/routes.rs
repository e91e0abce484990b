// server/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{command_handlers, order_handlers, report_handlers, webhook_handlers};

/// Registers every route. Literal prefixes come before the `/{store}/...`
/// report routes so a store named `orders` cannot shadow the listings.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/", web::get().to(order_handlers::index_handler))
    .route("/health", web::get().to(order_handlers::health_handler))
    // Listings
    .route("/latest-orders", web::get().to(order_handlers::latest_orders_handler))
    .route("/orders", web::get().to(order_handlers::list_all_orders_handler))
    .route("/orders/{status}", web::get().to(order_handlers::list_orders_handler))
    .route(
      "/orders/{status}/{store}",
      web::get().to(order_handlers::list_store_orders_handler),
    )
    // Upstream notifications
    .route("/webhook", web::post().to(webhook_handlers::order_webhook_handler))
    // Order actions (admin key required)
    .route(
      "/prepare-order/{order_id}",
      web::post().to(command_handlers::prepare_order_handler),
    )
    .route("/ready-order/{order_id}", web::post().to(command_handlers::ready_order_handler))
    .route(
      "/complete-order/{order_id}",
      web::post().to(command_handlers::complete_order_handler),
    )
    .route("/refund-order/{order_id}", web::post().to(command_handlers::refund_order_handler))
    // Per-store reports
    .route("/{store}/top-customers", web::get().to(report_handlers::top_customers_handler))
    .route("/{store}/top-products", web::get().to(report_handlers::top_products_handler))
    .route("/{store}/total-sales", web::get().to(report_handlers::total_sales_handler));
}
