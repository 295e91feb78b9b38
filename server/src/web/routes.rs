// server/src/web/routes.rs

use actix_web::web;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Wires every route. Paths are the storefront's page-style paths; the
/// checkout POST and its redirect targets (`/cart`, `/login`,
/// `/orders/confirmation`) are part of the external contract.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/health", web::get().to(health_check_handler))
    .route("/login", web::get().to(crate::web::handlers::auth_handlers::login_page_handler))
    .service(
      web::scope("/auth")
        .route("/signup", web::post().to(crate::web::handlers::auth_handlers::signup_handler))
        .route("/signin", web::post().to(crate::web::handlers::auth_handlers::signin_handler)),
    )
    .service(
      web::scope("/products")
        .route("", web::get().to(crate::web::handlers::product_handlers::list_products_handler))
        .route(
          "/{product_id}",
          web::get().to(crate::web::handlers::product_handlers::get_product_handler),
        ),
    )
    .service(
      web::scope("/cart")
        .route("", web::get().to(crate::web::handlers::cart_handlers::view_cart_handler))
        .route("/add", web::post().to(crate::web::handlers::cart_handlers::add_to_cart_handler))
        .route(
          "/update",
          web::post().to(crate::web::handlers::cart_handlers::update_cart_item_handler),
        )
        .route(
          "/remove",
          web::post().to(crate::web::handlers::cart_handlers::remove_cart_item_handler),
        )
        .route(
          "/discount",
          web::post().to(crate::web::handlers::cart_handlers::apply_discount_handler),
        ),
    )
    .service(
      web::scope("/checkout")
        .route("", web::get().to(crate::web::handlers::checkout_handlers::get_checkout_handler))
        .route("", web::post().to(crate::web::handlers::checkout_handlers::post_checkout_handler))
        .route(
          "/intent",
          web::post().to(crate::web::handlers::payment_handlers::create_payment_intent_handler),
        )
        .route(
          "/confirm",
          web::post().to(crate::web::handlers::payment_handlers::confirm_payment_handler),
        ),
    )
    .service(
      web::scope("/orders")
        .route(
          "/confirmation",
          web::get().to(crate::web::handlers::order_handlers::order_confirmation_handler),
        )
        .route(
          "/{order_number}",
          web::get().to(crate::web::handlers::order_handlers::get_order_handler),
        ),
    );
}
