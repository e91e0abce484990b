// tests/rest_source_tests.rs
mod common;

use common::setup_tracing;
use orderdesk::{
  OrderSource, OrderStatus, OrderWriter, PageQuery, RelayError, RestSourceConfig, SortOrder, WooRestClient,
};
use serde_json::json;
use serial_test::serial;
use std::time::Duration;
use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> WooRestClient {
  WooRestClient::new(RestSourceConfig {
    base_url: format!("{}/wp-json/wc/v3", server.uri()),
    consumer_key: "ck_test".to_string(),
    consumer_secret: "cs_test".to_string(),
    timeout: Duration::from_secs(5),
    accept_invalid_certs: false,
  })
  .unwrap()
}

fn order_json(id: i64, status: &str) -> serde_json::Value {
  json!({
    "id": id,
    "date_created_gmt": "2024-06-01T10:00:00",
    "status": status,
    "billing": {"first_name": "Ana", "last_name": "Lopes", "email": "ana@example.com", "phone": "912"},
    "payment_method_title": "MB Way",
    "transaction_id": "",
    "line_items": [{"name": "Beer", "sku": "pub-beer", "quantity": 2, "total": "5.00"}],
    "meta_data": []
  })
}

#[tokio::test]
#[serial]
async fn fetch_page_sends_paging_and_filter_parameters() {
  setup_tracing();
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/wp-json/wc/v3/orders"))
    .and(basic_auth("ck_test", "cs_test"))
    .and(query_param("page", "2"))
    .and(query_param("per_page", "100"))
    .and(query_param("status", "processing,preparing,ready"))
    .and(query_param("order", "asc"))
    .and(query_param("orderby", "id"))
    .respond_with(
      ResponseTemplate::new(200)
        .insert_header("X-WP-TotalPages", "3")
        .set_body_json(json!([order_json(1, "processing"), order_json(2, "ready")])),
    )
    .expect(1)
    .mount(&server)
    .await;

  let mut query = PageQuery::new(OrderStatus::OPEN.to_vec(), 2);
  query.sort = SortOrder::Asc;
  let page = client(&server).fetch_page(&query).await.unwrap();

  assert_eq!(page.orders.len(), 2);
  assert!(page.has_more);
  assert_eq!(page.orders[1].status, "ready");
  assert_eq!(page.orders[0].billing.phone, "912");
}

#[tokio::test]
#[serial]
async fn last_page_and_malformed_records() {
  setup_tracing();
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/wp-json/wc/v3/orders"))
    .respond_with(
      ResponseTemplate::new(200)
        .insert_header("X-WP-TotalPages", "1")
        .set_body_json(json!([order_json(5, "completed"), {"id": "not-a-number"}])),
    )
    .mount(&server)
    .await;

  let page = client(&server)
    .fetch_page(&PageQuery::new(vec![OrderStatus::Completed], 1))
    .await
    .unwrap();
  assert_eq!(page.orders.len(), 1);
  assert!(!page.has_more);
}

#[tokio::test]
#[serial]
async fn non_success_read_is_upstream_unavailable_with_body() {
  setup_tracing();
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/wp-json/wc/v3/orders"))
    .respond_with(ResponseTemplate::new(500).set_body_string("database gone"))
    .mount(&server)
    .await;

  let err = client(&server)
    .fetch_page(&PageQuery::new(vec![OrderStatus::Processing], 1))
    .await
    .unwrap_err();
  match err {
    RelayError::UpstreamUnavailable { status, body } => {
      assert_eq!(status, Some(500));
      assert_eq!(body, "database gone");
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[tokio::test]
#[serial]
async fn fetch_order_maps_not_found() {
  setup_tracing();
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/wp-json/wc/v3/orders/77"))
    .respond_with(ResponseTemplate::new(200).set_body_json(order_json(77, "ready")))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/wp-json/wc/v3/orders/78"))
    .respond_with(ResponseTemplate::new(404).set_body_json(json!({"code": "woocommerce_rest_shop_order_invalid_id"})))
    .mount(&server)
    .await;

  let rest = client(&server);
  assert_eq!(rest.fetch_order(77).await.unwrap().id, 77);
  assert!(matches!(rest.fetch_order(78).await, Err(RelayError::OrderNotFound(78))));
}

#[tokio::test]
#[serial]
async fn status_write_is_one_put_and_rejections_keep_status_and_body() {
  setup_tracing();
  let server = MockServer::start().await;
  Mock::given(method("PUT"))
    .and(path("/wp-json/wc/v3/orders/10"))
    .and(body_json(json!({"status": "completed"})))
    .respond_with(ResponseTemplate::new(200).set_body_json(order_json(10, "completed")))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("PUT"))
    .and(path("/wp-json/wc/v3/orders/11"))
    .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"code":"woocommerce_rest_invalid_status"}"#))
    .expect(1)
    .mount(&server)
    .await;

  let rest = client(&server);
  rest.update_status(10, OrderStatus::Completed).await.unwrap();
  match rest.update_status(11, OrderStatus::Ready).await.unwrap_err() {
    RelayError::UpstreamRejected { status, body } => {
      assert_eq!(status, 400);
      assert_eq!(body, r#"{"code":"woocommerce_rest_invalid_status"}"#);
    }
    other => panic!("unexpected error: {other}"),
  }
}
