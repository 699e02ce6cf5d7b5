use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;

use wholesale_portal::api::{HttpListSource, ListSource, PageRequest};
use wholesale_portal::error::PortalError;
use wholesale_portal::types::{
    CurrentUser, Document, Download, NlfTemplate, Product, Record, RecordId, Resource,
};

const TOTAL_PRODUCTS: u64 = 25;

async fn products(Query(params): Query<HashMap<String, String>>, headers: HeaderMap) -> Response {
    if headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        != Some("Bearer good-token")
    {
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    }

    let page: u64 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: u64 = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);
    let total = match params.get("keyword").map(String::as_str) {
        Some("bolt") => 2,
        _ => TOTAL_PRODUCTS,
    };
    let first = (page - 1) * limit + 1;
    let last = (first + limit - 1).min(total);
    let items: Vec<_> = (first..=last)
        .map(|id| {
            json!({
                "id": id,
                "name": format!("Product {id}"),
                "sku": format!("SKU-{id}"),
                "status": params.get("status").cloned().unwrap_or_else(|| "active".to_string()),
            })
        })
        .collect();

    Json(json!({
        "items": items,
        "meta": {
            "totalItems": total,
            "itemsPerPage": limit,
            "currentPage": page,
            "totalPages": total.div_ceil(limit),
        }
    }))
    .into_response()
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/api/products", get(products))
        .route(
            "/api/documents",
            get(|| async { (StatusCode::FORBIDDEN, "no access to documents") }),
        )
        .route(
            "/api/downloads",
            get(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "limit must be positive") }),
        )
        .route(
            "/api/nlf-templates",
            get(|| async {
                Json(json!({
                    "items": [],
                    "meta": {"totalItems": 3, "itemsPerPage": 0, "currentPage": 1, "totalPages": 1}
                }))
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn source<R: wholesale_portal::types::Row>(addr: SocketAddr, resource: Resource) -> HttpListSource<R> {
    HttpListSource::new(
        &format!("http://{addr}/api"),
        resource,
        Duration::from_secs(5),
    )
    .unwrap()
}

fn user() -> CurrentUser {
    CurrentUser::anonymous().with_token("good-token")
}

#[tokio::test]
async fn test_fetch_typed_page() {
    let addr = spawn_server().await;
    let source = source::<Product>(addr, Resource::Products);

    let page = source
        .fetch_page(&user(), PageRequest::new(3, 10))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 5);
    assert_eq!(page.items[0].id, 21);
    assert_eq!(page.items[0].sku.as_deref(), Some("SKU-21"));
    assert_eq!(page.meta.total_items, 25);
    assert_eq!(page.meta.total_pages, 3);
    assert!(!page.meta.has_next_page());
}

#[tokio::test]
async fn test_search_and_filters_reach_the_server() {
    let addr = spawn_server().await;
    let source = source::<Record>(addr, Resource::Products);

    let mut request = PageRequest::new(1, 10);
    request.search = Some("bolt".to_string());
    request
        .filters
        .insert("status".to_string(), Some("draft".to_string()));
    let page = source.fetch_page(&user(), request).await.unwrap();

    assert_eq!(page.meta.total_items, 2);
    assert_eq!(page.items[0].id, RecordId::Number(1));
    assert_eq!(page.items[0].field_text("status"), "draft");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let addr = spawn_server().await;
    let source = source::<Product>(addr, Resource::Products);

    let err = source
        .fetch_page(&CurrentUser::anonymous(), PageRequest::new(1, 10))
        .await
        .unwrap_err();

    assert!(matches!(err, PortalError::Unauthorized));
    assert_eq!(
        err.toast_message(),
        "Your session has expired, please sign in again"
    );
}

#[tokio::test]
async fn test_error_statuses_are_mapped() {
    let addr = spawn_server().await;

    let err = source::<Record>(addr, Resource::Documents)
        .fetch_page(&user(), PageRequest::new(1, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Forbidden(ref m) if m == "no access to documents"));

    let err = source::<Record>(addr, Resource::Downloads)
        .fetch_page(&user(), PageRequest::new(1, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Validation(ref m) if m == "limit must be positive"));
}

#[tokio::test]
async fn test_malformed_meta_is_rejected() {
    let addr = spawn_server().await;

    let err = source::<Record>(addr, Resource::NlfTemplates)
        .fetch_page(&user(), PageRequest::new(1, 10))
        .await
        .unwrap_err();

    assert!(matches!(err, PortalError::InvalidMeta(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_http_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = source::<Record>(addr, Resource::Products)
        .fetch_page(&user(), PageRequest::new(1, 10))
        .await
        .unwrap_err();

    assert!(matches!(err, PortalError::Http(_)));
    assert_eq!(err.toast_message(), "Could not reach the server");
}

fn single_page(items: serde_json::Value) -> Json<serde_json::Value> {
    Json(json!({
        "items": items,
        "meta": {"totalItems": 1, "itemsPerPage": 10, "currentPage": 1, "totalPages": 1}
    }))
}

#[tokio::test]
async fn test_typed_rows_for_each_resource() {
    let app = Router::new()
        .route(
            "/documents",
            get(|| async {
                single_page(json!([{
                    "id": 3,
                    "name": "Price list 2026",
                    "documentType": "pricelist",
                    "createdAt": "2026-01-05"
                }]))
            }),
        )
        .route(
            "/downloads",
            get(|| async {
                single_page(json!([{"id": 8, "fileName": "export.csv", "state": "ready"}]))
            }),
        )
        .route(
            "/nlf-templates",
            get(|| async { single_page(json!([{"id": 2, "name": "Standard NLF"}])) }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let base = format!("http://{addr}");
    let timeout = Duration::from_secs(5);

    let documents = HttpListSource::<Document>::new(&base, Resource::Documents, timeout)
        .unwrap()
        .fetch_page(&user(), PageRequest::new(1, 10))
        .await
        .unwrap();
    assert_eq!(documents.items[0].document_type.as_deref(), Some("pricelist"));
    assert_eq!(documents.items[0].status, None);

    let downloads = HttpListSource::<Download>::new(&base, Resource::Downloads, timeout)
        .unwrap()
        .fetch_page(&user(), PageRequest::new(1, 10))
        .await
        .unwrap();
    assert_eq!(downloads.items[0].file_name, "export.csv");
    assert_eq!(downloads.items[0].state.as_deref(), Some("ready"));

    let templates = HttpListSource::<NlfTemplate>::new(&base, Resource::NlfTemplates, timeout)
        .unwrap()
        .fetch_page(&user(), PageRequest::new(1, 10))
        .await
        .unwrap();
    assert_eq!(templates.items[0].name, "Standard NLF");
    assert_eq!(templates.items[0].description, None);
}
