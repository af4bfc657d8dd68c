//! End-to-end order lifecycle over HTTP.
//!
//! A client request travels through acceptance, invoicing, shipment, delivery
//! and payment until it completes on its own.

mod common;

use clubhx_api::auth::Role;
use common::{response_json, TestApp, TestUser};
use serde_json::{json, Value};

struct Parties {
    admin: TestUser,
    sales: TestUser,
    client: TestUser,
}

async fn parties(app: &TestApp) -> Parties {
    Parties {
        admin: app.user(Role::Admin, "admin@clubhx.test").await,
        sales: app.user(Role::Sales, "vera@clubhx.test").await,
        client: app.user(Role::Client, "salon.aurora@clubhx.test").await,
    }
}

async fn client_request(app: &TestApp, p: &Parties) -> String {
    let response = app
        .post(
            "/api/v1/orders",
            &p.client,
            json!({
                "vendor_id": p.sales.id,
                "items": [
                    { "name": "Bond repair mask", "quantity": 3, "price": "20.00" },
                    { "name": "Color shampoo 1L", "quantity": 2, "price": "12.50" }
                ]
            }),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "requested");
    assert_eq!(body["data"]["created_by"], "client");
    body["data"]["id"].as_str().expect("order id").to_string()
}

fn status_of(body: &Value) -> &str {
    body["data"]["status"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn client_request_runs_to_completion() {
    let app = TestApp::new().await;
    let p = parties(&app).await;
    let id = client_request(&app, &p).await;

    let accepted = app
        .put(
            &format!("/api/v1/orders/{id}/status"),
            &p.sales,
            json!({ "status": "accepted" }),
        )
        .await;
    assert_eq!(accepted.status(), 200);
    assert_eq!(status_of(&response_json(accepted).await), "accepted");

    let invoiced = app
        .post(
            &format!("/api/v1/orders/{id}/invoice"),
            &p.sales,
            json!({ "invoice_url": "https://files.clubhx.test/inv-1001.pdf" }),
        )
        .await;
    assert_eq!(invoiced.status(), 200);
    let body = response_json(invoiced).await;
    assert_eq!(status_of(&body), "invoiced");
    assert_eq!(body["data"]["invoice_url"], "https://files.clubhx.test/inv-1001.pdf");

    let shipped = app
        .post(
            &format!("/api/v1/orders/{id}/shipment"),
            &p.sales,
            json!({ "company": "Chilexpress", "tracking_number": "CX-99812" }),
        )
        .await;
    assert_eq!(shipped.status(), 200);
    let body = response_json(shipped).await;
    assert_eq!(status_of(&body), "shipped");
    assert_eq!(body["data"]["tracking_info"]["tracking_number"], "CX-99812");

    let in_transit = app
        .post(
            &format!("/api/v1/orders/{id}/tracking"),
            &p.sales,
            json!({ "status": "in_transit" }),
        )
        .await;
    assert_eq!(status_of(&response_json(in_transit).await), "shipped");

    let delivered = app
        .post(
            &format!("/api/v1/orders/{id}/tracking"),
            &p.sales,
            json!({ "status": "delivered" }),
        )
        .await;
    let body = response_json(delivered).await;
    assert_eq!(status_of(&body), "delivered");
    assert!(body["data"]["delivered_date"].is_string());

    let proof = app
        .post(
            &format!("/api/v1/orders/{id}/payment-proof"),
            &p.client,
            json!({ "file_name": "transfer.pdf", "url": "https://files.clubhx.test/transfer.pdf" }),
        )
        .await;
    assert_eq!(proof.status(), 200);
    let body = response_json(proof).await;
    assert_eq!(status_of(&body), "payment_pending");
    assert_eq!(body["data"]["payment_proof"]["file_name"], "transfer.pdf");

    let verified = app
        .post(
            &format!("/api/v1/orders/{id}/payment-verification"),
            &p.admin,
            json!({ "verified": true }),
        )
        .await;
    assert_eq!(verified.status(), 200);
    let body = response_json(verified).await;
    assert_eq!(status_of(&body), "completed");
    assert!(body["data"]["paid_date"].is_string());
    assert!(body["data"]["completed_date"].is_string());

    let fetched = response_json(app.get(&format!("/api/v1/orders/{id}"), &p.client).await).await;
    assert_eq!(status_of(&fetched), "completed");
    assert_eq!(fetched["data"]["total"], "85.00");
    assert_eq!(fetched["data"]["items"][1]["price"], "12.50");
}

#[tokio::test]
async fn completed_orders_are_frozen() {
    let app = TestApp::new().await;
    let p = parties(&app).await;
    let id = client_request(&app, &p).await;

    for status in ["accepted", "invoiced", "shipped", "delivered", "payment_pending", "paid"] {
        let response = app
            .put(
                &format!("/api/v1/orders/{id}/status"),
                &p.admin,
                json!({ "status": status }),
            )
            .await;
        assert_eq!(response.status(), 200, "admin should set {status}");
    }

    let fetched = app.get(&format!("/api/v1/orders/{id}"), &p.admin).await;
    assert_eq!(status_of(&response_json(fetched).await), "completed");

    let reopen = app
        .put(
            &format!("/api/v1/orders/{id}/status"),
            &p.admin,
            json!({ "status": "shipped" }),
        )
        .await;
    assert_eq!(reopen.status(), 400);
}

#[tokio::test]
async fn completed_is_never_a_direct_target() {
    let app = TestApp::new().await;
    let p = parties(&app).await;
    let id = client_request(&app, &p).await;

    let response = app
        .put(
            &format!("/api/v1/orders/{id}/status"),
            &p.admin,
            json!({ "status": "completed" }),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn roles_are_held_to_their_transitions() {
    let app = TestApp::new().await;
    let p = parties(&app).await;
    let id = client_request(&app, &p).await;

    // clients may not move an order forward in fulfilment
    let self_invoiced = app
        .put(
            &format!("/api/v1/orders/{id}/status"),
            &p.client,
            json!({ "status": "invoiced" }),
        )
        .await;
    assert_eq!(self_invoiced.status(), 403);

    let invoice = app
        .post(
            &format!("/api/v1/orders/{id}/invoice"),
            &p.client,
            json!({ "invoice_url": "https://files.clubhx.test/x.pdf" }),
        )
        .await;
    assert_eq!(invoice.status(), 403);

    let verify = app
        .post(
            &format!("/api/v1/orders/{id}/payment-verification"),
            &p.sales,
            json!({ "verified": true }),
        )
        .await;
    assert_eq!(verify.status(), 403);
}

#[tokio::test]
async fn sales_revision_goes_back_to_the_client() {
    let app = TestApp::new().await;
    let p = parties(&app).await;
    let id = client_request(&app, &p).await;

    let revised = app
        .put(
            &format!("/api/v1/orders/{id}"),
            &p.sales,
            json!({
                "items": [{ "name": "Bond repair mask", "quantity": 4, "price": "18.00" }],
                "sales_notes": "Volume discount applied"
            }),
        )
        .await;
    assert_eq!(revised.status(), 200);
    let body = response_json(revised).await;
    assert_eq!(status_of(&body), "pending_approval");
    assert_eq!(body["data"]["modified_by"], "sales");
    assert_eq!(body["data"]["total"], "72.00");

    let approved = app
        .put(
            &format!("/api/v1/orders/{id}/status"),
            &p.client,
            json!({ "status": "accepted" }),
        )
        .await;
    assert_eq!(status_of(&response_json(approved).await), "accepted");

    let too_late = app
        .post(
            &format!("/api/v1/orders/{id}/items"),
            &p.client,
            json!({ "name": "Heat protector", "quantity": 1, "price": "9.90" }),
        )
        .await;
    assert_eq!(too_late.status(), 400);
}

#[tokio::test]
async fn orders_are_scoped_to_their_parties() {
    let app = TestApp::new().await;
    let p = parties(&app).await;
    let id = client_request(&app, &p).await;
    let other_client = app.user(Role::Client, "other.salon@clubhx.test").await;
    let other_sales = app.user(Role::Sales, "marco@clubhx.test").await;

    let hidden = app.get(&format!("/api/v1/orders/{id}"), &other_client).await;
    assert_eq!(hidden.status(), 404);

    let listed = app.get("/api/v1/orders", &other_sales).await;
    let body = response_json(listed).await;
    assert_eq!(body["data"]["total"], 0);

    let listed = app.get("/api/v1/orders?status=requested", &p.sales).await;
    let body = response_json(listed).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], id.as_str());
}

#[tokio::test]
async fn reorder_copies_lines_into_a_new_order() {
    let app = TestApp::new().await;
    let p = parties(&app).await;
    let id = client_request(&app, &p).await;

    let response = app
        .post(&format!("/api/v1/orders/{id}/reorder"), &p.client, json!({}))
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_ne!(body["data"]["id"], id.as_str());
    assert_eq!(body["data"]["original_order_id"], id.as_str());
    assert_eq!(body["data"]["status"], "requested");
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn attention_list_and_status_catalog() {
    let app = TestApp::new().await;
    let p = parties(&app).await;
    client_request(&app, &p).await;

    let attention = app.get("/api/v1/orders/attention", &p.sales).await;
    assert_eq!(attention.status(), 200);
    let body = response_json(attention).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let statuses = app.get("/api/v1/order-statuses", &p.client).await;
    let body = response_json(statuses).await;
    let all = body["data"].as_array().expect("status list");
    assert_eq!(all.len(), 13);
    assert!(all
        .iter()
        .any(|s| s["status"] == "completed" && s["progress_percent"] == 100));
}

#[tokio::test]
async fn clients_cannot_rewind_an_order() {
    let app = TestApp::new().await;
    let p = parties(&app).await;
    let id = client_request(&app, &p).await;

    for status in ["accepted", "invoiced", "shipped", "delivered"] {
        let response = app
            .put(
                &format!("/api/v1/orders/{id}/status"),
                &p.admin,
                json!({ "status": status }),
            )
            .await;
        assert_eq!(response.status(), 200, "admin should set {status}");
    }

    for status in ["accepted", "canceled"] {
        let response = app
            .put(
                &format!("/api/v1/orders/{id}/status"),
                &p.client,
                json!({ "status": status }),
            )
            .await;
        assert_eq!(response.status(), 400, "client should not set {status}");
    }

    let fetched = app.get(&format!("/api/v1/orders/{id}"), &p.client).await;
    assert_eq!(status_of(&response_json(fetched).await), "delivered");

    let fresh = client_request(&app, &p).await;
    let canceled = app
        .put(
            &format!("/api/v1/orders/{fresh}/status"),
            &p.client,
            json!({ "status": "canceled" }),
        )
        .await;
    assert_eq!(canceled.status(), 200);
    assert_eq!(status_of(&response_json(canceled).await), "canceled");
}

#[tokio::test]
async fn out_of_range_lines_are_rejected() {
    let app = TestApp::new().await;
    let p = parties(&app).await;

    let lines = [
        json!({ "name": "Bulk mask", "quantity": 2, "price": "79228162514264337593543950335" }),
        json!({ "name": "Bulk mask", "quantity": 3000000000u64, "price": "1.00" }),
        json!({ "name": "Bulk mask", "quantity": 1, "price": "1.005" }),
    ];
    for line in lines {
        let response = app
            .post(
                "/api/v1/orders",
                &p.client,
                json!({ "vendor_id": p.sales.id, "items": [line.clone()] }),
            )
            .await;
        assert_eq!(response.status(), 400, "line {line} should be rejected");
    }

    let id = client_request(&app, &p).await;
    let oversized = app
        .post(
            &format!("/api/v1/orders/{id}/items"),
            &p.client,
            json!({ "name": "Bulk mask", "quantity": 2, "price": "79228162514264337593543950335" }),
        )
        .await;
    assert_eq!(oversized.status(), 400);

    let largest = app
        .post(
            "/api/v1/orders",
            &p.client,
            json!({
                "vendor_id": p.sales.id,
                "items": [{ "name": "Salon fit-out", "quantity": 1000000, "price": "1000000000" }]
            }),
        )
        .await;
    assert_eq!(largest.status(), 201);
    let created = response_json(largest).await;
    let largest_id = created["data"]["id"].as_str().expect("order id");

    let fetched = response_json(app.get(&format!("/api/v1/orders/{largest_id}"), &p.client).await).await;
    assert_eq!(fetched["data"]["items"][0]["quantity"], 1000000);
    assert_eq!(fetched["data"]["total"], created["data"]["total"]);
    assert_eq!(fetched["data"]["total"], "1000000000000000.00");
}
