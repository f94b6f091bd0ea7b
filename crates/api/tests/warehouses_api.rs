use depot_core::TenantId;
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = depot_api::app::build_app();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct Tenant {
    client: reqwest::Client,
    tenant_id: String,
    company_id: String,
}

impl Tenant {
    async fn with_company(srv: &TestServer, name: &str) -> Self {
        let client = reqwest::Client::new();
        let tenant_id = TenantId::new().to_string();
        let res = client
            .post(srv.url("/companies"))
            .header("X-Tenant-Id", &tenant_id)
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let company: Value = res.json().await.unwrap();

        Self {
            client,
            tenant_id,
            company_id: company["company_id"].as_str().unwrap().to_string(),
        }
    }

    fn post(&self, url: String) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("X-Tenant-Id", &self.tenant_id)
            .header("X-Company-Id", &self.company_id)
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("X-Tenant-Id", &self.tenant_id)
            .header("X-Company-Id", &self.company_id)
    }

    fn patch(&self, url: String) -> reqwest::RequestBuilder {
        self.client
            .patch(url)
            .header("X-Tenant-Id", &self.tenant_id)
            .header("X-Company-Id", &self.company_id)
    }
}

#[tokio::test]
async fn health_is_public_but_domain_routes_need_a_tenant() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/warehouses")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_context");
}

#[tokio::test]
async fn create_warehouse_returns_layout_and_advisory() {
    let srv = TestServer::spawn().await;
    let tenant = Tenant::with_company(&srv, "Acme").await;

    let res = tenant
        .post(srv.url("/warehouses"))
        .json(&json!({
            "code": "WH",
            "reception_steps": "two_steps",
            "delivery_steps": "pick_pack_ship",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();

    let warehouse = &body["warehouse"];
    assert_eq!(warehouse["name"], "Acme");
    assert_eq!(warehouse["code"], "WH");
    assert_eq!(warehouse["sub_locations"].as_object().unwrap().len(), 4);
    assert_eq!(
        body["advisories"][0]["message"],
        "Creating a new warehouse will automatically activate the Storage Locations setting"
    );

    let id = warehouse["id"].as_str().unwrap();
    let res = tenant
        .get(srv.url(&format!("/warehouses/{id}/operation-types")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let kinds: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|pt| pt["kind"].as_str().unwrap())
        .collect();
    for kind in ["receipt", "delivery", "pick", "pack", "internal", "return"] {
        assert!(kinds.contains(&kind), "missing {kind}");
    }
}

#[tokio::test]
async fn duplicate_code_is_a_conflict() {
    let srv = TestServer::spawn().await;
    let tenant = Tenant::with_company(&srv, "Acme").await;

    let first = tenant
        .post(srv.url("/warehouses"))
        .json(&json!({ "name": "One", "code": "WH" }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = tenant
        .post(srv.url("/warehouses"))
        .json(&json!({ "name": "Two", "code": "WH" }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body: Value = second.json().await.unwrap();
    assert_eq!(
        body["message"],
        "The short name of the warehouse must be unique per company!"
    );

    let list: Value = tenant
        .get(srv.url("/warehouses"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn defaults_and_onchange_follow_warehouse_count() {
    let srv = TestServer::spawn().await;
    let tenant = Tenant::with_company(&srv, "Acme").await;

    let onchange: Value = tenant
        .post(srv.url("/warehouses/onchange/company"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(onchange["warning"]["title"], "Warning");

    for code in ["A", "B"] {
        let res = tenant
            .post(srv.url("/warehouses"))
            .json(&json!({ "code": code }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let defaults: Value = tenant
        .get(srv.url("/warehouses/defaults"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(defaults["name"], "Acme - warehouse # 3");
    assert_eq!(defaults["reception_steps"], "one_step");

    let onchange: Value = tenant
        .post(srv.url("/warehouses/onchange/company"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(onchange["warning"].is_null());
}

#[tokio::test]
async fn patch_updates_steps_and_sequences_number_with_code() {
    let srv = TestServer::spawn().await;
    let tenant = Tenant::with_company(&srv, "Acme").await;

    let created: Value = tenant
        .post(srv.url("/warehouses"))
        .json(&json!({ "name": "Main", "code": "WH" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["warehouse"]["id"].as_str().unwrap().to_string();

    let res = tenant
        .patch(srv.url(&format!("/warehouses/{id}")))
        .json(&json!({ "code": "MAIN", "delivery_steps": "pick_ship" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["code"], "MAIN");
    assert!(updated["sub_locations"]["output"].is_string());

    let pick_type_id = updated["operation_types"]["pick"].as_str().unwrap().to_string();
    let ops: Value = tenant
        .get(srv.url(&format!("/warehouses/{id}/operation-types")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let pick = ops["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|pt| pt["picking_type_id"] == pick_type_id.as_str())
        .unwrap();

    let reserved: Value = tenant
        .post(srv.url(&format!(
            "/sequences/{}/next",
            pick["sequence_id"].as_str().unwrap()
        )))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reserved["name"], "MAIN/PICK/00001");
}

#[tokio::test]
async fn unknown_warehouse_is_not_found_and_bad_id_is_rejected() {
    let srv = TestServer::spawn().await;
    let tenant = Tenant::with_company(&srv, "Acme").await;

    let res = tenant
        .get(srv.url(&format!("/warehouses/{}", TenantId::new())))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = tenant.get(srv.url("/warehouses/garbage")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
