use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{send, setup_test_app, setup_test_db};

#[tokio::test]
async fn test_schema_endpoint_describes_admin() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let reply = send(&app, "GET", "/admin/article/schema", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let data = &reply.body["data"];

    let schemas = data["schemas"].as_object().expect("schemas object");
    for name in ["ArticleList", "ArticleFilter", "ArticleCreate", "ArticleRead", "ArticleUpdate"] {
        assert!(schemas.contains_key(name), "missing {name}");
    }

    let create = &schemas["ArticleCreate"];
    assert_eq!(create["required"], json!(["title", "create_time"]));
    assert!(create["properties"].get("id").is_none());
    assert_eq!(create["properties"]["create_time"]["format"], "date-time");

    let update = &schemas["ArticleUpdate"];
    assert!(update.get("required").is_none());
    assert!(update["properties"].get("id").is_none());

    let form: Vec<&str> = data["form"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect();
    assert_eq!(form, vec!["title", "description", "create_time", "views"]);

    let columns = data["columns"].as_array().unwrap();
    assert_eq!(columns[0]["name"], "id");
    assert!(columns.iter().all(|column| column["searchable"] == true));

    assert_eq!(data["links"], json!(["tags"]));
}

#[tokio::test]
async fn test_admin_without_read_fields_has_no_read_schema() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let reply = send(&app, "GET", "/admin/tag/schema", None).await;
    let schemas = reply.body["data"]["schemas"].as_object().unwrap();
    assert!(schemas.contains_key("TagList"));
    assert!(!schemas.contains_key("TagRead"));
    assert_eq!(reply.body["data"]["links"], json!([]));
}

#[tokio::test]
async fn test_openapi_document_collects_every_admin() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let reply = send(&app, "GET", "/admin/openapi.json", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let document = &reply.body["data"];
    assert_eq!(document["info"]["title"], "Admin");

    let components = document["components"]["schemas"].as_object().unwrap();
    assert!(components.contains_key("ArticleCreate"));
    assert!(components.contains_key("ArticleRead"));
    assert!(components.contains_key("TagList"));
    assert!(components.contains_key("TagUpdate"));
    assert!(!components.contains_key("TagRead"));
}
