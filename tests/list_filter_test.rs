use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{ids, send, seed_articles, setup_test_app, setup_test_db};

#[tokio::test]
async fn test_between_filter_on_datetime() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);
    seed_articles(&app, 5).await;

    let reply = send(
        &app,
        "POST",
        "/admin/article/list",
        Some(json!({"create_time": "[-]2022-01-02,2022-01-04"})),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], 0);
    assert_eq!(reply.body["data"]["total"], 3);
    assert_eq!(ids(&reply), vec![2, 3, 4]);
    assert_eq!(
        reply.body["data"]["filters"],
        json!({"create_time": "[-]2022-01-02,2022-01-04"})
    );

    let reply = send(
        &app,
        "POST",
        "/admin/article/list",
        Some(json!({"create_time": "[-]2022-01-02 00:00:00,2022-01-04 01:00:00"})),
    )
    .await;
    assert_eq!(ids(&reply), vec![2, 3, 4]);
}

#[tokio::test]
async fn test_set_filters() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);
    seed_articles(&app, 5).await;

    let reply = send(&app, "POST", "/admin/article/list", Some(json!({"id": "[!*]2,3"}))).await;
    assert_eq!(ids(&reply), vec![1, 4, 5]);

    let reply = send(&app, "POST", "/admin/article/list", Some(json!({"id": "[*]1,3"}))).await;
    assert_eq!(ids(&reply), vec![1, 3]);

    // A JSON array is an in-set as well.
    let reply = send(&app, "POST", "/admin/article/list", Some(json!({"id": [2, 4]}))).await;
    assert_eq!(ids(&reply), vec![2, 4]);
}

#[tokio::test]
async fn test_comparison_and_like_filters() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);
    seed_articles(&app, 5).await;

    let reply = send(&app, "POST", "/admin/article/list", Some(json!({"id": "[>=]4"}))).await;
    assert_eq!(ids(&reply), vec![4, 5]);

    let reply = send(&app, "POST", "/admin/article/list", Some(json!({"id": "[<>]1"}))).await;
    assert_eq!(reply.body["data"]["total"], 4);

    let reply = send(
        &app,
        "POST",
        "/admin/article/list",
        Some(json!({"description": "[~]topic 3"})),
    )
    .await;
    assert_eq!(ids(&reply), vec![3]);

    let reply = send(
        &app,
        "POST",
        "/admin/article/list",
        Some(json!({"title": "[!~]Article", "id": "[<]3"})),
    )
    .await;
    assert_eq!(reply.body["data"]["total"], 0);

    // Plain values are equality.
    let reply = send(&app, "POST", "/admin/article/list", Some(json!({"title": "Article 2"}))).await;
    assert_eq!(ids(&reply), vec![2]);
}

#[tokio::test]
async fn test_unknown_and_empty_filters_are_ignored() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);
    seed_articles(&app, 3).await;

    let reply = send(
        &app,
        "POST",
        "/admin/article/list",
        Some(json!({"nope": "[>]1", "title": null, "id": "[*]"})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["total"], 3);
    assert_eq!(reply.body["data"]["filters"], json!({}));

    // No body at all lists everything.
    let reply = send(&app, "POST", "/admin/article/list", None).await;
    assert_eq!(reply.body["data"]["total"], 3);
}

#[tokio::test]
async fn test_ordering() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);
    seed_articles(&app, 4).await;

    let reply = send(&app, "POST", "/admin/article/list?orderBy=create_time&orderDir=desc", Some(json!({}))).await;
    assert_eq!(ids(&reply), vec![4, 3, 2, 1]);
    assert_eq!(reply.body["data"]["query"]["orderBy"], "create_time");

    let reply = send(&app, "POST", "/admin/article/list?orderBy=title&orderDir=asc", Some(json!({}))).await;
    assert_eq!(ids(&reply), vec![1, 2, 3, 4]);

    // Unknown aliases fall back to the primary key.
    let reply = send(&app, "POST", "/admin/article/list?orderBy=bogus&orderDir=desc", Some(json!({}))).await;
    assert_eq!(ids(&reply), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_ties_keep_a_stable_order() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);
    seed_articles(&app, 4).await;

    // Every article has zero views, so the key decides.
    let reply = send(&app, "POST", "/admin/article/list?orderBy=views&orderDir=desc", Some(json!({}))).await;
    assert_eq!(ids(&reply), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_pagination_and_total() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);
    seed_articles(&app, 5).await;

    let reply = send(&app, "POST", "/admin/article/list?page=1&perPage=2", Some(json!({}))).await;
    assert_eq!(ids(&reply), vec![1, 2]);
    assert_eq!(reply.body["data"]["total"], 5);
    assert_eq!(reply.body["data"]["query"]["perPage"], 2);
    let range = reply.headers.get("Content-Range").unwrap().to_str().unwrap();
    assert_eq!(range, "article 0-1/5");

    let reply = send(&app, "POST", "/admin/article/list?page=3&perPage=2", Some(json!({}))).await;
    assert_eq!(ids(&reply), vec![5]);
    assert_eq!(reply.body["data"]["total"], 5);

    let reply = send(&app, "POST", "/admin/article/list?page=9&perPage=2", Some(json!({}))).await;
    assert!(ids(&reply).is_empty());
}

#[tokio::test]
async fn test_show_total_false_skips_count() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);
    seed_articles(&app, 2).await;

    let reply = send(&app, "POST", "/admin/article/list?showTotal=false", Some(json!({}))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["data"].get("total").is_none());
    assert!(reply.headers.get("Content-Range").is_none());
    assert_eq!(ids(&reply), vec![1, 2]);
}

#[tokio::test]
async fn test_bad_query_parameters_get_envelope() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let reply = send(&app, "POST", "/admin/article/list?page=first", Some(json!({}))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["status"], 400);
}

#[tokio::test]
async fn test_huge_page_returns_empty_envelope() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);
    seed_articles(&app, 5).await;

    let reply = send(
        &app,
        "POST",
        "/admin/article/list?page=18446744073709551615",
        Some(json!({})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.body["status"], 0);
    assert!(ids(&reply).is_empty());
    assert_eq!(reply.body["data"]["total"], 5);
}

#[tokio::test]
async fn test_between_with_empty_first_bound_is_ignored() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);
    seed_articles(&app, 5).await;

    let reply = send(&app, "POST", "/admin/article/list", Some(json!({"id": "[-],2,4"}))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"]["total"], 5);
    assert_eq!(reply.body["data"]["filters"], json!({}));
}
