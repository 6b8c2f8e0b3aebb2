#![allow(dead_code)]

use admincrate::{AdminSite, ModelAdmin};
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::prelude::*;
use serde_json::{Value as JsonValue, json};
use tower::ServiceExt;

pub mod article;
pub mod article_tag;
pub mod tag;

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    // Several tests share the process; only the first subscriber sticks.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn article_admin() -> ModelAdmin {
    ModelAdmin::new::<article::Entity>()
        .fields(["id", "title", "description", "create_time", "views"])
        .list_filter(["id", "title", "description", "create_time", "views"])
        .read_fields(["id", "title", "description", "create_time", "views"])
        .many_to_many::<tag::Entity, article_tag::Entity>("tags")
}

pub fn tag_admin() -> ModelAdmin {
    ModelAdmin::new::<tag::Entity>()
}

/// Site router with the article and tag admins registered.
pub fn setup_test_app(db: DatabaseConnection) -> Router {
    setup_app_with(db, vec![article_admin(), tag_admin()])
}

pub fn setup_app_with(db: DatabaseConnection, admins: Vec<ModelAdmin>) -> Router {
    admins
        .into_iter()
        .fold(AdminSite::builder(db), admincrate::site::AdminSiteBuilder::register)
        .build()
        .expect("site should assemble")
        .router()
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: JsonValue,
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> Reply {
    send_with_headers(app, method, uri, body, &[]).await
}

pub async fn send_with_headers(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<JsonValue>,
    headers: &[(&str, &str)],
) -> Reply {
    let mut request = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    Reply { status, headers, body }
}

/// Create articles titled `Article {n}` with `create_time` on 2022-01-0{n}.
pub async fn seed_articles(app: &Router, count: u32) {
    let items: Vec<JsonValue> = (1..=count)
        .map(|n| {
            json!({
                "title": format!("Article {n}"),
                "description": format!("About topic {n}"),
                "create_time": format!("2022-01-{n:02} 00:00:00"),
            })
        })
        .collect();
    let reply = send(app, "POST", "/admin/article/item", Some(JsonValue::Array(items))).await;
    assert_eq!(reply.status, StatusCode::OK, "seeding failed: {}", reply.body);
    assert_eq!(reply.body["data"], json!(count));
}

pub async fn seed_tags(app: &Router, names: &[&str]) {
    let items: Vec<JsonValue> = names.iter().map(|name| json!({"name": name})).collect();
    let reply = send(app, "POST", "/admin/tag/item", Some(JsonValue::Array(items))).await;
    assert_eq!(reply.status, StatusCode::OK, "seeding failed: {}", reply.body);
}

/// Ids of the items in a list reply, in order.
pub fn ids(reply: &Reply) -> Vec<i64> {
    reply.body["data"]["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["id"].as_i64().expect("integer id"))
        .collect()
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateTables)]
    }
}

pub struct CreateTables;

impl MigrationName for CreateTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_article_tables"
    }
}

#[derive(DeriveIden)]
enum Article {
    Table,
    Id,
    Title,
    Description,
    CreateTime,
    Views,
}

#[derive(DeriveIden)]
enum Tag {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum ArticleTag {
    Table,
    ArticleId,
    TagId,
}

#[async_trait::async_trait]
impl MigrationTrait for CreateTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Article::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Article::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Article::Title).string().not_null().unique_key())
                    .col(ColumnDef::new(Article::Description).text().null())
                    .col(ColumnDef::new(Article::CreateTime).date_time().not_null())
                    .col(ColumnDef::new(Article::Views).integer().not_null().default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tag::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tag::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tag::Name).string().not_null().unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ArticleTag::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ArticleTag::ArticleId).integer().not_null())
                    .col(ColumnDef::new(ArticleTag::TagId).integer().not_null())
                    .primary_key(Index::create().col(ArticleTag::ArticleId).col(ArticleTag::TagId))
                    .foreign_key(
                        ForeignKey::create()
                            .from(ArticleTag::Table, ArticleTag::ArticleId)
                            .to(Article::Table, Article::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ArticleTag::Table, ArticleTag::TagId)
                            .to(Tag::Table, Tag::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ArticleTag::Table).to_owned())
            .await?;
        manager.drop_table(Table::drop().table(Tag::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Article::Table).to_owned()).await
    }
}
