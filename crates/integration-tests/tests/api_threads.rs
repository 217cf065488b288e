//! Thread lifecycle over the HTTP surface: create, list, fetch, update,
//! delete, and the counters and joins each step carries.

mod common;

use axum::http::StatusCode;
use common::{app, body_json};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn created_thread_carries_category_and_author_context() {
    let app = app();
    let author = app.register("threadstarter", "starter@example.com").await;
    let category_id = app.create_category("General", "general").await;

    let response = app
        .post_json(
            "/forum/threads",
            json!({
                "title": "First post",
                "content": "Content long enough to clear the floor.",
                "category_id": category_id,
                "author_id": author.id,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let thread = &body["thread"];
    assert_eq!(thread["title"], "First post");
    assert_eq!(thread["view_count"], 0);
    assert_eq!(thread["reply_count"], 0);
    assert_eq!(thread["category"]["slug"], "general");
    assert_eq!(thread["category"]["color"], "#3B82F6");
    assert_eq!(thread["author"]["username"], "threadstarter");
    assert!(thread["last_reply_user"].is_null());
}

#[tokio::test]
async fn fetching_a_thread_bumps_its_view_count_every_time() {
    let app = app();
    let author = app.register("viewer", "viewer@example.com").await;
    let category_id = app.create_category("General", "general").await;
    let thread_id = app.create_thread(category_id, author.id, "Watched thread").await;

    let first = body_json(app.get(&format!("/forum/threads/{thread_id}")).await).await;
    assert_eq!(first["thread"]["view_count"], 1);
    assert_eq!(first["comments"], json!([]));

    let second = body_json(app.get(&format!("/forum/threads/{thread_id}")).await).await;
    assert_eq!(second["thread"]["view_count"], 2);
}

#[tokio::test]
async fn listing_pages_and_reports_totals() {
    let app = app();
    let author = app.register("lister", "lister@example.com").await;
    let category_id = app.create_category("General", "general").await;
    for title in ["Oldest thread", "Middle thread", "Newest thread"] {
        app.create_thread(category_id, author.id, title).await;
    }

    let page1 = body_json(
        app.get("/forum/threads?limit=2&sortBy=created_at&sortOrder=asc")
            .await,
    )
    .await;
    let titles: Vec<_> = page1["threads"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(titles, ["Oldest thread", "Middle thread"]);
    assert_eq!(
        page1["pagination"],
        json!({ "page": 1, "limit": 2, "total": 3, "totalPages": 2, "hasNext": true, "hasPrev": false })
    );

    let page2 = body_json(
        app.get("/forum/threads?page=2&limit=2&sortBy=created_at&sortOrder=asc")
            .await,
    )
    .await;
    assert_eq!(page2["threads"].as_array().unwrap().len(), 1);
    assert_eq!(page2["threads"][0]["title"], "Newest thread");
    assert_eq!(page2["pagination"]["hasNext"], false);
    assert_eq!(page2["pagination"]["hasPrev"], true);
}

#[tokio::test]
async fn listing_filters_by_category_and_search() {
    let app = app();
    let author = app.register("filterer", "filterer@example.com").await;
    let general = app.create_category("General", "general").await;
    let help = app.create_category("Help", "help").await;
    app.create_thread(general, author.id, "Alpha release notes").await;
    app.create_thread(help, author.id, "Beta feedback wanted").await;

    let by_category = body_json(
        app.get(&format!("/forum/threads?categoryId={help}"))
            .await,
    )
    .await;
    assert_eq!(by_category["pagination"]["total"], 1);
    assert_eq!(by_category["threads"][0]["title"], "Beta feedback wanted");

    let by_search = body_json(app.get("/forum/threads?search=ALPHA").await).await;
    assert_eq!(by_search["pagination"]["total"], 1);
    assert_eq!(by_search["threads"][0]["title"], "Alpha release notes");
}

#[tokio::test]
async fn create_validates_before_touching_the_store() {
    let app = app();
    let author = app.register("strict", "strict@example.com").await;
    let category_id = app.create_category("General", "general").await;

    let short_title = app
        .post_json(
            "/forum/threads",
            json!({
                "title": "ab",
                "content": "Content long enough to clear the floor.",
                "category_id": category_id,
                "author_id": author.id,
            }),
        )
        .await;
    assert_eq!(short_title.status(), StatusCode::BAD_REQUEST);
    let body = body_json(short_title).await;
    assert_eq!(body["error"], "Title must be between 3 and 255 characters");

    let thin_content = app
        .post_json(
            "/forum/threads",
            json!({
                "title": "Valid title",
                "content": "too short",
                "category_id": category_id,
                "author_id": author.id,
            }),
        )
        .await;
    assert_eq!(thin_content.status(), StatusCode::BAD_REQUEST);
    let body = body_json(thin_content).await;
    assert_eq!(body["error"], "Content must be at least 10 characters");

    let ghost_category = Uuid::new_v4();
    let missing = app
        .post_json(
            "/forum/threads",
            json!({
                "title": "Valid title",
                "content": "Content long enough to clear the floor.",
                "category_id": ghost_category,
                "author_id": author.id,
            }),
        )
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body = body_json(missing).await;
    assert_eq!(body["type"], "NOT_FOUND");
    assert_eq!(
        body["error"],
        format!("Category not found: {ghost_category}")
    );

    let listing = body_json(app.get("/forum/threads").await).await;
    assert_eq!(listing["pagination"]["total"], 0);
}

#[tokio::test]
async fn update_replaces_title_and_content() {
    let app = app();
    let author = app.register("editor", "editor@example.com").await;
    let category_id = app.create_category("General", "general").await;
    let thread_id = app.create_thread(category_id, author.id, "Draft title").await;

    let response = app
        .put_json(
            &format!("/forum/threads/{thread_id}"),
            json!({ "title": "Final title", "content": "Revised content with enough length." }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["thread"]["title"], "Final title");

    let partial = app
        .put_json(
            &format!("/forum/threads/{thread_id}"),
            json!({ "title": "Only a title" }),
        )
        .await;
    assert_eq!(partial.status(), StatusCode::BAD_REQUEST);
    let body = body_json(partial).await;
    assert_eq!(body["error"], "Title and content are required");

    let ghost = Uuid::new_v4();
    let missing = app
        .put_json(
            &format!("/forum/threads/{ghost}"),
            json!({ "title": "Valid title", "content": "Content long enough to clear." }),
        )
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_takes_comments_and_reactions_with_it() {
    let app = app();
    let author = app.register("remover", "remover@example.com").await;
    let category_id = app.create_category("General", "general").await;
    let thread_id = app.create_thread(category_id, author.id, "Doomed thread").await;
    let comment_id = app
        .create_comment(thread_id, author.id, "A reply that will vanish")
        .await;
    for (target_type, target_id) in [("thread", thread_id), ("comment", comment_id)] {
        let reaction = app
            .post_json(
                "/forum/reactions",
                json!({
                    "user_id": author.id,
                    "content_type": target_type,
                    "content_id": target_id,
                    "emoji": "👍",
                }),
            )
            .await;
        assert_eq!(reaction.status(), StatusCode::CREATED);
    }

    let response = app.delete(&format!("/forum/threads/{thread_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Thread deleted successfully");

    let gone = app.get(&format!("/forum/threads/{thread_id}")).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let comments = body_json(
        app.get(&format!("/forum/comments?threadId={thread_id}"))
            .await,
    )
    .await;
    assert_eq!(comments["pagination"]["total"], 0);

    for (target_type, target_id) in [("thread", thread_id), ("comment", comment_id)] {
        let reactions = body_json(
            app.get(&format!(
                "/forum/reactions?content_type={target_type}&content_id={target_id}"
            ))
            .await,
        )
        .await;
        assert_eq!(reactions["reactions"], json!([]));
    }
}
