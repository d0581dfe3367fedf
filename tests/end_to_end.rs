//! Full runs against a mock API and mock homepages.
//!
//! A single wiremock server plays both the API (under `/2`) and the friends'
//! sites, so every request a run makes can be counted.

use friendfeed::config::Config;
use friendfeed::feed::export_opml;
use friendfeed::pipeline::{self, FriendFeeder};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{method, path, path_regex, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn feeder(server: &MockServer, batch_size: usize) -> FriendFeeder {
    let config = Config {
        api_base: format!("{}/2", server.uri()),
        timeout_secs: 5,
        batch_size,
        ..Config::default()
    };
    config.validate().unwrap();
    FriendFeeder::from_config(&config, SecretString::from("test-token")).unwrap()
}

async fn mount_lookup(server: &MockServer, username: &str, id: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/2/users/by/username/{username}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"id": id, "name": username, "username": username}
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_end_to_end_exports_one_outline_per_feed() {
    let server = MockServer::start().await;
    mount_lookup(&server, "jack", "42").await;

    Mock::given(method("GET"))
        .and(path("/2/users/42/following"))
        .and(query_param_is_missing("pagination_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "1", "name": "A", "username": "a", "url": format!("{}/a/", server.uri())},
                {"id": "2", "name": "B", "username": "b"}
            ],
            "meta": {"result_count": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<!DOCTYPE html>
<html><head>
  <link rel="stylesheet" type="text/css" href="/style.css">
  <link rel="alternate" type="application/atom+xml" title="A's Blog" href="/atom.xml">
</head><body>hello</body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let friends = feeder(&server, 25).run("jack").await.unwrap();

    let names: Vec<&str> = friends.iter().map(|f| f.username.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(friends[1].feed.is_none());

    let outlines = pipeline::outlines(&friends);
    assert_eq!(outlines.len(), 1);
    assert_eq!(outlines[0].title, "A's Blog");
    assert_eq!(outlines[0].xml_url, format!("{}/atom.xml", server.uri()));
    assert_eq!(
        outlines[0].html_url.as_deref(),
        Some(format!("{}/a/", server.uri()).as_str())
    );

    let document = export_opml(&outlines, &pipeline::document_title("jack")).unwrap();
    assert_eq!(document.matches("<outline ").count(), 1);
    assert!(document.contains("text=\"A&apos;s Blog\"") || document.contains("text=\"A's Blog\""));

    let mut status = Vec::new();
    pipeline::write_status(&friends, &mut status).unwrap();
    assert_eq!(
        String::from_utf8(status).unwrap(),
        format!("a: {}/atom.xml\nb: -\n", server.uri())
    );
}

#[tokio::test]
async fn test_lookup_not_found_is_fatal_before_any_other_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2/users/by/username/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "title": "Not Found",
            "detail": "Could not find user with username: [ghost]."
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/2/users/[^/]+/following$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/(?:[^2]|2[^/]).*"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = feeder(&server, 25).run("ghost").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Not Found"), "{message}");
    assert!(
        message.contains("Could not find user with username: [ghost]."),
        "{message}"
    );
}

#[tokio::test]
async fn test_failing_page_aborts_without_homepage_requests() {
    let server = MockServer::start().await;
    mount_lookup(&server, "jack", "42").await;

    Mock::given(method("GET"))
        .and(path("/2/users/42/following"))
        .and(query_param_is_missing("pagination_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "1", "name": "A", "username": "a", "url": format!("{}/a/", server.uri())}],
            "meta": {"result_count": 1, "next_token": "p2"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/users/42/following"))
        .and(query_param("pagination_token", "p2"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "title": "Too Many Requests",
            "detail": "Too Many Requests"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = feeder(&server, 25).run("jack").await.unwrap_err();
    assert!(err.to_string().contains("429"), "{err}");
}

#[tokio::test]
async fn test_batches_preserve_following_order() {
    let server = MockServer::start().await;
    mount_lookup(&server, "jack", "42").await;

    let users: Vec<serde_json::Value> = (0..7)
        .map(|i| {
            // Every third friend has no homepage
            let url = (i % 3 != 2).then(|| format!("{}/site{i}/", server.uri()));
            json!({"id": i.to_string(), "name": format!("F{i}"), "username": format!("f{i}"), "url": url})
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/2/users/42/following"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": users, "meta": {"result_count": 7}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/site\d/$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><link type="application/rss+xml" href="rss.xml"></head></html>"#,
        ))
        .expect(5)
        .mount(&server)
        .await;

    let friends = feeder(&server, 3).run("jack").await.unwrap();

    let names: Vec<String> = friends.iter().map(|f| f.username.clone()).collect();
    assert_eq!(names, (0..7).map(|i| format!("f{i}")).collect::<Vec<_>>());
    for (i, friend) in friends.iter().enumerate() {
        if i % 3 == 2 {
            assert!(friend.feed.is_none(), "f{i} should have no feed");
        } else {
            assert_eq!(
                friend.feed.as_ref().map(|f| f.feed_url.clone()),
                Some(format!("{}/site{i}/rss.xml", server.uri()))
            );
        }
    }

    // Untitled feeds fall back to the username
    let titles: Vec<String> = pipeline::outlines(&friends)
        .into_iter()
        .map(|o| o.title)
        .collect();
    assert_eq!(titles, vec!["f0", "f1", "f3", "f4", "f6"]);
}
