//! Purpose: Integration tests for decoding, casting, pagination, and classification.
//! Exports: None (integration test module).
//! Role: Exercise the public API the way SDK users combine it, without I/O.
//! Invariants: Fixtures mirror real Steein response shapes.
//! Invariants: Every test builds its own registry; nothing is shared between tests.

use serde_json::{Value, json};
use std::sync::Arc;
use steein::api::{
    ApiErrorKind, ErrorKind, FieldValue, GraphCaster, Method, RawResponse, Request, Response,
    Subtype, SubtypeRegistry, classify, decode_body,
};

fn builtin() -> Arc<SubtypeRegistry> {
    Arc::new(SubtypeRegistry::builtin())
}

fn offline(body: &str) -> Response {
    Response::new(None, RawResponse::new(200, body), builtin())
}

fn with_request(body: &str, request: Request) -> Response {
    Response::new(Some(Arc::new(request)), RawResponse::new(200, body), builtin())
}

#[test]
fn mapping_without_data_is_node_with_exact_keys() {
    let node = offline(r#"{"id":"5","name":"Ada","score":1.5,"tags":["x"]}"#)
        .graph_node(None)
        .expect("node");
    assert_eq!(node.keys().collect::<Vec<_>>(), ["id", "name", "score", "tags"]);
    assert_eq!(node.get_raw("score"), Some(&json!(1.5)));
}

#[test]
fn data_sequence_is_edge_with_server_order() {
    for count in [0usize, 1, 3] {
        let items: Vec<Value> = (0..count).map(|i| json!({"id": 100 - i})).collect();
        let body = json!({"data": items}).to_string();
        let edge = offline(&body).graph_edge(None).expect("edge");
        assert_eq!(edge.len(), count);
        let ids: Vec<String> = edge.iter().filter_map(|node| node.id()).collect();
        let expected: Vec<String> = (0..count).map(|i| (100 - i).to_string()).collect();
        assert_eq!(ids, expected);
    }
}

#[test]
fn positional_object_data_is_edge() {
    let edge = offline(r#"{"data":{"0":{"id":1},"1":{"id":2}}}"#)
        .graph_edge(None)
        .expect("edge");
    assert_eq!(edge.len(), 2);
}

#[test]
fn edge_items_stay_nodes_with_data_wrapped_fields_nested() {
    let body = r#"{"data":[
        {"id":1,"data":{"id":5}},
        {"id":2,"friends":{"data":[{"id":3},{"id":4}],"paging":{}}}
    ]}"#;
    let edge = offline(body).graph_edge(None).expect("edge");
    assert_eq!(edge.len(), 2);

    let first = edge.get(0).expect("first item");
    assert_eq!(first.id().as_deref(), Some("1"));
    let nested = first.get_node("data").expect("data stays a nested node");
    assert_eq!(nested.id().as_deref(), Some("5"));

    let second = edge.get(1).expect("second item");
    assert_eq!(second.id().as_deref(), Some("2"));
    let friends = second.get_edge("friends").expect("friends edge");
    assert_eq!(friends.len(), 2);
    assert_eq!(friends.parent_edge_path(), Some("/2/friends"));
    assert!(friends.iter().all(|friend| friend.get("id").is_some()));
}

#[test]
fn non_list_data_object_is_unwrapped() {
    let node = offline(r#"{"data":{"id":"1","title":"hi"},"meta":{"x":1}}"#)
        .graph_node(None)
        .expect("node");
    assert_eq!(node.keys().collect::<Vec<_>>(), ["id", "title"]);
}

#[test]
fn temporal_values_round_trip() {
    let node = offline(r#"{"created_at":"2017-07-14T02:40:00+0000","updated_at":1500000000}"#)
        .graph_node(None)
        .expect("node");
    let rendered = node.to_json();
    assert_eq!(rendered["created_at"], json!("2017-07-14T02:40:00+0000"));
    let updated = node.get_timestamp("updated_at").expect("timestamp");
    assert_eq!(updated.unix_timestamp(), 1_500_000_000);
    assert_eq!(
        node.get_timestamp("created_at"),
        node.get_timestamp("updated_at")
    );
}

#[test]
fn cast_then_uncast_then_cast_is_stable() {
    let body = r#"{
        "id": 42,
        "created_at": 1500000000,
        "updated_at": 1500000000.25,
        "author": {"id": "7", "name": {"first_name": "Ada"}},
        "comments": {"data": [{"id": 1, "created_at": "2017-07-14T02:40:00Z"}], "paging": {"cursors": {"after": "x"}}},
        "tags": ["a", "b"]
    }"#;
    let caster = GraphCaster::new(builtin());
    let first = caster.cast(&decode_body(body), Some("user")).expect("first cast");
    let second = caster.cast(&first.to_json(), Some("user")).expect("second cast");
    assert_eq!(first, second);

    let node = first.as_node().expect("node");
    let comments = node.get_edge("comments").expect("comments edge");
    assert_eq!(comments.parent_edge_path(), Some("/42/comments"));
}

#[test]
fn pagination_only_changes_endpoint() {
    let source = Request::get("/me/posts")
        .expect("request")
        .with_api_version("/api/v1")
        .with_access_token("tok")
        .with_params([("limit", "2")])
        .expect("params");
    let body = r#"{"data":[{"id":1}],"paging":{"next":"https://www.steein.ru/api/v1/me/posts?limit=2&after=QQ"}}"#;
    let edge = with_request(body, source.clone())
        .graph_edge(None)
        .expect("edge");

    let next = edge.next_page_request().expect("paginate").expect("next");
    assert_eq!(next.endpoint(), "/me/posts?limit=2&after=QQ");
    assert_eq!(next.method(), source.method());
    assert_eq!(next.access_token(), source.access_token());
    assert_eq!(next.api_version(), source.api_version());
    assert_eq!(next.etag(), source.etag());
    assert!(edge.previous_page_request().expect("paginate").is_none());

    let without_paging = with_request(r#"{"data":[]}"#, source)
        .graph_edge(None)
        .expect("edge");
    assert!(without_paging.next_page_request().expect("paginate").is_none());
}

#[test]
fn pagination_rejects_non_get_source() {
    let source = Request::new(Method::Post, "/me/posts").expect("request");
    let edge = with_request(r#"{"data":[],"paging":{"next":"/me/posts?after=x"}}"#, source)
        .graph_edge(None)
        .expect("edge");
    let err = edge.next_page_request().expect_err("post source");
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn error_payloads_classify_by_rule_order() {
    let cases = [
        (json!({"error": {"code": 190, "error_subcode": 458}}), ApiErrorKind::Authentication),
        (json!({"error": {"code": 4}}), ApiErrorKind::Throttle),
        (json!({"error": {"code": 10}}), ApiErrorKind::Authorization),
        (json!({"error": {"code": 2}}), ApiErrorKind::Server),
        (json!({"error": {"code": 506}}), ApiErrorKind::Client),
        (json!({"code": "abc", "message": "bad"}), ApiErrorKind::Default),
    ];
    for (payload, expected) in cases {
        assert_eq!(classify(&payload, Some(400), "").kind(), expected, "{payload}");
    }
    let flattened = classify(&json!({"code": "abc", "message": "bad"}), None, "");
    assert_eq!(flattened.message(), "bad");
    assert_eq!(flattened.code(), None);
}

#[test]
fn body_decoding_coerces_shapes() {
    assert_eq!(decode_body("true"), json!({"success": true}));
    assert_eq!(decode_body("42"), json!({"id": 42}));
    assert_eq!(
        decode_body("access_token=x&expires=10"),
        json!({"access_token": "x", "expires": "10"})
    );
    assert_eq!(decode_body("[1,2,3]"), json!({}));
}

#[test]
fn custom_registry_drives_nested_subtypes() {
    let registry = SubtypeRegistry::builder()
        .register(Subtype::new("page").nested("cover", "photo"))
        .register(Subtype::new("photo"))
        .register(Subtype::new("event_page").extends("page"))
        .build()
        .expect("registry");
    let caster = GraphCaster::new(Arc::new(registry));
    let value = caster
        .cast(&json!({"id": 1, "cover": {"src": "a.jpg"}}), Some("event_page"))
        .expect("cast");
    let node = value.as_node().expect("node");
    assert_eq!(node.subtype(), Some("event_page"));
    assert_eq!(node.get_node("cover").and_then(|n| n.subtype()), Some("photo"));

    let err = caster.cast(&json!({}), Some("user")).expect_err("not registered here");
    assert_eq!(err.kind(), ErrorKind::InvalidSubtype);
}

#[test]
fn edge_map_preserves_shape() {
    let edge = offline(r#"{"data":[{"id":1},{"id":2}],"summary":{"total_count":2}}"#)
        .graph_edge(None)
        .expect("edge");
    let mapped = edge.map(|node, _| node.clone());
    assert_eq!(mapped, edge);
    assert_eq!(mapped.total_count(), Some(2));
}

#[test]
fn scalar_top_level_values_pass_through() {
    let caster = GraphCaster::new(builtin());
    assert_eq!(
        caster.cast(&json!("plain"), None).expect("cast"),
        FieldValue::Raw(json!("plain"))
    );
}
