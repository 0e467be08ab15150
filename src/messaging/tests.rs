use super::{Message, build_topic, build_topic_arbitrary, split_special_topic};
use crate::utils::error::TopicError;
use serde_json::json;

#[test]
fn test_build_topic_lowercases_operation_only() {
    assert_eq!(build_topic("todos", "Task", "Create"), "todos.Task.create");
    assert_eq!(build_topic("App", "Kind", "UPDATE"), "App.Kind.update");
}

#[test]
fn test_build_topic_arbitrary() {
    assert_eq!(build_topic_arbitrary(["a", "b", "c"]), "a.b.c");
    assert_eq!(build_topic_arbitrary(vec!["single".to_string()]), "single");
    assert_eq!(build_topic_arbitrary(Vec::<String>::new()), "");
}

#[test]
fn test_split_special_topic() {
    assert_eq!(
        split_special_topic("room42.topicXYZ"),
        Ok(("room42", "topicXYZ"))
    );
    assert_eq!(
        split_special_topic("8139ed.todos.create.2882717310567"),
        Ok(("8139ed.todos.create", "2882717310567"))
    );
}

#[test]
fn test_split_special_topic_requires_two_segments() {
    assert_eq!(
        split_special_topic("room42"),
        Err(TopicError::MissingSuffix("room42".to_string()))
    );
    assert_eq!(
        split_special_topic(".suffix"),
        Err(TopicError::EmptyBase(".suffix".to_string()))
    );
}

#[test]
fn test_message_decodes_wire_keys() {
    let raw = json!({
        "app": "x",
        "type": "todos",
        "op": "Create",
        "token": "t0k",
        "pld": {"_id": "42", "title": "a"},
        "opts": {"notify": true}
    })
    .to_string();

    let msg: Message = raw.parse().unwrap();
    assert_eq!(msg.app, "x");
    assert_eq!(msg.kind, "todos");
    assert_eq!(msg.token, "t0k");
    assert_eq!(msg.id(), Some("42"));
    assert!(msg.notify());
    assert_eq!(msg.topic(), "x.todos.create");
}

#[test]
fn test_message_prefers_stamped_topic() {
    let msg: Message = json!({"app": "x", "type": "todos", "op": "create", "topic": "room42"})
        .to_string()
        .parse()
        .unwrap();
    assert_eq!(msg.topic(), "room42");
}

#[test]
fn test_message_defaults() {
    let msg = Message::from_value(json!({"app": "x", "pld": null})).unwrap();
    assert!(msg.payload.is_empty());
    assert!(!msg.notify());
    assert_eq!(msg.id(), None);
}

#[test]
fn test_message_id_must_be_string() {
    let msg = Message::from_value(json!({"pld": {"_id": 7}})).unwrap();
    assert_eq!(msg.id(), None);
}

#[test]
fn test_message_rejects_non_object_payload() {
    assert!(Message::from_value(json!({"pld": "nope"})).is_err());
    assert!("not json".parse::<Message>().is_err());
}
