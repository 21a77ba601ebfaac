use super::{BridgeConfig, ConfigError, ConfigRequest};
use crate::line::{Direction, Edge, LineSpec};
use crate::topic::TopicScheme;

#[test]
fn test_full_configuration_is_recognised() {
	let payload = br#"{
		"topicPrefix": "garage",
		"pins": [
			{ "gpio": 17, "direction": "out", "topic": "relay" },
			{ "gpio": 4, "direction": "watch", "edge": "rising",
			  "options": { "debounceTimeout": 20 } }
		]
	}"#;

	let ConfigRequest::Full(config) = ConfigRequest::parse(payload).unwrap() else {
		panic!("expected a full configuration");
	};
	assert_eq!(config.topic_prefix.as_deref(), Some("garage"));
	assert_eq!(config.pins.len(), 2);
	assert_eq!(
		config.pins[0],
		LineSpec::new(17, Direction::Out).with_topic("relay")
	);
	assert_eq!(config.pins[1].edge, Some(Edge::Rising));
	assert_eq!(config.pins[1].options.debounce_timeout, Some(20));
}

#[test]
fn test_single_pin_is_recognised() {
	let request =
		ConfigRequest::parse(br#"{ "gpio": 22, "direction": "in" }"#).unwrap();
	assert_eq!(
		request,
		ConfigRequest::Single(LineSpec::new(22, Direction::In))
	);
}

#[test]
fn test_malformed_json_is_rejected() {
	let err = ConfigRequest::parse(b"{ \"pins\": [").unwrap_err();
	assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn test_unrecognised_shapes_are_rejected() {
	for payload in [
		&b"[]"[..],
		b"42",
		b"\"pins\"",
		br#"{ "gpio": 3 }"#,
		br#"{ "direction": "out" }"#,
	] {
		let err = ConfigRequest::parse(payload).unwrap_err();
		assert!(
			matches!(err, ConfigError::UnrecognizedShape),
			"payload {:?} gave {err:?}",
			String::from_utf8_lossy(payload)
		);
	}
}

#[test]
fn test_empty_pins_are_rejected() {
	let err = ConfigRequest::parse(br#"{ "pins": [] }"#).unwrap_err();
	assert!(matches!(err, ConfigError::EmptyPins));
}

#[test]
fn test_unknown_direction_is_rejected() {
	let err =
		ConfigRequest::parse(br#"{ "pins": [{ "gpio": 1, "direction": "sideways" }] }"#)
			.unwrap_err();
	assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn test_edge_on_output_is_rejected() {
	let err = ConfigRequest::parse(
		br#"{ "gpio": 17, "direction": "out", "edge": "both" }"#,
	)
	.unwrap_err();
	assert!(matches!(
		err,
		ConfigError::EdgeOnOutput {
			line: 17,
			edge: Edge::Both
		}
	));
}

#[test]
fn test_edge_none_on_output_is_accepted() {
	let request = ConfigRequest::parse(
		br#"{ "gpio": 17, "direction": "out", "edge": "none" }"#,
	);
	assert!(request.is_ok());
}

#[test]
fn test_wildcard_topic_is_rejected() {
	let err = ConfigRequest::parse(
		br#"{ "pins": [{ "gpio": 5, "direction": "in", "topic": "door/#" }] }"#,
	)
	.unwrap_err();
	assert!(matches!(err, ConfigError::InvalidTopic { line: 5, .. }));
}

#[test]
fn test_wildcard_prefix_is_rejected() {
	let config = BridgeConfig {
		topic_prefix: Some("house/+".to_string()),
		pins: vec![LineSpec::new(5, Direction::In)],
	};
	assert!(matches!(
		config.validate().unwrap_err(),
		ConfigError::InvalidPrefix(_)
	));
}

#[test]
fn test_one_bad_pin_rejects_the_batch() {
	let config = BridgeConfig {
		topic_prefix: None,
		pins: vec![
			LineSpec::new(5, Direction::In),
			LineSpec::new(6, Direction::Out).with_edge(Edge::Falling),
		],
	};
	assert!(matches!(
		config.validate().unwrap_err(),
		ConfigError::EdgeOnOutput { line: 6, .. }
	));
}

#[test]
fn test_watch_with_edge_none_is_rejected() {
	let err = ConfigRequest::parse(
		br#"{ "gpio": 4, "direction": "watch", "edge": "none" }"#,
	)
	.unwrap_err();
	assert!(matches!(err, ConfigError::WatchWithoutEdge { line: 4 }));
}

#[test]
fn test_in_with_edge_none_is_accepted() {
	let request = ConfigRequest::parse(
		br#"{ "gpio": 4, "direction": "in", "edge": "none" }"#,
	);
	assert!(request.is_ok());
}

#[test]
fn test_bridge_topics_cannot_be_bound() {
	let scheme = TopicScheme::new("home");
	for name in ["configure", "configured", "status"] {
		let config = BridgeConfig {
			topic_prefix: None,
			pins: vec![LineSpec::new(17, Direction::Out).with_topic(name)],
		};
		match config.check_reserved(&scheme) {
			| Err(ConfigError::ReservedTopic { line, topic }) => {
				assert_eq!(line, 17);
				assert!(topic.ends_with(&format!("home/{name}")));
			}
			| other => panic!("{name}: unexpected result {other:?}"),
		}
	}
}

#[test]
fn test_reserved_names_are_free_under_another_prefix() {
	let scheme = TopicScheme::new("home");
	let config = BridgeConfig {
		topic_prefix: Some("garage".to_string()),
		pins: vec![LineSpec::new(17, Direction::Out).with_topic("configure")],
	};
	assert!(config.check_reserved(&scheme).is_ok());

	let config = BridgeConfig {
		topic_prefix: Some("home".to_string()),
		..config
	};
	assert!(matches!(
		config.check_reserved(&scheme),
		Err(ConfigError::ReservedTopic { line: 17, .. })
	));
}
