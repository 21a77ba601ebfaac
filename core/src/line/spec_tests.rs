use super::spec::{Direction, Edge, LineOptions, LineSpec, LineValue};

#[test]
fn test_payload_coercion_high_tokens() {
	for payload in ["1", "ON", "on", "True", "true", "TRUE", " on\n"] {
		assert_eq!(
			LineValue::from_payload(payload.as_bytes()),
			LineValue::High,
			"payload {payload:?} should be HIGH"
		);
	}
}

#[test]
fn test_payload_coercion_low_tokens() {
	for payload in ["0", "off", "OFF", "", "garbage", "false", "2", "onn"] {
		assert_eq!(
			LineValue::from_payload(payload.as_bytes()),
			LineValue::Low,
			"payload {payload:?} should be LOW"
		);
	}
	assert_eq!(LineValue::from_payload(&[0xff, 0xfe]), LineValue::Low);
}

#[test]
fn test_value_digits() {
	assert_eq!(LineValue::from_digit("1\n"), Some(LineValue::High));
	assert_eq!(LineValue::from_digit("0"), Some(LineValue::Low));
	assert_eq!(LineValue::from_digit("on"), None);
	assert_eq!(LineValue::High.as_payload(), "1");
	assert_eq!(LineValue::Low.as_payload(), "0");
	assert_eq!(!LineValue::Low, LineValue::High);
}

#[test]
fn test_edge_fires() {
	use LineValue::{High, Low};

	assert!(Edge::Rising.fires(Low, High));
	assert!(!Edge::Rising.fires(High, Low));
	assert!(Edge::Falling.fires(High, Low));
	assert!(!Edge::Falling.fires(Low, High));
	assert!(Edge::Both.fires(Low, High));
	assert!(Edge::Both.fires(High, Low));
	assert!(!Edge::Both.fires(High, High));
	assert!(!Edge::None.fires(Low, High));
}

#[test]
fn test_effective_edge() {
	assert_eq!(LineSpec::new(4, Direction::Watch).effective_edge(), Edge::Both);
	assert_eq!(
		LineSpec::new(4, Direction::Watch)
			.with_edge(Edge::Rising)
			.effective_edge(),
		Edge::Rising
	);
	assert_eq!(LineSpec::new(4, Direction::In).effective_edge(), Edge::None);
	assert_eq!(LineSpec::new(4, Direction::Out).effective_edge(), Edge::None);
}

#[test]
fn test_default_topic_name() {
	assert_eq!(LineSpec::new(17, Direction::Out).topic_name(), "out/17");
	assert_eq!(LineSpec::new(4, Direction::Watch).topic_name(), "watch/4");
	assert_eq!(
		LineSpec::new(17, Direction::Out)
			.with_topic("relay")
			.topic_name(),
		"relay"
	);
}

#[test]
fn test_spec_from_json() {
	let spec: LineSpec = serde_json::from_str(
		r#"{"gpio": 22, "direction": "watch", "edge": "falling",
		    "options": {"activeLow": true, "debounceTimeout": 20},
		    "topic": "door"}"#,
	)
	.unwrap();
	assert_eq!(spec.line, 22);
	assert_eq!(spec.direction, Direction::Watch);
	assert_eq!(spec.edge, Some(Edge::Falling));
	assert_eq!(spec.topic.as_deref(), Some("door"));
	assert!(spec.options.active_low);
	assert_eq!(
		spec.options.debounce(),
		Some(std::time::Duration::from_millis(20))
	);
	assert!(!spec.options.reconfigure_direction);
}

#[test]
fn test_spec_rejects_bad_fields() {
	assert!(serde_json::from_str::<LineSpec>(r#"{"gpio": -1, "direction": "in"}"#).is_err());
	assert!(serde_json::from_str::<LineSpec>(r#"{"gpio": 3, "direction": "sideways"}"#).is_err());
	assert!(serde_json::from_str::<LineSpec>(r#"{"gpio": 3}"#).is_err());
	assert!(serde_json::from_str::<LineSpec>(r#"{"gpio": 3, "direction": "in", "edge": "up"}"#).is_err());
}

#[test]
fn test_zero_debounce_is_disabled() {
	let options = LineOptions {
		debounce_timeout: Some(0),
		..LineOptions::default()
	};
	assert_eq!(options.debounce(), None);
}
