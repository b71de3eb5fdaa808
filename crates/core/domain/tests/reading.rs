use domain::{InboundMessage, Reading, format_value, now_epoch_ms};

#[test]
fn reading_field_lookup() {
    let reading = Reading::new("sensor/room-1", 1000)
        .with_field("temperature", Some(23.5))
        .with_field("humidity", None);

    assert_eq!(reading.field("temperature"), Some(23.5));
    assert_eq!(reading.field("humidity"), None);
    assert_eq!(reading.field("pressure"), None);
    assert_eq!(reading.fields.len(), 2);
}

#[test]
fn format_value_drops_integral_fraction() {
    assert_eq!(format_value(60.0), "60");
    assert_eq!(format_value(-3.0), "-3");
    assert_eq!(format_value(23.5), "23.5");
    assert_eq!(format_value(0.125), "0.125");
}

#[test]
fn inbound_message_stamps_arrival_time() {
    let before = now_epoch_ms();
    let message = InboundMessage::now("sensor/room-1", b"{}".to_vec());
    let after = now_epoch_ms();

    assert_eq!(message.topic, "sensor/room-1");
    assert_eq!(message.payload, b"{}");
    assert!(message.received_at_ms >= before && message.received_at_ms <= after);
}
