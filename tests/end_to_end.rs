mod common;

use common::{UUID, engine, message, set_configuration};
use m2mxml::behavior::BehaviorKind;
use m2mxml::protocol::{CommandKind, Error, ExceptionCode, SyntaxError};

#[test]
fn request_percept_answers_with_one_percept_and_a_success_response() {
    let (mut engine, _clock) = engine();
    engine.handlers_mut().queue_readings("ain01", &["3.25"]);

    engine
        .parse_message(
            message(r#"<Command name="requestPercept" seq="5" address="ain01"/>"#).as_bytes(),
        )
        .unwrap();

    let board = engine.handlers();
    assert_eq!(board.calls, ["requestPercept ain01"]);
    assert_eq!(board.sent.len(), 1);
    let sent = board.last_sent();
    assert!(sent.starts_with(&format!(r#"<M2MXML ver="1.0" td="{UUID}">"#)));
    assert_eq!(sent.matches("<Percept ").count(), 1);
    assert!(sent.contains(r#"<Percept address="ain01" value="3.25" seq="5" entryType="1""#));
    assert!(!sent.contains("perceptType"));
    assert!(sent.contains(r#"<Response resultCode="0" seq="5""#));
    assert!(board.errors.is_empty());
}

#[test]
fn request_percept_without_address_reports_every_input() {
    let (mut engine, _clock) = engine();
    engine.handlers_mut().queue_readings("ain01", &["1.5"]);
    engine.handlers_mut().queue_readings("din01", &["1"]);

    engine
        .parse_message(message(r#"<Command name="requestPercept" seq="6"/>"#).as_bytes())
        .unwrap();

    let board = engine.handlers();
    assert_eq!(board.calls, ["requestPercept ain01", "requestPercept din01"]);
    let sent = board.last_sent();
    assert!(sent.contains(r#"<Percept address="ain01" value="1.5""#));
    assert!(sent.contains(r#"<Percept address="din01" value="1" perceptType="digital""#));
    assert!(!sent.contains("dout01"));
}

#[test]
fn repeated_sequence_number_is_executed_once() {
    let (mut engine, _clock) = engine();
    let input = message(r#"<Command name="requestPercept" seq="42" address="ain01"/>"#);

    engine.parse_message(input.as_bytes()).unwrap();
    engine.parse_message(input.as_bytes()).unwrap();

    let board = engine.handlers();
    assert_eq!(board.calls.len(), 1);
    assert_eq!(board.sent.len(), 1);
    assert!(board.logged("Duplicate command received"));
}

#[test]
fn malformed_message_is_logged_and_never_dispatched() {
    let (mut engine, _clock) = engine();

    let err = engine
        .parse_message(message(r#"<Command name="reboot" seq="1"></Reboot>"#).as_bytes())
        .unwrap_err();

    assert_eq!(err, Error::Syntax(SyntaxError::MismatchedEndTag));
    assert_eq!(engine.last_error(), Some(&err));
    let board = engine.handlers();
    assert!(board.calls.is_empty());
    assert!(board.sent.is_empty());
    assert!(board.logged("Mismatching ending element name"));
}

#[test]
fn invalid_command_and_broken_end_tag_are_both_logged() {
    let (mut engine, _clock) = engine();

    let err = engine
        .parse_message(br#"<M2MXML ver="1.0"><Command name="x"></M2MXM>"#)
        .unwrap_err();

    assert_eq!(err, Error::Syntax(SyntaxError::MismatchedEndTag));
    assert_eq!(engine.last_error(), Some(&err));
    let board = engine.handlers();
    let logged: Vec<&str> = board.errors.iter().map(|(_, text)| text.as_str()).collect();
    assert_eq!(logged, ["Invalid command", "Mismatching ending element name"]);
    assert!(board.calls.is_empty());
    assert!(board.sent.is_empty());
}

#[test]
fn invalid_utf8_is_rejected() {
    let (mut engine, _clock) = engine();
    let err = engine.parse_message(&[b'<', 0xff, 0xfe]).unwrap_err();
    assert!(matches!(err, Error::InvalidUtf8(_)));
    assert_eq!(engine.handlers().errors.len(), 1);
}

#[test]
fn foreign_uuid_is_logged_but_still_answered() {
    let (mut engine, _clock) = engine();
    let input = r#"<M2MXML ver="1.0" td="ffffffffffffffffffffffffffffffff"><Command name="reboot" seq="3"/></M2MXML>"#;

    engine.parse_message(input.as_bytes()).unwrap();

    let board = engine.handlers();
    assert!(board.logged("Device and M2MXML message UUIDs are not the same"));
    assert_eq!(board.calls, ["reboot"]);
    assert!(board.last_sent().contains(r#"<Response resultCode="0" seq="3""#));
}

#[test]
fn unknown_address_is_a_bad_argument() {
    let (mut engine, _clock) = engine();

    engine
        .parse_message(
            message(r#"<Command name="turnOn" seq="9" address="nope"/>"#).as_bytes(),
        )
        .unwrap();

    let board = engine.handlers();
    assert!(board.calls.is_empty());
    assert!(
        board
            .last_sent()
            .contains(r#"<Response resultCode="6" message="nope" seq="9""#)
    );
}

#[test]
fn actuation_checks_the_transducer_type() {
    let (mut engine, _clock) = engine();

    engine
        .parse_message(
            message(r#"<Command name="turnOn" seq="1" address="ain01"/>"#).as_bytes(),
        )
        .unwrap();
    engine
        .parse_message(message(r#"<Command name="turnOff" seq="2"/>"#).as_bytes())
        .unwrap();
    engine
        .parse_message(
            message(r#"<Command name="turnOff" seq="3" address="dout01"/>"#).as_bytes(),
        )
        .unwrap();

    let board = engine.handlers();
    assert_eq!(board.calls, ["turn dout01 false"]);
    assert!(board.sent[0].contains(r#"resultCode="4" message="Invalid transducer" seq="1""#));
    assert!(
        board.sent[1].contains(r#"resultCode="4" message="Address required, but not found" seq="2""#)
    );
    assert!(board.sent[2].contains(r#"<Response resultCode="0" seq="3""#));
}

#[test]
fn string_and_analog_outputs_receive_their_payload() {
    let (mut engine, _clock) = engine();

    engine
        .parse_message(
            message(concat!(
                r#"<Command name="setStringOutput" seq="1" address="sout01">"#,
                r#"<Property name="data" value="hello"/></Command>"#
            ))
            .as_bytes(),
        )
        .unwrap();
    engine
        .parse_message(
            message(concat!(
                r#"<Command name="setAnalogOutput" seq="2" address="aout01">"#,
                r#"<Property name="setPoint" value="2.5"/></Command>"#
            ))
            .as_bytes(),
        )
        .unwrap();
    let err = engine
        .parse_message(
            message(r#"<Command name="setStringOutput" seq="3" address="sout01"/>"#).as_bytes(),
        )
        .unwrap_err();

    assert_eq!(err, Error::MissingStringData);
    let board = engine.handlers();
    assert_eq!(board.calls, ["string sout01 hello", "analog aout01 2.5"]);
    assert_eq!(board.sent.len(), 2);
    assert!(board.logged("'setStringOutput' data not found"));
}

#[test]
fn unsupported_hook_fails_the_command() {
    let (mut engine, _clock) = engine();
    engine.handlers_mut().unsupported.push(CommandKind::Reboot);

    engine
        .parse_message(message(r#"<Command name="reboot" seq="8"/>"#).as_bytes())
        .unwrap();

    let board = engine.handlers();
    assert!(board.calls.is_empty());
    assert!(
        board
            .last_sent()
            .contains(r#"<Response resultCode="4" message="Unhandled command" seq="8""#)
    );
}

#[test]
fn unknown_command_is_answered_with_its_name() {
    let (mut engine, _clock) = engine();

    engine
        .parse_message(message(r#"<Command name="frobnicate" seq="4"/>"#).as_bytes())
        .unwrap();

    assert!(
        engine
            .handlers()
            .last_sent()
            .contains(r#"<Response resultCode="5" message="frobnicate" seq="4""#)
    );
}

#[test]
fn query_reports_configured_and_requested_properties() {
    let (mut engine, _clock) = engine();
    engine
        .parse_message(set_configuration("1", Some("ain01"), &[("low", "10")]).as_bytes())
        .unwrap();

    engine
        .parse_message(
            message(r#"<Command name="queryConfiguration" seq="2" address="ain01"/>"#).as_bytes(),
        )
        .unwrap();
    let everything = engine.handlers().last_sent().to_owned();
    engine
        .parse_message(
            message(concat!(
                r#"<Command name="queryConfiguration" seq="3" address="ain01">"#,
                r#"<Property name="high"/></Command>"#
            ))
            .as_bytes(),
        )
        .unwrap();
    let requested = engine.handlers().last_sent().to_owned();

    assert!(everything.contains(
        r#"<Response resultCode="0" seq="2"><Property name="low" value="10"/></Response>"#
    ));
    assert!(!everything.contains(r#"name="high""#));
    assert!(requested.contains(r#"<Property name="high" value="0"/>"#));
    assert!(!requested.contains(r#"name="low""#));
}

#[test]
fn behavior_keys_are_kept_from_the_application() {
    let (mut engine, _clock) = engine();

    engine
        .parse_message(
            set_configuration("1", Some("ain01"), &[("type", "1"), ("low", "10")]).as_bytes(),
        )
        .unwrap();

    assert_eq!(engine.handlers().calls, ["set ain01 type=1"]);
    assert_eq!(engine.count_behaviors(), 1);
    assert!(
        engine
            .behavior(BehaviorKind::OutOfBounds, Some("ain01"))
            .is_some()
    );
    let low = engine.device().transducer("ain01").unwrap().property("low").unwrap();
    assert!(low.show());
    assert_eq!(low.value().as_str(), "10");
}

#[test]
fn template_request_announces_every_transducer() {
    let (mut engine, _clock) = engine();
    engine
        .parse_message(set_configuration("1", Some("ain01"), &[("high", "50")]).as_bytes())
        .unwrap();

    engine
        .parse_message(
            message(concat!(
                r#"<Command name="queryConfiguration" seq="2">"#,
                r#"<Property name="template"/></Command>"#
            ))
            .as_bytes(),
        )
        .unwrap();
    assert!(
        engine
            .behavior(BehaviorKind::SetupDevice, None)
            .is_some()
    );
    engine.handlers_mut().sent.clear();

    // Setup runs first; the out-of-bounds poll follows on the next pass.
    assert!(engine.process_state().is_some());
    assert!(engine.behavior(BehaviorKind::SetupDevice, None).is_none());

    let board = engine.handlers();
    let setup = board
        .sent
        .iter()
        .find(|sent| sent.contains("setupTransducer"))
        .expect("setup message sent");
    assert!(setup.contains(concat!(
        r#"<Command name="setupTransducer" address="ain01">"#,
        r#"<Property name="type" value="analogIn"/>"#,
        r#"<Property name="label" value="Tank level"/>"#,
        r#"<Property name="units" value="m"/>"#,
        r#"<Property name="high" value="50"/>"#,
        "</Command>"
    )));
    assert!(setup.contains(concat!(
        r#"<Command name="setupTransducer" address="din01">"#,
        r#"<Property name="type" value="digitialIn"/></Command>"#
    )));
    assert!(setup.contains(r#"<Property name="type" value="digitialOut"/>"#));
    assert_eq!(setup.matches("<Command ").count(), 5);
    assert!(!setup.contains("<Response"));
}

#[test]
fn exception_reports_are_sent_unsolicited() {
    let (mut engine, _clock) = engine();

    engine
        .report_exception(ExceptionCode::HARDWARE, Some("overheat"))
        .unwrap();

    let board = engine.handlers();
    assert_eq!(board.errors, [(-1, "overheat".to_owned())]);
    assert!(
        board
            .last_sent()
            .contains(r#"<Exception exceptionCode="0" message="overheat"/>"#)
    );
}
