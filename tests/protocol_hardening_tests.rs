use std::net::IpAddr;

use naval_p2p::{AckMessage, Cell, Message, ProtocolError, GRID_SIZE};
use proptest::prelude::*;

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[test]
fn fixed_messages_round_trip() {
    for (text, msg) in [
        ("Conectando", Message::Connecting),
        ("Saindo", Message::Leaving),
        ("lost", Message::Lost),
        ("shot:3,4", Message::Shot(Cell::new(3, 4))),
    ] {
        assert_eq!(Message::decode(text).unwrap(), msg);
        assert_eq!(msg.encode(), text);
    }
}

#[test]
fn surrounding_whitespace_is_trimmed() {
    assert_eq!(Message::decode("  Conectando\r\n").unwrap(), Message::Connecting);
    assert_eq!(AckMessage::decode("hit\n").unwrap(), AckMessage::Hit);
}

#[test]
fn messages_are_case_sensitive() {
    assert!(matches!(Message::decode("conectando"), Err(ProtocolError::Unknown(_))));
    assert!(matches!(AckMessage::decode("HIT"), Err(ProtocolError::Unknown(_))));
}

#[test]
fn participants_encoding_uses_quoted_list() {
    let msg = Message::Participants(vec![ip("10.0.0.1"), ip("10.0.0.2")]);
    assert_eq!(msg.encode(), "participantes: ['10.0.0.1', '10.0.0.2']");
}

#[test]
fn participants_accept_quote_styles() {
    let expected = Message::Participants(vec![ip("10.0.0.1"), ip("10.0.0.2"), ip("10.0.0.3")]);
    assert_eq!(
        Message::decode(r#"participantes: ['10.0.0.1', "10.0.0.2",10.0.0.3]"#).unwrap(),
        expected
    );
    assert_eq!(
        Message::decode("participantes:['10.0.0.1','10.0.0.2','10.0.0.3']").unwrap(),
        expected
    );
}

#[test]
fn malformed_participant_lists_are_rejected() {
    assert_eq!(
        Message::decode("participantes: '10.0.0.1']"),
        Err(ProtocolError::MissingBracket('['))
    );
    assert_eq!(
        Message::decode("participantes: ['10.0.0.1'"),
        Err(ProtocolError::MissingBracket(']'))
    );
    assert_eq!(
        Message::decode("participantes: [ ]"),
        Err(ProtocolError::EmptyParticipantList)
    );
    assert_eq!(
        Message::decode("participantes: ['10.0.0.1]"),
        Err(ProtocolError::UnterminatedQuote("'10.0.0.1".to_string()))
    );
    assert!(matches!(
        Message::decode("participantes: ['10.0.0.1', 'nope']"),
        Err(ProtocolError::InvalidAddress(_))
    ));
    assert!(matches!(
        Message::decode("participantes: ['10.0.0.1',]"),
        Err(ProtocolError::InvalidAddress(_))
    ));
}

#[test]
fn malformed_shots_are_rejected() {
    for text in ["shot:", "shot:3", "shot:a,b", "shot:3,4,5", "shot:-1,2"] {
        assert!(
            matches!(Message::decode(text), Err(ProtocolError::MalformedShot(_))),
            "{} should be malformed",
            text
        );
    }
}

#[test]
fn out_of_grid_shot_is_malformed() {
    for text in ["shot:12,40", "shot:10,0", "shot:0,10", "shot:99,99"] {
        assert!(
            matches!(Message::decode(text), Err(ProtocolError::MalformedShot(_))),
            "{} should be rejected",
            text
        );
    }
    assert_eq!(Message::decode("shot:9,9").unwrap(), Message::Shot(Cell::new(9, 9)));
}

#[test]
fn empty_and_unknown_are_errors() {
    assert_eq!(Message::decode("   "), Err(ProtocolError::Empty));
    assert_eq!(AckMessage::decode(""), Err(ProtocolError::Empty));
    assert!(matches!(Message::decode("hello"), Err(ProtocolError::Unknown(_))));
}

#[test]
fn ack_messages_round_trip() {
    for ack in [AckMessage::Hit, AckMessage::Destroyed] {
        assert_eq!(ack.to_string().parse::<AckMessage>().unwrap(), ack);
    }
}

fn ipv4() -> impl Strategy<Value = IpAddr> {
    any::<[u8; 4]>().prop_map(|o| IpAddr::from(o))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn participant_list_round_trips(addrs in prop::collection::vec(ipv4(), 1..12)) {
        let encoded = Message::Participants(addrs.clone()).encode();
        prop_assert_eq!(Message::decode(&encoded).unwrap(), Message::Participants(addrs));
    }

    #[test]
    fn shot_round_trips(col in 0..GRID_SIZE, row in 0..GRID_SIZE) {
        let msg = Message::Shot(Cell::new(col, row));
        prop_assert_eq!(Message::decode(&msg.encode()).unwrap(), msg);
    }

    #[test]
    fn shot_outside_grid_never_decodes(col in 0usize..1000, row in GRID_SIZE..1000) {
        let across = format!("shot:{},{}", row, col);
        let down = format!("shot:{},{}", col, row);
        prop_assert!(Message::decode(&across).is_err());
        prop_assert!(Message::decode(&down).is_err());
    }

    #[test]
    fn decoder_never_panics(text in ".{0,64}") {
        let _ = Message::decode(&text);
        let _ = AckMessage::decode(&text);
    }
}
