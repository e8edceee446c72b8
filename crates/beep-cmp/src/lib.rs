//! Channel Management Protocol: the closed XML element set exchanged as
//! payloads on BEEP channel zero (RFC 3080 §2.3.1).
//!
//! This is not a general-purpose XML library. The recognized element set is
//! fixed (`greeting`, `start`, `profile`, `close`, `ok`, `error`); anything
//! else at the root is rejected by the parser.

mod emitter;
mod error;
mod node;
mod parser;

pub use emitter::emit;
pub use error::CmpError;
pub use node::{CmpNode, ProfileOffer};
pub use parser::parse;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_greeting_matches_wire_bytes() {
        let node = CmpNode::empty_greeting();
        assert_eq!(emit(&node), "<greeting />");
    }

    #[test]
    fn greeting_with_one_profile_matches_wire_bytes() {
        let node = CmpNode::greeting(vec!["casimiro.daniel/test-profile".to_string()]);
        assert_eq!(
            emit(&node),
            "<greeting><profile uri=\"casimiro.daniel/test-profile\" /></greeting>"
        );
    }

    #[test]
    fn ok_matches_wire_bytes() {
        assert_eq!(emit(&CmpNode::Ok), "<ok />");
    }

    #[test]
    fn parses_peer_close_with_single_quotes() {
        let node = parse("<close number='1' code='200' />").expect("parses");
        assert_eq!(node, CmpNode::Close { channel: 1, code: 200, lang: None, diagnostic: None });
    }

    #[test]
    fn parses_start_with_unknown_profile_for_rejection() {
        let node = parse("<start number='2'><profile uri='unknown' /></start>").expect("parses");
        match node {
            CmpNode::Start { channel, profiles, .. } => {
                assert_eq!(channel, 2);
                assert_eq!(profiles.len(), 1);
                assert_eq!(profiles[0].uri, "unknown");
            }
            other => panic!("expected Start, got {other:?}"),
        }
    }

    #[test]
    fn emits_error_with_code_and_diagnostic() {
        let node = CmpNode::Error { code: 550, lang: None, diagnostic: Some("all requested profiles are unsupported".to_string()) };
        let text = emit(&node);
        assert!(text.starts_with("<error code=\"550\">"));
        assert!(text.ends_with("</error>"));
    }

    #[test]
    fn tolerates_interior_whitespace_and_newlines() {
        let input = "<greeting>\n  <profile uri=\"a\" />\n  <profile uri=\"b\" />\n</greeting>";
        let node = parse(input).expect("parses despite whitespace");
        assert_eq!(
            node,
            CmpNode::Greeting { profiles: vec!["a".to_string(), "b".to_string()], features: vec![], localizations: vec![] }
        );
    }

    #[test]
    fn rejects_unknown_root_element() {
        let err = parse("<banana />").unwrap_err();
        assert!(matches!(err, CmpError::UnknownElement(tag) if tag == "banana"));
    }

    #[test]
    fn rejects_start_missing_number() {
        let err = parse("<start><profile uri='x' /></start>").unwrap_err();
        assert!(matches!(err, CmpError::Syntax(_)));
    }

    #[test]
    fn round_trips_every_variant() {
        let nodes = vec![
            CmpNode::empty_greeting(),
            CmpNode::greeting(vec!["a".to_string(), "b".to_string()]),
            CmpNode::Start {
                channel: 1,
                server_name: Some("host.example".to_string()),
                profiles: vec![ProfileOffer::new("x"), ProfileOffer { uri: "y".to_string(), encoding: Some("base64".to_string()), init: Some("ZGF0YQ==".to_string()) }],
            },
            CmpNode::Profile(ProfileOffer::new("z")),
            CmpNode::Close { channel: 1, code: 200, lang: None, diagnostic: None },
            CmpNode::Close { channel: 1, code: 200, lang: Some("en".to_string()), diagnostic: Some("bye".to_string()) },
            CmpNode::Ok,
            CmpNode::Error { code: 550, lang: None, diagnostic: None },
            CmpNode::Error { code: 550, lang: Some("en".to_string()), diagnostic: Some("nope".to_string()) },
        ];
        for node in nodes {
            let text = emit(&node);
            let parsed = parse(&text).unwrap_or_else(|e| panic!("failed to parse {text:?}: {e}"));
            assert_eq!(parsed, node, "round-trip mismatch for {text:?}");
        }
    }
}
