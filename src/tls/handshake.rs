//! The client's side of the forged handshake.
//!
//! The exchange goes:
//! 1. We send a ClientHello carrying the authentication token.
//! 2. The server answers with [`DISCARDED_SERVER_MESSAGES`] records (ServerHello,
//!    ChangeCipherSpec and Finished), which we read and throw away.
//! 3. We send our ChangeCipherSpec and Finished, see [`compose_reply`].
//!
//! After that, both sides exchange application data records.

use std::io;

use crate::{config::State, utils::random_array};

use super::{
    client_hello::{build_client_hello, Grease, HelloParams},
    record::{add_record_layer, add_record_layer_into, ContentType, ProtocolVersion},
    token::{make_random_field, make_session_ticket, window_index},
};

/// How many records the server sends in reply to our ClientHello.
pub const DISCARDED_SERVER_MESSAGES: usize = 3;

/// The length of the fake encrypted Finished message we send.
pub const FINISHED_LEN: usize = 40;

/// Composes the ClientHello record, with a token bound to the current time.
pub fn compose_client_hello(state: &State) -> io::Result<Vec<u8>> {
    let window_index = window_index(state.now(), state.replay_window());
    let session_ticket = make_session_ticket(state.key(), state.opaque(), window_index);

    let params = HelloParams {
        browser: state.browser(),
        server_name: state.server_name(),
        random: make_random_field(state.key(), window_index, &random_array()?),
        session_id: random_array()?,
        session_ticket: &session_ticket,
        grease: Grease::from_random(random_array()?),
    };

    let hello = build_client_hello(&params);
    Ok(add_record_layer(&hello, ContentType::Handshake, ProtocolVersion::TLS10))
}

/// Composes our ChangeCipherSpec and Finished records.
pub fn compose_reply() -> io::Result<Vec<u8>> {
    let finished = random_array::<FINISHED_LEN>()?;

    let mut reply = add_record_layer(&[0x01], ContentType::ChangeCipherSpec, ProtocolVersion::TLS12);
    add_record_layer_into(&mut reply, &finished, ContentType::Handshake, ProtocolVersion::TLS12);
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use crate::{
        tls::{
            client_hello::{parse::parse_client_hello, CLIENT_HELLO_BODY_LEN},
            record::{peel_record_layer, RecordHeader, RECORD_HEADER_LEN},
            token::{verify::random_field_is_valid, RANDOM_FIELD_LEN, SESSION_TICKET_LEN},
        },
        utils::test_utils::test_state,
    };

    use super::*;

    const SESSION_TICKET: u16 = 0x0023;

    #[test]
    fn test_client_hello_record() {
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let state = test_state("K", 60, now);
        let greeting = compose_client_hello(&state).unwrap();

        let header = RecordHeader::parse(greeting.first_chunk().unwrap());
        assert_eq!(header.content_type, 0x16);
        assert_eq!(header.version, 0x0301);
        assert_eq!(header.length as usize, greeting.len() - RECORD_HEADER_LEN);

        let hello = peel_record_layer(&greeting).unwrap();
        let parsed = parse_client_hello(&hello);
        assert_eq!(parsed.body_len, CLIENT_HELLO_BODY_LEN);
        assert_eq!(parsed.extension(0x0000).unwrap(), b"\x00\x0e\x00\x00\x0bexample.com");
    }

    #[test]
    fn test_token_freshness() {
        let window = Duration::from_secs(60);
        let then = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let state = test_state("K", 60, then);

        let hello = peel_record_layer(&compose_client_hello(&state).unwrap()).unwrap();
        let parsed = parse_client_hello(&hello);
        let random: [u8; RANDOM_FIELD_LEN] = parsed.random.try_into().unwrap();

        assert!(random_field_is_valid(state.key(), &random, then, window));
        assert!(random_field_is_valid(state.key(), &random, then + Duration::from_secs(20), window));
        assert!(!random_field_is_valid(state.key(), &random, then + 2 * window, window));
    }

    #[test]
    fn test_ticket_follows_window() {
        let then = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let ticket_at = |state: &State| -> [u8; SESSION_TICKET_LEN] {
            let hello = peel_record_layer(&compose_client_hello(state).unwrap()).unwrap();
            parse_client_hello(&hello).extension(SESSION_TICKET).unwrap().try_into().unwrap()
        };

        let state = test_state("K", 60, then);
        let first = ticket_at(&state);
        assert_eq!(first, ticket_at(&state));

        let later = test_state("K", 60, then + Duration::from_secs(600));
        assert_ne!(first, ticket_at(&later));
    }

    #[test]
    fn test_greetings_differ() {
        let state = test_state("K", 60, UNIX_EPOCH + Duration::from_secs(1_700_000_000));
        let a = compose_client_hello(&state).unwrap();
        let b = compose_client_hello(&state).unwrap();
        assert_eq!(a.len(), b.len());
        assert_ne!(a, b);
    }

    #[test]
    fn test_reply_layout() {
        let reply = compose_reply().unwrap();
        assert_eq!(reply.len(), RECORD_HEADER_LEN + 1 + RECORD_HEADER_LEN + FINISHED_LEN);
        assert_eq!(&reply[..6], b"\x14\x03\x03\x00\x01\x01");
        assert_eq!(&reply[6..11], b"\x16\x03\x03\x00\x28");
    }
}
