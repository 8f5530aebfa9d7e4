//! Builds ClientHello messages that look like the ones sent by real browsers.
//!
//! Nothing here is cryptographically meaningful except for the random field and the session
//! ticket, which carry the authentication token (see [`super::token`]). Everything else exists
//! to match a browser's fingerprint: cipher suite order, extension order, GREASE values and the
//! padding that brings the message to a fixed size.

use super::{
    token::{RANDOM_FIELD_LEN, SESSION_TICKET_LEN},
    Browser,
};

/// The handshake message type of a ClientHello.
pub const HANDSHAKE_TYPE_CLIENT_HELLO: u8 = 0x01;

/// The length of the ClientHello body (after the type and length) the padding extension aims for.
pub const CLIENT_HELLO_BODY_LEN: usize = 508;

/// The longest host name the server_name extension may carry.
pub const MAX_SERVER_NAME_LEN: usize = 255;

/// The length of the session id we send.
pub const SESSION_ID_LEN: usize = 32;

const TLS12: u16 = 0x0303;

mod extension_type {
    pub const SERVER_NAME: u16 = 0x0000;
    pub const STATUS_REQUEST: u16 = 0x0005;
    pub const SUPPORTED_GROUPS: u16 = 0x000a;
    pub const EC_POINT_FORMATS: u16 = 0x000b;
    pub const SIGNATURE_ALGORITHMS: u16 = 0x000d;
    pub const ALPN: u16 = 0x0010;
    pub const SIGNED_CERTIFICATE_TIMESTAMP: u16 = 0x0012;
    pub const PADDING: u16 = 0x0015;
    pub const EXTENDED_MASTER_SECRET: u16 = 0x0017;
    pub const SESSION_TICKET: u16 = 0x0023;
    pub const CHANNEL_ID: u16 = 0x7550;
    pub const RENEGOTIATION_INFO: u16 = 0xff01;
}

const CHROME_CIPHER_SUITES: [u16; 13] = [
    0xc02b, 0xc02f, 0xc02c, 0xc030, 0xcca9, 0xcca8, 0xc013, 0xc014, 0x009c, 0x009d, 0x002f, 0x0035, 0x000a,
];

const CHROME_SIGNATURE_ALGORITHMS: [u16; 9] = [0x0403, 0x0804, 0x0401, 0x0503, 0x0805, 0x0501, 0x0806, 0x0601, 0x0201];

const CHROME_GROUPS: [u16; 3] = [0x001d, 0x0017, 0x0018];

const FIREFOX_CIPHER_SUITES: [u16; 15] = [
    0xc02b, 0xc02f, 0xcca9, 0xcca8, 0xc02c, 0xc030, 0xc00a, 0xc009, 0xc013, 0xc014, 0x0033, 0x0039, 0x002f, 0x0035, 0x000a,
];

const FIREFOX_SIGNATURE_ALGORITHMS: [u16; 11] = [
    0x0403, 0x0503, 0x0603, 0x0804, 0x0805, 0x0806, 0x0401, 0x0501, 0x0601, 0x0203, 0x0201,
];

const FIREFOX_GROUPS: [u16; 4] = [0x001d, 0x0017, 0x0018, 0x0019];

const ALPN_PROTOCOLS: [&[u8]; 2] = [b"h2", b"http/1.1"];

/// GREASE values (RFC 8701) Chrome scatters through its ClientHello.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grease {
    pub cipher_suite: u16,
    pub group: u16,
    pub first_extension: u16,
    pub last_extension: u16,
}

impl Grease {
    fn value_from(byte: u8) -> u16 {
        let half = (byte & 0xf0) | 0x0a;
        u16::from_be_bytes([half, half])
    }

    pub fn from_random(bytes: [u8; 4]) -> Self {
        let first_extension = Self::value_from(bytes[2]);
        let mut last_extension = Self::value_from(bytes[3]);

        // The two GREASE extensions must not share a type, or the extension list has a duplicate.
        if last_extension == first_extension {
            last_extension ^= 0x1010;
        }

        Self {
            cipher_suite: Self::value_from(bytes[0]),
            group: Self::value_from(bytes[1]),
            first_extension,
            last_extension,
        }
    }
}

/// Everything that varies between two ClientHellos.
pub struct HelloParams<'a> {
    pub browser: Browser,
    pub server_name: &'a str,
    pub random: [u8; RANDOM_FIELD_LEN],
    pub session_id: [u8; SESSION_ID_LEN],
    pub session_ticket: &'a [u8; SESSION_TICKET_LEN],
    pub grease: Grease,
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u16_list(out: &mut Vec<u8>, values: &[u16]) {
    for value in values {
        put_u16(out, *value);
    }
}

fn put_u8_prefixed<F: FnOnce(&mut Vec<u8>)>(out: &mut Vec<u8>, f: F) {
    let start = out.len();
    out.push(0);
    f(out);
    out[start] = (out.len() - start - 1) as u8;
}

fn put_u16_prefixed<F: FnOnce(&mut Vec<u8>)>(out: &mut Vec<u8>, f: F) {
    let start = out.len();
    out.extend_from_slice(&[0, 0]);
    f(out);
    let len = (out.len() - start - 2) as u16;
    out[start..(start + 2)].copy_from_slice(&len.to_be_bytes());
}

fn put_extension<F: FnOnce(&mut Vec<u8>)>(out: &mut Vec<u8>, extension_type: u16, f: F) {
    put_u16(out, extension_type);
    put_u16_prefixed(out, f);
}

fn put_server_name(out: &mut Vec<u8>, server_name: &str) {
    if server_name.is_empty() {
        return;
    }

    put_extension(out, extension_type::SERVER_NAME, |out| {
        put_u16_prefixed(out, |out| {
            out.push(0); // host_name
            put_u16_prefixed(out, |out| out.extend_from_slice(server_name.as_bytes()));
        });
    });
}

fn put_alpn(out: &mut Vec<u8>) {
    put_extension(out, extension_type::ALPN, |out| {
        put_u16_prefixed(out, |out| {
            for protocol in ALPN_PROTOCOLS {
                put_u8_prefixed(out, |out| out.extend_from_slice(protocol));
            }
        });
    });
}

fn put_status_request(out: &mut Vec<u8>) {
    // OCSP, no responder ids, no request extensions.
    put_extension(out, extension_type::STATUS_REQUEST, |out| out.extend_from_slice(&[0x01, 0x00, 0x00, 0x00, 0x00]));
}

fn put_groups_and_signatures(out: &mut Vec<u8>, groups: &[u16], signature_algorithms: &[u16]) {
    put_extension(out, extension_type::SUPPORTED_GROUPS, |out| put_u16_prefixed(out, |out| put_u16_list(out, groups)));
    put_extension(out, extension_type::SIGNATURE_ALGORITHMS, |out| {
        put_u16_prefixed(out, |out| put_u16_list(out, signature_algorithms))
    });
}

fn chrome_extensions(out: &mut Vec<u8>, params: &HelloParams) {
    let grease = &params.grease;

    put_extension(out, grease.first_extension, |_| {});
    put_extension(out, extension_type::RENEGOTIATION_INFO, |out| out.push(0));
    put_server_name(out, params.server_name);
    put_extension(out, extension_type::EXTENDED_MASTER_SECRET, |_| {});
    put_extension(out, extension_type::SESSION_TICKET, |out| out.extend_from_slice(params.session_ticket));
    put_extension(out, extension_type::SIGNATURE_ALGORITHMS, |out| {
        put_u16_prefixed(out, |out| put_u16_list(out, &CHROME_SIGNATURE_ALGORITHMS))
    });
    put_status_request(out);
    put_extension(out, extension_type::SIGNED_CERTIFICATE_TIMESTAMP, |_| {});
    put_alpn(out);
    put_extension(out, extension_type::CHANNEL_ID, |_| {});
    put_extension(out, extension_type::EC_POINT_FORMATS, |out| put_u8_prefixed(out, |out| out.push(0)));
    put_extension(out, extension_type::SUPPORTED_GROUPS, |out| {
        put_u16_prefixed(out, |out| {
            put_u16(out, grease.group);
            put_u16_list(out, &CHROME_GROUPS);
        })
    });
    put_extension(out, grease.last_extension, |out| out.push(0));
}

fn firefox_extensions(out: &mut Vec<u8>, params: &HelloParams) {
    put_server_name(out, params.server_name);
    put_extension(out, extension_type::EXTENDED_MASTER_SECRET, |_| {});
    put_extension(out, extension_type::RENEGOTIATION_INFO, |out| out.push(0));
    put_extension(out, extension_type::EC_POINT_FORMATS, |out| put_u8_prefixed(out, |out| out.push(0)));
    put_extension(out, extension_type::SESSION_TICKET, |out| out.extend_from_slice(params.session_ticket));
    put_alpn(out);
    put_status_request(out);
    put_groups_and_signatures(out, &FIREFOX_GROUPS, &FIREFOX_SIGNATURE_ALGORITHMS);
}

/// Builds a ClientHello handshake message (without the record header).
///
/// The server name must be at most [`MAX_SERVER_NAME_LEN`] bytes long, or the length prefixes
/// won't fit.
pub fn build_client_hello(params: &HelloParams) -> Vec<u8> {
    let mut body = Vec::with_capacity(CLIENT_HELLO_BODY_LEN);
    put_u16(&mut body, TLS12);
    body.extend_from_slice(&params.random);
    put_u8_prefixed(&mut body, |out| out.extend_from_slice(&params.session_id));

    put_u16_prefixed(&mut body, |out| match params.browser {
        Browser::Chrome => {
            put_u16(out, params.grease.cipher_suite);
            put_u16_list(out, &CHROME_CIPHER_SUITES);
        }
        Browser::Firefox => put_u16_list(out, &FIREFOX_CIPHER_SUITES),
    });

    // Only the null compression method.
    body.extend_from_slice(&[0x01, 0x00]);

    let mut extensions = Vec::with_capacity(CLIENT_HELLO_BODY_LEN);
    match params.browser {
        Browser::Chrome => chrome_extensions(&mut extensions, params),
        Browser::Firefox => firefox_extensions(&mut extensions, params),
    }

    // The padding extension's own header takes 4 bytes. Long server names may leave no room.
    let unpadded_len = body.len() + 2 + extensions.len();
    if let Some(padding_len) = CLIENT_HELLO_BODY_LEN.checked_sub(unpadded_len + 4) {
        put_extension(&mut extensions, extension_type::PADDING, |out| out.resize(out.len() + padding_len, 0));
    }

    put_u16_prefixed(&mut body, |out| out.extend_from_slice(&extensions));

    let mut hello = Vec::with_capacity(4 + body.len());
    hello.push(HANDSHAKE_TYPE_CLIENT_HELLO);
    hello.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
    hello.extend_from_slice(&body);
    hello
}

#[cfg(test)]
pub mod parse {
    //! A minimal ClientHello reader, enough to check what we build.

    pub struct ParsedHello<'a> {
        pub body_len: usize,
        pub random: &'a [u8],
        pub session_id: &'a [u8],
        pub cipher_suites: Vec<u16>,
        pub extensions: Vec<(u16, &'a [u8])>,
    }

    impl<'a> ParsedHello<'a> {
        pub fn extension(&self, extension_type: u16) -> Option<&'a [u8]> {
            self.extensions.iter().find(|(t, _)| *t == extension_type).map(|(_, data)| *data)
        }
    }

    fn take<'a>(bytes: &mut &'a [u8], len: usize) -> &'a [u8] {
        let (head, tail) = bytes.split_at(len);
        *bytes = tail;
        head
    }

    fn take_u16(bytes: &mut &[u8]) -> u16 {
        let b = take(bytes, 2);
        u16::from_be_bytes([b[0], b[1]])
    }

    /// Parses a ClientHello handshake message. Panics on malformed input.
    pub fn parse_client_hello(hello: &[u8]) -> ParsedHello<'_> {
        assert_eq!(hello[0], super::HANDSHAKE_TYPE_CLIENT_HELLO);
        let body_len = u32::from_be_bytes([0, hello[1], hello[2], hello[3]]) as usize;
        let mut body = &hello[4..];
        assert_eq!(body.len(), body_len);

        assert_eq!(take_u16(&mut body), 0x0303);
        let random = take(&mut body, 32);
        let session_id_len = take(&mut body, 1)[0] as usize;
        let session_id = take(&mut body, session_id_len);

        let cipher_suites_len = take_u16(&mut body) as usize;
        let mut cipher_bytes = take(&mut body, cipher_suites_len);
        let mut cipher_suites = Vec::new();
        while !cipher_bytes.is_empty() {
            cipher_suites.push(take_u16(&mut cipher_bytes));
        }

        assert_eq!(take(&mut body, 2), &[0x01u8, 0x00]);

        let extensions_len = take_u16(&mut body) as usize;
        assert_eq!(body.len(), extensions_len);
        let mut extensions = Vec::new();
        while !body.is_empty() {
            let extension_type = take_u16(&mut body);
            let len = take_u16(&mut body) as usize;
            extensions.push((extension_type, take(&mut body, len)));
        }

        ParsedHello {
            body_len,
            random,
            session_id,
            cipher_suites,
            extensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{extension_type::*, parse::parse_client_hello, *};

    fn params<'a>(browser: Browser, server_name: &'a str, ticket: &'a [u8; SESSION_TICKET_LEN]) -> HelloParams<'a> {
        HelloParams {
            browser,
            server_name,
            random: [0x11; RANDOM_FIELD_LEN],
            session_id: [0x22; SESSION_ID_LEN],
            session_ticket: ticket,
            grease: Grease::from_random([0x00, 0x10, 0x20, 0x20]),
        }
    }

    fn is_grease(value: u16) -> bool {
        value & 0x0f0f == 0x0a0a && (value >> 8) == (value & 0xff)
    }

    #[test]
    fn test_grease_values() {
        let grease = Grease::from_random([0x00, 0xff, 0x37, 0x3c]);
        assert_eq!(grease.cipher_suite, 0x0a0a);
        assert_eq!(grease.group, 0xfafa);
        assert_eq!(grease.first_extension, 0x3a3a);
        assert_ne!(grease.first_extension, grease.last_extension);
        assert!(is_grease(grease.last_extension));
    }

    #[test]
    fn test_chrome_hello() {
        let ticket = [0x33; SESSION_TICKET_LEN];
        let hello = build_client_hello(&params(Browser::Chrome, "www.bing.com", &ticket));
        let parsed = parse_client_hello(&hello);

        assert_eq!(parsed.body_len, CLIENT_HELLO_BODY_LEN);
        assert_eq!(parsed.random, &[0x11u8; RANDOM_FIELD_LEN]);
        assert_eq!(parsed.session_id, &[0x22u8; SESSION_ID_LEN]);
        assert!(is_grease(parsed.cipher_suites[0]));
        assert_eq!(&parsed.cipher_suites[1..], &CHROME_CIPHER_SUITES);

        assert!(is_grease(parsed.extensions[0].0));
        assert_eq!(parsed.extension(SESSION_TICKET), Some(&ticket[..]));
        assert_eq!(parsed.extension(SERVER_NAME).unwrap(), b"\x00\x0f\x00\x00\x0cwww.bing.com");
        assert_eq!(parsed.extensions.last().unwrap().0, PADDING);
        assert!(parsed.extension(PADDING).unwrap().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_firefox_hello() {
        let ticket = [0x44; SESSION_TICKET_LEN];
        let hello = build_client_hello(&params(Browser::Firefox, "example.org", &ticket));
        let parsed = parse_client_hello(&hello);

        assert_eq!(parsed.body_len, CLIENT_HELLO_BODY_LEN);
        assert_eq!(parsed.cipher_suites, FIREFOX_CIPHER_SUITES);
        assert!(parsed.extensions.iter().all(|(t, _)| !is_grease(*t)));
        assert_eq!(parsed.extensions[0].0, SERVER_NAME);
        assert_eq!(parsed.extension(SESSION_TICKET), Some(&ticket[..]));
        assert!(parsed.extension(CHANNEL_ID).is_none());
    }

    #[test]
    fn test_no_server_name() {
        let ticket = [0u8; SESSION_TICKET_LEN];
        let hello = build_client_hello(&params(Browser::Chrome, "", &ticket));
        let parsed = parse_client_hello(&hello);

        assert!(parsed.extension(SERVER_NAME).is_none());
        assert_eq!(parsed.body_len, CLIENT_HELLO_BODY_LEN);
    }

    #[test]
    fn test_long_server_name_skips_padding() {
        let ticket = [0u8; SESSION_TICKET_LEN];
        let server_name = "a".repeat(200);
        let hello = build_client_hello(&params(Browser::Firefox, &server_name, &ticket));
        let parsed = parse_client_hello(&hello);

        assert!(parsed.extension(PADDING).is_none());
        assert!(parsed.body_len > CLIENT_HELLO_BODY_LEN);
    }
}
