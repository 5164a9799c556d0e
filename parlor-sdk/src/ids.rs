//! Key and handshake identifier formatting.
//!
//! A chat's RSA key pair is identified as `c_<chat_uuid>`. A handshake
//! distributing that key pair is identified as `<key_id>+<tag>`, where
//! `tag` is the smallest unused positive integer for that key-id — callers
//! that own a handshake registry compute it there and pass it to
//! [`handshake_id`].

use uuid::Uuid;

const KEY_ID_PREFIX: &str = "c_";

pub fn key_id_for_chat(chat_uuid: Uuid) -> String {
    format!("{KEY_ID_PREFIX}{chat_uuid}")
}

/// Format a handshake id from a chat uuid and an already-allocated tag.
pub fn handshake_id(chat_uuid: Uuid, tag: u32) -> String {
    format!("{}+{tag:04}", key_id_for_chat(chat_uuid))
}

/// Recover the chat uuid a handshake id refers to.
///
/// Deliberately splits on `+` and strips the `c_` prefix rather than
/// slicing the first two characters off the whole id — a handshake id
/// embeds a full key id, and slicing the id itself instead of its key-id
/// half only happens to work because `"c_"` and `key_id_for_chat`'s
/// prefix are both two characters long.
pub fn chat_uuid_from_handshake_id(handshake_id: &str) -> Option<Uuid> {
    let (key_id, _tag) = handshake_id.split_once('+')?;
    let raw = key_id.strip_prefix(KEY_ID_PREFIX)?;
    Uuid::parse_str(raw).ok()
}

/// Smallest positive integer not present in `used`.
pub fn smallest_unused_tag(used: &[u32]) -> u32 {
    let mut tag = 1;
    while used.contains(&tag) {
        tag += 1;
    }
    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_id_round_trips_to_chat_uuid() {
        let chat_uuid = Uuid::new_v4();
        let id = handshake_id(chat_uuid, 1);
        assert_eq!(chat_uuid_from_handshake_id(&id), Some(chat_uuid));
    }

    #[test]
    fn key_id_has_expected_prefix() {
        let chat_uuid = Uuid::new_v4();
        let key_id = key_id_for_chat(chat_uuid);
        assert_eq!(key_id, format!("c_{chat_uuid}"));
    }

    #[test]
    fn malformed_handshake_id_is_rejected() {
        assert_eq!(chat_uuid_from_handshake_id("not-a-handshake-id"), None);
        assert_eq!(chat_uuid_from_handshake_id("x_123+0001"), None);
    }

    #[test]
    fn smallest_unused_tag_fills_gaps() {
        assert_eq!(smallest_unused_tag(&[]), 1);
        assert_eq!(smallest_unused_tag(&[1, 2, 4]), 3);
        assert_eq!(smallest_unused_tag(&[1, 2, 3]), 4);
    }
}
