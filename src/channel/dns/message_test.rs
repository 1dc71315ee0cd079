use super::message::*;
use crate::error::Error;

#[test]
fn test_name_pack_round_trip() {
    let name = Name::new("deadbeef.example.com.").unwrap();
    let raw = name.pack(vec![]).unwrap();

    let (parsed, off) = Name::unpack(&raw, 0).unwrap();
    assert_eq!(parsed, name);
    assert_eq!(off, raw.len());
}

#[test]
fn test_name_pack_rejects_non_canonical() {
    let name = Name::new("example.com").unwrap();
    assert_eq!(name.pack(vec![]), Err(Error::ErrNonCanonicalName));
}

#[test]
fn test_name_pack_rejects_empty_segment() {
    let name = Name::new("foo..com.").unwrap();
    assert_eq!(name.pack(vec![]), Err(Error::ErrZeroSegLen));
}

#[test]
fn test_name_pack_rejects_long_segment() {
    let label = "a".repeat(64);
    let name = Name::new(&format!("{label}.com.")).unwrap();
    assert_eq!(name.pack(vec![]), Err(Error::ErrSegTooLong));
}

#[test]
fn test_name_unpack_follows_pointers() {
    // "www.example.com." with the suffix compressed behind a pointer.
    let mut raw = Name::new("example.com.").unwrap().pack(vec![]).unwrap();
    let suffix_off = 0usize;
    let www_off = raw.len();
    raw.push(3);
    raw.extend_from_slice(b"www");
    raw.push(0xc0 | (suffix_off >> 8) as u8);
    raw.push(suffix_off as u8);

    let (parsed, off) = Name::unpack(&raw, www_off).unwrap();
    assert_eq!(parsed.data, "www.example.com.");
    assert_eq!(off, raw.len());
}

#[test]
fn test_name_unpack_rejects_forward_pointer() {
    let raw = vec![0xc0, 0x10];
    assert_eq!(Name::unpack(&raw, 0), Err(Error::ErrInvalidPtr));
}

#[test]
fn test_name_unpack_rejects_truncated_label() {
    let raw = vec![5, b'a', b'b'];
    assert_eq!(Name::unpack(&raw, 0), Err(Error::ErrCalcLen));
}

#[test]
fn test_query_pack_unpack_round_trip() {
    let query = Message::query(0x1234, "00aabb.example.com").unwrap();
    assert!(query.recursion_desired);
    assert!(!query.response);

    let raw = query.pack().unwrap();
    let parsed = Message::unpack(&raw).unwrap();
    assert_eq!(parsed, query);

    assert_eq!(parsed.questions.len(), 1);
    let question = &parsed.questions[0];
    assert_eq!(question.name.data, "00aabb.example.com.");
    assert_eq!(question.typ, TYPE_A);
    assert_eq!(question.class, CLASS_INET);
}

#[test]
fn test_reply_mirrors_question() {
    let query = Message::query(7, "chunk.zone.tld").unwrap();
    let reply = query.reply();

    assert!(reply.response);
    assert_eq!(reply.id, query.id);
    assert_eq!(reply.questions, query.questions);

    // The reply itself survives the wire.
    let parsed = Message::unpack(&reply.pack().unwrap()).unwrap();
    assert_eq!(parsed, reply);
}

#[test]
fn test_unpack_rejects_truncated_header() {
    assert_eq!(Message::unpack(&[0x00, 0x01, 0x02]), Err(Error::ErrBaseLen));
}
