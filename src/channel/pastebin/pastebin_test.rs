use clap::App;

use super::api::parse_xml_pastes;
use super::*;

fn matches_for(argv: &[&str]) -> clap::ArgMatches {
    let mut args = vec!["sg1"];
    args.extend_from_slice(argv);
    PastebinChannel::new()
        .register(App::new("sg1"))
        .get_matches_from(args)
}

const DEV_KEY: &str = "0123456789abcdef0123456789abcdef";
const USER_KEY: &str = "fedcba9876543210fedcba9876543210";

#[test]
fn test_setup_keys_and_default_stream() {
    let matches = matches_for(&[]);
    let mut channel = PastebinChannel::new();
    channel
        .setup(
            Direction::Output,
            &format!("{DEV_KEY}/{USER_KEY}"),
            &matches,
        )
        .unwrap();

    assert!(channel.api.is_some());
    assert_eq!(channel.stream, DEFAULT_STREAM_NAME);
    assert!(!channel.preserve);
    assert_eq!(channel.poll_time, DEFAULT_POLL_TIME_MS);
}

#[test]
fn test_setup_stream_tag() {
    let matches = matches_for(&[]);
    let mut channel = PastebinChannel::new();
    channel
        .setup(
            Direction::Input,
            &format!("{DEV_KEY}/{USER_KEY}#covert"),
            &matches,
        )
        .unwrap();

    assert_eq!(channel.stream, "covert");
}

#[test]
fn test_setup_options() {
    let matches = matches_for(&["--pastebin-preserve", "--pastebin-poll-time", "250"]);
    let mut channel = PastebinChannel::new();
    channel
        .setup(
            Direction::Input,
            &format!("{DEV_KEY}/{USER_KEY}"),
            &matches,
        )
        .unwrap();

    assert!(channel.preserve);
    assert_eq!(channel.poll_time, 250);
}

#[test]
fn test_setup_rejects_malformed_args() {
    let matches = matches_for(&[]);

    let wrong_separator = format!("{DEV_KEY}:{USER_KEY}");
    for args in ["", "tooshort/keys", wrong_separator.as_str()] {
        let mut channel = PastebinChannel::new();
        assert_eq!(
            channel.setup(Direction::Output, args, &matches),
            Err(Error::ErrPastebinArgs)
        );
    }
}

#[test]
fn test_parse_xml_pastes() {
    let body = r"
<paste>
	<paste_key>abcd1234</paste_key>
	<paste_title>SG1 X 0x100</paste_title>
</paste>
<paste>
	<paste_key>efgh5678</paste_key>
	<paste_title>SG1 X 0x200</paste_title>
</paste>
<paste>
	<paste_key>ignored0</paste_key>
	<paste_title>unrelated paste</paste_title>
</paste>
";

    let pastes = parse_xml_pastes(body);
    assert_eq!(pastes.len(), 3);
    assert_eq!(pastes[0].key, "abcd1234");
    assert_eq!(pastes[0].title, "SG1 X 0x100");
    assert_eq!(pastes[1].key, "efgh5678");
    assert_eq!(pastes[1].title, "SG1 X 0x200");
    // Foreign titles never match the title parser.
    assert_eq!(pastes[2].title, "");
}

#[test]
fn test_newest_first_ordering() {
    // The poller sorts descending by title and takes the head, so the
    // paste stamped 0x200 is processed before the one stamped 0x100.
    let mut pastes = vec![
        XmlPaste {
            key: "older".to_owned(),
            title: "SG1 X 0x100".to_owned(),
        },
        XmlPaste {
            key: "newer".to_owned(),
            title: "SG1 X 0x200".to_owned(),
        },
    ];

    pastes.sort_by(|a, b| b.title.cmp(&a.title));
    assert_eq!(pastes[0].key, "newer");
}

#[tokio::test]
async fn test_read_surfaces_offered_packet() {
    let channel = PastebinChannel::new();

    let raw = hex::decode("000000000000000100000004deadbeef").unwrap();
    let packet = Packet::decode(&raw).unwrap();
    channel.sequencer.offer(packet).await;

    let mut buf = [0u8; 16];
    let n = channel.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], &[0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(channel.stats().total_read, 0); // read path counts in the poller
}

#[test]
fn test_write_packet_body_is_hex_frame() {
    let channel = PastebinChannel::new();
    let packet = channel
        .sequencer
        .next_packet(Bytes::from_static(b"hello"), 5, 1);

    assert_eq!(packet.seq_number, 0);
    assert_eq!(packet.seq_total, 1);
    assert_eq!(packet.hex(), "00000000000000010000000568656c6c6f");
}
