use clap::App;

use sg1::channel::{self, Direction};

fn matches() -> clap::ArgMatches {
    channel::register_all(App::new("sg1")).get_matches_from(vec!["sg1"])
}

#[tokio::test]
async fn test_tcp_loopback() {
    let matches = matches();

    let mut input = channel::factory("tcp:127.0.0.1:18870", Direction::Input, &matches).unwrap();
    input.start().await.unwrap();

    let mut output = channel::factory("tcp:127.0.0.1:18870", Direction::Output, &matches).unwrap();
    output.start().await.unwrap();

    let wrote = output.write(b"hello over tcp").await.unwrap();
    assert_eq!(wrote, 14);

    let mut buf = [0u8; 64];
    let n = input.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"hello over tcp");

    assert_eq!(output.stats().total_wrote, 14);
    assert_eq!(input.stats().total_read, 14);
}

#[tokio::test]
async fn test_tls_loopback_with_ephemeral_certificate() {
    let matches = matches();

    let mut input = channel::factory("tls:127.0.0.1:18871", Direction::Input, &matches).unwrap();
    input.start().await.unwrap();

    let mut output = channel::factory("tls:127.0.0.1:18871", Direction::Output, &matches).unwrap();
    output.start().await.unwrap();

    output.write(b"over the wire, encrypted").await.unwrap();

    let mut buf = [0u8; 64];
    let n = input.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"over the wire, encrypted");
}

#[tokio::test]
async fn test_udp_loopback_reassembles_chunked_write() {
    let matches = matches();

    let mut input = channel::factory("udp:127.0.0.1:18872", Direction::Input, &matches).unwrap();
    input.start().await.unwrap();

    let mut output = channel::factory("udp:127.0.0.1:18872", Direction::Output, &matches).unwrap();
    output.start().await.unwrap();

    // Three chunks: 128 + 128 + 44.
    let payload: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
    let wrote = output.write(&payload).await.unwrap();
    assert_eq!(wrote, 300);

    let mut reassembled = Vec::new();
    let mut buf = [0u8; 512];
    while reassembled.len() < payload.len() {
        let n = input.read(&mut buf).await.unwrap();
        reassembled.extend_from_slice(&buf[..n]);
    }
    assert_eq!(reassembled, payload);

    assert_eq!(output.stats().total_wrote, 300);
    assert_eq!(input.stats().total_read, 300);
}

#[tokio::test]
async fn test_udp_empty_write_emits_nothing() {
    let matches = matches();

    let mut output = channel::factory("udp:127.0.0.1:18873", Direction::Output, &matches).unwrap();
    output.start().await.unwrap();

    assert_eq!(output.write(b"").await.unwrap(), 0);
    assert_eq!(output.stats().total_wrote, 0);
}
