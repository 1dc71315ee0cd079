use std::collections::HashSet;

use clap::App;

use super::*;

fn matches_for(argv: &[&str]) -> ArgMatches {
    let mut args = vec!["sg1"];
    args.extend_from_slice(argv);
    register_all(App::new("sg1")).get_matches_from(args)
}

#[test]
fn test_registry_names_are_unique() {
    let mut seen = HashSet::new();
    for channel in registry() {
        assert!(!channel.name().is_empty());
        assert!(!channel.description().is_empty());
        assert!(seen.insert(channel.name()), "duplicate channel {}", channel.name());
    }
}

#[test]
fn test_factory_rejects_empty_name() {
    let matches = matches_for(&[]);
    assert!(matches!(
        factory("", Direction::Input, &matches),
        Err(Error::ErrChannelNameEmpty)
    ));
}

#[test]
fn test_factory_rejects_unknown_channel() {
    let matches = matches_for(&[]);
    assert!(matches!(
        factory("smoke-signals:hill", Direction::Input, &matches),
        Err(Error::ErrChannelNotRegistered(name)) if name == "smoke-signals"
    ));
}

#[test]
fn test_factory_console_aliases() {
    let matches = matches_for(&[]);
    for uri in ["console", "stdin", "stdout"] {
        let channel = factory(uri, Direction::Input, &matches).unwrap();
        assert_eq!(channel.name(), "console");
    }
}

#[test]
fn test_factory_builds_stream_channels_in_both_directions() {
    let matches = matches_for(&[]);
    for direction in [Direction::Input, Direction::Output] {
        let channel = factory("tcp:127.0.0.1:8080", direction, &matches).unwrap();
        assert_eq!(channel.name(), "tcp");
        assert!(channel.has_reader());
        assert!(channel.has_writer());
    }
}

#[test]
fn test_factory_datagram_channels_split_roles() {
    let matches = matches_for(&[]);

    let input = factory("udp:127.0.0.1:10013", Direction::Input, &matches).unwrap();
    assert!(input.has_reader());
    assert!(!input.has_writer());

    let output = factory("udp:127.0.0.1:10013", Direction::Output, &matches).unwrap();
    assert!(!output.has_reader());
    assert!(output.has_writer());
}

#[test]
fn test_factory_icmp_default_address() {
    let matches = matches_for(&[]);
    let channel = factory("icmp", Direction::Output, &matches).unwrap();
    assert_eq!(channel.name(), "icmp");
    assert!(channel.has_writer());
}

#[test]
fn test_factory_propagates_setup_errors() {
    let matches = matches_for(&[]);
    assert!(factory("tcp:", Direction::Input, &matches).is_err());
    assert!(factory("udp:", Direction::Output, &matches).is_err());
    assert!(factory("icmp:not-an-ip", Direction::Output, &matches).is_err());
    assert!(factory("pastebin:bogus", Direction::Input, &matches).is_err());
    // A dns writer must be told the zone to query under.
    assert!(matches!(
        factory("dns:127.0.0.1:53", Direction::Output, &matches),
        Err(Error::ErrDnsArgs)
    ));
}

#[test]
fn test_stats_counter_snapshot() {
    let counter = StatsCounter::default();
    counter.add_read(5);
    counter.add_read(7);
    counter.add_wrote(3);

    let stats = counter.snapshot();
    assert_eq!(stats.total_read, 12);
    assert_eq!(stats.total_wrote, 3);
}
