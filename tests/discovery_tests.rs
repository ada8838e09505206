use std::net::{IpAddr, SocketAddr};

use naval_p2p::transport::in_memory::InMemoryNetwork;
use naval_p2p::{Cell, Discovery, DiscoveryEvent, Message, Registry, DEFAULT_BROADCAST};

const PORT: u16 = 5000;

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn sock(s: &str) -> SocketAddr {
    SocketAddr::new(ip(s), PORT)
}

fn peer(net: &InMemoryNetwork, addr: &str) -> (Discovery, Registry) {
    let endpoint = net.datagram_endpoint(sock(addr));
    (
        Discovery::new(Box::new(endpoint), ip(addr), PORT, DEFAULT_BROADCAST),
        Registry::new(ip(addr)),
    )
}

/// Poll until the endpoint's queue is empty, collecting events.
fn drain(discovery: &mut Discovery, registry: &mut Registry, net: &InMemoryNetwork) -> Vec<DiscoveryEvent> {
    let mut events = Vec::new();
    while net.pending_datagrams(SocketAddr::new(discovery.local_ip(), PORT)) > 0 {
        events.extend(discovery.poll(registry));
    }
    events
}

#[test]
fn join_exchange_populates_both_registries() {
    let net = InMemoryNetwork::new();
    let (mut a, mut reg_a) = peer(&net, "10.0.0.1");
    let (mut b, mut reg_b) = peer(&net, "10.0.0.2");

    assert!(a.announce_join());
    // A hears its own broadcast echo and drops it.
    assert!(drain(&mut a, &mut reg_a, &net).is_empty());

    let events = drain(&mut b, &mut reg_b, &net);
    assert_eq!(
        events,
        vec![DiscoveryEvent::Joined {
            peer: ip("10.0.0.1"),
            changed: true
        }]
    );
    assert!(reg_b.is_active(ip("10.0.0.1")));

    let events = drain(&mut a, &mut reg_a, &net);
    assert_eq!(
        events,
        vec![DiscoveryEvent::Synced {
            from: ip("10.0.0.2"),
            changed: true
        }]
    );
    let active: Vec<IpAddr> = reg_a.list_active().iter().map(|p| p.address).collect();
    assert_eq!(active, vec![ip("10.0.0.1"), ip("10.0.0.2")]);
}

#[test]
fn participants_reply_lists_every_known_address() {
    let net = InMemoryNetwork::new();
    let (mut b, mut reg_b) = peer(&net, "10.0.0.2");
    reg_b.upsert_active(ip("10.0.0.3"));
    reg_b.upsert_active(ip("10.0.0.4"));
    reg_b.mark_inactive(ip("10.0.0.4"));
    let a_addr = sock("10.0.0.1");
    let _a = net.datagram_endpoint(a_addr);

    net.inject_datagram(a_addr, sock("10.0.0.2"), b"Conectando");
    b.poll(&mut reg_b);

    let replies = net.drain_datagrams(a_addr);
    assert_eq!(replies.len(), 1);
    let text = String::from_utf8(replies[0].payload.clone()).unwrap();
    assert_eq!(
        Message::decode(&text).unwrap(),
        Message::Participants(vec![ip("10.0.0.1"), ip("10.0.0.2"), ip("10.0.0.3"), ip("10.0.0.4")])
    );
}

#[test]
fn repeated_join_is_idempotent() {
    let net = InMemoryNetwork::new();
    let (mut b, mut reg_b) = peer(&net, "10.0.0.2");
    let a_addr = sock("10.0.0.1");
    net.inject_datagram(a_addr, sock("10.0.0.2"), b"Conectando");
    net.inject_datagram(a_addr, sock("10.0.0.2"), b"Conectando");

    let events = drain(&mut b, &mut reg_b, &net);
    assert_eq!(events.len(), 2);
    assert!(events[0].membership_changed());
    assert!(!events[1].membership_changed());
    assert_eq!(reg_b.count(), 2);
    assert!(reg_b.is_active(ip("10.0.0.1")));
}

#[test]
fn leave_from_unknown_address_changes_nothing() {
    let net = InMemoryNetwork::new();
    let (mut b, mut reg_b) = peer(&net, "10.0.0.2");
    net.inject_datagram(sock("10.0.0.9"), sock("10.0.0.2"), b"Saindo");

    let events = drain(&mut b, &mut reg_b, &net);
    assert_eq!(
        events,
        vec![DiscoveryEvent::Left {
            peer: ip("10.0.0.9"),
            changed: false
        }]
    );
    assert_eq!(reg_b.count(), 1);
}

#[test]
fn leave_deactivates_known_peer() {
    let net = InMemoryNetwork::new();
    let (mut b, mut reg_b) = peer(&net, "10.0.0.2");
    reg_b.upsert_active(ip("10.0.0.1"));
    net.inject_datagram(sock("10.0.0.1"), sock("10.0.0.2"), b"Saindo");
    drain(&mut b, &mut reg_b, &net);
    assert!(reg_b.contains(ip("10.0.0.1")));
    assert!(!reg_b.is_active(ip("10.0.0.1")));
}

#[test]
fn participant_list_skips_local_address() {
    let net = InMemoryNetwork::new();
    let (mut a, mut reg_a) = peer(&net, "10.0.0.1");
    reg_a.upsert_active(ip("10.0.0.7"));
    reg_a.mark_inactive(ip("10.0.0.7"));

    net.inject_datagram(
        sock("10.0.0.2"),
        sock("10.0.0.1"),
        b"participantes: ['10.0.0.1', '10.0.0.2', '10.0.0.7']",
    );
    drain(&mut a, &mut reg_a, &net);

    assert_eq!(reg_a.count(), 3);
    assert!(reg_a.is_active(ip("10.0.0.2")));
    assert!(reg_a.is_active(ip("10.0.0.7")));
}

#[test]
fn malformed_datagrams_mutate_nothing() {
    let net = InMemoryNetwork::new();
    let (mut a, mut reg_a) = peer(&net, "10.0.0.1");
    for payload in [
        &b"participantes: 10.0.0.5"[..],
        b"participantes: []",
        b"shot:x,y",
        b"shot:99,99",
        b"shot:10,3",
        b"\xff\xfe",
        b"",
    ] {
        net.inject_datagram(sock("10.0.0.5"), sock("10.0.0.1"), payload);
    }
    let events = drain(&mut a, &mut reg_a, &net);
    assert!(events.is_empty());
    assert_eq!(reg_a.count(), 1);
}

#[test]
fn shot_from_unknown_sender_registers_it() {
    let net = InMemoryNetwork::new();
    let (mut a, mut reg_a) = peer(&net, "10.0.0.1");
    net.inject_datagram(sock("10.0.0.3"), sock("10.0.0.1"), b"shot:3,4");
    let events = drain(&mut a, &mut reg_a, &net);
    assert_eq!(
        events,
        vec![DiscoveryEvent::Shot {
            from: ip("10.0.0.3"),
            cell: Cell::new(3, 4)
        }]
    );
    assert!(reg_a.is_active(ip("10.0.0.3")));
}

#[test]
fn lost_notice_is_reported() {
    let net = InMemoryNetwork::new();
    let (mut a, mut reg_a) = peer(&net, "10.0.0.1");
    reg_a.upsert_active(ip("10.0.0.2"));
    net.inject_datagram(sock("10.0.0.2"), sock("10.0.0.1"), b"lost");
    let events = drain(&mut a, &mut reg_a, &net);
    assert_eq!(events, vec![DiscoveryEvent::Lost(ip("10.0.0.2"))]);
}

#[test]
fn shots_and_lost_are_unicast() {
    let net = InMemoryNetwork::new();
    let (mut a, _) = peer(&net, "10.0.0.1");
    let b_addr = sock("10.0.0.2");
    let c_addr = sock("10.0.0.3");
    let _b = net.datagram_endpoint(b_addr);
    let _c = net.datagram_endpoint(c_addr);

    assert!(a.send_shot(ip("10.0.0.2"), Cell::new(1, 2)));
    assert!(a.send_lost(ip("10.0.0.2")));

    let got: Vec<Vec<u8>> = net.drain_datagrams(b_addr).into_iter().map(|d| d.payload).collect();
    assert_eq!(got, vec![b"shot:1,2".to_vec(), b"lost".to_vec()]);
    assert_eq!(net.pending_datagrams(c_addr), 0);
}

#[test]
fn leave_is_broadcast() {
    let net = InMemoryNetwork::new();
    let (mut a, _) = peer(&net, "10.0.0.1");
    let b_addr = sock("10.0.0.2");
    let _b = net.datagram_endpoint(b_addr);
    assert!(a.announce_leave());
    let got = net.drain_datagrams(b_addr);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].source, sock("10.0.0.1"));
    assert_eq!(got[0].payload, b"Saindo".to_vec());
}
