use std::net::{IpAddr, SocketAddr};

use naval_p2p::transport::{AckChannel, DatagramTransport};
use naval_p2p::{AckMessage, InMemoryNetwork};

fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

#[test]
fn broadcast_reaches_every_endpoint_including_sender() {
    let net = InMemoryNetwork::new();
    let mut a = net.datagram_endpoint(addr("10.0.0.1:5000"));
    let mut b = net.datagram_endpoint(addr("10.0.0.2:5000"));
    let mut other_port = net.datagram_endpoint(addr("10.0.0.3:6000"));

    a.send_to(b"Conectando", addr("255.255.255.255:5000")).unwrap();

    let echoed = a.try_recv().unwrap().unwrap();
    assert_eq!(echoed.source, addr("10.0.0.1:5000"));
    let got = b.try_recv().unwrap().unwrap();
    assert_eq!(got.payload, b"Conectando".to_vec());
    assert!(other_port.try_recv().unwrap().is_none());
}

#[test]
fn unicast_reaches_only_target() {
    let net = InMemoryNetwork::new();
    let mut a = net.datagram_endpoint(addr("10.0.0.1:5000"));
    let mut b = net.datagram_endpoint(addr("10.0.0.2:5000"));

    a.send_to(b"shot:1,2", addr("10.0.0.2:5000")).unwrap();
    assert!(a.try_recv().unwrap().is_none());
    assert_eq!(b.try_recv().unwrap().unwrap().payload, b"shot:1,2".to_vec());
    assert!(b.try_recv().unwrap().is_none());
}

#[test]
fn unicast_to_unbound_address_is_lost() {
    let net = InMemoryNetwork::new();
    let mut a = net.datagram_endpoint(addr("10.0.0.1:5000"));
    assert!(a.send_to(b"Saindo", addr("10.0.0.9:5000")).is_ok());
    assert_eq!(net.pending_datagrams(addr("10.0.0.9:5000")), 0);
}

#[test]
fn injected_datagrams_queue_in_order() {
    let net = InMemoryNetwork::new();
    let _a = net.datagram_endpoint(addr("10.0.0.1:5000"));
    net.inject_datagram(addr("10.0.0.5:5000"), addr("10.0.0.1:5000"), b"one");
    net.inject_datagram(addr("10.0.0.5:5000"), addr("10.0.0.1:5000"), b"two");
    assert_eq!(net.pending_datagrams(addr("10.0.0.1:5000")), 2);
    let drained: Vec<Vec<u8>> = net
        .drain_datagrams(addr("10.0.0.1:5000"))
        .into_iter()
        .map(|d| d.payload)
        .collect();
    assert_eq!(drained, vec![b"one".to_vec(), b"two".to_vec()]);
}

#[test]
fn ack_goes_to_peer_port_on_target_host() {
    let net = InMemoryNetwork::new();
    let mut a = net.ack_endpoint(addr("10.0.0.1:5001"), 5001);
    let mut b = net.ack_endpoint(addr("10.0.0.2:5001"), 5001);

    a.send("10.0.0.2".parse().unwrap(), AckMessage::Hit).unwrap();
    let ack = b.try_recv().unwrap().unwrap();
    assert_eq!(ack.text, "hit");
    assert_eq!(ack.source.ip(), "10.0.0.1".parse::<IpAddr>().unwrap());
    assert!(a.try_recv().unwrap().is_none());
}

#[test]
fn ack_to_missing_listener_is_refused() {
    let net = InMemoryNetwork::new();
    let mut a = net.ack_endpoint(addr("10.0.0.1:5001"), 5001);
    assert!(a.send("10.0.0.7".parse().unwrap(), AckMessage::Destroyed).is_err());
    assert!(net.drain_acks(addr("10.0.0.7:5001")).is_empty());
}
