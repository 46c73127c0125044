use std::net;
use std::time::{Duration, Instant};

use bottleneck::{router, Packet, Router, Timestamp, RECORD_SIZE};
use rand::{Rng, SeedableRng};

const UNIT_COUNT: u32 = 40;

fn raw_socket() -> net::UdpSocket {
    let socket = net::UdpSocket::bind((net::Ipv4Addr::LOCALHOST, 0)).unwrap();
    socket.set_nonblocking(true).unwrap();
    socket
}

#[test]
fn forwards_records_unchanged() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xF0D);

    let source = raw_socket();
    let sink = raw_socket();

    let mut router = Router::bind(router::Config {
        bind_addr: (net::Ipv4Addr::LOCALHOST, 0).into(),
        receiver_addrs: vec![sink.local_addr().unwrap()],
        queue_count: 1,
        queue_capacity: UNIT_COUNT as usize,
        service_interval: Duration::from_millis(1),
        ..Default::default()
    })
    .unwrap();

    let router_addr = router.local_addr();

    let mut sent_digest = md5::Context::new();

    for seq in 0..UNIT_COUNT {
        let mut packet = Packet::new(seq, Timestamp::now(), 1, 1);
        rng.fill(&mut packet.payload[..]);

        let bytes = packet.encode();
        sent_digest.consume(bytes);

        source.send_to(&bytes, router_addr).unwrap();
    }

    // Neither is forwarded; only the second counts as an arrival
    source.send_to(&[0u8; 100], router_addr).unwrap();
    source
        .send_to(&Packet::new(0, Timestamp::now(), 1, 9).encode(), router_addr)
        .unwrap();

    let mut recv_digest = md5::Context::new();
    let mut received = Vec::new();
    let mut buffer = [0u8; 2048];

    let deadline = Instant::now() + Duration::from_secs(10);

    while received.len() < UNIT_COUNT as usize {
        router.poll(Duration::from_millis(1)).unwrap();

        while let Ok((len, _)) = sink.recv_from(&mut buffer) {
            assert_eq!(len, RECORD_SIZE);

            recv_digest.consume(&buffer[..len]);
            received.push(Packet::decode(&buffer[..len]).unwrap().seq);
        }

        assert!(Instant::now() < deadline, "only {} forwarded", received.len());
    }

    assert_eq!(sent_digest.compute(), recv_digest.compute());
    assert_eq!(received, (0..UNIT_COUNT).collect::<Vec<_>>());

    assert_eq!(router.malformed_count(), 1);
    assert_eq!(router.unroutable_count(), 1);
    assert_eq!(router.arrival_count(), UNIT_COUNT as u64 + 1);
    assert_eq!(router.scheduler().drop_count(0), 0);
    assert_eq!(router.scheduler().stats(0).unwrap().forwarded, UNIT_COUNT as u64);
}

#[test]
fn high_priority_queue_drains_first() {
    let source = raw_socket();
    let sink_1 = raw_socket();
    let sink_2 = raw_socket();

    let mut router = Router::bind(router::Config {
        bind_addr: (net::Ipv4Addr::LOCALHOST, 0).into(),
        receiver_addrs: vec![sink_1.local_addr().unwrap(), sink_2.local_addr().unwrap()],
        queue_count: 2,
        queue_capacity: 8,
        // Slow enough that every arrival is queued before the first tick
        service_interval: Duration::from_millis(200),
        ..Default::default()
    })
    .unwrap();

    let router_addr = router.local_addr();

    for seq in 0..4 {
        let to_2 = Packet::new(seq, Timestamp::now(), 2, 2);
        let to_1 = Packet::new(seq, Timestamp::now(), 1, 1);
        source.send_to(&to_2.encode(), router_addr).unwrap();
        source.send_to(&to_1.encode(), router_addr).unwrap();
    }

    // Receiver ids in forwarding order
    let mut order = Vec::new();
    let mut buffer = [0u8; 2048];

    let deadline = Instant::now() + Duration::from_secs(10);

    while order.len() < 8 {
        router.poll(Duration::from_millis(5)).unwrap();

        for (id, sink) in [(1, &sink_1), (2, &sink_2)] {
            while let Ok((len, _)) = sink.recv_from(&mut buffer) {
                assert_eq!(len, RECORD_SIZE);
                order.push(id);
            }
        }

        assert!(Instant::now() < deadline);
    }

    assert_eq!(order, vec![1, 1, 1, 1, 2, 2, 2, 2]);
    assert_eq!(router.scheduler().avg_len(0), Some(2.5));
}
