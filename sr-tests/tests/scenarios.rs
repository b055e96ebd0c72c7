//! End-to-end protocol scenarios
//!
//! Drives the sender and receiver engines by hand for the window, loss and
//! reordering cases, and through the simulator for timing races and lossy
//! links.

use bytes::Bytes;
use sr::sim::{ChannelModel, Event, SimConfig, Simulation};
use sr_protocol::{
    AckOutcome, ConfigError, ManualScheduler, Packet, ProtocolConfig, ReceiveOutcome,
    ReceiverEngine, SenderEngine, SeqNumber, SimTime, SubmitOutcome, TimerState,
};

type HandSender = SenderEngine<Vec<Packet>, ManualScheduler>;
type HandReceiver = ReceiverEngine<Vec<Packet>, Vec<Bytes>>;

fn seq(n: u32) -> SeqNumber {
    SeqNumber::new(n)
}

fn payload(n: u32) -> Bytes {
    Bytes::from(format!("payload-{}", n))
}

fn hand_sender(window: u32, modulus: u32) -> HandSender {
    SenderEngine::new(
        ProtocolConfig::with_window(window, modulus),
        Vec::new(),
        ManualScheduler::new(),
    )
    .unwrap()
}

fn hand_receiver(window: u32, modulus: u32) -> HandReceiver {
    ReceiverEngine::new(
        ProtocolConfig::with_window(window, modulus),
        Vec::new(),
        Vec::new(),
    )
    .unwrap()
}

/// Advance the sender's clock and deliver every expired timer
fn advance(sender: &mut HandSender, ticks: u64) -> usize {
    sender.timers_mut().scheduler_mut().advance(ticks);
    let expired = sender.timers_mut().scheduler_mut().take_expired();
    expired
        .into_iter()
        .filter(|&(s, handle)| sender.on_timer_expired(s, handle))
        .count()
}

#[test]
fn test_window_fills_and_reopens() {
    let mut sender = hand_sender(4, 8);

    for n in 1..=4 {
        assert_eq!(sender.submit(payload(n)), SubmitOutcome::Accepted(seq(n)));
    }
    assert_eq!(sender.submit(payload(5)), SubmitOutcome::Rejected);
    assert_eq!(sender.channel().len(), 4);
    assert_eq!(sender.stats().rejected_submissions, 1);

    assert_eq!(
        sender.on_ack(&Packet::ack(seq(1), 10)),
        AckOutcome::Accepted { advanced: 1 }
    );
    assert_eq!(sender.base(), seq(2));
    assert_eq!(sender.submit(payload(5)), SubmitOutcome::Accepted(seq(5)));
    assert_eq!(sender.window(), vec![seq(2), seq(3), seq(4), seq(5)]);
}

#[test]
fn test_corrupted_ack_retransmits_only_that_packet() {
    let mut sender = hand_sender(4, 8);
    for n in 1..=3 {
        sender.submit(payload(n));
    }

    sender.on_ack(&Packet::ack(seq(1), 10));
    assert_eq!(
        sender.on_ack(&Packet::ack(seq(2), 10).corrupt()),
        AckOutcome::Corrupted
    );
    sender.on_ack(&Packet::ack(seq(3), 10));

    assert_eq!(sender.base(), seq(2));
    assert!(sender.is_acked(seq(3)));
    assert_eq!(sender.timers().state(seq(2)), Some(TimerState::Running));

    assert_eq!(advance(&mut sender, 10), 1);

    let sent = sender.channel();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[3].seq_num, seq(2));
    assert_eq!(sent[3].payload, payload(2));
    assert_eq!(sender.stats().retransmissions, 1);
    assert_eq!(sender.record(seq(2)).unwrap().tx_count, 2);

    // Nothing else is pending, so nothing else goes out later
    assert_eq!(
        sender.on_ack(&Packet::ack(seq(2), 10)),
        AckOutcome::Accepted { advanced: 2 }
    );
    assert_eq!(advance(&mut sender, 100), 0);
    assert_eq!(sender.channel().len(), 4);
    assert!(sender.is_idle());
    assert!(sender.timers().is_empty());
}

#[test]
fn test_timeout_retransmits_only_the_expired_packet() {
    let mut sender = hand_sender(4, 8);
    sender.submit(payload(1));
    advance(&mut sender, 3);
    sender.submit(payload(2));

    // Both unacknowledged; only seq 1 is due at t=10
    assert_eq!(advance(&mut sender, 7), 1);
    let sent: Vec<SeqNumber> = sender.channel().iter().map(|p| p.seq_num).collect();
    assert_eq!(sent, vec![seq(1), seq(2), seq(1)]);
    assert_eq!(sender.stats().retransmissions, 1);
    assert_eq!(sender.timers().state(seq(2)), Some(TimerState::Running));
}

#[test]
fn test_reordered_packets_delivered_together() {
    let mut receiver = hand_receiver(4, 8);

    receiver.on_packet(Packet::data(seq(1), payload(1), 10));
    assert_eq!(receiver.base(), seq(2));

    assert_eq!(
        receiver.on_packet(Packet::data(seq(3), payload(3), 10)),
        ReceiveOutcome::Accepted { delivered: 0 }
    );
    assert!(receiver.is_buffered(seq(3)));
    assert_eq!(receiver.app().len(), 1);

    assert_eq!(
        receiver.on_packet(Packet::data(seq(2), payload(2), 10)),
        ReceiveOutcome::Accepted { delivered: 2 }
    );
    assert_eq!(receiver.app(), &vec![payload(1), payload(2), payload(3)]);
    assert_eq!(receiver.base(), seq(4));
    assert!(receiver.buffered().is_empty());

    // Every intact packet was acknowledged individually
    let acks: Vec<SeqNumber> = receiver.channel().iter().map(|p| p.seq_num).collect();
    assert_eq!(acks, vec![seq(1), seq(3), seq(2)]);
}

#[test]
fn test_timer_fires_before_simultaneous_ack() {
    // Round trip of exactly one timeout: the ACK and the timer both land at
    // t=10, and the timer was registered first.
    let mut sim = Simulation::new(SimConfig {
        protocol: ProtocolConfig {
            timeout_ticks: 10,
            ..Default::default()
        },
        data_channel: ChannelModel::perfect(5),
        ack_channel: ChannelModel::perfect(5),
        messages: 1,
        ..Default::default()
    })
    .unwrap();

    sim.run_until(SimTime::from_ticks(9));
    assert_eq!(sim.sender().stats().retransmissions, 0);
    assert_eq!(sim.receiver().app().len(), 1);

    let first = sim.step().unwrap();
    assert_eq!(first.at, SimTime::from_ticks(10));
    assert_eq!(first.event, Event::TimerExpired { seq: seq(1) });
    assert_eq!(sim.sender().stats().retransmissions, 1);
    assert_eq!(sim.sender().timers().state(seq(1)), Some(TimerState::Running));

    let second = sim.step().unwrap();
    assert_eq!(second.at, SimTime::from_ticks(10));
    assert_eq!(second.event, Event::DeliverToSender(Packet::ack(seq(1), 10)));
    assert!(sim.sender().is_idle());
    assert!(sim.sender().timers().is_empty());

    // The restarted timer was cancelled; only the retransmitted copy and its
    // ACK remain.
    let report = sim.run();
    assert!(report.complete);
    assert!(report.exactly_once_in_order);
    assert_eq!(report.sender.packets_sent, 2);
    assert_eq!(report.sender.retransmissions, 1);
    assert_eq!(report.sender.stale_acks, 1);
    assert_eq!(report.receiver.duplicate_packets, 1);
    assert_eq!(report.finished_at, SimTime::from_ticks(20));
}

#[test]
fn test_ack_before_timeout_cancels_timer() {
    let mut sim = Simulation::new(SimConfig {
        protocol: ProtocolConfig {
            timeout_ticks: 11,
            ..Default::default()
        },
        data_channel: ChannelModel::perfect(5),
        ack_channel: ChannelModel::perfect(5),
        messages: 1,
        ..Default::default()
    })
    .unwrap();

    let report = sim.run();
    assert!(report.complete);
    assert_eq!(report.sender.retransmissions, 0);
    assert_eq!(report.finished_at, SimTime::from_ticks(10));
}

#[test]
fn test_injected_ack_for_unsent_packet_is_stale() {
    let mut sim = Simulation::new(SimConfig {
        messages: 3,
        ..Default::default()
    })
    .unwrap();
    sim.inject(
        SimTime::from_ticks(1),
        Event::DeliverToSender(Packet::ack(seq(9), 10)),
    );

    let report = sim.run();
    assert!(report.complete);
    assert!(report.exactly_once_in_order);
    assert_eq!(report.sender.stale_acks, 1);
}

#[test]
fn test_sequence_numbers_wrap() {
    let mut sender = hand_sender(2, 4);
    let mut receiver = hand_receiver(2, 4);

    for n in 0..20 {
        let outcome = sender.submit(payload(n));
        assert!(outcome.is_accepted());
        let packet = sender.channel_mut().remove(0);
        receiver.on_packet(packet);
        let ack = receiver.channel_mut().remove(0);
        assert_eq!(sender.on_ack(&ack), AckOutcome::Accepted { advanced: 1 });
    }

    let expected: Vec<Bytes> = (0..20).map(payload).collect();
    assert_eq!(receiver.app(), &expected);
    // 20 packets from 1 around a modulus of 4
    assert_eq!(sender.base(), seq(1));
    assert_eq!(receiver.base(), seq(1));
}

#[test]
fn test_redelivered_packet_is_reacked_not_redelivered() {
    let mut receiver = hand_receiver(4, 8);
    let packet = Packet::data(seq(1), payload(1), 10);

    receiver.on_packet(packet.clone());
    assert_eq!(receiver.on_packet(packet), ReceiveOutcome::Duplicate);

    assert_eq!(receiver.app().len(), 1);
    assert_eq!(receiver.channel().len(), 2);
    assert_eq!(receiver.stats().duplicate_packets, 1);
}

#[test]
fn test_corrupted_packet_gets_no_ack() {
    let mut receiver = hand_receiver(4, 8);
    assert_eq!(
        receiver.on_packet(Packet::data(seq(1), payload(1), 10).corrupt()),
        ReceiveOutcome::Corrupted
    );
    assert!(receiver.channel().is_empty());
    assert!(receiver.app().is_empty());
    assert_eq!(receiver.base(), seq(1));
}

#[test]
fn test_small_modulus_rejected() {
    let result = SenderEngine::new(
        ProtocolConfig::with_window(5, 8),
        Vec::<Packet>::new(),
        ManualScheduler::new(),
    );
    assert!(matches!(
        result,
        Err(ConfigError::ModulusTooSmall {
            modulus: 8,
            window: 5,
            ..
        })
    ));
}

#[test]
fn test_lossy_link_delivers_everything_in_order() {
    let model = ChannelModel {
        loss: 0.25,
        corruption: 0.1,
        duplication: 0.1,
        min_delay: 2,
        max_delay: 3,
    };

    for seed in 0..8 {
        let mut sim = Simulation::new(SimConfig {
            protocol: ProtocolConfig {
                timeout_ticks: 7,
                ..Default::default()
            },
            data_channel: model,
            ack_channel: model,
            messages: 300,
            seed,
            ..Default::default()
        })
        .unwrap();

        let report = sim.run();
        assert!(report.complete, "seed {} incomplete: {:?}", seed, report);
        assert!(report.exactly_once_in_order, "seed {} out of order", seed);
        assert!(report.sender.retransmissions > 0);
        assert!(report.data_channel.lost > 0);
    }
}

#[test]
fn test_same_seed_same_run() {
    let config = SimConfig {
        data_channel: ChannelModel {
            loss: 0.2,
            min_delay: 1,
            max_delay: 1,
            ..Default::default()
        },
        messages: 100,
        seed: 1234,
        ..Default::default()
    };

    let a = Simulation::new(config).unwrap().run();
    let b = Simulation::new(config).unwrap().run();
    assert_eq!(a, b);
}
