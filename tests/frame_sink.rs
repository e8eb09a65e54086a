use ofdm_framing::blocks::ofdm::Constellation;
use ofdm_framing::blocks::ofdm::FrameHeader;
use ofdm_framing::blocks::ofdm::FrameSinkBuilder;
use ofdm_framing::blocks::ofdm::MissingTagPolicy;
use ofdm_framing::blocks::ofdm::OfdmFrameSink;
use ofdm_framing::blocks::ofdm::SubcarrierMap;
use ofdm_framing::blocks::ofdm::tags::SYNC_CFO;
use ofdm_framing::blocks::ofdm::tags::SYNC_TIME;
use ofdm_framing::prelude::*;

// 16 carriers, qpsk: 4 bytes per symbol
const CARRIERS: usize = 16;

fn sink(queue: &MsgQueue) -> FrameSinkBuilder {
    let map = SubcarrierMap::from_indices((0..CARRIERS).collect(), CARRIERS).unwrap();
    FrameSinkBuilder::new(Constellation::qpsk(), CARRIERS, queue.clone()).subcarrier_map(map)
}

fn modulate(bytes: &[u8]) -> Vec<Complex32> {
    let c = Constellation::qpsk();
    let mut out: Vec<Complex32> = bytes
        .iter()
        .flat_map(|b| (0..4).map(move |k| (b >> (2 * k)) & 0x3))
        .map(|v| c.point(v).unwrap())
        .collect();
    while out.len() % CARRIERS != 0 {
        out.push(c.point(0).unwrap());
    }
    out
}

fn frame(payload: &[u8], offset: u8) -> Vec<Complex32> {
    let header = FrameHeader::new(payload.len(), offset).unwrap();
    let mut bytes = header.to_bytes().to_vec();
    bytes.extend_from_slice(payload);
    modulate(&bytes)
}

fn preamble() -> Vec<Complex32> {
    vec![Complex32::new(1.0, 0.0); CARRIERS]
}

struct Burst {
    symbols: Vec<Complex32>,
    flags: Vec<u8>,
    tags: Vec<ItemTag>,
}

impl Burst {
    fn new() -> Self {
        Burst {
            symbols: Vec::new(),
            flags: Vec::new(),
            tags: Vec::new(),
        }
    }

    fn add(mut self, payload: &[Complex32], time: Option<Timestamp>, cfo: Option<f64>) -> Self {
        let index = self.flags.len();
        if let Some(t) = time {
            self.tags
                .push(ItemTag::new(index, Tag::NamedTime(SYNC_TIME.to_string(), t)));
        }
        if let Some(c) = cfo {
            self.tags
                .push(ItemTag::new(index, Tag::NamedF64(SYNC_CFO.to_string(), c)));
        }
        self.symbols.extend(preamble());
        self.flags.push(1);
        self.symbols.extend_from_slice(payload);
        self.flags
            .extend(std::iter::repeat_n(0, payload.len() / CARRIERS));
        self
    }

    fn idle(mut self, n: usize) -> Self {
        self.symbols
            .extend(std::iter::repeat_n(Complex32::new(0.0, 0.0), n * CARRIERS));
        self.flags.extend(std::iter::repeat_n(0, n));
        self
    }

    fn run(self, sink: OfdmFrameSink) -> Mocker<OfdmFrameSink> {
        let mut mocker = Mocker::new(sink);
        mocker.input(0, self.symbols);
        mocker.input_with_tags(1, self.flags, self.tags);
        mocker.run();
        mocker
    }
}

fn drain(queue: &MsgQueue) -> Vec<Message> {
    std::iter::from_fn(|| queue.try_dequeue()).collect()
}

#[test]
fn decode_frame() {
    let queue = MsgQueue::unbounded();
    let time = Timestamp::new(42, 0.25);
    let mocker = Burst::new()
        .idle(2)
        .add(&frame(b"hello world!", 3), Some(time), Some(0.01))
        .idle(2)
        .run(sink(&queue).build().unwrap());

    let msgs = drain(&queue);
    assert_eq!(msgs.len(), 1);
    let msg = &msgs[0];
    assert_eq!(msg.payload, b"hello world!");
    assert_eq!(msg.msg_type, 0);
    assert_eq!(msg.arg1, 3.0);
    assert_eq!(msg.timestamp, Some(time));
    assert_eq!(msg.cfo, Some(0.01));
    assert!(msg.snr.unwrap() > 30.0);
    // header plus 12 bytes in four symbols
    assert_eq!(msg.power_list.len(), 4);
    assert!(msg.power_list.iter().all(|p| (p - 1.0).abs() < 1e-5));

    assert!(mocker.finished());
    assert!(mocker.kernel().searching());
}

#[test]
fn payload_spanning_symbols() {
    let queue = MsgQueue::unbounded();
    let payload: Vec<u8> = (0..=255).collect();
    Burst::new()
        .add(&frame(&payload, 0), Some(Timestamp::new(1, 0.0)), Some(0.0))
        .run(sink(&queue).build().unwrap());

    let msgs = drain(&queue);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].payload, payload);
}

#[test]
fn empty_payload() {
    let queue = MsgQueue::unbounded();
    let mocker = Burst::new()
        .add(&frame(&[], 9), Some(Timestamp::new(1, 0.0)), Some(0.0))
        .run(sink(&queue).build().unwrap());

    let msgs = drain(&queue);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].payload.is_empty());
    assert_eq!(msgs[0].arg1, 9.0);
    assert!(mocker.kernel().searching());
}

#[test]
fn bad_header_returns_to_search() {
    let queue = MsgQueue::unbounded();
    let mut broken = frame(b"lost", 0);
    // flips the two lowest bits of the first header byte
    broken[0] = -broken[0];

    let mocker = Burst::new()
        .add(&broken, Some(Timestamp::new(1, 0.0)), Some(0.0))
        .run(sink(&queue).build().unwrap());
    assert!(queue.is_empty());
    assert!(mocker.kernel().searching());

    // the next burst is received
    let t = Timestamp::new(2, 0.0);
    Burst::new()
        .add(&broken, Some(Timestamp::new(1, 0.0)), Some(0.0))
        .add(&frame(b"found", 0), Some(t), Some(0.0))
        .run(sink(&queue).build().unwrap());
    let msgs = drain(&queue);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].payload, b"found");
    assert_eq!(msgs[0].timestamp, Some(t));
}

#[test]
fn flag_while_demodulating_is_ignored() {
    let queue = MsgQueue::unbounded();
    // header and two payload symbols, the first payload symbol is flagged
    let mut input = preamble();
    input.extend(frame(&[0xaa; 8], 0));
    let flags = vec![1u8, 0, 1, 0];

    let mut mocker = Mocker::new(sink(&queue).build().unwrap());
    mocker.input(0, input);
    mocker.input_with_tags(
        1,
        flags,
        vec![
            ItemTag::new(0, Tag::NamedTime(SYNC_TIME.to_string(), Timestamp::default())),
            ItemTag::new(0, Tag::NamedF64(SYNC_CFO.to_string(), 0.0)),
        ],
    );
    mocker.run();

    let msgs = drain(&queue);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].payload, vec![0xaa; 8]);
}

#[test]
fn tracking_resets_on_new_burst() {
    let queue = MsgQueue::unbounded();
    let rot = Complex32::from_polar(1.0, 0.3);
    let rotated: Vec<Complex32> = frame(&[0x5a; 40], 0).iter().map(|x| x * rot).collect();

    let mut mocker = Mocker::new(sink(&queue).build().unwrap());
    let burst = Burst::new().add(&rotated, Some(Timestamp::new(1, 0.0)), Some(0.0));
    mocker.input(0, burst.symbols);
    mocker.input_with_tags(1, burst.flags, burst.tags);
    mocker.run();

    let msgs = drain(&queue);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].payload, vec![0x5a; 40]);
    assert!(msgs[0].snr.unwrap().is_finite());
    assert!(mocker.kernel().demapper().phase() != 0.0);
    assert!(
        mocker
            .kernel()
            .demapper()
            .taps()
            .iter()
            .any(|t| *t != Complex32::new(1.0, 0.0))
    );

    // a preamble alone resets the equalizer and the tracking loop
    let burst = Burst::new().add(&[], Some(Timestamp::new(2, 0.0)), Some(0.0));
    mocker.input(0, burst.symbols);
    mocker.input_with_tags(1, burst.flags, burst.tags);
    mocker.run();

    let demapper = mocker.kernel().demapper();
    assert_eq!(demapper.phase(), 0.0);
    assert_eq!(demapper.freq(), 0.0);
    assert!(demapper.taps().iter().all(|t| *t == Complex32::new(1.0, 0.0)));
    assert!(!mocker.kernel().searching());
}

#[test]
fn missing_tags_keep_last_values() {
    let queue = MsgQueue::unbounded();
    let time = Timestamp::new(5, 0.5);
    Burst::new()
        .add(&frame(b"one", 0), Some(time), Some(0.2))
        .add(&frame(b"two", 0), None, None)
        .run(sink(&queue).build().unwrap());

    let msgs = drain(&queue);
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[1].payload, b"two");
    assert_eq!(msgs[1].timestamp, Some(time));
    assert_eq!(msgs[1].cfo, Some(0.2));
}

#[test]
fn missing_tags_drop_burst() {
    let queue = MsgQueue::unbounded();
    let sink = sink(&queue)
        .missing_tag_policy(MissingTagPolicy::DropBurst)
        .build()
        .unwrap();
    Burst::new()
        .add(&frame(b"untimed", 0), None, Some(0.1))
        .add(&frame(b"timed", 0), Some(Timestamp::new(3, 0.0)), Some(0.1))
        .run(sink);

    let msgs = drain(&queue);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].payload, b"timed");
}

#[test]
fn no_tags_at_all() {
    let queue = MsgQueue::unbounded();
    Burst::new()
        .add(&frame(b"x", 0), None, None)
        .run(sink(&queue).build().unwrap());

    let msgs = drain(&queue);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].timestamp, None);
    assert_eq!(msgs[0].cfo, None);
}

#[test]
fn derotated_output() {
    let queue = MsgQueue::unbounded();
    let payload = frame(b"abcd", 0);
    let burst = Burst::new()
        .idle(1)
        .add(&payload, Some(Timestamp::new(1, 0.0)), None);
    let nsymbols = burst.flags.len();

    let mut mocker = Mocker::new(sink(&queue).build().unwrap());
    mocker.input(0, burst.symbols);
    mocker.input_with_tags(1, burst.flags, burst.tags);
    mocker.init_output::<Complex32>(0, 16);
    mocker.run();

    let (out, _) = mocker.output::<Complex32>(0);
    assert_eq!(out.len(), nsymbols * CARRIERS);
    // idle and preamble symbols are not demodulated
    assert!(
        out[..2 * CARRIERS]
            .iter()
            .all(|x| *x == Complex32::new(0.0, 0.0))
    );
    // no rotation before the first data symbol
    assert_eq!(&out[2 * CARRIERS..3 * CARRIERS], &payload[..CARRIERS]);
    assert_eq!(drain(&queue).len(), 1);
}

#[test]
fn default_map_drops_center_carriers() {
    let queue = MsgQueue::unbounded();
    let sink = OfdmFrameSink::new(Constellation::qpsk(), 64, queue).unwrap();
    let map = sink.subcarrier_map();
    assert_eq!(map.len(), 62);
    assert!(!map.indices().contains(&31));
    assert!(!map.indices().contains(&32));
}

#[test]
fn invalid_parameters() {
    let queue = MsgQueue::unbounded();
    let map = SubcarrierMap::from_indices(vec![0, 1], 8).unwrap();
    assert!(
        FrameSinkBuilder::new(Constellation::qpsk(), 16, queue.clone())
            .subcarrier_map(map)
            .build()
            .is_err()
    );
    assert!(
        FrameSinkBuilder::new(Constellation::qpsk(), 16, queue.clone())
            .eq_gain(-1.0)
            .build()
            .is_err()
    );
    assert!(
        FrameSinkBuilder::new(Constellation::qpsk(), 16, queue)
            .phase_gain(f32::NAN)
            .build()
            .is_err()
    );
}

#[test]
fn full_queue_drops_frames() {
    let queue = MsgQueue::new(1);
    let t = Some(Timestamp::new(1, 0.0));
    let mocker = Burst::new()
        .add(&frame(b"one", 0), t, Some(0.0))
        .add(&frame(b"two", 0), t, Some(0.0))
        .add(&frame(b"three", 0), t, Some(0.0))
        .run(sink(&queue).build().unwrap());

    assert_eq!(mocker.kernel().dropped(), 2);
    assert!(mocker.finished());
    let msgs = drain(&queue);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].payload, b"one");
}

#[test]
fn silent_burst_has_no_snr() {
    // on-off keying: silence slices to the zero point
    let ook = Constellation::new(
        vec![Complex32::new(0.0, 0.0), Complex32::new(1.0, 0.0)],
        vec![0, 1],
    )
    .unwrap();
    let map = SubcarrierMap::from_indices((0..CARRIERS).collect(), CARRIERS).unwrap();
    let queue = MsgQueue::unbounded();
    let sink = FrameSinkBuilder::new(ook, CARRIERS, queue.clone())
        .subcarrier_map(map)
        .build()
        .unwrap();

    // two silent symbols decode to an all-zero header: an empty frame
    let silence = vec![Complex32::new(0.0, 0.0); 2 * CARRIERS];
    Burst::new()
        .add(&silence, Some(Timestamp::new(1, 0.0)), Some(0.0))
        .run(sink);

    let msgs = drain(&queue);
    assert_eq!(msgs.len(), 1);
    assert!(msgs[0].payload.is_empty());
    assert_eq!(msgs[0].snr, None);
    assert_eq!(msgs[0].power_list, vec![0.0, 0.0]);
}
