use ofdm_framing::blocks::ofdm::OfdmCyclicPrefixer;
use ofdm_framing::blocks::ofdm::OfdmError;
use ofdm_framing::blocks::ofdm::tags::TX_EOB;
use ofdm_framing::blocks::ofdm::tags::TX_SOB;
use ofdm_framing::prelude::*;

fn ramp(n: usize) -> Vec<Complex32> {
    (0..n).map(|i| Complex32::new(i as f32, -(i as f32))).collect()
}

#[test]
fn prefix_is_symbol_tail() {
    let mut mocker = Mocker::new(OfdmCyclicPrefixer::new(64, 80).unwrap());
    mocker.input(0, ramp(128));
    mocker.init_output::<Complex32>(0, 320);
    mocker.run();

    let (out, tags) = mocker.output::<Complex32>(0);
    assert_eq!(out.len(), 160);
    assert!(tags.is_empty());
    for (s, sym) in out.chunks(80).enumerate() {
        let base = s * 64;
        for (i, x) in sym.iter().enumerate() {
            let expected = if i < 16 { base + 48 + i } else { base + i - 16 };
            assert_eq!(x.re, expected as f32, "symbol {s} sample {i}");
        }
    }
    assert!(mocker.finished());
}

#[test]
fn no_prefix() {
    let mut mocker = Mocker::new(OfdmCyclicPrefixer::new(8, 8).unwrap());
    let input = ramp(24);
    mocker.input(0, input.clone());
    mocker.init_output::<Complex32>(0, 64);
    mocker.run();

    let (out, _) = mocker.output::<Complex32>(0);
    assert_eq!(out, input);
    assert_eq!(mocker.kernel().prefix_len(), 0);
}

#[test]
fn tags_move_to_symbol_start() {
    let mut mocker = Mocker::new(OfdmCyclicPrefixer::new(64, 80).unwrap());
    mocker.input_with_tags(
        0,
        ramp(192),
        vec![
            ItemTag::new(1, Tag::Flag(TX_SOB.to_string())),
            ItemTag::new(2, Tag::NamedF64("gain".to_string(), 3.0)),
        ],
    );
    mocker.init_output::<Complex32>(0, 400);
    mocker.run();

    let (_, tags) = mocker.output::<Complex32>(0);
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].index, 80);
    assert!(tags[0].has_key(TX_SOB));
    assert_eq!(tags[1].index, 160);
}

#[test]
fn end_of_burst_on_last_sample() {
    let mut mocker = Mocker::new(OfdmCyclicPrefixer::new(64, 80).unwrap());
    mocker.input(0, ramp(192));
    mocker.input(1, vec![0u8, 1, 1]);
    mocker.init_output::<Complex32>(0, 400);
    mocker.run();

    let (_, tags) = mocker.output::<Complex32>(0);
    let eob: Vec<usize> = tags
        .iter()
        .filter(|t| t.has_key(TX_EOB))
        .map(|t| t.index)
        .collect();
    assert_eq!(eob, vec![159, 239]);
    assert_eq!(tags[0].source.as_deref(), Some("OfdmCyclicPrefixer_0"));
}

#[test]
fn partial_output_space() {
    let mut mocker = Mocker::new(OfdmCyclicPrefixer::new(4, 6).unwrap());
    mocker.input_with_tags(0, ramp(12), vec![ItemTag::new(2, Tag::NamedF64("gain".to_string(), 1.0))]);
    mocker.input(1, vec![0u8, 0, 1]);
    mocker.init_output::<Complex32>(0, 10);
    mocker.run();

    // only one symbol fits
    let (out, tags) = mocker.take_output::<Complex32>(0);
    assert_eq!(out.len(), 6);
    assert!(tags.is_empty());
    assert!(!mocker.finished());

    mocker.run();
    let (out, tags) = mocker.take_output::<Complex32>(0);
    assert_eq!(out.len(), 6);
    assert!(tags.is_empty());

    mocker.run();
    let (out, tags) = mocker.take_output::<Complex32>(0);
    assert_eq!(out[0].re, 10.0);
    assert_eq!(out[2].re, 8.0);
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].tag, Tag::NamedF64("gain".to_string(), 1.0));
    assert_eq!(tags[0].index, 0);
    assert!(tags[1].has_key(TX_EOB));
    assert_eq!(tags[1].index, 5);
    assert!(mocker.finished());
}

#[test]
fn invalid_sizes() {
    assert_eq!(
        OfdmCyclicPrefixer::new(80, 64).err(),
        Some(OfdmError::CyclicPrefixSize {
            input: 80,
            output: 64
        })
    );
    assert!(OfdmCyclicPrefixer::new(0, 64).is_err());
}

#[test]
fn forecast_rounds_up() {
    let cp = OfdmCyclicPrefixer::new(64, 80).unwrap();
    assert_eq!(cp.forecast(0), 0);
    assert_eq!(cp.forecast(1), 1);
    assert_eq!(cp.forecast(79), 1);
    assert_eq!(cp.forecast(80), 1);
    assert_eq!(cp.forecast(81), 2);
    assert_eq!(cp.forecast(160), 2);
}
