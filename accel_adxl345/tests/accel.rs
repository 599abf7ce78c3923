use accel_adxl345::{
    error::Error, AccelConf, Accelerometer, AcquisitionStatus, Command, DrainStrategy, IoAdapter,
    MalformedPolicy, Protocol, Range, StreamState, ACCEL_SCALE,
};
use claims::*;
use std::time::Duration;
use utilities::{
    FakeDevice, MockIO, DEFAULT_TIMER_PERIOD, MAX_TIMER_PERIOD, MIN_TIMER_PERIOD, STREAM_SAMPLES,
};

const PROTOCOLS: [Protocol; 3] = [Protocol::SpaceText, Protocol::CommaText, Protocol::Binary];

fn test_conf(protocol: Protocol) -> AccelConf {
    AccelConf {
        reset_delay: None,
        protocol,
        drain: DrainStrategy::FixedPasses {
            passes: 2,
            delay: Duration::ZERO,
        },
        ..Default::default()
    }
}

fn fake(protocol: Protocol) -> FakeDevice {
    FakeDevice::new(protocol, &STREAM_SAMPLES)
}

fn connect(device: FakeDevice) -> Accelerometer<FakeDevice> {
    let conf = test_conf(device.protocol());
    device
        .open_accelerometer(&conf)
        .expect("Could not connect to fake device")
}

fn connect_with(protocol: Protocol) -> Accelerometer<FakeDevice> {
    connect(fake(protocol))
}

#[test]
fn connect_reads_device_settings() {
    let accel = connect(fake(Protocol::CommaText));
    assert_eq!(accel.sample_dt(), DEFAULT_TIMER_PERIOD);
    assert_eq!(accel.range(), Range::G16);
    assert_eq!(accel.min_sample_dt(), MIN_TIMER_PERIOD);
    assert_eq!(accel.max_sample_dt(), MAX_TIMER_PERIOD);
    assert_eq!(accel.state(), StreamState::Idle);
    assert_eq!(accel.get_ref().commands(), &["[0]", "[3]", "[5]", "[8]", "[7]"]);
    assert_eq!(accel.max_sample_rate(), 500.0);
    assert_eq!(accel.min_sample_rate(), 10.0);
}

#[test]
fn connect_applies_configured_range() {
    let conf = AccelConf {
        range: 4,
        ..test_conf(Protocol::CommaText)
    };
    let accel = fake(Protocol::CommaText).open_accelerometer(&conf).unwrap();
    assert_eq!(accel.range(), Range::G4);
    assert_eq!(accel.get_ref().range(), 4);
    assert!(accel.get_ref().commands().iter().any(|c| c == "[4,4]"));
}

#[test]
fn connect_skips_range_already_set() {
    let accel = connect(fake(Protocol::CommaText).with_range(16));
    assert!(!accel.get_ref().commands().iter().any(|c| c.starts_with("[4")));
}

#[test]
fn connect_rejects_bad_range_before_io() {
    for range in [0, 3, 32] {
        let mut mock_io = MockIO::new();
        mock_io.expect_write_all().never();
        mock_io.expect_read().never();
        let conf = AccelConf {
            range,
            ..test_conf(Protocol::CommaText)
        };
        assert_matches!(
            Accelerometer::connect(mock_io, &conf),
            Err(Error::InvalidRange(r)) if r == range
        );
    }
}

#[test]
fn silent_device_is_reported() {
    let mut mock_io = MockIO::new();
    mock_io.expect_write_all().returning(|_| Ok(()));
    mock_io.expect_clear_input().returning(|| Ok(()));
    // Every read times out
    mock_io.expect_read().returning(|_| Ok(0));
    assert_matches!(
        Accelerometer::connect(mock_io, &test_conf(Protocol::CommaText)),
        Err(Error::NoResponse)
    );
}

#[test]
fn set_range_round_trip() {
    for protocol in PROTOCOLS {
        let mut accel = connect_with(protocol);
        for g in [2, 4, 8, 16] {
            accel.set_range(g).unwrap();
            assert_eq!(accel.range().as_g(), g);
            assert_ok_eq!(accel.query_range(), Range::try_from(g).unwrap());
        }
    }
}

#[test]
fn set_range_refreshes_from_device() {
    let mut accel = connect(fake(Protocol::CommaText));
    accel.set_range(8).unwrap();
    let commands = accel.get_ref().commands();
    assert_eq!(&commands[commands.len() - 2..], &["[4,8]", "[5]"]);
}

#[test]
fn unsupported_range_is_never_sent() {
    let mut accel = connect(fake(Protocol::CommaText));
    let sent = accel.get_ref().commands().len();
    for g in [3, 32, 1, 0] {
        assert_matches!(accel.set_range(g), Err(Error::InvalidRange(_)));
    }
    assert_eq!(accel.get_ref().commands().len(), sent);
    assert_eq!(accel.range(), Range::G16);
}

#[test]
fn sample_dt_bounds() {
    let mut accel = connect(fake(Protocol::CommaText));
    let sent = accel.get_ref().commands().len();
    assert_matches!(
        accel.set_sample_dt(MIN_TIMER_PERIOD - 1),
        Err(Error::SampleDtOutOfRange { .. })
    );
    assert_matches!(
        accel.set_sample_dt(MAX_TIMER_PERIOD + 1),
        Err(Error::SampleDtOutOfRange { .. })
    );
    assert_eq!(accel.get_ref().commands().len(), sent);

    accel.set_sample_dt(5000).unwrap();
    assert_eq!(accel.sample_dt(), 5000);
    assert_eq!(accel.get_ref().timer_period(), 5000);
    assert_eq!(accel.sample_rate(), 200.0);

    accel.set_sample_dt(MAX_TIMER_PERIOD).unwrap();
    assert_eq!(accel.sample_dt(), MAX_TIMER_PERIOD);
}

#[test]
fn sample_rate_in_hz() {
    let mut accel = connect(fake(Protocol::CommaText));
    accel.set_sample_rate(250.0).unwrap();
    assert_eq!(accel.sample_dt(), 4000);
    // Rounded down to whole microseconds
    accel.set_sample_rate(300.0).unwrap();
    assert_eq!(accel.sample_dt(), 3333);

    assert_matches!(accel.set_sample_rate(0.0), Err(Error::InvalidSampleRate(_)));
    assert_matches!(accel.set_sample_rate(-5.0), Err(Error::InvalidSampleRate(_)));
    assert_matches!(accel.set_sample_rate(f64::NAN), Err(Error::InvalidSampleRate(_)));
    assert_matches!(
        accel.set_sample_rate(1000.0),
        Err(Error::SampleDtOutOfRange { value: 1000, .. })
    );
}

#[test]
fn collect_exact_sample_count() {
    for protocol in PROTOCOLS {
        for n in [0, 1, 7, 64, 250] {
            let mut accel = connect_with(protocol);
            let batch = accel.collect(n).unwrap();
            assert_eq!(batch.samples.len(), n);
            assert_eq!(batch.t.len(), n);
            for (i, t) in batch.t.iter().enumerate() {
                assert!((t - i as f64 * 0.002).abs() < 1e-12);
            }
            assert!(batch.t.windows(2).all(|w| w[1] > w[0]));
            assert_eq!(accel.state(), StreamState::Idle);
            assert!(!accel.get_ref().is_streaming());
        }
    }
}

#[test]
fn collect_scales_streamed_samples() {
    for protocol in PROTOCOLS {
        let mut accel = connect_with(protocol);
        let batch = accel.collect(100).unwrap();
        for (i, sample) in batch.samples.iter().enumerate() {
            let expected = STREAM_SAMPLES[i % STREAM_SAMPLES.len()].scale(ACCEL_SCALE);
            assert_eq!(*sample, expected, "sample #{i} over {protocol}");
        }
    }
}

#[test]
fn collect_uses_current_sample_dt() {
    let mut accel = connect(fake(Protocol::CommaText));
    accel.set_sample_dt(10000).unwrap();
    let batch = accel.collect(5).unwrap();
    let last = batch.t.last().copied().unwrap();
    assert!((last - 0.04).abs() < 1e-12, "last timestamp {last}");
}

#[test]
fn collect_stops_on_bad_checksum() {
    let mut accel = connect(fake(Protocol::Binary).corrupt_after(10));
    assert_matches!(accel.collect(50), Err(Error::OutOfSync(0x01)));
    assert_eq!(accel.state(), StreamState::Idle);
    assert!(!accel.get_ref().is_streaming());
    assert_eq!(accel.get_ref().commands().last().map(String::as_str), Some("[0]"));
}

#[test]
fn drain_discards_stale_bytes() {
    let strategies = [
        DrainStrategy::UntilEmpty,
        DrainStrategy::FixedPasses {
            passes: 3,
            delay: Duration::ZERO,
        },
    ];
    for drain in strategies {
        let conf = AccelConf {
            drain,
            ..test_conf(Protocol::CommaText)
        };
        let mut accel = fake(Protocol::CommaText).open_accelerometer(&conf).unwrap();
        accel.get_mut().push_output(b"999\r\n4,4,4;5,5,5\r\n");
        accel.drain().unwrap();
        assert_ok_eq!(accel.query_range(), Range::G16);
        assert_ok_eq!(accel.query_sample_dt(), DEFAULT_TIMER_PERIOD);
    }
}

#[test]
fn stale_bytes_break_next_reply() {
    let mut accel = connect(fake(Protocol::CommaText));
    accel.get_mut().push_output(b"999\r\n");
    assert_matches!(accel.query_range(), Err(Error::InvalidRange(999)));
}

#[test]
fn stop_drains_samples_in_flight() {
    let mut accel = connect(fake(Protocol::CommaText));
    accel.start().unwrap();
    assert!(accel.get_ref().is_streaming());
    accel.stop().unwrap();
    assert_ok_eq!(accel.query_sample_dt(), DEFAULT_TIMER_PERIOD);
}

#[test]
fn peek_single_sample() {
    for protocol in PROTOCOLS {
        let mut accel = connect_with(protocol);
        assert_ok_eq!(accel.peek_raw(), STREAM_SAMPLES[0]);
        assert_ok_eq!(accel.peek(), STREAM_SAMPLES[1].scale(ACCEL_SCALE));
    }
}

#[test]
fn bad_sample_count_over_binary_firmware() {
    let mut accel = connect(fake(Protocol::Binary).with_bad_sample_count(3));
    assert_ok_eq!(accel.bad_sample_count(), 3);
}

#[test]
fn bad_sample_count_unsupported_by_text_firmware() {
    let mut accel = connect(fake(Protocol::CommaText));
    let sent = accel.get_ref().commands().len();
    assert_matches!(
        accel.bad_sample_count(),
        Err(Error::Unsupported(Command::GetBadSampleCount, Protocol::CommaText))
    );
    assert_eq!(accel.get_ref().commands().len(), sent);
}

#[test]
fn poll_until_done() {
    for protocol in PROTOCOLS {
        let mut accel = connect_with(protocol);
        let mut acq = accel.begin_acquisition(120).unwrap();
        let mut batch = None;
        for _ in 0..1000 {
            match accel.poll(&mut acq).unwrap() {
                AcquisitionStatus::Acquiring { collected, target } => {
                    assert!(collected < target);
                    assert_eq!(target, 120);
                }
                AcquisitionStatus::Done(b) => {
                    batch = Some(b);
                    break;
                }
            }
        }
        let batch = batch.expect("Acquisition never finished");
        assert_eq!(batch.len(), 120);
        assert_eq!(batch.samples[0], STREAM_SAMPLES[0].scale(ACCEL_SCALE));
        assert!(!accel.get_ref().is_streaming());
    }
}

#[test]
fn poll_returns_without_data() {
    let mut accel = connect(fake(Protocol::CommaText).with_burst(0));
    let mut acq = accel.begin_acquisition(10).unwrap();
    assert_ok_eq!(
        accel.poll(&mut acq),
        AcquisitionStatus::Acquiring {
            collected: 0,
            target: 10
        }
    );
    assert_eq!(accel.state(), StreamState::Streaming);
}

#[test]
fn poll_stops_on_bad_checksum() {
    let mut accel = connect(fake(Protocol::Binary).corrupt_after(3));
    let mut acq = accel.begin_acquisition(100).unwrap();
    let mut result = Ok(());
    for _ in 0..100 {
        if let Err(err) = accel.poll(&mut acq) {
            result = Err(err);
            break;
        }
    }
    assert_matches!(result, Err(Error::OutOfSync(_)));
    assert!(!accel.get_ref().is_streaming());
    assert_eq!(accel.state(), StreamState::Idle);
}

#[test]
fn disconnect_stops_streaming() {
    let mut accel = connect(fake(Protocol::CommaText));
    accel.start().unwrap();
    let device = accel.disconnect().unwrap();
    assert!(!device.is_streaming());
}

#[test]
fn allowed_ranges_match_firmware() {
    let accel = connect(fake(Protocol::CommaText));
    let allowed: Vec<u32> = accel.allowed_ranges().iter().map(|r| r.as_g()).collect();
    assert_eq!(allowed, vec![2, 4, 8, 16]);
}

#[test]
fn float_values_from_firmware() {
    let mut accel = connect(fake(Protocol::CommaText).with_float_values());
    assert_eq!(accel.sample_dt(), DEFAULT_TIMER_PERIOD);
    accel.set_sample_dt(2500).unwrap();
    assert_eq!(accel.sample_dt(), 2500);
    assert_ok_eq!(accel.peek_raw(), STREAM_SAMPLES[0]);

    let batch = accel.collect(10).unwrap();
    assert_eq!(batch.len(), 10);
    assert_eq!(batch.samples[0], STREAM_SAMPLES[1].scale(ACCEL_SCALE));
}

#[test]
fn malformed_samples_while_collecting() {
    for (malformed, fails) in [(MalformedPolicy::Drop, false), (MalformedPolicy::Fail, true)] {
        let conf = AccelConf {
            malformed,
            ..test_conf(Protocol::CommaText)
        };
        let mut accel = fake(Protocol::CommaText).open_accelerometer(&conf).unwrap();
        accel.start().unwrap();
        accel.get_mut().push_output(b"1,?,3;4,5,6\r\n");
        let res = accel.collect(20);
        if fails {
            assert_matches!(res, Err(Error::InvalidData(_)));
        } else {
            assert_eq!(res.unwrap().len(), 20);
        }
        assert_eq!(accel.state(), StreamState::Idle);
        assert!(!accel.get_ref().is_streaming());
    }
}

#[test]
fn collect_huge_count_fails_cleanly() {
    let mut accel = connect(fake(Protocol::Binary).corrupt_after(5));
    assert_matches!(accel.collect(usize::MAX), Err(Error::OutOfSync(0x01)));
    assert!(!accel.get_ref().is_streaming());
}

#[test]
fn poll_after_done_is_an_error() {
    let mut accel = connect(fake(Protocol::CommaText));
    let mut acq = accel.begin_acquisition(10).unwrap();
    let mut done = false;
    for _ in 0..100 {
        if let AcquisitionStatus::Done(batch) = accel.poll(&mut acq).unwrap() {
            assert_eq!(batch.len(), 10);
            done = true;
            break;
        }
    }
    assert!(done, "Acquisition never finished");
    assert!(acq.is_complete());
    assert!(acq.is_finished());
    assert_eq!(acq.collected(), 10);

    let sent = accel.get_ref().commands().len();
    assert_matches!(accel.poll(&mut acq), Err(Error::AcquisitionFinished));
    assert_eq!(accel.get_ref().commands().len(), sent);
    assert_eq!(accel.state(), StreamState::Idle);
}

#[test]
fn session_debug_output() {
    let accel = connect(fake(Protocol::Binary));
    let debug = format!("{accel:?}");
    assert!(debug.starts_with("Accelerometer"), "{debug}");
    assert!(debug.contains("Binary"), "{debug}");
}
