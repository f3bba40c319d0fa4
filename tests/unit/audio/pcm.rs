use super::*;

fn write_wav(path: &Path, rate: u32, channels: u16, frames: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec).unwrap();
    for &s in frames {
        for _ in 0..channels {
            w.write_sample(s).unwrap();
        }
    }
    w.finalize().unwrap();
}

#[test]
fn in_memory_zero_pads_past_end() {
    let mut src = InMemoryPcm::new(8, vec![1.0, 2.0, 3.0]);
    assert_eq!(src.read_window(1, 4).unwrap(), vec![2.0, 3.0, 0.0, 0.0]);
    assert_eq!(src.read_window(10, 2).unwrap(), vec![0.0, 0.0]);
}

#[test]
fn wav_source_seeks_and_downmixes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    let frames: Vec<i16> = (0..100).map(|i| (i * 100) as i16).collect();
    write_wav(&path, 8000, 2, &frames);

    let mut src = WavPcmSource::open(&path).unwrap();
    assert_eq!(src.sample_rate(), 8000);
    assert_eq!(src.len_frames(), 100);

    let w = src.read_window(10, 4).unwrap();
    let expect = |i: i32| (i * 100) as f32 / 32768.0;
    assert_eq!(w, vec![expect(10), expect(11), expect(12), expect(13)]);

    let tail = src.read_window(98, 4).unwrap();
    assert_eq!(tail[..2], [expect(98), expect(99)]);
    assert_eq!(tail[2..], [0.0, 0.0]);
}

#[test]
fn matching_wav_is_read_without_ffmpeg() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mono.wav");
    write_wav(&path, 16_000, 1, &[1000; 32]);
    let tools = MediaTools::new(dir.path().join("no-ffmpeg"), dir.path().join("no-ffprobe"));
    let mut src = open_pcm_source(&tools, &path, 16_000).unwrap();
    assert_eq!(src.read_window(0, 2).unwrap(), vec![1000.0 / 32768.0; 2]);
}

#[test]
fn missing_path_is_input_missing() {
    let err = open_pcm_source(&MediaTools::default(), Path::new("nope/x.wav"), 44_100)
        .err()
        .unwrap();
    assert_eq!(err.kind(), crate::foundation::error::ErrorKind::InputMissing);
}
