//! WAV loader tests
//!
//! Fixtures are synthesised with hound into a temporary directory so no
//! binary files live in the repository.

mod common;

use common::{float_spec, int_spec, write_wav};
use cpal::SampleFormat;
use syncloop_player::audio::{load_wav, LoadedSamples};
use syncloop_player::Error;
use tempfile::TempDir;

#[test]
fn test_16_bit_mono_loads_natively() {
    let dir = TempDir::new().unwrap();
    let path = write_wav(&dir, "mono16.wav", int_spec(1, 44_100, 16), 441, |i| i as i16);

    let audio = load_wav(&path).unwrap();
    assert_eq!(audio.frames(), 441);
    assert_eq!(audio.channels(), 1);
    assert_eq!(audio.sample_rate(), 44_100);
    assert_eq!(audio.bits_per_sample, 16);
    assert_eq!(audio.sample_format(), SampleFormat::I16);
    assert!((audio.duration_secs() - 0.01).abs() < 1e-9);

    match &audio.samples {
        LoadedSamples::I16(buffer) => {
            assert_eq!(buffer.frame(0), &[0]);
            assert_eq!(buffer.frame(440), &[440]);
        }
        other => panic!("expected i16 samples, got {:?}", other),
    }
}

#[test]
fn test_stereo_counts_frames_not_samples() {
    let dir = TempDir::new().unwrap();
    let path = write_wav(&dir, "stereo.wav", int_spec(2, 48_000, 16), 960, |i| {
        if i % 2 == 0 { 1000i16 } else { -1000 }
    });

    let audio = load_wav(&path).unwrap();
    assert_eq!(audio.channels(), 2);
    assert_eq!(audio.frames(), 480);

    let LoadedSamples::I16(buffer) = &audio.samples else {
        panic!("expected i16 samples");
    };
    assert_eq!(buffer.frame(10), &[1000, -1000]);
}

#[test]
fn test_8_bit_loads_as_i8() {
    let dir = TempDir::new().unwrap();
    let path = write_wav(&dir, "eight.wav", int_spec(1, 8_000, 8), 80, |i| (i as i8).wrapping_sub(40));

    let audio = load_wav(&path).unwrap();
    assert_eq!(audio.sample_format(), SampleFormat::I8);
    assert_eq!(audio.bits_per_sample, 8);

    let LoadedSamples::I8(buffer) = &audio.samples else {
        panic!("expected i8 samples");
    };
    assert_eq!(buffer.frame(0), &[-40]);
    assert_eq!(buffer.frame(79), &[39]);
}

#[test]
fn test_24_bit_scaled_to_full_range() {
    let dir = TempDir::new().unwrap();
    let path = write_wav(&dir, "deep.wav", int_spec(1, 96_000, 24), 3, |i| match i {
        0 => 8_388_607i32,
        1 => -8_388_608,
        _ => 1,
    });

    let audio = load_wav(&path).unwrap();
    assert_eq!(audio.sample_format(), SampleFormat::I32);
    assert_eq!(audio.bits_per_sample, 24);

    let LoadedSamples::I32(buffer) = &audio.samples else {
        panic!("expected i32 samples");
    };
    assert_eq!(buffer.samples(), &[8_388_607 << 8, i32::MIN, 256]);
}

#[test]
fn test_32_bit_int_and_float() {
    let dir = TempDir::new().unwrap();
    let int_path = write_wav(&dir, "int32.wav", int_spec(1, 44_100, 32), 4, |i| i as i32 * 1_000_000);
    let float_path = write_wav(&dir, "float.wav", float_spec(2, 44_100), 4, |i| i as f32 * 0.25);

    let int_audio = load_wav(&int_path).unwrap();
    assert_eq!(int_audio.sample_format(), SampleFormat::I32);
    assert_eq!(int_audio.frames(), 4);

    let float_audio = load_wav(&float_path).unwrap();
    assert_eq!(float_audio.sample_format(), SampleFormat::F32);
    assert_eq!(float_audio.frames(), 2);
    let LoadedSamples::F32(buffer) = &float_audio.samples else {
        panic!("expected f32 samples");
    };
    assert_eq!(buffer.frame(1), &[0.5, 0.75]);
}

#[test]
fn test_empty_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_wav(&dir, "empty.wav", int_spec(1, 44_100, 16), 0, |_| 0i16);

    assert!(matches!(load_wav(&path), Err(Error::EmptySampleBuffer)));
}

#[test]
fn test_missing_and_garbage_files() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(load_wav(dir.path().join("absent.wav")), Err(Error::Load(_))));

    let garbage = dir.path().join("garbage.wav");
    std::fs::write(&garbage, b"definitely not RIFF data").unwrap();
    assert!(matches!(load_wav(&garbage), Err(Error::Load(_))));
}

#[test]
fn test_conversion_for_device_format() {
    let dir = TempDir::new().unwrap();
    let path = write_wav(&dir, "convert.wav", int_spec(2, 44_100, 16), 4, |i| match i {
        0 => i16::MIN,
        1 => 0,
        2 => 16_384,
        _ => i16::MAX,
    });

    let audio = load_wav(&path).unwrap();
    let converted = audio.samples.to_buffer::<f32>();

    assert_eq!(converted.frames(), 2);
    assert_eq!(converted.channels(), 2);
    assert_eq!(converted.sample_rate(), 44_100);
    assert_eq!(converted.frame(0), &[-1.0, 0.0]);
    assert_eq!(converted.frame(1)[0], 0.5);
}
