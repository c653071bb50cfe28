//! Encode/decode orchestration over in-memory and raw-file sources and sinks.

mod common;

use std::fs;
use std::path::Path;

use common::assertions::{assert_frame_size, assert_solid};
use common::file_sink::RawFileSink;
use common::mock_audio::{AudioCall, RecordingAudio};
use common::test_frames::{create_gradient_frame, create_solid_frame, TEAL};
use tempfile::tempdir;
use vcompress::codec::CodecRegistry;
use vcompress::config::{CompressionConfig, DecoderConfig, EncoderConfig};
use vcompress::container::CompressedContainer;
use vcompress::frame::FrameKind;
use vcompress::media::{MemoryFrameSink, MemoryFrameSource};
use vcompress::pipeline::{DecodePipeline, EncodePipeline, PipelineState};

fn encoder_config(dir: &Path, algorithm: &str, compression: CompressionConfig) -> EncoderConfig {
    EncoderConfig::new(dir.join("input.mp4"), dir.join("data.vcomp"), algorithm, compression)
        .with_audio(false, dir.join("audio.aac"))
}

/// Encode `count` solid 16x16 frames at quality 100 without audio.
fn encode_solid(dir: &Path, registry: &CodecRegistry, count: usize) {
    let mut encoder = EncodePipeline::new();
    encoder
        .configure(registry, encoder_config(dir, "Bilinear", CompressionConfig::new(100, 30)))
        .unwrap();
    encoder
        .run(&mut MemoryFrameSource::solid(16, 16, 30.0, count, TEAL))
        .unwrap();
}

fn decoder_config(dir: &Path, algorithm: &str, compression: CompressionConfig) -> DecoderConfig {
    DecoderConfig::new(dir.join("data.vcomp"), dir.join("output.mp4"), algorithm, compression)
        .with_audio(false, dir.join("audio.aac"))
        .with_temp_video(dir.join("temp_video.mp4"))
}

#[test]
fn solid_stream_round_trips_with_key_schedule() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();
    let compression = CompressionConfig::new(100, 5);

    let mut encoder = EncodePipeline::new();
    assert_eq!(encoder.state(), PipelineState::Unconfigured);
    encoder
        .configure(&registry, encoder_config(dir.path(), "Bilinear", compression))
        .unwrap();
    assert_eq!(encoder.state(), PipelineState::Configured);

    let mut source = MemoryFrameSource::solid(64, 48, 30.0, 10, TEAL);
    let stats = encoder.run(&mut source).unwrap();
    assert_eq!(encoder.state(), PipelineState::Completed);
    assert_eq!(stats.frames_processed, 10);
    assert_eq!(stats.raw_bytes, 10 * 64 * 48 * 3);
    assert_eq!(stats.compressed_bytes, 10 * (8 + 32 * 24 * 3));

    // Inspect the container directly.
    let mut container = CompressedContainer::new();
    let header = container.open_read(dir.path().join("data.vcomp")).unwrap();
    assert_eq!(
        (header.orig_width, header.orig_height, header.fps_millihertz, header.algorithm_id),
        (64, 48, 30000, 2)
    );
    let mut kinds = Vec::new();
    while let Some(record) = container.read_record().unwrap() {
        kinds.push(record.kind);
    }
    container.close().unwrap();
    use FrameKind::{Delta as D, Key as K};
    assert_eq!(kinds, [K, D, D, D, D, K, D, D, D, D]);

    let mut decoder = DecodePipeline::new();
    decoder
        .configure(&registry, decoder_config(dir.path(), "Bilinear", compression))
        .unwrap();
    let mut sink = MemoryFrameSink::new();
    let stats = decoder.run(&mut sink).unwrap();
    assert_eq!(decoder.state(), PipelineState::Completed);
    assert_eq!(stats.frames_processed, 10);
    assert_eq!(sink.fps, Some(30.0));
    assert_eq!(sink.closes, 1);

    assert_eq!(sink.frames.len(), 10);
    for (i, frame) in sink.frames.iter().enumerate() {
        assert_frame_size(frame, 64, 48);
        assert_solid(frame, TEAL);
        assert_eq!(frame.sequence_number, i as i32);
        assert_eq!(frame.kind, kinds[i]);
    }

    // Temp files are cleaned up by default.
    assert!(!dir.path().join("data.vcomp").exists());
    assert!(decoder.report().contains("Decoding Statistics"));
    assert!(encoder.report().contains("Codec Bilinear (id 2)"));
}

#[test]
fn keep_temp_files_leaves_container() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();
    let compression = CompressionConfig::default();

    let mut encoder = EncodePipeline::new();
    encoder
        .configure(&registry, encoder_config(dir.path(), "Reference", compression))
        .unwrap();
    encoder
        .run(&mut MemoryFrameSource::new(vec![create_gradient_frame(40, 30); 3], 24.0))
        .unwrap();

    let mut decoder = DecodePipeline::new();
    decoder
        .configure(
            &registry,
            decoder_config(dir.path(), "Reference", compression).keep_temp_files(true),
        )
        .unwrap();
    let mut sink = MemoryFrameSink::new();
    decoder.run(&mut sink).unwrap();

    assert_eq!(sink.frames.len(), 3);
    assert!(dir.path().join("data.vcomp").exists());
}

#[test]
fn audio_is_extracted_and_cleaned_up() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();
    let compression = CompressionConfig::default();
    let audio = RecordingAudio::new();
    let audio_path = dir.path().join("audio.aac");

    let mut encoder = EncodePipeline::with_audio_toolkit(Box::new(audio.clone()));
    encoder
        .configure(
            &registry,
            encoder_config(dir.path(), "Bilinear", compression).with_audio(true, &audio_path),
        )
        .unwrap();
    encoder
        .run(&mut MemoryFrameSource::solid(16, 16, 30.0, 2, TEAL))
        .unwrap();
    assert_eq!(
        audio.calls(),
        vec![AudioCall::Extract {
            input: dir.path().join("input.mp4"),
            output: audio_path.clone(),
        }]
    );
    assert!(audio_path.exists());

    let mut decoder = DecodePipeline::with_audio_toolkit(Box::new(audio.clone()));
    decoder
        .configure(
            &registry,
            decoder_config(dir.path(), "Bilinear", compression).with_audio(true, &audio_path),
        )
        .unwrap();
    decoder.run(&mut MemoryFrameSink::new()).unwrap();

    // The memory sink writes no video file, so nothing is muxed.
    assert_eq!(audio.calls().len(), 1);
    assert!(!audio_path.exists());
}

#[test]
fn audio_failure_fails_the_encode() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();

    let mut encoder = EncodePipeline::with_audio_toolkit(Box::new(RecordingAudio::failing()));
    encoder
        .configure(
            &registry,
            encoder_config(dir.path(), "Bilinear", CompressionConfig::default())
                .with_audio(true, dir.path().join("audio.aac")),
        )
        .unwrap();
    let err = encoder
        .run(&mut MemoryFrameSource::solid(16, 16, 30.0, 2, TEAL))
        .unwrap_err();
    assert_eq!(err.category(), "external");
    assert_eq!(encoder.state(), PipelineState::Failed);
}

#[test]
fn unknown_algorithm_keeps_pipeline_unconfigured() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();

    let mut encoder = EncodePipeline::new();
    let err = encoder
        .configure(&registry, encoder_config(dir.path(), "Wavelet", CompressionConfig::default()))
        .unwrap_err();
    assert_eq!(err.category(), "config");
    assert_eq!(encoder.state(), PipelineState::Unconfigured);
    assert!(encoder.codec().is_none());

    let err = encoder
        .run(&mut MemoryFrameSource::solid(4, 4, 30.0, 1, TEAL))
        .unwrap_err();
    assert_eq!(err.category(), "state");
}

#[test]
fn invalid_quality_keeps_pipeline_unconfigured() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();

    let mut decoder = DecodePipeline::new();
    let err = decoder
        .configure(&registry, decoder_config(dir.path(), "Bilinear", CompressionConfig::new(101, 30)))
        .unwrap_err();
    assert_eq!(err.category(), "config");
    assert_eq!(decoder.state(), PipelineState::Unconfigured);
    assert_eq!(
        decoder.run(&mut MemoryFrameSink::new()).unwrap_err().category(),
        "state"
    );
}

#[test]
fn mismatched_frame_fails_the_encode() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();

    let frames = vec![
        create_solid_frame(32, 32, TEAL),
        create_solid_frame(32, 32, TEAL),
        create_solid_frame(16, 16, TEAL),
    ];
    let mut encoder = EncodePipeline::new();
    encoder
        .configure(&registry, encoder_config(dir.path(), "Bilinear", CompressionConfig::default()))
        .unwrap();
    let err = encoder
        .run(&mut MemoryFrameSource::new(frames, 30.0))
        .unwrap_err();

    assert_eq!(err.category(), "format");
    assert_eq!(encoder.state(), PipelineState::Failed);
    assert_eq!(encoder.stats().frames_processed, 2);

    // Partial output stays on disk and holds the frames written so far.
    let mut container = CompressedContainer::new();
    container.open_read(dir.path().join("data.vcomp")).unwrap();
    assert!(container.read_record().unwrap().is_some());
    assert!(container.read_record().unwrap().is_some());
    assert!(container.read_record().unwrap().is_none());

    // A failed pipeline can be configured again.
    encoder
        .configure(&registry, encoder_config(dir.path(), "Bilinear", CompressionConfig::default()))
        .unwrap();
    assert_eq!(encoder.state(), PipelineState::Configured);
}

#[test]
fn truncated_container_fails_the_decode() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();
    let compression = CompressionConfig::new(50, 30);

    let mut encoder = EncodePipeline::new();
    encoder
        .configure(&registry, encoder_config(dir.path(), "Bilinear", compression))
        .unwrap();
    encoder
        .run(&mut MemoryFrameSource::solid(30, 30, 30.0, 4, TEAL))
        .unwrap();

    let path = dir.path().join("data.vcomp");
    let len = std::fs::metadata(&path).unwrap().len();
    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(len - 10).unwrap();
    drop(file);

    let mut decoder = DecodePipeline::new();
    decoder
        .configure(&registry, decoder_config(dir.path(), "Bilinear", compression))
        .unwrap();
    let mut sink = MemoryFrameSink::new();
    let err = decoder.run(&mut sink).unwrap_err();

    assert_eq!(err.category(), "format");
    assert_eq!(decoder.state(), PipelineState::Failed);
    assert_eq!(sink.frames.len(), 3);
    assert_eq!(sink.closes, 1);
    // Nothing is cleaned up after a failure.
    assert!(path.exists());
}

#[test]
fn decoding_with_another_variant_still_works() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();
    let compression = CompressionConfig::new(100, 30);

    let mut encoder = EncodePipeline::new();
    encoder
        .configure(&registry, encoder_config(dir.path(), "Reference", compression))
        .unwrap();
    encoder
        .run(&mut MemoryFrameSource::solid(24, 24, 30.0, 2, TEAL))
        .unwrap();

    let mut decoder = DecodePipeline::new();
    decoder
        .configure(&registry, decoder_config(dir.path(), "Bilinear", compression))
        .unwrap();
    let mut sink = MemoryFrameSink::new();
    decoder.run(&mut sink).unwrap();
    assert_eq!(sink.frames.len(), 2);
    assert_frame_size(&sink.frames[0], 24, 24);
}

#[test]
fn completed_pipeline_needs_reconfiguring() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();

    let mut encoder = EncodePipeline::new();
    encoder
        .configure(&registry, encoder_config(dir.path(), "Bilinear", CompressionConfig::default()))
        .unwrap();
    encoder
        .run(&mut MemoryFrameSource::solid(8, 8, 30.0, 1, TEAL))
        .unwrap();
    let err = encoder
        .run(&mut MemoryFrameSource::solid(8, 8, 30.0, 1, TEAL))
        .unwrap_err();
    assert_eq!(err.category(), "state");
    assert_eq!(encoder.state(), PipelineState::Completed);
}

#[test]
fn decode_ratio_is_raw_over_compressed() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();
    encode_solid(dir.path(), &registry, 3);

    let mut decoder = DecodePipeline::new();
    decoder
        .configure(
            &registry,
            decoder_config(dir.path(), "Bilinear", CompressionConfig::new(100, 30)),
        )
        .unwrap();
    let stats = decoder.run(&mut MemoryFrameSink::new()).unwrap();

    // 16x16x3 raw bytes against an 8-byte header plus 8x8x3 pixels.
    assert_eq!(stats.raw_bytes, 3 * 768);
    assert_eq!(stats.compressed_bytes, 3 * 200);
    assert!(stats.avg_compression_ratio() > 1.0);
    assert!((stats.avg_compression_ratio() - 3.84).abs() < 1e-9);
}

#[test]
fn decoded_video_is_muxed_with_audio() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();
    encode_solid(dir.path(), &registry, 2);
    let audio_path = dir.path().join("audio.aac");
    fs::write(&audio_path, b"aac").unwrap();

    let audio = RecordingAudio::new();
    let mut decoder = DecodePipeline::with_audio_toolkit(Box::new(audio.clone()));
    decoder
        .configure(
            &registry,
            decoder_config(dir.path(), "Bilinear", CompressionConfig::new(100, 30))
                .with_audio(true, &audio_path),
        )
        .unwrap();
    let mut sink = RawFileSink::new();
    decoder.run(&mut sink).unwrap();

    assert_eq!(sink.frames, 2);
    assert_eq!(sink.path, Some(dir.path().join("temp_video.mp4")));
    assert_eq!(
        audio.calls(),
        vec![AudioCall::Mux {
            video: dir.path().join("temp_video.mp4"),
            audio: audio_path.clone(),
            output: dir.path().join("output.mp4"),
        }]
    );
    assert!(dir.path().join("output.mp4").exists());
    assert!(!dir.path().join("temp_video.mp4").exists());
    assert!(!audio_path.exists());
    assert!(!dir.path().join("data.vcomp").exists());
}

#[test]
fn decoded_video_is_renamed_without_audio() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();
    encode_solid(dir.path(), &registry, 2);

    let audio = RecordingAudio::new();
    let mut decoder = DecodePipeline::with_audio_toolkit(Box::new(audio.clone()));
    decoder
        .configure(
            &registry,
            decoder_config(dir.path(), "Bilinear", CompressionConfig::new(100, 30)),
        )
        .unwrap();
    decoder.run(&mut RawFileSink::new()).unwrap();

    assert!(audio.calls().is_empty());
    assert!(!dir.path().join("temp_video.mp4").exists());
    let output = fs::read(dir.path().join("output.mp4")).unwrap();
    assert_eq!(output.len(), 2 * 16 * 16 * 3);
}

#[test]
fn mux_failure_fails_the_decode() {
    let dir = tempdir().unwrap();
    let registry = CodecRegistry::with_builtin_codecs();
    encode_solid(dir.path(), &registry, 2);
    let audio_path = dir.path().join("audio.aac");
    fs::write(&audio_path, b"aac").unwrap();

    let mut decoder = DecodePipeline::with_audio_toolkit(Box::new(RecordingAudio::failing()));
    decoder
        .configure(
            &registry,
            decoder_config(dir.path(), "Bilinear", CompressionConfig::new(100, 30))
                .with_audio(true, &audio_path),
        )
        .unwrap();
    let err = decoder.run(&mut RawFileSink::new()).unwrap_err();

    assert_eq!(err.category(), "external");
    assert_eq!(decoder.state(), PipelineState::Failed);
    assert!(!dir.path().join("output.mp4").exists());
    // Inputs stay behind for a retry.
    assert!(dir.path().join("temp_video.mp4").exists());
    assert!(dir.path().join("data.vcomp").exists());
    assert!(audio_path.exists());
}
