//! Round-trip and stream-format tests for both engines
//!
//! These tests drive the public API the way an embedding application would:
//! in-memory helpers, streaming writers and readers, and hand-built regions.

use metazip::{
    compress_bytes, decompress_bytes, lz_compress_bytes, lz_decompress_bytes, CompressEngine,
    DecompressEngine, EngineKind, LzParams, LzReader, LzWriter, MetazipError, StreamReader,
    StreamWriter, PRIMING_PREAMBLE, WINDOW_SIZE,
};
use std::io::{Read, Write};

const ENGINES: [EngineKind; 2] = [EngineKind::Lz, EngineKind::Deflate];

/// Deterministic xorshift bytes
fn noise(len: usize, mut seed: u32) -> Vec<u8> {
    (0..len)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            (seed >> 24) as u8
        })
        .collect()
}

/// Noise interleaved with copies of earlier blocks, spanning several windows
fn metafile_like(len: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(len);
    let mut round = 0u32;
    while data.len() < len {
        round += 1;
        data.extend_from_slice(&noise(700, round));
        if data.len() > 40_000 {
            let from = data.len() - 40_000;
            let block: Vec<u8> = data[from..from + 900].to_vec();
            data.extend_from_slice(&block);
        }
        data.extend_from_slice(format!("(Polyline 2 {},{} 0,0)", round, round * 3).as_bytes());
    }
    data.truncate(len);
    data
}

#[test]
fn test_round_trip_inputs() -> Result<(), Box<dyn std::error::Error>> {
    let inputs: Vec<Vec<u8>> = vec![
        Vec::new(),
        vec![0x42],
        b"Hello, World!".to_vec(),
        b"AB".repeat(50),
        vec![0u8; 70_000],
        noise(100_000, 7),
        metafile_like(300_000),
        PRIMING_PREAMBLE.to_vec(),
    ];

    for engine in ENGINES {
        for input in &inputs {
            let compressed = compress_bytes(input, engine)?;
            assert_eq!(compressed[0], engine.marker());
            let decompressed = decompress_bytes(&compressed)?;
            assert_eq!(decompressed.len(), input.len(), "{} engine", engine);
            assert!(decompressed == *input, "{} engine altered data", engine);
        }
    }
    Ok(())
}

#[test]
fn test_concrete_token_stream() -> Result<(), Box<dyn std::error::Error>> {
    let compressed = compress_bytes(&[1, 2, 3, 1, 2, 3, 1, 2, 3, 9], EngineKind::Lz)?;
    // marker, literal 1 2 3, match length 6 offset 3, literal 9, end
    assert_eq!(hex::encode(&compressed), "4c03010203830200010900");
    Ok(())
}

#[test]
fn test_overlapping_matches() -> Result<(), Box<dyn std::error::Error>> {
    let data = b"AB".repeat(50);
    let tokens = lz_compress_bytes(&data, LzParams::default())?;
    assert_eq!(hex::encode(&tokens[..3]), "024142");
    // One match covers the remaining 98 bytes at offset 2
    assert_eq!(hex::encode(&tokens[3..]), "df010000");
    assert_eq!(lz_decompress_bytes(&tokens)?, data);
    Ok(())
}

#[test]
fn test_window_eviction() -> Result<(), Box<dyn std::error::Error>> {
    let data = vec![0u8; 70_000];
    let mut writer = LzWriter::new(Vec::new());
    writer.write_all(&data)?;
    writer.stop()?;
    let stats = writer.stats();
    let tokens = writer.finish()?;

    assert!(tokens.len() < 2_000);
    assert!(stats.match_count > 70_000 / 270);
    assert_eq!(lz_decompress_bytes(&tokens)?, data);
    Ok(())
}

#[test]
fn test_arbitrary_write_chunking() -> Result<(), Box<dyn std::error::Error>> {
    let data = metafile_like(2 * WINDOW_SIZE + 1234);

    for engine in ENGINES {
        let mut writer = StreamWriter::new(Vec::new(), engine);
        let mut sizes = [1usize, 3, 4, 17, 255, 4096, 9000].iter().cycle();
        let mut rest = &data[..];
        while !rest.is_empty() {
            let take = (*sizes.next().unwrap()).min(rest.len());
            writer.write_all(&rest[..take])?;
            rest = &rest[take..];
        }
        let chunked = writer.finish()?;

        assert_eq!(decompress_bytes(&chunked)?, data);
    }
    Ok(())
}

#[test]
fn test_small_output_reads() -> Result<(), Box<dyn std::error::Error>> {
    let data = metafile_like(50_000);
    for engine in ENGINES {
        let compressed = compress_bytes(&data, engine)?;
        let mut reader = StreamReader::new(compressed.as_slice());
        reader.start()?;

        let mut output = Vec::new();
        let mut buf = [0u8; 7];
        loop {
            let count = reader.decompress(&mut buf)?;
            if count == 0 {
                break;
            }
            output.extend_from_slice(&buf[..count]);
        }
        assert_eq!(output, data);
        assert_eq!(reader.stats().bytes_in as usize, data.len());
    }
    Ok(())
}

#[test]
fn test_determinism() -> Result<(), Box<dyn std::error::Error>> {
    let data = metafile_like(120_000);
    for engine in ENGINES {
        assert_eq!(compress_bytes(&data, engine)?, compress_bytes(&data, engine)?);
    }
    Ok(())
}

#[test]
fn test_preamble_primes_the_window() -> Result<(), Box<dyn std::error::Error>> {
    let data = b"(DWF V06.00)(W2D V06.00)(LineWeight 0)(LinePattern Solid)";
    let tokens = lz_compress_bytes(data, LzParams::default())?;
    assert!(tokens.len() < data.len() / 3);
    assert_eq!(lz_decompress_bytes(&tokens)?, data);
    Ok(())
}

#[test]
fn test_consecutive_regions() -> Result<(), Box<dyn std::error::Error>> {
    let mut stream = compress_bytes(b"first region first region", EngineKind::Lz)?;
    stream.extend(compress_bytes(b"second region", EngineKind::Deflate)?);

    let mut reader = StreamReader::new(stream.as_slice());
    let mut first = Vec::new();
    reader.read_to_end(&mut first)?;
    assert_eq!(first, b"first region first region");

    let rest = reader.unconsumed().to_vec();
    assert_eq!(decompress_bytes(&rest)?, b"second region");
    Ok(())
}

#[test]
fn test_consecutive_large_regions() -> Result<(), Box<dyn std::error::Error>> {
    let first = noise(30_000, 11);
    let second = metafile_like(60_000);

    for (first_engine, second_engine) in [
        (EngineKind::Lz, EngineKind::Deflate),
        (EngineKind::Deflate, EngineKind::Lz),
    ] {
        let mut stream = compress_bytes(&first, first_engine)?;
        stream.extend(compress_bytes(&second, second_engine)?);

        let mut reader = StreamReader::new(stream.as_slice());
        let mut output = Vec::new();
        reader.read_to_end(&mut output)?;
        assert_eq!(output, first);
        assert!(reader.is_finished());

        // Buffered bytes first, then whatever the source still holds
        let buffered = reader.unconsumed().to_vec();
        let source = reader.into_inner().ok_or("source was lost")?;
        let mut next = StreamReader::new(buffered.as_slice().chain(source));
        let mut output = Vec::new();
        next.read_to_end(&mut output)?;
        assert_eq!(output, second);
        assert_eq!(next.kind(), Some(second_engine));
    }
    Ok(())
}

#[test]
fn test_bare_lz_reader() -> Result<(), Box<dyn std::error::Error>> {
    let data = b"bare token stream, bare token stream".to_vec();
    let tokens = lz_compress_bytes(&data, LzParams::default())?;

    let mut reader = LzReader::new(tokens.as_slice());
    let mut output = Vec::new();
    reader.read_to_end(&mut output)?;
    assert_eq!(output, data);
    assert!(reader.is_finished());
    Ok(())
}

#[test]
fn test_invalid_offset_is_rejected() {
    let mut region = vec![b'L', 0x80];
    region.extend_from_slice(&(PRIMING_PREAMBLE.len() as u16).to_le_bytes());
    region.push(0x00);
    assert!(matches!(
        decompress_bytes(&region),
        Err(MetazipError::InvalidOffset { .. })
    ));
}

#[test]
fn test_truncated_regions() -> Result<(), Box<dyn std::error::Error>> {
    let data = metafile_like(20_000);
    for engine in ENGINES {
        let compressed = compress_bytes(&data, engine)?;
        let truncated = &compressed[..compressed.len() - 1];
        let err = decompress_bytes(truncated).unwrap_err();
        assert!(err.is_corruption(), "{} engine: {:?}", engine, err);
    }
    Ok(())
}

#[test]
fn test_unknown_engine_marker() {
    assert!(matches!(
        decompress_bytes(&[0x5A, 0x00]),
        Err(MetazipError::UnknownEngine(0x5A))
    ));
    assert!(matches!(
        decompress_bytes(&[]),
        Err(MetazipError::UnexpectedEof)
    ));
}

#[test]
fn test_corrupt_deflate_payload() -> Result<(), Box<dyn std::error::Error>> {
    let mut compressed = compress_bytes(&metafile_like(10_000), EngineKind::Deflate)?;
    // Break the zlib header checksum
    compressed[2] ^= 0xFF;
    assert!(matches!(
        decompress_bytes(&compressed),
        Err(MetazipError::CorruptStream(_))
    ));
    Ok(())
}

#[test]
fn test_usage_errors() {
    let mut writer = StreamWriter::new(Vec::new(), EngineKind::Lz);
    assert!(matches!(
        writer.compress(b"early"),
        Err(MetazipError::Usage(_))
    ));

    let mut reader = StreamReader::new(&b"L\x00"[..]);
    let mut buf = [0u8; 8];
    assert!(matches!(
        reader.decompress(&mut buf),
        Err(MetazipError::Usage(_))
    ));
}

#[test]
fn test_invalid_parameters() {
    let params = LzParams {
        max_literal_run: 0,
        ..LzParams::default()
    };
    assert!(matches!(
        LzWriter::with_params(Vec::new(), params),
        Err(MetazipError::InvalidParameter(_))
    ));
    let params = LzParams {
        max_match_length: 2,
        ..LzParams::default()
    };
    assert!(matches!(
        lz_compress_bytes(b"x", params),
        Err(MetazipError::InvalidParameter(_))
    ));
}
