//! Header-only metadata recovery on complete files.

mod support;

use support::codestream;
use texj2k_rs::header::HeaderParser;
use texj2k_rs::{J2kMarker, get_metadata, parse_header};

/// SOC, SIZ, COM, QCD, COD, then a tile with a few entropy bytes.
fn full_main_header() -> Vec<u8> {
    let mut data = codestream(256, 128, 3);
    data.truncate(data.len() - 2);

    data.extend_from_slice(&[0xFF, 0x64, 0x00, 0x09, 0x00, 0x01]);
    data.extend_from_slice(b"texj2");
    data.extend_from_slice(&[0xFF, 0x5C, 0x00, 0x04, 0x22, 0x00]);
    data.extend_from_slice(&[
        0xFF, 0x52, 0x00, 0x0C, 0x00, 0x01, 0x00, 0x05, 0x01, 0x05, 0x04, 0x04, 0x00, 0x00,
    ]);
    data.extend_from_slice(&[0xFF, 0x90, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x20, 0x00, 0x01]);
    data.extend_from_slice(&[0xFF, 0x93, 0xC0, 0x01, 0x02, 0xFF, 0xD9]);
    data
}

fn jp2_box(box_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut b = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
    b.extend_from_slice(box_type);
    b.extend_from_slice(payload);
    b
}

#[test]
fn test_full_header_fields() {
    let descriptor = parse_header(&full_main_header());
    assert!(descriptor.valid);
    assert_eq!((descriptor.width, descriptor.height), (256, 128));
    assert_eq!(descriptor.component_count, 3);
    assert_eq!(descriptor.component_precision_bits, 8);
    assert_eq!(descriptor.comments, vec!["texj2".to_string()]);
    assert_eq!(descriptor.quantization_style, Some(0x22));

    let cod = descriptor.coding_style.expect("COD");
    assert_eq!(cod.progression_order, 1);
    assert_eq!(cod.number_of_layers, 5);
    assert_eq!(cod.mct, 1);
    assert_eq!(cod.decomposition_levels, 5);
    assert_eq!(cod.codeblock_width_exp, 4);
    // COD ends the walk, so the tile part is never reached.
    assert!(descriptor.tile_parts.is_empty());
}

#[test]
fn test_walk_visits_segments_in_order() {
    let mut seen = Vec::new();
    HeaderParser::new(&full_main_header()).parse_with(|segment| seen.push(segment.marker()));
    assert_eq!(
        seen,
        [
            Some(J2kMarker::StartOfCodestream),
            Some(J2kMarker::ImageAndTileSize),
            Some(J2kMarker::Comment),
            Some(J2kMarker::QuantizationDefault),
            Some(J2kMarker::CodingStyleDefault),
        ]
    );
}

#[test]
fn test_jp2_file_is_unwrapped() {
    let mut file = b"\x00\x00\x00\x0CjP  \r\n\x87\n".to_vec();
    file.extend(jp2_box(b"ftyp", b"jp2 \x00\x00\x00\x00jp2 "));
    file.extend(jp2_box(b"jp2h", &[0u8; 16]));
    file.extend(jp2_box(b"jp2c", &full_main_header()));

    let descriptor = get_metadata(&file);
    assert!(descriptor.valid);
    assert_eq!((descriptor.width, descriptor.height), (256, 128));
    assert_eq!(descriptor.component_count, 3);
}

#[test]
fn test_image_offset_is_subtracted() {
    let mut data = codestream(256, 128, 1);
    // XOsiz and YOsiz.
    data[16..20].copy_from_slice(&6u32.to_be_bytes());
    data[20..24].copy_from_slice(&8u32.to_be_bytes());
    let descriptor = get_metadata(&data);
    assert!(descriptor.valid);
    assert_eq!((descriptor.width, descriptor.height), (250, 120));
}
