use fdstool_lib::loader::{LOADER_SCAN_BOUND, LOADER_SIGNATURE, detect_loader};

fn buffer_with_signature_at(offset: usize, version: u8, total_len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; total_len];
    buf[offset..offset + LOADER_SIGNATURE.len()].copy_from_slice(LOADER_SIGNATURE);
    buf[offset + LOADER_SIGNATURE.len()] = version;
    buf
}

#[test]
fn signature_at_offset_100_decodes_version() {
    let buf = buffer_with_signature_at(100, 151, 4096);
    let info = detect_loader(&buf).unwrap();
    assert_eq!(info.offset, 100);
    assert_eq!(info.major, 1);
    assert_eq!(info.minor, 51);
    assert_eq!(info.to_string(), "1.51");
}

#[test]
fn strict_prefix_of_signature_does_not_match() {
    let mut buf = vec![0u8; 4096];
    // Everything but the final signature byte.
    let prefix = &LOADER_SIGNATURE[..LOADER_SIGNATURE.len() - 1];
    buf[10..10 + prefix.len()].copy_from_slice(prefix);
    assert!(detect_loader(&buf).is_none());
}

#[test]
fn repeated_first_byte_does_not_confuse_the_scan() {
    let mut buf = vec![LOADER_SIGNATURE[0]; 1024];
    assert!(detect_loader(&buf).is_none());

    // A real signature after the noise is still found.
    buf.extend_from_slice(LOADER_SIGNATURE);
    buf.push(203);
    let info = detect_loader(&buf).unwrap();
    assert_eq!(info.offset, 1024);
    assert_eq!((info.major, info.minor), (2, 3));
}

#[test]
fn signature_starting_past_the_scan_bound_is_ignored() {
    let buf = buffer_with_signature_at(LOADER_SCAN_BOUND, 100, LOADER_SCAN_BOUND + 100);
    assert!(detect_loader(&buf).is_none());
}

#[test]
fn signature_starting_just_inside_the_bound_is_found() {
    let buf = buffer_with_signature_at(LOADER_SCAN_BOUND - 1, 100, LOADER_SCAN_BOUND + 100);
    let info = detect_loader(&buf).unwrap();
    assert_eq!(info.offset, LOADER_SCAN_BOUND - 1);
}

#[test]
fn truncated_signature_at_end_of_buffer_is_rejected() {
    // Buffer ends in the middle of what would be a match; the scan must
    // neither match nor read past the end.
    let mut buf = vec![0u8; 64];
    let start = buf.len() - 5;
    buf[start..].copy_from_slice(&LOADER_SIGNATURE[..5]);
    assert!(detect_loader(&buf).is_none());
}

#[test]
fn signature_without_version_byte_is_rejected() {
    let mut buf = vec![0u8; 40 + LOADER_SIGNATURE.len()];
    let start = 40;
    buf[start..].copy_from_slice(LOADER_SIGNATURE);
    assert!(detect_loader(&buf).is_none());
}

#[test]
fn empty_and_tiny_buffers_do_not_match() {
    assert!(detect_loader(&[]).is_none());
    assert!(detect_loader(&[b']']).is_none());
}
