//! Shared fixture builders.
//!
//! Small documents assembled byte by byte, with cross-reference offsets
//! computed as the bytes are written so the tables are always consistent.

#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// Route `log` output through the test harness. Safe to call from every
/// test; only the first call wins.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Compress bytes the way a `/FlateDecode` stream stores them.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Classic-table file: a catalog, an empty page tree, and a string.
pub fn simple_pdf() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let mut offsets = Vec::new();
    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    offsets.push(out.len());
    out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
    offsets.push(out.len());
    out.extend_from_slice(b"3 0 obj\n(hello)\nendobj\n");

    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 4\n0000000000 65535 f \n");
    for off in &offsets {
        writeln!(out, "{:010} 00000 n ", off).unwrap();
    }
    write!(
        out,
        "trailer\n<< /Size 4 /Root 1 0 R >>\nstartxref\n{}\n%%EOF",
        xref_start
    )
    .unwrap();
    out
}

/// Like [`simple_pdf`] with a fourth object: a flate-compressed stream
/// holding `payload`.
pub fn pdf_with_flate_stream(payload: &[u8]) -> Vec<u8> {
    let compressed = deflate(payload);

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let mut offsets = Vec::new();
    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    offsets.push(out.len());
    out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
    offsets.push(out.len());
    out.extend_from_slice(b"3 0 obj\n(hello)\nendobj\n");
    offsets.push(out.len());
    write!(
        out,
        "4 0 obj\n<< /Length {} /Filter /FlateDecode >>\nstream\n",
        compressed.len()
    )
    .unwrap();
    out.extend_from_slice(&compressed);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 5\n0000000000 65535 f \n");
    for off in &offsets {
        writeln!(out, "{:010} 00000 n ", off).unwrap();
    }
    write!(
        out,
        "trailer\n<< /Size 5 /Root 1 0 R >>\nstartxref\n{}\n%%EOF",
        xref_start
    )
    .unwrap();
    out
}

/// File indexed by a cross-reference stream, with objects 10 and 11
/// packed inside a flate-compressed object stream (object 2). Object 10
/// is the integer 42 and object 11 is the name /Test.
pub fn packed_pdf() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.5\n");

    let objstm_offset = out.len();
    let payload = deflate(b"10 0 11 3 42 /Test");
    write!(
        out,
        "2 0 obj\n<< /Type /ObjStm /N 2 /First 10 /Filter /FlateDecode /Length {} >>\nstream\n",
        payload.len()
    )
    .unwrap();
    out.extend_from_slice(&payload);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    let xref_offset = out.len();
    let mut rows = Vec::new();
    rows.extend_from_slice(&[0, 0, 0, 255]);
    rows.extend_from_slice(&[1, (objstm_offset >> 8) as u8, objstm_offset as u8, 0]);
    rows.extend_from_slice(&[1, (xref_offset >> 8) as u8, xref_offset as u8, 0]);
    rows.extend_from_slice(&[2, 0, 2, 0]);
    rows.extend_from_slice(&[2, 0, 2, 1]);
    write!(
        out,
        "3 0 obj\n<< /Type /XRef /Size 12 /W [1 2 1] /Index [0 1 2 2 10 2] /Length {} >>\nstream\n",
        rows.len()
    )
    .unwrap();
    out.extend_from_slice(&rows);
    out.extend_from_slice(b"\nendstream\nendobj\n");
    write!(out, "startxref\n{}\n%%EOF", xref_offset).unwrap();
    out
}

/// Like [`packed_pdf`] but the cross-reference stream itself is
/// flate-compressed behind a PNG Up predictor.
pub fn packed_pdf_predicted() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.5\n");

    let objstm_offset = out.len();
    let payload = deflate(b"10 0 11 3 42 /Test");
    write!(
        out,
        "2 0 obj\n<< /Type /ObjStm /N 2 /First 10 /Filter /FlateDecode /Length {} >>\nstream\n",
        payload.len()
    )
    .unwrap();
    out.extend_from_slice(&payload);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    let xref_offset = out.len();
    let rows: [[u8; 4]; 5] = [
        [0, 0, 0, 255],
        [1, (objstm_offset >> 8) as u8, objstm_offset as u8, 0],
        [1, (xref_offset >> 8) as u8, xref_offset as u8, 0],
        [2, 0, 2, 0],
        [2, 0, 2, 1],
    ];
    // Each row gets an Up filter byte and stores deltas against the row
    // above, matching /Predictor 12 /Columns 4.
    let mut predicted = Vec::new();
    let mut prev = [0u8; 4];
    for row in rows {
        predicted.push(2);
        for (byte, above) in row.iter().zip(prev.iter()) {
            predicted.push(byte.wrapping_sub(*above));
        }
        prev = row;
    }
    let stream = deflate(&predicted);
    write!(
        out,
        "3 0 obj\n<< /Type /XRef /Size 12 /W [1 2 1] /Index [0 1 2 2 10 2] \
         /Filter /FlateDecode /DecodeParms << /Predictor 12 /Columns 4 >> /Length {} >>\nstream\n",
        stream.len()
    )
    .unwrap();
    out.extend_from_slice(&stream);
    out.extend_from_slice(b"\nendstream\nendobj\n");
    write!(out, "startxref\n{}\n%%EOF", xref_offset).unwrap();
    out
}
