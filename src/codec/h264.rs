// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [H.264](https://www.itu.int/rec/T-REC-H.264-201906-I/en)-encoded video.

use h264_reader::nal::{NalHeader, UnitType};

use super::annexb::NalKind;

pub(super) fn nal_kind(nal: &[u8]) -> NalKind {
    let hdr = match nal.first().map(|&b| NalHeader::new(b)) {
        Some(Ok(h)) => h,
        _ => return NalKind::Other,
    };
    match hdr.nal_unit_type() {
        UnitType::SeqParameterSet | UnitType::PicParameterSet => NalKind::ParameterSet,
        UnitType::SliceLayerWithoutPartitioningIdr => NalKind::Vcl {
            random_access: true,
            first_in_picture: starts_picture(nal),
        },
        UnitType::SliceLayerWithoutPartitioningNonIdr | UnitType::SliceDataPartitionALayer => {
            NalKind::Vcl {
                random_access: false,
                first_in_picture: starts_picture(nal),
            }
        }
        _ => NalKind::Other,
    }
}

/// Returns true iff the slice header's `first_mb_in_slice` is 0.
///
/// That field is the first syntax element after the header byte. It's
/// `ue(v)`-coded, so 0 is encoded as a single `1` bit.
fn starts_picture(nal: &[u8]) -> bool {
    matches!(nal.get(1), Some(b) if (b & 0x80) != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(nal_kind(b"\x67\x64\x00\x1e"), NalKind::ParameterSet);
        assert_eq!(nal_kind(b"\x68\xee\x3c\x80"), NalKind::ParameterSet);
        assert_eq!(nal_kind(b"\x06\x05"), NalKind::Other); // SEI
        assert_eq!(nal_kind(b"\x09\xf0"), NalKind::Other); // access unit delimiter
        assert_eq!(
            nal_kind(b"\x65\x88\x84"),
            NalKind::Vcl {
                random_access: true,
                first_in_picture: true
            }
        );
        assert_eq!(
            nal_kind(b"\x41\x9a"),
            NalKind::Vcl {
                random_access: false,
                first_in_picture: true
            }
        );

        // forbidden_zero_bit set.
        assert_eq!(nal_kind(b"\xe5\x88"), NalKind::Other);

        // Header with no slice data.
        assert_eq!(
            nal_kind(b"\x65"),
            NalKind::Vcl {
                random_access: true,
                first_in_picture: false
            }
        );
    }
}
