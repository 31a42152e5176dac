// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [H.265](https://www.itu.int/rec/T-REC-H.265)-encoded video.

use super::annexb::NalKind;

/// Classifies an H.265 NAL unit by its type, as in T.REC H.265 Table 7-1.
pub(super) fn nal_kind(nal: &[u8]) -> NalKind {
    let (b0, b1) = match nal {
        [b0, b1, ..] => (*b0, *b1),
        _ => return NalKind::Other,
    };

    // forbidden_zero_bit must be 0 and nuh_temporal_id_plus1 must be non-zero.
    if (b0 & 0x80) != 0 || (b1 & 0b111) == 0 {
        return NalKind::Other;
    }
    match (b0 >> 1) & 0b11_1111 {
        // VPS_NUT, SPS_NUT, PPS_NUT.
        32..=34 => NalKind::ParameterSet,

        // BLA_*, IDR_*, CRA_NUT, and the reserved IRAP types.
        t @ 0..=31 => NalKind::Vcl {
            random_access: (16..=23).contains(&t),

            // first_slice_segment_in_pic_flag.
            first_in_picture: matches!(nal.get(2), Some(b) if (b & 0x80) != 0),
        },
        _ => NalKind::Other,
    }
}
