/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

// Text repair for Dell manifests. Published catalogs have shipped as UTF-16 with and without
// a BOM, as windows-1252 labelled ISO-8859-1, with control characters that XML forbids and
// with a CDATA section that closes as "]]</Display>". Everything is turned into clean UTF-8
// before the XML reader sees it.

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1252};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DECLARED_ENCODING: Regex =
        Regex::new(r#"(?i)(<\?xml[^>]*?encoding\s*=\s*)["']([A-Za-z0-9._:\-]+)["']"#)
            .expect("BUG: static regex must compile");
}

const BROKEN_CDATA_CLOSE: &str = "]]</Display>";
const CDATA_CLOSE: &str = "]]></Display>";

/// Decodes raw manifest bytes into repaired UTF-8 text.
pub fn decode_manifest(raw: &[u8]) -> String {
    let encoding = detect_encoding(raw);
    let text = match Encoding::for_bom(raw) {
        Some((bom_encoding, bom_len)) => {
            let (text, _) = bom_encoding.decode_without_bom_handling(&raw[bom_len..]);
            text.into_owned()
        }
        None if encoding == UTF_8 => match std::str::from_utf8(raw) {
            Ok(text) => text.to_string(),
            Err(_) => {
                // Labelled (or defaulted to) UTF-8 but not valid: treat as windows-1252,
                // which maps every byte.
                tracing::debug!("manifest is not valid UTF-8, decoding as windows-1252");
                let (text, _) = WINDOWS_1252.decode_without_bom_handling(raw);
                text.into_owned()
            }
        },
        None => {
            let (text, _) = encoding.decode_without_bom_handling(raw);
            text.into_owned()
        }
    };
    repair_text(&text)
}

/// Picks the encoding of `raw` from its BOM, the byte pattern of `<?` in UTF-16, or the
/// encoding named in the XML declaration. ISO-8859-1 resolves to windows-1252.
pub fn detect_encoding(raw: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(raw) {
        return encoding;
    }
    match raw {
        [0, b'<', ..] => return UTF_16BE,
        [b'<', 0, ..] => return UTF_16LE,
        _ => {}
    }

    let head = &raw[..raw.len().min(256)];
    let head = String::from_utf8_lossy(head);
    DECLARED_ENCODING
        .captures(&head)
        .and_then(|c| c.get(2))
        .and_then(|label| Encoding::for_label(label.as_str().as_bytes()))
        // A UTF-16 label on a byte stream that has no UTF-16 shape is a lie.
        .filter(|encoding| *encoding != UTF_16LE && *encoding != UTF_16BE)
        .unwrap_or(UTF_8)
}

/// Strips the BOM, drops characters outside the XML 1.0 character ranges, closes the known
/// malformed CDATA pattern and relabels the declaration as UTF-8.
pub fn repair_text(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let cleaned: String = text.chars().filter(|c| is_xml_char(*c)).collect();
    let cleaned = cleaned.replace(BROKEN_CDATA_CLOSE, CDATA_CLOSE);
    DECLARED_ENCODING
        .replace(&cleaned, r#"${1}"UTF-8""#)
        .into_owned()
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}
