//! Markup and number formatting helpers

use sai_core::domain::task::Platform;

/// Escapes text for an HTML context; newlines become `<br>`
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '&' => out.push_str("&amp;"),
            '\n' => out.push_str("<br>"),
            c => out.push(c),
        }
    }
    out
}

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Byte count with a binary suffix, three decimals
///
/// Sizes up to and including 1024 are returned as plain numbers.
pub fn humanize(bytes: u64) -> String {
    if bytes >= GIB {
        format!("{:.3}Gi", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.3}Mi", bytes as f64 / MIB as f64)
    } else if bytes > KIB {
        format!("{:.3}Ki", bytes as f64 / KIB as f64)
    } else {
        bytes.to_string()
    }
}

/// Icon markup for an `os/arch/toolchain` platform descriptor
///
/// `size` selects the icon size class. No os means no arch icon either.
pub fn plat_icon(platform: &str, size: u8) -> String {
    let Platform {
        os,
        arch,
        toolchain,
    } = Platform::parse(platform);

    let mut out = String::new();
    if let Some(os) = os {
        out.push_str(&format!(
            "<img class=\"ip{size} zup\" src=\"/sai/{}.svg\">",
            escape_html(os)
        ));
        if let Some(arch) = arch {
            out.push_str(&format!(
                "<img class=\"ip{size} tread1\" src=\"/sai/arch-{}.svg\">",
                escape_html(arch)
            ));
        }
    }
    if let Some(toolchain) = toolchain {
        out.push_str(&format!(
            "<img class=\"ip{size} tread2\" src=\"/sai/tc-{}.svg\">",
            escape_html(toolchain)
        ));
    }
    out
}

/// Keeps only characters that are safe inside a class name
pub fn class_token(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}
