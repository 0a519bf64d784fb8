//! ECMA-48 control-sequence parameter scanning.

use tracing::warn;

/// Parse the next `;`-separated decimal parameter off the front of `params`.
///
/// The parsed prefix (including a consumed `;`) is removed from the view.
/// If no digits were seen, `p` keeps whatever the caller put there, which
/// is how "omitted parameter = default" works. Bytes that are neither
/// digits nor `;` are silently skipped.
///
/// Returns true while more parameters remain, false on the last one.
pub fn next_param(params: &mut &[u8], p: &mut i32) -> bool {
    let mut touched = false;
    while let Some((&c, rest)) = params.split_first() {
        if c.is_ascii_digit() {
            if !touched {
                *p = 0;
                touched = true;
            }
            *p = p.saturating_mul(10).saturating_add(i32::from(c - b'0'));
        } else if c == b';' {
            *params = rest;
            return true;
        }
        *params = rest;
    }
    false
}

/// Scan one expected parameter, warning when the sequence carried more.
pub fn parse_params1(name: &str, params: &mut &[u8], p1: &mut i32) {
    if next_param(params, p1) {
        warn!(
            target: "decode.params",
            name,
            rest = %String::from_utf8_lossy(params),
            "excess parameters ignored"
        );
    }
}

/// Scan two expected parameters, warning when the sequence carried more.
pub fn parse_params2(name: &str, params: &mut &[u8], p1: &mut i32, p2: &mut i32) {
    if next_param(params, p1) && next_param(params, p2) {
        warn!(
            target: "decode.params",
            name,
            rest = %String::from_utf8_lossy(params),
            "excess parameters ignored"
        );
    }
}
