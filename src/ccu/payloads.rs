//! Session-preparation parameter-accept payloads, grounded in
//! `uvm/uvm_main.c`'s per-mode `PrinyatParametry*`/`NavigatsionnyeDannye`
//! body literals. These bodies are opaque to both sides of the link (§1
//! Non-goals: field semantics are not interpreted); only the fixture
//! values named in SPEC_FULL.md §4.11 are reproduced here.

use crate::cli::RadarMode;
use crate::protocol::{Body, ParamKind};

/// `PrinyatParametrySoBody`: mode byte (`pp`) followed by `knk` (u16 BE).
/// OR/OR1 use knk=400, VR uses knk=500, per the original's literal values.
fn param_so(mode: RadarMode) -> Vec<u8> {
    let pp = match mode {
        RadarMode::Or | RadarMode::Or1 => 0x02,
        RadarMode::Vr => 0x03,
        RadarMode::Dr => 0x00,
    };
    let knk: u16 = match mode {
        RadarMode::Vr => 500,
        _ => 400,
    };
    let mut out = vec![pp];
    out.extend_from_slice(&knk.to_be_bytes());
    out
}

/// `PrinyatParametry3TsoBody`: `Ncadr` (u16 BE). OR/OR1 use 1024, VR uses 512.
fn param_3tso(mode: RadarMode) -> Vec<u8> {
    let ncadr: u16 = match mode {
        RadarMode::Vr => 512,
        _ => 1024,
    };
    ncadr.to_be_bytes().to_vec()
}

/// `PrinyatTimeRefRangeBody`: fixture content is an opaque array the
/// original fills with a simple ramp; not interpreted here, so a small
/// zeroed placeholder stands in for it.
fn param_time_ref() -> Vec<u8> {
    vec![0u8; 4]
}

/// `PrinyatReperBody`: leads with `NTSO1` (u16 BE), fixture value 1.
fn param_reper() -> Vec<u8> {
    let mut out = vec![0u8; 2];
    out[..2].copy_from_slice(&1u16.to_be_bytes());
    out
}

/// `PrinyatParametrySdrBodyBase`: `pp_nl` (mode | 1) then `q` (u16 BE, 1500).
fn param_sdr(mode: RadarMode) -> Vec<u8> {
    let pp_nl = mode_code(mode) | 1;
    let mut out = vec![pp_nl];
    out.extend_from_slice(&1500u16.to_be_bytes());
    out
}

/// `PrinyatParametryTsdBodyBase`: `nin`, `nout` (u16 BE each, fixture 100/100).
fn param_tsd() -> Vec<u8> {
    let mut out = Vec::with_capacity(4);
    out.extend_from_slice(&100u16.to_be_bytes());
    out.extend_from_slice(&100u16.to_be_bytes());
    out
}

/// `NavigatsionnyeDannyeBody`: `mnd[0] = link id`, the rest zeroed, matching
/// the original's "simple example values" comment.
fn navigation_data(link_id: usize) -> Vec<u8> {
    let mut out = vec![0u8; 16];
    out[0] = link_id as u8;
    out
}

fn mode_code(mode: RadarMode) -> u8 {
    match mode {
        RadarMode::Dr => 0x00,
        RadarMode::Or => 0x02,
        RadarMode::Or1 => 0x02,
        RadarMode::Vr => 0x03,
    }
}

/// Returns the ordered body sequence for the session-preparation phase of
/// the given mode, NavigationData always last (§4.11).
pub fn session_prep_sequence(mode: RadarMode, link_id: usize) -> Vec<Body> {
    let mut seq: Vec<Body> = match mode {
        RadarMode::Dr => vec![
            Body::ParameterAccept {
                kind: ParamKind::Sdr,
                payload: param_sdr(mode),
            },
            Body::ParameterAccept {
                kind: ParamKind::Tsd,
                payload: param_tsd(),
            },
        ],
        RadarMode::Or | RadarMode::Or1 => vec![
            Body::ParameterAccept {
                kind: ParamKind::So,
                payload: param_so(mode),
            },
            Body::ParameterAccept {
                kind: ParamKind::ThreeTso,
                payload: param_3tso(mode),
            },
            Body::ParameterAccept {
                kind: ParamKind::TimeRef,
                payload: param_time_ref(),
            },
            Body::ParameterAccept {
                kind: ParamKind::Reper,
                payload: param_reper(),
            },
        ],
        RadarMode::Vr => vec![
            Body::ParameterAccept {
                kind: ParamKind::So,
                payload: param_so(mode),
            },
            Body::ParameterAccept {
                kind: ParamKind::ThreeTso,
                payload: param_3tso(mode),
            },
        ],
    };
    seq.push(Body::NavigationData {
        payload: navigation_data(link_id),
    });
    seq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dr_sequence_is_sdr_then_tsd_then_nav() {
        let seq = session_prep_sequence(RadarMode::Dr, 0);
        assert_eq!(seq.len(), 3);
        assert!(matches!(
            &seq[0],
            Body::ParameterAccept { kind: ParamKind::Sdr, .. }
        ));
        assert!(matches!(
            &seq[1],
            Body::ParameterAccept { kind: ParamKind::Tsd, .. }
        ));
        assert!(matches!(&seq[2], Body::NavigationData { .. }));
    }

    #[test]
    fn or_sequence_has_four_params_plus_nav() {
        let seq = session_prep_sequence(RadarMode::Or, 1);
        assert_eq!(seq.len(), 5);
        assert!(matches!(&seq[4], Body::NavigationData { .. }));
    }

    #[test]
    fn vr_uses_smaller_knk_and_ncadr() {
        let seq = session_prep_sequence(RadarMode::Vr, 2);
        match &seq[0] {
            Body::ParameterAccept { payload, .. } => {
                assert_eq!(u16::from_be_bytes([payload[1], payload[2]]), 500);
            }
            _ => panic!("expected SO"),
        }
        match &seq[1] {
            Body::ParameterAccept { payload, .. } => {
                assert_eq!(u16::from_be_bytes([payload[0], payload[1]]), 512);
            }
            _ => panic!("expected 3TSO"),
        }
    }
}
