//! Message type codes (§6) and the typed, owned body payload for each one.
//!
//! Each `Body` variant is a host-order Rust value; byte-order conversion
//! happens only inside `encode`/`decode`, which write into or read from a
//! fresh buffer. A decoded `Body` never needs a second swap before use.

use crate::error::ProtocolError;

pub mod type_code {
    pub const INIT_CHANNEL: u8 = 128;
    pub const CONFIRM_INIT: u8 = 129;
    pub const PROVESTI_CONTROL: u8 = 130;
    pub const CONTROL_CONFIRM: u8 = 131;
    pub const VYDAT_CONTROL_RESULTS: u8 = 132;
    pub const CONTROL_RESULTS: u8 = 133;
    pub const VYDAT_LINE_STATE: u8 = 134;
    pub const LINE_STATE: u8 = 135;
    pub const PARAM_SO: u8 = 137;
    pub const PARAM_TIME_REF: u8 = 138;
    pub const PARAM_REPER: u8 = 139;
    pub const PARAM_SDR: u8 = 140;
    pub const PARAM_3TSO: u8 = 141;
    pub const PARAM_REF_AZIMUTH: u8 = 142;
    pub const PARAM_TSD: u8 = 143;
    pub const PARAM_RESERVED: u8 = 144;
    pub const NAVIGATION_DATA: u8 = 145;
    pub const WARNING: u8 = 146;
}

/// Which of the seven named parameter-accept messages (§6, 137..143) a
/// `Body::ParameterAccept` carries. Code 144 is reserved within the
/// parameter-accept range but unnamed in the source; it is represented
/// here as `Reserved` and handled identically to the named kinds (no
/// response, logged only) — see DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    So,
    TimeRef,
    Reper,
    Sdr,
    ThreeTso,
    RefAzimuth,
    Tsd,
    Reserved,
}

impl ParamKind {
    pub fn type_code(self) -> u8 {
        match self {
            ParamKind::So => type_code::PARAM_SO,
            ParamKind::TimeRef => type_code::PARAM_TIME_REF,
            ParamKind::Reper => type_code::PARAM_REPER,
            ParamKind::Sdr => type_code::PARAM_SDR,
            ParamKind::ThreeTso => type_code::PARAM_3TSO,
            ParamKind::RefAzimuth => type_code::PARAM_REF_AZIMUTH,
            ParamKind::Tsd => type_code::PARAM_TSD,
            ParamKind::Reserved => type_code::PARAM_RESERVED,
        }
    }

    fn from_type_code(code: u8) -> Option<ParamKind> {
        Some(match code {
            type_code::PARAM_SO => ParamKind::So,
            type_code::PARAM_TIME_REF => ParamKind::TimeRef,
            type_code::PARAM_REPER => ParamKind::Reper,
            type_code::PARAM_SDR => ParamKind::Sdr,
            type_code::PARAM_3TSO => ParamKind::ThreeTso,
            type_code::PARAM_REF_AZIMUTH => ParamKind::RefAzimuth,
            type_code::PARAM_TSD => ParamKind::Tsd,
            type_code::PARAM_RESERVED => ParamKind::Reserved,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    InitChannel {
        lauvm: u8,
        lak: u8,
    },
    ConfirmInit {
        lak: u8,
        slp: u8,
        vdr: u8,
        vor1: u8,
        vor2: u8,
        bcb: u32,
    },
    ProvestiControl {
        tk: u8,
    },
    ControlConfirm {
        lak: u8,
        tk: u8,
        bcb: u32,
    },
    VydatControlResults {
        vrk: u8,
    },
    ControlResults {
        lak: u8,
        rsk: u8,
        vsk: u16,
        bcb: u32,
    },
    VydatLineState,
    LineState {
        lak: u8,
        kla: u16,
        sla: u32,
        ksa: u16,
        bcb: u32,
    },
    /// Parameter-accept messages (137..144): opaque payload, the core only
    /// logs it, per §4.6 and §9's open-question resolution.
    ParameterAccept {
        kind: ParamKind,
        payload: Vec<u8>,
    },
    /// Opaque fixed-size navigation data (145); not interpreted by the core.
    NavigationData {
        payload: Vec<u8>,
    },
    Warning {
        lak: u8,
        tks: u8,
        pks: [u8; 6],
        bcb: u32,
    },
}

impl Body {
    pub fn type_code(&self) -> u8 {
        match self {
            Body::InitChannel { .. } => type_code::INIT_CHANNEL,
            Body::ConfirmInit { .. } => type_code::CONFIRM_INIT,
            Body::ProvestiControl { .. } => type_code::PROVESTI_CONTROL,
            Body::ControlConfirm { .. } => type_code::CONTROL_CONFIRM,
            Body::VydatControlResults { .. } => type_code::VYDAT_CONTROL_RESULTS,
            Body::ControlResults { .. } => type_code::CONTROL_RESULTS,
            Body::VydatLineState => type_code::VYDAT_LINE_STATE,
            Body::LineState { .. } => type_code::LINE_STATE,
            Body::ParameterAccept { kind, .. } => kind.type_code(),
            Body::NavigationData { .. } => type_code::NAVIGATION_DATA,
            Body::Warning { .. } => type_code::WARNING,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Body::InitChannel { lauvm, lak } => vec![*lauvm, *lak],
            Body::ConfirmInit {
                lak,
                slp,
                vdr,
                vor1,
                vor2,
                bcb,
            } => {
                let mut out = vec![*lak, *slp, *vdr, *vor1, *vor2];
                out.extend_from_slice(&bcb.to_be_bytes());
                out
            }
            Body::ProvestiControl { tk } => vec![*tk],
            Body::ControlConfirm { lak, tk, bcb } => {
                let mut out = vec![*lak, *tk];
                out.extend_from_slice(&bcb.to_be_bytes());
                out
            }
            Body::VydatControlResults { vrk } => vec![*vrk],
            Body::ControlResults { lak, rsk, vsk, bcb } => {
                let mut out = vec![*lak, *rsk];
                out.extend_from_slice(&vsk.to_be_bytes());
                out.extend_from_slice(&bcb.to_be_bytes());
                out
            }
            Body::VydatLineState => Vec::new(),
            Body::LineState {
                lak,
                kla,
                sla,
                ksa,
                bcb,
            } => {
                let mut out = vec![*lak];
                out.extend_from_slice(&kla.to_be_bytes());
                out.extend_from_slice(&sla.to_be_bytes());
                out.extend_from_slice(&ksa.to_be_bytes());
                out.extend_from_slice(&bcb.to_be_bytes());
                out
            }
            Body::ParameterAccept { payload, .. } => payload.clone(),
            Body::NavigationData { payload } => payload.clone(),
            Body::Warning { lak, tks, pks, bcb } => {
                let mut out = vec![*lak, *tks];
                out.extend_from_slice(pks);
                out.extend_from_slice(&bcb.to_be_bytes());
                out
            }
        }
    }

    pub fn decode(type_code: u8, bytes: &[u8]) -> Result<Body, ProtocolError> {
        use self::type_code as tc;
        match type_code {
            tc::INIT_CHANNEL => {
                let b = expect_len(bytes, 2, type_code)?;
                Ok(Body::InitChannel {
                    lauvm: b[0],
                    lak: b[1],
                })
            }
            tc::CONFIRM_INIT => {
                let b = expect_len(bytes, 9, type_code)?;
                Ok(Body::ConfirmInit {
                    lak: b[0],
                    slp: b[1],
                    vdr: b[2],
                    vor1: b[3],
                    vor2: b[4],
                    bcb: u32::from_be_bytes([b[5], b[6], b[7], b[8]]),
                })
            }
            tc::PROVESTI_CONTROL => {
                let b = expect_len(bytes, 1, type_code)?;
                Ok(Body::ProvestiControl { tk: b[0] })
            }
            tc::CONTROL_CONFIRM => {
                let b = expect_len(bytes, 6, type_code)?;
                Ok(Body::ControlConfirm {
                    lak: b[0],
                    tk: b[1],
                    bcb: u32::from_be_bytes([b[2], b[3], b[4], b[5]]),
                })
            }
            tc::VYDAT_CONTROL_RESULTS => {
                let b = expect_len(bytes, 1, type_code)?;
                Ok(Body::VydatControlResults { vrk: b[0] })
            }
            tc::CONTROL_RESULTS => {
                let b = expect_len(bytes, 8, type_code)?;
                Ok(Body::ControlResults {
                    lak: b[0],
                    rsk: b[1],
                    vsk: u16::from_be_bytes([b[2], b[3]]),
                    bcb: u32::from_be_bytes([b[4], b[5], b[6], b[7]]),
                })
            }
            tc::VYDAT_LINE_STATE => {
                expect_len(bytes, 0, type_code)?;
                Ok(Body::VydatLineState)
            }
            tc::LINE_STATE => {
                let b = expect_len(bytes, 13, type_code)?;
                Ok(Body::LineState {
                    lak: b[0],
                    kla: u16::from_be_bytes([b[1], b[2]]),
                    sla: u32::from_be_bytes([b[3], b[4], b[5], b[6]]),
                    ksa: u16::from_be_bytes([b[7], b[8]]),
                    bcb: u32::from_be_bytes([b[9], b[10], b[11], b[12]]),
                })
            }
            tc::NAVIGATION_DATA => Ok(Body::NavigationData {
                payload: bytes.to_vec(),
            }),
            tc::WARNING => {
                let b = expect_len(bytes, 12, type_code)?;
                let mut pks = [0u8; 6];
                pks.copy_from_slice(&b[2..8]);
                Ok(Body::Warning {
                    lak: b[0],
                    tks: b[1],
                    pks,
                    bcb: u32::from_be_bytes([b[8], b[9], b[10], b[11]]),
                })
            }
            other => {
                if let Some(kind) = ParamKind::from_type_code(other) {
                    Ok(Body::ParameterAccept {
                        kind,
                        payload: bytes.to_vec(),
                    })
                } else {
                    Err(ProtocolError::UnknownMessageType(other))
                }
            }
        }
    }
}

fn expect_len(bytes: &[u8], expected: usize, _type_code: u8) -> Result<&[u8], ProtocolError> {
    if bytes.len() != expected {
        return Err(ProtocolError::BodyLengthMismatch {
            declared: expected,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_channel_roundtrip() {
        let body = Body::InitChannel {
            lauvm: 0x01,
            lak: 0x08,
        };
        let bytes = body.encode();
        let decoded = Body::decode(type_code::INIT_CHANNEL, &bytes).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn confirm_init_roundtrip() {
        let body = Body::ConfirmInit {
            lak: 0x08,
            slp: 0x03,
            vdr: 0x10,
            vor1: 0x11,
            vor2: 0x12,
            bcb: 0xDEADBEEF,
        };
        let bytes = body.encode();
        assert_eq!(bytes.len(), 9);
        let decoded = Body::decode(type_code::CONFIRM_INIT, &bytes).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn vydat_line_state_is_empty() {
        let body = Body::VydatLineState;
        assert_eq!(body.encode().len(), 0);
        let decoded = Body::decode(type_code::VYDAT_LINE_STATE, &[]).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn unknown_type_rejected() {
        let err = Body::decode(200, &[]).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownMessageType(200)));
    }

    #[test]
    fn parameter_accept_roundtrips_opaque_payload() {
        let payload = vec![1, 2, 3, 4, 5];
        let body = Body::ParameterAccept {
            kind: ParamKind::Sdr,
            payload: payload.clone(),
        };
        assert_eq!(body.type_code(), type_code::PARAM_SDR);
        let decoded = Body::decode(type_code::PARAM_SDR, &payload).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn warning_roundtrip() {
        let body = Body::Warning {
            lak: 0x08,
            tks: 0x05,
            pks: [1, 2, 3, 4, 5, 6],
            bcb: 42,
        };
        let bytes = body.encode();
        assert_eq!(bytes.len(), 12);
        let decoded = Body::decode(type_code::WARNING, &bytes).unwrap();
        assert_eq!(decoded, body);
    }
}
