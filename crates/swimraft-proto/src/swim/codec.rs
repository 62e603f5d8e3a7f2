//! SWIM wire codec (§6): MessagePack encode/decode of the meta map and body
//! map exchanged between instances, with an optional AEAD envelope.

use super::crypto::CryptoCodec;
use super::member::{Incarnation, MemberRecord, MemberStatus};
use serde::{Deserialize, Serialize};
use swimraft_types::errors::CodecError;
use swimraft_types::id::MemberId;

pub const PROTOCOL_VERSION: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMeta {
    version: u8,
    src_addr: String,
    /// Present when this packet is being relayed on behalf of another
    /// source as part of an indirect probe (§4.1 indirect relay).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    route: Option<WireRoute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireRoute {
    /// The original requester of an indirect probe.
    origin_addr: String,
    /// The final destination the relay must forward to.
    through_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMember {
    uuid: [u8; 16],
    addr: String,
    generation: u64,
    version: u64,
    status: u8,
    #[serde(default)]
    payload: Vec<u8>,
}

impl From<&MemberRecord> for WireMember {
    fn from(m: &MemberRecord) -> Self {
        WireMember {
            uuid: *m.id.0.as_bytes(),
            addr: m.addr.clone(),
            generation: m.incarnation.generation,
            version: m.incarnation.version,
            status: m.status as u8,
            payload: m.payload.clone(),
        }
    }
}

impl TryFrom<WireMember> for MemberRecord {
    type Error = CodecError;

    fn try_from(w: WireMember) -> Result<Self, Self::Error> {
        let status = match w.status {
            0 => MemberStatus::Alive,
            1 => MemberStatus::Suspected,
            2 => MemberStatus::Dead,
            3 => MemberStatus::Left,
            other => return Err(CodecError::Malformed(format!("unknown member status {other}"))),
        };
        Ok(MemberRecord {
            id: MemberId(uuid::Uuid::from_bytes(w.uuid)),
            addr: w.addr,
            incarnation: Incarnation { generation: w.generation, version: w.version },
            status,
            payload: w.payload,
            status_round: 0,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct WireBody {
    src_uuid: [u8; 16],
    /// The sender's own incarnation, carried on every packet (§4.2) so a
    /// receiver can learn about an unknown sender without waiting for an
    /// anti-entropy or dissemination record to mention it.
    src_generation: u64,
    src_version: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    failure_detection: Option<WireFailureDetection>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    anti_entropy: Vec<WireMember>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    dissemination: Vec<WireMember>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    quit: Option<WireQuit>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct WireFailureDetection {
    /// 0 = ping, 1 = ack, 2 = ping-req.
    kind: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct WireQuit {
    generation: u64,
    version: u64,
}

/// The kind of failure-detection message carried by a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdKind {
    Ping,
    Ack,
    PingReq,
}

/// A fully decoded SWIM packet.
#[derive(Debug, Clone)]
pub struct SwimPacket {
    pub src_addr: String,
    pub route: Option<(String, String)>,
    pub src_uuid: MemberId,
    pub src_incarnation: Incarnation,
    pub failure_detection: Option<FdKind>,
    pub anti_entropy: Vec<MemberRecord>,
    pub dissemination: Vec<MemberRecord>,
    pub quit: Option<Incarnation>,
}

#[derive(Debug, Clone, Default)]
pub struct SwimPacketBuilder {
    pub failure_detection: Option<FdKind>,
    pub anti_entropy: Vec<MemberRecord>,
    pub dissemination: Vec<MemberRecord>,
    pub quit: Option<Incarnation>,
    pub route: Option<(String, String)>,
}

pub fn encode(
    src_addr: &str,
    src_uuid: MemberId,
    src_incarnation: Incarnation,
    builder: SwimPacketBuilder,
    crypto: Option<&CryptoCodec>,
) -> Result<Vec<u8>, CodecError> {
    let meta = WireMeta {
        version: PROTOCOL_VERSION,
        src_addr: src_addr.to_string(),
        route: builder.route.map(|(origin, through)| WireRoute { origin_addr: origin, through_addr: through }),
    };
    let body = WireBody {
        src_uuid: *src_uuid.0.as_bytes(),
        src_generation: src_incarnation.generation,
        src_version: src_incarnation.version,
        failure_detection: builder.failure_detection.map(|k| WireFailureDetection {
            kind: match k {
                FdKind::Ping => 0,
                FdKind::Ack => 1,
                FdKind::PingReq => 2,
            },
        }),
        anti_entropy: builder.anti_entropy.iter().map(WireMember::from).collect(),
        dissemination: builder.dissemination.iter().map(WireMember::from).collect(),
        quit: builder.quit.map(|inc| WireQuit { generation: inc.generation, version: inc.version }),
    };

    let meta_buf = rmp_serde::to_vec_named(&meta).map_err(|e| CodecError::Malformed(e.to_string()))?;
    let body_buf = rmp_serde::to_vec_named(&body).map_err(|e| CodecError::Malformed(e.to_string()))?;

    let mut buf = Vec::with_capacity(8 + meta_buf.len() + body_buf.len());
    buf.extend_from_slice(&(meta_buf.len() as u32).to_be_bytes());
    buf.extend_from_slice(&meta_buf);
    buf.extend_from_slice(&(body_buf.len() as u32).to_be_bytes());
    buf.extend_from_slice(&body_buf);

    match crypto {
        Some(codec) => codec.seal(&buf),
        None => Ok(buf),
    }
}

pub fn decode(bytes: &[u8], crypto: Option<&CryptoCodec>) -> Result<SwimPacket, CodecError> {
    let plain = match crypto {
        Some(codec) => codec.open(bytes)?,
        None => bytes.to_vec(),
    };

    if plain.len() < 4 {
        return Err(CodecError::Truncated { expected: 4, got: plain.len() });
    }
    let meta_len = u32::from_be_bytes(plain[0..4].try_into().unwrap()) as usize;
    if plain.len() < 4 + meta_len + 4 {
        return Err(CodecError::Truncated { expected: 4 + meta_len + 4, got: plain.len() });
    }
    let meta: WireMeta = rmp_serde::from_slice(&plain[4..4 + meta_len])
        .map_err(|e| CodecError::Malformed(e.to_string()))?;

    let body_len_start = 4 + meta_len;
    let body_len =
        u32::from_be_bytes(plain[body_len_start..body_len_start + 4].try_into().unwrap()) as usize;
    let body_start = body_len_start + 4;
    if plain.len() < body_start + body_len {
        return Err(CodecError::Truncated { expected: body_start + body_len, got: plain.len() });
    }
    let body: WireBody = rmp_serde::from_slice(&plain[body_start..body_start + body_len])
        .map_err(|e| CodecError::Malformed(e.to_string()))?;

    if meta.version != PROTOCOL_VERSION {
        return Err(CodecError::UnsupportedVersion(meta.version));
    }

    let anti_entropy = body
        .anti_entropy
        .into_iter()
        .map(MemberRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let dissemination = body
        .dissemination
        .into_iter()
        .map(MemberRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SwimPacket {
        src_addr: meta.src_addr,
        route: meta.route.map(|r| (r.origin_addr, r.through_addr)),
        src_uuid: MemberId(uuid::Uuid::from_bytes(body.src_uuid)),
        src_incarnation: Incarnation { generation: body.src_generation, version: body.src_version },
        failure_detection: body.failure_detection.map(|fd| match fd.kind {
            1 => FdKind::Ack,
            2 => FdKind::PingReq,
            _ => FdKind::Ping,
        }),
        anti_entropy,
        dissemination,
        quit: body.quit.map(|q| Incarnation { generation: q.generation, version: q.version }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_member(n: u64) -> MemberRecord {
        MemberRecord {
            id: MemberId::new_random(),
            addr: format!("127.0.0.1:{}", 3300 + n),
            incarnation: Incarnation::new(n),
            status: MemberStatus::Alive,
            payload: vec![1, 2, 3],
            status_round: 0,
        }
    }

    #[test]
    fn round_trips_without_crypto() {
        let src = MemberId::new_random();
        let mut builder = SwimPacketBuilder::default();
        builder.failure_detection = Some(FdKind::Ping);
        builder.anti_entropy.push(sample_member(1));
        builder.dissemination.push(sample_member(2));

        let bytes = encode("127.0.0.1:3301", src, Incarnation::new(4), builder, None).unwrap();
        let decoded = decode(&bytes, None).unwrap();

        assert_eq!(decoded.src_uuid, src);
        assert_eq!(decoded.src_addr, "127.0.0.1:3301");
        assert_eq!(decoded.src_incarnation, Incarnation::new(4));
        assert_eq!(decoded.failure_detection, Some(FdKind::Ping));
        assert_eq!(decoded.anti_entropy.len(), 1);
        assert_eq!(decoded.dissemination.len(), 1);
    }

    #[test]
    fn rejects_truncated_body() {
        let src = MemberId::new_random();
        let bytes = encode("127.0.0.1:3301", src, Incarnation::new(0), SwimPacketBuilder::default(), None).unwrap();
        let truncated = &bytes[..bytes.len() - 2];
        assert!(decode(truncated, None).is_err());
    }
}
