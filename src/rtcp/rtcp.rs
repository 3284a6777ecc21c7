use super::{
    bye::Bye, common_header::CommonHeader, full_intra_request::FullIntraRequest, packet_type,
    packet_type::RtcpPacketType, receiver_report::ReceiverReport, rtcp_error::RtcpError,
    sdes::Sdes, sender_report::SenderReport,
};

/// The union of RTCP packets the ingest path understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtcpPacket {
    Sr(SenderReport),
    Rr(ReceiverReport),
    Sdes(Sdes),
    Bye(Bye),
    Fir(FullIntraRequest), // Payload FB (206/FMT=4)
}

impl RtcpPacket {
    /// Decode a *compound* RTCP buffer into individual packets.
    ///
    /// Packet types (and PSFB formats) outside the supported set are
    /// skipped, not failed: a browser freely mixes APP/NACK/TWCC members
    /// into a compound and the ingest path only cares about a subset.
    /// Structural damage (bad version, length overrun) still fails the
    /// whole buffer.
    pub fn decode_compound(buf: &[u8]) -> Result<Vec<RtcpPacket>, RtcpError> {
        let mut out = Vec::new();
        let mut idx = 0usize;
        while idx + 4 <= buf.len() {
            let (hdr, total) = CommonHeader::decode(&buf[idx..])?;
            let payload = &buf[idx + 4..idx + total];

            match hdr.pt() {
                packet_type::PT_SR => out.push(SenderReport::decode(&hdr, payload)?),
                packet_type::PT_RR => out.push(ReceiverReport::decode(&hdr, payload)?),
                packet_type::PT_SDES => out.push(Sdes::decode(&hdr, payload)?),
                packet_type::PT_BYE => out.push(Bye::decode(&hdr, payload)?),
                packet_type::PT_PSFB if hdr.rc_or_fmt() == packet_type::FMT_FIR => {
                    out.push(FullIntraRequest::decode(&hdr, payload)?);
                }
                packet_type::PT_PSFB | packet_type::PT_RTPFB | packet_type::PT_APP => {
                    // recognized family, uninteresting member
                }
                other => return Err(RtcpError::UnknownPacketType(other)),
            }
            idx += total;
        }
        if idx != buf.len() {
            // trailing garbage / partial packet
            return Err(RtcpError::TooShort);
        }
        Ok(out)
    }

    /// Encode a compound RTCP packet (concatenation of packets).
    pub fn encode_compound(pkts: &[RtcpPacket]) -> Result<Vec<u8>, RtcpError> {
        let mut out = Vec::new();
        for pkt in pkts {
            pkt.encode_into(&mut out)?;
        }
        Ok(out)
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), RtcpError> {
        match self {
            RtcpPacket::Sr(sr) => sr.encode_into(out),
            RtcpPacket::Rr(rr) => rr.encode_into(out),
            RtcpPacket::Sdes(sdes) => sdes.encode_into(out),
            RtcpPacket::Bye(bye) => bye.encode_into(out),
            RtcpPacket::Fir(fir) => fir.encode_into(out),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::rtcp::sender_info::SenderInfo;

    fn sample_sr(ssrc: u32, rtp_ts: u32) -> SenderReport {
        SenderReport::new(
            ssrc,
            SenderInfo {
                ntp_msw: 0x8365_0123,
                ntp_lsw: 0x4000_0000,
                rtp_ts,
                packet_count: 17,
                octet_count: 2048,
            },
            Vec::new(),
        )
    }

    #[test]
    fn sr_roundtrip() {
        let sr = sample_sr(0xCAFE, 90_000);
        let wire = RtcpPacket::encode_compound(&[RtcpPacket::Sr(sr.clone())]).unwrap();
        assert_eq!(wire.len() % 4, 0);
        let pkts = RtcpPacket::decode_compound(&wire).unwrap();
        assert_eq!(pkts, vec![RtcpPacket::Sr(sr)]);
    }

    #[test]
    fn compound_sr_plus_sdes() {
        let sr = sample_sr(0x1234, 7);
        let sdes = Sdes::cname(0x1234, "ingest@example".into());
        let wire = RtcpPacket::encode_compound(&[
            RtcpPacket::Sr(sr.clone()),
            RtcpPacket::Sdes(sdes.clone()),
        ])
        .unwrap();

        let pkts = RtcpPacket::decode_compound(&wire).unwrap();
        assert_eq!(pkts.len(), 2);
        assert_eq!(pkts[0], RtcpPacket::Sr(sr));
        assert_eq!(pkts[1], RtcpPacket::Sdes(sdes));
    }

    #[test]
    fn unknown_feedback_members_are_skipped() {
        let mut wire = RtcpPacket::encode_compound(&[RtcpPacket::Sr(sample_sr(9, 9))]).unwrap();
        // Append a minimal PLI (PSFB FMT=1): not in the supported set.
        wire.extend_from_slice(&[0x81, 206, 0x00, 0x02]);
        wire.extend_from_slice(&9u32.to_be_bytes());
        wire.extend_from_slice(&9u32.to_be_bytes());

        let pkts = RtcpPacket::decode_compound(&wire).unwrap();
        assert_eq!(pkts.len(), 1);
        assert!(matches!(pkts[0], RtcpPacket::Sr(_)));
    }

    #[test]
    fn rr_roundtrip_with_report_block() {
        let block = crate::rtcp::report_block::ReportBlock {
            ssrc: 0xCAFE,
            fraction_lost: 12,
            cumulative_lost: -3,
            highest_seq_no_received: 70_000,
            interarrival_jitter: 44,
            lsr: 0x1234_5678,
            dlsr: 90,
        };
        let rr = ReceiverReport::new(0xFEED, vec![block]);
        let wire = RtcpPacket::encode_compound(&[RtcpPacket::Rr(rr.clone())]).unwrap();
        let pkts = RtcpPacket::decode_compound(&wire).unwrap();
        assert_eq!(pkts, vec![RtcpPacket::Rr(rr)]);
    }

    #[test]
    fn truncated_compound_fails() {
        let mut wire = RtcpPacket::encode_compound(&[RtcpPacket::Sr(sample_sr(9, 9))]).unwrap();
        wire.truncate(wire.len() - 2);
        assert!(RtcpPacket::decode_compound(&wire).is_err());
    }

    #[test]
    fn fir_roundtrip() {
        let fir = FullIntraRequest::single(0xAAAA, 0xBBBB, 3);
        let wire = RtcpPacket::encode_compound(&[RtcpPacket::Fir(fir.clone())]).unwrap();
        let pkts = RtcpPacket::decode_compound(&wire).unwrap();
        assert_eq!(pkts, vec![RtcpPacket::Fir(fir)]);
    }

    #[test]
    fn bye_roundtrip_with_reason() {
        let bye = Bye::single(0x5555, Some("teardown".into()));
        let wire = RtcpPacket::encode_compound(&[RtcpPacket::Bye(bye.clone())]).unwrap();
        let pkts = RtcpPacket::decode_compound(&wire).unwrap();
        assert_eq!(pkts, vec![RtcpPacket::Bye(bye)]);
    }
}
