use super::{FrameCursor, LinkHandler};
use crate::anonymizer::Anonymizer;
use libpcap_tools::Error;

/// version, pad, length, first presence bitmap
const RADIOTAP_HEADER_LEN: usize = 8;

const QOS_SUBTYPE_MASK: u8 = 0x8;

const FLAG_TO_DS: u8 = 0x01;
const FLAG_FROM_DS: u8 = 0x02;
const FLAG_ORDER: u8 = 0x80;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameType {
    Management,
    Control,
    Data,
    Reserved,
}

impl From<u8> for FrameType {
    fn from(v: u8) -> Self {
        match v & 0x3 {
            0 => FrameType::Management,
            1 => FrameType::Control,
            2 => FrameType::Data,
            _ => FrameType::Reserved,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ControlSubtype {
    Wrapper,
    BlockAckReq,
    BlockAck,
    PsPoll,
    Rts,
    Cts,
    Ack,
    CfEnd,
    CfEndAck,
}

impl ControlSubtype {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x7 => Some(ControlSubtype::Wrapper),
            0x8 => Some(ControlSubtype::BlockAckReq),
            0x9 => Some(ControlSubtype::BlockAck),
            0xa => Some(ControlSubtype::PsPoll),
            0xb => Some(ControlSubtype::Rts),
            0xc => Some(ControlSubtype::Cts),
            0xd => Some(ControlSubtype::Ack),
            0xe => Some(ControlSubtype::CfEnd),
            0xf => Some(ControlSubtype::CfEndAck),
            _ => None,
        }
    }

    /// Number of address fields carried by the frame
    fn num_addresses(self) -> usize {
        match self {
            ControlSubtype::Wrapper
            | ControlSubtype::PsPoll
            | ControlSubtype::Cts
            | ControlSubtype::Ack
            | ControlSubtype::CfEnd => 1,
            ControlSubtype::BlockAckReq
            | ControlSubtype::BlockAck
            | ControlSubtype::Rts
            | ControlSubtype::CfEndAck => 2,
        }
    }
}

/// Decoded frame control field
#[derive(Debug)]
struct FrameControl {
    frame_type: FrameType,
    subtype: u8,
    to_ds: bool,
    from_ds: bool,
    order: bool,
}

impl FrameControl {
    fn new(fc: u8, flags: u8) -> Self {
        // protocol version (fc & 0x3) is ignored
        FrameControl {
            frame_type: FrameType::from(fc >> 2),
            subtype: (fc >> 4) & 0xf,
            to_ds: flags & FLAG_TO_DS != 0,
            from_ds: flags & FLAG_FROM_DS != 0,
            order: flags & FLAG_ORDER != 0,
        }
    }

    fn is_qos_data(&self) -> bool {
        self.frame_type == FrameType::Data && self.subtype & QOS_SUBTYPE_MASK != 0
    }
}

/// Radiotap header followed by an 802.11 MAC header
///
/// The radiotap fields are skipped using the declared header length; the
/// frame body (information elements, LLC payload) is never inspected.
pub struct Radiotap80211Handler;

impl LinkHandler for Radiotap80211Handler {
    fn name(&self) -> &'static str {
        "Radiotap+802.11"
    }

    fn handle(&self, data: &mut [u8], anon: &mut dyn Anonymizer) -> Result<usize, Error> {
        let mut cur = FrameCursor::new(data);

        cur.require(RADIOTAP_HEADER_LEN)?;
        let _version = cur.read_u8()?;
        let _pad = cur.read_u8()?;
        let len = cur.read_u16_le()? as usize;
        if len < RADIOTAP_HEADER_LEN {
            return Err(Error::Format("radiotap header length too small"));
        }
        cur.seek(len);

        let fc = cur.read_u8()?;
        let flags = cur.read_u8()?;
        let fc = FrameControl::new(fc, flags);
        trace!("802.11 frame control: {:?}", fc);
        // duration/ID
        cur.skip(2)?;

        let control = match fc.frame_type {
            FrameType::Control => match ControlSubtype::from_u8(fc.subtype) {
                Some(subtype) => Some(subtype),
                None => panic!("invalid control frame subtype: 0x{:x}", fc.subtype),
            },
            FrameType::Reserved => panic!("impossible 802.11 type reserved"),
            _ => None,
        };
        let num_addresses = control.map_or(3, ControlSubtype::num_addresses);
        for _ in 0..num_addresses {
            anon.mac(cur.field::<6>()?);
        }

        // sequence control
        if control.is_none() {
            cur.skip(2)?;
        }
        // fourth address, for frames within the distribution system
        if fc.frame_type == FrameType::Data && fc.to_ds && fc.from_ds {
            anon.mac(cur.field::<6>()?);
        }
        // QoS control
        if fc.is_qos_data() {
            cur.skip(2)?;
        }
        let wrapper = control == Some(ControlSubtype::Wrapper);
        // carried frame control
        if wrapper {
            cur.skip(2)?;
        }
        // HT control
        if wrapper
            || (fc.is_qos_data() && fc.order)
            || (fc.frame_type == FrameType::Management && fc.order)
        {
            cur.skip(4)?;
        }

        Ok(cur.offset())
    }
}
