// QRTR frame codec - pure data transformation, no I/O
use crate::error::{DecodeError, EncodeError};
use crate::types::MessageType;

// Header: type, client_id, service_id, length (4 x u32, network byte order)
pub const HEADER_SIZE: usize = 16;
pub const MAX_PAYLOAD: usize = 1024;
// Every frame on the wire has exactly this size
pub const FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD;

/// A typed, addressed unit of application data.
///
/// `length` counts the meaningful bytes of `payload`. Messages built with
/// [`Message::new`] keep the two in sync; [`encode`] rejects any message
/// where they disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub msg_type: MessageType,
    pub client_id: u32,
    pub service_id: u32,
    pub length: u32,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(msg_type: MessageType, client_id: u32, service_id: u32, payload: &[u8]) -> Self {
        Message {
            msg_type,
            client_id,
            service_id,
            // Saturate so an oversized payload can never wrap to a legal length
            length: u32::try_from(payload.len()).unwrap_or(u32::MAX),
            payload: payload.to_vec(),
        }
    }

    pub fn request(client_id: u32, service_id: u32, payload: &[u8]) -> Self {
        Self::new(MessageType::Request, client_id, service_id, payload)
    }

    pub fn response(client_id: u32, service_id: u32, payload: &[u8]) -> Self {
        Self::new(MessageType::Response, client_id, service_id, payload)
    }

    pub fn notification(client_id: u32, service_id: u32, payload: &[u8]) -> Self {
        Self::new(MessageType::Notification, client_id, service_id, payload)
    }

    /// Build a Response addressed back to the sender of this message.
    pub fn reply(&self, payload: &[u8]) -> Self {
        Self::response(self.client_id, self.service_id, payload)
    }

    pub fn is_request(&self) -> bool {
        self.msg_type == MessageType::Request
    }

    pub fn is_response(&self) -> bool {
        self.msg_type == MessageType::Response
    }

    pub fn is_notification(&self) -> bool {
        self.msg_type == MessageType::Notification
    }

    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Serialize a message into one fixed-size frame.
///
/// The output is always [`FRAME_SIZE`] bytes; payload bytes past `length`
/// are zero-filled.
pub fn encode(message: &Message) -> Result<Vec<u8>, EncodeError> {
    let declared = message.length as usize;
    let actual = message.payload.len();
    if declared > MAX_PAYLOAD || actual > MAX_PAYLOAD {
        return Err(EncodeError::PayloadTooLarge {
            length: declared.max(actual),
        });
    }
    if declared != actual {
        return Err(EncodeError::LengthMismatch {
            declared: message.length,
            actual,
        });
    }

    let mut bytes = Vec::with_capacity(FRAME_SIZE);
    bytes.extend_from_slice(&message.msg_type.as_u32().to_be_bytes());
    bytes.extend_from_slice(&message.client_id.to_be_bytes());
    bytes.extend_from_slice(&message.service_id.to_be_bytes());
    bytes.extend_from_slice(&message.length.to_be_bytes());
    bytes.extend_from_slice(&message.payload);
    bytes.resize(FRAME_SIZE, 0);
    Ok(bytes)
}

/// Parse the first frame in `bytes`.
///
/// The returned payload is truncated to the declared `length`; padding is
/// never exposed.
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    if bytes.len() < FRAME_SIZE {
        return Err(DecodeError::Truncated {
            expected: FRAME_SIZE,
            actual: bytes.len(),
        });
    }

    let msg_type = MessageType::try_from(read_u32(bytes, 0))?;
    let client_id = read_u32(bytes, 4);
    let service_id = read_u32(bytes, 8);
    let length = read_u32(bytes, 12);
    if length as usize > MAX_PAYLOAD {
        return Err(DecodeError::PayloadTooLarge { length });
    }

    let start = HEADER_SIZE;
    let payload = bytes[start..start + length as usize].to_vec();

    Ok(Message {
        msg_type,
        client_id,
        service_id,
        length,
        payload,
    })
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_header(msg_type: u32, length: u32) -> Vec<u8> {
        let mut bytes = vec![0u8; FRAME_SIZE];
        bytes[0..4].copy_from_slice(&msg_type.to_be_bytes());
        bytes[12..16].copy_from_slice(&length.to_be_bytes());
        bytes
    }

    #[test]
    fn encode_produces_fixed_size_frame() {
        let msg = Message::request(7, 3, b"ping");
        let bytes = encode(&msg).unwrap();

        assert_eq!(bytes.len(), FRAME_SIZE);
        assert_eq!(&bytes[0..4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 7]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 3]);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 4]);
        assert_eq!(&bytes[16..20], b"ping");
        assert!(bytes[20..].iter().all(|&b| b == 0));
    }

    #[test]
    fn round_trip_preserves_message() {
        let cases = [
            Message::request(1, 2, b""),
            Message::response(0xdead_beef, 0, b"hello"),
            Message::notification(u32::MAX, u32::MAX, &[0xab; MAX_PAYLOAD]),
        ];
        for msg in cases {
            let decoded = decode(&encode(&msg).unwrap()).unwrap();
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let msg = Message::request(1, 1, &[0u8; MAX_PAYLOAD + 1]);
        assert_eq!(
            encode(&msg),
            Err(EncodeError::PayloadTooLarge { length: MAX_PAYLOAD + 1 })
        );
    }

    #[test]
    fn oversized_payload_wins_over_small_declared_length() {
        // What a wrapped length for a >4 GiB payload would look like
        let mut msg = Message::request(1, 1, &[0u8; MAX_PAYLOAD + 1]);
        msg.length = 4;
        assert_eq!(
            encode(&msg),
            Err(EncodeError::PayloadTooLarge { length: MAX_PAYLOAD + 1 })
        );
    }

    #[test]
    fn encode_rejects_length_mismatch() {
        let mut msg = Message::request(1, 1, b"abc");
        msg.length = 5;
        assert_eq!(
            encode(&msg),
            Err(EncodeError::LengthMismatch { declared: 5, actual: 3 })
        );
    }

    #[test]
    fn decode_rejects_truncated_input() {
        let bytes = encode(&Message::request(1, 1, b"x")).unwrap();
        assert_eq!(
            decode(&bytes[..FRAME_SIZE - 1]),
            Err(DecodeError::Truncated { expected: FRAME_SIZE, actual: FRAME_SIZE - 1 })
        );
        assert!(matches!(decode(&[]), Err(DecodeError::Truncated { actual: 0, .. })));
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let bytes = frame_with_header(99, 0);
        assert_eq!(decode(&bytes), Err(DecodeError::UnknownType(99)));
    }

    #[test]
    fn decode_rejects_oversized_length() {
        let bytes = frame_with_header(1, MAX_PAYLOAD as u32 + 1);
        assert_eq!(
            decode(&bytes),
            Err(DecodeError::PayloadTooLarge { length: MAX_PAYLOAD as u32 + 1 })
        );
    }

    #[test]
    fn decode_discards_padding() {
        let mut bytes = encode(&Message::response(1, 1, b"ok")).unwrap();
        // stale bytes beyond `length` must not leak into the payload
        bytes[HEADER_SIZE + 2..].fill(0x5a);

        let msg = decode(&bytes).unwrap();
        assert_eq!(msg.payload, b"ok");
        assert_eq!(msg.length, 2);
    }

    #[test]
    fn decode_reads_only_first_frame() {
        let mut bytes = encode(&Message::request(1, 10, b"first")).unwrap();
        bytes.extend(encode(&Message::request(1, 20, b"second")).unwrap());

        let msg = decode(&bytes).unwrap();
        assert_eq!(msg.service_id, 10);
        assert_eq!(msg.payload, b"first");
    }

    #[test]
    fn reply_keeps_addressing() {
        let req = Message::request(7, 3, b"ping");
        let resp = req.reply(b"pong");
        assert!(resp.is_response());
        assert_eq!((resp.client_id, resp.service_id), (7, 3));
        assert_eq!(resp.payload_text(), "pong");
    }
}
