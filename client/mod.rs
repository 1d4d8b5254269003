// client: helpers for QRTR command-line tools (payload parsing, message display)
use chrono::{DateTime, Local};
use qrtr::{Message, MAX_PAYLOAD};

/// Turn a command-line payload into bytes, either verbatim text or hex.
pub fn parse_payload(input: &str, hex: bool) -> Result<Vec<u8>, String> {
    let bytes = if hex { decode_hex(input)? } else { input.as_bytes().to_vec() };
    if bytes.len() > MAX_PAYLOAD {
        return Err(format!(
            "payload is {} bytes, maximum is {}",
            bytes.len(),
            MAX_PAYLOAD
        ));
    }
    Ok(bytes)
}

fn decode_hex(input: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<char> = input.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err("hex payload has an odd number of digits".to_string());
    }
    digits
        .chunks(2)
        .map(|pair| {
            let s: String = pair.iter().collect();
            u8::from_str_radix(&s, 16).map_err(|_| format!("invalid hex byte '{}'", s))
        })
        .collect()
}

/// Printable view of a payload; non-printable bytes become `\xNN`.
pub fn payload_display(payload: &[u8]) -> String {
    let mut out = String::with_capacity(payload.len());
    for &b in payload {
        if b.is_ascii_graphic() || b == b' ' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{:02x}", b));
        }
    }
    out
}

pub fn format_message_text(msg: &Message) -> String {
    format_message_at(msg, Local::now())
}

// Format: "YYYY/MM/DD HH:MM:SS.uuuuuu TYPE client=C service=S len=L [payload]"
pub fn format_message_at(msg: &Message, at: DateTime<Local>) -> String {
    format!(
        "{} {:<12} client={} service={} len={} [{}]",
        at.format("%Y/%m/%d %H:%M:%S%.6f"),
        msg.msg_type,
        msg.client_id,
        msg.service_id,
        msg.length,
        payload_display(&msg.payload)
    )
}
